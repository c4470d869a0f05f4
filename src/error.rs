//! Error types for the token exchange pipeline
//!
//! Each stage has its own error enum; [`BridgeError`] is what the pipeline
//! hands to the HTTP layer, which maps it to a status code.

use thiserror::Error;

/// Failures while obtaining a provider profile
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// The provider endpoint could not be reached or answered with a non-success status
    #[error("Provider profile endpoint unavailable: {0}")]
    UpstreamUnavailable(String),

    /// The provider answered but the body is not a usable profile
    #[error("Provider returned an invalid profile: {0}")]
    InvalidProfile(String),
}

/// Failures reported by an identity store
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// No record exists under the requested key. Drives the create path.
    #[error("No identity record exists for key {0}")]
    RecordNotFound(String),

    /// A record already exists under the requested key
    #[error("An identity record already exists for key {0}")]
    AlreadyExists(String),

    /// Any other store failure
    #[error("Identity store error: {0}")]
    Other(String),
}

/// Failures while minting a custom token
#[derive(Debug, Clone, Error)]
pub enum MintError {
    #[error("Invalid token subject: {0}")]
    InvalidSubject(String),

    #[error("Token signing failed: {0}")]
    Signing(String),
}

/// Errors surfaced by the token exchange pipeline
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The request carried no usable token
    #[error("Access token is a required parameter.")]
    MissingInput,

    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The profile produced no external identifier
    #[error("There was no user with the given access token.")]
    ProfileMissingIdentifier,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Mint(#[from] MintError),
}

impl BridgeError {
    /// Short machine-readable code used in error response bodies
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::MissingInput => "missing_token",
            Self::Fetch(FetchError::UpstreamUnavailable(_)) => "upstream_unavailable",
            Self::Fetch(FetchError::InvalidProfile(_)) => "invalid_profile",
            Self::ProfileMissingIdentifier => "profile_missing_identifier",
            Self::Store(_) => "identity_store_error",
            Self::Mint(_) => "token_mint_error",
        }
    }
}
