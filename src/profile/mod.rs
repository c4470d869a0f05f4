//! Profile Fetcher
//!
//! Turns an inbound verification request into a [`ProviderProfile`]. The trust
//! level is explicit in [`ProfileSource`]: verified providers are asked who
//! the bearer is, unverified ones take the caller's word for it.

pub mod fetcher;
pub mod kakao;
pub mod line;
pub mod naver;

pub use fetcher::HttpProfileFetcher;

use crate::error::{BridgeError, FetchError};
use crate::models::{ProviderKind, ProviderProfile, VerifyTokenRequest};
use crate::utils::logging::LoggingHelper;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Calls a provider's "who am I" endpoint
#[async_trait]
pub trait ProfileFetcher: Send + Sync {
    /// Fetch the raw profile JSON for a bearer token
    ///
    /// # Errors
    ///
    /// Returns `UpstreamUnavailable` if the call fails and `InvalidProfile`
    /// if the body is not JSON
    async fn fetch_profile(&self, access_token: &str) -> Result<Value, FetchError>;
}

/// Where a request's profile comes from, tagged with how far it can be trusted
#[derive(Clone)]
pub enum ProfileSource {
    /// Identity confirmed by the provider's profile endpoint
    Verified {
        provider: ProviderKind,
        fetcher: Arc<dyn ProfileFetcher>,
    },
    /// Identity claimed by the caller. A fresh identifier is synthesized per
    /// call, so repeated logins never converge on one record.
    Unverified {
        provider: ProviderKind,
        default_photo_url: String,
    },
}

impl std::fmt::Debug for ProfileSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Verified { provider, .. } => {
                f.debug_struct("Verified").field("provider", provider).finish_non_exhaustive()
            }
            Self::Unverified { provider, default_photo_url } => f
                .debug_struct("Unverified")
                .field("provider", provider)
                .field("default_photo_url", default_photo_url)
                .finish(),
        }
    }
}

impl ProfileSource {
    #[must_use]
    pub fn provider(&self) -> ProviderKind {
        match self {
            Self::Verified { provider, .. } | Self::Unverified { provider, .. } => *provider,
        }
    }

    #[must_use]
    pub fn is_verified(&self) -> bool {
        matches!(self, Self::Verified { .. })
    }

    /// Produce the profile for a request
    ///
    /// # Errors
    ///
    /// - `MissingInput` if the request carries no usable token
    /// - `Fetch` if the provider call or its payload fails
    /// - `ProfileMissingIdentifier` if the payload has no user id
    pub async fn resolve(
        &self,
        request: &VerifyTokenRequest,
    ) -> Result<ProviderProfile, BridgeError> {
        match self {
            Self::Verified { provider, fetcher } => {
                let token = request.bearer_token().ok_or(BridgeError::MissingInput)?;
                LoggingHelper::log_profile_request(*provider);
                let body = fetcher.fetch_profile(&token).await?;
                parse_profile(*provider, &body)
            }
            Self::Unverified {
                default_photo_url, ..
            } => {
                if !request.has_truthy_token() {
                    return Err(BridgeError::MissingInput);
                }
                Ok(line::claimed_profile(request, default_photo_url))
            }
        }
    }
}

/// Map a provider payload to a profile
///
/// # Errors
///
/// Returns an error if the payload is not a profile of that provider
pub fn parse_profile(provider: ProviderKind, body: &Value) -> Result<ProviderProfile, BridgeError> {
    match provider {
        ProviderKind::Kakao => kakao::parse_profile(body),
        ProviderKind::Naver => naver::parse_profile(body),
        ProviderKind::Line => Err(FetchError::InvalidProfile(
            "LINE profiles are not fetched from an endpoint".to_string(),
        )
        .into()),
    }
}

/// Read an identifier that providers send either as a JSON number or a string
pub(crate) fn id_from_value(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}
