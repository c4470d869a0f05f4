// Centralized logging helpers for the exchange pipeline
use crate::models::{KeyScheme, ProviderKind};
use log::{debug, info, warn};

pub struct LoggingHelper;

impl LoggingHelper {
    /// Log which provider this instance serves and how it derives keys
    pub fn log_provider_configured(provider: ProviderKind, endpoint: Option<&str>, scheme: KeyScheme) {
        match endpoint {
            Some(endpoint) => info!(
                "✅ {provider} bridge configured (profile endpoint: {endpoint}, key scheme: {scheme:?})"
            ),
            None => {
                info!("✅ {provider} bridge configured (key scheme: {scheme:?})");
                warn!(
                    "⚠️  {provider} profiles are taken from the request body without verification; \
                     every login receives a fresh identity"
                );
            }
        }
    }

    /// Log the identity backend selected at startup
    pub fn log_identity_backend(backend: &str, project_id: Option<&str>) {
        info!(
            "🔧 Identity backend: {backend} (project: {})",
            project_id.unwrap_or("n/a")
        );
    }

    /// Log the start of a profile fetch. The token itself is never logged.
    pub fn log_profile_request(provider: ProviderKind) {
        info!("Requesting user profile from {provider} API server");
    }

    /// Log the internal key resolved for a request
    pub fn log_key_resolved(uid: &str, returning: bool) {
        if returning {
            info!("Resolved returning user to existing key {uid}");
        } else {
            debug!("No existing record matched, using key {uid}");
        }
    }

    /// Log that the update path found no record and creation follows
    pub fn log_create_path(uid: &str) {
        debug!("No identity record at {uid}, creating it");
    }

    /// Log token minting for a resolved key
    pub fn log_token_minted(uid: &str) {
        info!("Created a custom firebase token based on uid {uid}");
    }
}
