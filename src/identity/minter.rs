use super::firebase::ServiceAccount;
use super::TokenMinter;
use crate::error::MintError;
use crate::models::CustomClaims;
use crate::utils::crypto::Rs256Signer;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;

/// Audience Firebase expects on custom tokens
pub const CUSTOM_TOKEN_AUDIENCE: &str =
    "https://identitytoolkit.googleapis.com/google.identity.identitytoolkit.v1.IdentityToolkit";

/// Longest uid Firebase accepts
pub const MAX_UID_LENGTH: usize = 128;

/// Mints Firebase custom tokens signed with a service-account key
#[derive(Debug, Clone)]
pub struct FirebaseTokenMinter {
    signer: Rs256Signer,
    client_email: String,
    lifetime_secs: i64,
}

impl FirebaseTokenMinter {
    #[must_use]
    pub fn new(signer: Rs256Signer, client_email: &str, lifetime_secs: u64) -> Self {
        Self {
            signer,
            client_email: client_email.to_string(),
            lifetime_secs: i64::try_from(lifetime_secs).unwrap_or(i64::MAX),
        }
    }

    /// Minter for the given service account
    ///
    /// # Errors
    ///
    /// Returns an error if the account's private key is unusable
    pub fn from_service_account(
        account: &ServiceAccount,
        lifetime_secs: u64,
    ) -> anyhow::Result<Self> {
        Ok(Self::new(account.signer()?, &account.client_email, lifetime_secs))
    }
}

#[async_trait]
impl TokenMinter for FirebaseTokenMinter {
    async fn mint_token(&self, uid: &str, claims: &CustomClaims) -> Result<String, MintError> {
        if uid.is_empty() || uid.chars().count() > MAX_UID_LENGTH {
            return Err(MintError::InvalidSubject(format!(
                "uid must be 1 to {MAX_UID_LENGTH} characters, got {}",
                uid.chars().count()
            )));
        }

        let now = Utc::now().timestamp();
        let payload = json!({
            "iss": self.client_email,
            "sub": self.client_email,
            "aud": CUSTOM_TOKEN_AUDIENCE,
            "iat": now,
            "exp": now.saturating_add(self.lifetime_secs),
            "uid": uid,
            "claims": claims,
        });

        self.signer
            .create_jwt(&payload)
            .map_err(|e| MintError::Signing(e.to_string()))
    }
}
