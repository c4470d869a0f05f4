//! Token exchange pipeline: profile, reconcile, mint

use crate::error::BridgeError;
use crate::identity::TokenMinter;
use crate::models::{CustomClaims, ProviderKind, VerifyTokenRequest};
use crate::profile::ProfileSource;
use crate::reconciler::IdentityReconciler;
use crate::utils::logging::LoggingHelper;
use std::sync::Arc;

/// Exchanges a provider credential for a signed custom token
#[derive(Clone)]
pub struct TokenExchangeService {
    source: ProfileSource,
    reconciler: Arc<IdentityReconciler>,
    minter: Arc<dyn TokenMinter>,
}

impl std::fmt::Debug for TokenExchangeService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenExchangeService")
            .field("source", &self.source)
            .field("reconciler", &self.reconciler)
            .finish_non_exhaustive()
    }
}

impl TokenExchangeService {
    #[must_use]
    pub fn new(
        source: ProfileSource,
        reconciler: IdentityReconciler,
        minter: Arc<dyn TokenMinter>,
    ) -> Self {
        Self {
            source,
            reconciler: Arc::new(reconciler),
            minter,
        }
    }

    #[must_use]
    pub fn provider(&self) -> ProviderKind {
        self.source.provider()
    }

    /// Run the full exchange for one request
    ///
    /// # Errors
    ///
    /// Returns the first failing stage's error; nothing is retried
    pub async fn exchange(&self, request: &VerifyTokenRequest) -> Result<String, BridgeError> {
        let profile = self.source.resolve(request).await?;
        let resolution = self.reconciler.reconcile(&profile).await?;

        let claims = CustomClaims::for_provider(self.provider());
        let token = self.minter.mint_token(resolution.uid(), &claims).await?;

        LoggingHelper::log_token_minted(resolution.uid());
        Ok(token)
    }
}
