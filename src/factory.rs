//! Service factory for creating the configured token exchange pipeline
//!
//! Builds the profile source, identity store and minter described by
//! [`BridgeSettings`] and hands them to a [`TokenExchangeService`].

use crate::identity::{
    FirebaseIdentityStore, FirebaseTokenMinter, IdentityStore, InMemoryIdentityStore,
    ServiceAccount,
};
use crate::models::ProviderKind;
use crate::profile::{HttpProfileFetcher, ProfileSource};
use crate::reconciler::IdentityReconciler;
use crate::service::TokenExchangeService;
use crate::settings::{BridgeSettings, IdentityBackend};
use crate::utils::logging::LoggingHelper;
use anyhow::{anyhow, Context, Result};
use std::sync::Arc;
use std::time::Duration;

/// Factory for creating the exchange service with dependency injection
pub struct BridgeServiceFactory;

impl BridgeServiceFactory {
    /// Create a fully configured exchange service
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No service account is configured or it cannot be loaded
    /// - A verified provider has no usable profile endpoint
    /// - The Firebase backend is selected without a project id
    pub fn create_exchange_service(settings: &BridgeSettings) -> Result<TokenExchangeService> {
        log::info!("🏭 Starting token bridge service factory...");

        let account_path = settings
            .firebase
            .get_service_account_path()
            .ok_or_else(|| anyhow!("No service account configured; set GOOGLE_APPLICATION_CREDENTIALS"))?;
        let account = ServiceAccount::from_file(&account_path)?;

        let source = Self::create_profile_source(settings)?;
        let store = Self::create_identity_store(settings, &account)?;

        let provider = settings.provider.kind;
        let scheme = settings.provider.effective_key_scheme();
        LoggingHelper::log_provider_configured(
            provider,
            settings.provider.effective_profile_endpoint().as_deref(),
            scheme,
        );

        let minter = FirebaseTokenMinter::from_service_account(
            &account,
            settings.firebase.effective_token_lifetime_secs(),
        )
        .context("Failed to create token minter")?;

        let reconciler = IdentityReconciler::new(provider, scheme, store);

        log::info!("🏭 Token bridge service factory completed successfully");
        Ok(TokenExchangeService::new(source, reconciler, Arc::new(minter)))
    }

    /// Verified source for Kakao and Naver, unverified source for LINE
    fn create_profile_source(settings: &BridgeSettings) -> Result<ProfileSource> {
        let provider = settings.provider.kind;
        if provider == ProviderKind::Line {
            return Ok(ProfileSource::Unverified {
                provider,
                default_photo_url: settings.provider.default_photo_url.clone(),
            });
        }

        let endpoint = settings
            .provider
            .effective_profile_endpoint()
            .ok_or_else(|| anyhow!("No profile endpoint configured for {provider}"))?;
        let fetcher = HttpProfileFetcher::new(
            &endpoint,
            Duration::from_secs(settings.provider.request_timeout_secs),
        )
        .with_context(|| format!("Invalid profile endpoint for {provider}: {endpoint}"))?;

        Ok(ProfileSource::Verified {
            provider,
            fetcher: Arc::new(fetcher),
        })
    }

    fn create_identity_store(
        settings: &BridgeSettings,
        account: &ServiceAccount,
    ) -> Result<Arc<dyn IdentityStore>> {
        match settings.identity.backend {
            IdentityBackend::Memory => {
                LoggingHelper::log_identity_backend("memory", None);
                Ok(Arc::new(InMemoryIdentityStore::new()))
            }
            IdentityBackend::Firebase => {
                let project_id = settings
                    .firebase
                    .project_id
                    .clone()
                    .or_else(|| account.project_id.clone())
                    .ok_or_else(|| anyhow!("No Firebase project id configured"))?;
                LoggingHelper::log_identity_backend("firebase", Some(&project_id));

                let store = FirebaseIdentityStore::new(
                    &project_id,
                    account,
                    &settings.firebase.identity_toolkit_url,
                    &settings.firebase.token_uri,
                    Duration::from_secs(settings.provider.request_timeout_secs),
                )?;
                Ok(Arc::new(store))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures::TestFixtures;
    use std::io::Write;

    fn service_account_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(TestFixtures::service_account_json().as_bytes())
            .unwrap();
        file
    }

    fn settings_with_account(provider: ProviderKind, path: &std::path::Path) -> BridgeSettings {
        let mut settings = TestFixtures::settings(provider);
        settings.firebase.service_account_path_env = None;
        settings.firebase.service_account_path = Some(path.display().to_string());
        settings
    }

    #[test]
    fn test_creates_service_for_each_provider() {
        let account = service_account_file();
        for provider in [ProviderKind::Kakao, ProviderKind::Naver, ProviderKind::Line] {
            let settings = settings_with_account(provider, account.path());
            let service = BridgeServiceFactory::create_exchange_service(&settings).unwrap();
            assert_eq!(service.provider(), provider);
        }
    }

    #[test]
    fn test_line_source_is_unverified() {
        let settings = TestFixtures::settings(ProviderKind::Line);
        let source = BridgeServiceFactory::create_profile_source(&settings).unwrap();
        assert!(!source.is_verified());

        let settings = TestFixtures::settings(ProviderKind::Kakao);
        let source = BridgeServiceFactory::create_profile_source(&settings).unwrap();
        assert!(source.is_verified());
    }

    #[test]
    fn test_missing_service_account_is_an_error() {
        let mut settings = TestFixtures::settings(ProviderKind::Kakao);
        settings.firebase.service_account_path_env = None;
        settings.firebase.service_account_path = None;
        assert!(BridgeServiceFactory::create_exchange_service(&settings).is_err());
    }

    #[test]
    fn test_firebase_backend_takes_project_from_account() {
        let account_file = service_account_file();
        let mut settings = settings_with_account(ProviderKind::Naver, account_file.path());
        settings.identity.backend = IdentityBackend::Firebase;

        let account = ServiceAccount::from_file(account_file.path()).unwrap();
        assert!(BridgeServiceFactory::create_identity_store(&settings, &account).is_ok());
    }

    #[test]
    fn test_invalid_profile_endpoint_is_an_error() {
        let mut settings = TestFixtures::settings(ProviderKind::Naver);
        settings.provider.profile_endpoint = Some("not a url".to_string());
        assert!(BridgeServiceFactory::create_profile_source(&settings).is_err());
    }
}
