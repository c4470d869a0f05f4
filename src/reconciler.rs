//! Identity Reconciler
//!
//! Maps a [`ProviderProfile`] to exactly one identity record, creating it when
//! absent. Two key schemes exist:
//!
//! - **Deterministic**: the key is `"<tag>:<externalId>"`. Update it, and
//!   create it only if the update reports that no record exists.
//! - **Suffixed**: records were created as `"<tag>:<externalId><random>"`, so
//!   the key cannot be recomputed. Returning users are found by a prefix scan;
//!   new users get a fresh random suffix. The scan is not isolated from
//!   concurrent logins, so two first logins for the same person can both miss
//!   it and create two records. A prefix also matches longer identifiers
//!   (`kakao:12` matches `kakao:123...`).

use crate::error::{BridgeError, StoreError};
use crate::identity::IdentityStore;
use crate::models::{IdentityRecord, KeyScheme, ProviderKind, ProviderProfile, UserFields};
use crate::utils::crypto::generate_key_suffix;
use crate::utils::logging::LoggingHelper;
use std::sync::Arc;

/// Source of random key suffixes for the suffixed scheme
pub type SuffixSource = Box<dyn Fn() -> u32 + Send + Sync>;

/// Outcome of reconciling one profile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// The record as stored; its `uid` is the resolved key
    pub record: IdentityRecord,
    /// Whether the record was created by this call
    pub created: bool,
}

impl Resolution {
    #[must_use]
    pub fn uid(&self) -> &str {
        &self.record.uid
    }
}

pub struct IdentityReconciler {
    provider: ProviderKind,
    scheme: KeyScheme,
    store: Arc<dyn IdentityStore>,
    suffix_source: SuffixSource,
}

impl std::fmt::Debug for IdentityReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityReconciler")
            .field("provider", &self.provider)
            .field("scheme", &self.scheme)
            .finish_non_exhaustive()
    }
}

impl IdentityReconciler {
    #[must_use]
    pub fn new(provider: ProviderKind, scheme: KeyScheme, store: Arc<dyn IdentityStore>) -> Self {
        Self {
            provider,
            scheme,
            store,
            suffix_source: Box::new(generate_key_suffix),
        }
    }

    /// Replace the random suffix generator
    #[must_use]
    pub fn with_suffix_source(mut self, source: impl Fn() -> u32 + Send + Sync + 'static) -> Self {
        self.suffix_source = Box::new(source);
        self
    }

    #[must_use]
    pub fn provider(&self) -> ProviderKind {
        self.provider
    }

    #[must_use]
    pub fn scheme(&self) -> KeyScheme {
        self.scheme
    }

    /// Resolve the profile to a stored record, creating or updating it
    ///
    /// # Errors
    ///
    /// - `ProfileMissingIdentifier` if the profile has an empty external id
    /// - `Store` for any store failure other than the not-found that drives creation
    pub async fn reconcile(&self, profile: &ProviderProfile) -> Result<Resolution, BridgeError> {
        if profile.external_id.trim().is_empty() {
            return Err(BridgeError::ProfileMissingIdentifier);
        }

        let fields = UserFields::from_profile(self.provider, profile);
        let candidate = self.provider.internal_key(&profile.external_id);

        let resolution = match self.scheme {
            KeyScheme::Deterministic => self.update_or_create(&candidate, &fields).await?,
            KeyScheme::Suffixed => {
                let key = match self.store.find_by_key_prefix(&candidate).await? {
                    Some(existing) => existing.uid,
                    None => format!("{candidate}{}", (self.suffix_source)()),
                };
                self.update_or_create(&key, &fields).await?
            }
        };

        LoggingHelper::log_key_resolved(resolution.uid(), !resolution.created);
        Ok(resolution)
    }

    /// Update the record at `key`, creating it only when the store reports it missing
    async fn update_or_create(
        &self,
        key: &str,
        fields: &UserFields,
    ) -> Result<Resolution, StoreError> {
        match self.store.update_user(key, fields).await {
            Ok(record) => Ok(Resolution {
                record,
                created: false,
            }),
            Err(StoreError::RecordNotFound(_)) => {
                LoggingHelper::log_create_path(key);
                let record = self.store.create_user(key, fields).await?;
                Ok(Resolution {
                    record,
                    created: true,
                })
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::InMemoryIdentityStore;
    use crate::testing::mock::{RecordingIdentityStore, StoreCall};

    fn profile(id: &str, name: Option<&str>, photo: Option<&str>) -> ProviderProfile {
        ProviderProfile::new(id, None, name, photo)
    }

    #[actix_web::test]
    async fn test_deterministic_first_login_creates() {
        let store = Arc::new(RecordingIdentityStore::new());
        let reconciler =
            IdentityReconciler::new(ProviderKind::Naver, KeyScheme::Deterministic, store.clone());

        let resolution = reconciler
            .reconcile(&profile("abc", Some("Kim"), None))
            .await
            .unwrap();

        assert!(resolution.created);
        assert_eq!(resolution.uid(), "Naver:abc");
        assert_eq!(resolution.record.provider.as_deref(), Some("Naver"));
        assert_eq!(
            store.calls(),
            vec![
                StoreCall::Update("Naver:abc".into()),
                StoreCall::Create("Naver:abc".into())
            ]
        );
    }

    #[actix_web::test]
    async fn test_deterministic_returning_login_updates_only() {
        let store = Arc::new(RecordingIdentityStore::new());
        let reconciler =
            IdentityReconciler::new(ProviderKind::Kakao, KeyScheme::Deterministic, store.clone());

        reconciler
            .reconcile(&profile("7", Some("Old"), Some("http://old")))
            .await
            .unwrap();
        let second = reconciler
            .reconcile(&profile("7", Some("New"), None))
            .await
            .unwrap();

        assert!(!second.created);
        assert_eq!(second.uid(), "kakao:7");
        assert_eq!(second.record.display_name.as_deref(), Some("New"));
        assert_eq!(second.record.photo_url.as_deref(), Some("http://old"));
        assert_eq!(store.inner().len(), 1);
        assert_eq!(store.create_count(), 1);
    }

    #[actix_web::test]
    async fn test_other_update_failure_never_creates() {
        let store = Arc::new(
            RecordingIdentityStore::new()
                .failing_updates_with(StoreError::Other("quota exceeded".into())),
        );
        let reconciler =
            IdentityReconciler::new(ProviderKind::Naver, KeyScheme::Deterministic, store.clone());

        let err = reconciler
            .reconcile(&profile("abc", None, None))
            .await
            .unwrap_err();

        assert!(matches!(err, BridgeError::Store(StoreError::Other(_))));
        assert_eq!(store.create_count(), 0);
        assert!(store.inner().is_empty());
    }

    #[actix_web::test]
    async fn test_empty_identifier_is_rejected_before_store_access() {
        let store = Arc::new(RecordingIdentityStore::new());
        let reconciler =
            IdentityReconciler::new(ProviderKind::Kakao, KeyScheme::Suffixed, store.clone());

        let err = reconciler.reconcile(&profile("  ", None, None)).await.unwrap_err();
        assert!(matches!(err, BridgeError::ProfileMissingIdentifier));
        assert!(store.calls().is_empty());
    }

    #[actix_web::test]
    async fn test_suffixed_first_login_uses_fresh_suffix() {
        let store = Arc::new(RecordingIdentityStore::new());
        let reconciler =
            IdentityReconciler::new(ProviderKind::Kakao, KeyScheme::Suffixed, store.clone())
                .with_suffix_source(|| 482_910);

        let resolution = reconciler
            .reconcile(&profile("123", Some("Ryan"), None))
            .await
            .unwrap();

        assert!(resolution.created);
        assert_eq!(resolution.uid(), "kakao:123482910");
        assert_eq!(
            store.calls(),
            vec![
                StoreCall::FindPrefix("kakao:123".into()),
                StoreCall::Update("kakao:123482910".into()),
                StoreCall::Create("kakao:123482910".into())
            ]
        );
    }

    #[actix_web::test]
    async fn test_suffixed_returning_login_reuses_stored_key() {
        let store = Arc::new(RecordingIdentityStore::new());
        let reconciler =
            IdentityReconciler::new(ProviderKind::Kakao, KeyScheme::Suffixed, store.clone());

        let first = reconciler
            .reconcile(&profile("123", Some("Ryan"), None))
            .await
            .unwrap();
        let second = reconciler
            .reconcile(&profile("123", Some("Ryan Lion"), None))
            .await
            .unwrap();

        assert!(!second.created);
        assert_eq!(second.uid(), first.uid());
        assert_eq!(second.record.display_name.as_deref(), Some("Ryan Lion"));
        assert_eq!(store.inner().len(), 1);
    }

    #[actix_web::test]
    async fn test_suffixed_update_hit_on_fresh_key_is_used_as_is() {
        // A record already sits at the freshly drawn key but is invisible to the scan
        let existing = IdentityRecord {
            uid: "kakao:95".to_string(),
            provider: Some("KAKAO".to_string()),
            display_name: Some("Someone".to_string()),
            photo_url: None,
            email: None,
        };
        let store = Arc::new(
            RecordingIdentityStore::with_records([existing]).with_stale_scans(),
        );
        let reconciler =
            IdentityReconciler::new(ProviderKind::Kakao, KeyScheme::Suffixed, store.clone())
                .with_suffix_source(|| 5);

        let resolution = reconciler
            .reconcile(&profile("9", Some("Apeach"), None))
            .await
            .unwrap();

        assert!(!resolution.created);
        assert_eq!(resolution.uid(), "kakao:95");
        assert_eq!(store.create_count(), 0);
    }

    #[actix_web::test]
    async fn test_prefix_scan_matches_longer_identifiers() {
        let store = Arc::new(InMemoryIdentityStore::new());
        let reconciler =
            IdentityReconciler::new(ProviderKind::Kakao, KeyScheme::Suffixed, store.clone())
                .with_suffix_source(|| 1);

        let long = reconciler.reconcile(&profile("123", None, None)).await.unwrap();
        assert_eq!(long.uid(), "kakao:1231");

        // "12" is a prefix of the record created for "123"
        let short = reconciler.reconcile(&profile("12", None, None)).await.unwrap();
        assert_eq!(short.uid(), "kakao:1231");
        assert!(!short.created);
    }
}
