// Integration tests for identity reconciliation across the three providers
use serde_json::json;
use socialbridge::error::{BridgeError, StoreError};
use socialbridge::identity::{IdentityStore, InMemoryIdentityStore};
use socialbridge::models::{
    IdentityRecord, KeyScheme, ProviderKind, ProviderProfile, UserFields, VerifyTokenRequest,
};
use socialbridge::reconciler::IdentityReconciler;
use socialbridge::testing::mock::{MockProfileFetcher, RecordingIdentityStore, StoreCall};
use socialbridge::testing::TestFixtures;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

fn request(value: serde_json::Value) -> VerifyTokenRequest {
    serde_json::from_value(value).unwrap()
}

#[actix_web::test]
async fn test_naver_returning_user_keeps_deterministic_key() {
    let store = Arc::new(RecordingIdentityStore::new());
    let (service, minter) = TestFixtures::exchange_service_with_minter(
        ProviderKind::Naver,
        MockProfileFetcher::returning(TestFixtures::naver_profile("32742776")),
        store.clone(),
    );

    let first = service.exchange(&request(json!({"token": "t1"}))).await.unwrap();
    let second = service.exchange(&request(json!({"token": "t2"}))).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(
        minter.minted_uids(),
        vec!["Naver:32742776".to_string(), "Naver:32742776".to_string()]
    );
    assert_eq!(store.inner().keys(), vec!["Naver:32742776".to_string()]);
    assert_eq!(store.create_count(), 1);
    // Second login goes straight to a successful update
    assert_eq!(
        store.calls()[2..],
        [StoreCall::Update("Naver:32742776".into())]
    );
}

#[actix_web::test]
async fn test_kakao_returning_user_resolves_to_stored_suffixed_key() {
    let store = Arc::new(InMemoryIdentityStore::new());
    let reconciler =
        IdentityReconciler::new(ProviderKind::Kakao, KeyScheme::Suffixed, store.clone())
            .with_suffix_source(|| 482_910);
    let profile = ProviderProfile::new("123", Some("ryan@kakao.com"), Some("Ryan"), None);

    let first = reconciler.reconcile(&profile).await.unwrap();
    assert!(first.created);
    assert_eq!(first.uid(), "kakao:123482910");

    // A different suffix draw must not matter on the second login
    let reconciler =
        IdentityReconciler::new(ProviderKind::Kakao, KeyScheme::Suffixed, store.clone())
            .with_suffix_source(|| 7);
    let second = reconciler.reconcile(&profile).await.unwrap();

    assert!(!second.created);
    assert_eq!(second.uid(), "kakao:123482910");
    assert_eq!(store.len(), 1);
}

#[actix_web::test]
async fn test_kakao_pipeline_mints_against_stored_key() {
    let existing = IdentityRecord {
        uid: "kakao:123482910".to_string(),
        provider: Some("KAKAO".to_string()),
        display_name: Some("Ryan".to_string()),
        photo_url: None,
        email: None,
    };
    let store = Arc::new(RecordingIdentityStore::with_records([existing]));
    let (service, minter) = TestFixtures::exchange_service_with_minter(
        ProviderKind::Kakao,
        MockProfileFetcher::returning(TestFixtures::kakao_profile(123)),
        store.clone(),
    );

    let token = service
        .exchange(&request(json!({"token": "kakao-token"})))
        .await
        .unwrap();

    assert_eq!(token, "token-for:kakao:123482910");
    assert_eq!(minter.minted_uids(), vec!["kakao:123482910".to_string()]);
    assert_eq!(
        store.calls(),
        vec![
            StoreCall::FindPrefix("kakao:123".into()),
            StoreCall::Update("kakao:123482910".into())
        ]
    );
    let record = store.inner().get("kakao:123482910").unwrap();
    assert_eq!(record.email.as_deref(), Some("ryan@kakao.com"));
}

#[actix_web::test]
async fn test_line_identical_claims_create_distinct_records() {
    let store = Arc::new(InMemoryIdentityStore::new());
    let (service, minter) = TestFixtures::exchange_service_with_minter(
        ProviderKind::Line,
        MockProfileFetcher::returning(json!({})),
        store.clone(),
    );
    let body = json!({"token": "x", "email": "brown@line.me", "displayName": "Brown"});

    service.exchange(&request(body.clone())).await.unwrap();
    service.exchange(&request(body)).await.unwrap();

    let uids = minter.minted_uids();
    assert_eq!(uids.len(), 2);
    assert_ne!(uids[0], uids[1]);
    assert!(uids.iter().all(|uid| uid.starts_with("line:")));
    assert_eq!(store.len(), 2);
    for uid in &uids {
        let record = store.get(uid).unwrap();
        assert_eq!(record.email.as_deref(), Some("brown@line.me"));
        assert_eq!(record.provider.as_deref(), Some("LINE"));
        assert!(record.photo_url.is_some());
    }
}

#[actix_web::test]
async fn test_non_not_found_update_failure_skips_create() {
    let store = Arc::new(
        RecordingIdentityStore::new()
            .failing_updates_with(StoreError::Other("permission denied".into())),
    );
    let (service, minter) = TestFixtures::exchange_service_with_minter(
        ProviderKind::Naver,
        MockProfileFetcher::returning(TestFixtures::naver_profile("1")),
        store.clone(),
    );

    let err = service
        .exchange(&request(json!({"token": "t"})))
        .await
        .unwrap_err();

    assert!(matches!(err, BridgeError::Store(StoreError::Other(_))));
    assert_eq!(store.calls(), vec![StoreCall::Update("Naver:1".into())]);
    assert!(minter.minted_uids().is_empty());
}

#[actix_web::test]
async fn test_create_conflict_propagates() {
    let store = Arc::new(
        RecordingIdentityStore::new()
            .failing_creates_with(StoreError::AlreadyExists("Naver:1".into())),
    );
    let (service, _minter) = TestFixtures::exchange_service_with_minter(
        ProviderKind::Naver,
        MockProfileFetcher::returning(TestFixtures::naver_profile("1")),
        store,
    );

    let err = service
        .exchange(&request(json!({"token": "t"})))
        .await
        .unwrap_err();
    assert!(matches!(err, BridgeError::Store(StoreError::AlreadyExists(_))));
}

#[actix_web::test]
async fn test_profile_without_email_stores_no_email() {
    let store = Arc::new(InMemoryIdentityStore::new());
    let (service, _minter) = TestFixtures::exchange_service_with_minter(
        ProviderKind::Kakao,
        MockProfileFetcher::returning(json!({"id": 55, "properties": {"nickname": "Muzi"}})),
        store.clone(),
    );

    service.exchange(&request(json!({"token": "t"}))).await.unwrap();

    let keys = store.keys();
    assert_eq!(keys.len(), 1);
    let record = store.get(&keys[0]).unwrap();
    assert_eq!(record.email, None);
    assert_eq!(record.display_name.as_deref(), Some("Muzi"));

    let fields = UserFields::from_profile(
        ProviderKind::Kakao,
        &ProviderProfile::new("55", None, Some("Muzi"), None),
    );
    let payload = serde_json::to_value(&fields).unwrap();
    assert!(payload.get("email").is_none());
    assert!(payload.get("photo_url").is_none());
}

#[actix_web::test]
async fn test_kakao_concurrent_first_logins_can_create_two_records() {
    // Both logins scan before either creates, so neither sees the other's record
    let store = Arc::new(RecordingIdentityStore::new().with_stale_scans());
    let draws = Arc::new(AtomicU32::new(100));
    let next_suffix = {
        let draws = draws.clone();
        move || draws.fetch_add(1, Ordering::SeqCst)
    };
    let reconciler =
        IdentityReconciler::new(ProviderKind::Kakao, KeyScheme::Suffixed, store.clone())
            .with_suffix_source(next_suffix);
    let profile = ProviderProfile::new("123", None, Some("Ryan"), None);

    let first = reconciler.reconcile(&profile).await.unwrap();
    let second = reconciler.reconcile(&profile).await.unwrap();

    assert!(first.created && second.created);
    assert_eq!(first.uid(), "kakao:123100");
    assert_eq!(second.uid(), "kakao:123101");
    assert_eq!(store.inner().len(), 2);
}

#[actix_web::test]
async fn test_deterministic_kakao_scheme_avoids_the_race() {
    let store = Arc::new(RecordingIdentityStore::new().with_stale_scans());
    let reconciler =
        IdentityReconciler::new(ProviderKind::Kakao, KeyScheme::Deterministic, store.clone());
    let profile = ProviderProfile::new("123", None, None, None);

    let first = reconciler.reconcile(&profile).await.unwrap();
    let second = reconciler.reconcile(&profile).await.unwrap();

    assert_eq!(first.uid(), "kakao:123");
    assert_eq!(second.uid(), "kakao:123");
    assert_eq!(store.inner().len(), 1);
    assert!(!store
        .calls()
        .iter()
        .any(|call| matches!(call, StoreCall::FindPrefix(_))));
}

#[actix_web::test]
async fn test_in_memory_store_contract() {
    let store = InMemoryIdentityStore::new();
    let fields = UserFields {
        provider: "Naver".to_string(),
        display_name: None,
        photo_url: None,
        email: None,
    };

    assert!(matches!(
        store.update_user("Naver:9", &fields).await,
        Err(StoreError::RecordNotFound(_))
    ));
    store.create_user("Naver:9", &fields).await.unwrap();
    assert!(matches!(
        store.create_user("Naver:9", &fields).await,
        Err(StoreError::AlreadyExists(_))
    ));
    assert!(store.find_by_key_prefix("Naver:").await.unwrap().is_some());
}
