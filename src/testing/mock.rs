//! Mock objects and fake implementations for testing
//!
//! Test doubles for the three pipeline seams: profile fetching, the identity
//! store and token minting. Each records what it was asked to do.

use crate::error::{FetchError, MintError, StoreError};
use crate::identity::{IdentityStore, InMemoryIdentityStore, TokenMinter};
use crate::models::{CustomClaims, IdentityRecord, UserFields};
use crate::profile::ProfileFetcher;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Profile fetcher returning a canned response
pub struct MockProfileFetcher {
    response: Result<Value, FetchError>,
    calls: AtomicUsize,
    last_token: Mutex<Option<String>>,
}

impl MockProfileFetcher {
    /// Fetcher that answers every call with `body`
    #[must_use]
    pub fn returning(body: Value) -> Self {
        Self {
            response: Ok(body),
            calls: AtomicUsize::new(0),
            last_token: Mutex::new(None),
        }
    }

    /// Fetcher that fails every call with `error`
    #[must_use]
    pub fn failing(error: FetchError) -> Self {
        Self {
            response: Err(error),
            calls: AtomicUsize::new(0),
            last_token: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// # Panics
    ///
    /// Panics if the mutex is poisoned
    #[must_use]
    pub fn last_token(&self) -> Option<String> {
        self.last_token.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProfileFetcher for MockProfileFetcher {
    async fn fetch_profile(&self, access_token: &str) -> Result<Value, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_token.lock().unwrap() = Some(access_token.to_string());
        self.response.clone()
    }
}

/// A single call made against a [`RecordingIdentityStore`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Update(String),
    Create(String),
    FindPrefix(String),
}

/// In-memory store that records calls and can inject failures
///
/// With stale scans enabled, prefix lookups always miss. This reproduces two
/// concurrent first logins that both scanned before either created a record.
#[derive(Default)]
pub struct RecordingIdentityStore {
    inner: InMemoryIdentityStore,
    calls: Mutex<Vec<StoreCall>>,
    update_failure: Option<StoreError>,
    create_failure: Option<StoreError>,
    stale_scans: bool,
}

impl RecordingIdentityStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_records(records: impl IntoIterator<Item = IdentityRecord>) -> Self {
        Self {
            inner: InMemoryIdentityStore::with_records(records),
            ..Self::default()
        }
    }

    /// Fail every update with `error` instead of touching the records
    #[must_use]
    pub fn failing_updates_with(mut self, error: StoreError) -> Self {
        self.update_failure = Some(error);
        self
    }

    /// Fail every create with `error`
    #[must_use]
    pub fn failing_creates_with(mut self, error: StoreError) -> Self {
        self.create_failure = Some(error);
        self
    }

    /// Make prefix lookups miss regardless of stored records
    #[must_use]
    pub fn with_stale_scans(mut self) -> Self {
        self.stale_scans = true;
        self
    }

    #[must_use]
    pub fn inner(&self) -> &InMemoryIdentityStore {
        &self.inner
    }

    /// # Panics
    ///
    /// Panics if the mutex is poisoned
    #[must_use]
    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().unwrap().clone()
    }

    #[must_use]
    pub fn create_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, StoreCall::Create(_)))
            .count()
    }

    fn record(&self, call: StoreCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl IdentityStore for RecordingIdentityStore {
    async fn update_user(
        &self,
        uid: &str,
        fields: &UserFields,
    ) -> Result<IdentityRecord, StoreError> {
        self.record(StoreCall::Update(uid.to_string()));
        if let Some(error) = &self.update_failure {
            return Err(error.clone());
        }
        self.inner.update_user(uid, fields).await
    }

    async fn create_user(
        &self,
        uid: &str,
        fields: &UserFields,
    ) -> Result<IdentityRecord, StoreError> {
        self.record(StoreCall::Create(uid.to_string()));
        if let Some(error) = &self.create_failure {
            return Err(error.clone());
        }
        self.inner.create_user(uid, fields).await
    }

    async fn find_by_key_prefix(
        &self,
        prefix: &str,
    ) -> Result<Option<IdentityRecord>, StoreError> {
        self.record(StoreCall::FindPrefix(prefix.to_string()));
        if self.stale_scans {
            return Ok(None);
        }
        self.inner.find_by_key_prefix(prefix).await
    }
}

/// Token minter producing readable fake tokens of the form `token-for:<uid>`
#[derive(Default)]
pub struct MockTokenMinter {
    failure: Option<MintError>,
    minted: Mutex<Vec<(String, CustomClaims)>>,
}

impl MockTokenMinter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn failing(error: MintError) -> Self {
        Self {
            failure: Some(error),
            ..Self::default()
        }
    }

    /// # Panics
    ///
    /// Panics if the mutex is poisoned
    #[must_use]
    pub fn minted_uids(&self) -> Vec<String> {
        self.minted
            .lock()
            .unwrap()
            .iter()
            .map(|(uid, _)| uid.clone())
            .collect()
    }

    /// # Panics
    ///
    /// Panics if the mutex is poisoned
    #[must_use]
    pub fn last_claims(&self) -> Option<CustomClaims> {
        self.minted
            .lock()
            .unwrap()
            .last()
            .map(|(_, claims)| claims.clone())
    }
}

#[async_trait]
impl TokenMinter for MockTokenMinter {
    async fn mint_token(&self, uid: &str, claims: &CustomClaims) -> Result<String, MintError> {
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        self.minted
            .lock()
            .unwrap()
            .push((uid.to_string(), claims.clone()));
        Ok(format!("token-for:{uid}"))
    }
}
