use super::IdentityStore;
use crate::error::StoreError;
use crate::models::{IdentityRecord, UserFields};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

/// Process-local identity store ordered by key
#[derive(Debug, Default)]
pub struct InMemoryIdentityStore {
    records: Mutex<BTreeMap<String, IdentityRecord>>,
}

impl InMemoryIdentityStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with existing records
    #[must_use]
    pub fn with_records(records: impl IntoIterator<Item = IdentityRecord>) -> Self {
        let records = records
            .into_iter()
            .map(|record| (record.uid.clone(), record))
            .collect();
        Self {
            records: Mutex::new(records),
        }
    }

    #[must_use]
    pub fn get(&self, uid: &str) -> Option<IdentityRecord> {
        self.lock().ok()?.get(uid).cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().map(|records| records.len()).unwrap_or_default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All keys in order
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.lock()
            .map(|records| records.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<String, IdentityRecord>>, StoreError> {
        self.records
            .lock()
            .map_err(|_| StoreError::Other("identity store lock poisoned".to_string()))
    }
}

#[async_trait]
impl IdentityStore for InMemoryIdentityStore {
    async fn update_user(
        &self,
        uid: &str,
        fields: &UserFields,
    ) -> Result<IdentityRecord, StoreError> {
        let mut records = self.lock()?;
        let record = records
            .get_mut(uid)
            .ok_or_else(|| StoreError::RecordNotFound(uid.to_string()))?;
        record.apply(fields);
        Ok(record.clone())
    }

    async fn create_user(
        &self,
        uid: &str,
        fields: &UserFields,
    ) -> Result<IdentityRecord, StoreError> {
        let mut records = self.lock()?;
        if records.contains_key(uid) {
            return Err(StoreError::AlreadyExists(uid.to_string()));
        }
        let record = IdentityRecord::from_fields(uid, fields);
        records.insert(uid.to_string(), record.clone());
        Ok(record)
    }

    async fn find_by_key_prefix(
        &self,
        prefix: &str,
    ) -> Result<Option<IdentityRecord>, StoreError> {
        let records = self.lock()?;
        Ok(records
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(_, record)| record.clone())
            .next())
    }
}
