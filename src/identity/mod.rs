//! Identity store and token minting seams
//!
//! The reconciler only talks to these traits. [`memory`] backs local runs and
//! tests, [`firebase`] talks to the Identity Toolkit REST API.

pub mod firebase;
pub mod memory;
pub mod minter;

pub use firebase::{FirebaseIdentityStore, ServiceAccount};
pub use memory::InMemoryIdentityStore;
pub use minter::FirebaseTokenMinter;

use crate::error::{MintError, StoreError};
use crate::models::{CustomClaims, IdentityRecord, UserFields};
use async_trait::async_trait;

/// User records keyed by internal user key
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Update the record stored under `uid`
    ///
    /// # Errors
    ///
    /// Returns `RecordNotFound` if no record exists under `uid`
    async fn update_user(&self, uid: &str, fields: &UserFields)
        -> Result<IdentityRecord, StoreError>;

    /// Create a record under `uid`
    ///
    /// # Errors
    ///
    /// Returns `AlreadyExists` if a record already exists under `uid`
    async fn create_user(&self, uid: &str, fields: &UserFields)
        -> Result<IdentityRecord, StoreError>;

    /// First record whose key starts with `prefix`, in key order
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be scanned
    async fn find_by_key_prefix(&self, prefix: &str)
        -> Result<Option<IdentityRecord>, StoreError>;
}

/// Signs custom tokens the client exchanges for a Firebase session
#[async_trait]
pub trait TokenMinter: Send + Sync {
    /// Mint a token for `uid` carrying `claims`
    ///
    /// # Errors
    ///
    /// Returns `InvalidSubject` for an unusable uid and `Signing` if signing fails
    async fn mint_token(&self, uid: &str, claims: &CustomClaims) -> Result<String, MintError>;
}
