//! Unified testing utilities for the token bridge
//!
//! Shared by unit tests and, through the `testing` feature, by the
//! integration tests under `tests/`.
//!
//! ## Organization
//!
//! - [`fixtures`] - Canned provider payloads, a test signing key and wired pipelines
//! - [`mock`] - Recording doubles for the fetcher, identity store and minter
//! - [`assertions`] - Assertion helpers for HTTP responses and tokens
//!
//! ## Usage
//!
//! ```rust
//! use socialbridge::models::ProviderKind;
//! use socialbridge::testing::{mock::{MockProfileFetcher, RecordingIdentityStore}, TestFixtures};
//! use std::sync::Arc;
//!
//! let store = Arc::new(RecordingIdentityStore::new());
//! let (service, minter) = TestFixtures::exchange_service_with_minter(
//!     ProviderKind::Kakao,
//!     MockProfileFetcher::returning(TestFixtures::kakao_profile(123)),
//!     store.clone(),
//! );
//! ```

pub mod assertions;
pub mod fixtures;
pub mod mock;

pub use assertions::*;
pub use fixtures::TestFixtures;
