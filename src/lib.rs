#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

/// Version of the socialbridge application
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod error;
pub mod factory;
pub mod handlers;
pub mod identity;
pub mod models;
pub mod profile;
pub mod reconciler;
pub mod service;
pub mod settings;
pub mod utils;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

/// Re-export commonly used items
pub use error::BridgeError;
pub use factory::BridgeServiceFactory;
pub use handlers::{configure_services, liveness, verify_token};
pub use models::{KeyScheme, ProviderKind};
pub use reconciler::IdentityReconciler;
pub use service::TokenExchangeService;
pub use settings::BridgeSettings;
