// LINE profiles are claimed by the caller, not fetched
use crate::models::{ProviderProfile, VerifyTokenRequest};
use crate::utils::crypto::generate_alphanumeric_id;

/// Length of the identifier synthesized for every LINE login
pub const SYNTHESIZED_ID_LENGTH: usize = 20;

/// Build a profile from request fields with a freshly synthesized identifier.
///
/// Nothing here proves the caller controls the claimed identity, and the
/// identifier is new on every call.
#[must_use]
pub fn claimed_profile(request: &VerifyTokenRequest, photo_url: &str) -> ProviderProfile {
    ProviderProfile::new(
        generate_alphanumeric_id(SYNTHESIZED_ID_LENGTH),
        request.email.as_deref(),
        request.display_name.as_deref(),
        Some(photo_url),
    )
}
