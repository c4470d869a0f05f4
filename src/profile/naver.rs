// Naver `/v1/nid/me` payloads
use super::id_from_value;
use crate::error::{BridgeError, FetchError};
use crate::models::ProviderProfile;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct NaverEnvelope {
    resultcode: Option<String>,
    message: Option<String>,
    response: Option<NaverUser>,
}

#[derive(Debug, Deserialize)]
struct NaverUser {
    id: Option<Value>,
    email: Option<String>,
    nickname: Option<String>,
    profile_image: Option<String>,
}

/// Map a Naver profile envelope to a profile
///
/// # Errors
///
/// - `InvalidProfile` if the envelope is malformed or reports an API error
/// - `ProfileMissingIdentifier` if the user object has no `id`
pub fn parse_profile(body: &Value) -> Result<ProviderProfile, BridgeError> {
    let envelope: NaverEnvelope = serde_json::from_value(body.clone())
        .map_err(|e| FetchError::InvalidProfile(format!("Unexpected Naver payload: {e}")))?;

    let Some(user) = envelope.response else {
        return Err(FetchError::InvalidProfile(format!(
            "Naver returned resultcode {}: {}",
            envelope.resultcode.as_deref().unwrap_or("?"),
            envelope.message.as_deref().unwrap_or("no response object")
        ))
        .into());
    };

    let external_id =
        id_from_value(user.id.as_ref()).ok_or(BridgeError::ProfileMissingIdentifier)?;

    Ok(ProviderProfile::new(
        external_id,
        user.email.as_deref(),
        user.nickname.as_deref(),
        user.profile_image.as_deref(),
    ))
}
