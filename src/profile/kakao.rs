// Kakao `/v2/user/me` payloads
use super::id_from_value;
use crate::error::BridgeError;
use crate::models::ProviderProfile;
use serde_json::Value;

/// Map a Kakao user payload to a profile.
///
/// Older accounts report `kaccount_email` and `properties.*`; newer ones use
/// `kakao_account.*`. The legacy fields win when both are present.
///
/// # Errors
///
/// Returns `ProfileMissingIdentifier` if the payload has no `id`
pub fn parse_profile(body: &Value) -> Result<ProviderProfile, BridgeError> {
    let external_id = id_from_value(body.get("id")).ok_or(BridgeError::ProfileMissingIdentifier)?;

    let account = body.get("kakao_account");
    let account_profile = account.and_then(|a| a.get("profile"));
    let properties = body.get("properties");

    let email = str_at(Some(body), "kaccount_email").or_else(|| str_at(account, "email"));
    let nickname = str_at(properties, "nickname").or_else(|| str_at(account_profile, "nickname"));
    let photo = str_at(properties, "profile_image")
        .or_else(|| str_at(account_profile, "profile_image_url"));

    Ok(ProviderProfile::new(external_id, email, nickname, photo))
}

fn str_at<'a>(value: Option<&'a Value>, key: &str) -> Option<&'a str> {
    value?
        .get(key)?
        .as_str()
        .filter(|s| !s.trim().is_empty())
}
