use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

/// Social-login provider served by a bridge instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Kakao,
    Naver,
    Line,
}

impl ProviderKind {
    /// Prefix used when building internal user keys (`<tag>:<external id>`)
    #[must_use]
    pub fn key_tag(self) -> &'static str {
        match self {
            Self::Kakao => "kakao",
            Self::Naver => "Naver",
            Self::Line => "line",
        }
    }

    /// Value written to the `provider` field of records and token claims
    #[must_use]
    pub fn claim(self) -> &'static str {
        match self {
            Self::Kakao => "KAKAO",
            Self::Naver => "Naver",
            Self::Line => "LINE",
        }
    }

    /// "Who am I" endpoint of the provider; `None` for providers without verification
    #[must_use]
    pub fn default_profile_endpoint(self) -> Option<&'static str> {
        match self {
            Self::Kakao => Some("https://kapi.kakao.com/v2/user/me"),
            Self::Naver => Some("https://openapi.naver.com/v1/nid/me"),
            Self::Line => None,
        }
    }

    /// Plain-text body of the liveness endpoint
    #[must_use]
    pub fn liveness_message(self) -> &'static str {
        match self {
            Self::Kakao => "KakaoLoginServer for Firebase is up and running!",
            Self::Naver => "NaverLoginServer for Firebase is up and running!",
            Self::Line => "LINEserver for Firebase is up and running!",
        }
    }

    /// Key scheme used when the configuration does not choose one
    #[must_use]
    pub fn default_key_scheme(self) -> KeyScheme {
        match self {
            Self::Kakao => KeyScheme::Suffixed,
            Self::Naver | Self::Line => KeyScheme::Deterministic,
        }
    }

    /// Deterministic internal key for an external identifier
    #[must_use]
    pub fn internal_key(self, external_id: &str) -> String {
        format!("{}:{external_id}", self.key_tag())
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Kakao => "kakao",
            Self::Naver => "naver",
            Self::Line => "line",
        };
        f.write_str(name)
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "kakao" => Ok(Self::Kakao),
            "naver" => Ok(Self::Naver),
            "line" => Ok(Self::Line),
            other => Err(format!("Unsupported provider: {other}")),
        }
    }
}

/// How internal user keys are derived from external identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyScheme {
    /// `<tag>:<external id>`, looked up directly
    Deterministic,
    /// `<tag>:<external id><random 0..=1000000>`, found again by prefix match.
    /// Not collision-proof and racy on concurrent first logins.
    Suffixed,
}

impl FromStr for KeyScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "deterministic" => Ok(Self::Deterministic),
            "suffixed" => Ok(Self::Suffixed),
            other => Err(format!("Unsupported key scheme: {other}")),
        }
    }
}

/// Identity reported by (or, for unverified providers, claimed on behalf of) a provider.
/// Lives for a single request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderProfile {
    pub external_id: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
}

impl ProviderProfile {
    /// Build a profile, treating empty optional values as absent
    #[must_use]
    pub fn new(
        external_id: impl Into<String>,
        email: Option<&str>,
        display_name: Option<&str>,
        photo_url: Option<&str>,
    ) -> Self {
        Self {
            external_id: external_id.into(),
            email: non_empty(email),
            display_name: non_empty(display_name),
            photo_url: non_empty(photo_url),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
}

/// Fields written to an identity record on create or update.
/// `None` means "leave untouched" on update and "omit" on create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserFields {
    pub provider: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl UserFields {
    #[must_use]
    pub fn from_profile(provider: ProviderKind, profile: &ProviderProfile) -> Self {
        Self {
            provider: provider.claim().to_string(),
            display_name: profile.display_name.clone(),
            photo_url: profile.photo_url.clone(),
            email: profile.email.clone(),
        }
    }
}

/// A user record as held by the identity store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityRecord {
    pub uid: String,
    pub provider: Option<String>,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    pub email: Option<String>,
}

impl IdentityRecord {
    /// New record created from the given fields
    #[must_use]
    pub fn from_fields(uid: &str, fields: &UserFields) -> Self {
        Self {
            uid: uid.to_string(),
            provider: Some(fields.provider.clone()),
            display_name: fields.display_name.clone(),
            photo_url: fields.photo_url.clone(),
            email: fields.email.clone(),
        }
    }

    /// Overwrite only the fields that carry a value; nothing is ever cleared
    pub fn apply(&mut self, fields: &UserFields) {
        self.provider = Some(fields.provider.clone());
        if let Some(display_name) = &fields.display_name {
            self.display_name = Some(display_name.clone());
        }
        if let Some(photo_url) = &fields.photo_url {
            self.photo_url = Some(photo_url.clone());
        }
        if let Some(email) = &fields.email {
            self.email = Some(email.clone());
        }
    }
}

/// Developer claims embedded in minted tokens
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomClaims {
    pub provider: String,
}

impl CustomClaims {
    #[must_use]
    pub fn for_provider(provider: ProviderKind) -> Self {
        Self {
            provider: provider.claim().to_string(),
        }
    }
}

/// Body of `POST /verifyToken`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VerifyTokenRequest {
    /// Provider access token; for unverified providers only its truthiness matters
    #[serde(default)]
    pub token: Option<Value>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, rename = "displayName")]
    pub display_name: Option<String>,
}

impl VerifyTokenRequest {
    /// The token as a bearer credential
    ///
    /// Non-empty strings are used as is and non-zero numbers in decimal form.
    /// Booleans, arrays and objects never make a usable credential.
    #[must_use]
    pub fn bearer_token(&self) -> Option<Cow<'_, str>> {
        match &self.token {
            Some(Value::String(token)) if !token.is_empty() => Some(Cow::Borrowed(token)),
            Some(Value::Number(n)) if self.has_truthy_token() => Some(Cow::Owned(n.to_string())),
            _ => None,
        }
    }

    /// Whether the token is present and truthy in the loose JSON sense
    /// (non-empty string, non-zero number, `true`, array or object)
    #[must_use]
    pub fn has_truthy_token(&self) -> bool {
        match &self.token {
            None | Some(Value::Null | Value::Bool(false)) => false,
            Some(Value::String(s)) => !s.is_empty(),
            Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
            Some(Value::Bool(true) | Value::Array(_) | Value::Object(_)) => true,
        }
    }
}

/// Successful response of `POST /verifyToken`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyTokenResponse {
    pub firebase_token: String,
}

/// Error body for a missing token, kept in the shape clients already parse
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}
