//! Firebase Authentication via the Identity Toolkit REST API
//!
//! Requests are authorized with an OAuth access token obtained through the
//! service-account JWT-bearer grant. The token is cached until shortly before
//! it expires.

use super::IdentityStore;
use crate::error::StoreError;
use crate::models::{IdentityRecord, UserFields};
use crate::utils::crypto::Rs256Signer;
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

const OAUTH_SCOPES: &str = "https://www.googleapis.com/auth/identitytoolkit https://www.googleapis.com/auth/cloud-platform";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Cached access tokens are refreshed this long before they expire
const ACCESS_TOKEN_REFRESH_MARGIN_SECS: i64 = 60;
/// Upper bound on the lifetime trusted from a token response
const MAX_ACCESS_TOKEN_LIFETIME_SECS: i64 = 86_400;
const BATCH_GET_PAGE_SIZE: u32 = 1000;

/// Google service-account key file
#[derive(Clone, Deserialize)]
pub struct ServiceAccount {
    pub project_id: Option<String>,
    pub private_key_id: Option<String>,
    pub private_key: String,
    pub client_email: String,
    #[serde(default)]
    pub token_uri: Option<String>,
}

impl std::fmt::Debug for ServiceAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccount")
            .field("project_id", &self.project_id)
            .field("private_key_id", &self.private_key_id)
            .field("client_email", &self.client_email)
            .finish_non_exhaustive()
    }
}

impl ServiceAccount {
    /// Load a service-account key from a JSON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a service-account key
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read service account file {}", path.display()))?;
        Self::from_json(&content)
    }

    /// Parse a service-account key from JSON
    ///
    /// # Errors
    ///
    /// Returns an error if required fields are missing
    pub fn from_json(content: &str) -> anyhow::Result<Self> {
        let account: Self =
            serde_json::from_str(content).context("Failed to parse service account JSON")?;
        if account.client_email.is_empty() {
            return Err(anyhow!("Service account has an empty client_email"));
        }
        Ok(account)
    }

    /// Signer for assertions and custom tokens, keyed by `private_key_id`
    ///
    /// # Errors
    ///
    /// Returns an error if the private key is not a PKCS#8 RSA key
    pub fn signer(&self) -> anyhow::Result<Rs256Signer> {
        Rs256Signer::from_pkcs8_pem(&self.private_key, self.private_key_id.as_deref())
    }
}

#[derive(Debug, Clone)]
struct CachedAccessToken {
    token: String,
    refresh_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct AccessTokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// User resource as returned by Identity Toolkit
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FirebaseUser {
    local_id: Option<String>,
    display_name: Option<String>,
    photo_url: Option<String>,
    email: Option<String>,
    custom_attributes: Option<String>,
}

impl FirebaseUser {
    fn into_record(self, fallback_uid: &str) -> IdentityRecord {
        let provider = self
            .custom_attributes
            .as_deref()
            .and_then(|attrs| serde_json::from_str::<Value>(attrs).ok())
            .and_then(|attrs| attrs.get("provider")?.as_str().map(ToString::to_string));

        IdentityRecord {
            uid: self.local_id.unwrap_or_else(|| fallback_uid.to_string()),
            provider,
            display_name: self.display_name,
            photo_url: self.photo_url,
            email: self.email,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchGetResponse {
    #[serde(default)]
    users: Vec<FirebaseUser>,
    next_page_token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateAccountRequest<'a> {
    local_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    display_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    photo_url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<&'a str>,
    custom_attributes: String,
}

impl<'a> UpdateAccountRequest<'a> {
    fn from_fields(uid: &'a str, fields: &'a UserFields) -> Self {
        Self {
            local_id: uid,
            display_name: fields.display_name.as_deref(),
            photo_url: fields.photo_url.as_deref(),
            email: fields.email.as_deref(),
            custom_attributes: custom_attributes(fields),
        }
    }

    /// Update that only sets the provider attribute
    fn provider_only(uid: &'a str, fields: &UserFields) -> Self {
        Self {
            local_id: uid,
            display_name: None,
            photo_url: None,
            email: None,
            custom_attributes: custom_attributes(fields),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateAccountRequest<'a> {
    local_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    display_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    photo_url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<&'a str>,
}

/// Identity store backed by Firebase Authentication
pub struct FirebaseIdentityStore {
    client: reqwest::Client,
    project_id: String,
    base_url: String,
    token_uri: String,
    client_email: String,
    signer: Rs256Signer,
    access_token: Mutex<Option<CachedAccessToken>>,
}

impl std::fmt::Debug for FirebaseIdentityStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirebaseIdentityStore")
            .field("project_id", &self.project_id)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl FirebaseIdentityStore {
    /// Create a store for `project_id`
    ///
    /// # Errors
    ///
    /// Returns an error if the service-account key is unusable or the HTTP client cannot be built
    pub fn new(
        project_id: &str,
        account: &ServiceAccount,
        base_url: &str,
        default_token_uri: &str,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            project_id: project_id.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token_uri: account
                .token_uri
                .clone()
                .unwrap_or_else(|| default_token_uri.to_string()),
            client_email: account.client_email.clone(),
            signer: account.signer()?,
            access_token: Mutex::new(None),
        })
    }

    fn accounts_url(&self, suffix: &str) -> String {
        format!(
            "{}/v1/projects/{}/accounts{suffix}",
            self.base_url, self.project_id
        )
    }

    fn cached_access_token(&self) -> Option<String> {
        let cached = self.access_token.lock().ok()?;
        cached
            .as_ref()
            .filter(|c| Utc::now() < c.refresh_at)
            .map(|c| c.token.clone())
    }

    async fn access_token(&self) -> Result<String, StoreError> {
        if let Some(token) = self.cached_access_token() {
            return Ok(token);
        }

        let now = Utc::now().timestamp();
        let assertion = self
            .signer
            .create_jwt(&json!({
                "iss": self.client_email,
                "scope": OAUTH_SCOPES,
                "aud": self.token_uri,
                "iat": now,
                "exp": now + ASSERTION_LIFETIME_SECS,
            }))
            .map_err(|e| StoreError::Other(format!("Failed to sign token assertion: {e}")))?;

        let params = [("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())];
        let response = self
            .client
            .post(&self.token_uri)
            .form(&params)
            .send()
            .await
            .map_err(|e| StoreError::Other(format!("Access token request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Other(format!(
                "Access token request failed with status {status}: {body}"
            )));
        }

        let token: AccessTokenResponse = response
            .json()
            .await
            .map_err(|e| StoreError::Other(format!("Invalid access token response: {e}")))?;

        if let Ok(mut cached) = self.access_token.lock() {
            *cached = Some(CachedAccessToken {
                token: token.access_token.clone(),
                refresh_at: refresh_deadline(Utc::now(), token.expires_in),
            });
        }
        log::debug!("Obtained Identity Toolkit access token");

        Ok(token.access_token)
    }

    async fn send_json(
        &self,
        request: reqwest::RequestBuilder,
        uid: &str,
    ) -> Result<Value, StoreError> {
        let token = self.access_token().await?;
        let response = request
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| StoreError::Other(format!("Identity Toolkit request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| StoreError::Other(format!("Failed to read Identity Toolkit response: {e}")))?;

        if !status.is_success() {
            return Err(map_api_error(status.as_u16(), &body, uid));
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body)
            .map_err(|e| StoreError::Other(format!("Invalid Identity Toolkit response: {e}")))
    }
}

/// When a token obtained at `now` should be replaced
fn refresh_deadline(now: DateTime<Utc>, expires_in: Option<i64>) -> DateTime<Utc> {
    let lifetime = expires_in
        .unwrap_or(ASSERTION_LIFETIME_SECS)
        .clamp(ACCESS_TOKEN_REFRESH_MARGIN_SECS, MAX_ACCESS_TOKEN_LIFETIME_SECS);
    now + ChronoDuration::seconds(lifetime - ACCESS_TOKEN_REFRESH_MARGIN_SECS)
}

/// Map an Identity Toolkit error body to a store error
fn map_api_error(status: u16, body: &str, uid: &str) -> StoreError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("error")?.get("message")?.as_str().map(ToString::to_string))
        .unwrap_or_else(|| body.to_string());

    // Messages look like "USER_NOT_FOUND" or "INVALID_EMAIL : details"
    let code = message.split(|c: char| c == ' ' || c == ':').next().unwrap_or_default();
    match code {
        "USER_NOT_FOUND" => StoreError::RecordNotFound(uid.to_string()),
        "DUPLICATE_LOCAL_ID" => StoreError::AlreadyExists(uid.to_string()),
        _ => StoreError::Other(format!("Identity Toolkit returned {status}: {message}")),
    }
}

fn custom_attributes(fields: &UserFields) -> String {
    json!({ "provider": fields.provider }).to_string()
}

/// First user whose key starts with `prefix`, in key order
fn first_with_prefix(users: Vec<FirebaseUser>, prefix: &str) -> Option<FirebaseUser> {
    users
        .into_iter()
        .filter(|user| user.local_id.as_deref().is_some_and(|id| id.starts_with(prefix)))
        .min_by(|a, b| a.local_id.cmp(&b.local_id))
}

#[async_trait]
impl IdentityStore for FirebaseIdentityStore {
    async fn update_user(
        &self,
        uid: &str,
        fields: &UserFields,
    ) -> Result<IdentityRecord, StoreError> {
        let body = UpdateAccountRequest::from_fields(uid, fields);
        let request = self.client.post(self.accounts_url(":update")).json(&body);
        let response = self.send_json(request, uid).await?;

        let user: FirebaseUser = if response.is_null() {
            FirebaseUser::default()
        } else {
            serde_json::from_value(response)
                .map_err(|e| StoreError::Other(format!("Invalid accounts:update response: {e}")))?
        };
        let mut record = user.into_record(uid);
        record.apply(fields);
        Ok(record)
    }

    async fn create_user(
        &self,
        uid: &str,
        fields: &UserFields,
    ) -> Result<IdentityRecord, StoreError> {
        let body = CreateAccountRequest {
            local_id: uid,
            display_name: fields.display_name.as_deref(),
            photo_url: fields.photo_url.as_deref(),
            email: fields.email.as_deref(),
        };
        let request = self.client.post(self.accounts_url("")).json(&body);
        self.send_json(request, uid).await?;

        // Account creation has no customAttributes field
        let attributes = UpdateAccountRequest::provider_only(uid, fields);
        let request = self.client.post(self.accounts_url(":update")).json(&attributes);
        self.send_json(request, uid).await?;

        Ok(IdentityRecord::from_fields(uid, fields))
    }

    async fn find_by_key_prefix(
        &self,
        prefix: &str,
    ) -> Result<Option<IdentityRecord>, StoreError> {
        let mut matches = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![("maxResults", BATCH_GET_PAGE_SIZE.to_string())];
            if let Some(token) = &page_token {
                query.push(("nextPageToken", token.clone()));
            }
            let request = self
                .client
                .get(self.accounts_url(":batchGet"))
                .query(&query);
            let response = self.send_json(request, prefix).await?;
            let page: BatchGetResponse = serde_json::from_value(response)
                .map_err(|e| StoreError::Other(format!("Invalid batchGet response: {e}")))?;

            matches.extend(first_with_prefix(page.users, prefix));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(first_with_prefix(matches, prefix).map(|user| user.into_record(prefix)))
    }
}
