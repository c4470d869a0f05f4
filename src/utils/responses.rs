//! HTTP response handling
//!
//! Unified construction of the bridge's JSON responses. Bodies that never
//! change are serialized once and reused.

use crate::error::BridgeError;
use crate::models::{MessageResponse, VerifyTokenResponse};
use actix_web::{http::header, HttpResponse};
use serde_json::{json, Value};

/// Message returned to callers that omit the provider token
pub const MISSING_TOKEN_MESSAGE: &str = "Access token is a required parameter.";

// ===============================
// CACHED RESPONSES FOR PERFORMANCE
// ===============================

static CACHED_RESPONSES: std::sync::LazyLock<CachedResponses> =
    std::sync::LazyLock::new(CachedResponses::new);

/// Pre-serialized bodies for responses that never vary
struct CachedResponses {
    missing_token: String,
    invalid_request: String,
}

impl CachedResponses {
    fn new() -> Self {
        let missing_token = serde_json::to_string(&MessageResponse {
            message: MISSING_TOKEN_MESSAGE.to_string(),
        })
        .unwrap_or_default();

        Self {
            missing_token,
            invalid_request: Self::create_json(
                "invalid_request",
                "The request is malformed or invalid",
            ),
        }
    }

    fn create_json(error: &str, message: &str) -> String {
        json!({
            "error": error,
            "message": message
        })
        .to_string()
    }

    fn missing_token(&self) -> HttpResponse {
        HttpResponse::BadRequest()
            .insert_header((header::CONTENT_TYPE, "application/json"))
            .body(self.missing_token.clone())
    }

    fn invalid_request(&self) -> HttpResponse {
        HttpResponse::BadRequest()
            .insert_header((header::CONTENT_TYPE, "application/json"))
            .body(self.invalid_request.clone())
    }
}

/// Unified response builder
pub struct ResponseBuilder;

impl ResponseBuilder {
    // ===============================
    // ERROR RESPONSE METHODS
    // ===============================

    /// Create an `InternalServerError` (500) error response with optional customization
    #[must_use]
    pub fn internal_server_error() -> ErrorResponseBuilder {
        ErrorResponseBuilder::new(ErrorType::InternalServerError)
    }

    /// Create a `BadGateway` (502) error response with optional customization
    #[must_use]
    pub fn bad_gateway() -> ErrorResponseBuilder {
        ErrorResponseBuilder::new(ErrorType::BadGateway)
    }

    /// 400 `{"message": "Access token is a required parameter."}`
    #[must_use]
    pub fn missing_token() -> HttpResponse {
        CACHED_RESPONSES.missing_token()
    }

    /// 400 for bodies that are not valid JSON requests
    #[must_use]
    pub fn invalid_request() -> HttpResponse {
        CACHED_RESPONSES.invalid_request()
    }

    // ===============================
    // SUCCESS RESPONSE METHODS
    // ===============================

    /// 200 `{"firebase_token": "..."}`
    #[must_use]
    pub fn firebase_token(token: String) -> HttpResponse {
        HttpResponse::Ok().json(VerifyTokenResponse {
            firebase_token: token,
        })
    }

    /// 200 with a plain-text body
    #[must_use]
    pub fn plain_text(body: &'static str) -> HttpResponse {
        HttpResponse::Ok()
            .content_type("text/plain; charset=utf-8")
            .body(body)
    }

    // ===============================
    // PIPELINE ERROR MAPPING
    // ===============================

    /// Map a pipeline error to its HTTP response.
    ///
    /// Missing input is the caller's fault (400); provider failures are
    /// gateway errors (502); store and mint failures are internal (500).
    #[must_use]
    pub fn from_bridge_error(error: &BridgeError) -> HttpResponse {
        match error {
            BridgeError::MissingInput => Self::missing_token(),
            BridgeError::Fetch(_) | BridgeError::ProfileMissingIdentifier => Self::bad_gateway()
                .with_error_code(error.error_code())
                .with_message(&error.to_string())
                .build(),
            BridgeError::Store(_) | BridgeError::Mint(_) => Self::internal_server_error()
                .with_error_code(error.error_code())
                .build(),
        }
    }
}

// ===============================
// BUILDER TYPES
// ===============================

/// Builder for error responses with fluent interface
pub struct ErrorResponseBuilder {
    error_type: ErrorType,
    error_code: Option<String>,
    message: Option<String>,
}

/// Supported HTTP error response types
#[derive(Clone, Copy)]
enum ErrorType {
    InternalServerError,
    BadGateway,
}

impl ErrorResponseBuilder {
    fn new(error_type: ErrorType) -> Self {
        Self {
            error_type,
            error_code: None,
            message: None,
        }
    }

    /// Set a custom error code (e.g., "`upstream_unavailable`")
    #[must_use]
    pub fn with_error_code(mut self, code: &str) -> Self {
        self.error_code = Some(code.to_string());
        self
    }

    /// Set a custom error message
    #[must_use]
    pub fn with_message(mut self, message: &str) -> Self {
        self.message = Some(message.to_string());
        self
    }

    /// Build the final `HttpResponse`
    #[must_use]
    pub fn build(self) -> HttpResponse {
        let mut json_body = json!({});

        let error_code = self
            .error_code
            .clone()
            .unwrap_or_else(|| self.default_error_code().to_string());
        json_body["error"] = Value::String(error_code);

        let message = self
            .message
            .clone()
            .unwrap_or_else(|| self.default_message().to_string());
        json_body["message"] = Value::String(message);

        let mut response = match self.error_type {
            ErrorType::InternalServerError => HttpResponse::InternalServerError(),
            ErrorType::BadGateway => HttpResponse::BadGateway(),
        };

        response
            .insert_header((header::CONTENT_TYPE, "application/json"))
            .json(json_body)
    }

    fn default_error_code(&self) -> &'static str {
        match self.error_type {
            ErrorType::InternalServerError => "server_error",
            ErrorType::BadGateway => "bad_gateway",
        }
    }

    fn default_message(&self) -> &'static str {
        match self.error_type {
            ErrorType::InternalServerError => "An internal server error occurred",
            ErrorType::BadGateway => "Failed to reach the identity provider",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FetchError, MintError, StoreError};
    use actix_web::body::to_bytes;
    use actix_web::http::StatusCode;

    async fn body_json(response: HttpResponse) -> Value {
        let bytes = to_bytes(response.into_body()).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[actix_web::test]
    async fn test_missing_token_body_is_exact() {
        let response = ResponseBuilder::missing_token();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            json!({"message": "Access token is a required parameter."})
        );
    }

    #[actix_web::test]
    async fn test_upstream_errors_map_to_bad_gateway() {
        let error = BridgeError::Fetch(FetchError::UpstreamUnavailable("timed out".into()));
        let response = ResponseBuilder::from_bridge_error(&error);
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let body = body_json(response).await;
        assert_eq!(body["error"], "upstream_unavailable");
        assert!(body["message"].as_str().unwrap().contains("timed out"));
    }

    #[actix_web::test]
    async fn test_store_errors_do_not_leak_details() {
        let error = BridgeError::Store(StoreError::Other("secret backend detail".into()));
        let response = ResponseBuilder::from_bridge_error(&error);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["error"], "identity_store_error");
        assert!(!body["message"].as_str().unwrap().contains("secret"));
    }

    #[test]
    fn test_mint_errors_are_internal() {
        let error = BridgeError::Mint(MintError::Signing("bad key".into()));
        let response = ResponseBuilder::from_bridge_error(&error);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[actix_web::test]
    async fn test_missing_identifier_keeps_its_message() {
        let response = ResponseBuilder::from_bridge_error(&BridgeError::ProfileMissingIdentifier);
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let body = body_json(response).await;
        assert_eq!(body["error"], "profile_missing_identifier");
        assert_eq!(body["message"], "There was no user with the given access token.");
    }

    #[actix_web::test]
    async fn test_firebase_token_response() {
        let response = ResponseBuilder::firebase_token("signed.jwt.value".to_string());
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({"firebase_token": "signed.jwt.value"})
        );
    }
}
