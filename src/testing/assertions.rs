//! Custom assertion helpers for testing

use crate::utils::crypto::decode_jwt_payload;
use actix_web::body::MessageBody;
use actix_web::dev::ServiceResponse;
use serde_json::Value;

/// Assert a response status and return its JSON body
///
/// # Panics
///
/// Panics if the status differs or the body is not JSON
pub async fn assert_json_response<B>(response: ServiceResponse<B>, expected_status: u16) -> Value
where
    B: MessageBody,
{
    let status = response.status().as_u16();
    let body = actix_web::body::to_bytes(response.into_body())
        .await
        .unwrap_or_else(|_| panic!("Failed to read response body"));
    assert_eq!(
        status,
        expected_status,
        "Expected status {expected_status}, got {status}: {}",
        String::from_utf8_lossy(&body)
    );
    serde_json::from_slice(&body).expect("Response body is not JSON")
}

/// Assert that a JWT carries the expected `uid` and `claims.provider`
///
/// # Panics
///
/// Panics if the token cannot be decoded or a claim differs
pub fn assert_custom_token(token: &str, expected_uid: &str, expected_provider: &str) {
    let payload = decode_jwt_payload(token).expect("Token payload should decode");
    assert_eq!(payload["uid"], expected_uid, "Unexpected uid in {payload}");
    assert_eq!(
        payload["claims"]["provider"], expected_provider,
        "Unexpected provider claim in {payload}"
    );
}
