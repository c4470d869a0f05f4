// HTTP request handlers for the token bridge
pub mod health;
pub mod verify;


use crate::utils::responses::ResponseBuilder;
use actix_web::{
    error::{InternalError, JsonPayloadError},
    web,
};

// Re-export the main handler functions
pub use health::liveness;
pub use verify::verify_token;

/// JSON extractor config for `/verifyToken` bodies
///
/// A missing or non-JSON body carries no token and gets the missing-token
/// answer. Only syntactically broken JSON is reported as `invalid_request`.
#[must_use]
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        if carries_no_body(&err) {
            log::debug!("Request body carries no token: {err}");
            return InternalError::from_response(err, ResponseBuilder::missing_token()).into();
        }
        log::warn!("Rejected malformed request body: {err}");
        InternalError::from_response(err, ResponseBuilder::invalid_request()).into()
    })
}

/// Wrong content type, or an empty payload
fn carries_no_body(err: &JsonPayloadError) -> bool {
    match err {
        JsonPayloadError::ContentType => true,
        JsonPayloadError::Deserialize(e) => e.is_eof() && e.line() == 1 && e.column() == 0,
        _ => false,
    }
}

/// Register the bridge routes
pub fn configure_services(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .route("/", web::get().to(liveness))
        .route("/verifyToken", web::post().to(verify_token));
}
