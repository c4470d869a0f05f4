use crate::error::BridgeError;
use crate::models::VerifyTokenRequest;
use crate::service::TokenExchangeService;
use crate::utils::responses::ResponseBuilder;
use actix_web::{web, HttpResponse};

/// Exchange a provider token for a Firebase custom token
///
/// Responds 200 with `{"firebase_token": ...}`, 400 when the token is
/// missing, 502 when the provider cannot be read and 500 when the identity
/// store or signer fails.
pub async fn verify_token(
    service: web::Data<TokenExchangeService>,
    body: web::Json<VerifyTokenRequest>,
) -> HttpResponse {
    match service.exchange(&body).await {
        Ok(token) => ResponseBuilder::firebase_token(token),
        Err(BridgeError::MissingInput) => {
            log::debug!("Rejected {} verification without a token", service.provider());
            ResponseBuilder::missing_token()
        }
        Err(e) => {
            log::error!("{} token exchange failed: {e}", service.provider());
            ResponseBuilder::from_bridge_error(&e)
        }
    }
}
