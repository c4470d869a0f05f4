use crate::service::TokenExchangeService;
use crate::utils::responses::ResponseBuilder;
use actix_web::{web, HttpResponse};

/// Plain-text liveness message naming the served provider
pub async fn liveness(service: web::Data<TokenExchangeService>) -> HttpResponse {
    ResponseBuilder::plain_text(service.provider().liveness_message())
}
