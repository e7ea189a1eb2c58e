pub mod auth;
pub mod order;

use crate::error::AppError;
use actix_web::{HttpRequest, HttpResponse, ResponseError, web};

pub use auth::auth_config;
pub use order::order_config;

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.configure(auth_config).configure(order_config);
}

/// Malformed bodies and unknown `action` values answer 400 in the usual
/// error envelope instead of actix's plain-text default.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .error_handler(|err, _req| AppError::ValidationError(err.to_string()).into())
}

pub async fn not_found(req: HttpRequest) -> HttpResponse {
    AppError::NotFound(format!("No route for {}", req.path())).error_response()
}
