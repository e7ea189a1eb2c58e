use crate::error::AppError;
use crate::models::*;
use crate::services::{AuthService, CODE_TTL_MINUTES};
use actix_web::{HttpResponse, ResponseError, Result, web};

#[utoipa::path(
    post,
    path = "/auth",
    tag = "auth",
    request_body = AuthRequest,
    responses(
        (status = 200, description = "Code issued (send_code) or signed in (verify_code)", body = AuthResponse),
        (status = 400, description = "Invalid input, or invalid/expired code", body = ApiErrorResponse),
        (status = 500, description = "Internal server error", body = ApiErrorResponse)
    )
)]
pub async fn auth(
    auth_service: web::Data<AuthService>,
    request: web::Json<AuthRequest>,
) -> Result<HttpResponse> {
    match request.into_inner() {
        AuthRequest::SendCode { phone } => send_code(&auth_service, &phone).await,
        AuthRequest::VerifyCode { phone, code, name } => {
            verify_code(&auth_service, &phone, &code, name.as_deref()).await
        }
    }
}

async fn send_code(auth_service: &AuthService, phone: &str) -> Result<HttpResponse> {
    match auth_service.send_code(phone).await {
        Ok(issued) => {
            let dev_code = auth_service.exposes_dev_code().then_some(issued.code);
            Ok(HttpResponse::Ok().json(AuthResponse::CodeSent(SendCodeResponse {
                success: true,
                message: format!("Code sent to {}", issued.phone),
                expires_in: CODE_TTL_MINUTES * 60,
                dev_code,
            })))
        }
        Err(e) => Ok(e.error_response()),
    }
}

async fn verify_code(
    auth_service: &AuthService,
    phone: &str,
    code: &str,
    name: Option<&str>,
) -> Result<HttpResponse> {
    match auth_service.verify_code(phone, code, name).await {
        Ok(login) => Ok(HttpResponse::Ok().json(AuthResponse::SignedIn(VerifyCodeResponse {
            success: true,
            user: UserResponse::from(login.user),
            session_token: login.session_token,
            expires_in: auth_service.session_issuer().expires_in(),
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

async fn method_not_allowed() -> Result<HttpResponse> {
    Ok(AppError::MethodNotAllowed.error_response())
}

pub fn auth_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/auth")
            .route(web::post().to(auth))
            .default_service(web::to(method_not_allowed)),
    );
}
