use crate::error::AppError;
use crate::middlewares::current_user;
use crate::models::*;
use crate::services::OrderService;
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};

#[utoipa::path(
    post,
    path = "/orders",
    tag = "order",
    request_body = CreateOrderRequest,
    security(
        ("session_token" = [])
    ),
    responses(
        (status = 200, description = "Order created", body = CreateOrderResponse),
        (status = 400, description = "Missing or malformed fields", body = ApiErrorResponse),
        (status = 401, description = "Missing or invalid session", body = ApiErrorResponse)
    )
)]
pub async fn create_order(
    order_service: web::Data<OrderService>,
    req: HttpRequest,
    request: web::Json<CreateOrderRequest>,
) -> Result<HttpResponse> {
    let user = match current_user(&req) {
        Ok(user) => user,
        Err(e) => return Ok(e.error_response()),
    };

    match order_service
        .create_order(user.user_id, request.into_inner())
        .await
    {
        Ok(order) => Ok(HttpResponse::Ok().json(CreateOrderResponse {
            success: true,
            order: OrderResponse::from(order),
        })),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/orders",
    tag = "order",
    security(
        ("session_token" = [])
    ),
    responses(
        (status = 200, description = "Caller's orders, newest first", body = OrderListResponse),
        (status = 401, description = "Missing or invalid session", body = ApiErrorResponse)
    )
)]
pub async fn list_orders(
    order_service: web::Data<OrderService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let user = match current_user(&req) {
        Ok(user) => user,
        Err(e) => return Ok(e.error_response()),
    };

    match order_service.list_orders(user.user_id).await {
        Ok(list) => Ok(HttpResponse::Ok().json(OrderListResponse {
            success: true,
            orders: list.into_iter().map(OrderResponse::from).collect(),
        })),
        Err(e) => Ok(e.error_response()),
    }
}

async fn method_not_allowed() -> Result<HttpResponse> {
    Ok(AppError::MethodNotAllowed.error_response())
}

pub fn order_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/orders")
            .route(web::get().to(list_orders))
            .route(web::post().to(create_order))
            .default_service(web::to(method_not_allowed)),
    );
}
