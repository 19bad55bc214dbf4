use crate::handlers::require_role;
use crate::models::*;
use crate::services::PaymentService;
use crate::utils::pagination::PaginationParams;
use actix_web::{web, HttpRequest, HttpResponse, ResponseError, Result};
use serde_json::json;

#[utoipa::path(
    post,
    path = "/payments/order",
    tag = "payment",
    request_body = CreateDemoOrderRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Gateway order created", body = OrderResponse),
        (status = 409, description = "Demo is not INTERESTED")
    )
)]
pub async fn create_order(
    payment_service: web::Data<PaymentService>,
    req: HttpRequest,
    request: web::Json<CreateDemoOrderRequest>,
) -> Result<HttpResponse> {
    if let Err(e) = require_role(&req, AccountRole::Admin) {
        return Ok(e.error_response());
    }

    match payment_service.create_demo_order(request.into_inner()).await {
        Ok(order) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": order
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/payments/verify",
    tag = "payment",
    request_body = VerifyPaymentRequest,
    responses(
        (status = 200, description = "Payment verified", body = VerifyPaymentResponse),
        (status = 400, description = "Invalid signature"),
        (status = 409, description = "Order is not verifiable")
    )
)]
pub async fn verify_payment(
    payment_service: web::Data<PaymentService>,
    request: web::Json<VerifyPaymentRequest>,
) -> Result<HttpResponse> {
    match payment_service.verify_payment(request.into_inner()).await {
        Ok(outcome) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": outcome
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/payments/renewals",
    tag = "payment",
    request_body = CreateRenewalOrderRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Renewal order created", body = OrderResponse),
        (status = 409, description = "Subscription is not renewable")
    )
)]
pub async fn create_renewal_order(
    payment_service: web::Data<PaymentService>,
    req: HttpRequest,
    request: web::Json<CreateRenewalOrderRequest>,
) -> Result<HttpResponse> {
    if let Err(e) = require_role(&req, AccountRole::Admin) {
        return Ok(e.error_response());
    }

    match payment_service
        .create_renewal_order(request.into_inner())
        .await
    {
        Ok(order) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": order
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/payments",
    tag = "payment",
    params(
        ("page" = Option<u32>, Query, description = "Page number"),
        ("per_page" = Option<u32>, Query, description = "Page size")
    ),
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Payment list"))
)]
pub async fn list_payments(
    payment_service: web::Data<PaymentService>,
    req: HttpRequest,
    query: web::Query<PaginationParams>,
) -> Result<HttpResponse> {
    if let Err(e) = require_role(&req, AccountRole::Admin) {
        return Ok(e.error_response());
    }

    match payment_service.list_payments(&query.into_inner()).await {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn payment_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/payments")
            .route("", web::get().to(list_payments))
            .route("/order", web::post().to(create_order))
            .route("/verify", web::post().to(verify_payment))
            .route("/renewals", web::post().to(create_renewal_order)),
    );
}
