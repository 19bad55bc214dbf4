use crate::handlers::require_role;
use crate::models::*;
use crate::services::SubscriptionService;
use actix_web::{web, HttpRequest, HttpResponse, ResponseError, Result};
use serde_json::json;
use uuid::Uuid;

#[utoipa::path(
    get,
    path = "/subscriptions",
    tag = "subscription",
    params(
        ("status" = Option<SubscriptionStatus>, Query, description = "Filter by status"),
        ("page" = Option<u32>, Query, description = "Page number"),
        ("per_page" = Option<u32>, Query, description = "Page size")
    ),
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Subscription list"))
)]
pub async fn list_subscriptions(
    subscription_service: web::Data<SubscriptionService>,
    req: HttpRequest,
    query: web::Query<SubscriptionQuery>,
) -> Result<HttpResponse> {
    if let Err(e) = require_role(&req, AccountRole::Admin) {
        return Ok(e.error_response());
    }

    match subscription_service
        .list_subscriptions(&query.into_inner())
        .await
    {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/subscriptions/{id}",
    tag = "subscription",
    params(("id" = Uuid, Path, description = "Subscription id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Subscription detail", body = SubscriptionResponse),
        (status = 404, description = "Subscription not found")
    )
)]
pub async fn get_subscription(
    subscription_service: web::Data<SubscriptionService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    if let Err(e) = require_role(&req, AccountRole::Admin) {
        return Ok(e.error_response());
    }

    match subscription_service
        .get_subscription(path.into_inner())
        .await
    {
        Ok(subscription) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": subscription
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/subscriptions/{id}/pause",
    tag = "subscription",
    params(("id" = Uuid, Path, description = "Subscription id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Subscription paused", body = SubscriptionResponse),
        (status = 409, description = "Subscription is not pausable")
    )
)]
pub async fn pause_subscription(
    subscription_service: web::Data<SubscriptionService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    if let Err(e) = require_role(&req, AccountRole::Admin) {
        return Ok(e.error_response());
    }

    match subscription_service.pause(path.into_inner()).await {
        Ok(subscription) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": subscription
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/subscriptions/{id}/resume",
    tag = "subscription",
    params(("id" = Uuid, Path, description = "Subscription id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Subscription resumed", body = SubscriptionResponse),
        (status = 409, description = "Subscription is not suspended")
    )
)]
pub async fn resume_subscription(
    subscription_service: web::Data<SubscriptionService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    if let Err(e) = require_role(&req, AccountRole::Admin) {
        return Ok(e.error_response());
    }

    match subscription_service.resume(path.into_inner()).await {
        Ok(subscription) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": subscription
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/subscriptions/{id}/cancel",
    tag = "subscription",
    params(("id" = Uuid, Path, description = "Subscription id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Subscription cancelled", body = SubscriptionResponse),
        (status = 409, description = "Subscription already cancelled")
    )
)]
pub async fn cancel_subscription(
    subscription_service: web::Data<SubscriptionService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    if let Err(e) = require_role(&req, AccountRole::Admin) {
        return Ok(e.error_response());
    }

    match subscription_service.cancel(path.into_inner()).await {
        Ok(subscription) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": subscription
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn subscription_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/subscriptions")
            .route("", web::get().to(list_subscriptions))
            .route("/{id}", web::get().to(get_subscription))
            .route("/{id}/pause", web::post().to(pause_subscription))
            .route("/{id}/resume", web::post().to(resume_subscription))
            .route("/{id}/cancel", web::post().to(cancel_subscription)),
    );
}
