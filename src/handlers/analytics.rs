use crate::handlers::require_role;
use crate::models::*;
use crate::services::AnalyticsService;
use actix_web::{web, HttpRequest, HttpResponse, ResponseError, Result};
use serde_json::json;

#[utoipa::path(
    get,
    path = "/analytics/funnel",
    tag = "analytics",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Funnel report", body = FunnelReport))
)]
pub async fn funnel(
    analytics_service: web::Data<AnalyticsService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    if let Err(e) = require_role(&req, AccountRole::Admin) {
        return Ok(e.error_response());
    }

    match analytics_service.funnel_report().await {
        Ok(report) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": report
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/analytics/revenue",
    tag = "analytics",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Revenue report", body = RevenueReport))
)]
pub async fn revenue(
    analytics_service: web::Data<AnalyticsService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    if let Err(e) = require_role(&req, AccountRole::Admin) {
        return Ok(e.error_response());
    }

    match analytics_service.revenue_report().await {
        Ok(report) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": report
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/analytics/explain",
    tag = "analytics",
    request_body = ExplainRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Narrated aggregates", body = ExplainResponse),
        (status = 502, description = "Text model unavailable")
    )
)]
pub async fn explain(
    analytics_service: web::Data<AnalyticsService>,
    req: HttpRequest,
    request: web::Json<ExplainRequest>,
) -> Result<HttpResponse> {
    if let Err(e) = require_role(&req, AccountRole::Admin) {
        return Ok(e.error_response());
    }

    match analytics_service.explain(request.into_inner()).await {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn analytics_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/analytics")
            .route("/funnel", web::get().to(funnel))
            .route("/revenue", web::get().to(revenue))
            .route("/explain", web::post().to(explain)),
    );
}
