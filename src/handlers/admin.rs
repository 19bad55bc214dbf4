use crate::handlers::require_role;
use crate::models::*;
use crate::services::{AnalyticsService, AuthService};
use actix_web::{web, HttpRequest, HttpResponse, ResponseError, Result};
use serde_json::json;

#[utoipa::path(
    post,
    path = "/admin/coaches",
    tag = "admin",
    request_body = CreateCoachRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Coach account created", body = AccountResponse),
        (status = 400, description = "Email already registered")
    )
)]
pub async fn create_coach(
    auth_service: web::Data<AuthService>,
    req: HttpRequest,
    request: web::Json<CreateCoachRequest>,
) -> Result<HttpResponse> {
    if let Err(e) = require_role(&req, AccountRole::Admin) {
        return Ok(e.error_response());
    }

    match auth_service.create_coach(request.into_inner()).await {
        Ok(coach) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": coach,
            "message": "Coach created, set-password email sent"
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/admin/coaches",
    tag = "admin",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Coach list"))
)]
pub async fn list_coaches(
    auth_service: web::Data<AuthService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    if let Err(e) = require_role(&req, AccountRole::Admin) {
        return Ok(e.error_response());
    }

    match auth_service.list_coaches().await {
        Ok(coaches) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": coaches
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/admin/dashboard",
    tag = "admin",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Dashboard summary", body = DashboardSummary))
)]
pub async fn dashboard(
    analytics_service: web::Data<AnalyticsService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    if let Err(e) = require_role(&req, AccountRole::Admin) {
        return Ok(e.error_response());
    }

    match analytics_service.dashboard_summary().await {
        Ok(summary) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": summary
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn admin_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin")
            .route("/coaches", web::post().to(create_coach))
            .route("/coaches", web::get().to(list_coaches))
            .route("/dashboard", web::get().to(dashboard)),
    );
}
