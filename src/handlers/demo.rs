use crate::handlers::{require_any_role, require_role};
use crate::models::*;
use crate::services::DemoService;
use actix_web::{web, HttpRequest, HttpResponse, ResponseError, Result};
use serde_json::json;
use uuid::Uuid;

#[utoipa::path(
    post,
    path = "/demos",
    tag = "demo",
    request_body = BookDemoRequest,
    responses(
        (status = 200, description = "Demo booked", body = DemoResponse),
        (status = 400, description = "Invalid booking data")
    )
)]
pub async fn book_demo(
    demo_service: web::Data<DemoService>,
    request: web::Json<BookDemoRequest>,
) -> Result<HttpResponse> {
    match demo_service.book_demo(request.into_inner()).await {
        Ok(demo) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": demo
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/demos",
    tag = "demo",
    params(
        ("status" = Option<DemoStatus>, Query, description = "Filter by funnel status"),
        ("coach_id" = Option<Uuid>, Query, description = "Filter by assigned coach"),
        ("page" = Option<u32>, Query, description = "Page number"),
        ("per_page" = Option<u32>, Query, description = "Page size")
    ),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Demo list"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn list_demos(
    demo_service: web::Data<DemoService>,
    req: HttpRequest,
    query: web::Query<DemoQuery>,
) -> Result<HttpResponse> {
    if let Err(e) = require_any_role(&req, &[AccountRole::Admin, AccountRole::Coach]) {
        return Ok(e.error_response());
    }

    match demo_service.list_demos(&query.into_inner()).await {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/demos/{id}",
    tag = "demo",
    params(("id" = Uuid, Path, description = "Demo id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Demo detail", body = DemoResponse),
        (status = 404, description = "Demo not found")
    )
)]
pub async fn get_demo(
    demo_service: web::Data<DemoService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    if let Err(e) = require_any_role(&req, &[AccountRole::Admin, AccountRole::Coach]) {
        return Ok(e.error_response());
    }

    match demo_service.get_demo(path.into_inner()).await {
        Ok(demo) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": demo
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    patch,
    path = "/demos/{id}/schedule",
    tag = "demo",
    params(("id" = Uuid, Path, description = "Demo id")),
    request_body = ScheduleDemoRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Demo scheduled", body = DemoResponse),
        (status = 409, description = "Demo is not in BOOKED")
    )
)]
pub async fn schedule_demo(
    demo_service: web::Data<DemoService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    request: web::Json<ScheduleDemoRequest>,
) -> Result<HttpResponse> {
    let admin = match require_role(&req, AccountRole::Admin) {
        Ok(user) => user,
        Err(e) => return Ok(e.error_response()),
    };

    match demo_service
        .schedule_demo(path.into_inner(), admin.id, request.into_inner())
        .await
    {
        Ok(demo) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": demo
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    patch,
    path = "/demos/{id}/attendance",
    tag = "demo",
    params(("id" = Uuid, Path, description = "Demo id")),
    request_body = MarkAttendanceRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Attendance recorded", body = DemoResponse),
        (status = 409, description = "Demo is not in BOOKED")
    )
)]
pub async fn mark_attendance(
    demo_service: web::Data<DemoService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    request: web::Json<MarkAttendanceRequest>,
) -> Result<HttpResponse> {
    if let Err(e) = require_role(&req, AccountRole::Admin) {
        return Ok(e.error_response());
    }

    match demo_service
        .mark_attendance(path.into_inner(), request.into_inner())
        .await
    {
        Ok(demo) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": demo
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    patch,
    path = "/demos/{id}/outcome",
    tag = "demo",
    params(("id" = Uuid, Path, description = "Demo id")),
    request_body = SubmitOutcomeRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Outcome recorded", body = DemoResponse),
        (status = 409, description = "Demo is not in ATTENDED")
    )
)]
pub async fn submit_outcome(
    demo_service: web::Data<DemoService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    request: web::Json<SubmitOutcomeRequest>,
) -> Result<HttpResponse> {
    if let Err(e) = require_role(&req, AccountRole::Admin) {
        return Ok(e.error_response());
    }

    match demo_service
        .submit_outcome(path.into_inner(), request.into_inner())
        .await
    {
        Ok(demo) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": demo
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    patch,
    path = "/demos/{id}/coach-attendance",
    tag = "demo",
    params(("id" = Uuid, Path, description = "Demo id")),
    request_body = CoachAttendanceRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Coach attendance recorded", body = DemoResponse),
        (status = 409, description = "Already marked")
    )
)]
pub async fn coach_mark_attendance(
    demo_service: web::Data<DemoService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    request: web::Json<CoachAttendanceRequest>,
) -> Result<HttpResponse> {
    let coach = match require_role(&req, AccountRole::Coach) {
        Ok(user) => user,
        Err(e) => return Ok(e.error_response()),
    };

    match demo_service
        .coach_mark_attendance(path.into_inner(), coach.id, request.into_inner())
        .await
    {
        Ok(demo) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": demo
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn demo_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/demos")
            .route("", web::post().to(book_demo))
            .route("", web::get().to(list_demos))
            .route("/{id}", web::get().to(get_demo))
            .route("/{id}/schedule", web::patch().to(schedule_demo))
            .route("/{id}/attendance", web::patch().to(mark_attendance))
            .route("/{id}/outcome", web::patch().to(submit_outcome))
            .route(
                "/{id}/coach-attendance",
                web::patch().to(coach_mark_attendance),
            ),
    );
}
