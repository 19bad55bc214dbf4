use crate::handlers::{require_any_role, require_role};
use crate::models::*;
use crate::services::StudentService;
use actix_web::{web, HttpRequest, HttpResponse, ResponseError, Result};
use serde_json::json;
use uuid::Uuid;

#[utoipa::path(
    get,
    path = "/students",
    tag = "student",
    params(
        ("status" = Option<StudentStatus>, Query, description = "Filter by status"),
        ("student_type" = Option<StudentType>, Query, description = "Filter by type"),
        ("coach_id" = Option<Uuid>, Query, description = "Filter by coach"),
        ("page" = Option<u32>, Query, description = "Page number"),
        ("per_page" = Option<u32>, Query, description = "Page size")
    ),
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Student list"))
)]
pub async fn list_students(
    student_service: web::Data<StudentService>,
    req: HttpRequest,
    query: web::Query<StudentQuery>,
) -> Result<HttpResponse> {
    if let Err(e) = require_any_role(&req, &[AccountRole::Admin, AccountRole::Coach]) {
        return Ok(e.error_response());
    }

    match student_service.list_students(&query.into_inner()).await {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/students/{id}",
    tag = "student",
    params(("id" = Uuid, Path, description = "Student id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Student detail", body = StudentResponse),
        (status = 404, description = "Student not found")
    )
)]
pub async fn get_student(
    student_service: web::Data<StudentService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    if let Err(e) = require_any_role(&req, &[AccountRole::Admin, AccountRole::Coach]) {
        return Ok(e.error_response());
    }

    match student_service.get_student(path.into_inner()).await {
        Ok(student) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": student
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    patch,
    path = "/students/{id}",
    tag = "student",
    params(("id" = Uuid, Path, description = "Student id")),
    request_body = UpdateStudentRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Student updated", body = StudentResponse),
        (status = 400, description = "Coach pinned by batch membership")
    )
)]
pub async fn update_student(
    student_service: web::Data<StudentService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    request: web::Json<UpdateStudentRequest>,
) -> Result<HttpResponse> {
    if let Err(e) = require_role(&req, AccountRole::Admin) {
        return Ok(e.error_response());
    }

    match student_service
        .update_student(path.into_inner(), request.into_inner())
        .await
    {
        Ok(student) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": student
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn student_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/students")
            .route("", web::get().to(list_students))
            .route("/{id}", web::get().to(get_student))
            .route("/{id}", web::patch().to(update_student)),
    );
}
