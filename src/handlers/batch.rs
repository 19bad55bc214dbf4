use crate::handlers::{require_any_role, require_role};
use crate::models::*;
use crate::services::BatchService;
use actix_web::{web, HttpRequest, HttpResponse, ResponseError, Result};
use serde_json::json;
use uuid::Uuid;

#[utoipa::path(
    post,
    path = "/batches",
    tag = "batch",
    request_body = CreateBatchRequest,
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Batch created", body = BatchResponse))
)]
pub async fn create_batch(
    batch_service: web::Data<BatchService>,
    req: HttpRequest,
    request: web::Json<CreateBatchRequest>,
) -> Result<HttpResponse> {
    if let Err(e) = require_role(&req, AccountRole::Admin) {
        return Ok(e.error_response());
    }

    match batch_service.create_batch(request.into_inner()).await {
        Ok(batch) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": batch
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/batches",
    tag = "batch",
    params(
        ("status" = Option<BatchStatus>, Query, description = "Filter by status"),
        ("coach_id" = Option<Uuid>, Query, description = "Filter by coach"),
        ("page" = Option<u32>, Query, description = "Page number"),
        ("per_page" = Option<u32>, Query, description = "Page size")
    ),
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Batch list"))
)]
pub async fn list_batches(
    batch_service: web::Data<BatchService>,
    req: HttpRequest,
    query: web::Query<BatchQuery>,
) -> Result<HttpResponse> {
    if let Err(e) = require_any_role(&req, &[AccountRole::Admin, AccountRole::Coach]) {
        return Ok(e.error_response());
    }

    match batch_service.list_batches(&query.into_inner()).await {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/batches/{id}",
    tag = "batch",
    params(("id" = Uuid, Path, description = "Batch id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Batch detail", body = BatchResponse),
        (status = 404, description = "Batch not found")
    )
)]
pub async fn get_batch(
    batch_service: web::Data<BatchService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    if let Err(e) = require_any_role(&req, &[AccountRole::Admin, AccountRole::Coach]) {
        return Ok(e.error_response());
    }

    match batch_service.get_batch(path.into_inner()).await {
        Ok(batch) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": batch
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/batches/{id}",
    tag = "batch",
    params(("id" = Uuid, Path, description = "Batch id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Batch deleted"),
        (status = 404, description = "Batch not found")
    )
)]
pub async fn delete_batch(
    batch_service: web::Data<BatchService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    if let Err(e) = require_role(&req, AccountRole::Admin) {
        return Ok(e.error_response());
    }

    match batch_service.delete_batch(path.into_inner()).await {
        Ok(()) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "message": "Batch deleted"
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/batches/{id}/students/{student_id}",
    tag = "batch",
    params(
        ("id" = Uuid, Path, description = "Batch id"),
        ("student_id" = Uuid, Path, description = "Student id")
    ),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Student added", body = BatchResponse),
        (status = 400, description = "Student is not a group student"),
        (status = 409, description = "Batch full or already a member")
    )
)]
pub async fn add_student(
    batch_service: web::Data<BatchService>,
    req: HttpRequest,
    path: web::Path<(Uuid, Uuid)>,
) -> Result<HttpResponse> {
    if let Err(e) = require_role(&req, AccountRole::Admin) {
        return Ok(e.error_response());
    }

    let (batch_id, student_id) = path.into_inner();
    match batch_service.add_student(batch_id, student_id).await {
        Ok(batch) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": batch
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/batches/{id}/students/{student_id}",
    tag = "batch",
    params(
        ("id" = Uuid, Path, description = "Batch id"),
        ("student_id" = Uuid, Path, description = "Student id")
    ),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Student removed", body = BatchResponse),
        (status = 409, description = "Student is not a member")
    )
)]
pub async fn remove_student(
    batch_service: web::Data<BatchService>,
    req: HttpRequest,
    path: web::Path<(Uuid, Uuid)>,
) -> Result<HttpResponse> {
    if let Err(e) = require_role(&req, AccountRole::Admin) {
        return Ok(e.error_response());
    }

    let (batch_id, student_id) = path.into_inner();
    match batch_service.remove_student(batch_id, student_id).await {
        Ok(batch) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": batch
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn batch_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/batches")
            .route("", web::post().to(create_batch))
            .route("", web::get().to(list_batches))
            .route("/{id}", web::get().to(get_batch))
            .route("/{id}", web::delete().to(delete_batch))
            .route("/{id}/students/{student_id}", web::post().to(add_student))
            .route(
                "/{id}/students/{student_id}",
                web::delete().to(remove_student),
            ),
    );
}
