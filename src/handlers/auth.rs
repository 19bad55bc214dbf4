use crate::models::*;
use crate::services::AuthService;
use actix_web::{web, HttpResponse, ResponseError, Result};

#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = AuthResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    auth_service: web::Data<AuthService>,
    request: web::Json<LoginRequest>,
) -> Result<HttpResponse> {
    match auth_service.login(request.into_inner()).await {
        Ok(response) => Ok(HttpResponse::Ok().json(ApiResponse::success(response))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/auth/refresh",
    tag = "auth",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Tokens refreshed", body = AuthResponse),
        (status = 401, description = "Invalid refresh token")
    )
)]
pub async fn refresh(
    auth_service: web::Data<AuthService>,
    request: web::Json<RefreshRequest>,
) -> Result<HttpResponse> {
    match auth_service.refresh(request.into_inner()).await {
        Ok(response) => Ok(HttpResponse::Ok().json(ApiResponse::success(response))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/auth/set-password",
    tag = "auth",
    request_body = SetPasswordRequest,
    responses(
        (status = 200, description = "Password set", body = AccountResponse),
        (status = 400, description = "Invalid or expired token")
    )
)]
pub async fn set_password(
    auth_service: web::Data<AuthService>,
    request: web::Json<SetPasswordRequest>,
) -> Result<HttpResponse> {
    match auth_service.set_password(request.into_inner()).await {
        Ok(account) => Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
            account,
            "Password set, you can now sign in".to_string(),
        ))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn auth_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .route("/login", web::post().to(login))
            .route("/refresh", web::post().to(refresh))
            .route("/set-password", web::post().to(set_password)),
    );
}
