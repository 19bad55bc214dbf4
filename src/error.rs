use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Auth error: {0}")]
    AuthError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden")]
    Forbidden,

    // Demo funnel preconditions
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Not eligible: {0}")]
    NotEligible(String),

    #[error("Duplicate student: {0}")]
    DuplicateStudent(String),

    #[error("Already marked: {0}")]
    AlreadyMarked(String),

    // Batch membership preconditions
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Batch full: {0}")]
    BatchFull(String),

    #[error("Not a member: {0}")]
    NotMember(String),

    #[error("Already a member: {0}")]
    AlreadyMember(String),

    #[error("External API error: {0}")]
    ExternalApiError(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error("HTTP request error: {0}")]
    ReqwestError(#[from] reqwest::Error),

    #[error("JSON serialization/deserialization error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        use actix_web::http::StatusCode;

        let (status_code, error_code, message) = match self {
            AppError::ValidationError(msg) => {
                log::warn!("Validation error: {msg}");
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
            }
            AppError::AuthError(msg) => {
                log::warn!("Authentication error: {msg}");
                (StatusCode::UNAUTHORIZED, "AUTH_ERROR", msg.clone())
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Forbidden => {
                log::warn!("Forbidden access");
                (StatusCode::FORBIDDEN, "FORBIDDEN", "Forbidden".to_string())
            }
            AppError::InvalidState(msg) => {
                (StatusCode::CONFLICT, "INVALID_STATE", msg.clone())
            }
            AppError::NotEligible(msg) => (StatusCode::CONFLICT, "NOT_ELIGIBLE", msg.clone()),
            AppError::DuplicateStudent(msg) => {
                log::warn!("Duplicate conversion attempt: {msg}");
                (StatusCode::CONFLICT, "DUPLICATE_STUDENT", msg.clone())
            }
            AppError::AlreadyMarked(msg) => (StatusCode::CONFLICT, "ALREADY_MARKED", msg.clone()),
            AppError::TypeMismatch(msg) => {
                (StatusCode::BAD_REQUEST, "TYPE_MISMATCH", msg.clone())
            }
            AppError::BatchFull(msg) => (StatusCode::CONFLICT, "BATCH_FULL", msg.clone()),
            AppError::NotMember(msg) => (StatusCode::CONFLICT, "NOT_MEMBER", msg.clone()),
            AppError::AlreadyMember(msg) => (StatusCode::CONFLICT, "ALREADY_MEMBER", msg.clone()),
            AppError::ExternalApiError(msg) => {
                log::error!("External API error: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "EXTERNAL_API_ERROR",
                    msg.clone(),
                )
            }
            AppError::DatabaseError(err) => {
                log::error!("Database error: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "Database error".to_string(),
                )
            }
            AppError::MigrateError(err) => {
                log::error!("Migration error: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "MIGRATION_ERROR",
                    "Migration error".to_string(),
                )
            }
            _ => {
                log::error!("Internal error: {self}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal server error".to_string(),
                )
            }
        };

        HttpResponse::build(status_code).json(json!({
            "success": false,
            "error": {
                "code": error_code,
                "message": message
            }
        }))
    }
}
