pub mod admin;
pub mod analytics;
pub mod auth;
pub mod batch;
pub mod chat;
pub mod demo;
pub mod payment;
pub mod student;
pub mod subscription;

pub use admin::admin_config;
pub use analytics::analytics_config;
pub use auth::auth_config;
pub use batch::batch_config;
pub use chat::chat_config;
pub use demo::demo_config;
pub use payment::payment_config;
pub use student::student_config;
pub use subscription::subscription_config;

use crate::error::AppError;
use crate::middlewares::CurrentUser;
use crate::models::AccountRole;
use actix_web::{HttpMessage, HttpRequest};

pub(crate) fn current_user(req: &HttpRequest) -> Result<CurrentUser, AppError> {
    req.extensions()
        .get::<CurrentUser>()
        .copied()
        .ok_or_else(|| AppError::AuthError("Not authenticated".to_string()))
}

pub(crate) fn require_role(req: &HttpRequest, role: AccountRole) -> Result<CurrentUser, AppError> {
    let user = current_user(req)?;
    if user.role != role {
        return Err(AppError::Forbidden);
    }
    Ok(user)
}

pub(crate) fn require_any_role(
    req: &HttpRequest,
    roles: &[AccountRole],
) -> Result<CurrentUser, AppError> {
    let user = current_user(req)?;
    if !roles.contains(&user.role) {
        return Err(AppError::Forbidden);
    }
    Ok(user)
}
