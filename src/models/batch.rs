use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "batch_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchStatus {
    Active,
    Full,
    Inactive,
}

#[derive(Debug, Clone, FromRow)]
pub struct Batch {
    pub id: Uuid,
    pub name: String,
    pub coach_id: Option<Uuid>,
    pub level: Option<String>,
    pub timezone: Option<String>,
    pub max_students: i32,
    pub status: BatchStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BatchResponse {
    pub id: Uuid,
    pub name: String,
    pub coach_id: Option<Uuid>,
    pub level: Option<String>,
    pub timezone: Option<String>,
    pub max_students: i32,
    pub status: BatchStatus,
    pub student_ids: Vec<Uuid>,
    pub current_size: i64,
    pub created_at: DateTime<Utc>,
}

impl BatchResponse {
    pub fn from_batch(b: Batch, student_ids: Vec<Uuid>) -> Self {
        let current_size = student_ids.len() as i64;
        Self {
            id: b.id,
            name: b.name,
            coach_id: b.coach_id,
            level: b.level,
            timezone: b.timezone,
            max_students: b.max_students,
            status: b.status,
            student_ids,
            current_size,
            created_at: b.created_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateBatchRequest {
    pub name: String,
    pub coach_id: Option<Uuid>,
    pub level: Option<String>,
    pub timezone: Option<String>,
    pub max_students: Option<i32>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BatchQuery {
    pub status: Option<BatchStatus>,
    pub coach_id: Option<Uuid>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}
