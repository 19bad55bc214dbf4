use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "student_type")]
pub enum StudentType {
    #[serde(rename = "1-1")]
    #[sqlx(rename = "1-1")]
    OneOnOne,
    #[serde(rename = "group")]
    #[sqlx(rename = "group")]
    Group,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "student_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StudentStatus {
    Active,
    Paused,
    Cancelled,
}

#[derive(Debug, Clone, FromRow)]
pub struct Student {
    pub id: Uuid,
    pub account_id: Uuid,
    pub demo_id: Option<Uuid>,
    pub name: String,
    pub age: Option<i32>,
    pub parent_name: String,
    pub parent_email: String,
    pub timezone: String,
    pub country: Option<String>,
    pub student_type: StudentType,
    pub level: Option<String>,
    pub assigned_coach_id: Option<Uuid>,
    pub assigned_batch_id: Option<Uuid>,
    pub status: StudentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StudentResponse {
    pub id: Uuid,
    pub account_id: Uuid,
    pub name: String,
    pub age: Option<i32>,
    pub parent_name: String,
    pub parent_email: String,
    pub timezone: String,
    pub country: Option<String>,
    pub student_type: StudentType,
    pub level: Option<String>,
    pub assigned_coach_id: Option<Uuid>,
    pub assigned_batch_id: Option<Uuid>,
    pub status: StudentStatus,
    pub created_at: DateTime<Utc>,
}

impl From<Student> for StudentResponse {
    fn from(s: Student) -> Self {
        Self {
            id: s.id,
            account_id: s.account_id,
            name: s.name,
            age: s.age,
            parent_name: s.parent_name,
            parent_email: s.parent_email,
            timezone: s.timezone,
            country: s.country,
            student_type: s.student_type,
            level: s.level,
            assigned_coach_id: s.assigned_coach_id,
            assigned_batch_id: s.assigned_batch_id,
            status: s.status,
            created_at: s.created_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStudentRequest {
    pub assigned_coach_id: Option<Uuid>,
    pub level: Option<String>,
    pub status: Option<StudentStatus>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct StudentQuery {
    pub status: Option<StudentStatus>,
    pub student_type: Option<StudentType>,
    pub coach_id: Option<Uuid>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}
