use crate::models::student::StudentType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Authoritative funnel state. Transitions are driven only by this field;
/// `student_interest` and `coach_attendance` are independent signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "demo_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DemoStatus {
    Booked,
    Attended,
    NoShow,
    Rescheduled,
    Cancelled,
    Interested,
    NotInterested,
    PaymentPending,
    Converted,
    Dropped,
}

impl DemoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DemoStatus::Booked => "BOOKED",
            DemoStatus::Attended => "ATTENDED",
            DemoStatus::NoShow => "NO_SHOW",
            DemoStatus::Rescheduled => "RESCHEDULED",
            DemoStatus::Cancelled => "CANCELLED",
            DemoStatus::Interested => "INTERESTED",
            DemoStatus::NotInterested => "NOT_INTERESTED",
            DemoStatus::PaymentPending => "PAYMENT_PENDING",
            DemoStatus::Converted => "CONVERTED",
            DemoStatus::Dropped => "DROPPED",
        }
    }
}

/// Parent-reported interest, captured alongside the funnel state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "student_interest", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StudentInterest {
    Pending,
    Interested,
    NotInterested,
}

/// The coach's own attendance signal. Separate channel from the admin's
/// funnel attendance; never written into `status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "coach_attendance", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CoachAttendance {
    NotMarked,
    Attended,
    Absent,
}

#[derive(Debug, Clone, FromRow)]
pub struct Demo {
    pub id: Uuid,
    pub account_id: Uuid,
    pub student_name: String,
    pub student_age: Option<i32>,
    pub parent_name: String,
    pub parent_email: String,
    pub country: Option<String>,
    pub timezone: String,
    pub scheduled_start: Option<DateTime<Utc>>,
    pub scheduled_end: Option<DateTime<Utc>>,
    pub coach_id: Option<Uuid>,
    pub admin_id: Option<Uuid>,
    pub meeting_link: Option<String>,
    pub status: DemoStatus,
    pub student_interest: StudentInterest,
    pub coach_attendance: CoachAttendance,
    pub recommended_student_type: Option<StudentType>,
    pub recommended_level: Option<String>,
    pub order_id: Option<String>,
    pub order_amount: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DemoResponse {
    pub id: Uuid,
    pub account_id: Uuid,
    pub student_name: String,
    pub student_age: Option<i32>,
    pub parent_name: String,
    pub parent_email: String,
    pub country: Option<String>,
    pub timezone: String,
    pub scheduled_start: Option<DateTime<Utc>>,
    pub scheduled_end: Option<DateTime<Utc>>,
    pub coach_id: Option<Uuid>,
    pub admin_id: Option<Uuid>,
    pub meeting_link: Option<String>,
    pub status: DemoStatus,
    pub student_interest: StudentInterest,
    pub coach_attendance: CoachAttendance,
    pub recommended_student_type: Option<StudentType>,
    pub recommended_level: Option<String>,
    pub order_id: Option<String>,
    pub order_amount: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl From<Demo> for DemoResponse {
    fn from(d: Demo) -> Self {
        Self {
            id: d.id,
            account_id: d.account_id,
            student_name: d.student_name,
            student_age: d.student_age,
            parent_name: d.parent_name,
            parent_email: d.parent_email,
            country: d.country,
            timezone: d.timezone,
            scheduled_start: d.scheduled_start,
            scheduled_end: d.scheduled_end,
            coach_id: d.coach_id,
            admin_id: d.admin_id,
            meeting_link: d.meeting_link,
            status: d.status,
            student_interest: d.student_interest,
            coach_attendance: d.coach_attendance,
            recommended_student_type: d.recommended_student_type,
            recommended_level: d.recommended_level,
            order_id: d.order_id,
            order_amount: d.order_amount,
            created_at: d.created_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BookDemoRequest {
    pub student_name: String,
    pub student_age: Option<i32>,
    pub parent_name: String,
    pub parent_email: String,
    pub country: Option<String>,
    pub timezone: String,
    pub scheduled_start: Option<DateTime<Utc>>,
    pub scheduled_end: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ScheduleDemoRequest {
    pub coach_id: Uuid,
    pub meeting_link: String,
    pub scheduled_start: Option<DateTime<Utc>>,
    pub scheduled_end: Option<DateTime<Utc>>,
}

/// Admin attendance outcomes. Deliberately narrower than `DemoStatus` so a
/// request naming any other status fails deserialization outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttendanceOutcome {
    Attended,
    NoShow,
    Rescheduled,
    Cancelled,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct MarkAttendanceRequest {
    pub attendance: AttendanceOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DemoOutcome {
    Interested,
    NotInterested,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitOutcomeRequest {
    pub outcome: DemoOutcome,
    pub recommended_student_type: Option<StudentType>,
    pub recommended_level: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CoachAttendanceMark {
    Attended,
    Absent,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CoachAttendanceRequest {
    pub attendance: CoachAttendanceMark,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DemoQuery {
    pub status: Option<DemoStatus>,
    pub coach_id: Option<Uuid>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}
