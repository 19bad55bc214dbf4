use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "billing_cycle", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BillingCycle {
    Monthly,
    Quarterly,
    Yearly,
}

impl BillingCycle {
    /// Calendar months added per cycle unit.
    pub fn months(&self) -> u32 {
        match self {
            BillingCycle::Monthly => 1,
            BillingCycle::Quarterly => 3,
            BillingCycle::Yearly => 12,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "subscription_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionStatus {
    Active,
    PastDue,
    Suspended,
    Cancelled,
}

#[derive(Debug, Clone, FromRow)]
pub struct Subscription {
    pub id: Uuid,
    pub account_id: Uuid,
    pub student_id: Uuid,
    pub plan_id: Option<String>,
    pub amount: i64,
    pub billing_cycle: BillingCycle,
    pub status: SubscriptionStatus,
    pub started_at: DateTime<Utc>,
    pub next_due_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SubscriptionResponse {
    pub id: Uuid,
    pub account_id: Uuid,
    pub student_id: Uuid,
    pub plan_id: Option<String>,
    pub amount: i64,
    pub billing_cycle: BillingCycle,
    pub status: SubscriptionStatus,
    pub started_at: DateTime<Utc>,
    pub next_due_at: DateTime<Utc>,
}

impl From<Subscription> for SubscriptionResponse {
    fn from(s: Subscription) -> Self {
        Self {
            id: s.id,
            account_id: s.account_id,
            student_id: s.student_id,
            plan_id: s.plan_id,
            amount: s.amount,
            billing_cycle: s.billing_cycle,
            status: s.status,
            started_at: s.started_at,
            next_due_at: s.next_due_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SubscriptionQuery {
    pub status: Option<SubscriptionStatus>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}
