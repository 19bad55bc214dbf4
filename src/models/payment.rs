use crate::models::subscription::BillingCycle;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "payment_purpose", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentPurpose {
    DemoConversion,
    Renewal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "payment_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Created,
    Success,
    Failed,
}

#[derive(Debug, Clone, FromRow)]
pub struct Payment {
    pub id: Uuid,
    pub account_id: Uuid,
    pub demo_id: Option<Uuid>,
    pub subscription_id: Option<Uuid>,
    pub purpose: PaymentPurpose,
    pub plan_id: Option<String>,
    pub billing_cycle: Option<BillingCycle>,
    pub order_id: String,
    pub payment_id: Option<String>,
    pub signature: Option<String>,
    pub amount: i64,
    pub currency: String,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PaymentResponse {
    pub id: Uuid,
    pub account_id: Uuid,
    pub demo_id: Option<Uuid>,
    pub subscription_id: Option<Uuid>,
    pub purpose: PaymentPurpose,
    pub order_id: String,
    pub payment_id: Option<String>,
    pub amount: i64,
    pub currency: String,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
}

impl From<Payment> for PaymentResponse {
    fn from(p: Payment) -> Self {
        Self {
            id: p.id,
            account_id: p.account_id,
            demo_id: p.demo_id,
            subscription_id: p.subscription_id,
            purpose: p.purpose,
            order_id: p.order_id,
            payment_id: p.payment_id,
            amount: p.amount,
            currency: p.currency,
            status: p.status,
            created_at: p.created_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateDemoOrderRequest {
    pub demo_id: Uuid,
    /// Amount in minor units (paise).
    pub amount: i64,
    pub billing_cycle: BillingCycle,
    pub plan_id: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateRenewalOrderRequest {
    pub subscription_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderResponse {
    pub order_id: String,
    pub amount: i64,
    pub currency: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct VerifyPaymentRequest {
    pub order_id: String,
    pub payment_id: String,
    pub signature: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VerifyPaymentResponse {
    pub purpose: PaymentPurpose,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_due_at: Option<DateTime<Utc>>,
}
