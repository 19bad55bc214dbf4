use crate::models::demo::DemoStatus;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StatusCount {
    pub status: DemoStatus,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FunnelReport {
    pub total: i64,
    pub by_status: Vec<StatusCount>,
    /// CONVERTED / total, 0.0 when no demos exist.
    pub conversion_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MonthlyRevenue {
    pub month: String,
    pub amount: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RevenueReport {
    pub months: Vec<MonthlyRevenue>,
    pub total: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DashboardSummary {
    pub funnel: FunnelReport,
    /// Demos still moving through the funnel (non-terminal statuses).
    pub open_demos: i64,
    pub active_students: i64,
    pub total_batches: i64,
    pub full_batches: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ExplainRequest {
    /// Optional focusing question from the dashboard user.
    pub question: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ExplainResponse {
    pub explanation: String,
    pub funnel: FunnelReport,
    pub revenue: RevenueReport,
}
