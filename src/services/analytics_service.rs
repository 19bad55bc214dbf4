use crate::error::AppResult;
use crate::external::LlmClient;
use crate::models::*;
use crate::services::demo_service::is_terminal;
use sqlx::PgPool;

const EXPLAIN_SYSTEM_PROMPT: &str = "You are an analyst for a chess academy. \
You are given funnel and revenue aggregates as JSON. Explain them in plain \
language for a non-technical operations team: call out the conversion rate, \
where prospects drop off, and how revenue is trending. Be concise.";

#[derive(Clone)]
pub struct AnalyticsService {
    pool: PgPool,
    llm: LlmClient,
}

impl AnalyticsService {
    pub fn new(pool: PgPool, llm: LlmClient) -> Self {
        Self { pool, llm }
    }

    pub async fn funnel_report(&self) -> AppResult<FunnelReport> {
        let rows: Vec<(DemoStatus, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM demos GROUP BY status")
                .fetch_all(&self.pool)
                .await?;

        Ok(build_funnel_report(rows))
    }

    pub async fn revenue_report(&self) -> AppResult<RevenueReport> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT to_char(date_trunc('month', created_at), 'YYYY-MM') AS month,
                   SUM(amount)::BIGINT AS amount
            FROM payments
            WHERE status = 'SUCCESS'
            GROUP BY 1
            ORDER BY 1
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let total = rows.iter().map(|(_, amount)| amount).sum();
        let months = rows
            .into_iter()
            .map(|(month, amount)| MonthlyRevenue { month, amount })
            .collect();

        Ok(RevenueReport { months, total })
    }

    pub async fn dashboard_summary(&self) -> AppResult<DashboardSummary> {
        let funnel = self.funnel_report().await?;
        let open_demos = funnel
            .by_status
            .iter()
            .filter(|entry| !is_terminal(entry.status))
            .map(|entry| entry.count)
            .sum();

        let active_students: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM students WHERE status = 'ACTIVE'")
                .fetch_one(&self.pool)
                .await?;
        let total_batches: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM batches")
            .fetch_one(&self.pool)
            .await?;
        let full_batches: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM batches WHERE status = 'FULL'")
                .fetch_one(&self.pool)
                .await?;

        Ok(DashboardSummary {
            funnel,
            open_demos,
            active_students,
            total_batches,
            full_batches,
        })
    }

    /// Runs the aggregations, then asks the text model to narrate them.
    pub async fn explain(&self, request: ExplainRequest) -> AppResult<ExplainResponse> {
        let funnel = self.funnel_report().await?;
        let revenue = self.revenue_report().await?;

        let aggregates = serde_json::json!({
            "funnel": funnel,
            "revenue": revenue,
        });
        let user_prompt = match request.question.as_deref() {
            Some(question) if !question.trim().is_empty() => {
                format!("{aggregates}\n\nQuestion from the team: {question}")
            }
            _ => aggregates.to_string(),
        };

        let explanation = self.llm.generate(EXPLAIN_SYSTEM_PROMPT, &user_prompt).await?;

        Ok(ExplainResponse {
            explanation,
            funnel,
            revenue,
        })
    }
}

fn build_funnel_report(rows: Vec<(DemoStatus, i64)>) -> FunnelReport {
    let total: i64 = rows.iter().map(|(_, count)| count).sum();
    let converted: i64 = rows
        .iter()
        .filter(|(status, _)| *status == DemoStatus::Converted)
        .map(|(_, count)| count)
        .sum();

    let conversion_rate = if total > 0 {
        converted as f64 / total as f64
    } else {
        0.0
    };

    let by_status = rows
        .into_iter()
        .map(|(status, count)| StatusCount { status, count })
        .collect();

    FunnelReport {
        total,
        by_status,
        conversion_rate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_funnel_report() {
        let report = build_funnel_report(vec![
            (DemoStatus::Booked, 6),
            (DemoStatus::Converted, 3),
            (DemoStatus::Dropped, 1),
        ]);
        assert_eq!(report.total, 10);
        assert!((report.conversion_rate - 0.3).abs() < f64::EPSILON);
    }

    #[test]
    fn test_build_funnel_report_empty() {
        let report = build_funnel_report(Vec::new());
        assert_eq!(report.total, 0);
        assert_eq!(report.conversion_rate, 0.0);
        assert!(report.by_status.is_empty());
    }
}
