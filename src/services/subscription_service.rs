use crate::error::{AppError, AppResult};
use crate::models::*;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

#[derive(Clone)]
pub struct SubscriptionService {
    pool: PgPool,
}

impl SubscriptionService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_subscriptions(
        &self,
        query: &SubscriptionQuery,
    ) -> AppResult<PaginatedResponse<SubscriptionResponse>> {
        let params = PaginationParams::new(query.page, query.per_page);

        let mut count_qb: QueryBuilder<Postgres> = QueryBuilder::new("SELECT COUNT(*) FROM subscriptions WHERE 1=1");
        let mut list_qb: QueryBuilder<Postgres> = QueryBuilder::new("SELECT * FROM subscriptions WHERE 1=1");
        for qb in [&mut count_qb, &mut list_qb] {
            if let Some(status) = query.status {
                qb.push(" AND status = ").push_bind(status);
            }
        }

        let total: i64 = count_qb.build_query_scalar().fetch_one(&self.pool).await?;

        list_qb
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(params.get_limit() as i64)
            .push(" OFFSET ")
            .push_bind(params.get_offset() as i64);

        let subscriptions = list_qb
            .build_query_as::<Subscription>()
            .fetch_all(&self.pool)
            .await?;

        let items: Vec<SubscriptionResponse> = subscriptions
            .into_iter()
            .map(SubscriptionResponse::from)
            .collect();

        Ok(PaginatedResponse::new(items, &params, total))
    }

    pub async fn get_subscription(&self, subscription_id: Uuid) -> AppResult<SubscriptionResponse> {
        let subscription =
            sqlx::query_as::<_, Subscription>("SELECT * FROM subscriptions WHERE id = $1")
                .bind(subscription_id)
                .fetch_optional(&self.pool)
                .await?
                .ok_or_else(|| AppError::NotFound("Subscription not found".to_string()))?;
        Ok(SubscriptionResponse::from(subscription))
    }

    /// ACTIVE → SUSPENDED, mirrored onto the student as PAUSED.
    pub async fn pause(&self, subscription_id: Uuid) -> AppResult<SubscriptionResponse> {
        self.transition(
            subscription_id,
            &[SubscriptionStatus::Active, SubscriptionStatus::PastDue],
            SubscriptionStatus::Suspended,
            StudentStatus::Paused,
        )
        .await
    }

    /// SUSPENDED → ACTIVE, mirrored onto the student as ACTIVE.
    pub async fn resume(&self, subscription_id: Uuid) -> AppResult<SubscriptionResponse> {
        self.transition(
            subscription_id,
            &[SubscriptionStatus::Suspended],
            SubscriptionStatus::Active,
            StudentStatus::Active,
        )
        .await
    }

    /// Any non-cancelled status → CANCELLED, mirrored onto the student.
    pub async fn cancel(&self, subscription_id: Uuid) -> AppResult<SubscriptionResponse> {
        self.transition(
            subscription_id,
            &[
                SubscriptionStatus::Active,
                SubscriptionStatus::PastDue,
                SubscriptionStatus::Suspended,
            ],
            SubscriptionStatus::Cancelled,
            StudentStatus::Cancelled,
        )
        .await
    }

    /// Periodic sweep: subscriptions past their due date fall to PAST_DUE.
    /// Driven by the background loop in `main`.
    pub async fn mark_past_due(&self) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions
            SET status = 'PAST_DUE', updated_at = now()
            WHERE status = 'ACTIVE' AND next_due_at < now()
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn transition(
        &self,
        subscription_id: Uuid,
        allowed_from: &[SubscriptionStatus],
        to: SubscriptionStatus,
        student_status: StudentStatus,
    ) -> AppResult<SubscriptionResponse> {
        let mut tx = self.pool.begin().await?;

        let subscription = sqlx::query_as::<_, Subscription>(
            "SELECT * FROM subscriptions WHERE id = $1 FOR UPDATE",
        )
        .bind(subscription_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Subscription not found".to_string()))?;

        if !allowed_from.contains(&subscription.status) {
            return Err(AppError::InvalidState(format!(
                "Subscription cannot change status in its current state ({:?})",
                subscription.status
            )));
        }

        let subscription = sqlx::query_as::<_, Subscription>(
            r#"
            UPDATE subscriptions SET status = $2, updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(subscription_id)
        .bind(to)
        .fetch_one(&mut *tx)
        .await?;

        // The student record carries the mirrored status for roster views.
        sqlx::query("UPDATE students SET status = $2, updated_at = now() WHERE id = $1")
            .bind(subscription.student_id)
            .bind(student_status)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        log::info!(
            "Subscription {} moved to {:?}",
            subscription.id,
            subscription.status
        );

        Ok(SubscriptionResponse::from(subscription))
    }
}
