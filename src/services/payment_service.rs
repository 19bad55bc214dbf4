use crate::error::{AppError, AppResult};
use crate::external::RazorpayClient;
use crate::models::*;
use crate::utils::receipt::receipt_id;
use chrono::{DateTime, Months, Utc};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct PaymentService {
    pool: PgPool,
    gateway: RazorpayClient,
}

impl PaymentService {
    pub fn new(pool: PgPool, gateway: RazorpayClient) -> Self {
        Self { pool, gateway }
    }

    /// Opens a gateway order for an `INTERESTED` demo and moves it to
    /// `PAYMENT_PENDING`.
    pub async fn create_demo_order(
        &self,
        request: CreateDemoOrderRequest,
    ) -> AppResult<OrderResponse> {
        if request.amount <= 0 {
            return Err(AppError::ValidationError(
                "amount must be a positive number of minor units".to_string(),
            ));
        }

        let demo = sqlx::query_as::<_, Demo>("SELECT * FROM demos WHERE id = $1")
            .bind(request.demo_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Demo not found".to_string()))?;

        if demo.status != DemoStatus::Interested {
            return Err(AppError::NotEligible(format!(
                "Payment can only be requested for an INTERESTED demo (current status: {})",
                demo.status.as_str()
            )));
        }

        let order = self
            .gateway
            .create_order(request.amount, &receipt_id("demo"))
            .await?;

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE demos
            SET status = 'PAYMENT_PENDING', order_id = $2, order_amount = $3, updated_at = now()
            WHERE id = $1 AND status = 'INTERESTED'
            "#,
        )
        .bind(demo.id)
        .bind(&order.id)
        .bind(order.amount)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            // Lost a race with another admin; the gateway order is left
            // unreferenced and simply expires.
            return Err(AppError::NotEligible(
                "Demo is no longer awaiting payment".to_string(),
            ));
        }

        sqlx::query(
            r#"
            INSERT INTO payments (
                account_id, demo_id, purpose, plan_id, billing_cycle,
                order_id, amount, currency
            ) VALUES ($1, $2, 'DEMO_CONVERSION', $3, $4, $5, $6, $7)
            "#,
        )
        .bind(demo.account_id)
        .bind(demo.id)
        .bind(&request.plan_id)
        .bind(request.billing_cycle)
        .bind(&order.id)
        .bind(order.amount)
        .bind(&order.currency)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        log::info!(
            "Created conversion order {} for demo {} ({} {})",
            order.id,
            demo.id,
            order.amount,
            order.currency
        );

        Ok(OrderResponse {
            order_id: order.id,
            amount: order.amount,
            currency: order.currency,
        })
    }

    /// Opens a renewal order against an existing subscription.
    pub async fn create_renewal_order(
        &self,
        request: CreateRenewalOrderRequest,
    ) -> AppResult<OrderResponse> {
        let subscription =
            sqlx::query_as::<_, Subscription>("SELECT * FROM subscriptions WHERE id = $1")
                .bind(request.subscription_id)
                .fetch_optional(&self.pool)
                .await?
                .ok_or_else(|| AppError::NotFound("Subscription not found".to_string()))?;

        if !matches!(
            subscription.status,
            SubscriptionStatus::Active | SubscriptionStatus::PastDue
        ) {
            return Err(AppError::NotEligible(
                "Only ACTIVE or PAST_DUE subscriptions can be renewed".to_string(),
            ));
        }

        let order = self
            .gateway
            .create_order(subscription.amount, &receipt_id("renew"))
            .await?;

        sqlx::query(
            r#"
            INSERT INTO payments (
                account_id, subscription_id, purpose, billing_cycle,
                order_id, amount, currency
            ) VALUES ($1, $2, 'RENEWAL', $3, $4, $5, $6)
            "#,
        )
        .bind(subscription.account_id)
        .bind(subscription.id)
        .bind(subscription.billing_cycle)
        .bind(&order.id)
        .bind(order.amount)
        .bind(&order.currency)
        .execute(&self.pool)
        .await?;

        log::info!(
            "Created renewal order {} for subscription {}",
            order.id,
            subscription.id
        );

        Ok(OrderResponse {
            order_id: order.id,
            amount: order.amount,
            currency: order.currency,
        })
    }

    /// Gateway callback. The signature check is a boolean gate: a failure
    /// aborts before any mutation.
    pub async fn verify_payment(
        &self,
        request: VerifyPaymentRequest,
    ) -> AppResult<VerifyPaymentResponse> {
        if !self.gateway.verify_signature(
            &request.order_id,
            &request.payment_id,
            &request.signature,
        ) {
            log::warn!(
                "Rejected payment callback with bad signature for order {}",
                request.order_id
            );
            return Err(AppError::ValidationError(
                "Invalid payment signature".to_string(),
            ));
        }

        let payment = sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE order_id = $1")
            .bind(&request.order_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Payment order not found".to_string()))?;

        match payment.purpose {
            PaymentPurpose::DemoConversion => self.convert_demo(payment, request).await,
            PaymentPurpose::Renewal => self.apply_renewal(payment, request).await,
        }
    }

    /// The conversion transition: a `PAYMENT_PENDING` demo becomes a
    /// Student + ACTIVE Subscription + SUCCESS Payment, and the demo is
    /// closed as `CONVERTED`. One transaction covers all four writes.
    async fn convert_demo(
        &self,
        payment: Payment,
        request: VerifyPaymentRequest,
    ) -> AppResult<VerifyPaymentResponse> {
        let demo_id = payment
            .demo_id
            .ok_or_else(|| AppError::InternalError("Conversion payment without demo".to_string()))?;
        let billing_cycle = payment.billing_cycle.ok_or_else(|| {
            AppError::InternalError("Conversion payment without billing cycle".to_string())
        })?;

        let demo = sqlx::query_as::<_, Demo>("SELECT * FROM demos WHERE id = $1")
            .bind(demo_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Demo not found".to_string()))?;

        if demo.status != DemoStatus::PaymentPending {
            return Err(AppError::NotEligible(format!(
                "Demo is not awaiting payment verification (current status: {})",
                demo.status.as_str()
            )));
        }

        let existing: Option<i32> =
            sqlx::query_scalar("SELECT 1 FROM students WHERE account_id = $1")
                .bind(demo.account_id)
                .fetch_optional(&self.pool)
                .await?;
        if existing.is_some() {
            return Err(AppError::DuplicateStudent(
                "A student already exists for this account".to_string(),
            ));
        }

        let student_type = demo.recommended_student_type.ok_or_else(|| {
            AppError::ValidationError(
                "Demo has no recommended student type; outcome was never submitted".to_string(),
            )
        })?;

        let mut tx = self.pool.begin().await?;

        // Claiming the CONVERTED transition first makes this callback the
        // single winner under duplicate delivery.
        let claimed = sqlx::query(
            r#"
            UPDATE demos SET status = 'CONVERTED', updated_at = now()
            WHERE id = $1 AND status = 'PAYMENT_PENDING'
            "#,
        )
        .bind(demo.id)
        .execute(&mut *tx)
        .await?;

        if claimed.rows_affected() == 0 {
            return Err(AppError::NotEligible(
                "Demo is not awaiting payment verification".to_string(),
            ));
        }

        let student_result = sqlx::query_as::<_, Student>(
            r#"
            INSERT INTO students (
                account_id, demo_id, name, age, parent_name, parent_email,
                timezone, country, student_type, level, assigned_coach_id
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(demo.account_id)
        .bind(demo.id)
        .bind(&demo.student_name)
        .bind(demo.student_age)
        .bind(&demo.parent_name)
        .bind(&demo.parent_email)
        .bind(&demo.timezone)
        .bind(&demo.country)
        .bind(student_type)
        .bind(&demo.recommended_level)
        .bind(demo.coach_id)
        .fetch_one(&mut *tx)
        .await;

        let student = match student_result {
            Ok(student) => student,
            // The unique constraint on account_id is the backstop against a
            // concurrent conversion that slipped past the pre-check.
            Err(sqlx::Error::Database(db_err))
                if db_err.constraint() == Some("students_account_id_key") =>
            {
                return Err(AppError::DuplicateStudent(
                    "A student already exists for this account".to_string(),
                ));
            }
            Err(e) => return Err(e.into()),
        };

        let started_at = Utc::now();
        let next_due_at = add_billing_cycle(started_at, billing_cycle);

        let subscription = sqlx::query_as::<_, Subscription>(
            r#"
            INSERT INTO subscriptions (
                account_id, student_id, plan_id, amount, billing_cycle,
                status, started_at, next_due_at
            ) VALUES ($1, $2, $3, $4, $5, 'ACTIVE', $6, $7)
            RETURNING *
            "#,
        )
        .bind(demo.account_id)
        .bind(student.id)
        .bind(&payment.plan_id)
        .bind(payment.amount)
        .bind(billing_cycle)
        .bind(started_at)
        .bind(next_due_at)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE payments
            SET status = 'SUCCESS', payment_id = $2, signature = $3,
                subscription_id = $4, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(payment.id)
        .bind(&request.payment_id)
        .bind(&request.signature)
        .bind(subscription.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        log::info!(
            "Demo {} converted: student {}, subscription {}",
            demo.id,
            student.id,
            subscription.id
        );

        Ok(VerifyPaymentResponse {
            purpose: PaymentPurpose::DemoConversion,
            student_id: Some(student.id),
            subscription_id: Some(subscription.id),
            next_due_at: Some(subscription.next_due_at),
        })
    }

    /// Renewal: advance `next_due_at` by one cycle from its current value
    /// (not from now), keeping the billing anchor fixed.
    async fn apply_renewal(
        &self,
        payment: Payment,
        request: VerifyPaymentRequest,
    ) -> AppResult<VerifyPaymentResponse> {
        let subscription_id = payment.subscription_id.ok_or_else(|| {
            AppError::InternalError("Renewal payment without subscription".to_string())
        })?;

        // Duplicate delivery of an already-processed renewal is a no-op.
        if payment.status == PaymentStatus::Success {
            let subscription =
                sqlx::query_as::<_, Subscription>("SELECT * FROM subscriptions WHERE id = $1")
                    .bind(subscription_id)
                    .fetch_one(&self.pool)
                    .await?;
            return Ok(VerifyPaymentResponse {
                purpose: PaymentPurpose::Renewal,
                student_id: None,
                subscription_id: Some(subscription.id),
                next_due_at: Some(subscription.next_due_at),
            });
        }

        let mut tx = self.pool.begin().await?;

        let subscription = sqlx::query_as::<_, Subscription>(
            "SELECT * FROM subscriptions WHERE id = $1 FOR UPDATE",
        )
        .bind(subscription_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Subscription not found".to_string()))?;

        if !matches!(
            subscription.status,
            SubscriptionStatus::Active | SubscriptionStatus::PastDue
        ) {
            return Err(AppError::NotEligible(
                "Subscription is not renewable in its current status".to_string(),
            ));
        }

        let next_due_at = add_billing_cycle(subscription.next_due_at, subscription.billing_cycle);

        sqlx::query(
            r#"
            UPDATE subscriptions
            SET next_due_at = $2, status = 'ACTIVE', updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(subscription.id)
        .bind(next_due_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE payments
            SET status = 'SUCCESS', payment_id = $2, signature = $3, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(payment.id)
        .bind(&request.payment_id)
        .bind(&request.signature)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        log::info!(
            "Subscription {} renewed; next due {}",
            subscription.id,
            next_due_at
        );

        Ok(VerifyPaymentResponse {
            purpose: PaymentPurpose::Renewal,
            student_id: None,
            subscription_id: Some(subscription.id),
            next_due_at: Some(next_due_at),
        })
    }

    pub async fn list_payments(
        &self,
        params: &PaginationParams,
    ) -> AppResult<PaginatedResponse<PaymentResponse>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM payments")
            .fetch_one(&self.pool)
            .await?;

        let payments = sqlx::query_as::<_, Payment>(
            "SELECT * FROM payments ORDER BY created_at DESC LIMIT $1 OFFSET $2",
        )
        .bind(params.get_limit() as i64)
        .bind(params.get_offset() as i64)
        .fetch_all(&self.pool)
        .await?;

        let items: Vec<PaymentResponse> =
            payments.into_iter().map(PaymentResponse::from).collect();

        Ok(PaginatedResponse::new(items, params, total))
    }
}

/// One billing-cycle unit in calendar months, added to the given anchor.
pub(crate) fn add_billing_cycle(from: DateTime<Utc>, cycle: BillingCycle) -> DateTime<Utc> {
    from.checked_add_months(Months::new(cycle.months()))
        .expect("due date stays within the supported calendar range")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 10, 30, 0).unwrap()
    }

    #[test]
    fn test_add_billing_cycle_units() {
        let start = at(2026, 1, 15);
        assert_eq!(
            add_billing_cycle(start, BillingCycle::Monthly),
            at(2026, 2, 15)
        );
        assert_eq!(
            add_billing_cycle(start, BillingCycle::Quarterly),
            at(2026, 4, 15)
        );
        assert_eq!(
            add_billing_cycle(start, BillingCycle::Yearly),
            at(2027, 1, 15)
        );
    }

    #[test]
    fn test_repeated_renewals_keep_the_anchor() {
        // N renewals from the stored due date equal started_at + N units,
        // no matter when each payment actually landed.
        let started = at(2026, 3, 10);
        let mut due = add_billing_cycle(started, BillingCycle::Monthly);
        for _ in 0..11 {
            due = add_billing_cycle(due, BillingCycle::Monthly);
        }
        assert_eq!(due, at(2027, 3, 10));

        let mut due = add_billing_cycle(started, BillingCycle::Quarterly);
        for _ in 0..3 {
            due = add_billing_cycle(due, BillingCycle::Quarterly);
        }
        assert_eq!(due, at(2027, 3, 10));
    }

    #[test]
    fn test_month_end_clamps_forward() {
        // Jan 31 + 1 month lands on the last day of February.
        let start = at(2026, 1, 31);
        assert_eq!(
            add_billing_cycle(start, BillingCycle::Monthly),
            at(2026, 2, 28)
        );
    }
}
