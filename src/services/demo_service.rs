use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::services::auth_service::AuthService;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

#[derive(Clone)]
pub struct DemoService {
    pool: PgPool,
    auth_service: AuthService,
}

impl DemoService {
    pub fn new(pool: PgPool, auth_service: AuthService) -> Self {
        Self { pool, auth_service }
    }

    /// Public booking endpoint. Creates (or reuses) the parent account by
    /// email, then opens a demo in `BOOKED`.
    pub async fn book_demo(&self, request: BookDemoRequest) -> AppResult<DemoResponse> {
        let account = self
            .auth_service
            .ensure_parent_account(&request.parent_email, &request.parent_name)
            .await?;

        let demo = sqlx::query_as::<_, Demo>(
            r#"
            INSERT INTO demos (
                account_id, student_name, student_age, parent_name, parent_email,
                country, timezone, scheduled_start, scheduled_end
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(account.id)
        .bind(&request.student_name)
        .bind(request.student_age)
        .bind(&request.parent_name)
        .bind(&request.parent_email)
        .bind(&request.country)
        .bind(&request.timezone)
        .bind(request.scheduled_start)
        .bind(request.scheduled_end)
        .fetch_one(&self.pool)
        .await?;

        log::info!("Demo {} booked for account {}", demo.id, account.id);

        Ok(DemoResponse::from(demo))
    }

    pub async fn list_demos(
        &self,
        query: &DemoQuery,
    ) -> AppResult<PaginatedResponse<DemoResponse>> {
        let params = PaginationParams::new(query.page, query.per_page);

        let mut count_qb: QueryBuilder<Postgres> = QueryBuilder::new("SELECT COUNT(*) FROM demos WHERE 1=1");
        let mut list_qb: QueryBuilder<Postgres> = QueryBuilder::new("SELECT * FROM demos WHERE 1=1");
        for qb in [&mut count_qb, &mut list_qb] {
            if let Some(status) = query.status {
                qb.push(" AND status = ").push_bind(status);
            }
            if let Some(coach_id) = query.coach_id {
                qb.push(" AND coach_id = ").push_bind(coach_id);
            }
        }

        let total: i64 = count_qb.build_query_scalar().fetch_one(&self.pool).await?;

        list_qb
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(params.get_limit() as i64)
            .push(" OFFSET ")
            .push_bind(params.get_offset() as i64);

        let demos = list_qb
            .build_query_as::<Demo>()
            .fetch_all(&self.pool)
            .await?;

        let items: Vec<DemoResponse> = demos.into_iter().map(DemoResponse::from).collect();

        Ok(PaginatedResponse::new(items, &params, total))
    }

    pub async fn get_demo(&self, demo_id: Uuid) -> AppResult<DemoResponse> {
        let demo = self.fetch_demo(demo_id).await?;
        Ok(DemoResponse::from(demo))
    }

    /// Assigns a coach and meeting link. Only valid while the demo is still
    /// `BOOKED`; the status itself does not change.
    pub async fn schedule_demo(
        &self,
        demo_id: Uuid,
        admin_id: Uuid,
        request: ScheduleDemoRequest,
    ) -> AppResult<DemoResponse> {
        if request.meeting_link.trim().is_empty() {
            return Err(AppError::ValidationError(
                "meeting_link must not be empty".to_string(),
            ));
        }

        let coach_exists: Option<i32> =
            sqlx::query_scalar("SELECT 1 FROM accounts WHERE id = $1 AND role = 'COACH'")
                .bind(request.coach_id)
                .fetch_optional(&self.pool)
                .await?;
        if coach_exists.is_none() {
            return Err(AppError::NotFound("Coach not found".to_string()));
        }

        // The status guard in the WHERE clause makes precondition check and
        // mutation one atomic step.
        let result = sqlx::query(
            r#"
            UPDATE demos
            SET coach_id = $2, admin_id = $3, meeting_link = $4,
                scheduled_start = COALESCE($5, scheduled_start),
                scheduled_end = COALESCE($6, scheduled_end),
                updated_at = now()
            WHERE id = $1 AND status = 'BOOKED'
            "#,
        )
        .bind(demo_id)
        .bind(request.coach_id)
        .bind(admin_id)
        .bind(&request.meeting_link)
        .bind(request.scheduled_start)
        .bind(request.scheduled_end)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let demo = self.fetch_demo(demo_id).await?;
            return Err(AppError::InvalidState(format!(
                "Demo can only be scheduled while BOOKED (current status: {})",
                demo.status.as_str()
            )));
        }

        let demo = self.fetch_demo(demo_id).await?;
        log::info!("Demo {} scheduled with coach {}", demo_id, request.coach_id);
        Ok(DemoResponse::from(demo))
    }

    /// Admin's funnel attendance. `BOOKED` is the only state this applies to.
    pub async fn mark_attendance(
        &self,
        demo_id: Uuid,
        request: MarkAttendanceRequest,
    ) -> AppResult<DemoResponse> {
        let target = attendance_status(request.attendance);

        let result = sqlx::query(
            "UPDATE demos SET status = $2, updated_at = now() WHERE id = $1 AND status = 'BOOKED'",
        )
        .bind(demo_id)
        .bind(target)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let demo = self.fetch_demo(demo_id).await?;
            return Err(AppError::InvalidState(format!(
                "Attendance can only be marked while BOOKED (current status: {})",
                demo.status.as_str()
            )));
        }

        let demo = self.fetch_demo(demo_id).await?;
        log::info!(
            "Demo {} attendance marked: {}",
            demo_id,
            demo.status.as_str()
        );
        Ok(DemoResponse::from(demo))
    }

    /// Post-session outcome. `NOT_INTERESTED` is persisted as the terminal
    /// `DROPPED`, never as a status of its own.
    pub async fn submit_outcome(
        &self,
        demo_id: Uuid,
        request: SubmitOutcomeRequest,
    ) -> AppResult<DemoResponse> {
        let target = outcome_status(request.outcome);
        let interest = match request.outcome {
            DemoOutcome::Interested => StudentInterest::Interested,
            DemoOutcome::NotInterested => StudentInterest::NotInterested,
        };

        let (recommended_type, recommended_level) = match request.outcome {
            DemoOutcome::Interested => {
                let student_type = request.recommended_student_type.ok_or_else(|| {
                    AppError::ValidationError(
                        "recommended_student_type is required for INTERESTED".to_string(),
                    )
                })?;
                (Some(student_type), request.recommended_level)
            }
            DemoOutcome::NotInterested => (None, None),
        };

        let result = sqlx::query(
            r#"
            UPDATE demos
            SET status = $2, student_interest = $3,
                recommended_student_type = $4, recommended_level = $5,
                updated_at = now()
            WHERE id = $1 AND status = 'ATTENDED'
            "#,
        )
        .bind(demo_id)
        .bind(target)
        .bind(interest)
        .bind(recommended_type)
        .bind(&recommended_level)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let demo = self.fetch_demo(demo_id).await?;
            return Err(AppError::InvalidState(format!(
                "Outcome can only be submitted after ATTENDED (current status: {})",
                demo.status.as_str()
            )));
        }

        let demo = self.fetch_demo(demo_id).await?;
        log::info!("Demo {} outcome recorded: {}", demo_id, demo.status.as_str());
        Ok(DemoResponse::from(demo))
    }

    /// The coach's own attendance signal. Write-once, and deliberately
    /// independent of the admin-driven funnel status.
    pub async fn coach_mark_attendance(
        &self,
        demo_id: Uuid,
        coach_id: Uuid,
        request: CoachAttendanceRequest,
    ) -> AppResult<DemoResponse> {
        let demo = self.fetch_demo(demo_id).await?;
        if demo.coach_id != Some(coach_id) {
            return Err(AppError::Forbidden);
        }

        let mark = match request.attendance {
            CoachAttendanceMark::Attended => CoachAttendance::Attended,
            CoachAttendanceMark::Absent => CoachAttendance::Absent,
        };

        let result = sqlx::query(
            r#"
            UPDATE demos SET coach_attendance = $2, updated_at = now()
            WHERE id = $1 AND coach_attendance = 'NOT_MARKED'
            "#,
        )
        .bind(demo_id)
        .bind(mark)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::AlreadyMarked(
                "Coach attendance has already been marked for this demo".to_string(),
            ));
        }

        let demo = self.fetch_demo(demo_id).await?;
        Ok(DemoResponse::from(demo))
    }

    async fn fetch_demo(&self, demo_id: Uuid) -> AppResult<Demo> {
        sqlx::query_as::<_, Demo>("SELECT * FROM demos WHERE id = $1")
            .bind(demo_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Demo not found".to_string()))
    }
}

/// Funnel status an admin attendance outcome lands in.
pub(crate) fn attendance_status(outcome: AttendanceOutcome) -> DemoStatus {
    match outcome {
        AttendanceOutcome::Attended => DemoStatus::Attended,
        AttendanceOutcome::NoShow => DemoStatus::NoShow,
        AttendanceOutcome::Rescheduled => DemoStatus::Rescheduled,
        AttendanceOutcome::Cancelled => DemoStatus::Cancelled,
    }
}

/// Funnel status an outcome submission lands in. `NOT_INTERESTED` is
/// rewritten to `DROPPED`.
pub(crate) fn outcome_status(outcome: DemoOutcome) -> DemoStatus {
    match outcome {
        DemoOutcome::Interested => DemoStatus::Interested,
        DemoOutcome::NotInterested => DemoStatus::Dropped,
    }
}

/// States with no outgoing transition. `RESCHEDULED` is stored but has no
/// path back into the funnel either; see DESIGN.md.
pub(crate) fn is_terminal(status: DemoStatus) -> bool {
    matches!(
        status,
        DemoStatus::Converted | DemoStatus::Dropped | DemoStatus::Cancelled | DemoStatus::NoShow
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attendance_maps_onto_funnel_states() {
        assert_eq!(
            attendance_status(AttendanceOutcome::Attended),
            DemoStatus::Attended
        );
        assert_eq!(
            attendance_status(AttendanceOutcome::NoShow),
            DemoStatus::NoShow
        );
        assert_eq!(
            attendance_status(AttendanceOutcome::Rescheduled),
            DemoStatus::Rescheduled
        );
        assert_eq!(
            attendance_status(AttendanceOutcome::Cancelled),
            DemoStatus::Cancelled
        );
    }

    #[test]
    fn test_not_interested_is_rewritten_to_dropped() {
        assert_eq!(
            outcome_status(DemoOutcome::NotInterested),
            DemoStatus::Dropped
        );
        assert_eq!(
            outcome_status(DemoOutcome::Interested),
            DemoStatus::Interested
        );
    }

    #[test]
    fn test_terminal_states() {
        for status in [
            DemoStatus::Converted,
            DemoStatus::Dropped,
            DemoStatus::Cancelled,
            DemoStatus::NoShow,
        ] {
            assert!(is_terminal(status), "{status:?} should be terminal");
        }
        for status in [
            DemoStatus::Booked,
            DemoStatus::Attended,
            DemoStatus::Interested,
            DemoStatus::PaymentPending,
            DemoStatus::Rescheduled,
        ] {
            assert!(!is_terminal(status), "{status:?} should not be terminal");
        }
    }
}
