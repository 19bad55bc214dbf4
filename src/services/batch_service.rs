use crate::error::{AppError, AppResult};
use crate::models::*;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

#[derive(Clone)]
pub struct BatchService {
    pool: PgPool,
}

impl BatchService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_batch(&self, request: CreateBatchRequest) -> AppResult<BatchResponse> {
        let max_students = request.max_students.unwrap_or(5);
        if max_students < 1 {
            return Err(AppError::ValidationError(
                "max_students must be at least 1".to_string(),
            ));
        }

        if let Some(coach_id) = request.coach_id {
            let coach_exists: Option<i32> =
                sqlx::query_scalar("SELECT 1 FROM accounts WHERE id = $1 AND role = 'COACH'")
                    .bind(coach_id)
                    .fetch_optional(&self.pool)
                    .await?;
            if coach_exists.is_none() {
                return Err(AppError::NotFound("Coach not found".to_string()));
            }
        }

        let batch = sqlx::query_as::<_, Batch>(
            r#"
            INSERT INTO batches (name, coach_id, level, timezone, max_students)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(&request.name)
        .bind(request.coach_id)
        .bind(&request.level)
        .bind(&request.timezone)
        .bind(max_students)
        .fetch_one(&self.pool)
        .await?;

        log::info!("Batch {} created (capacity {})", batch.id, max_students);
        Ok(BatchResponse::from_batch(batch, Vec::new()))
    }

    pub async fn list_batches(
        &self,
        query: &BatchQuery,
    ) -> AppResult<PaginatedResponse<BatchResponse>> {
        let params = PaginationParams::new(query.page, query.per_page);

        let mut count_qb: QueryBuilder<Postgres> = QueryBuilder::new("SELECT COUNT(*) FROM batches WHERE 1=1");
        let mut list_qb: QueryBuilder<Postgres> = QueryBuilder::new("SELECT * FROM batches WHERE 1=1");
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

        let batches = list_qb
            .build_query_as::<Batch>()
            .fetch_all(&self.pool)
            .await?;

        let batch_ids: Vec<Uuid> = batches.iter().map(|b| b.id).collect();
        let memberships: Vec<(Uuid, Uuid)> = sqlx::query_as(
            "SELECT batch_id, student_id FROM batch_students WHERE batch_id = ANY($1)",
        )
        .bind(&batch_ids)
        .fetch_all(&self.pool)
        .await?;

        let items: Vec<BatchResponse> = batches
            .into_iter()
            .map(|batch| {
                let members = memberships
                    .iter()
                    .filter(|(batch_id, _)| *batch_id == batch.id)
                    .map(|(_, student_id)| *student_id)
                    .collect();
                BatchResponse::from_batch(batch, members)
            })
            .collect();

        Ok(PaginatedResponse::new(items, &params, total))
    }

    pub async fn get_batch(&self, batch_id: Uuid) -> AppResult<BatchResponse> {
        let batch = sqlx::query_as::<_, Batch>("SELECT * FROM batches WHERE id = $1")
            .bind(batch_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Batch not found".to_string()))?;

        let members = self.member_ids(batch_id).await?;
        Ok(BatchResponse::from_batch(batch, members))
    }

    /// Adds a group student. The batch row is locked for the duration of the
    /// transaction so two concurrent adds cannot both pass the size check.
    pub async fn add_student(&self, batch_id: Uuid, student_id: Uuid) -> AppResult<BatchResponse> {
        let mut tx = self.pool.begin().await?;

        let batch =
            sqlx::query_as::<_, Batch>("SELECT * FROM batches WHERE id = $1 FOR UPDATE")
                .bind(batch_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| AppError::NotFound("Batch not found".to_string()))?;

        let student =
            sqlx::query_as::<_, Student>("SELECT * FROM students WHERE id = $1 FOR UPDATE")
                .bind(student_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| AppError::NotFound("Student not found".to_string()))?;

        if student.student_type != StudentType::Group {
            return Err(AppError::TypeMismatch(
                "Only group students can join a batch".to_string(),
            ));
        }

        match student.assigned_batch_id {
            Some(existing) if existing == batch_id => {
                return Err(AppError::AlreadyMember(
                    "Student is already in this batch".to_string(),
                ));
            }
            Some(_) => {
                return Err(AppError::ValidationError(
                    "Student already belongs to another batch".to_string(),
                ));
            }
            None => {}
        }

        let size: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM batch_students WHERE batch_id = $1")
                .bind(batch_id)
                .fetch_one(&mut *tx)
                .await?;

        if size >= batch.max_students as i64 {
            return Err(AppError::BatchFull(format!(
                "Batch is at capacity ({} students)",
                batch.max_students
            )));
        }

        let inserted = sqlx::query(
            r#"
            INSERT INTO batch_students (batch_id, student_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(batch_id)
        .bind(student_id)
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() == 0 {
            return Err(AppError::AlreadyMember(
                "Student is already in this batch".to_string(),
            ));
        }

        let new_status = status_after_add(batch.status, size + 1, batch.max_students);
        if new_status != batch.status {
            sqlx::query("UPDATE batches SET status = $2, updated_at = now() WHERE id = $1")
                .bind(batch_id)
                .bind(new_status)
                .execute(&mut *tx)
                .await?;
        }

        // Joining a batch always hands the student to the batch's coach,
        // when the batch has one.
        sqlx::query(
            r#"
            UPDATE students
            SET assigned_batch_id = $2,
                assigned_coach_id = COALESCE($3, assigned_coach_id),
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(student_id)
        .bind(batch_id)
        .bind(batch.coach_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        log::info!(
            "Student {} added to batch {} ({}/{})",
            student_id,
            batch_id,
            size + 1,
            batch.max_students
        );

        self.get_batch(batch_id).await
    }

    /// Removes a member. Only the `FULL → ACTIVE` edge is handled here; an
    /// INACTIVE batch stays INACTIVE.
    pub async fn remove_student(
        &self,
        batch_id: Uuid,
        student_id: Uuid,
    ) -> AppResult<BatchResponse> {
        let mut tx = self.pool.begin().await?;

        let batch =
            sqlx::query_as::<_, Batch>("SELECT * FROM batches WHERE id = $1 FOR UPDATE")
                .bind(batch_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| AppError::NotFound("Batch not found".to_string()))?;

        let removed = sqlx::query(
            "DELETE FROM batch_students WHERE batch_id = $1 AND student_id = $2",
        )
        .bind(batch_id)
        .bind(student_id)
        .execute(&mut *tx)
        .await?;

        if removed.rows_affected() == 0 {
            return Err(AppError::NotMember(
                "Student is not a member of this batch".to_string(),
            ));
        }

        let new_status = status_after_remove(batch.status);
        if new_status != batch.status {
            sqlx::query("UPDATE batches SET status = $2, updated_at = now() WHERE id = $1")
                .bind(batch_id)
                .bind(new_status)
                .execute(&mut *tx)
                .await?;
        }

        sqlx::query(
            r#"
            UPDATE students
            SET assigned_batch_id = NULL, assigned_coach_id = NULL, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(student_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        log::info!("Student {} removed from batch {}", student_id, batch_id);
        self.get_batch(batch_id).await
    }

    /// Deletes the batch and unlinks its members. Coach assignments are kept;
    /// only explicit per-student removal clears them.
    pub async fn delete_batch(&self, batch_id: Uuid) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE students SET assigned_batch_id = NULL, updated_at = now()
            WHERE assigned_batch_id = $1
            "#,
        )
        .bind(batch_id)
        .execute(&mut *tx)
        .await?;

        let deleted = sqlx::query("DELETE FROM batches WHERE id = $1")
            .bind(batch_id)
            .execute(&mut *tx)
            .await?;

        if deleted.rows_affected() == 0 {
            return Err(AppError::NotFound("Batch not found".to_string()));
        }

        tx.commit().await?;

        log::info!("Batch {} deleted", batch_id);
        Ok(())
    }

    async fn member_ids(&self, batch_id: Uuid) -> AppResult<Vec<Uuid>> {
        let ids: Vec<(Uuid,)> = sqlx::query_as(
            "SELECT student_id FROM batch_students WHERE batch_id = $1 ORDER BY added_at",
        )
        .bind(batch_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids.into_iter().map(|(id,)| id).collect())
    }
}

/// `FULL` exactly when the new size reaches capacity.
pub(crate) fn status_after_add(current: BatchStatus, new_size: i64, max_students: i32) -> BatchStatus {
    if new_size >= max_students as i64 {
        BatchStatus::Full
    } else {
        current
    }
}

/// Removal only reverts the `FULL` marker; other statuses pass through.
pub(crate) fn status_after_remove(current: BatchStatus) -> BatchStatus {
    if current == BatchStatus::Full {
        BatchStatus::Active
    } else {
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_after_add_flips_to_full_at_capacity() {
        assert_eq!(
            status_after_add(BatchStatus::Active, 4, 5),
            BatchStatus::Active
        );
        assert_eq!(status_after_add(BatchStatus::Active, 5, 5), BatchStatus::Full);
    }

    #[test]
    fn test_status_after_remove_handles_only_the_full_edge() {
        assert_eq!(status_after_remove(BatchStatus::Full), BatchStatus::Active);
        assert_eq!(
            status_after_remove(BatchStatus::Active),
            BatchStatus::Active
        );
        assert_eq!(
            status_after_remove(BatchStatus::Inactive),
            BatchStatus::Inactive
        );
    }

    #[test]
    fn test_full_iff_size_equals_capacity() {
        for max in 1..=6 {
            for size in 0..=max {
                let status = status_after_add(BatchStatus::Active, size as i64, max);
                assert_eq!(status == BatchStatus::Full, size == max);
            }
        }
    }
}
