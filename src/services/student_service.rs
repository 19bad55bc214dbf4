use crate::error::{AppError, AppResult};
use crate::models::*;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

#[derive(Clone)]
pub struct StudentService {
    pool: PgPool,
}

impl StudentService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_students(
        &self,
        query: &StudentQuery,
    ) -> AppResult<PaginatedResponse<StudentResponse>> {
        let params = PaginationParams::new(query.page, query.per_page);

        let mut count_qb: QueryBuilder<Postgres> = QueryBuilder::new("SELECT COUNT(*) FROM students WHERE 1=1");
        let mut list_qb: QueryBuilder<Postgres> = QueryBuilder::new("SELECT * FROM students WHERE 1=1");
        for qb in [&mut count_qb, &mut list_qb] {
            if let Some(status) = query.status {
                qb.push(" AND status = ").push_bind(status);
            }
            if let Some(student_type) = query.student_type {
                qb.push(" AND student_type = ").push_bind(student_type);
            }
            if let Some(coach_id) = query.coach_id {
                qb.push(" AND assigned_coach_id = ").push_bind(coach_id);
            }
        }

        let total: i64 = count_qb.build_query_scalar().fetch_one(&self.pool).await?;

        list_qb
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(params.get_limit() as i64)
            .push(" OFFSET ")
            .push_bind(params.get_offset() as i64);

        let students = list_qb
            .build_query_as::<Student>()
            .fetch_all(&self.pool)
            .await?;

        let items: Vec<StudentResponse> =
            students.into_iter().map(StudentResponse::from).collect();

        Ok(PaginatedResponse::new(items, &params, total))
    }

    pub async fn get_student(&self, student_id: Uuid) -> AppResult<StudentResponse> {
        let student = self.fetch(student_id).await?;
        Ok(StudentResponse::from(student))
    }

    pub async fn update_student(
        &self,
        student_id: Uuid,
        request: UpdateStudentRequest,
    ) -> AppResult<StudentResponse> {
        let student = self.fetch(student_id).await?;

        if let Some(coach_id) = request.assigned_coach_id {
            let coach_exists: Option<i32> =
                sqlx::query_scalar("SELECT 1 FROM accounts WHERE id = $1 AND role = 'COACH'")
                    .bind(coach_id)
                    .fetch_optional(&self.pool)
                    .await?;
            if coach_exists.is_none() {
                return Err(AppError::NotFound("Coach not found".to_string()));
            }

            // Batch membership pins the coach; the batch must be left (or the
            // batch's coach changed) before the student can be reassigned.
            if let Some(batch_id) = student.assigned_batch_id {
                let batch_coach: Option<Option<Uuid>> =
                    sqlx::query_scalar("SELECT coach_id FROM batches WHERE id = $1")
                        .bind(batch_id)
                        .fetch_optional(&self.pool)
                        .await?;
                if let Some(Some(pinned)) = batch_coach {
                    if pinned != coach_id {
                        return Err(AppError::ValidationError(
                            "Student's coach is pinned by batch membership".to_string(),
                        ));
                    }
                }
            }
        }

        let student = sqlx::query_as::<_, Student>(
            r#"
            UPDATE students
            SET assigned_coach_id = COALESCE($2, assigned_coach_id),
                level = COALESCE($3, level),
                status = COALESCE($4, status),
                updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(student_id)
        .bind(request.assigned_coach_id)
        .bind(&request.level)
        .bind(request.status)
        .fetch_one(&self.pool)
        .await?;

        Ok(StudentResponse::from(student))
    }

    async fn fetch(&self, student_id: Uuid) -> AppResult<Student> {
        sqlx::query_as::<_, Student>("SELECT * FROM students WHERE id = $1")
            .bind(student_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Student not found".to_string()))
    }
}
