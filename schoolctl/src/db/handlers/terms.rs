//! PostgreSQL repository for per-term student records.

use crate::db::{
    errors::Result,
    handlers::repository::TermRepository,
    models::terms::{TermDBResponse, TermFilter, TermUpsertDBRequest, TermUpsertDBResponse},
};
use crate::types::{StudentId, TermId};
use sqlx::{Connection, PgConnection};
use tracing::instrument;

const TERM_COLUMNS: &str = "id, student_id, term_number, academic_year, attendance, academic_score, remarks, \
                            file_name, file_path, file_size, file_type, created_at, updated_at";

pub struct Terms<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Terms<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }
}

#[async_trait::async_trait]
impl<'c> TermRepository for Terms<'c> {
    #[instrument(skip(self, request), fields(student_id = request.student_id, term_number = request.term_number, academic_year = %request.academic_year), err)]
    async fn upsert(&mut self, request: &TermUpsertDBRequest) -> Result<TermUpsertDBResponse> {
        let mut tx = self.db.begin().await?;

        // Lock the existing row, if any, so the attachment we report as replaced is the one we overwrite
        let previous_file_path: Option<Option<String>> = sqlx::query_scalar(
            "SELECT file_path FROM student_terms WHERE student_id = $1 AND term_number = $2 AND academic_year = $3 FOR UPDATE",
        )
        .bind(request.student_id)
        .bind(request.term_number)
        .bind(&request.academic_year)
        .fetch_optional(&mut *tx)
        .await?;

        let attachment = request.attachment.as_ref();

        // Attachment columns are written together, so COALESCE keeps the stored file when none is supplied
        let term = sqlx::query_as::<_, TermDBResponse>(&format!(
            r#"
            INSERT INTO student_terms
                (student_id, term_number, academic_year, attendance, academic_score, remarks, file_name, file_path, file_size, file_type)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (student_id, term_number, academic_year) DO UPDATE SET
                attendance = EXCLUDED.attendance,
                academic_score = EXCLUDED.academic_score,
                remarks = EXCLUDED.remarks,
                file_name = COALESCE(EXCLUDED.file_name, student_terms.file_name),
                file_path = COALESCE(EXCLUDED.file_path, student_terms.file_path),
                file_size = COALESCE(EXCLUDED.file_size, student_terms.file_size),
                file_type = COALESCE(EXCLUDED.file_type, student_terms.file_type),
                updated_at = NOW()
            RETURNING {TERM_COLUMNS}
            "#
        ))
        .bind(request.student_id)
        .bind(request.term_number)
        .bind(&request.academic_year)
        .bind(request.attendance)
        .bind(request.academic_score)
        .bind(&request.remarks)
        .bind(attachment.map(|a| a.file_name.as_str()))
        .bind(attachment.map(|a| a.file_path.as_str()))
        .bind(attachment.map(|a| a.file_size))
        .bind(attachment.map(|a| a.file_type.as_str()))
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        let replaced_file_path = match (attachment, previous_file_path.flatten()) {
            (Some(new), Some(old)) if new.file_path != old => Some(old),
            _ => None,
        };

        Ok(TermUpsertDBResponse { term, replaced_file_path })
    }

    #[instrument(skip(self), err)]
    async fn get_for_student(&mut self, student_id: StudentId, term_id: TermId) -> Result<Option<TermDBResponse>> {
        let term = sqlx::query_as::<_, TermDBResponse>(&format!(
            "SELECT {TERM_COLUMNS} FROM student_terms WHERE id = $1 AND student_id = $2"
        ))
        .bind(term_id)
        .bind(student_id)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(term)
    }

    #[instrument(skip(self, filter), fields(student_id = filter.student_id), err)]
    async fn list(&mut self, filter: &TermFilter) -> Result<Vec<TermDBResponse>> {
        let terms = sqlx::query_as::<_, TermDBResponse>(&format!(
            r#"
            SELECT {TERM_COLUMNS} FROM student_terms
            WHERE student_id = $1
              AND ($2::int IS NULL OR term_number = $2)
              AND ($3::text IS NULL OR academic_year = $3)
            ORDER BY academic_year, term_number
            "#
        ))
        .bind(filter.student_id)
        .bind(filter.term_number)
        .bind(&filter.academic_year)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(terms)
    }

    #[instrument(skip(self), err)]
    async fn delete(&mut self, term_id: TermId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM student_terms WHERE id = $1")
            .bind(term_id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::students::{CcaOptional, StudentStatus};
    use crate::db::errors::DbError;
    use crate::db::handlers::{Students, repository::Repository};
    use crate::db::models::{students::StudentCreateDBRequest, terms::TermAttachment};
    use chrono::NaiveDate;
    use sqlx::PgPool;

    async fn create_student(conn: &mut PgConnection) -> StudentId {
        let request = StudentCreateDBRequest {
            full_name: "Term Student".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(2011, 2, 3).unwrap(),
            class: "3C".to_string(),
            status: StudentStatus::Active,
            sports_house: None,
            cca: None,
            cca_optional: CcaOptional::NoActivity,
            quran_teacher: None,
            gender: None,
        };
        Students::new(conn).create(&request).await.unwrap().id
    }

    fn upsert(student_id: StudentId, term_number: i32, file: Option<&str>) -> TermUpsertDBRequest {
        TermUpsertDBRequest {
            student_id,
            term_number,
            academic_year: "2024-2025".to_string(),
            attendance: 90.0,
            academic_score: 80.5,
            remarks: None,
            attachment: file.map(|path| TermAttachment {
                file_name: "report.pdf".to_string(),
                file_path: path.to_string(),
                file_size: 12,
                file_type: "application/pdf".to_string(),
            }),
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_upsert_replaces_and_reports_old_attachment(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let student_id = create_student(&mut conn).await;
        let mut repo = Terms::new(&mut conn);

        let first = repo.upsert(&upsert(student_id, 1, Some("a.pdf"))).await.unwrap();
        assert_eq!(first.replaced_file_path, None);

        // No new file: existing attachment is kept
        let mut second = upsert(student_id, 1, None);
        second.attendance = 75.0;
        let kept = repo.upsert(&second).await.unwrap();
        assert_eq!(kept.term.id, first.term.id);
        assert_eq!(kept.term.attendance, 75.0);
        assert_eq!(kept.term.file_path.as_deref(), Some("a.pdf"));
        assert_eq!(kept.replaced_file_path, None);

        let replaced = repo.upsert(&upsert(student_id, 1, Some("b.pdf"))).await.unwrap();
        assert_eq!(replaced.replaced_file_path.as_deref(), Some("a.pdf"));
        assert_eq!(replaced.term.file_path.as_deref(), Some("b.pdf"));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_list_orders_and_scopes_to_student(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let student_id = create_student(&mut conn).await;
        let mut repo = Terms::new(&mut conn);

        repo.upsert(&upsert(student_id, 3, None)).await.unwrap();
        let t1 = repo.upsert(&upsert(student_id, 1, None)).await.unwrap().term;

        let terms = repo.list(&TermFilter::new(student_id)).await.unwrap();
        assert_eq!(terms.iter().map(|t| t.term_number).collect::<Vec<_>>(), vec![1, 3]);

        assert!(repo.get_for_student(student_id + 1, t1.id).await.unwrap().is_none());
        assert!(repo.delete(t1.id).await.unwrap());
        assert!(repo.get_for_student(student_id, t1.id).await.unwrap().is_none());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_upsert_for_missing_student_is_foreign_key_violation(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Terms::new(&mut conn);

        let result = repo.upsert(&upsert(424242, 1, None)).await;
        assert!(matches!(result, Err(DbError::ForeignKeyViolation { .. })));
    }
}
