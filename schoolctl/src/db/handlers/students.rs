//! PostgreSQL repository for students.

use crate::types::StudentId;
use crate::{
    api::models::students::Gender,
    db::{
        errors::{DbError, Result},
        handlers::repository::{Repository, StudentRepository},
        models::students::{StudentCreateDBRequest, StudentDBResponse, StudentFilter, StudentStatsDBResponse, StudentUpdateDBRequest},
    },
};
use sqlx::{Connection, PgConnection};
use tracing::instrument;

const STUDENT_COLUMNS: &str = "id, full_name, date_of_birth, class, status, sports_house, cca, cca_optional, \
                               quran_teacher, gender, created_at, updated_at";

// Shared by list and count so the two always agree
const STUDENT_FILTER: &str = "($1::text IS NULL OR class = $1) \
                              AND ($2::text[] IS NULL OR class = ANY($2)) \
                              AND ($3::student_status IS NULL OR status = $3)";

pub struct Students<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Students<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Students<'c> {
    type CreateRequest = StudentCreateDBRequest;
    type UpdateRequest = StudentUpdateDBRequest;
    type Response = StudentDBResponse;
    type Id = StudentId;
    type Filter = StudentFilter;

    #[instrument(skip(self, request), fields(class = %request.class), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let student = sqlx::query_as::<_, StudentDBResponse>(&format!(
            r#"
            INSERT INTO students (full_name, date_of_birth, class, status, sports_house, cca, cca_optional, quran_teacher, gender)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {STUDENT_COLUMNS}
            "#
        ))
        .bind(&request.full_name)
        .bind(request.date_of_birth)
        .bind(&request.class)
        .bind(request.status)
        .bind(request.sports_house)
        .bind(request.cca)
        .bind(request.cca_optional)
        .bind(&request.quran_teacher)
        .bind(request.gender)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(student)
    }

    #[instrument(skip(self), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let student = sqlx::query_as::<_, StudentDBResponse>(&format!("SELECT {STUDENT_COLUMNS} FROM students WHERE id = $1"))
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(student)
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let students = sqlx::query_as::<_, StudentDBResponse>(&format!(
            "SELECT {STUDENT_COLUMNS} FROM students WHERE {STUDENT_FILTER} ORDER BY created_at DESC, id DESC LIMIT $4 OFFSET $5"
        ))
        .bind(&filter.class)
        .bind(filter.classes.as_deref())
        .bind(filter.status)
        .bind(filter.limit)
        .bind(filter.skip)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(students)
    }

    #[instrument(skip(self), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        // Term records go with the student (ON DELETE CASCADE)
        let result = sqlx::query("DELETE FROM students WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        // Nullable columns take a "touched" flag so an explicit null clears them
        let student = sqlx::query_as::<_, StudentDBResponse>(&format!(
            r#"
            UPDATE students SET
                full_name = COALESCE($2, full_name),
                date_of_birth = COALESCE($3, date_of_birth),
                class = COALESCE($4, class),
                status = COALESCE($5, status),
                sports_house = CASE WHEN $6 THEN $7::sports_house ELSE sports_house END,
                cca = CASE WHEN $8 THEN $9::cca ELSE cca END,
                cca_optional = COALESCE($10, cca_optional),
                quran_teacher = CASE WHEN $11 THEN $12 ELSE quran_teacher END,
                gender = CASE WHEN $13 THEN $14::gender ELSE gender END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {STUDENT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&request.full_name)
        .bind(request.date_of_birth)
        .bind(&request.class)
        .bind(request.status)
        .bind(request.sports_house.is_some())
        .bind(request.sports_house.flatten())
        .bind(request.cca.is_some())
        .bind(request.cca.flatten())
        .bind(request.cca_optional)
        .bind(request.quran_teacher.is_some())
        .bind(request.quran_teacher.clone().flatten())
        .bind(request.gender.is_some())
        .bind(request.gender.flatten())
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(student)
    }
}

#[async_trait::async_trait]
impl<'c> StudentRepository for Students<'c> {
    #[instrument(skip(self, filter), err)]
    async fn count(&mut self, filter: &StudentFilter) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM students WHERE {STUDENT_FILTER}"))
            .bind(&filter.class)
            .bind(filter.classes.as_deref())
            .bind(filter.status)
            .fetch_one(&mut *self.db)
            .await?;

        Ok(count)
    }

    #[instrument(skip(self), err)]
    async fn stats(&mut self) -> Result<StudentStatsDBResponse> {
        // One snapshot for all three aggregates
        let mut tx = self.db.begin().await?;

        let total_students: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM students").fetch_one(&mut *tx).await?;

        let gender_counts = sqlx::query_as::<_, (Option<Gender>, i64)>(
            "SELECT gender, COUNT(*) AS count FROM students GROUP BY gender ORDER BY count DESC, gender NULLS LAST",
        )
        .fetch_all(&mut *tx)
        .await?;

        let class_counts = sqlx::query_as::<_, (String, i64)>("SELECT class, COUNT(*) FROM students GROUP BY class ORDER BY class")
            .fetch_all(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(StudentStatsDBResponse {
            total_students,
            gender_counts,
            class_counts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::students::{CcaOptional, SportsHouse, StudentStatus};
    use chrono::NaiveDate;
    use sqlx::PgPool;

    fn student(name: &str, class: &str, gender: Option<Gender>) -> StudentCreateDBRequest {
        StudentCreateDBRequest {
            full_name: name.to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(2010, 5, 1).unwrap(),
            class: class.to_string(),
            status: StudentStatus::Active,
            sports_house: Some(SportsHouse::Blue),
            cca: None,
            cca_optional: CcaOptional::NoActivity,
            quran_teacher: Some("Ustaz Ali".to_string()),
            gender,
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_list_filters_and_counts(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Students::new(&mut conn);

        repo.create(&student("A", "1A", Some(Gender::Male))).await.unwrap();
        repo.create(&student("B", "1A", Some(Gender::Female))).await.unwrap();
        let newest = repo.create(&student("C", "2B", None)).await.unwrap();

        let all = repo.list(&StudentFilter::new(0, 10)).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].id, newest.id);

        let mut filter = StudentFilter::new(0, 10);
        filter.classes = Some(vec!["1A".to_string()]);
        assert_eq!(repo.count(&filter).await.unwrap(), 2);

        let page = repo.list(&StudentFilter::new(2, 2)).await.unwrap();
        assert_eq!(page.len(), 1);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_update_clears_nullable_columns(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Students::new(&mut conn);

        let created = repo.create(&student("A", "1A", Some(Gender::Male))).await.unwrap();
        let update = StudentUpdateDBRequest {
            class: Some("1B".to_string()),
            sports_house: Some(None),
            ..Default::default()
        };

        let updated = repo.update(created.id, &update).await.unwrap();
        assert_eq!(updated.class, "1B");
        assert_eq!(updated.sports_house, None);
        assert_eq!(updated.quran_teacher.as_deref(), Some("Ustaz Ali"));
        assert_eq!(updated.gender, Some(Gender::Male));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_stats(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Students::new(&mut conn);

        repo.create(&student("A", "2A", Some(Gender::Female))).await.unwrap();
        repo.create(&student("B", "1A", Some(Gender::Female))).await.unwrap();
        repo.create(&student("C", "1A", Some(Gender::Male))).await.unwrap();

        let stats = repo.stats().await.unwrap();
        assert_eq!(stats.total_students, 3);
        assert_eq!(stats.gender_counts[0], (Some(Gender::Female), 2));
        assert_eq!(stats.class_counts, vec![("1A".to_string(), 2), ("2A".to_string(), 1)]);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_over_wide_class_is_a_check_violation(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Students::new(&mut conn);

        let result = repo.create(&student("A", &"c".repeat(21), None)).await;
        assert!(matches!(result, Err(DbError::CheckViolation { .. })), "{result:?}");
    }
}
