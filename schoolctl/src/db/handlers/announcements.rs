//! PostgreSQL repository for announcements.

use crate::db::{
    errors::{DbError, Result},
    handlers::repository::{AnnouncementRepository, Repository},
    models::announcements::{AnnouncementCreateDBRequest, AnnouncementDBResponse, AnnouncementFilter, AnnouncementUpdateDBRequest},
};
use crate::types::AnnouncementId;
use sqlx::PgConnection;
use tracing::instrument;

// Selected from `a` joined against the author in `u`
const ANNOUNCEMENT_COLUMNS: &str = "a.id, a.title, a.content, a.priority, a.is_active, a.created_by, \
                                    u.username AS created_by_name, a.created_at, a.updated_at";

pub struct Announcements<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Announcements<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Announcements<'c> {
    type CreateRequest = AnnouncementCreateDBRequest;
    type UpdateRequest = AnnouncementUpdateDBRequest;
    type Response = AnnouncementDBResponse;
    type Id = AnnouncementId;
    type Filter = AnnouncementFilter;

    #[instrument(skip(self, request), fields(created_by = request.created_by), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let announcement = sqlx::query_as::<_, AnnouncementDBResponse>(&format!(
            r#"
            WITH a AS (
                INSERT INTO announcements (title, content, priority, created_by)
                VALUES ($1, $2, $3, $4)
                RETURNING *
            )
            SELECT {ANNOUNCEMENT_COLUMNS} FROM a LEFT JOIN users u ON u.id = a.created_by
            "#
        ))
        .bind(&request.title)
        .bind(&request.content)
        .bind(request.priority)
        .bind(request.created_by)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(announcement)
    }

    #[instrument(skip(self), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let announcement = sqlx::query_as::<_, AnnouncementDBResponse>(&format!(
            "SELECT {ANNOUNCEMENT_COLUMNS} FROM announcements a LEFT JOIN users u ON u.id = a.created_by WHERE a.id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(announcement)
    }

    #[instrument(skip(self, filter), fields(active_only = filter.active_only), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let announcements = sqlx::query_as::<_, AnnouncementDBResponse>(&format!(
            r#"
            SELECT {ANNOUNCEMENT_COLUMNS} FROM announcements a LEFT JOIN users u ON u.id = a.created_by
            WHERE (NOT $1 OR a.is_active)
            ORDER BY a.priority DESC, a.created_at DESC, a.id DESC
            "#
        ))
        .bind(filter.active_only)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(announcements)
    }

    #[instrument(skip(self), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM announcements WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let announcement = sqlx::query_as::<_, AnnouncementDBResponse>(&format!(
            r#"
            WITH a AS (
                UPDATE announcements SET
                    title = COALESCE($2, title),
                    content = COALESCE($3, content),
                    priority = COALESCE($4, priority),
                    is_active = COALESCE($5, is_active),
                    updated_at = NOW()
                WHERE id = $1
                RETURNING *
            )
            SELECT {ANNOUNCEMENT_COLUMNS} FROM a LEFT JOIN users u ON u.id = a.created_by
            "#
        ))
        .bind(id)
        .bind(&request.title)
        .bind(&request.content)
        .bind(request.priority)
        .bind(request.is_active)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(announcement)
    }
}

impl<'c> AnnouncementRepository for Announcements<'c> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::{announcements::Priority, users::Role};
    use crate::db::handlers::Users;
    use crate::db::models::users::UserCreateDBRequest;
    use crate::types::UserId;
    use sqlx::PgPool;

    async fn create_author(conn: &mut PgConnection) -> UserId {
        let request = UserCreateDBRequest {
            username: "author".to_string(),
            email: "author@school.test".to_string(),
            role: Role::Admin,
            password_hash: "hash".to_string(),
        };
        Users::new(conn).create(&request).await.unwrap().id
    }

    fn announcement(title: &str, priority: Priority, created_by: UserId) -> AnnouncementCreateDBRequest {
        AnnouncementCreateDBRequest {
            title: title.to_string(),
            content: "Body".to_string(),
            priority,
            created_by,
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_list_orders_by_priority_and_hides_inactive(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let author = create_author(&mut conn).await;
        let mut repo = Announcements::new(&mut conn);

        let low = repo.create(&announcement("low", Priority::Low, author)).await.unwrap();
        repo.create(&announcement("urgent", Priority::Urgent, author)).await.unwrap();
        repo.create(&announcement("normal", Priority::Normal, author)).await.unwrap();
        assert_eq!(low.created_by_name.as_deref(), Some("author"));

        let titles: Vec<_> = repo
            .list(&AnnouncementFilter::default())
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.title)
            .collect();
        assert_eq!(titles, vec!["urgent", "normal", "low"]);

        let update = AnnouncementUpdateDBRequest {
            is_active: Some(false),
            ..Default::default()
        };
        repo.update(low.id, &update).await.unwrap();
        assert_eq!(repo.list(&AnnouncementFilter::default()).await.unwrap().len(), 2);
        assert_eq!(repo.list(&AnnouncementFilter { active_only: false }).await.unwrap().len(), 3);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_author_deletion_keeps_announcement(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let author = create_author(&mut conn).await;
        let created = Announcements::new(&mut conn)
            .create(&announcement("kept", Priority::High, author))
            .await
            .unwrap();

        assert!(Users::new(&mut conn).delete(author).await.unwrap());

        let fetched = Announcements::new(&mut conn).get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.created_by, None);
        assert_eq!(fetched.created_by_name, None);
    }
}
