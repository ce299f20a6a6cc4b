//! PostgreSQL repository for staff accounts.

use crate::types::UserId;
use crate::{
    api::models::users::Role,
    db::{
        errors::{DbError, Result},
        handlers::repository::{Repository, UserRepository},
        models::users::{UserCreateDBRequest, UserDBResponse, UserFilter, UserUpdateDBRequest},
    },
};
use sqlx::PgConnection;
use tracing::instrument;

const USER_COLUMNS: &str = "id, username, email, role, password_hash, created_at, updated_at";

pub struct Users<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Users<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Users<'c> {
    type CreateRequest = UserCreateDBRequest;
    type UpdateRequest = UserUpdateDBRequest;
    type Response = UserDBResponse;
    type Id = UserId;
    type Filter = UserFilter;

    #[instrument(skip(self, request), fields(username = %request.username), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let user = sqlx::query_as::<_, UserDBResponse>(&format!(
            "INSERT INTO users (username, email, password_hash, role) VALUES ($1, $2, $3, $4) RETURNING {USER_COLUMNS}"
        ))
        .bind(&request.username)
        .bind(&request.email)
        .bind(&request.password_hash)
        .bind(request.role)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(user)
    }

    #[instrument(skip(self), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let user = sqlx::query_as::<_, UserDBResponse>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(user)
    }

    #[instrument(skip(self, filter), fields(role = ?filter.role), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let users = sqlx::query_as::<_, UserDBResponse>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE ($1::user_role IS NULL OR role = $1) ORDER BY created_at, id"
        ))
        .bind(filter.role)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(users)
    }

    #[instrument(skip(self), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1").bind(id).execute(&mut *self.db).await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let user = sqlx::query_as::<_, UserDBResponse>(&format!(
            r#"
            UPDATE users SET
                email = COALESCE($2, email),
                role = COALESCE($3, role),
                password_hash = COALESCE($4, password_hash),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&request.email)
        .bind(request.role)
        .bind(&request.password_hash)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(user)
    }
}

#[async_trait::async_trait]
impl<'c> UserRepository for Users<'c> {
    #[instrument(skip(self), err)]
    async fn get_by_username(&mut self, username: &str) -> Result<Option<UserDBResponse>> {
        let user = sqlx::query_as::<_, UserDBResponse>(&format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1"))
            .bind(username)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(user)
    }

    #[instrument(skip(self, email), err)]
    async fn exists_with_username_or_email(&mut self, username: &str, email: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE username = $1 OR email = $2)")
            .bind(username)
            .bind(email)
            .fetch_one(&mut *self.db)
            .await?;

        Ok(exists)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::PgPool;

    fn teacher(username: &str) -> UserCreateDBRequest {
        UserCreateDBRequest {
            username: username.to_string(),
            email: format!("{username}@school.test"),
            role: Role::Teacher,
            password_hash: "hash".to_string(),
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_and_fetch_user(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);

        let created = repo.create(&teacher("alice")).await.unwrap();
        assert_eq!(created.username, "alice");
        assert_eq!(created.role, Role::Teacher);

        let by_name = repo.get_by_username("alice").await.unwrap().unwrap();
        assert_eq!(by_name.id, created.id);
        assert!(repo.exists_with_username_or_email("nobody", "alice@school.test").await.unwrap());
        assert!(!repo.exists_with_username_or_email("nobody", "nobody@school.test").await.unwrap());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_duplicate_username_is_unique_violation(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);

        repo.create(&teacher("bob")).await.unwrap();
        let mut again = teacher("bob");
        again.email = "other@school.test".to_string();

        match repo.create(&again).await {
            Err(DbError::UniqueViolation { constraint, .. }) => {
                assert_eq!(constraint.as_deref(), Some("users_username_key"))
            }
            other => panic!("expected unique violation, got {other:?}"),
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_update_and_filter_by_role(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);

        let carol = repo.create(&teacher("carol")).await.unwrap();
        repo.create(&teacher("dave")).await.unwrap();

        let update = UserUpdateDBRequest {
            role: Some(Role::Admin),
            ..Default::default()
        };
        let updated = repo.update(carol.id, &update).await.unwrap();
        assert_eq!(updated.role, Role::Admin);
        assert_eq!(updated.email, carol.email);

        let admins = repo.list(&UserFilter { role: Some(Role::Admin) }).await.unwrap();
        assert_eq!(admins.len(), 1);
        assert_eq!(admins[0].username, "carol");

        assert!(matches!(repo.update(9999, &update).await, Err(DbError::NotFound)));
        assert!(repo.delete(carol.id).await.unwrap());
        assert!(!repo.delete(carol.id).await.unwrap());
    }
}
