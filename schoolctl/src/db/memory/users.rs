use super::MemoryStore;
use crate::db::{
    errors::{DbError, Result},
    handlers::repository::{Repository, UserRepository},
    models::users::{UserCreateDBRequest, UserDBResponse, UserFilter, UserUpdateDBRequest},
};
use crate::types::UserId;
use chrono::Utc;
use tracing::instrument;

pub struct MemoryUsers<'a> {
    store: &'a MemoryStore,
}

impl<'a> MemoryUsers<'a> {
    pub fn new(store: &'a MemoryStore) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl<'a> Repository for MemoryUsers<'a> {
    type CreateRequest = UserCreateDBRequest;
    type UpdateRequest = UserUpdateDBRequest;
    type Response = UserDBResponse;
    type Id = UserId;
    type Filter = UserFilter;

    #[instrument(skip(self, request), fields(username = %request.username), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let mut tables = self.store.tables.write().await;

        if tables.users.values().any(|u| u.username == request.username) {
            return Err(DbError::unique_violation("users", "users_username_key"));
        }
        if tables.users.values().any(|u| u.email == request.email) {
            return Err(DbError::unique_violation("users", "users_email_key"));
        }

        let now = Utc::now();
        let id = tables.users.allocate_id();
        let user = UserDBResponse {
            id,
            username: request.username.clone(),
            email: request.email.clone(),
            role: request.role,
            password_hash: request.password_hash.clone(),
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(id, user.clone());

        Ok(user)
    }

    #[instrument(skip(self), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        Ok(self.store.tables.read().await.users.get(id).cloned())
    }

    #[instrument(skip(self, filter), fields(role = ?filter.role), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let tables = self.store.tables.read().await;
        let mut users: Vec<_> = tables
            .users
            .values()
            .filter(|u| filter.role.is_none_or(|role| u.role == role))
            .cloned()
            .collect();
        users.sort_by_key(|u| (u.created_at, u.id));

        Ok(users)
    }

    #[instrument(skip(self), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let mut tables = self.store.tables.write().await;
        if tables.users.remove(id).is_none() {
            return Ok(false);
        }

        // ON DELETE SET NULL for authored rows
        for announcement in tables.announcements.values_mut().filter(|a| a.created_by == Some(id)) {
            announcement.created_by = None;
        }
        for event in tables.events.values_mut().filter(|e| e.created_by == Some(id)) {
            event.created_by = None;
        }

        Ok(true)
    }

    #[instrument(skip(self, request), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let mut tables = self.store.tables.write().await;

        if let Some(email) = &request.email
            && tables.users.values().any(|u| u.id != id && &u.email == email)
        {
            return Err(DbError::unique_violation("users", "users_email_key"));
        }

        let user = tables.users.get_mut(id).ok_or(DbError::NotFound)?;
        if let Some(email) = &request.email {
            user.email = email.clone();
        }
        if let Some(role) = request.role {
            user.role = role;
        }
        if let Some(password_hash) = &request.password_hash {
            user.password_hash = password_hash.clone();
        }
        user.updated_at = Utc::now();

        Ok(user.clone())
    }
}

#[async_trait::async_trait]
impl<'a> UserRepository for MemoryUsers<'a> {
    #[instrument(skip(self), err)]
    async fn get_by_username(&mut self, username: &str) -> Result<Option<UserDBResponse>> {
        let tables = self.store.tables.read().await;
        Ok(tables.users.values().find(|u| u.username == username).cloned())
    }

    #[instrument(skip(self, email), err)]
    async fn exists_with_username_or_email(&mut self, username: &str, email: &str) -> Result<bool> {
        let tables = self.store.tables.read().await;
        Ok(tables.users.values().any(|u| u.username == username || u.email == email))
    }
}
