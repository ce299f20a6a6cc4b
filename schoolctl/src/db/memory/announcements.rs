use super::{MemoryStore, Tables};
use crate::db::{
    errors::{DbError, Result},
    handlers::repository::{AnnouncementRepository, Repository},
    models::announcements::{AnnouncementCreateDBRequest, AnnouncementDBResponse, AnnouncementFilter, AnnouncementUpdateDBRequest},
};
use crate::types::AnnouncementId;
use chrono::Utc;
use std::cmp::Reverse;
use tracing::instrument;

pub struct MemoryAnnouncements<'a> {
    store: &'a MemoryStore,
}

impl<'a> MemoryAnnouncements<'a> {
    pub fn new(store: &'a MemoryStore) -> Self {
        Self { store }
    }
}

fn with_author(tables: &Tables, announcement: &AnnouncementDBResponse) -> AnnouncementDBResponse {
    AnnouncementDBResponse {
        created_by_name: tables.username_of(announcement.created_by),
        ..announcement.clone()
    }
}

#[async_trait::async_trait]
impl<'a> Repository for MemoryAnnouncements<'a> {
    type CreateRequest = AnnouncementCreateDBRequest;
    type UpdateRequest = AnnouncementUpdateDBRequest;
    type Response = AnnouncementDBResponse;
    type Id = AnnouncementId;
    type Filter = AnnouncementFilter;

    #[instrument(skip(self, request), fields(created_by = request.created_by), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let mut tables = self.store.tables.write().await;

        if !tables.users.contains(request.created_by) {
            return Err(DbError::foreign_key_violation("announcements", "announcements_created_by_fkey"));
        }

        let now = Utc::now();
        let id = tables.announcements.allocate_id();
        let announcement = AnnouncementDBResponse {
            id,
            title: request.title.clone(),
            content: request.content.clone(),
            priority: request.priority,
            is_active: true,
            created_by: Some(request.created_by),
            created_by_name: None,
            created_at: now,
            updated_at: now,
        };
        tables.announcements.insert(id, announcement.clone());

        Ok(with_author(&tables, &announcement))
    }

    #[instrument(skip(self), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let tables = self.store.tables.read().await;
        Ok(tables.announcements.get(id).map(|a| with_author(&tables, a)))
    }

    #[instrument(skip(self, filter), fields(active_only = filter.active_only), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let tables = self.store.tables.read().await;
        let mut announcements: Vec<_> = tables
            .announcements
            .values()
            .filter(|a| !filter.active_only || a.is_active)
            .map(|a| with_author(&tables, a))
            .collect();
        announcements.sort_by_key(|a| Reverse((a.priority, a.created_at, a.id)));

        Ok(announcements)
    }

    #[instrument(skip(self), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        Ok(self.store.tables.write().await.announcements.remove(id).is_some())
    }

    #[instrument(skip(self, request), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let mut tables = self.store.tables.write().await;
        let announcement = tables.announcements.get_mut(id).ok_or(DbError::NotFound)?;

        if let Some(title) = &request.title {
            announcement.title = title.clone();
        }
        if let Some(content) = &request.content {
            announcement.content = content.clone();
        }
        if let Some(priority) = request.priority {
            announcement.priority = priority;
        }
        if let Some(is_active) = request.is_active {
            announcement.is_active = is_active;
        }
        announcement.updated_at = Utc::now();

        let updated = announcement.clone();
        Ok(with_author(&tables, &updated))
    }
}

impl<'a> AnnouncementRepository for MemoryAnnouncements<'a> {}
