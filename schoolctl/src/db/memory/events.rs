use super::{MemoryStore, Tables};
use crate::db::{
    errors::{DbError, Result},
    handlers::repository::{EventRepository, Repository},
    models::events::{EventCreateDBRequest, EventDBResponse, EventFilter, EventUpdateDBRequest},
};
use crate::types::EventId;
use chrono::Utc;
use std::cmp::Reverse;
use tracing::instrument;

pub struct MemoryEvents<'a> {
    store: &'a MemoryStore,
}

impl<'a> MemoryEvents<'a> {
    pub fn new(store: &'a MemoryStore) -> Self {
        Self { store }
    }
}

fn with_author(tables: &Tables, event: &EventDBResponse) -> EventDBResponse {
    EventDBResponse {
        created_by_name: tables.username_of(event.created_by),
        ..event.clone()
    }
}

#[async_trait::async_trait]
impl<'a> Repository for MemoryEvents<'a> {
    type CreateRequest = EventCreateDBRequest;
    type UpdateRequest = EventUpdateDBRequest;
    type Response = EventDBResponse;
    type Id = EventId;
    type Filter = EventFilter;

    #[instrument(skip(self, request), fields(event_date = %request.event_date), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let mut tables = self.store.tables.write().await;

        if !tables.users.contains(request.created_by) {
            return Err(DbError::foreign_key_violation("events", "events_created_by_fkey"));
        }

        let now = Utc::now();
        let id = tables.events.allocate_id();
        let event = EventDBResponse {
            id,
            title: request.title.clone(),
            description: request.description.clone(),
            event_date: request.event_date,
            event_time: request.event_time,
            location: request.location.clone(),
            priority: request.priority,
            is_active: true,
            created_by: Some(request.created_by),
            created_by_name: None,
            created_at: now,
            updated_at: now,
        };
        tables.events.insert(id, event.clone());

        Ok(with_author(&tables, &event))
    }

    #[instrument(skip(self), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let tables = self.store.tables.read().await;
        Ok(tables.events.get(id).map(|e| with_author(&tables, e)))
    }

    #[instrument(skip(self, filter), fields(from_date = ?filter.from_date, limit = ?filter.limit), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let tables = self.store.tables.read().await;
        let mut events: Vec<_> = tables
            .events
            .values()
            .filter(|e| filter.matches(e))
            .map(|e| with_author(&tables, e))
            .collect();
        events.sort_by_key(|e| (e.event_date, Reverse(e.priority), e.id));
        if let Some(limit) = filter.limit {
            events.truncate(limit.max(0) as usize);
        }

        Ok(events)
    }

    #[instrument(skip(self), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        Ok(self.store.tables.write().await.events.remove(id).is_some())
    }

    #[instrument(skip(self, request), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let mut tables = self.store.tables.write().await;
        let event = tables.events.get_mut(id).ok_or(DbError::NotFound)?;

        if let Some(title) = &request.title {
            event.title = title.clone();
        }
        if let Some(description) = &request.description {
            event.description = description.clone();
        }
        if let Some(event_date) = request.event_date {
            event.event_date = event_date;
        }
        if let Some(event_time) = request.event_time {
            event.event_time = event_time;
        }
        if let Some(location) = &request.location {
            event.location = location.clone();
        }
        if let Some(priority) = request.priority {
            event.priority = priority;
        }
        if let Some(is_active) = request.is_active {
            event.is_active = is_active;
        }
        event.updated_at = Utc::now();

        let updated = event.clone();
        Ok(with_author(&tables, &updated))
    }
}

impl<'a> EventRepository for MemoryEvents<'a> {}
