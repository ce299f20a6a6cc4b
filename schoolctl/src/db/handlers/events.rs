//! PostgreSQL repository for calendar events.

use crate::db::{
    errors::{DbError, Result},
    handlers::repository::{EventRepository, Repository},
    models::events::{EventCreateDBRequest, EventDBResponse, EventFilter, EventUpdateDBRequest},
};
use crate::types::EventId;
use sqlx::PgConnection;
use tracing::instrument;

// Selected from `e` joined against the author in `u`
const EVENT_COLUMNS: &str = "e.id, e.title, e.description, e.event_date, e.event_time, e.location, e.priority, \
                             e.is_active, e.created_by, u.username AS created_by_name, e.created_at, e.updated_at";

pub struct Events<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Events<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Events<'c> {
    type CreateRequest = EventCreateDBRequest;
    type UpdateRequest = EventUpdateDBRequest;
    type Response = EventDBResponse;
    type Id = EventId;
    type Filter = EventFilter;

    #[instrument(skip(self, request), fields(event_date = %request.event_date), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let event = sqlx::query_as::<_, EventDBResponse>(&format!(
            r#"
            WITH e AS (
                INSERT INTO events (title, description, event_date, event_time, location, priority, created_by)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING *
            )
            SELECT {EVENT_COLUMNS} FROM e LEFT JOIN users u ON u.id = e.created_by
            "#
        ))
        .bind(&request.title)
        .bind(&request.description)
        .bind(request.event_date)
        .bind(request.event_time)
        .bind(&request.location)
        .bind(request.priority)
        .bind(request.created_by)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(event)
    }

    #[instrument(skip(self), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let event = sqlx::query_as::<_, EventDBResponse>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events e LEFT JOIN users u ON u.id = e.created_by WHERE e.id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(event)
    }

    #[instrument(skip(self, filter), fields(from_date = ?filter.from_date, limit = ?filter.limit), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        // A NULL limit means no limit
        let events = sqlx::query_as::<_, EventDBResponse>(&format!(
            r#"
            SELECT {EVENT_COLUMNS} FROM events e LEFT JOIN users u ON u.id = e.created_by
            WHERE (NOT $1 OR e.is_active)
              AND ($2::date IS NULL OR e.event_date >= $2)
            ORDER BY e.event_date ASC, e.priority DESC, e.id ASC
            LIMIT $3
            "#
        ))
        .bind(filter.active_only)
        .bind(filter.from_date)
        .bind(filter.limit)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(events)
    }

    #[instrument(skip(self), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1").bind(id).execute(&mut *self.db).await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let event = sqlx::query_as::<_, EventDBResponse>(&format!(
            r#"
            WITH e AS (
                UPDATE events SET
                    title = COALESCE($2, title),
                    description = CASE WHEN $3 THEN $4 ELSE description END,
                    event_date = COALESCE($5, event_date),
                    event_time = CASE WHEN $6 THEN $7::time ELSE event_time END,
                    location = CASE WHEN $8 THEN $9 ELSE location END,
                    priority = COALESCE($10, priority),
                    is_active = COALESCE($11, is_active),
                    updated_at = NOW()
                WHERE id = $1
                RETURNING *
            )
            SELECT {EVENT_COLUMNS} FROM e LEFT JOIN users u ON u.id = e.created_by
            "#
        ))
        .bind(id)
        .bind(&request.title)
        .bind(request.description.is_some())
        .bind(request.description.clone().flatten())
        .bind(request.event_date)
        .bind(request.event_time.is_some())
        .bind(request.event_time.flatten())
        .bind(request.location.is_some())
        .bind(request.location.clone().flatten())
        .bind(request.priority)
        .bind(request.is_active)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(event)
    }
}

impl<'c> EventRepository for Events<'c> {}
