//! Database models for events.

use crate::api::models::announcements::Priority;
use crate::types::{EventId, UserId};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

/// Database request for creating an event
#[derive(Debug, Clone)]
pub struct EventCreateDBRequest {
    pub title: String,
    pub description: Option<String>,
    pub event_date: NaiveDate,
    pub event_time: Option<NaiveTime>,
    pub location: Option<String>,
    pub priority: Priority,
    pub created_by: UserId,
}

/// Database request for a partial event update. `Some(None)` clears a nullable column.
#[derive(Debug, Clone, Default)]
pub struct EventUpdateDBRequest {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub event_date: Option<NaiveDate>,
    pub event_time: Option<Option<NaiveTime>>,
    pub location: Option<Option<String>>,
    pub priority: Option<Priority>,
    pub is_active: Option<bool>,
}

impl EventUpdateDBRequest {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.event_date.is_none()
            && self.event_time.is_none()
            && self.location.is_none()
            && self.priority.is_none()
            && self.is_active.is_none()
    }
}

/// Database response for an event, with the author's username joined in
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EventDBResponse {
    pub id: EventId,
    pub title: String,
    pub description: Option<String>,
    pub event_date: NaiveDate,
    pub event_time: Option<NaiveTime>,
    pub location: Option<String>,
    pub priority: Priority,
    pub is_active: bool,
    pub created_by: Option<UserId>,
    pub created_by_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Filter for listing events
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Only events on or after this date
    pub from_date: Option<NaiveDate>,
    pub active_only: bool,
    pub limit: Option<i64>,
}

impl EventFilter {
    /// Active events from `today` onwards, soonest first.
    pub fn upcoming(today: NaiveDate, limit: i64) -> Self {
        Self {
            from_date: Some(today),
            active_only: true,
            limit: Some(limit),
        }
    }

    pub fn matches(&self, event: &EventDBResponse) -> bool {
        (!self.active_only || event.is_active) && self.from_date.is_none_or(|d| event.event_date >= d)
    }
}
