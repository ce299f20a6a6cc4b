//! API request/response models for school events.

use super::announcements::Priority;
use crate::db::models::events::EventDBResponse;
use crate::types::{EventId, UserId};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct EventCreate {
    pub title: Option<String>,
    pub description: Option<String>,
    /// ISO 8601 date, e.g. `2025-09-01`
    pub event_date: Option<String>,
    /// `HH:MM` or `HH:MM:SS`
    pub event_time: Option<String>,
    pub location: Option<String>,
    #[schema(value_type = Option<Priority>)]
    pub priority: Option<String>,
}

/// Partial update payload. `description`, `event_time` and `location` can be cleared with an
/// explicit `null` or empty string.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct EventUpdate {
    pub title: Option<String>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub description: Option<Option<String>>,
    pub event_date: Option<String>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub event_time: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub location: Option<Option<String>>,
    #[schema(value_type = Option<Priority>)]
    pub priority: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EventResponse {
    pub id: EventId,
    pub title: String,
    pub description: Option<String>,
    pub event_date: NaiveDate,
    #[schema(value_type = Option<String>, example = "09:30:00")]
    pub event_time: Option<NaiveTime>,
    pub location: Option<String>,
    pub priority: Priority,
    pub is_active: bool,
    pub created_by: Option<UserId>,
    pub created_by_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<EventDBResponse> for EventResponse {
    fn from(db: EventDBResponse) -> Self {
        Self {
            id: db.id,
            title: db.title,
            description: db.description,
            event_date: db.event_date,
            event_time: db.event_time,
            location: db.location,
            priority: db.priority,
            is_active: db.is_active,
            created_by: db.created_by,
            created_by_name: db.created_by_name,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}
