//! API request/response models for announcements.

use crate::db::models::announcements::AnnouncementDBResponse;
use crate::types::{AnnouncementId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Display priority shared by announcements and events. Variant order is the sort order.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash, PartialOrd, Ord, ToSchema)]
#[sqlx(type_name = "priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct AnnouncementCreate {
    pub title: Option<String>,
    pub content: Option<String>,
    #[schema(value_type = Option<Priority>)]
    pub priority: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct AnnouncementUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    #[schema(value_type = Option<Priority>)]
    pub priority: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AnnouncementResponse {
    pub id: AnnouncementId,
    pub title: String,
    pub content: String,
    pub priority: Priority,
    pub is_active: bool,
    pub created_by: Option<UserId>,
    /// Username of the author, if the account still exists
    pub created_by_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<AnnouncementDBResponse> for AnnouncementResponse {
    fn from(db: AnnouncementDBResponse) -> Self {
        Self {
            id: db.id,
            title: db.title,
            content: db.content,
            priority: db.priority,
            is_active: db.is_active,
            created_by: db.created_by,
            created_by_name: db.created_by_name,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}
