//! Database models for announcements.

use crate::api::models::announcements::Priority;
use crate::types::{AnnouncementId, UserId};
use chrono::{DateTime, Utc};

/// Database request for creating an announcement
#[derive(Debug, Clone)]
pub struct AnnouncementCreateDBRequest {
    pub title: String,
    pub content: String,
    pub priority: Priority,
    pub created_by: UserId,
}

/// Database request for updating an announcement
#[derive(Debug, Clone, Default)]
pub struct AnnouncementUpdateDBRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub priority: Option<Priority>,
    pub is_active: Option<bool>,
}

impl AnnouncementUpdateDBRequest {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none() && self.priority.is_none() && self.is_active.is_none()
    }
}

/// Database response for an announcement, with the author's username joined in
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AnnouncementDBResponse {
    pub id: AnnouncementId,
    pub title: String,
    pub content: String,
    pub priority: Priority,
    pub is_active: bool,
    pub created_by: Option<UserId>,
    pub created_by_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Filter for listing announcements
#[derive(Debug, Clone)]
pub struct AnnouncementFilter {
    pub active_only: bool,
}

impl Default for AnnouncementFilter {
    fn default() -> Self {
        Self { active_only: true }
    }
}
