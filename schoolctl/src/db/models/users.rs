//! Database models for users.

use crate::api::models::users::Role;
use crate::types::UserId;
use chrono::{DateTime, Utc};

/// Database request for creating a new user
#[derive(Debug, Clone)]
pub struct UserCreateDBRequest {
    pub username: String,
    pub email: String,
    pub role: Role,
    pub password_hash: String,
}

/// Database request for updating a user. `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct UserUpdateDBRequest {
    pub email: Option<String>,
    pub role: Option<Role>,
    pub password_hash: Option<String>,
}

impl UserUpdateDBRequest {
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.role.is_none() && self.password_hash.is_none()
    }
}

/// Database response for a user
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserDBResponse {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Filter for listing users
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub role: Option<Role>,
}
