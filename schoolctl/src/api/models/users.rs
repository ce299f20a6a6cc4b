//! API request/response models for users.

use crate::db::models::users::UserDBResponse;
use crate::types::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Staff role. Admins manage everything; teachers maintain student records.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash, ToSchema)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Teacher,
}

// User request models
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UserCreate {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    #[schema(value_type = Option<Role>)]
    pub role: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UserUpdate {
    pub email: Option<String>,
    pub password: Option<String>,
    #[schema(value_type = Option<Role>)]
    pub role: Option<String>,
}

// User response models
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Query parameters for listing users
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct ListUsersQuery {
    /// Only return users with this role
    pub role: Option<Role>,
}

/// The authenticated caller, as carried in the session token.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CurrentUser {
    pub id: UserId,
    pub username: String,
    pub role: Role,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl From<UserDBResponse> for UserResponse {
    fn from(db: UserDBResponse) -> Self {
        Self {
            id: db.id,
            username: db.username,
            email: db.email,
            role: db.role,
            created_at: db.created_at,
        }
    }
}

impl From<&UserDBResponse> for CurrentUser {
    fn from(db: &UserDBResponse) -> Self {
        Self {
            id: db.id,
            username: db.username.clone(),
            role: db.role,
        }
    }
}
