//! Role-based route guards.
//!
//! Every staff member can read everything. Writes to student and term records need a staff role
//! (admin or teacher); announcements, events and account management are admin only. Handlers
//! declare the requirement in their signature:
//!
//! ```ignore
//! async fn delete_announcement(RequiresRole(user, _): AdminUser, ...) -> Result<...>
//! ```

use std::marker::PhantomData;

use axum::{extract::FromRequestParts, http::request::Parts};
use tracing::{instrument, warn};

use crate::{
    AppState,
    api::models::users::{CurrentUser, Role},
    errors::{Error, Result},
};

/// A fixed set of roles allowed through a guard.
pub trait RoleSet {
    const ROLES: &'static [Role];
    /// What the guarded routes manage, for error context
    const RESOURCE: &'static str;

    fn allows(role: Role) -> bool {
        Self::ROLES.contains(&role)
    }
}

/// Admins and teachers
pub struct Staff;

impl RoleSet for Staff {
    const ROLES: &'static [Role] = &[Role::Admin, Role::Teacher];
    const RESOURCE: &'static str = "student records";
}

/// Admins only
pub struct AdminOnly;

impl RoleSet for AdminOnly {
    const ROLES: &'static [Role] = &[Role::Admin];
    const RESOURCE: &'static str = "school administration";
}

/// Extractor that authenticates the caller and then checks their role against `R`.
pub struct RequiresRole<R>(pub CurrentUser, pub PhantomData<R>);

pub type StaffUser = RequiresRole<Staff>;
pub type AdminUser = RequiresRole<AdminOnly>;

impl<R> FromRequestParts<AppState> for RequiresRole<R>
where
    R: RoleSet + Send + Sync,
{
    type Rejection = Error;

    #[instrument(skip(parts, state))]
    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let user = CurrentUser::from_request_parts(parts, state).await?;

        if !R::allows(user.role) {
            warn!(user_id = user.id, role = ?user.role, resource = R::RESOURCE, "Role not permitted");
            return Err(Error::InsufficientPermissions {
                action: format!("{} {}", parts.method, parts.uri.path()),
                resource: R::RESOURCE.to_string(),
            });
        }

        Ok(RequiresRole(user, PhantomData))
    }
}
