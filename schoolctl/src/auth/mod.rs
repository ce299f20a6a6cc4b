//! Authentication and authorization.
//!
//! Staff log in with username and password at `/api/auth/login` and receive a signed JWT. Every
//! other API route expects it back as `Authorization: Bearer <token>`. Sessions are stateless:
//! logging out is the client discarding its token.
//!
//! - No token: 401 "Access token required"
//! - Token that fails verification (bad signature, expired, malformed): 403
//!   "Invalid or expired token"
//! - Valid token, role not allowed for the route: 403 "Insufficient permissions"
//!
//! # Modules
//!
//! - [`current_user`]: Extractor for the authenticated caller
//! - [`password`]: Password hashing (Argon2id) and verification (Argon2id or legacy bcrypt)
//! - [`permissions`]: Role guards for staff-only and admin-only routes
//! - [`session`]: JWT creation and verification
//!
//! # Usage in Handlers
//!
//! ```ignore
//! use schoolctl::api::models::users::CurrentUser;
//! use schoolctl::auth::permissions::{AdminUser, RequiresRole};
//!
//! async fn whoami(current_user: CurrentUser) -> String {
//!     current_user.username
//! }
//!
//! async fn admin_only(RequiresRole(admin, _): AdminUser) -> String {
//!     format!("Hello, {}", admin.username)
//! }
//! ```

pub mod current_user;
pub mod password;
pub mod permissions;
pub mod session;
