//! PostgreSQL repository implementations and attachment storage.
//!
//! Each repository wraps a borrowed `PgConnection` and implements its trait from [`repository`].
//! The in-memory counterparts live in [`crate::db::memory`]; handlers reach either through
//! [`crate::db::DbConnection`].
//!
//! # Available Repositories
//!
//! - [`Users`]: Staff accounts
//! - [`Students`]: Student records and aggregate statistics
//! - [`Terms`]: Per-term results, keyed on (student, term, academic year)
//! - [`Announcements`]: Notices with priority ordering
//! - [`Events`]: Dated calendar entries
//!
//! # Common Pattern
//!
//! ```ignore
//! use schoolctl::db::handlers::{Students, Repository};
//!
//! async fn example(pool: &sqlx::PgPool) -> Result<(), Box<dyn std::error::Error>> {
//!     let mut conn = pool.acquire().await?;
//!     let mut repo = Students::new(&mut conn);
//!     let student = repo.get_by_id(1).await?;
//!     Ok(())
//! }
//! ```

pub mod announcements;
pub mod events;
pub mod file_storage;
pub mod repository;
pub mod students;
pub mod terms;
pub mod users;

pub use announcements::Announcements;
pub use events::Events;
pub use file_storage::{FileStorage, LocalFileStorage};
pub use repository::{AnnouncementRepository, EventRepository, Repository, StudentRepository, TermRepository, UserRepository};
pub use students::Students;
pub use terms::Terms;
pub use users::Users;
