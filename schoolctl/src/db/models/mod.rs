//! Database record models.
//!
//! Response structs derive `sqlx::FromRow` and match the column layout of their table (plus
//! joined columns such as `created_by_name`). Create/update requests are plain structs built by
//! handlers after validation, so repositories never see unchecked input.
//!
//! Both storage backends exchange these same types, which is what lets handlers stay agnostic of
//! where the data lives.

pub mod announcements;
pub mod events;
pub mod file_storage;
pub mod students;
pub mod terms;
pub mod users;
