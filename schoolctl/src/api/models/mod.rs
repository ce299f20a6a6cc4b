//! API request and response data models.
//!
//! These structures define the public JSON contract. They are kept separate from the database
//! models in [`crate::db::models`] so the storage representation can evolve independently.
//!
//! Request payloads for writes carry their closed-set fields (status, house, priority, ...) as
//! raw strings. Handlers validate them with [`crate::api::validation`] so that every bad field is
//! reported at once as `{"errors": [{"field", "message"}]}` instead of failing on the first
//! deserialization error.
//!
//! - [`auth`]: Login payloads and the public account view
//! - [`users`]: Staff accounts and roles
//! - [`students`]: Student records, listing and aggregate statistics
//! - [`terms`]: Per-term academic records and attachments
//! - [`announcements`]: Announcements and the shared [`announcements::Priority`]
//! - [`events`]: Upcoming school events
//! - [`pagination`]: Page-based pagination parameters

pub mod announcements;
pub mod auth;
pub mod events;
pub mod health;
pub mod pagination;
pub mod students;
pub mod terms;
pub mod users;
