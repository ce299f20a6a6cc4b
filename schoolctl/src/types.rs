//! Common type definitions.
//!
//! All entity IDs are store-assigned 32-bit integers (`SERIAL` in PostgreSQL, a monotonic
//! counter in the in-memory store), wrapped in type aliases so signatures say which table an
//! ID belongs to:
//!
//! - [`UserId`]: User account identifier
//! - [`StudentId`]: Student identifier
//! - [`TermId`]: Student term record identifier
//! - [`AnnouncementId`]: Announcement identifier
//! - [`EventId`]: Event identifier

use serde::Deserialize;

// Type aliases for IDs
pub type UserId = i32;
pub type StudentId = i32;
pub type TermId = i32;
pub type AnnouncementId = i32;
pub type EventId = i32;

/// Path parameters for routes nested under a student, e.g. `/students/{id}/terms/{term_id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct StudentTermPath {
    pub id: StudentId,
    pub term_id: TermId,
}
