//! Repository traits for data access.
//!
//! A repository is the data access layer for one table. [`Repository`] covers the common
//! create/read/update/delete/list surface; the per-entity traits below extend it with the
//! queries only that entity needs. Every trait is implemented twice: once over a PostgreSQL
//! connection (`db::handlers::*`) and once over the in-memory store (`db::memory::*`). Handlers
//! only ever see `Box<dyn ...Repository>`, handed out by [`crate::db::DbConnection`].

use crate::db::errors::Result;
use crate::db::models::{
    announcements::{AnnouncementCreateDBRequest, AnnouncementDBResponse, AnnouncementFilter, AnnouncementUpdateDBRequest},
    events::{EventCreateDBRequest, EventDBResponse, EventFilter, EventUpdateDBRequest},
    students::{StudentCreateDBRequest, StudentDBResponse, StudentFilter, StudentStatsDBResponse, StudentUpdateDBRequest},
    terms::{TermDBResponse, TermFilter, TermUpsertDBRequest, TermUpsertDBResponse},
    users::{UserCreateDBRequest, UserDBResponse, UserFilter, UserUpdateDBRequest},
};
use crate::types::{AnnouncementId, EventId, StudentId, TermId, UserId};

/// Base repository trait providing common database operations
///
/// This trait has separate associated types for create requests, update requests, and responses.
#[async_trait::async_trait]
pub trait Repository {
    /// The request type for creating entities
    type CreateRequest;

    /// The request type for updating entities
    type UpdateRequest;

    /// The response/DTO type returned by operations
    type Response;

    /// The identifier type for lookups
    type Id: Send + Sync;

    /// The filter type for list operations
    type Filter: Send + Sync;

    /// Create a new entity
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response>;

    /// Get an entity by ID
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>>;

    /// List entities with filtering and pagination
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>>;

    /// Delete an entity by ID
    async fn delete(&mut self, id: Self::Id) -> Result<bool>;

    /// Update an entity by ID. Fails with `DbError::NotFound` if it does not exist.
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response>;
}

#[async_trait::async_trait]
pub trait UserRepository:
    Repository<
        CreateRequest = UserCreateDBRequest,
        UpdateRequest = UserUpdateDBRequest,
        Response = UserDBResponse,
        Id = UserId,
        Filter = UserFilter,
    > + Send
{
    async fn get_by_username(&mut self, username: &str) -> Result<Option<UserDBResponse>>;

    /// Whether any account already uses this username or this email
    async fn exists_with_username_or_email(&mut self, username: &str, email: &str) -> Result<bool>;
}

#[async_trait::async_trait]
pub trait StudentRepository:
    Repository<
        CreateRequest = StudentCreateDBRequest,
        UpdateRequest = StudentUpdateDBRequest,
        Response = StudentDBResponse,
        Id = StudentId,
        Filter = StudentFilter,
    > + Send
{
    /// Number of students matching the filter, ignoring its pagination
    async fn count(&mut self, filter: &StudentFilter) -> Result<i64>;

    async fn stats(&mut self) -> Result<StudentStatsDBResponse>;
}

#[async_trait::async_trait]
pub trait TermRepository: Send {
    /// Insert the record, or replace the one already stored for the same
    /// (student, term, academic year).
    async fn upsert(&mut self, request: &TermUpsertDBRequest) -> Result<TermUpsertDBResponse>;

    /// Get a term record, scoped to the student it belongs to
    async fn get_for_student(&mut self, student_id: StudentId, term_id: TermId) -> Result<Option<TermDBResponse>>;

    /// Terms ordered by academic year, then term number
    async fn list(&mut self, filter: &TermFilter) -> Result<Vec<TermDBResponse>>;

    async fn delete(&mut self, term_id: TermId) -> Result<bool>;
}

pub trait AnnouncementRepository:
    Repository<
        CreateRequest = AnnouncementCreateDBRequest,
        UpdateRequest = AnnouncementUpdateDBRequest,
        Response = AnnouncementDBResponse,
        Id = AnnouncementId,
        Filter = AnnouncementFilter,
    > + Send
{
}

pub trait EventRepository:
    Repository<
        CreateRequest = EventCreateDBRequest,
        UpdateRequest = EventUpdateDBRequest,
        Response = EventDBResponse,
        Id = EventId,
        Filter = EventFilter,
    > + Send
{
}
