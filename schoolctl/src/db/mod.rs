//! Storage layer for data persistence and access.
//!
//! Data lives either in PostgreSQL (via SQLx) or in a process-local in-memory store. Both
//! backends implement the same repository traits, and handlers only ever work with
//! `Box<dyn ...Repository>`, so the choice is purely a matter of configuration.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  (API request handlers)
//! └──────┬──────┘
//!        │ Database::acquire() -> DbConnection
//!        ↓
//! ┌──────────────────────────┐
//! │ Repository traits        │  (db::handlers::repository)
//! └──────┬────────────┬──────┘
//!        ↓            ↓
//! ┌────────────┐ ┌──────────────┐
//! │ PostgreSQL │ │ MemoryStore  │
//! │ (handlers) │ │ (memory)     │
//! └────────────┘ └──────────────┘
//! ```
//!
//! # Modules
//!
//! - [`handlers`]: Repository traits, PostgreSQL implementations and attachment storage
//! - [`memory`]: In-memory implementations
//! - [`models`]: Records exchanged with repositories
//! - [`errors`]: Storage error types
//!
//! ## Example Usage
//!
//! ```ignore
//! let mut conn = state.db.acquire().await?;
//! let student = conn.students().get_by_id(id).await?;
//! ```
//!
//! # Migrations
//!
//! PostgreSQL migrations are managed by SQLx and located in the `migrations/` directory. They
//! run from [`Database::connect`]; see also [`crate::migrator`].

pub mod errors;
pub mod handlers;
pub mod memory;
pub mod models;

use crate::config::DatabaseConfig;
use errors::Result;
use handlers::{
    AnnouncementRepository, Announcements, EventRepository, Events, StudentRepository, Students, TermRepository, Terms,
    UserRepository, Users,
};
use memory::{MemoryAnnouncements, MemoryEvents, MemoryStore, MemoryStudents, MemoryTerms, MemoryUsers};
use sqlx::{PgPool, Postgres, pool::PoolConnection, postgres::PgPoolOptions};
use std::sync::Arc;
use tracing::info;

/// Handle on the configured storage backend. Cheap to clone.
#[derive(Clone, Debug)]
pub enum Database {
    Postgres(PgPool),
    Memory(Arc<MemoryStore>),
}

impl Database {
    /// Connect to the configured backend. PostgreSQL databases are migrated before use.
    pub async fn connect(config: &DatabaseConfig) -> anyhow::Result<Self> {
        match config {
            DatabaseConfig::Memory { .. } => {
                info!("Using in-memory store: data will be lost on shutdown");
                Ok(Database::in_memory())
            }
            DatabaseConfig::External { url, pool } => {
                info!("Using external database");
                let pg = PgPoolOptions::new()
                    .max_connections(pool.max_connections)
                    .min_connections(pool.min_connections)
                    .acquire_timeout(pool.acquire_timeout)
                    .connect(url)
                    .await?;
                crate::migrator().run(&pg).await?;
                Ok(Database::Postgres(pg))
            }
        }
    }

    /// A fresh, empty in-memory store
    pub fn in_memory() -> Self {
        Database::Memory(Arc::new(MemoryStore::new()))
    }

    pub async fn acquire(&self) -> Result<DbConnection> {
        Ok(match self {
            Database::Postgres(pool) => DbConnection::Postgres(pool.acquire().await?),
            Database::Memory(store) => DbConnection::Memory(store.clone()),
        })
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            Database::Postgres(_) => "postgres",
            Database::Memory(_) => "memory",
        }
    }
}

/// One checked-out connection, from which repositories are borrowed.
pub enum DbConnection {
    Postgres(PoolConnection<Postgres>),
    Memory(Arc<MemoryStore>),
}

impl DbConnection {
    pub fn users(&mut self) -> Box<dyn UserRepository + Send + '_> {
        match self {
            DbConnection::Postgres(conn) => Box::new(Users::new(conn)),
            DbConnection::Memory(store) => Box::new(MemoryUsers::new(store)),
        }
    }

    pub fn students(&mut self) -> Box<dyn StudentRepository + Send + '_> {
        match self {
            DbConnection::Postgres(conn) => Box::new(Students::new(conn)),
            DbConnection::Memory(store) => Box::new(MemoryStudents::new(store)),
        }
    }

    pub fn terms(&mut self) -> Box<dyn TermRepository + Send + '_> {
        match self {
            DbConnection::Postgres(conn) => Box::new(Terms::new(conn)),
            DbConnection::Memory(store) => Box::new(MemoryTerms::new(store)),
        }
    }

    pub fn announcements(&mut self) -> Box<dyn AnnouncementRepository + Send + '_> {
        match self {
            DbConnection::Postgres(conn) => Box::new(Announcements::new(conn)),
            DbConnection::Memory(store) => Box::new(MemoryAnnouncements::new(store)),
        }
    }

    pub fn events(&mut self) -> Box<dyn EventRepository + Send + '_> {
        match self {
            DbConnection::Postgres(conn) => Box::new(Events::new(conn)),
            DbConnection::Memory(store) => Box::new(MemoryEvents::new(store)),
        }
    }
}
