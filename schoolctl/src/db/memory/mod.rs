//! In-memory storage backend.
//!
//! Every table is a `BTreeMap` keyed by id behind a single `tokio::sync::RwLock`, so each
//! repository call sees and leaves a consistent snapshot. The repositories here enforce the
//! same constraints the PostgreSQL schema does (unique keys, foreign keys, cascades) and
//! report violations with the same [`DbError`](crate::db::errors::DbError) variants, so
//! handlers cannot tell the backends apart.
//!
//! Nothing is persisted: the store starts empty and is dropped with the process.

mod announcements;
mod events;
mod students;
mod terms;
mod users;

pub use announcements::MemoryAnnouncements;
pub use events::MemoryEvents;
pub use students::MemoryStudents;
pub use terms::MemoryTerms;
pub use users::MemoryUsers;

use crate::db::models::{
    announcements::AnnouncementDBResponse, events::EventDBResponse, students::StudentDBResponse, terms::TermDBResponse,
    users::UserDBResponse,
};
use std::collections::BTreeMap;
use tokio::sync::RwLock;

/// One table: rows by id plus the next id to hand out, like a `SERIAL` sequence.
#[derive(Debug)]
pub(crate) struct Table<T> {
    rows: BTreeMap<i32, T>,
    next_id: i32,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            next_id: 1,
        }
    }
}

impl<T> Table<T> {
    fn allocate_id(&mut self) -> i32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn get(&self, id: i32) -> Option<&T> {
        self.rows.get(&id)
    }

    fn get_mut(&mut self, id: i32) -> Option<&mut T> {
        self.rows.get_mut(&id)
    }

    fn contains(&self, id: i32) -> bool {
        self.rows.contains_key(&id)
    }

    fn insert(&mut self, id: i32, row: T) {
        self.rows.insert(id, row);
    }

    fn remove(&mut self, id: i32) -> Option<T> {
        self.rows.remove(&id)
    }

    fn values(&self) -> impl Iterator<Item = &T> {
        self.rows.values()
    }

    fn values_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.rows.values_mut()
    }

    fn retain(&mut self, f: impl FnMut(&i32, &mut T) -> bool) {
        self.rows.retain(f);
    }
}

#[derive(Debug, Default)]
pub(crate) struct Tables {
    users: Table<UserDBResponse>,
    students: Table<StudentDBResponse>,
    terms: Table<TermDBResponse>,
    announcements: Table<AnnouncementDBResponse>,
    events: Table<EventDBResponse>,
}

impl Tables {
    /// Username for a `created_by` reference, as the PostgreSQL repositories join it
    fn username_of(&self, user_id: Option<i32>) -> Option<String> {
        user_id.and_then(|id| self.users.get(id)).map(|u| u.username.clone())
    }
}

/// Process-local store shared by every connection handed out for the memory backend.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}
