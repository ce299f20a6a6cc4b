//! HTTP request handlers for all API endpoints.
//!
//! This module contains Axum route handlers organized by resource type.
//! Each handler is responsible for:
//! - Authentication and role checks, via its extractor arguments
//! - Request validation, via [`crate::api::validation`]
//! - Reading and writing through the repositories of [`crate::db::DbConnection`]
//! - Response serialization
//!
//! # Handler Modules
//!
//! - [`announcements`]: Announcement board
//! - [`auth`]: Login, current account and logout
//! - [`events`]: Upcoming school events
//! - [`health`]: Liveness
//! - [`students`]: Student records and aggregate statistics
//! - [`terms`]: Per-term records and their attachments
//! - [`users`]: Staff account management
//!
//! # Authentication
//!
//! Every handler except login and health takes a [`crate::api::models::users::CurrentUser`] or a
//! [`crate::auth::permissions::RequiresRole`] argument, which rejects the request before the
//! handler body runs.
//!
//! # Error Handling
//!
//! Handlers return [`crate::errors::Error`] which automatically converts to
//! appropriate HTTP status codes and JSON error responses.

pub mod announcements;
pub mod auth;
pub mod events;
pub mod health;
pub mod students;
pub mod terms;
pub mod users;

use crate::{db::errors::DbError, errors::Error};

/// Map a repository `NotFound` to a 404 naming the resource; pass other errors through.
pub(crate) fn not_found_as(resource: &'static str, id: i32) -> impl FnOnce(DbError) -> Error {
    move |err| match err {
        DbError::NotFound => Error::NotFound {
            resource: resource.to_string(),
            id: id.to_string(),
        },
        other => Error::Database(other),
    }
}
