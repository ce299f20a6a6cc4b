//! API layer for HTTP request handling and data models.
//!
//! This module contains the REST API implementation, organized into:
//!
//! - **[`handlers`]**: Axum route handlers for all API endpoints
//! - **[`models`]**: Request/response data structures for API communication
//! - **[`validation`]**: Field validation shared by the write handlers
//!
//! # API Structure
//!
//! Everything is served under `/api`:
//!
//! - **Authentication** (`/api/auth/*`): Login, current account, logout
//! - **Students** (`/api/students/*`): Student records, stats, per-term records and attachments
//! - **Announcements** (`/api/announcements/*`): Notice board
//! - **Events** (`/api/events/*`): Upcoming school events
//! - **Users** (`/api/users/*`): Staff account management (admin only)
//! - **Health** (`/api/health`): Liveness
//!
//! # OpenAPI Documentation
//!
//! All endpoints are documented with `utoipa` annotations. The document is served at
//! `/api/openapi.json` with an interactive viewer at `/api/docs`.

pub mod handlers;
pub mod models;
pub mod validation;
