//! Request body validation.
//!
//! Write payloads arrive with their closed-set and date fields as raw strings. Handlers run them
//! through a [`Validator`], which collects every failed check and turns them into a single
//! [`Error::Validation`] response:
//!
//! ```json
//! {"errors": [{"field": "full_name", "message": "Full name is required"}]}
//! ```
//!
//! Bodies that are not JSON at all are rejected by [`JsonBody`] with a 400 `{"error": ...}`, and
//! malformed path segments or query strings the same way by [`PathParam`] and [`QueryParams`].

use axum::{
    Json,
    extract::{
        FromRequest, FromRequestParts, Path, Query, Request,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::request::Parts,
};
use chrono::{DateTime, NaiveDate, NaiveTime};
use serde::de::DeserializeOwned;

use crate::errors::{Error, FieldError, Result};

/// Widths of the `VARCHAR` columns that request bodies write to.
pub const TEXT_MAX: usize = 255;
pub const CLASS_MAX: usize = 20;
pub const USERNAME_MAX: usize = 50;

/// Accumulates field errors for one request body.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, field: &str, message: &str) {
        self.errors.push(FieldError::new(field, message));
    }

    /// Record `message` against `field` unless `ok` holds.
    pub fn check(&mut self, ok: bool, field: &str, message: &str) {
        if !ok {
            self.error(field, message);
        }
    }

    /// A value that must be present and non-blank. Returned trimmed.
    pub fn required(&mut self, field: &str, value: Option<&str>, message: &str) -> Option<String> {
        let value = non_blank(value);
        if value.is_none() {
            self.error(field, message);
        }
        value.map(str::to_string)
    }

    /// A value that must be present and non-empty, returned as sent. For secrets, where
    /// surrounding whitespace is significant.
    pub fn required_raw(&mut self, field: &str, value: Option<&str>, message: &str) -> Option<String> {
        let value = value.filter(|v| !v.is_empty());
        if value.is_none() {
            self.error(field, message);
        }
        value.map(str::to_string)
    }

    /// Reject a value whose trimmed form is longer than `max` characters, with
    /// "`label` must be at most `max` characters".
    pub fn max_chars(&mut self, field: &str, value: Option<&str>, max: usize, label: &str) {
        if value.is_some_and(|v| v.trim().chars().count() > max) {
            self.error(field, &format!("{label} must be at most {max} characters"));
        }
    }

    /// A value that may be absent, but must not be blank when given. Returned trimmed.
    pub fn not_blank(&mut self, field: &str, value: Option<&str>, message: &str) -> Option<String> {
        let value = value?;
        let trimmed = value.trim();
        if trimmed.is_empty() {
            self.error(field, message);
            return None;
        }
        Some(trimmed.to_string())
    }

    /// A value that must be present and parse.
    pub fn parse_required<T>(&mut self, field: &str, value: Option<&str>, parse: impl Fn(&str) -> Option<T>, message: &str) -> Option<T> {
        let parsed = non_blank(value).and_then(parse);
        if parsed.is_none() {
            self.error(field, message);
        }
        parsed
    }

    /// A value that may be absent or blank, but must parse when given.
    pub fn parse_optional<T>(&mut self, field: &str, value: Option<&str>, parse: impl Fn(&str) -> Option<T>, message: &str) -> Option<T> {
        let value = non_blank(value)?;
        let parsed = parse(value);
        if parsed.is_none() {
            self.error(field, message);
        }
        parsed
    }

    /// A nullable column in a partial update: absent leaves it alone (`None`), `null` or a blank
    /// string clears it (`Some(None)`), anything else must parse (`Some(Some(value))`).
    pub fn parse_clearable<T>(
        &mut self,
        field: &str,
        value: Option<Option<&str>>,
        parse: impl Fn(&str) -> Option<T>,
        message: &str,
    ) -> Option<Option<T>> {
        let value = value?;
        match non_blank(value) {
            None => Some(None),
            Some(raw) => match parse(raw) {
                Some(parsed) => Some(Some(parsed)),
                None => {
                    self.error(field, message);
                    None
                }
            },
        }
    }

    /// Fail with every collected error, if any.
    pub fn finish(self) -> Result<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation { errors: self.errors })
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Parse one of our lowercase closed-set enums (`"active"`, `"urgent"`, ...).
pub fn parse_enum<T: DeserializeOwned>(value: &str) -> Option<T> {
    serde_json::from_value(serde_json::Value::String(value.to_string())).ok()
}

/// Accepts `2025-09-01` or a full RFC 3339 timestamp, of which only the date is kept.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(value).ok().map(|dt| dt.date_naive()))
}

/// Accepts `HH:MM` or `HH:MM:SS`.
pub fn parse_time(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .ok()
        .or_else(|| NaiveTime::parse_from_str(value, "%H:%M").ok())
}

/// Optional free text: blank becomes `None`.
pub fn blank_to_none(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// `Json<T>` whose rejections render as our standard `{"error": ...}` body.
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => Err(Error::BadRequest {
                message: rejection.body_text(),
            }),
        }
    }
}

/// `Path<T>` whose rejections render as our standard `{"error": ...}` body.
pub struct PathParam<T>(pub T);

impl<S, T> FromRequestParts<S> for PathParam<T>
where
    Path<T>: FromRequestParts<S, Rejection = PathRejection>,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(PathParam(value)),
            Err(rejection) => Err(Error::BadRequest {
                message: rejection.body_text(),
            }),
        }
    }
}

/// `Query<T>` whose rejections render as our standard `{"error": ...}` body.
pub struct QueryParams<T>(pub T);

impl<S, T> FromRequestParts<S> for QueryParams<T>
where
    Query<T>: FromRequestParts<S, Rejection = QueryRejection>,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(QueryParams(value)),
            Err(rejection) => Err(Error::BadRequest {
                message: rejection.body_text(),
            }),
        }
    }
}
