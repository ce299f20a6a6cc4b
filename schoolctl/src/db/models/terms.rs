//! Database models for per-term student records.

use crate::types::{StudentId, TermId};
use chrono::{DateTime, Utc};

/// Attachment metadata stored alongside a term record
#[derive(Debug, Clone, PartialEq)]
pub struct TermAttachment {
    /// Original file name as uploaded
    pub file_name: String,
    /// Storage key returned by the file storage backend
    pub file_path: String,
    pub file_size: i64,
    pub file_type: String,
}

/// Insert-or-replace request keyed on (student, term, academic year)
#[derive(Debug, Clone)]
pub struct TermUpsertDBRequest {
    pub student_id: StudentId,
    pub term_number: i32,
    pub academic_year: String,
    pub attendance: f64,
    pub academic_score: f64,
    pub remarks: Option<String>,
    /// New attachment. `None` keeps whatever is already stored.
    pub attachment: Option<TermAttachment>,
}

/// Database response for a term record
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TermDBResponse {
    pub id: TermId,
    pub student_id: StudentId,
    pub term_number: i32,
    pub academic_year: String,
    pub attendance: f64,
    pub academic_score: f64,
    pub remarks: Option<String>,
    pub file_name: Option<String>,
    pub file_path: Option<String>,
    pub file_size: Option<i64>,
    pub file_type: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TermDBResponse {
    pub fn attachment(&self) -> Option<TermAttachment> {
        Some(TermAttachment {
            file_name: self.file_name.clone()?,
            file_path: self.file_path.clone()?,
            file_size: self.file_size?,
            file_type: self.file_type.clone()?,
        })
    }
}

/// Result of an upsert
#[derive(Debug, Clone)]
pub struct TermUpsertDBResponse {
    pub term: TermDBResponse,
    /// Storage key of an attachment that was replaced and can now be removed
    pub replaced_file_path: Option<String>,
}

/// Filter for listing a student's terms
#[derive(Debug, Clone)]
pub struct TermFilter {
    pub student_id: StudentId,
    pub term_number: Option<i32>,
    pub academic_year: Option<String>,
}

impl TermFilter {
    pub fn new(student_id: StudentId) -> Self {
        Self {
            student_id,
            term_number: None,
            academic_year: None,
        }
    }

    pub fn matches(&self, term: &TermDBResponse) -> bool {
        term.student_id == self.student_id
            && self.term_number.is_none_or(|n| term.term_number == n)
            && self.academic_year.as_ref().is_none_or(|y| &term.academic_year == y)
    }
}
