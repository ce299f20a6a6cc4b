//! API request/response models for per-term student records.

use crate::db::models::terms::TermDBResponse;
use crate::types::{StudentId, TermId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, serde_as};
use utoipa::{IntoParams, ToSchema};

/// Multipart form accepted by the term upsert endpoint. Only used for API documentation; the
/// handler reads the fields as they stream in.
#[allow(dead_code)]
#[derive(Debug, Deserialize, ToSchema)]
pub struct TermUpload {
    /// 1, 2 or 3
    pub term_number: String,
    /// `YYYY-YYYY`, e.g. `2024-2025`
    pub academic_year: String,
    /// Attendance percentage, 0 to 100
    pub attendance: String,
    /// Academic score, 0 to 100
    pub academic_score: String,
    pub remarks: Option<String>,
    /// Optional attachment (jpeg, jpg, png, gif, pdf, doc, docx, xls, xlsx)
    #[serde(rename = "studentFile")]
    #[schema(value_type = Option<String>, format = Binary)]
    pub student_file: Option<Vec<u8>>,
}

/// Raw text fields collected from the multipart form before validation.
#[derive(Debug, Clone, Default)]
pub struct TermForm {
    pub term_number: Option<String>,
    pub academic_year: Option<String>,
    pub attendance: Option<String>,
    pub academic_score: Option<String>,
    pub remarks: Option<String>,
}

/// Metadata of an uploaded attachment
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TermAttachmentResponse {
    pub file_name: String,
    pub file_size: i64,
    pub file_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TermResponse {
    pub id: TermId,
    pub student_id: StudentId,
    pub term_number: i32,
    pub academic_year: String,
    pub attendance: f64,
    pub academic_score: f64,
    pub remarks: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<TermAttachmentResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Query parameters for listing a student's terms
#[serde_as]
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct ListTermsQuery {
    /// Term number (1, 2 or 3)
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub term: Option<i32>,
    /// Academic year, e.g. `2024-2025`
    pub academic_year: Option<String>,
}

impl From<TermDBResponse> for TermResponse {
    fn from(db: TermDBResponse) -> Self {
        let file = match (db.file_name, db.file_size, db.file_type) {
            (Some(file_name), Some(file_size), Some(file_type)) => Some(TermAttachmentResponse {
                file_name,
                file_size,
                file_type,
            }),
            _ => None,
        };

        Self {
            id: db.id,
            student_id: db.student_id,
            term_number: db.term_number,
            academic_year: db.academic_year,
            attendance: db.attendance,
            academic_score: db.academic_score,
            remarks: db.remarks,
            file,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}
