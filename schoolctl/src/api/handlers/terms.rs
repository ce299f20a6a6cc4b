use std::path::Path as FsPath;

use axum::{
    Json,
    extract::{Multipart, State, multipart::{MultipartError, MultipartRejection}},
    http::{
        StatusCode,
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    },
    response::{IntoResponse, Response},
};
use chrono::{Datelike, Utc};

use crate::{
    AppState,
    api::{
        models::{
            auth::MessageResponse,
            terms::{ListTermsQuery, TermForm, TermResponse, TermUpload},
            users::CurrentUser,
        },
        validation::{PathParam, QueryParams, TEXT_MAX, Validator, blank_to_none},
    },
    auth::permissions::StaffUser,
    config::UploadsConfig,
    db::{
        errors::DbError,
        models::{
            file_storage::FileStorageRequest,
            terms::{TermAttachment, TermFilter, TermUpsertDBRequest},
        },
    },
    errors::{Error, Result},
    types::{StudentId, StudentTermPath},
};

/// Multipart field carrying the attachment
const FILE_FIELD: &str = "studentFile";

/// An attachment read from the upload, not yet stored.
struct UploadedFile {
    file_name: String,
    extension: String,
    content_type: String,
    content: Vec<u8>,
}

/// Parse `2024-2025` (or `2024/2025`) into its canonical `2024-2025` form. The second year must
/// follow the first.
fn parse_academic_year(value: &str) -> Option<String> {
    let (start, end) = value.split_once(['-', '/'])?;
    let is_year = |s: &str| s.len() == 4 && s.bytes().all(|b| b.is_ascii_digit());
    if !is_year(start) || !is_year(end) {
        return None;
    }
    let (start, end): (i32, i32) = (start.parse().ok()?, end.parse().ok()?);
    (end == start + 1).then(|| format!("{start}-{end}"))
}

/// Academic year starting in the current calendar year, used when the form leaves it out.
fn current_academic_year() -> String {
    let year = Utc::now().year();
    format!("{}-{}", year, year + 1)
}

fn multipart_error(e: MultipartError) -> Error {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        Error::PayloadTooLarge { message: e.body_text() }
    } else {
        Error::BadRequest {
            message: format!("Failed to parse multipart data: {}", e.body_text()),
        }
    }
}

fn file_too_large(max_file_size: u64) -> Error {
    Error::PayloadTooLarge {
        message: format!(
            "File size exceeds maximum allowed size of {} bytes ({} MB)",
            max_file_size,
            max_file_size / (1024 * 1024)
        ),
    }
}

fn invalid_file_type(uploads: &UploadsConfig) -> Error {
    let allowed: Vec<String> = uploads.allowed_extensions.iter().map(|e| e.to_uppercase()).collect();
    Error::BadRequest {
        message: format!("Invalid file type. Only {} files are allowed.", allowed.join(", ")),
    }
}

/// Both the file's extension and its declared mime type must be on the allow list. Returns the
/// lowercased extension (with dot) and the mime type to record.
fn check_file_type(file_name: &str, declared: Option<&str>, uploads: &UploadsConfig) -> Result<(String, String)> {
    let extension = FsPath::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .filter(|e| uploads.allowed_extensions.contains(e))
        .ok_or_else(|| invalid_file_type(uploads))?;

    let content_type = match declared {
        Some(declared) => declared.split(';').next().unwrap_or_default().trim().to_ascii_lowercase(),
        None => mime_guess::from_ext(&extension).first_or_octet_stream().essence_str().to_string(),
    };
    let mime_allowed = uploads
        .allowed_extensions
        .iter()
        .any(|ext| mime_guess::from_ext(ext).iter().any(|m| m.essence_str() == content_type));
    if !mime_allowed {
        return Err(invalid_file_type(uploads));
    }

    Ok((format!(".{extension}"), content_type))
}

/// Read the form as it streams in. The attachment is type-checked before its body is read and
/// aborted as soon as it passes the size limit.
async fn read_term_form(multipart: &mut Multipart, uploads: &UploadsConfig) -> Result<(TermForm, Option<UploadedFile>)> {
    let mut form = TermForm::default();
    let mut upload = None;

    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();

        if name == FILE_FIELD {
            // Browsers send an empty part when no file was picked
            let Some(file_name) = field.file_name().map(str::to_string).filter(|n| !n.is_empty()) else {
                continue;
            };
            if file_name.chars().count() > TEXT_MAX {
                return Err(Error::BadRequest {
                    message: format!("File name must be at most {TEXT_MAX} characters"),
                });
            }
            let (extension, content_type) = check_file_type(&file_name, field.content_type(), uploads)?;

            let mut content = Vec::new();
            while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
                if (content.len() + chunk.len()) as u64 > uploads.max_file_size {
                    tracing::warn!(file_name = %file_name, max_file_size = uploads.max_file_size, "Attachment too large, aborting upload");
                    return Err(file_too_large(uploads.max_file_size));
                }
                content.extend_from_slice(&chunk);
            }

            if !content.is_empty() {
                upload = Some(UploadedFile {
                    file_name,
                    extension,
                    content_type,
                    content,
                });
            }
            continue;
        }

        let value = field.text().await.map_err(multipart_error)?;
        match name.as_str() {
            "term_number" => form.term_number = Some(value),
            "academic_year" => form.academic_year = Some(value),
            "attendance" => form.attendance = Some(value),
            "academic_score" => form.academic_score = Some(value),
            "remarks" => form.remarks = Some(value),
            other => tracing::debug!(field = other, "Ignoring unknown form field"),
        }
    }

    Ok((form, upload))
}

fn parse_percentage(value: &str) -> Option<f64> {
    value.parse::<f64>().ok().filter(|v| (0.0..=100.0).contains(v))
}

fn validate_term_form(student_id: StudentId, form: TermForm) -> Result<TermUpsertDBRequest> {
    let present = |v: &Option<String>| v.as_deref().is_some_and(|v| !v.trim().is_empty());
    if !present(&form.term_number) || !present(&form.attendance) || !present(&form.academic_score) {
        return Err(Error::BadRequest {
            message: "Term number, attendance, and academic score are required".to_string(),
        });
    }

    let mut v = Validator::new();
    let term_number = v.parse_required(
        "term_number",
        form.term_number.as_deref(),
        |s| s.parse::<i32>().ok().filter(|n| (1..=3).contains(n)),
        "Term number must be 1, 2, or 3",
    );
    let attendance = v.parse_required(
        "attendance",
        form.attendance.as_deref(),
        parse_percentage,
        "Attendance must be between 0 and 100",
    );
    let academic_score = v.parse_required(
        "academic_score",
        form.academic_score.as_deref(),
        parse_percentage,
        "Academic score must be between 0 and 100",
    );
    let academic_year = v.parse_optional(
        "academic_year",
        form.academic_year.as_deref(),
        parse_academic_year,
        "Academic year must be two consecutive years, e.g. 2024-2025",
    );
    v.finish()?;

    Ok(TermUpsertDBRequest {
        student_id,
        term_number: term_number.unwrap_or_default(),
        academic_year: academic_year.unwrap_or_else(current_academic_year),
        attendance: attendance.unwrap_or_default(),
        academic_score: academic_score.unwrap_or_default(),
        remarks: blank_to_none(form.remarks),
        attachment: None,
    })
}

/// Remove a stored attachment that no record points at any more
async fn discard_attachment(state: &AppState, storage_key: &str) {
    if let Err(e) = state.storage.delete(storage_key).await {
        tracing::warn!(storage_key = %storage_key, error = %e, "Failed to remove attachment");
    }
}

/// List a student's term records, ordered by academic year then term
#[utoipa::path(
    get,
    path = "/students/{id}/terms",
    tag = "terms",
    summary = "List term records",
    params(("id" = i32, Path, description = "Student ID"), ListTermsQuery),
    responses(
        (status = 200, description = "Term records", body = [TermResponse]),
        (status = 401, description = "Missing token"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all, fields(student_id = id))]
pub async fn list_terms(
    State(state): State<AppState>,
    PathParam(id): PathParam<StudentId>,
    QueryParams(query): QueryParams<ListTermsQuery>,
    _: CurrentUser,
) -> Result<Json<Vec<TermResponse>>> {
    let academic_year = blank_to_none(query.academic_year).map(|y| parse_academic_year(&y).unwrap_or(y));
    let filter = TermFilter {
        term_number: query.term,
        academic_year,
        ..TermFilter::new(id)
    };

    let mut conn = state.db.acquire().await?;
    let terms = conn.terms().list(&filter).await?;
    Ok(Json(terms.into_iter().map(TermResponse::from).collect()))
}

/// Create or replace the record for a (term, academic year), optionally with an attachment.
///
/// Resubmitting the same term and year overwrites the scores. The stored attachment is only
/// replaced when a new file is sent; the replaced file is then removed.
#[utoipa::path(
    post,
    path = "/students/{id}/terms",
    tag = "terms",
    summary = "Save term record",
    params(("id" = i32, Path, description = "Student ID")),
    request_body(content = TermUpload, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Term record saved", body = TermResponse),
        (status = 400, description = "Missing or invalid fields, or disallowed file type"),
        (status = 403, description = "Requires admin or teacher role"),
        (status = 404, description = "Student not found"),
        (status = 413, description = "Attachment too large"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all, fields(student_id = id))]
pub async fn upsert_term(
    State(state): State<AppState>,
    PathParam(id): PathParam<StudentId>,
    _: StaffUser,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<TermResponse>)> {
    let mut multipart = multipart.map_err(|rejection| Error::BadRequest {
        message: rejection.body_text(),
    })?;
    let (form, upload) = read_term_form(&mut multipart, &state.config.uploads).await?;
    let mut request = validate_term_form(id, form)?;

    let mut conn = state.db.acquire().await?;
    if conn.students().get_by_id(id).await?.is_none() {
        return Err(Error::NotFound {
            resource: "Student".to_string(),
            id: id.to_string(),
        });
    }

    if let Some(upload) = upload {
        let file_size = upload.content.len() as i64;
        let stored = state
            .storage
            .store(FileStorageRequest {
                content: upload.content,
                extension: upload.extension,
            })
            .await?;
        tracing::info!(storage_key = %stored.storage_key, file_size, "Stored term attachment");

        request.attachment = Some(TermAttachment {
            file_name: upload.file_name,
            file_path: stored.storage_key,
            file_size,
            file_type: upload.content_type,
        });
    }

    let saved = match conn.terms().upsert(&request).await {
        Ok(saved) => saved,
        Err(e) => {
            if let Some(attachment) = &request.attachment {
                discard_attachment(&state, &attachment.file_path).await;
            }
            return Err(e.into());
        }
    };

    if let Some(replaced) = &saved.replaced_file_path {
        discard_attachment(&state, replaced).await;
    }

    Ok((StatusCode::CREATED, Json(TermResponse::from(saved.term))))
}

/// Download a term record's attachment, served inline with its recorded content type
#[utoipa::path(
    get,
    path = "/students/{id}/terms/{term_id}/file",
    tag = "terms",
    summary = "Download attachment",
    params(
        ("id" = i32, Path, description = "Student ID"),
        ("term_id" = i32, Path, description = "Term record ID"),
    ),
    responses(
        (status = 200, description = "Attachment content", content_type = "application/octet-stream"),
        (status = 404, description = "File not found", body = crate::errors::ErrorResponse),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all, fields(student_id = path.id, term_id = path.term_id))]
pub async fn download_term_file(State(state): State<AppState>, PathParam(path): PathParam<StudentTermPath>, _: CurrentUser) -> Result<Response> {
    let file_not_found = || Error::NotFound {
        resource: "File".to_string(),
        id: path.term_id.to_string(),
    };

    let mut conn = state.db.acquire().await?;
    let attachment = conn
        .terms()
        .get_for_student(path.id, path.term_id)
        .await?
        .and_then(|term| term.attachment())
        .ok_or_else(file_not_found)?;

    let content = match state.storage.retrieve(&attachment.file_path).await {
        Ok(content) => content,
        Err(DbError::NotFound) => {
            tracing::warn!(storage_key = %attachment.file_path, "Attachment recorded but missing from storage");
            return Err(file_not_found());
        }
        Err(e) => return Err(e.into()),
    };

    // Header values must be visible ASCII
    let file_name: String = attachment
        .file_name
        .chars()
        .map(|c| if (c.is_ascii_graphic() || c == ' ') && c != '"' { c } else { '_' })
        .collect();

    Ok((
        [
            (CONTENT_TYPE, attachment.file_type),
            (CONTENT_DISPOSITION, format!("inline; filename=\"{file_name}\"")),
        ],
        content,
    )
        .into_response())
}

/// Delete a term record and its attachment
#[utoipa::path(
    delete,
    path = "/students/{id}/terms/{term_id}",
    tag = "terms",
    summary = "Delete term record",
    params(
        ("id" = i32, Path, description = "Student ID"),
        ("term_id" = i32, Path, description = "Term record ID"),
    ),
    responses(
        (status = 200, description = "Term record deleted", body = MessageResponse),
        (status = 403, description = "Requires admin or teacher role"),
        (status = 404, description = "Term record not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all, fields(student_id = path.id, term_id = path.term_id))]
pub async fn delete_term(State(state): State<AppState>, PathParam(path): PathParam<StudentTermPath>, _: StaffUser) -> Result<Json<MessageResponse>> {
    let not_found = || Error::NotFound {
        resource: "Term record".to_string(),
        id: path.term_id.to_string(),
    };

    let mut conn = state.db.acquire().await?;
    let term = conn
        .terms()
        .get_for_student(path.id, path.term_id)
        .await?
        .ok_or_else(not_found)?;

    if !conn.terms().delete(term.id).await? {
        return Err(not_found());
    }
    if let Some(storage_key) = &term.file_path {
        discard_attachment(&state, storage_key).await;
    }

    Ok(Json(MessageResponse::new("Term record deleted successfully")))
}
