use axum::{
    Json,
    extract::State,
    http::StatusCode,
};

use super::not_found_as;
use crate::{
    AppState,
    api::{
        models::{
            auth::MessageResponse,
            students::{
                Cca, CcaOptional, Gender, ListStudentsQuery, SportsHouse, StudentCreate, StudentListResponse, StudentResponse,
                StudentStatsResponse, StudentStatus, StudentUpdate,
            },
            users::CurrentUser,
        },
        validation::{CLASS_MAX, JsonBody, PathParam, QueryParams, TEXT_MAX, Validator, blank_to_none, parse_date, parse_enum},
    },
    auth::permissions::{RequiresRole, StaffUser},
    db::models::{
        students::{StudentCreateDBRequest, StudentFilter, StudentUpdateDBRequest},
        terms::TermFilter,
    },
    errors::{Error, Result},
    types::StudentId,
};

fn student_not_found(id: StudentId) -> Error {
    Error::NotFound {
        resource: "Student".to_string(),
        id: id.to_string(),
    }
}

fn check_text_lengths(v: &mut Validator, full_name: Option<&str>, class: Option<&str>, quran_teacher: Option<&str>) {
    v.max_chars("full_name", full_name, TEXT_MAX, "Full name");
    v.max_chars("class", class, CLASS_MAX, "Class");
    v.max_chars("quran_teacher", quran_teacher, TEXT_MAX, "Quran teacher");
}

fn validate_create(body: StudentCreate) -> Result<StudentCreateDBRequest> {
    let mut v = Validator::new();
    check_text_lengths(
        &mut v,
        body.full_name.as_deref(),
        body.class.as_deref(),
        body.quran_teacher.as_deref(),
    );
    let full_name = v.required("full_name", body.full_name.as_deref(), "Full name is required");
    let date_of_birth = v.parse_required(
        "date_of_birth",
        body.date_of_birth.as_deref(),
        parse_date,
        "Valid date of birth is required",
    );
    let class = v.required("class", body.class.as_deref(), "Class is required");
    let status = v.parse_required("status", body.status.as_deref(), parse_enum::<StudentStatus>, "Invalid status");
    let sports_house = v.parse_optional(
        "sports_house",
        body.sports_house.as_deref(),
        parse_enum::<SportsHouse>,
        "Invalid sports house",
    );
    let cca = v.parse_optional("cca", body.cca.as_deref(), parse_enum::<Cca>, "Invalid CCA");
    let cca_optional = v.parse_optional(
        "cca_optional",
        body.cca_optional.as_deref(),
        parse_enum::<CcaOptional>,
        "Invalid optional CCA",
    );
    let gender = v.parse_optional("gender", body.gender.as_deref(), parse_enum::<Gender>, "Invalid gender");
    v.finish()?;

    Ok(StudentCreateDBRequest {
        full_name: full_name.unwrap_or_default(),
        date_of_birth: date_of_birth.unwrap_or_default(),
        class: class.unwrap_or_default(),
        status: status.unwrap_or(StudentStatus::Active),
        sports_house,
        cca,
        cca_optional: cca_optional.unwrap_or_default(),
        quran_teacher: blank_to_none(body.quran_teacher),
        gender,
    })
}

fn validate_update(body: StudentUpdate) -> Result<StudentUpdateDBRequest> {
    let mut v = Validator::new();
    check_text_lengths(
        &mut v,
        body.full_name.as_deref(),
        body.class.as_deref(),
        body.quran_teacher.as_ref().and_then(Option::as_deref),
    );
    let request = StudentUpdateDBRequest {
        full_name: v.not_blank("full_name", body.full_name.as_deref(), "Full name cannot be empty"),
        date_of_birth: v.parse_optional(
            "date_of_birth",
            body.date_of_birth.as_deref(),
            parse_date,
            "Valid date of birth is required",
        ),
        class: v.not_blank("class", body.class.as_deref(), "Class cannot be empty"),
        status: v.parse_optional("status", body.status.as_deref(), parse_enum::<StudentStatus>, "Invalid status"),
        sports_house: v.parse_clearable(
            "sports_house",
            body.sports_house.as_ref().map(Option::as_deref),
            parse_enum::<SportsHouse>,
            "Invalid sports house",
        ),
        cca: v.parse_clearable("cca", body.cca.as_ref().map(Option::as_deref), parse_enum::<Cca>, "Invalid CCA"),
        // Clearing the optional CCA means "none", which is stored explicitly
        cca_optional: v
            .parse_clearable(
                "cca_optional",
                body.cca_optional.as_ref().map(Option::as_deref),
                parse_enum::<CcaOptional>,
                "Invalid optional CCA",
            )
            .map(Option::unwrap_or_default),
        quran_teacher: body.quran_teacher.map(blank_to_none),
        gender: v.parse_clearable(
            "gender",
            body.gender.as_ref().map(Option::as_deref),
            parse_enum::<Gender>,
            "Invalid gender",
        ),
    };
    v.finish()?;

    if request.is_empty() {
        return Err(Error::BadRequest {
            message: "No valid fields to update".to_string(),
        });
    }
    Ok(request)
}

/// List students, newest first
#[utoipa::path(
    get,
    path = "/students",
    tag = "students",
    summary = "List students",
    params(ListStudentsQuery),
    responses(
        (status = 200, description = "One page of students", body = StudentListResponse),
        (status = 401, description = "Missing token"),
        (status = 403, description = "Invalid or expired token"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_students(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<ListStudentsQuery>,
    _: CurrentUser,
) -> Result<Json<StudentListResponse>> {
    let (page, limit) = (query.pagination.page(), query.pagination.limit());
    let filter = StudentFilter {
        class: blank_to_none(query.class.clone()),
        classes: query.classes(),
        status: query.status,
        ..StudentFilter::new(query.pagination.skip(), limit)
    };

    let mut conn = state.db.acquire().await?;
    let total = conn.students().count(&filter).await?;
    let students = conn.students().list(&filter).await?;

    Ok(Json(StudentListResponse {
        students: students.into_iter().map(StudentResponse::from).collect(),
        total,
        page,
        limit,
        total_pages: query.pagination.total_pages(total),
    }))
}

/// Counts across all students, by gender and by class
#[utoipa::path(
    get,
    path = "/students/stats",
    tag = "students",
    summary = "Student statistics",
    responses(
        (status = 200, description = "Aggregate counts", body = StudentStatsResponse),
        (status = 401, description = "Missing token"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_student_stats(State(state): State<AppState>, _: CurrentUser) -> Result<Json<StudentStatsResponse>> {
    let mut conn = state.db.acquire().await?;
    let stats = conn.students().stats().await?;
    Ok(Json(StudentStatsResponse::from(stats)))
}

#[utoipa::path(
    get,
    path = "/students/{id}",
    tag = "students",
    summary = "Get student",
    params(("id" = i32, Path, description = "Student ID")),
    responses(
        (status = 200, description = "Student", body = StudentResponse),
        (status = 404, description = "Student not found", body = crate::errors::ErrorResponse),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all, fields(student_id = id))]
pub async fn get_student(State(state): State<AppState>, PathParam(id): PathParam<StudentId>, _: CurrentUser) -> Result<Json<StudentResponse>> {
    let mut conn = state.db.acquire().await?;
    let student = conn.students().get_by_id(id).await?.ok_or_else(|| student_not_found(id))?;
    Ok(Json(StudentResponse::from(student)))
}

#[utoipa::path(
    post,
    path = "/students",
    tag = "students",
    summary = "Create student",
    request_body = StudentCreate,
    responses(
        (status = 201, description = "Student created", body = StudentResponse),
        (status = 400, description = "Invalid fields", body = crate::errors::ValidationErrorResponse),
        (status = 403, description = "Requires admin or teacher role"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_student(
    State(state): State<AppState>,
    RequiresRole(current_user, _): StaffUser,
    JsonBody(body): JsonBody<StudentCreate>,
) -> Result<(StatusCode, Json<StudentResponse>)> {
    let request = validate_create(body)?;

    let mut conn = state.db.acquire().await?;
    let student = conn.students().create(&request).await?;
    tracing::info!(student_id = student.id, created_by = current_user.id, "Student created");

    Ok((StatusCode::CREATED, Json(StudentResponse::from(student))))
}

/// Partially update a student. `null` clears the optional profile fields.
#[utoipa::path(
    put,
    path = "/students/{id}",
    tag = "students",
    summary = "Update student",
    params(("id" = i32, Path, description = "Student ID")),
    request_body = StudentUpdate,
    responses(
        (status = 200, description = "Student updated", body = StudentResponse),
        (status = 400, description = "Invalid fields, or nothing to update"),
        (status = 403, description = "Requires admin or teacher role"),
        (status = 404, description = "Student not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all, fields(student_id = id))]
pub async fn update_student(
    State(state): State<AppState>,
    PathParam(id): PathParam<StudentId>,
    _: StaffUser,
    JsonBody(body): JsonBody<StudentUpdate>,
) -> Result<Json<StudentResponse>> {
    let request = validate_update(body)?;

    let mut conn = state.db.acquire().await?;
    let student = conn
        .students()
        .update(id, &request)
        .await
        .map_err(not_found_as("Student", id))?;

    Ok(Json(StudentResponse::from(student)))
}

/// Delete a student together with their term records and attachments
#[utoipa::path(
    delete,
    path = "/students/{id}",
    tag = "students",
    summary = "Delete student",
    params(("id" = i32, Path, description = "Student ID")),
    responses(
        (status = 200, description = "Student deleted", body = MessageResponse),
        (status = 403, description = "Requires admin or teacher role"),
        (status = 404, description = "Student not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all, fields(student_id = id))]
pub async fn delete_student(State(state): State<AppState>, PathParam(id): PathParam<StudentId>, _: StaffUser) -> Result<Json<MessageResponse>> {
    let mut conn = state.db.acquire().await?;
    let attachments: Vec<String> = conn
        .terms()
        .list(&TermFilter::new(id))
        .await?
        .into_iter()
        .filter_map(|term| term.file_path)
        .collect();

    if !conn.students().delete(id).await? {
        return Err(student_not_found(id));
    }

    for storage_key in attachments {
        if let Err(e) = state.storage.delete(&storage_key).await {
            tracing::warn!(storage_key = %storage_key, error = %e, "Failed to remove attachment of deleted student");
        }
    }

    Ok(Json(MessageResponse::new("Student deleted successfully")))
}

#[cfg(test)]
mod tests {
    use crate::api::models::students::{StudentListResponse, StudentResponse, StudentStatsResponse, StudentStatus};
    use crate::test_utils::*;
    use axum::http::StatusCode;
    use serde_json::{Value, json};

    #[test_log::test(tokio::test)]
    async fn test_list_students_newest_first() {
        let (app, _dir) = create_test_app().await;
        let auth = add_auth_headers(&teacher_token(&app).await);

        let response = app.get("/api/students").add_header(&auth.0, &auth.1).await;

        response.assert_status_ok();
        let body: StudentListResponse = response.json();
        assert_eq!(body.total, 4);
        assert_eq!((body.page, body.limit, body.total_pages), (1, 10, 1));
        let names: Vec<_> = body.students.iter().map(|s| s.full_name.as_str()).collect();
        assert_eq!(names, ["Sarah Williams", "Mike Johnson", "Jane Smith", "John Doe"]);

        let raw: Value = response.json();
        assert_eq!(raw["totalPages"], 1);
    }

    #[test_log::test(tokio::test)]
    async fn test_list_students_filters_and_pages() {
        let (app, _dir) = create_test_app().await;
        let auth = add_auth_headers(&teacher_token(&app).await);

        let body: StudentListResponse = app
            .get("/api/students?class=10A")
            .add_header(&auth.0, &auth.1)
            .await
            .json();
        assert_eq!(body.total, 2);
        assert!(body.students.iter().all(|s| s.class == "10A"));

        let body: StudentListResponse = app
            .get("/api/students?class_in=10A,%2010B&status=inactive")
            .add_header(&auth.0, &auth.1)
            .await
            .json();
        assert_eq!(body.total, 1);
        assert_eq!(body.students[0].full_name, "Sarah Williams");

        let body: StudentListResponse = app
            .get("/api/students?page=2&limit=3")
            .add_header(&auth.0, &auth.1)
            .await
            .json();
        assert_eq!((body.total, body.total_pages), (4, 2));
        assert_eq!(body.students.len(), 1);
        assert_eq!(body.students[0].full_name, "John Doe");
    }

    #[test_log::test(tokio::test)]
    async fn test_student_stats() {
        let (app, _dir) = create_test_app().await;
        let auth = add_auth_headers(&teacher_token(&app).await);

        let response = app.get("/api/students/stats").add_header(&auth.0, &auth.1).await;

        response.assert_status_ok();
        let stats: StudentStatsResponse = response.json();
        assert_eq!(stats.total_students, 4);
        let classes: Vec<_> = stats.class_stats.iter().map(|c| (c.class.as_str(), c.count)).collect();
        assert_eq!(classes, [("10A", 2), ("10B", 2)]);
        assert_eq!(stats.gender_stats.len(), 1);
        assert_eq!(stats.gender_stats[0].gender, None);
        assert_eq!(stats.gender_stats[0].count, 4);
    }

    #[test_log::test(tokio::test)]
    async fn test_create_get_update_delete_student() {
        let (app, _dir) = create_test_app().await;
        let auth = add_auth_headers(&teacher_token(&app).await);

        let response = app
            .post("/api/students")
            .add_header(&auth.0, &auth.1)
            .json(&json!({
                "full_name": "  Aisha Rahman ",
                "date_of_birth": "2006-04-02",
                "class": "9C",
                "status": "active",
                "sports_house": "green",
                "cca": "silat",
                "gender": "female",
                "quran_teacher": ""
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let created: StudentResponse = response.json();
        assert_eq!(created.full_name, "Aisha Rahman");
        assert_eq!(created.status, StudentStatus::Active);
        assert_eq!(created.quran_teacher, None);
        let raw: Value = response.json();
        assert_eq!(raw["cca_optional"], "none");
        assert_eq!(raw["date_of_birth"], "2006-04-02");

        let fetched: StudentResponse = app
            .get(&format!("/api/students/{}", created.id))
            .add_header(&auth.0, &auth.1)
            .await
            .json();
        assert_eq!(fetched.full_name, created.full_name);
        assert_eq!(fetched.date_of_birth, created.date_of_birth);

        let response = app
            .put(&format!("/api/students/{}", created.id))
            .add_header(&auth.0, &auth.1)
            .json(&json!({"status": "graduated", "sports_house": null, "cca_optional": "swimming"}))
            .await;
        response.assert_status_ok();
        let updated: StudentResponse = response.json();
        assert_eq!(updated.status, StudentStatus::Graduated);
        assert_eq!(updated.sports_house, None);
        assert_eq!(updated.full_name, "Aisha Rahman");
        let raw: Value = response.json();
        assert_eq!(raw["cca"], "silat");
        assert_eq!(raw["cca_optional"], "swimming");

        let response = app
            .delete(&format!("/api/students/{}", created.id))
            .add_header(&auth.0, &auth.1)
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["message"], "Student deleted successfully");

        let response = app
            .get(&format!("/api/students/{}", created.id))
            .add_header(&auth.0, &auth.1)
            .await;
        response.assert_status_not_found();
        let body: Value = response.json();
        assert_eq!(body["error"], "Student not found");
    }

    #[test_log::test(tokio::test)]
    async fn test_create_student_reports_every_invalid_field() {
        let (app, _dir) = create_test_app().await;
        let auth = add_auth_headers(&admin_token(&app).await);

        let response = app
            .post("/api/students")
            .add_header(&auth.0, &auth.1)
            .json(&json!({"date_of_birth": "not-a-date", "status": "expelled", "sports_house": "red"}))
            .await;

        response.assert_status_bad_request();
        let body: Value = response.json();
        let errors: Vec<(String, String)> = body["errors"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| (e["field"].as_str().unwrap().to_string(), e["message"].as_str().unwrap().to_string()))
            .collect();
        assert!(errors.contains(&("full_name".into(), "Full name is required".into())));
        assert!(errors.contains(&("date_of_birth".into(), "Valid date of birth is required".into())));
        assert!(errors.contains(&("class".into(), "Class is required".into())));
        assert!(errors.contains(&("status".into(), "Invalid status".into())));
        assert!(errors.contains(&("sports_house".into(), "Invalid sports house".into())));
    }

    #[test_log::test(tokio::test)]
    async fn test_create_student_requires_status() {
        let (app, _dir) = create_test_app().await;
        let auth = add_auth_headers(&teacher_token(&app).await);

        let response = app
            .post("/api/students")
            .add_header(&auth.0, &auth.1)
            .json(&json!({"full_name": "Omar Hadi", "date_of_birth": "2006-01-09", "class": "9C"}))
            .await;

        response.assert_status_bad_request();
        let body: Value = response.json();
        assert_eq!(body["errors"], json!([{"field": "status", "message": "Invalid status"}]));

        let list: StudentListResponse = app.get("/api/students").add_header(&auth.0, &auth.1).await.json();
        assert_eq!(list.total, 4);
    }

    #[test_log::test(tokio::test)]
    async fn test_student_text_fields_fit_their_columns() {
        let (app, _dir) = create_test_app().await;
        let auth = add_auth_headers(&teacher_token(&app).await);

        let response = app
            .post("/api/students")
            .add_header(&auth.0, &auth.1)
            .json(&json!({
                "full_name": "a".repeat(256),
                "date_of_birth": "2006-01-09",
                "class": "c".repeat(21),
                "status": "active",
                "quran_teacher": "q".repeat(256)
            }))
            .await;
        response.assert_status_bad_request();
        let body: Value = response.json();
        assert_eq!(
            body["errors"],
            json!([
                {"field": "full_name", "message": "Full name must be at most 255 characters"},
                {"field": "class", "message": "Class must be at most 20 characters"},
                {"field": "quran_teacher", "message": "Quran teacher must be at most 255 characters"},
            ])
        );

        let response = app
            .put("/api/students/1")
            .add_header(&auth.0, &auth.1)
            .json(&json!({"class": "c".repeat(21)}))
            .await;
        response.assert_status_bad_request();
        let body: Value = response.json();
        assert_eq!(body["errors"][0]["message"], "Class must be at most 20 characters");

        // At the limit is fine
        let response = app
            .put("/api/students/1")
            .add_header(&auth.0, &auth.1)
            .json(&json!({"class": "c".repeat(20)}))
            .await;
        response.assert_status_ok();
    }

    #[test_log::test(tokio::test)]
    async fn test_malformed_path_and_query_return_json_errors() {
        let (app, _dir) = create_test_app().await;
        let auth = add_auth_headers(&teacher_token(&app).await);

        for url in [
            "/api/students/abc",
            "/api/students?status=bogus",
            "/api/students?page=x",
            "/api/students/1/terms?term=x",
        ] {
            let response = app.get(url).add_header(&auth.0, &auth.1).await;
            response.assert_status_bad_request();
            let body: Value = response.json();
            assert!(body["error"].is_string(), "{url}: {body}");
        }

        let response = app
            .delete("/api/students/abc")
            .add_header(&auth.0, &auth.1)
            .await;
        response.assert_status_bad_request();
        let body: Value = response.json();
        assert!(body["error"].as_str().unwrap().contains("abc"));
    }

    #[test_log::test(tokio::test)]
    async fn test_update_student_edge_cases() {
        let (app, _dir) = create_test_app().await;
        let auth = add_auth_headers(&teacher_token(&app).await);

        let response = app.put("/api/students/1").add_header(&auth.0, &auth.1).json(&json!({})).await;
        response.assert_status_bad_request();
        let body: Value = response.json();
        assert_eq!(body["error"], "No valid fields to update");

        let response = app
            .put("/api/students/1")
            .add_header(&auth.0, &auth.1)
            .json(&json!({"full_name": "   "}))
            .await;
        response.assert_status_bad_request();
        let body: Value = response.json();
        assert_eq!(body["errors"][0]["message"], "Full name cannot be empty");

        let response = app
            .put("/api/students/999")
            .add_header(&auth.0, &auth.1)
            .json(&json!({"class": "11A"}))
            .await;
        response.assert_status_not_found();
    }

    #[test_log::test(tokio::test)]
    async fn test_delete_student_removes_terms() {
        let (app, _dir) = create_test_app().await;
        let auth = add_auth_headers(&admin_token(&app).await);

        app.delete("/api/students/1").add_header(&auth.0, &auth.1).await.assert_status_ok();

        let terms: Vec<Value> = app.get("/api/students/1/terms").add_header(&auth.0, &auth.1).await.json();
        assert!(terms.is_empty());

        app.delete("/api/students/1")
            .add_header(&auth.0, &auth.1)
            .await
            .assert_status_not_found();
    }

    #[test_log::test(tokio::test)]
    async fn test_reading_students_requires_token() {
        let (app, _dir) = create_test_app().await;

        app.get("/api/students").await.assert_status_unauthorized();
        app.post("/api/students")
            .json(&json!({"full_name": "X", "date_of_birth": "2005-01-01", "class": "1A"}))
            .await
            .assert_status_unauthorized();
    }
}
