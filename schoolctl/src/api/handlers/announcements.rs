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
            announcements::{AnnouncementCreate, AnnouncementResponse, AnnouncementUpdate, Priority},
            auth::MessageResponse,
            users::CurrentUser,
        },
        validation::{JsonBody, PathParam, TEXT_MAX, Validator, parse_enum},
    },
    auth::permissions::{AdminUser, RequiresRole},
    db::models::announcements::{AnnouncementCreateDBRequest, AnnouncementFilter, AnnouncementUpdateDBRequest},
    errors::{Error, Result},
    types::AnnouncementId,
};

fn announcement_not_found(id: AnnouncementId) -> Error {
    Error::NotFound {
        resource: "Announcement".to_string(),
        id: id.to_string(),
    }
}

/// Active announcements, most urgent first, then newest
#[utoipa::path(
    get,
    path = "/announcements",
    tag = "announcements",
    summary = "List announcements",
    responses(
        (status = 200, description = "Active announcements", body = [AnnouncementResponse]),
        (status = 401, description = "Missing token"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_announcements(State(state): State<AppState>, _: CurrentUser) -> Result<Json<Vec<AnnouncementResponse>>> {
    let mut conn = state.db.acquire().await?;
    let announcements = conn.announcements().list(&AnnouncementFilter::default()).await?;
    tracing::debug!(count = announcements.len(), "Fetched announcements");
    Ok(Json(announcements.into_iter().map(AnnouncementResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/announcements/{id}",
    tag = "announcements",
    summary = "Get announcement",
    params(("id" = i32, Path, description = "Announcement ID")),
    responses(
        (status = 200, description = "Announcement", body = AnnouncementResponse),
        (status = 404, description = "Announcement not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all, fields(announcement_id = id))]
pub async fn get_announcement(
    State(state): State<AppState>,
    PathParam(id): PathParam<AnnouncementId>,
    _: CurrentUser,
) -> Result<Json<AnnouncementResponse>> {
    let mut conn = state.db.acquire().await?;
    let announcement = conn
        .announcements()
        .get_by_id(id)
        .await?
        .ok_or_else(|| announcement_not_found(id))?;
    Ok(Json(AnnouncementResponse::from(announcement)))
}

#[utoipa::path(
    post,
    path = "/announcements",
    tag = "announcements",
    summary = "Create announcement",
    request_body = AnnouncementCreate,
    responses(
        (status = 201, description = "Announcement created", body = AnnouncementResponse),
        (status = 400, description = "Invalid fields", body = crate::errors::ValidationErrorResponse),
        (status = 403, description = "Requires admin role"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_announcement(
    State(state): State<AppState>,
    RequiresRole(current_user, _): AdminUser,
    JsonBody(body): JsonBody<AnnouncementCreate>,
) -> Result<(StatusCode, Json<AnnouncementResponse>)> {
    let mut v = Validator::new();
    let title = v.required("title", body.title.as_deref(), "Title is required");
    v.max_chars("title", body.title.as_deref(), TEXT_MAX, "Title");
    let content = v.required("content", body.content.as_deref(), "Content is required");
    let priority = v.parse_optional("priority", body.priority.as_deref(), parse_enum::<Priority>, "Invalid priority");
    v.finish()?;

    let request = AnnouncementCreateDBRequest {
        title: title.unwrap_or_default(),
        content: content.unwrap_or_default(),
        priority: priority.unwrap_or_default(),
        created_by: current_user.id,
    };

    let mut conn = state.db.acquire().await?;
    let announcement = conn.announcements().create(&request).await?;
    tracing::info!(announcement_id = announcement.id, priority = ?announcement.priority, "Announcement created");

    Ok((StatusCode::CREATED, Json(AnnouncementResponse::from(announcement))))
}

/// Partially update an announcement. Setting `is_active` to false hides it from the board.
#[utoipa::path(
    put,
    path = "/announcements/{id}",
    tag = "announcements",
    summary = "Update announcement",
    params(("id" = i32, Path, description = "Announcement ID")),
    request_body = AnnouncementUpdate,
    responses(
        (status = 200, description = "Announcement updated", body = AnnouncementResponse),
        (status = 400, description = "Invalid fields, or nothing to update"),
        (status = 403, description = "Requires admin role"),
        (status = 404, description = "Announcement not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all, fields(announcement_id = id))]
pub async fn update_announcement(
    State(state): State<AppState>,
    PathParam(id): PathParam<AnnouncementId>,
    _: AdminUser,
    JsonBody(body): JsonBody<AnnouncementUpdate>,
) -> Result<Json<AnnouncementResponse>> {
    let mut v = Validator::new();
    v.max_chars("title", body.title.as_deref(), TEXT_MAX, "Title");
    let request = AnnouncementUpdateDBRequest {
        title: v.not_blank("title", body.title.as_deref(), "Title cannot be empty"),
        content: v.not_blank("content", body.content.as_deref(), "Content cannot be empty"),
        priority: v.parse_optional("priority", body.priority.as_deref(), parse_enum::<Priority>, "Invalid priority"),
        is_active: body.is_active,
    };
    v.finish()?;

    if request.is_empty() {
        return Err(Error::BadRequest {
            message: "No valid fields to update".to_string(),
        });
    }

    let mut conn = state.db.acquire().await?;
    let announcement = conn
        .announcements()
        .update(id, &request)
        .await
        .map_err(not_found_as("Announcement", id))?;

    Ok(Json(AnnouncementResponse::from(announcement)))
}

#[utoipa::path(
    delete,
    path = "/announcements/{id}",
    tag = "announcements",
    summary = "Delete announcement",
    params(("id" = i32, Path, description = "Announcement ID")),
    responses(
        (status = 200, description = "Announcement deleted", body = MessageResponse),
        (status = 403, description = "Requires admin role"),
        (status = 404, description = "Announcement not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all, fields(announcement_id = id))]
pub async fn delete_announcement(
    State(state): State<AppState>,
    PathParam(id): PathParam<AnnouncementId>,
    _: AdminUser,
) -> Result<Json<MessageResponse>> {
    let mut conn = state.db.acquire().await?;
    if !conn.announcements().delete(id).await? {
        return Err(announcement_not_found(id));
    }
    Ok(Json(MessageResponse::new("Announcement deleted successfully")))
}

#[cfg(test)]
mod tests {
    use crate::api::models::announcements::{AnnouncementResponse, Priority};
    use crate::test_utils::*;
    use axum::http::StatusCode;
    use serde_json::{Value, json};

    #[test_log::test(tokio::test)]
    async fn test_board_orders_by_priority_then_recency() {
        let (app, _dir) = create_test_app().await;
        let admin = add_auth_headers(&admin_token(&app).await);
        let teacher = add_auth_headers(&teacher_token(&app).await);

        for (title, priority) in [("Canteen menu", "low"), ("Sports day", "high"), ("Fire drill", "urgent"), ("Library hours", "high")] {
            app.post("/api/announcements")
                .add_header(&admin.0, &admin.1)
                .json(&json!({"title": title, "content": "Details inside", "priority": priority}))
                .await
                .assert_status(StatusCode::CREATED);
        }

        let board: Vec<AnnouncementResponse> = app.get("/api/announcements").add_header(&teacher.0, &teacher.1).await.json();
        let titles: Vec<_> = board.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, ["Fire drill", "Library hours", "Sports day", "Canteen menu"]);
        assert!(board.iter().all(|a| a.created_by_name.as_deref() == Some("admin")));
    }

    #[test_log::test(tokio::test)]
    async fn test_create_defaults_and_validation() {
        let (app, _dir) = create_test_app().await;
        let admin = add_auth_headers(&admin_token(&app).await);

        let response = app
            .post("/api/announcements")
            .add_header(&admin.0, &admin.1)
            .json(&json!({"title": "PTA meeting", "content": "Thursday 7pm"}))
            .await;
        response.assert_status(StatusCode::CREATED);
        let created: AnnouncementResponse = response.json();
        assert_eq!(created.priority, Priority::Normal);
        assert!(created.is_active);

        let response = app
            .post("/api/announcements")
            .add_header(&admin.0, &admin.1)
            .json(&json!({"title": "", "priority": "critical"}))
            .await;
        response.assert_status_bad_request();
        let body: Value = response.json();
        let messages: Vec<_> = body["errors"].as_array().unwrap().iter().map(|e| e["message"].as_str().unwrap()).collect();
        assert_eq!(messages, ["Title is required", "Content is required", "Invalid priority"]);

        let response = app
            .put(&format!("/api/announcements/{}", created.id))
            .add_header(&admin.0, &admin.1)
            .json(&json!({"title": "t".repeat(256)}))
            .await;
        response.assert_status_bad_request();
        let body: Value = response.json();
        assert_eq!(body["errors"][0]["message"], "Title must be at most 255 characters");
    }

    #[test_log::test(tokio::test)]
    async fn test_deactivated_announcements_leave_the_board() {
        let (app, _dir) = create_test_app().await;
        let admin = add_auth_headers(&admin_token(&app).await);

        let created: AnnouncementResponse = app
            .post("/api/announcements")
            .add_header(&admin.0, &admin.1)
            .json(&json!({"title": "Exam timetable", "content": "Posted"}))
            .await
            .json();

        let response = app
            .put(&format!("/api/announcements/{}", created.id))
            .add_header(&admin.0, &admin.1)
            .json(&json!({"is_active": false, "priority": "high"}))
            .await;
        response.assert_status_ok();
        let updated: AnnouncementResponse = response.json();
        assert!(!updated.is_active);
        assert_eq!(updated.priority, Priority::High);
        assert_eq!(updated.title, "Exam timetable");

        let board: Vec<AnnouncementResponse> = app.get("/api/announcements").add_header(&admin.0, &admin.1).await.json();
        assert!(board.is_empty());

        // Still reachable directly
        app.get(&format!("/api/announcements/{}", created.id))
            .add_header(&admin.0, &admin.1)
            .await
            .assert_status_ok();
    }

    #[test_log::test(tokio::test)]
    async fn test_teachers_cannot_manage_announcements() {
        let (app, _dir) = create_test_app().await;
        let teacher = add_auth_headers(&teacher_token(&app).await);

        let response = app
            .post("/api/announcements")
            .add_header(&teacher.0, &teacher.1)
            .json(&json!({"title": "Hi", "content": "There"}))
            .await;
        response.assert_status_forbidden();
        let body: Value = response.json();
        assert_eq!(body["error"], "Insufficient permissions");

        app.delete("/api/announcements/1")
            .add_header(&teacher.0, &teacher.1)
            .await
            .assert_status_forbidden();
    }

    #[test_log::test(tokio::test)]
    async fn test_delete_announcement() {
        let (app, _dir) = create_test_app().await;
        let admin = add_auth_headers(&admin_token(&app).await);

        let created: AnnouncementResponse = app
            .post("/api/announcements")
            .add_header(&admin.0, &admin.1)
            .json(&json!({"title": "Temp", "content": "Temp"}))
            .await
            .json();

        let response = app
            .delete(&format!("/api/announcements/{}", created.id))
            .add_header(&admin.0, &admin.1)
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["message"], "Announcement deleted successfully");

        let response = app
            .get(&format!("/api/announcements/{}", created.id))
            .add_header(&admin.0, &admin.1)
            .await;
        response.assert_status_not_found();
        let body: Value = response.json();
        assert_eq!(body["error"], "Announcement not found");

        app.put(&format!("/api/announcements/{}", created.id))
            .add_header(&admin.0, &admin.1)
            .json(&json!({"title": "Back"}))
            .await
            .assert_status_not_found();
    }
}
