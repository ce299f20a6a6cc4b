use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use chrono::Utc;

use super::not_found_as;
use crate::{
    AppState,
    api::{
        models::{
            announcements::Priority,
            auth::MessageResponse,
            events::{EventCreate, EventResponse, EventUpdate},
            users::CurrentUser,
        },
        validation::{JsonBody, PathParam, TEXT_MAX, Validator, blank_to_none, parse_date, parse_enum, parse_time},
    },
    auth::permissions::{AdminUser, RequiresRole},
    db::models::events::{EventCreateDBRequest, EventFilter, EventUpdateDBRequest},
    errors::{Error, Result},
    types::EventId,
};

fn event_not_found(id: EventId) -> Error {
    Error::NotFound {
        resource: "Event".to_string(),
        id: id.to_string(),
    }
}

/// Upcoming active events, soonest first
#[utoipa::path(
    get,
    path = "/events",
    tag = "events",
    summary = "List upcoming events",
    responses(
        (status = 200, description = "Upcoming events", body = [EventResponse]),
        (status = 401, description = "Missing token"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_events(State(state): State<AppState>, _: CurrentUser) -> Result<Json<Vec<EventResponse>>> {
    let filter = EventFilter::upcoming(Utc::now().date_naive(), state.config.events.upcoming_limit);
    let mut conn = state.db.acquire().await?;
    let events = conn.events().list(&filter).await?;
    Ok(Json(events.into_iter().map(EventResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/events/{id}",
    tag = "events",
    summary = "Get event",
    params(("id" = i32, Path, description = "Event ID")),
    responses(
        (status = 200, description = "Event", body = EventResponse),
        (status = 404, description = "Event not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all, fields(event_id = id))]
pub async fn get_event(State(state): State<AppState>, PathParam(id): PathParam<EventId>, _: CurrentUser) -> Result<Json<EventResponse>> {
    let mut conn = state.db.acquire().await?;
    let event = conn.events().get_by_id(id).await?.ok_or_else(|| event_not_found(id))?;
    Ok(Json(EventResponse::from(event)))
}

#[utoipa::path(
    post,
    path = "/events",
    tag = "events",
    summary = "Create event",
    request_body = EventCreate,
    responses(
        (status = 201, description = "Event created", body = EventResponse),
        (status = 400, description = "Invalid fields", body = crate::errors::ValidationErrorResponse),
        (status = 403, description = "Requires admin role"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_event(
    State(state): State<AppState>,
    RequiresRole(current_user, _): AdminUser,
    JsonBody(body): JsonBody<EventCreate>,
) -> Result<(StatusCode, Json<EventResponse>)> {
    let mut v = Validator::new();
    let title = v.required("title", body.title.as_deref(), "Title is required");
    v.max_chars("title", body.title.as_deref(), TEXT_MAX, "Title");
    v.max_chars("location", body.location.as_deref(), TEXT_MAX, "Location");
    let event_date = v.parse_required("event_date", body.event_date.as_deref(), parse_date, "Valid event date is required");
    let event_time = v.parse_optional("event_time", body.event_time.as_deref(), parse_time, "Invalid event time");
    let priority = v.parse_optional("priority", body.priority.as_deref(), parse_enum::<Priority>, "Invalid priority");
    v.finish()?;

    let request = EventCreateDBRequest {
        title: title.unwrap_or_default(),
        description: blank_to_none(body.description),
        event_date: event_date.unwrap_or_default(),
        event_time,
        location: blank_to_none(body.location),
        priority: priority.unwrap_or_default(),
        created_by: current_user.id,
    };

    let mut conn = state.db.acquire().await?;
    let event = conn.events().create(&request).await?;
    tracing::info!(event_id = event.id, event_date = %event.event_date, "Event created");

    Ok((StatusCode::CREATED, Json(EventResponse::from(event))))
}

/// Partially update an event. `description`, `event_time` and `location` accept `null` to clear.
#[utoipa::path(
    put,
    path = "/events/{id}",
    tag = "events",
    summary = "Update event",
    params(("id" = i32, Path, description = "Event ID")),
    request_body = EventUpdate,
    responses(
        (status = 200, description = "Event updated", body = EventResponse),
        (status = 400, description = "Invalid fields, or nothing to update"),
        (status = 403, description = "Requires admin role"),
        (status = 404, description = "Event not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all, fields(event_id = id))]
pub async fn update_event(
    State(state): State<AppState>,
    PathParam(id): PathParam<EventId>,
    _: AdminUser,
    JsonBody(body): JsonBody<EventUpdate>,
) -> Result<Json<EventResponse>> {
    let mut v = Validator::new();
    v.max_chars("title", body.title.as_deref(), TEXT_MAX, "Title");
    v.max_chars("location", body.location.as_ref().and_then(Option::as_deref), TEXT_MAX, "Location");
    let request = EventUpdateDBRequest {
        title: v.not_blank("title", body.title.as_deref(), "Title cannot be empty"),
        description: body.description.map(blank_to_none),
        event_date: v.parse_optional("event_date", body.event_date.as_deref(), parse_date, "Invalid event date"),
        event_time: v.parse_clearable("event_time", body.event_time.as_ref().map(Option::as_deref), parse_time, "Invalid event time"),
        location: body.location.map(blank_to_none),
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
    let event = conn.events().update(id, &request).await.map_err(not_found_as("Event", id))?;

    Ok(Json(EventResponse::from(event)))
}

#[utoipa::path(
    delete,
    path = "/events/{id}",
    tag = "events",
    summary = "Delete event",
    params(("id" = i32, Path, description = "Event ID")),
    responses(
        (status = 200, description = "Event deleted", body = MessageResponse),
        (status = 403, description = "Requires admin role"),
        (status = 404, description = "Event not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all, fields(event_id = id))]
pub async fn delete_event(State(state): State<AppState>, PathParam(id): PathParam<EventId>, _: AdminUser) -> Result<Json<MessageResponse>> {
    let mut conn = state.db.acquire().await?;
    if !conn.events().delete(id).await? {
        return Err(event_not_found(id));
    }
    Ok(Json(MessageResponse::new("Event deleted successfully")))
}
