//! OpenAPI documentation for the `/api/*` surface.
//!
//! [`ApiDoc`] collects every handler's `#[utoipa::path]` annotation. The router serves the
//! document at `/api/openapi.json` and a Scalar viewer at `/api/docs`.

use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

use crate::{
    api::{handlers, models},
    errors,
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.security_schemes.insert(
                "BearerAuth".to_string(),
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some(
                            "Session token from `POST /auth/login`. Include it in the `Authorization` header:\n\n\
                            ```\nAuthorization: Bearer YOUR_TOKEN\n```",
                        ))
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "schoolctl",
        description = "School records API: students, term records, announcements, events and staff accounts."
    ),
    servers(
        (url = "/api", description = "School records API")
    ),
    modifiers(&SecurityAddon),
    paths(
        handlers::health::health,
        handlers::auth::login,
        handlers::auth::me,
        handlers::auth::logout,
        handlers::students::list_students,
        handlers::students::get_student_stats,
        handlers::students::get_student,
        handlers::students::create_student,
        handlers::students::update_student,
        handlers::students::delete_student,
        handlers::terms::list_terms,
        handlers::terms::upsert_term,
        handlers::terms::download_term_file,
        handlers::terms::delete_term,
        handlers::announcements::list_announcements,
        handlers::announcements::get_announcement,
        handlers::announcements::create_announcement,
        handlers::announcements::update_announcement,
        handlers::announcements::delete_announcement,
        handlers::events::list_events,
        handlers::events::get_event,
        handlers::events::create_event,
        handlers::events::update_event,
        handlers::events::delete_event,
        handlers::users::list_users,
        handlers::users::get_user,
        handlers::users::create_user,
        handlers::users::update_user,
        handlers::users::delete_user,
    ),
    components(
        schemas(
            errors::ErrorResponse,
            errors::ValidationErrorResponse,
            errors::FieldError,
            models::health::HealthResponse,
            models::auth::LoginRequest,
            models::auth::LoginResponse,
            models::auth::AuthUser,
            models::auth::MessageResponse,
            models::users::Role,
            models::users::UserCreate,
            models::users::UserUpdate,
            models::users::UserResponse,
            models::students::StudentStatus,
            models::students::SportsHouse,
            models::students::Cca,
            models::students::CcaOptional,
            models::students::Gender,
            models::students::StudentCreate,
            models::students::StudentUpdate,
            models::students::StudentResponse,
            models::students::StudentListResponse,
            models::students::StudentStatsResponse,
            models::students::GenderCount,
            models::students::ClassCount,
            models::terms::TermUpload,
            models::terms::TermAttachmentResponse,
            models::terms::TermResponse,
            models::announcements::Priority,
            models::announcements::AnnouncementCreate,
            models::announcements::AnnouncementUpdate,
            models::announcements::AnnouncementResponse,
            models::events::EventCreate,
            models::events::EventUpdate,
            models::events::EventResponse,
        )
    ),
    tags(
        (name = "health", description = "Liveness"),
        (name = "authentication", description = "Login and session"),
        (name = "students", description = "Student records"),
        (name = "terms", description = "Per-term academic records and attachments"),
        (name = "announcements", description = "Notice board"),
        (name = "events", description = "School calendar"),
        (name = "users", description = "Staff accounts (admin only)"),
    )
)]
pub struct ApiDoc;
