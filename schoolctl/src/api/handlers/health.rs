use axum::{Json, extract::State};
use chrono::Utc;

use crate::{AppState, api::models::health::HealthResponse};

/// Liveness check
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    summary = "Health check",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse),
    )
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK".to_string(),
        timestamp: Utc::now(),
        uptime: state.started_at.elapsed().as_secs_f64(),
    })
}

#[cfg(test)]
mod tests {
    use crate::api::models::health::HealthResponse;
    use crate::test_utils::*;

    #[test_log::test(tokio::test)]
    async fn test_health_needs_no_token() {
        let (app, _dir) = create_test_app().await;

        let response = app.get("/api/health").await;

        response.assert_status_ok();
        let body: HealthResponse = response.json();
        assert_eq!(body.status, "OK");
        assert!(body.uptime >= 0.0);
    }
}
