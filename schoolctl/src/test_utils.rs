//! Helpers for handler tests: an in-memory app with demo data and logged-in tokens.

use crate::{
    Application,
    api::models::auth::LoginResponse,
    config::{AuthConfig, Config, DatabaseConfig, PasswordConfig},
};
use axum_test::TestServer;
use serde_json::json;
use tempfile::TempDir;

/// In-memory store with demo data and argon2 parameters cheap enough for tests.
pub fn create_test_config() -> Config {
    Config {
        database: DatabaseConfig::Memory { seed_demo_data: true },
        secret_key: Some("test-secret-key".to_string()),
        auth: AuthConfig {
            password: PasswordConfig {
                argon2_memory_kib: 128,
                argon2_iterations: 1,
                argon2_parallelism: 1,
                ..Default::default()
            },
            ..Default::default()
        },
        ..Default::default()
    }
}

pub async fn create_test_app() -> (TestServer, TempDir) {
    create_test_app_with_config(create_test_config()).await
}

/// Build a test server from `config`, with uploads going to a fresh temporary directory.
/// Keep the returned directory alive for as long as the server is used.
pub async fn create_test_app_with_config(mut config: Config) -> (TestServer, TempDir) {
    let dir = tempfile::tempdir().expect("Failed to create upload directory");
    config.uploads.directory = dir.path().to_path_buf();

    let app = Application::new(config).await.expect("Failed to create application");
    (app.into_test_server(), dir)
}

/// `Authorization` header for a bearer token, as a (name, value) pair for `add_header`.
pub fn add_auth_headers(token: &str) -> (String, String) {
    ("authorization".to_string(), format!("Bearer {token}"))
}

pub async fn login(app: &TestServer, username: &str, password: &str) -> LoginResponse {
    let response = app
        .post("/api/auth/login")
        .json(&json!({"username": username, "password": password}))
        .await;
    response.assert_status_ok();
    response.json()
}

pub async fn admin_token(app: &TestServer) -> String {
    login(app, "admin", "password").await.token
}

pub async fn teacher_token(app: &TestServer) -> String {
    login(app, "teacher1", "password").await.token
}
