//! Shared helpers for integration tests.

use axum_test::TestServer;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    AppState,
    api::models::users::UserResponse,
    auth::password,
    config::{Config, EmailTransportConfig, ProxyHeaderAuthConfig},
    db::{
        handlers::{Repository as _, Users},
        models::users::UserCreateDBRequest,
    },
    jobs::JobQueue,
};

pub fn create_test_config() -> Config {
    // Use temp directory for test emails
    let temp_dir = std::env::temp_dir().join(format!("storefront-test-emails-{}", std::process::id()));

    let mut config = Config::default();
    config.secret_key = Some("test-secret-key-for-testing-only".to_string());
    config.auth.proxy_header = ProxyHeaderAuthConfig {
        enabled: true,
        ..Default::default()
    };
    config.email.transport = EmailTransportConfig::File {
        path: temp_dir.to_string_lossy().to_string(),
    };
    // The worker is driven by hand in tests
    config.jobs.enabled = false;
    config
}

pub fn create_test_state(pool: PgPool) -> AppState {
    let config = create_test_config();
    let job_queue = JobQueue::new(pool.clone(), config.jobs.max_attempts);
    AppState::builder().db(pool).config(config).job_queue(job_queue).build()
}

pub async fn create_test_app(pool: PgPool) -> TestServer {
    let state = create_test_state(pool);
    let router = crate::build_router(state);
    TestServer::new(router).expect("Failed to create test server")
}

async fn insert_user(pool: &PgPool, request: &UserCreateDBRequest) -> UserResponse {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    let mut users_repo = Users::new(&mut conn);
    let user = users_repo.create(request).await.expect("Failed to create test user");
    UserResponse::from(user)
}

pub async fn create_test_user(pool: &PgPool) -> UserResponse {
    let username = format!("testuser_{}", Uuid::new_v4().simple());

    insert_user(
        pool,
        &UserCreateDBRequest {
            username: username.clone(),
            email: format!("{username}@example.com"),
            is_staff: false,
            auth_source: "test".to_string(),
            password_hash: None,
        },
    )
    .await
}

pub async fn create_test_admin_user(pool: &PgPool) -> UserResponse {
    let username = format!("testadmin_{}", Uuid::new_v4().simple());

    insert_user(
        pool,
        &UserCreateDBRequest {
            username: username.clone(),
            email: format!("{username}@example.com"),
            is_staff: true,
            auth_source: "test".to_string(),
            password_hash: None,
        },
    )
    .await
}

pub async fn create_test_password_user(pool: &PgPool, username: &str, password: &str) -> UserResponse {
    let password_hash = password::hash_string(password).expect("Failed to hash test password");

    insert_user(
        pool,
        &UserCreateDBRequest {
            username: username.to_string(),
            email: format!("{username}@example.com"),
            is_staff: false,
            auth_source: "native".to_string(),
            password_hash: Some(password_hash),
        },
    )
    .await
}

/// Header pair that authenticates `user` through the test proxy header.
pub fn add_auth_headers(user: &UserResponse) -> (String, String) {
    let config = ProxyHeaderAuthConfig::default();
    (config.header_name, user.email.clone())
}
