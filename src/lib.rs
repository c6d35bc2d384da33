//! # storefront: an e-commerce backend
//!
//! `storefront` is a REST backend for a small web shop. It manages a product
//! catalog organized into collections, customer profiles, orders with
//! price-capturing line items, product reviews and images, and a background
//! job dispatcher used for customer email notifications.
//!
//! ## Architecture
//!
//! The application is built on [Axum](https://github.com/tokio-rs/axum) for
//! the HTTP layer and uses PostgreSQL for all persistence.
//!
//! The **API layer** ([`api`]) exposes the resource API under `/store/*`,
//! authentication under `/auth/*`, and job inspection under `/jobs`. Handlers
//! validate input, check permissions, and delegate to repositories.
//!
//! The **authentication layer** ([`auth`]) resolves the caller's identity
//! from a JWT session cookie (native login) or a trusted proxy header (SSO
//! deployments), and enforces role checks via typed permission extractors.
//!
//! The **database layer** ([`db`]) uses the repository pattern: each entity
//! has a repository wrapping a connection that handles its queries. Deletes
//! of referenced rows are rejected inside the repositories so order history
//! is never silently destroyed.
//!
//! **Background services** run alongside the HTTP server: a job worker polls
//! the `jobs` table for due work (claimed with `FOR UPDATE SKIP LOCKED`) and
//! a scheduler enqueues recurring jobs from config.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use storefront::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = storefront::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     storefront::telemetry::init_tracing();
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     })
//!     .await?;
//!
//!     Ok(())
//! }
//! ```

use axum::{
    Router,
    routing::{delete, get, patch, post, put},
};
use bon::Builder;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{Level, info, instrument};
use utoipa::OpenApi as _;
use utoipa_scalar::{Scalar, Servable as _};

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod email;
pub mod errors;
pub mod jobs;
pub mod openapi;
pub mod telemetry;
#[cfg(test)]
pub mod test_utils;
pub mod types;

pub use config::Config;

use crate::{
    auth::password,
    db::handlers::{Repository as _, Users},
    db::models::users::UserCreateDBRequest,
    email::EmailService,
    errors::Error,
    jobs::{JobQueue, JobWorker},
    types::UserId,
};

/// Shared state available to all request handlers.
#[derive(Clone, Builder)]
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
    pub job_queue: JobQueue,
}

/// Get the storefront database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Create the initial staff user if it doesn't exist.
///
/// Idempotent: creates the user on first startup, updates the password on
/// subsequent startups when one is configured.
#[instrument(skip_all)]
pub async fn create_initial_admin_user(email: &str, password: Option<&str>, db: &PgPool) -> Result<UserId, Error> {
    let password_hash = match password {
        Some(pwd) => Some(password::hash_string(pwd)?),
        None => None,
    };

    let mut tx = db.begin().await.map_err(db::errors::DbError::from)?;
    let mut user_repo = Users::new(&mut tx);

    if let Some(existing_user) = user_repo.get_user_by_email(email).await? {
        if let Some(password_hash) = password_hash {
            sqlx::query("UPDATE users SET password_hash = $1, updated_at = NOW() WHERE email = $2")
                .bind(password_hash)
                .bind(email)
                .execute(&mut *tx)
                .await
                .map_err(db::errors::DbError::from)?;
        }
        tx.commit().await.map_err(db::errors::DbError::from)?;
        return Ok(existing_user.id);
    }

    let created_user = user_repo
        .create(&UserCreateDBRequest {
            username: email.to_string(),
            email: email.to_string(),
            is_staff: true,
            auth_source: "system".to_string(),
            password_hash,
        })
        .await?;

    tx.commit().await.map_err(db::errors::DbError::from)?;
    info!(email, "Created initial staff user");
    Ok(created_user.id)
}

/// Seed the database with the bundled demo catalog (run only once).
///
/// Skips seeding when any collection already exists, so re-running with
/// `--seed` never clobbers real data.
#[instrument(skip_all)]
pub async fn seed_database(db: &PgPool) -> anyhow::Result<()> {
    let collections: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM collections").fetch_one(db).await?;
    if collections > 0 {
        info!("Database already contains data, skipping seed");
        return Ok(());
    }

    const SEED_SQL: &str = include_str!("../seed.sql");

    let mut tx = db.begin().await?;
    for statement in SEED_SQL.split(';') {
        let statement = statement.trim();
        if statement.is_empty() {
            continue;
        }
        sqlx::query(statement).execute(&mut *tx).await?;
    }
    tx.commit().await?;

    info!("Seeded database with demo catalog");
    Ok(())
}

/// Connect to PostgreSQL, run migrations, and bootstrap the admin user.
#[instrument(skip_all)]
async fn setup_database(config: &Config) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect(&config.database.url)
        .await?;

    migrator().run(&pool).await?;

    create_initial_admin_user(&config.admin_email, config.admin_password.as_deref(), &pool).await?;

    Ok(pool)
}

/// Build the full application router.
pub fn build_router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/auth/login", post(api::handlers::auth::login))
        .route("/auth/logout", post(api::handlers::auth::logout))
        .route("/auth/me", get(api::handlers::auth::me));

    let store_routes = Router::new()
        .route(
            "/collections",
            get(api::handlers::collections::list_collections).post(api::handlers::collections::create_collection),
        )
        .route("/collections/{id}", get(api::handlers::collections::get_collection))
        .route("/collections/{id}", patch(api::handlers::collections::update_collection))
        .route("/collections/{id}", delete(api::handlers::collections::delete_collection))
        .route(
            "/products",
            get(api::handlers::products::list_products).post(api::handlers::products::create_product),
        )
        .route("/products/{id}", get(api::handlers::products::get_product))
        .route("/products/{id}", patch(api::handlers::products::update_product))
        .route("/products/{id}", delete(api::handlers::products::delete_product))
        .route(
            "/products/{id}/reviews",
            get(api::handlers::products::list_reviews).post(api::handlers::products::create_review),
        )
        .route(
            "/products/{id}/images",
            get(api::handlers::products::list_product_images).post(api::handlers::products::create_product_image),
        )
        .route(
            "/customers",
            get(api::handlers::customers::list_customers).post(api::handlers::customers::create_customer),
        )
        .route("/customers/me", get(api::handlers::customers::get_own_customer))
        .route("/customers/me", put(api::handlers::customers::update_own_customer))
        .route("/customers/{id}", get(api::handlers::customers::get_customer))
        .route("/customers/{id}", patch(api::handlers::customers::update_customer))
        .route("/customers/{id}", delete(api::handlers::customers::delete_customer))
        .route("/orders", get(api::handlers::orders::list_orders).post(api::handlers::orders::create_order))
        .route("/orders/{id}", get(api::handlers::orders::get_order))
        .route("/orders/{id}", patch(api::handlers::orders::update_order))
        .route("/orders/{id}", delete(api::handlers::orders::delete_order));

    let job_routes = Router::new()
        .route("/jobs", get(api::handlers::jobs::list_jobs).post(api::handlers::jobs::create_job))
        .route("/jobs/{id}", get(api::handlers::jobs::get_job));

    Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .merge(auth_routes)
        .merge(job_routes)
        .nest("/store", store_routes)
        .merge(Scalar::with_url("/docs", openapi::ApiDoc::openapi()))
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

/// Background tasks running alongside the HTTP server.
///
/// Holds the job worker task and its shutdown token. Dropping the guard
/// cancels the token, so tasks stop when the owner goes away.
pub struct BackgroundServices {
    background_tasks: Vec<tokio::task::JoinHandle<()>>,
    shutdown_token: tokio_util::sync::CancellationToken,
    pub drop_guard: Option<tokio_util::sync::DropGuard>,
}

impl BackgroundServices {
    /// Gracefully shut down all background tasks
    pub async fn shutdown(mut self) {
        self.shutdown_token.cancel();
        // Disarm the drop guard, the token is already cancelled
        self.drop_guard.take();

        for handle in self.background_tasks {
            if let Err(e) = handle.await {
                tracing::warn!("Background task panicked during shutdown: {e}");
            }
        }
    }
}

fn setup_background_services(pool: PgPool, config: &Config) -> anyhow::Result<BackgroundServices> {
    let shutdown_token = tokio_util::sync::CancellationToken::new();
    let mut background_tasks = Vec::new();

    if config.jobs.enabled {
        let email = Arc::new(EmailService::new(config)?);
        let worker = JobWorker::new(pool, config.jobs.clone(), email);
        let token = shutdown_token.clone();
        background_tasks.push(tokio::spawn(async move {
            worker.run(token).await;
        }));
        info!("Started background job worker");
    }

    Ok(BackgroundServices {
        background_tasks,
        drop_guard: Some(shutdown_token.clone().drop_guard()),
        shutdown_token,
    })
}

/// The assembled application: router, state, and background services.
pub struct Application {
    router: Router,
    config: Config,
    pool: PgPool,
    bg_services: BackgroundServices,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let pool = setup_database(&config).await?;
        Self::with_pool(config, pool)
    }

    /// Create an application on an existing pool (used by tests and tooling).
    pub fn with_pool(config: Config, pool: PgPool) -> anyhow::Result<Self> {
        let bg_services = setup_background_services(pool.clone(), &config)?;

        let job_queue = JobQueue::new(pool.clone(), config.jobs.max_attempts);
        let state = AppState::builder().db(pool.clone()).config(config.clone()).job_queue(job_queue).build();
        let router = build_router(state);

        Ok(Self {
            router,
            config,
            pool,
            bg_services,
        })
    }

    /// Seed the demo catalog into the application's database.
    pub async fn seed(&self) -> anyhow::Result<()> {
        seed_database(&self.pool).await
    }

    /// Start serving the application until `shutdown` resolves.
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!("Storefront listening on http://{bind_addr}");

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        self.bg_services.shutdown().await;

        info!("Closing database connections...");
        self.pool.close().await;

        Ok(())
    }
}
