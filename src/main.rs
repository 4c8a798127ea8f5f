//! Meeting Scheduler - Main Application Entry Point
//!
//! This is a REST API server for negotiating meetings over email. A sender
//! proposes a meeting with candidate time slots; the receiver accepts one
//! slot or declines, and an accepted request becomes a confirmed schedule.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Storage**: pluggable backend (PostgreSQL with sqlx, or in-memory)
//! - **Authentication**: opaque API key in the `X-Api-Key` header
//! - **Notifications**: fire-and-forget mail worker on a channel
//! - **Format**: JSON requests/responses
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Connect the selected storage backend (running migrations on postgres)
//! 3. Spawn the mail notification worker
//! 4. Build HTTP router with routes and middleware
//! 5. Start server on configured port

mod config;
mod db;
mod error;
mod handlers;
mod middleware;
mod models;
mod services;

use tracing_subscriber::EnvFilter;

use axum::{
    Router,
    http::HeaderValue,
    middleware as axum_middleware,
    routing::{delete, get, post},
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::services::email_service::{MailConfig, Notifier};

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// Selected storage backend
    pub db: db::Db,

    /// Handle to the mail notification worker
    pub notifier: Notifier,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging with tracing subscriber. Reads RUST_LOG environment variable (defaults to "info" level)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // Load configuration
    let config = config::Config::from_env()?;
    tracing::info!("Configuration loaded");

    // Connect storage backend (runs migrations for postgres)
    let db = db::connect(&config).await?;

    // Spawn the mail worker; request creation never waits on it
    let notifier = Notifier::spawn(MailConfig::from_config(&config)?);

    let state = AppState { db, notifier };

    // Create authenticated routes (API endpoints)
    let authenticated_routes = Router::new()
        // User and API key routes
        .route("/api/v1/users/me", get(handlers::users::current_user))
        .route(
            "/api/v1/users/{id}/api-keys",
            post(handlers::users::issue_api_key),
        )
        .route(
            "/api/v1/api-keys/{key}",
            delete(handlers::users::deactivate_api_key),
        )
        // Meeting request routes
        .route("/api/v1/requests", post(handlers::requests::create_request))
        .route("/api/v1/requests", get(handlers::requests::list_received))
        .route(
            "/api/v1/requests/{id}/respond",
            post(handlers::requests::respond),
        )
        // Schedule routes
        .route("/api/v1/schedules", get(handlers::schedules::list_schedules))
        // Apply authentication middleware to all routes in this group
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::auth_middleware,
        ));

    // Combine authenticated routes with public routes
    let app = Router::new()
        // Public routes (no authentication required)
        .route("/health", get(handlers::health::health_check))
        // Registration and lookup bootstrap the caller's API key
        .route("/api/v1/users", post(handlers::users::register_user))
        .route("/api/v1/users/find", get(handlers::users::find_user))
        // Merge authenticated routes
        .merge(authenticated_routes)
        // Add distributed tracing middleware for observability
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config))
        // Share state with all handlers via State extraction
        .with_state(state);

    // Bind to network address and start server
    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    // Start serving HTTP requests
    // This blocks forever, handling requests concurrently with tokio
    axum::serve(listener, app).await?;

    Ok(())
}

/// CORS policy from configuration.
///
/// `ALLOWED_ORIGINS` is a comma-separated origin list; when unset any
/// origin is allowed, which is the development default.
fn cors_layer(config: &config::Config) -> CorsLayer {
    match &config.allowed_origins {
        Some(origins) => {
            let origins: Vec<HeaderValue> = origins
                .split(',')
                .filter_map(|origin| origin.trim().parse().ok())
                .collect();

            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(Any)
                .allow_headers(Any)
        }
        None => CorsLayer::permissive(),
    }
}
