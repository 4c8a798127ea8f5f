//! User management HTTP handlers.
//!
//! This module implements the user and API key endpoints:
//! - POST /api/v1/users - Register a user (or fetch the existing one)
//! - GET /api/v1/users/find - Look up a user by email
//! - GET /api/v1/users/me - The authenticated caller
//! - POST /api/v1/users/:id/api-keys - Issue a fresh API key
//! - DELETE /api/v1/api-keys/:key - Deactivate an API key

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    AppState,
    error::AppError,
    middleware::auth::CurrentUser,
    models::user::{ApiKey, CreateUserRequest, UserResponse},
    services::user_service,
};

/// Query parameters for the user lookup endpoint.
#[derive(Debug, Deserialize)]
pub struct FindUserQuery {
    pub email: String,
}

/// Register a new user, or return the existing one for the email.
///
/// # Endpoint
///
/// `POST /api/v1/users` (public; this is how a client bootstraps its key)
///
/// # Request Body
///
/// ```json
/// {
///   "name": "Alice",
///   "email": "alice@example.com"
/// }
/// ```
///
/// # Response
///
/// - **Success (201 Created)**: the user, including an active API key
/// - **Error (400)**: blank name or malformed email
pub async fn register_user(
    State(state): State<AppState>,
    Json(request): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (user, api_key) =
        user_service::register_or_fetch(state.db.as_ref(), &request.name, &request.email).await?;

    Ok((
        StatusCode::CREATED,
        Json(UserResponse::new(user, Some(api_key.key))),
    ))
}

/// Look up a user by email, surfacing an active API key.
///
/// # Endpoint
///
/// `GET /api/v1/users/find?email=alice@example.com` (public)
///
/// # Response
///
/// - **Success (200 OK)**: the user with an active key (issued if needed)
/// - **Error (404)**: no user registered under that email
pub async fn find_user(
    State(state): State<AppState>,
    Query(query): Query<FindUserQuery>,
) -> Result<Json<UserResponse>, AppError> {
    let (user, api_key) = user_service::find_user(state.db.as_ref(), &query.email).await?;

    Ok(Json(UserResponse::new(user, Some(api_key.key))))
}

/// The authenticated caller's own record.
///
/// # Endpoint
///
/// `GET /api/v1/users/me`
///
/// # Response
///
/// - **Success (200 OK)**: caller's user record plus the active key, if any
/// - **Error (401)**: missing or invalid API key
pub async fn current_user(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<UserResponse>, AppError> {
    let api_key = user_service::active_key_for(state.db.as_ref(), user.id).await?;

    Ok(Json(UserResponse::new(user, api_key.map(|k| k.key))))
}

/// Issue a fresh API key for a user.
///
/// # Endpoint
///
/// `POST /api/v1/users/:id/api-keys`
///
/// # Response
///
/// - **Success (201 Created)**: the new key, active immediately
/// - **Error (404)**: unknown user id
pub async fn issue_api_key(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let api_key: ApiKey = user_service::issue_api_key(state.db.as_ref(), user_id).await?;

    Ok((StatusCode::CREATED, Json(api_key)))
}

/// Deactivate an API key.
///
/// # Endpoint
///
/// `DELETE /api/v1/api-keys/:key`
///
/// Deactivation is one-way; the key record is retained for audit but can
/// never be used or reactivated again.
///
/// # Response
///
/// - **Success (204 No Content)**
/// - **Error (404)**: key unknown or already inactive
pub async fn deactivate_api_key(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<StatusCode, AppError> {
    user_service::deactivate_api_key(state.db.as_ref(), &key).await?;

    Ok(StatusCode::NO_CONTENT)
}
