//! Meeting request HTTP handlers.
//!
//! This module implements the negotiation endpoints:
//! - POST /api/v1/requests - Propose a meeting
//! - GET /api/v1/requests - List requests addressed to the caller
//! - POST /api/v1/requests/:id/respond - Accept or decline a request

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    AppState,
    error::AppError,
    middleware::auth::CurrentUser,
    models::meeting::{CreateMeetingRequest, MeetingRequest, RespondToMeetingRequest},
    services::request_service,
};

/// Propose a meeting to another user by email.
///
/// # Endpoint
///
/// `POST /api/v1/requests`
///
/// # Request Body
///
/// ```json
/// {
///   "receiver_email": "bob@example.com",
///   "available_slots": [
///     { "start_time": "2025-06-01T09:00:00Z", "end_time": "2025-06-01T09:30:00Z" }
///   ],
///   "title": "Sync",
///   "description": "Weekly catch-up"
/// }
/// ```
///
/// # Response
///
/// - **Success (201 Created)**: the stored request, status PENDING. The
///   receiver's notification mail is enqueued but never awaited; creation
///   succeeds independently of delivery.
/// - **Error (400)**: empty title, malformed email, or invalid slots
/// - **Error (401)**: missing or invalid API key
pub async fn create_request(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(request): Json<CreateMeetingRequest>,
) -> Result<impl IntoResponse, AppError> {
    let created =
        request_service::create_request(state.db.as_ref(), &state.notifier, &user, request)
            .await?;

    Ok((StatusCode::CREATED, Json(created)))
}

/// List all meeting requests addressed to the caller.
///
/// # Endpoint
///
/// `GET /api/v1/requests`
///
/// # Response
///
/// - **Success (200 OK)**: requests of any status, oldest first
/// - **Error (401)**: missing or invalid API key
pub async fn list_received(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<Vec<MeetingRequest>>, AppError> {
    let requests = request_service::list_received(state.db.as_ref(), &user.email).await?;

    Ok(Json(requests))
}

/// Accept or decline a pending meeting request.
///
/// # Endpoint
///
/// `POST /api/v1/requests/:id/respond`
///
/// # Request Body
///
/// ```json
/// {
///   "accept": true,
///   "selected_slot": { "start_time": "2025-06-01T09:00:00Z", "end_time": "2025-06-01T09:30:00Z" }
/// }
/// ```
///
/// # Response
///
/// - **Success (200 OK)**: the updated request; on accept, the confirmed
///   schedule already exists by the time this returns
/// - **Error (403)**: caller is not the addressed receiver
/// - **Error (404)**: unknown request id
/// - **Error (409)**: request was already answered
/// - **Error (422)**: selected slot is not among the offered candidates
pub async fn respond(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(request_id): Path<Uuid>,
    Json(response): Json<RespondToMeetingRequest>,
) -> Result<Json<MeetingRequest>, AppError> {
    let updated = request_service::respond(
        state.db.as_ref(),
        request_id,
        &user,
        response.accept,
        response.selected_slot,
    )
    .await?;

    Ok(Json(updated))
}
