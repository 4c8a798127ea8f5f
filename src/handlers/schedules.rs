//! Confirmed schedule HTTP handlers.

use axum::{
    Extension, Json,
    extract::{Query, State},
};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::{
    AppState, error::AppError, middleware::auth::CurrentUser, models::meeting::MeetingSchedule,
    services::schedule_service,
};

/// Query parameters for the schedule listing endpoint.
#[derive(Debug, Deserialize)]
pub struct ScheduleQuery {
    /// Restrict to schedules starting on this calendar date (UTC)
    pub date: Option<NaiveDate>,
}

/// List the caller's confirmed schedules.
///
/// # Endpoint
///
/// `GET /api/v1/schedules?date=2025-06-01`
///
/// Returns every schedule the caller hosts or participates in, ordered by
/// start time; the optional `date` filter keeps only schedules starting on
/// that day.
///
/// # Response
///
/// - **Success (200 OK)**: array of schedules (may be empty)
/// - **Error (401)**: missing or invalid API key
pub async fn list_schedules(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Query(query): Query<ScheduleQuery>,
) -> Result<Json<Vec<MeetingSchedule>>, AppError> {
    let schedules =
        schedule_service::list_for_user(state.db.as_ref(), user.id, query.date).await?;

    Ok(Json(schedules))
}
