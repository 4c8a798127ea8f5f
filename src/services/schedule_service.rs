//! Schedule materialization and listing.
//!
//! A schedule is created exactly once, as the side effect of accepting a
//! meeting request. The slot is copied by value so the schedule stands on
//! its own; the request stays behind as a historical record.

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{
    db::Database,
    error::AppError,
    models::{
        meeting::{MeetingRequest, MeetingSchedule, NewMeetingSchedule},
        user::User,
    },
};

/// Convert an accepted request into a durable schedule.
///
/// Called only from the accept path in the request workflow, after the
/// status transition has committed. The host is the original sender; the
/// participants are the sender and the accepting receiver.
///
/// A store rejection surfaces as an error and the caller is responsible
/// for reverting the request's ACCEPTED transition.
pub async fn materialize(
    db: &dyn Database,
    request: &MeetingRequest,
    responder: &User,
) -> Result<MeetingSchedule, AppError> {
    let time = request
        .selected_slot
        .clone()
        .ok_or_else(|| AppError::Internal("accepted request has no selected slot".to_string()))?;

    // Participants form a set; a self-addressed request has sender and
    // responder as the same user and must not list them twice.
    let mut participant_ids = vec![request.sender.id, responder.id];
    participant_ids.dedup();

    db.create_schedule(NewMeetingSchedule {
        host_id: request.sender.id,
        participant_ids,
        time,
        title: request.title.clone(),
        description: request.description.clone(),
    })
    .await
}

/// Schedules `user_id` hosts or participates in, ordered by start time.
///
/// With `date` set, only schedules whose slot starts on that calendar day
/// (UTC) are returned.
pub async fn list_for_user(
    db: &dyn Database,
    user_id: Uuid,
    date: Option<NaiveDate>,
) -> Result<Vec<MeetingSchedule>, AppError> {
    let mut schedules = db.get_schedules_for_user(user_id).await?;

    if let Some(date) = date {
        schedules.retain(|s| s.time.start_time.date_naive() == date);
    }

    Ok(schedules)
}
