//! Meeting request and schedule models, plus API request/response types.
//!
//! This module defines:
//! - `MeetingRequest`: a proposed meeting awaiting the receiver's decision
//! - `MeetingSchedule`: a confirmed meeting created from an accepted request
//! - Request types for creating and responding to meeting requests

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{time_slot::TimeSlot, user::User};

/// Lifecycle state of a meeting request.
///
/// A request is created `Pending` and transitions exactly once to either
/// `Accepted` or `Declined`. Both outcomes are terminal; a second response
/// attempt is rejected rather than silently ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "request_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Declined,
}

/// A meeting proposed by `sender` to `receiver_email`.
///
/// # Database Table
///
/// Maps to the `meeting_requests` table. The receiver is identified by
/// email only and need not be a registered user at creation time; the
/// candidate slots are stored with the request and owned by it.
///
/// # Invariants
///
/// - `available_slots` is non-empty and duplicate-free
/// - `selected_slot` is present iff `status == Accepted`, and is
///   value-identical to one of `available_slots`
#[derive(Debug, Clone, Serialize)]
pub struct MeetingRequest {
    /// Unique identifier for this request
    pub id: Uuid,

    /// User who proposed the meeting
    pub sender: User,

    /// Email address the request was sent to
    pub receiver_email: String,

    /// Candidate time windows, in the order the sender offered them
    pub available_slots: Vec<TimeSlot>,

    /// Current lifecycle state
    pub status: RequestStatus,

    /// Meeting title (non-empty)
    pub title: String,

    /// Optional free-form description
    pub description: Option<String>,

    /// The slot the receiver picked, once the request is accepted
    pub selected_slot: Option<TimeSlot>,

    /// When the request was created
    pub created_at: DateTime<Utc>,
}

/// A confirmed meeting, created as a side effect of an accepted request.
///
/// # Database Table
///
/// Maps to `meeting_schedules` plus the `schedule_participants` join table.
/// The slot is a fresh copy of the accepted candidate, not a back-reference
/// to the request; the request remains an independent historical record.
#[derive(Debug, Clone, Serialize)]
pub struct MeetingSchedule {
    /// Unique identifier for this schedule
    pub id: Uuid,

    /// The original sender of the request
    pub host: User,

    /// Everyone attending, host included
    pub participants: Vec<User>,

    /// The single agreed time window
    pub time: TimeSlot,

    /// Meeting title
    pub title: String,

    /// Optional free-form description
    pub description: Option<String>,

    /// When the schedule was created
    pub created_at: DateTime<Utc>,
}

/// Fields needed to persist a new meeting request.
///
/// Validation (non-empty title, well-formed duplicate-free slots) happens
/// in the workflow service before this is handed to a backend.
#[derive(Debug, Clone)]
pub struct NewMeetingRequest {
    pub sender_id: Uuid,
    pub receiver_email: String,
    pub available_slots: Vec<TimeSlot>,
    pub title: String,
    pub description: Option<String>,
}

/// Fields needed to persist a new meeting schedule.
#[derive(Debug, Clone)]
pub struct NewMeetingSchedule {
    pub host_id: Uuid,
    pub participant_ids: Vec<Uuid>,
    pub time: TimeSlot,
    pub title: String,
    pub description: Option<String>,
}

/// Request body for proposing a meeting.
///
/// # JSON Example
///
/// ```json
/// {
///   "receiver_email": "bob@example.com",
///   "available_slots": [
///     { "start_time": "2025-06-01T09:00:00Z", "end_time": "2025-06-01T09:30:00Z" },
///     { "start_time": "2025-06-01T10:00:00Z", "end_time": "2025-06-01T10:30:00Z" }
///   ],
///   "title": "Sync",
///   "description": "Weekly catch-up"
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct CreateMeetingRequest {
    pub receiver_email: String,
    pub available_slots: Vec<TimeSlot>,
    pub title: String,
    pub description: Option<String>,
}

/// Request body for answering a meeting request.
///
/// `selected_slot` is required when accepting and must match one of the
/// offered candidates exactly; it is ignored when declining.
///
/// # JSON Example
///
/// ```json
/// {
///   "accept": true,
///   "selected_slot": { "start_time": "2025-06-01T10:00:00Z", "end_time": "2025-06-01T10:30:00Z" }
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct RespondToMeetingRequest {
    pub accept: bool,
    pub selected_slot: Option<TimeSlot>,
}
