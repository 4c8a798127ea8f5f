//! Meeting request workflow.
//!
//! The state machine at the heart of the service:
//!
//! ```text
//!         create             accept(valid slot)
//!  (none) ------> PENDING ------------------------> ACCEPTED  (terminal)
//!                    |
//!                    | decline
//!                    v
//!                 DECLINED  (terminal)
//! ```
//!
//! A request transitions out of PENDING exactly once. Accepting requires a
//! slot picked verbatim from the offered candidates and synchronously
//! materializes the schedule before the call returns, so a client that
//! observes ACCEPTED can assume the schedule exists.

use uuid::Uuid;

use crate::{
    db::Database,
    error::AppError,
    models::{
        meeting::{CreateMeetingRequest, MeetingRequest, NewMeetingRequest, RequestStatus},
        time_slot::TimeSlot,
        user::User,
    },
    services::{email_service::Notifier, schedule_service, user_service},
};

/// Create a meeting request from `sender` to the addressed receiver.
///
/// The receiver is identified by email only and does not have to be a
/// registered user. Once the request is durably stored, exactly one
/// notification is enqueued for the receiver; delivery is best-effort and
/// cannot fail the creation.
///
/// # Errors
///
/// - `InvalidRequest`: empty title, malformed receiver email, no candidate
///   slots, a slot that does not start before it ends, or duplicate slots
pub async fn create_request(
    db: &dyn Database,
    notifier: &Notifier,
    sender: &User,
    body: CreateMeetingRequest,
) -> Result<MeetingRequest, AppError> {
    if body.title.trim().is_empty() {
        return Err(AppError::InvalidRequest(
            "Title must not be empty".to_string(),
        ));
    }
    user_service::validate_email(&body.receiver_email)?;
    validate_slots(&body.available_slots)?;

    let request = db
        .create_meeting_request(NewMeetingRequest {
            sender_id: sender.id,
            receiver_email: body.receiver_email,
            available_slots: body.available_slots,
            title: body.title,
            description: body.description,
        })
        .await?;

    tracing::info!(
        request_id = %request.id,
        sender = %request.sender.email,
        receiver = %request.receiver_email,
        "meeting request created"
    );
    notifier.notify_request_created(&request);

    Ok(request)
}

/// All requests addressed to `email`, any status, oldest first.
pub async fn list_received(
    db: &dyn Database,
    email: &str,
) -> Result<Vec<MeetingRequest>, AppError> {
    db.list_received_requests(email).await
}

/// Answer a pending meeting request.
///
/// Only the addressed receiver may answer, and only once. On accept, the
/// selected slot must be value-identical to one of the candidates; the
/// status transition commits first (single-shot, enforced by the store)
/// and the schedule is materialized before returning. If the schedule
/// write fails, the transition is reverted so the request is never left
/// ACCEPTED without a schedule.
///
/// # Errors
///
/// - `RequestNotFound`: unknown request id
/// - `Forbidden`: responder is not the addressed receiver
/// - `AlreadyProcessed`: the request was already answered
/// - `InvalidRequest`: accept without a selected slot
/// - `InvalidSelection`: selected slot not among the candidates
/// - `Internal`: schedule write failed (the request stays PENDING)
pub async fn respond(
    db: &dyn Database,
    request_id: Uuid,
    responder: &User,
    accept: bool,
    selected_slot: Option<TimeSlot>,
) -> Result<MeetingRequest, AppError> {
    let request = db
        .get_meeting_request(request_id)
        .await?
        .ok_or(AppError::RequestNotFound)?;

    if request.receiver_email != responder.email {
        return Err(AppError::Forbidden);
    }

    if request.status != RequestStatus::Pending {
        return Err(AppError::AlreadyProcessed);
    }

    if !accept {
        let declined = db
            .update_request_status(request_id, RequestStatus::Declined, None)
            .await?;
        tracing::info!(request_id = %request_id, "meeting request declined");
        return Ok(declined);
    }

    let slot = selected_slot.ok_or_else(|| {
        AppError::InvalidRequest("A selected slot is required to accept".to_string())
    })?;

    // Verbatim match only; there is no fuzzy or nearest-slot negotiation
    if !request.available_slots.contains(&slot) {
        return Err(AppError::InvalidSelection);
    }

    let accepted = db
        .update_request_status(request_id, RequestStatus::Accepted, Some(slot))
        .await?;

    match schedule_service::materialize(db, &accepted, responder).await {
        Ok(schedule) => {
            tracing::info!(
                request_id = %request_id,
                schedule_id = %schedule.id,
                "meeting request accepted"
            );
            Ok(accepted)
        }
        Err(e) => {
            // The request must not stay ACCEPTED without a schedule
            if let Err(revert_err) = db
                .update_request_status(request_id, RequestStatus::Pending, None)
                .await
            {
                tracing::error!(
                    request_id = %request_id,
                    "failed to revert request after schedule write failure: {revert_err}"
                );
            }

            Err(match e {
                AppError::Database(e) => AppError::Database(e),
                other => AppError::Internal(other.to_string()),
            })
        }
    }
}

fn validate_slots(slots: &[TimeSlot]) -> Result<(), AppError> {
    if slots.is_empty() {
        return Err(AppError::InvalidRequest(
            "At least one candidate slot is required".to_string(),
        ));
    }

    for slot in slots {
        if !slot.is_well_formed() {
            return Err(AppError::InvalidRequest(
                "Each slot must start before it ends".to_string(),
            ));
        }
    }

    for (i, slot) in slots.iter().enumerate() {
        if slots[..i].contains(slot) {
            return Err(AppError::InvalidRequest(
                "Duplicate candidate slots are not allowed".to_string(),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryDatabase;
    use chrono::{TimeZone, Utc};

    fn slot(hour: u32) -> TimeSlot {
        TimeSlot {
            start_time: Utc.with_ymd_and_hms(2025, 6, 1, hour, 0, 0).unwrap(),
            end_time: Utc.with_ymd_and_hms(2025, 6, 1, hour, 30, 0).unwrap(),
        }
    }

    fn body(receiver: &str, slots: Vec<TimeSlot>, title: &str) -> CreateMeetingRequest {
        CreateMeetingRequest {
            receiver_email: receiver.to_string(),
            available_slots: slots,
            title: title.to_string(),
            description: None,
        }
    }

    async fn register(db: &MemoryDatabase, name: &str, email: &str) -> User {
        let (user, _) = user_service::register_or_fetch(db, name, email).await.unwrap();
        user
    }

    #[tokio::test]
    async fn created_requests_start_pending_and_notify_once() {
        let db = MemoryDatabase::new();
        let (notifier, mut outbox) = Notifier::test_pair();
        let alice = register(&db, "Alice", "alice@x.com").await;

        let request = create_request(
            &db,
            &notifier,
            &alice,
            body("bob@x.com", vec![slot(9), slot(10)], "Sync"),
        )
        .await
        .unwrap();

        assert_eq!(request.status, RequestStatus::Pending);
        assert!(request.selected_slot.is_none());
        assert_eq!(request.available_slots, vec![slot(9), slot(10)]);

        // Exactly one notification, addressed to the receiver
        let queued = outbox.try_recv().unwrap();
        assert_eq!(queued.id, request.id);
        assert_eq!(queued.receiver_email, "bob@x.com");
        assert!(outbox.try_recv().is_err());
    }

    #[tokio::test]
    async fn receiver_need_not_be_registered() {
        let db = MemoryDatabase::new();
        let (notifier, _outbox) = Notifier::test_pair();
        let alice = register(&db, "Alice", "alice@x.com").await;

        let request = create_request(
            &db,
            &notifier,
            &alice,
            body("stranger@elsewhere.org", vec![slot(9)], "Intro"),
        )
        .await
        .unwrap();

        assert_eq!(request.receiver_email, "stranger@elsewhere.org");
    }

    #[tokio::test]
    async fn invalid_creations_are_rejected() {
        let db = MemoryDatabase::new();
        let (notifier, mut outbox) = Notifier::test_pair();
        let alice = register(&db, "Alice", "alice@x.com").await;

        let backwards = TimeSlot {
            start_time: slot(9).end_time,
            end_time: slot(9).start_time,
        };

        let cases = vec![
            body("bob@x.com", vec![], "Sync"),
            body("bob@x.com", vec![backwards], "Sync"),
            body("bob@x.com", vec![slot(9), slot(9)], "Sync"),
            body("bob@x.com", vec![slot(9)], "   "),
            body("not-an-email", vec![slot(9)], "Sync"),
        ];

        for case in cases {
            let err = create_request(&db, &notifier, &alice, case).await.unwrap_err();
            assert!(matches!(err, AppError::InvalidRequest(_)));
        }

        // Nothing was stored or notified
        assert!(list_received(&db, "bob@x.com").await.unwrap().is_empty());
        assert!(outbox.try_recv().is_err());
    }

    #[tokio::test]
    async fn received_requests_are_listed_oldest_first() {
        let db = MemoryDatabase::new();
        let (notifier, _outbox) = Notifier::test_pair();
        let alice = register(&db, "Alice", "alice@x.com").await;

        let first = create_request(&db, &notifier, &alice, body("bob@x.com", vec![slot(9)], "One"))
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        let second =
            create_request(&db, &notifier, &alice, body("bob@x.com", vec![slot(10)], "Two"))
                .await
                .unwrap();

        let received = list_received(&db, "bob@x.com").await.unwrap();
        assert_eq!(
            received.iter().map(|r| r.id).collect::<Vec<_>>(),
            vec![first.id, second.id]
        );
        assert!(list_received(&db, "carol@x.com").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn only_the_addressed_receiver_may_respond() {
        let db = MemoryDatabase::new();
        let (notifier, _outbox) = Notifier::test_pair();
        let alice = register(&db, "Alice", "alice@x.com").await;
        let carol = register(&db, "Carol", "carol@x.com").await;

        let request = create_request(&db, &notifier, &alice, body("bob@x.com", vec![slot(9)], "Sync"))
            .await
            .unwrap();

        let err = respond(&db, request.id, &carol, true, Some(slot(9)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden));

        // Still answerable by the real receiver
        let fetched = db.get_meeting_request(request.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, RequestStatus::Pending);
    }

    #[tokio::test]
    async fn responding_to_unknown_request_is_not_found() {
        let db = MemoryDatabase::new();
        let bob = register(&db, "Bob", "bob@x.com").await;

        let err = respond(&db, Uuid::new_v4(), &bob, false, None).await.unwrap_err();
        assert!(matches!(err, AppError::RequestNotFound));
    }

    #[tokio::test]
    async fn accepting_requires_a_selected_slot() {
        let db = MemoryDatabase::new();
        let (notifier, _outbox) = Notifier::test_pair();
        let alice = register(&db, "Alice", "alice@x.com").await;
        let bob = register(&db, "Bob", "bob@x.com").await;

        let request = create_request(&db, &notifier, &alice, body("bob@x.com", vec![slot(9)], "Sync"))
            .await
            .unwrap();

        let err = respond(&db, request.id, &bob, true, None).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn accepting_an_unoffered_slot_leaves_the_request_pending() {
        let db = MemoryDatabase::new();
        let (notifier, _outbox) = Notifier::test_pair();
        let alice = register(&db, "Alice", "alice@x.com").await;
        let bob = register(&db, "Bob", "bob@x.com").await;

        let request = create_request(
            &db,
            &notifier,
            &alice,
            body("bob@x.com", vec![slot(9), slot(10)], "Sync"),
        )
        .await
        .unwrap();

        let err = respond(&db, request.id, &bob, true, Some(slot(11)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidSelection));

        let fetched = db.get_meeting_request(request.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, RequestStatus::Pending);
        assert!(fetched.selected_slot.is_none());
        assert!(schedule_service::list_for_user(&db, alice.id, None)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn accepting_creates_exactly_one_schedule() {
        let db = MemoryDatabase::new();
        let (notifier, _outbox) = Notifier::test_pair();
        let alice = register(&db, "Alice", "alice@x.com").await;
        let bob = register(&db, "Bob", "bob@x.com").await;

        let request = create_request(
            &db,
            &notifier,
            &alice,
            body("bob@x.com", vec![slot(9), slot(10)], "Sync"),
        )
        .await
        .unwrap();

        let accepted = respond(&db, request.id, &bob, true, Some(slot(10)))
            .await
            .unwrap();
        assert_eq!(accepted.status, RequestStatus::Accepted);
        assert_eq!(accepted.selected_slot, Some(slot(10)));

        let schedules = schedule_service::list_for_user(&db, alice.id, None)
            .await
            .unwrap();
        assert_eq!(schedules.len(), 1);

        let schedule = &schedules[0];
        assert_eq!(schedule.host.id, alice.id);
        assert_eq!(schedule.time, slot(10));
        assert_eq!(schedule.title, "Sync");

        let mut participant_ids: Vec<Uuid> =
            schedule.participants.iter().map(|p| p.id).collect();
        participant_ids.sort();
        let mut expected = vec![alice.id, bob.id];
        expected.sort();
        assert_eq!(participant_ids, expected);

        // The receiver sees the same schedule
        let bobs = schedule_service::list_for_user(&db, bob.id, None).await.unwrap();
        assert_eq!(bobs.len(), 1);
        assert_eq!(bobs[0].id, schedule.id);
    }

    #[tokio::test]
    async fn self_addressed_accept_lists_the_user_once() {
        let db = MemoryDatabase::new();
        let (notifier, _outbox) = Notifier::test_pair();
        let alice = register(&db, "Alice", "alice@x.com").await;

        // Sending a request to one's own email is valid input
        let request = create_request(&db, &notifier, &alice, body("alice@x.com", vec![slot(9)], "Focus"))
            .await
            .unwrap();

        let accepted = respond(&db, request.id, &alice, true, Some(slot(9)))
            .await
            .unwrap();
        assert_eq!(accepted.status, RequestStatus::Accepted);

        let schedules = schedule_service::list_for_user(&db, alice.id, None)
            .await
            .unwrap();
        assert_eq!(schedules.len(), 1);

        // Sender and responder are the same user, listed exactly once
        let participant_ids: Vec<Uuid> =
            schedules[0].participants.iter().map(|p| p.id).collect();
        assert_eq!(participant_ids, vec![alice.id]);
    }

    #[tokio::test]
    async fn concurrent_responses_resolve_to_exactly_one_winner() {
        let db = MemoryDatabase::new();
        let (notifier, _outbox) = Notifier::test_pair();
        let alice = register(&db, "Alice", "alice@x.com").await;
        let bob = register(&db, "Bob", "bob@x.com").await;

        let request = create_request(&db, &notifier, &alice, body("bob@x.com", vec![slot(9)], "Sync"))
            .await
            .unwrap();

        // An accept and a decline race on the same request; the store's
        // transition guard must let exactly one through.
        let (accept, decline) = tokio::join!(
            respond(&db, request.id, &bob, true, Some(slot(9))),
            respond(&db, request.id, &bob, false, None),
        );

        let (winner, loser) = match (&accept, &decline) {
            (Ok(won), Err(lost)) | (Err(lost), Ok(won)) => (won, lost),
            other => panic!("expected exactly one winner, got {other:?}"),
        };
        assert!(matches!(loser, AppError::AlreadyProcessed));

        let fetched = db.get_meeting_request(request.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, winner.status);

        // A schedule exists iff the accept won
        let schedules = schedule_service::list_for_user(&db, bob.id, None).await.unwrap();
        match winner.status {
            RequestStatus::Accepted => assert_eq!(schedules.len(), 1),
            RequestStatus::Declined => assert!(schedules.is_empty()),
            RequestStatus::Pending => panic!("winner cannot remain pending"),
        }
    }

    #[tokio::test]
    async fn declined_requests_create_no_schedule_and_stay_declined() {
        let db = MemoryDatabase::new();
        let (notifier, _outbox) = Notifier::test_pair();
        let alice = register(&db, "Alice", "alice@x.com").await;
        let bob = register(&db, "Bob", "bob@x.com").await;

        let request = create_request(&db, &notifier, &alice, body("bob@x.com", vec![slot(9)], "Sync"))
            .await
            .unwrap();

        let declined = respond(&db, request.id, &bob, false, None).await.unwrap();
        assert_eq!(declined.status, RequestStatus::Declined);
        assert!(schedule_service::list_for_user(&db, alice.id, None)
            .await
            .unwrap()
            .is_empty());

        // A later accept attempt is rejected, not silently ignored
        let err = respond(&db, request.id, &bob, true, Some(slot(9)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AlreadyProcessed));

        let fetched = db.get_meeting_request(request.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, RequestStatus::Declined);
    }

    #[tokio::test]
    async fn second_accept_is_already_processed() {
        let db = MemoryDatabase::new();
        let (notifier, _outbox) = Notifier::test_pair();
        let alice = register(&db, "Alice", "alice@x.com").await;
        let bob = register(&db, "Bob", "bob@x.com").await;

        let request = create_request(&db, &notifier, &alice, body("bob@x.com", vec![slot(9)], "Sync"))
            .await
            .unwrap();

        respond(&db, request.id, &bob, true, Some(slot(9))).await.unwrap();
        let err = respond(&db, request.id, &bob, true, Some(slot(9)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AlreadyProcessed));

        // Still exactly one schedule
        let schedules = schedule_service::list_for_user(&db, bob.id, None).await.unwrap();
        assert_eq!(schedules.len(), 1);
    }

    #[tokio::test]
    async fn failed_schedule_write_reverts_the_accept() {
        let db = MemoryDatabase::new();
        let (notifier, _outbox) = Notifier::test_pair();
        let alice = register(&db, "Alice", "alice@x.com").await;

        let request = create_request(&db, &notifier, &alice, body("bob@x.com", vec![slot(9)], "Sync"))
            .await
            .unwrap();

        // The responder holds the right email but is not in the store, so
        // the schedule write fails after the status transition commits.
        let ghost = User {
            id: Uuid::new_v4(),
            name: "Bob".to_string(),
            email: "bob@x.com".to_string(),
        };

        let err = respond(&db, request.id, &ghost, true, Some(slot(9)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));

        // No dangling ACCEPTED without a schedule
        let fetched = db.get_meeting_request(request.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, RequestStatus::Pending);
        assert!(fetched.selected_slot.is_none());
        assert!(schedule_service::list_for_user(&db, alice.id, None)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn schedules_can_be_filtered_by_date() {
        let db = MemoryDatabase::new();
        let (notifier, _outbox) = Notifier::test_pair();
        let alice = register(&db, "Alice", "alice@x.com").await;
        let bob = register(&db, "Bob", "bob@x.com").await;

        let next_day = TimeSlot {
            start_time: Utc.with_ymd_and_hms(2025, 6, 2, 9, 0, 0).unwrap(),
            end_time: Utc.with_ymd_and_hms(2025, 6, 2, 9, 30, 0).unwrap(),
        };

        for offered in [slot(9), next_day.clone()] {
            let request = create_request(
                &db,
                &notifier,
                &alice,
                body("bob@x.com", vec![offered.clone()], "Sync"),
            )
            .await
            .unwrap();
            respond(&db, request.id, &bob, true, Some(offered)).await.unwrap();
        }

        let all = schedule_service::list_for_user(&db, bob.id, None).await.unwrap();
        assert_eq!(all.len(), 2);

        let june_second = schedule_service::list_for_user(
            &db,
            bob.id,
            Some(chrono::NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()),
        )
        .await
        .unwrap();
        assert_eq!(june_second.len(), 1);
        assert_eq!(june_second[0].time, next_day);
    }
}
