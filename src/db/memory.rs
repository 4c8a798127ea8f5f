//! In-memory storage backend.
//!
//! Everything lives in mutex-guarded maps. All state for a single operation
//! is read and written under one lock acquisition, which gives the same
//! single-shot transition guarantee the postgres backend gets from its
//! conditional UPDATE.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::{
    db::Database,
    error::AppError,
    models::{
        meeting::{
            MeetingRequest, MeetingSchedule, NewMeetingRequest, NewMeetingSchedule, RequestStatus,
        },
        time_slot::TimeSlot,
        user::{ApiKey, User},
    },
};

#[derive(Default)]
struct State {
    users: HashMap<Uuid, User>,
    api_keys: HashMap<String, ApiKey>,
    requests: HashMap<Uuid, MeetingRequest>,
    schedules: HashMap<Uuid, MeetingSchedule>,
}

#[derive(Default)]
pub struct MemoryDatabase {
    state: Mutex<State>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        // A poisoned lock only means another test thread panicked mid-write;
        // the map contents are still usable.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let state = self.state();
        Ok(state.users.values().find(|u| u.email == email).cloned())
    }

    async fn create_user(&self, name: &str, email: &str) -> Result<User, AppError> {
        let mut state = self.state();

        if state.users.values().any(|u| u.email == email) {
            return Err(AppError::InvalidRequest(
                "Email is already registered".to_string(),
            ));
        }

        let user = User {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: email.to_string(),
        };
        state.users.insert(user.id, user.clone());

        Ok(user)
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.state().users.get(&user_id).cloned())
    }

    async fn create_api_key(&self, user_id: Uuid) -> Result<ApiKey, AppError> {
        let mut state = self.state();

        if !state.users.contains_key(&user_id) {
            return Err(AppError::UserNotFound);
        }

        let key = ApiKey::issue(user_id);
        state.api_keys.insert(key.key.clone(), key.clone());

        Ok(key)
    }

    async fn get_user_by_api_key(&self, key: &str) -> Result<Option<User>, AppError> {
        let state = self.state();

        let Some(api_key) = state.api_keys.get(key).filter(|k| k.is_active) else {
            return Ok(None);
        };

        Ok(state.users.get(&api_key.user_id).cloned())
    }

    async fn get_active_api_key(&self, user_id: Uuid) -> Result<Option<ApiKey>, AppError> {
        let state = self.state();

        Ok(state
            .api_keys
            .values()
            .filter(|k| k.user_id == user_id && k.is_active)
            .max_by_key(|k| k.created_at)
            .cloned())
    }

    async fn deactivate_api_key(&self, key: &str) -> Result<bool, AppError> {
        let mut state = self.state();

        match state.api_keys.get_mut(key) {
            Some(api_key) if api_key.is_active => {
                api_key.is_active = false;
                Ok(true)
            }
            // Unknown or already inactive: report false, change nothing
            _ => Ok(false),
        }
    }

    async fn create_meeting_request(
        &self,
        new: NewMeetingRequest,
    ) -> Result<MeetingRequest, AppError> {
        let mut state = self.state();

        let sender = state
            .users
            .get(&new.sender_id)
            .cloned()
            .ok_or(AppError::UserNotFound)?;

        let request = MeetingRequest {
            id: Uuid::new_v4(),
            sender,
            receiver_email: new.receiver_email,
            available_slots: new.available_slots,
            status: RequestStatus::Pending,
            title: new.title,
            description: new.description,
            selected_slot: None,
            created_at: Utc::now(),
        };
        state.requests.insert(request.id, request.clone());

        Ok(request)
    }

    async fn get_meeting_request(&self, id: Uuid) -> Result<Option<MeetingRequest>, AppError> {
        Ok(self.state().requests.get(&id).cloned())
    }

    async fn list_received_requests(&self, email: &str) -> Result<Vec<MeetingRequest>, AppError> {
        let state = self.state();

        let mut requests: Vec<MeetingRequest> = state
            .requests
            .values()
            .filter(|r| r.receiver_email == email)
            .cloned()
            .collect();
        requests.sort_by_key(|r| r.created_at);

        Ok(requests)
    }

    async fn update_request_status(
        &self,
        id: Uuid,
        status: RequestStatus,
        selected_slot: Option<TimeSlot>,
    ) -> Result<MeetingRequest, AppError> {
        let mut state = self.state();

        let request = state
            .requests
            .get_mut(&id)
            .ok_or(AppError::RequestNotFound)?;

        // Single-shot guard; writing Pending is the rollback path
        if status != RequestStatus::Pending && request.status != RequestStatus::Pending {
            return Err(AppError::AlreadyProcessed);
        }

        request.status = status;
        request.selected_slot = selected_slot;

        Ok(request.clone())
    }

    async fn create_schedule(
        &self,
        new: NewMeetingSchedule,
    ) -> Result<MeetingSchedule, AppError> {
        let mut state = self.state();

        let host = state
            .users
            .get(&new.host_id)
            .cloned()
            .ok_or(AppError::UserNotFound)?;

        let mut participants = Vec::with_capacity(new.participant_ids.len());
        for participant_id in &new.participant_ids {
            let participant = state
                .users
                .get(participant_id)
                .cloned()
                .ok_or(AppError::UserNotFound)?;
            participants.push(participant);
        }

        let schedule = MeetingSchedule {
            id: Uuid::new_v4(),
            host,
            participants,
            time: new.time,
            title: new.title,
            description: new.description,
            created_at: Utc::now(),
        };
        state.schedules.insert(schedule.id, schedule.clone());

        Ok(schedule)
    }

    async fn get_schedules_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<MeetingSchedule>, AppError> {
        let state = self.state();

        let mut schedules: Vec<MeetingSchedule> = state
            .schedules
            .values()
            .filter(|s| s.host.id == user_id || s.participants.iter().any(|p| p.id == user_id))
            .cloned()
            .collect();
        schedules.sort_by_key(|s| s.time.start_time);

        Ok(schedules)
    }

    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }
}
