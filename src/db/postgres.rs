//! PostgreSQL storage backend.
//!
//! Queries follow the schema in `migrations/`. Candidate and selected slots
//! are stored as JSONB so a slot round-trips as an exact value; the
//! single-shot status transition is a conditional `UPDATE` keyed on the
//! current status, so the database itself arbitrates concurrent responses.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};
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

/// Type alias for the PostgreSQL connection pool.
pub type DbPool = Pool<Postgres>;

pub struct PostgresDatabase {
    pool: DbPool,
}

impl PostgresDatabase {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Flat row shape for a meeting request joined with its sender.
///
/// The JSONB slot columns are decoded into [`TimeSlot`] values in
/// `into_request`; a row that fails to decode is a corrupt record and
/// surfaces as an internal error rather than a panic.
#[derive(sqlx::FromRow)]
struct MeetingRequestRow {
    id: Uuid,
    sender_id: Uuid,
    sender_name: String,
    sender_email: String,
    receiver_email: String,
    title: String,
    description: Option<String>,
    status: RequestStatus,
    available_slots: serde_json::Value,
    selected_slot: Option<serde_json::Value>,
    created_at: DateTime<Utc>,
}

impl MeetingRequestRow {
    fn into_request(self) -> Result<MeetingRequest, AppError> {
        let available_slots: Vec<TimeSlot> = serde_json::from_value(self.available_slots)
            .map_err(|e| AppError::Internal(format!("corrupt slot data for request {}: {e}", self.id)))?;

        let selected_slot: Option<TimeSlot> = self
            .selected_slot
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| AppError::Internal(format!("corrupt slot data for request {}: {e}", self.id)))?;

        Ok(MeetingRequest {
            id: self.id,
            sender: User {
                id: self.sender_id,
                name: self.sender_name,
                email: self.sender_email,
            },
            receiver_email: self.receiver_email,
            available_slots,
            status: self.status,
            title: self.title,
            description: self.description,
            selected_slot,
            created_at: self.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ScheduleRow {
    id: Uuid,
    host_id: Uuid,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    title: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
}

/// Shared SELECT for request rows; keeps the sender join in one place.
const REQUEST_COLUMNS: &str = r#"
    r.id, r.sender_id, u.name AS sender_name, u.email AS sender_email,
    r.receiver_email, r.title, r.description, r.status,
    r.available_slots, r.selected_slot, r.created_at
"#;

#[async_trait]
impl Database for PostgresDatabase {
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user =
            sqlx::query_as::<_, User>("SELECT id, name, email FROM users WHERE email = $1")
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;

        Ok(user)
    }

    async fn create_user(&self, name: &str, email: &str) -> Result<User, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, name, email)
            VALUES ($1, $2, $3)
            RETURNING id, name, email
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(email)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT id, name, email FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn create_api_key(&self, user_id: Uuid) -> Result<ApiKey, AppError> {
        let user_exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;

        if !user_exists {
            return Err(AppError::UserNotFound);
        }

        let key = ApiKey::issue(user_id);

        let stored = sqlx::query_as::<_, ApiKey>(
            r#"
            INSERT INTO api_keys (key, user_id, created_at, is_active)
            VALUES ($1, $2, $3, $4)
            RETURNING key, user_id, created_at, is_active
            "#,
        )
        .bind(&key.key)
        .bind(key.user_id)
        .bind(key.created_at)
        .bind(key.is_active)
        .fetch_one(&self.pool)
        .await?;

        Ok(stored)
    }

    async fn get_user_by_api_key(&self, key: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT u.id, u.name, u.email
            FROM users u
            JOIN api_keys k ON k.user_id = u.id
            WHERE k.key = $1 AND k.is_active = true
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn get_active_api_key(&self, user_id: Uuid) -> Result<Option<ApiKey>, AppError> {
        let key = sqlx::query_as::<_, ApiKey>(
            r#"
            SELECT key, user_id, created_at, is_active
            FROM api_keys
            WHERE user_id = $1 AND is_active = true
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(key)
    }

    async fn deactivate_api_key(&self, key: &str) -> Result<bool, AppError> {
        // Only active keys match, so repeating the call reports false
        let result =
            sqlx::query("UPDATE api_keys SET is_active = false WHERE key = $1 AND is_active = true")
                .bind(key)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn create_meeting_request(
        &self,
        new: NewMeetingRequest,
    ) -> Result<MeetingRequest, AppError> {
        let slots = serde_json::to_value(&new.available_slots)
            .map_err(|e| AppError::Internal(format!("failed to encode slots: {e}")))?;

        let row = sqlx::query_as::<_, MeetingRequestRow>(&format!(
            r#"
            WITH inserted AS (
                INSERT INTO meeting_requests
                    (id, sender_id, receiver_email, title, description, available_slots)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING *
            )
            SELECT {REQUEST_COLUMNS}
            FROM inserted r
            JOIN users u ON u.id = r.sender_id
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(new.sender_id)
        .bind(&new.receiver_email)
        .bind(&new.title)
        .bind(&new.description)
        .bind(slots)
        .fetch_one(&self.pool)
        .await?;

        row.into_request()
    }

    async fn get_meeting_request(&self, id: Uuid) -> Result<Option<MeetingRequest>, AppError> {
        let row = sqlx::query_as::<_, MeetingRequestRow>(&format!(
            r#"
            SELECT {REQUEST_COLUMNS}
            FROM meeting_requests r
            JOIN users u ON u.id = r.sender_id
            WHERE r.id = $1
            "#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(MeetingRequestRow::into_request).transpose()
    }

    async fn list_received_requests(&self, email: &str) -> Result<Vec<MeetingRequest>, AppError> {
        let rows = sqlx::query_as::<_, MeetingRequestRow>(&format!(
            r#"
            SELECT {REQUEST_COLUMNS}
            FROM meeting_requests r
            JOIN users u ON u.id = r.sender_id
            WHERE r.receiver_email = $1
            ORDER BY r.created_at ASC
            "#
        ))
        .bind(email)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(MeetingRequestRow::into_request).collect()
    }

    async fn update_request_status(
        &self,
        id: Uuid,
        status: RequestStatus,
        selected_slot: Option<TimeSlot>,
    ) -> Result<MeetingRequest, AppError> {
        let slot = selected_slot
            .map(|s| serde_json::to_value(&s))
            .transpose()
            .map_err(|e| AppError::Internal(format!("failed to encode slot: {e}")))?;

        // The status guard makes the transition single-shot: the UPDATE only
        // matches while the request is still PENDING, except for the rollback
        // path that writes PENDING itself.
        let row = sqlx::query_as::<_, MeetingRequestRow>(&format!(
            r#"
            WITH updated AS (
                UPDATE meeting_requests
                SET status = $2, selected_slot = $3
                WHERE id = $1
                  AND (status = 'PENDING' OR $2 = 'PENDING')
                RETURNING *
            )
            SELECT {REQUEST_COLUMNS}
            FROM updated r
            JOIN users u ON u.id = r.sender_id
            "#
        ))
        .bind(id)
        .bind(status)
        .bind(slot)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => row.into_request(),
            None => {
                // Distinguish a vanished request from a lost race
                let exists: bool =
                    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM meeting_requests WHERE id = $1)")
                        .bind(id)
                        .fetch_one(&self.pool)
                        .await?;

                if exists {
                    Err(AppError::AlreadyProcessed)
                } else {
                    Err(AppError::RequestNotFound)
                }
            }
        }
    }

    async fn create_schedule(
        &self,
        new: NewMeetingSchedule,
    ) -> Result<MeetingSchedule, AppError> {
        // Schedule row and participant rows are written in one database
        // transaction; either the whole schedule exists or none of it does.
        let mut tx = self.pool.begin().await?;

        let host = sqlx::query_as::<_, User>("SELECT id, name, email FROM users WHERE id = $1")
            .bind(new.host_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(AppError::UserNotFound)?;

        let schedule_id = Uuid::new_v4();
        let row = sqlx::query_as::<_, ScheduleRow>(
            r#"
            INSERT INTO meeting_schedules (id, host_id, start_time, end_time, title, description)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, host_id, start_time, end_time, title, description, created_at
            "#,
        )
        .bind(schedule_id)
        .bind(new.host_id)
        .bind(new.time.start_time)
        .bind(new.time.end_time)
        .bind(&new.title)
        .bind(&new.description)
        .fetch_one(&mut *tx)
        .await?;

        let mut participants = Vec::with_capacity(new.participant_ids.len());
        for participant_id in &new.participant_ids {
            let participant =
                sqlx::query_as::<_, User>("SELECT id, name, email FROM users WHERE id = $1")
                    .bind(participant_id)
                    .fetch_optional(&mut *tx)
                    .await?
                    .ok_or(AppError::UserNotFound)?;

            sqlx::query(
                "INSERT INTO schedule_participants (schedule_id, user_id) VALUES ($1, $2)",
            )
            .bind(schedule_id)
            .bind(participant_id)
            .execute(&mut *tx)
            .await?;

            participants.push(participant);
        }

        tx.commit().await?;

        Ok(MeetingSchedule {
            id: row.id,
            host,
            participants,
            time: TimeSlot {
                start_time: row.start_time,
                end_time: row.end_time,
            },
            title: row.title,
            description: row.description,
            created_at: row.created_at,
        })
    }

    async fn get_schedules_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<MeetingSchedule>, AppError> {
        let rows = sqlx::query_as::<_, ScheduleRow>(
            r#"
            SELECT s.id, s.host_id, s.start_time, s.end_time, s.title, s.description, s.created_at
            FROM meeting_schedules s
            WHERE s.host_id = $1
               OR EXISTS (
                    SELECT 1 FROM schedule_participants sp
                    WHERE sp.schedule_id = s.id AND sp.user_id = $1
               )
            ORDER BY s.start_time ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut schedules = Vec::with_capacity(rows.len());
        for row in rows {
            let host =
                sqlx::query_as::<_, User>("SELECT id, name, email FROM users WHERE id = $1")
                    .bind(row.host_id)
                    .fetch_optional(&self.pool)
                    .await?
                    .ok_or(AppError::UserNotFound)?;

            let participants = sqlx::query_as::<_, User>(
                r#"
                SELECT u.id, u.name, u.email
                FROM users u
                JOIN schedule_participants sp ON sp.user_id = u.id
                WHERE sp.schedule_id = $1
                "#,
            )
            .bind(row.id)
            .fetch_all(&self.pool)
            .await?;

            schedules.push(MeetingSchedule {
                id: row.id,
                host,
                participants,
                time: TimeSlot {
                    start_time: row.start_time,
                    end_time: row.end_time,
                },
                title: row.title,
                description: row.description,
                created_at: row.created_at,
            });
        }

        Ok(schedules)
    }

    async fn health_check(&self) -> Result<(), AppError> {
        // Verify database connectivity with simple query
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
