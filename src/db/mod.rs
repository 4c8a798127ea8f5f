//! Storage abstraction and backend selection.
//!
//! All persistence goes through the [`Database`] trait so the workflow code
//! never touches a concrete store. Two backends implement it:
//!
//! - [`postgres::PostgresDatabase`]: sqlx connection pool, used in production
//! - [`memory::MemoryDatabase`]: mutex-guarded maps, used for tests and
//!   local development
//!
//! The backend is picked once at process start from configuration; any
//! implementation satisfying these operation contracts is valid.

pub mod memory;
pub mod postgres;

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    config::Config,
    error::AppError,
    models::{
        meeting::{
            MeetingRequest, MeetingSchedule, NewMeetingRequest, NewMeetingSchedule, RequestStatus,
        },
        time_slot::TimeSlot,
        user::{ApiKey, User},
    },
};

/// Shared handle to the selected storage backend.
pub type Db = Arc<dyn Database>;

/// Repository operations the workflow engine depends on.
///
/// Every method provides at least read-your-writes consistency. The one
/// operation with an ordering contract is [`Database::update_request_status`];
/// see its documentation.
#[async_trait]
pub trait Database: Send + Sync {
    /// Look up a user by exact email match.
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    /// Create a user with a fresh id. The email must not be registered yet.
    async fn create_user(&self, name: &str, email: &str) -> Result<User, AppError>;

    /// Look up a user by id.
    async fn get_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, AppError>;

    /// Issue and store a new active API key for `user_id`.
    ///
    /// Fails with [`AppError::UserNotFound`] if the user does not exist.
    async fn create_api_key(&self, user_id: Uuid) -> Result<ApiKey, AppError>;

    /// Resolve an API key token to its owner. Inactive keys resolve to `None`.
    async fn get_user_by_api_key(&self, key: &str) -> Result<Option<User>, AppError>;

    /// The most recently issued key for `user_id` that is still active.
    async fn get_active_api_key(&self, user_id: Uuid) -> Result<Option<ApiKey>, AppError>;

    /// Deactivate a key. Returns `false` if the key is unknown or already
    /// inactive; a deactivated key is never reactivated.
    async fn deactivate_api_key(&self, key: &str) -> Result<bool, AppError>;

    /// Persist a new meeting request in PENDING state.
    async fn create_meeting_request(
        &self,
        new: NewMeetingRequest,
    ) -> Result<MeetingRequest, AppError>;

    /// Look up a meeting request by id.
    async fn get_meeting_request(&self, id: Uuid) -> Result<Option<MeetingRequest>, AppError>;

    /// All requests addressed to `email`, any status, ordered by creation
    /// time ascending.
    async fn list_received_requests(&self, email: &str) -> Result<Vec<MeetingRequest>, AppError>;

    /// Transition a request's status, compare-and-swap style.
    ///
    /// Writing `Accepted` or `Declined` succeeds only while the request is
    /// still PENDING; of two concurrent responders exactly one wins and the
    /// other observes [`AppError::AlreadyProcessed`]. Writing `Pending` is
    /// unconditional and exists solely as the rollback path for a failed
    /// schedule materialization.
    async fn update_request_status(
        &self,
        id: Uuid,
        status: RequestStatus,
        selected_slot: Option<TimeSlot>,
    ) -> Result<MeetingRequest, AppError>;

    /// Persist a confirmed meeting schedule with its participant set.
    async fn create_schedule(&self, new: NewMeetingSchedule)
    -> Result<MeetingSchedule, AppError>;

    /// All schedules `user_id` hosts or participates in, ordered by start
    /// time ascending.
    async fn get_schedules_for_user(&self, user_id: Uuid)
    -> Result<Vec<MeetingSchedule>, AppError>;

    /// Backend connectivity probe for the health endpoint.
    async fn health_check(&self) -> Result<(), AppError>;
}

/// Create the storage backend selected by configuration.
///
/// For the postgres backend this also runs pending migrations from the
/// `migrations/` directory before returning.
pub async fn connect(config: &Config) -> anyhow::Result<Db> {
    match config.database_backend.as_str() {
        "memory" => {
            tracing::info!("Using in-memory database backend");
            Ok(Arc::new(memory::MemoryDatabase::new()))
        }
        "postgres" => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL is required for the postgres backend")?;

            let pool = sqlx::postgres::PgPoolOptions::new()
                // Limit concurrent connections
                .max_connections(5)
                .connect(url)
                .await?;
            tracing::info!("Database pool created");

            sqlx::migrate!("./migrations").run(&pool).await?;
            tracing::info!("Database migrations complete");

            Ok(Arc::new(postgres::PostgresDatabase::new(pool)))
        }
        other => anyhow::bail!("unsupported database backend: {other}"),
    }
}
