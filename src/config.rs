//! Application configuration management.
//!
//! This module handles loading configuration from environment variables.
//! It uses the `envy` crate to automatically deserialize environment variables into a type-safe struct.

use serde::Deserialize;

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `DATABASE_BACKEND` (optional): `postgres` (default) or `memory`
/// - `DATABASE_URL` (required for the postgres backend): connection string
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 8000
/// - `MAIL_API_URL` (optional): mail relay endpoint; when unset, outbound
///   mail is logged instead of delivered
/// - `MAIL_FROM` (optional): sender address for notification mail
/// - `ALLOWED_ORIGINS` (optional): comma-separated CORS origins; when unset,
///   any origin is allowed
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_backend")]
    pub database_backend: String,

    pub database_url: Option<String>,

    #[serde(default = "default_port")]
    pub server_port: u16,

    pub mail_api_url: Option<String>,

    #[serde(default = "default_mail_from")]
    pub mail_from: String,

    pub allowed_origins: Option<String>,
}

/// Default backend if DATABASE_BACKEND is not set.
fn default_backend() -> String {
    "postgres".to_string()
}

/// Default port if SERVER_PORT environment variable is not set.
fn default_port() -> u16 {
    8000
}

/// Default sender address for notification mail.
fn default_mail_from() -> String {
    "noreply@schedulia.org".to_string()
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// This method first attempts to load a `.env` file (which is optional),
    /// then reads environment variables and deserializes them into a Config struct.
    ///
    /// # Errors
    ///
    /// Returns an error if environment variable values cannot be parsed
    /// into the expected types.
    pub fn from_env() -> Result<Self, envy::Error> {
        // Try to load .env file if it exists (does nothing if not found)
        dotenvy::dotenv().ok();

        // Parse environment variables into Config struct
        // Field names are automatically converted: database_url -> DATABASE_URL
        envy::from_env::<Config>()
    }
}
