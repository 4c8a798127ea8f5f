//! User and API key models.
//!
//! API keys are opaque bearer tokens used to authenticate callers. They are
//! stored as issued so an active key can be surfaced again for its owner;
//! deactivated keys are retained for audit and never reactivated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Represents a user record from the database.
///
/// # Database Table
///
/// Maps to the `users` table. Emails are unique and compared exactly as
/// stored; users are never deleted.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow, Serialize)]
pub struct User {
    /// Unique identifier for this user
    pub id: Uuid,

    /// Display name
    pub name: String,

    /// Email address (unique, case-sensitive as stored)
    pub email: String,
}

/// Represents an API key record from the database.
///
/// # Database Table
///
/// Maps to the `api_keys` table. A user may own several keys; lookups
/// surface the most recently created key that is still active.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct ApiKey {
    /// The opaque token presented by callers in the `X-Api-Key` header
    pub key: String,

    /// Owning user
    pub user_id: Uuid,

    /// Timestamp when this key was issued
    pub created_at: DateTime<Utc>,

    /// Whether this key is currently valid
    ///
    /// Inactive keys are rejected during authentication. Deactivation is a
    /// one-way operation; a key can never be reactivated.
    pub is_active: bool,
}

impl ApiKey {
    /// Issue a fresh key for `user_id`.
    ///
    /// The token is 32 random bytes hex-encoded behind an `mk_` prefix,
    /// generated from the OS RNG. It is never derived from the user id or
    /// a timestamp.
    pub fn issue(user_id: Uuid) -> Self {
        let bytes: [u8; 32] = rand::random();

        Self {
            key: format!("mk_{}", hex::encode(bytes)),
            user_id,
            created_at: Utc::now(),
            is_active: true,
        }
    }
}

/// Request body for registering a user.
///
/// # JSON Example
///
/// ```json
/// {
///   "name": "Alice",
///   "email": "alice@example.com"
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
}

/// Response body for user endpoints.
///
/// Includes the caller's active API key so a client can bootstrap
/// authentication right after registration or lookup.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl UserResponse {
    pub fn new(user: User, api_key: Option<String>) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            api_key,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_keys_are_prefixed_and_unique() {
        let user_id = Uuid::new_v4();
        let a = ApiKey::issue(user_id);
        let b = ApiKey::issue(user_id);

        assert!(a.key.starts_with("mk_"));
        // 32 bytes hex-encoded behind the prefix
        assert_eq!(a.key.len(), 3 + 64);
        assert!(a.is_active);
        assert_ne!(a.key, b.key);
    }
}
