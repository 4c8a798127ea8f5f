//! User and API key service.
//!
//! Owns registration and the key lifecycle. A user always has at most one
//! key in normal use: lookups surface the newest active key and issue a
//! fresh one when none is active, so a client can recover its credential
//! by email without ever reactivating an old key.

use uuid::Uuid;

use crate::{
    db::Database,
    error::AppError,
    models::user::{ApiKey, User},
};

/// Register a user, or fetch the existing one for `email`.
///
/// Either way the caller gets back a user plus an active API key, issuing
/// one if necessary, so registration doubles as credential bootstrap.
///
/// # Errors
///
/// - `InvalidRequest`: blank name or malformed email
pub async fn register_or_fetch(
    db: &dyn Database,
    name: &str,
    email: &str,
) -> Result<(User, ApiKey), AppError> {
    if name.trim().is_empty() {
        return Err(AppError::InvalidRequest(
            "Name must not be empty".to_string(),
        ));
    }
    validate_email(email)?;

    if let Some(existing) = db.get_user_by_email(email).await? {
        let api_key = ensure_active_key(db, existing.id).await?;
        return Ok((existing, api_key));
    }

    let user = db.create_user(name, email).await?;
    let api_key = db.create_api_key(user.id).await?;

    Ok((user, api_key))
}

/// Look up a user by email, surfacing an active API key.
///
/// # Errors
///
/// - `UserNotFound`: no user registered under `email`
pub async fn find_user(db: &dyn Database, email: &str) -> Result<(User, ApiKey), AppError> {
    let user = db
        .get_user_by_email(email)
        .await?
        .ok_or(AppError::UserNotFound)?;

    let api_key = ensure_active_key(db, user.id).await?;

    Ok((user, api_key))
}

/// Issue a fresh API key for `user_id`.
///
/// # Errors
///
/// - `UserNotFound`: unknown user
pub async fn issue_api_key(db: &dyn Database, user_id: Uuid) -> Result<ApiKey, AppError> {
    db.create_api_key(user_id).await
}

/// The newest active key for `user_id`, if any.
pub async fn active_key_for(
    db: &dyn Database,
    user_id: Uuid,
) -> Result<Option<ApiKey>, AppError> {
    db.get_active_api_key(user_id).await
}

/// Deactivate an API key.
///
/// Deactivation is one-way and not idempotent: repeating the call, or
/// naming an unknown key, reports `ApiKeyNotFound` so the caller can tell
/// "revoked now" from "was not active".
pub async fn deactivate_api_key(db: &dyn Database, key: &str) -> Result<(), AppError> {
    if !db.deactivate_api_key(key).await? {
        return Err(AppError::ApiKeyNotFound);
    }

    Ok(())
}

async fn ensure_active_key(db: &dyn Database, user_id: Uuid) -> Result<ApiKey, AppError> {
    match db.get_active_api_key(user_id).await? {
        Some(key) => Ok(key),
        None => db.create_api_key(user_id).await,
    }
}

/// Minimal shape check for an email address.
///
/// Exactly one local part and one domain with a dot, no whitespace. This is
/// deliberately loose; deliverability is the mail relay's problem.
pub(crate) fn validate_email(email: &str) -> Result<(), AppError> {
    let well_formed = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
                && !domain.contains('@')
        }
        None => false,
    };

    if well_formed {
        Ok(())
    } else {
        Err(AppError::InvalidRequest(format!(
            "Invalid email address: {email}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryDatabase;

    #[tokio::test]
    async fn registration_creates_user_with_active_key() {
        let db = MemoryDatabase::new();

        let (user, key) = register_or_fetch(&db, "Alice", "alice@x.com").await.unwrap();
        assert_eq!(user.email, "alice@x.com");
        assert_eq!(key.user_id, user.id);
        assert!(key.is_active);
    }

    #[tokio::test]
    async fn repeated_registration_returns_existing_user_and_key() {
        let db = MemoryDatabase::new();

        let (first_user, first_key) =
            register_or_fetch(&db, "Alice", "alice@x.com").await.unwrap();
        let (second_user, second_key) =
            register_or_fetch(&db, "Someone Else", "alice@x.com").await.unwrap();

        assert_eq!(first_user.id, second_user.id);
        // The original name sticks; registration never overwrites
        assert_eq!(second_user.name, "Alice");
        assert_eq!(first_key.key, second_key.key);
    }

    #[tokio::test]
    async fn malformed_input_is_rejected() {
        let db = MemoryDatabase::new();

        for email in ["", "alice", "@x.com", "alice@", "alice@x", "a b@x.com"] {
            let err = register_or_fetch(&db, "Alice", email).await.unwrap_err();
            assert!(matches!(err, AppError::InvalidRequest(_)), "email: {email:?}");
        }

        let err = register_or_fetch(&db, "   ", "alice@x.com").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn find_user_issues_key_when_none_active() {
        let db = MemoryDatabase::new();
        let (user, key) = register_or_fetch(&db, "Alice", "alice@x.com").await.unwrap();

        deactivate_api_key(&db, &key.key).await.unwrap();

        let (found, fresh) = find_user(&db, "alice@x.com").await.unwrap();
        assert_eq!(found.id, user.id);
        assert_ne!(fresh.key, key.key);
        assert!(fresh.is_active);
    }

    #[tokio::test]
    async fn find_user_unknown_email_is_not_found() {
        let db = MemoryDatabase::new();
        let err = find_user(&db, "nobody@x.com").await.unwrap_err();
        assert!(matches!(err, AppError::UserNotFound));
    }

    #[tokio::test]
    async fn deactivating_twice_reports_not_found() {
        let db = MemoryDatabase::new();
        let (_, key) = register_or_fetch(&db, "Alice", "alice@x.com").await.unwrap();

        deactivate_api_key(&db, &key.key).await.unwrap();
        let err = deactivate_api_key(&db, &key.key).await.unwrap_err();
        assert!(matches!(err, AppError::ApiKeyNotFound));
    }

    #[tokio::test]
    async fn issue_api_key_for_unknown_user_fails() {
        let db = MemoryDatabase::new();
        let err = issue_api_key(&db, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::UserNotFound));
    }
}
