//! API key authentication middleware.
//!
//! This middleware intercepts every protected request to:
//! 1. Extract the API key from the `X-Api-Key` header
//! 2. Resolve it to a user through the storage backend
//! 3. Inject the authenticated user into the request
//! 4. Reject unauthorized requests with HTTP 401
//!
//! A missing key and an unknown/inactive key are logged as distinct events
//! but surface identically to the caller.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::{AppState, db::Database, error::AppError, models::user::User};

/// Header carrying the caller's opaque bearer token.
pub const API_KEY_HEADER: &str = "x-api-key";

/// The authenticated caller, attached to the request's extension map.
///
/// Route handlers extract this with `Extension<CurrentUser>` to know who
/// made the request.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Resolve an optional bearer token to a user.
///
/// This is the single gate in front of every mutating operation. The two
/// failure modes are deliberately separate variants so operators can tell
/// misconfigured clients from revoked or guessed keys in the logs.
pub async fn authenticate(db: &dyn Database, token: Option<&str>) -> Result<User, AppError> {
    let token = match token {
        Some(token) if !token.is_empty() => token,
        _ => {
            tracing::warn!("request rejected: no API key provided");
            return Err(AppError::MissingApiKey);
        }
    };

    match db.get_user_by_api_key(token).await? {
        Some(user) => Ok(user),
        None => {
            tracing::warn!("request rejected: unknown or inactive API key");
            Err(AppError::InvalidApiKey)
        }
    }
}

/// API key authentication middleware function.
///
/// # Headers
///
/// Expected header format:
/// ```text
/// X-Api-Key: mk_4f2a...
/// ```
///
/// # Returns
///
/// - `Ok(Response)` if authenticated successfully (calls next handler)
/// - `Err(AppError::MissingApiKey | AppError::InvalidApiKey)` otherwise (401)
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|h| h.to_str().ok());

    let user = authenticate(state.db.as_ref(), token).await?;

    // Route handlers can now extract this using Extension<CurrentUser>
    request.extensions_mut().insert(CurrentUser(user));

    Ok(next.run(request).await)
}
