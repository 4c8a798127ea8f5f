//! HTTP request handlers (route handlers).
//!
//! Each handler is an async function that:
//! 1. Receives HTTP request data (JSON body, URL params, etc.)
//! 2. Delegates to a service for the business logic
//! 3. Returns HTTP response (JSON, status code)

/// Service health endpoint
pub mod health;
/// User registration and API key endpoints
pub mod users;
/// Meeting request endpoints
pub mod requests;
/// Confirmed schedule endpoints
pub mod schedules;
