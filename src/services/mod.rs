//! Business logic services.
//!
//! Handlers stay thin; the rules for identity, the request workflow, and
//! schedule creation live here, each service taking the storage handle as
//! an explicit parameter.

/// User registration and API key lifecycle
pub mod user_service;
/// Meeting request workflow (create, list, respond)
pub mod request_service;
/// Confirmed schedule creation and listing
pub mod schedule_service;
/// Fire-and-forget outbound mail
pub mod email_service;
