//! Data models representing database entities.
//!
//! This module contains all data structures that map to database tables.

/// Users and their API keys
pub mod user;
/// Immutable time window value type
pub mod time_slot;
/// Meeting requests and confirmed schedules
pub mod meeting;
