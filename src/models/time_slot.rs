//! Time slot value type.
//!
//! A `TimeSlot` is an immutable interval between two instants. Two slots are
//! equal iff both instants match exactly; the accept flow relies on this to
//! match a receiver's pick against the offered candidates verbatim.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A time window offered in a meeting request.
///
/// Slots are value objects: never mutated after creation, only referenced
/// or copied. A well-formed slot satisfies `start_time < end_time`; the
/// workflow rejects anything else before it is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl TimeSlot {
    /// Whether this slot describes a non-empty forward interval.
    pub fn is_well_formed(&self) -> bool {
        self.start_time < self.end_time
    }

    /// Length of the slot in whole minutes.
    pub fn duration_minutes(&self) -> i64 {
        (self.end_time - self.start_time).num_minutes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn slot(start_min: u32, end_min: u32) -> TimeSlot {
        TimeSlot {
            start_time: Utc.with_ymd_and_hms(2025, 6, 1, 9, start_min, 0).unwrap(),
            end_time: Utc.with_ymd_and_hms(2025, 6, 1, 9, end_min, 0).unwrap(),
        }
    }

    #[test]
    fn well_formed_requires_start_before_end() {
        assert!(slot(0, 30).is_well_formed());
        assert!(!slot(30, 30).is_well_formed());
        assert!(!slot(30, 0).is_well_formed());
    }

    #[test]
    fn duration_is_in_whole_minutes() {
        assert_eq!(slot(0, 30).duration_minutes(), 30);
    }

    #[test]
    fn equality_is_exact_instant_equality() {
        assert_eq!(slot(0, 30), slot(0, 30));
        assert_ne!(slot(0, 30), slot(0, 31));

        let mut shifted = slot(0, 30);
        shifted.start_time += chrono::Duration::seconds(1);
        assert_ne!(slot(0, 30), shifted);
    }
}
