//! Day arithmetic on UTC timestamps.
//!
//! All churn calculations count in days. Fractional days are used for rates
//! and averages; whole (floored) days are used wherever a count is compared
//! against a threshold.

use chrono::{DateTime, Duration, Utc};

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Fractional days from `earlier` to `later` (negative if `later` precedes it)
pub fn days_between(later: DateTime<Utc>, earlier: DateTime<Utc>) -> f64 {
    (later - earlier).num_milliseconds() as f64 / MILLIS_PER_DAY
}

/// Whole days from `earlier` to `later`, floored
pub fn whole_days_between(later: DateTime<Utc>, earlier: DateTime<Utc>) -> i64 {
    days_between(later, earlier).floor() as i64
}

/// Shift a timestamp forward by a fractional number of days
pub fn add_days(at: DateTime<Utc>, days: f64) -> DateTime<Utc> {
    at + Duration::milliseconds((days * MILLIS_PER_DAY).round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_days_between_fractional() {
        assert_eq!(days_between(at(3, 12), at(1, 0)), 2.5);
        assert_eq!(days_between(at(1, 0), at(3, 12)), -2.5);
    }

    #[test]
    fn test_whole_days_floors() {
        assert_eq!(whole_days_between(at(3, 23), at(1, 0)), 2);
        assert_eq!(whole_days_between(at(1, 0), at(1, 0)), 0);
    }

    #[test]
    fn test_add_days() {
        assert_eq!(add_days(at(1, 0), 2.5), at(3, 12));
    }
}
