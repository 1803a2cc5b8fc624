//! Time and timestamp helpers.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

/// UTC timestamp used for state changes and scheduler deadlines.
pub type Timestamp = DateTime<Utc>;

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

/// Add a std [`Duration`] to a timestamp, saturating instead of overflowing.
#[must_use]
pub fn add(ts: Timestamp, delay: Duration) -> Timestamp {
    TimeDelta::from_std(delay)
        .ok()
        .and_then(|delta| ts.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Time elapsed from `earlier` to `later`, zero when `later` is not after it.
#[must_use]
pub fn elapsed(earlier: Timestamp, later: Timestamp) -> Duration {
    (later - earlier).to_std().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_return_current_utc_time() {
        let before = Utc::now();
        let ts = now();
        let after = Utc::now();
        assert!(ts >= before);
        assert!(ts <= after);
    }

    #[test]
    fn should_add_duration_to_timestamp() {
        let ts = now();
        let later = add(ts, Duration::from_secs(15));
        assert_eq!(elapsed(ts, later), Duration::from_secs(15));
    }

    #[test]
    fn should_saturate_when_adding_huge_duration() {
        let ts = now();
        assert_eq!(add(ts, Duration::MAX), DateTime::<Utc>::MAX_UTC);
    }

    #[test]
    fn should_report_zero_elapsed_when_going_backwards() {
        let ts = now();
        let earlier = ts - TimeDelta::seconds(3);
        assert_eq!(elapsed(ts, earlier), Duration::ZERO);
    }
}
