//! Wall-clock helpers for session bookkeeping.

use chrono::{DateTime, Utc};

/// UTC timestamp used for session start times.
pub type Timestamp = DateTime<Utc>;

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

/// Whole seconds elapsed since `since`, clamped at zero if the clock went
/// backwards.
#[must_use]
pub fn elapsed_secs(since: Timestamp) -> u64 {
    u64::try_from((now() - since).num_seconds()).unwrap_or(0)
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
    fn should_count_elapsed_seconds() {
        let earlier = now() - chrono::Duration::seconds(90);
        let secs = elapsed_secs(earlier);
        assert!((90..=91).contains(&secs));
    }

    #[test]
    fn should_clamp_future_timestamps_to_zero() {
        let later = now() + chrono::Duration::seconds(30);
        assert_eq!(elapsed_secs(later), 0);
    }
}
