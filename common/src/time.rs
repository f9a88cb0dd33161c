//! Time utilities and constants for the exchange-rate subsystem.

use chrono::{DateTime, Duration, Utc};

/// Timing constants.
pub mod constants {
    use super::Duration;

    /// Scheduled rate refresh interval (1 hour).
    pub fn refresh_interval() -> Duration {
        Duration::hours(1)
    }

    /// Timeout for a single request to the rate source (10 seconds).
    pub fn request_timeout() -> Duration {
        Duration::seconds(10)
    }

    /// Upper bound on one leg of a batch conversion (5 seconds).
    pub fn conversion_leg_timeout() -> Duration {
        Duration::seconds(5)
    }
}

/// A timestamp with timezone (always UTC).
pub type Timestamp = DateTime<Utc>;

/// Get the current timestamp.
pub fn now() -> Timestamp {
    Utc::now()
}

/// Time elapsed since `timestamp`, never negative.
pub fn age(timestamp: Timestamp) -> Duration {
    let elapsed = now() - timestamp;
    if elapsed < Duration::zero() {
        Duration::zero()
    } else {
        elapsed
    }
}

/// Check whether data updated at `timestamp` is older than `max_age`.
pub fn is_stale(timestamp: Timestamp, max_age: Duration) -> bool {
    age(timestamp) > max_age
}

/// Duration extensions for convenient construction.
pub trait DurationExt {
    fn as_std(&self) -> std::time::Duration;
}

impl DurationExt for Duration {
    fn as_std(&self) -> std::time::Duration {
        self.to_std().unwrap_or(std::time::Duration::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_stale() {
        let recent = now() - Duration::minutes(10);
        assert!(!is_stale(recent, constants::refresh_interval()));

        let old = now() - Duration::hours(2);
        assert!(is_stale(old, constants::refresh_interval()));
    }

    #[test]
    fn test_age_never_negative() {
        let future = now() + Duration::seconds(30);
        assert_eq!(age(future), Duration::zero());
    }

    #[test]
    fn test_as_std() {
        assert_eq!(
            constants::refresh_interval().as_std(),
            std::time::Duration::from_secs(3600)
        );
        assert_eq!(Duration::seconds(-5).as_std(), std::time::Duration::ZERO);
    }
}
