//! Time utilities for sfbd
//!
//! Resource ages are measured in UTC wall-clock time. The current time is
//! always obtained through a [`Clock`] so that staleness decisions can be
//! driven by a fixed instant in tests.
//!
//! # Mock Time for Development
//!
//! In debug builds, the `SFB_MOCK_TIME` environment variable can be set
//! to override the system time seen by [`SystemClock`]. This is useful
//! for exercising age thresholds against a real cluster without waiting days.
//!
//! Format: `YYYY-MM-DD HH:MM:SS` in UTC (e.g., `2025-12-25 14:30:00`)
//!
//! Example:
//! ```bash
//! SFB_MOCK_TIME="2025-12-25 14:30:00" sfbd --config ./config.toml
//! ```

use chrono::{DateTime, NaiveDateTime, Utc};
use std::sync::{Mutex, OnceLock};

/// Environment variable name for mock time (debug builds only)
pub const MOCK_TIME_ENV_VAR: &str = "SFB_MOCK_TIME";

/// Hours in one whole day of resource age
pub const HOURS_IN_DAY: i64 = 24;

/// Cached mock time offset from the real time when the process started.
/// This allows mock time to advance naturally.
static MOCK_TIME_OFFSET: OnceLock<Option<chrono::Duration>> = OnceLock::new();

fn get_mock_time_offset() -> Option<chrono::Duration> {
    *MOCK_TIME_OFFSET.get_or_init(|| {
        #[cfg(debug_assertions)]
        {
            if let Ok(mock_time_str) = std::env::var(MOCK_TIME_ENV_VAR) {
                match NaiveDateTime::parse_from_str(&mock_time_str, "%Y-%m-%d %H:%M:%S") {
                    Ok(naive_dt) => {
                        let offset = naive_dt.and_utc().signed_duration_since(Utc::now());
                        tracing::info!(
                            mock_time = %mock_time_str,
                            offset_secs = offset.num_seconds(),
                            "Mock time enabled"
                        );
                        return Some(offset);
                    }
                    Err(_) => {
                        tracing::warn!(
                            mock_time = %mock_time_str,
                            expected_format = "%Y-%m-%d %H:%M:%S",
                            "Invalid mock time format"
                        );
                    }
                }
            }
            None
        }
        #[cfg(not(debug_assertions))]
        {
            None
        }
    })
}

/// Returns whether mock time is currently active.
pub fn is_mock_time_active() -> bool {
    get_mock_time_offset().is_some()
}

/// Source of the current instant
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The system clock, respecting mock time settings in debug builds.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        let real_now = Utc::now();

        if let Some(offset) = get_mock_time_offset() {
            real_now + offset
        } else {
            real_now
        }
    }
}

/// A clock that only moves when told to (for tests and dry runs)
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Move the clock to `now`
    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }

    /// Move the clock forward by `by`
    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Whole days elapsed from `since` to `now`.
///
/// Truncates toward zero: 47h59m is one day, and an instant in the future
/// yields zero until it is a full day ahead.
pub fn whole_days_between(since: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let age = now.signed_duration_since(since);
    age.num_hours() / HOURS_IN_DAY
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn whole_days_truncates() {
        let created = at(2010, 1, 1, 0, 0, 0);

        assert_eq!(whole_days_between(created, created), 0);
        assert_eq!(whole_days_between(created, at(2010, 1, 1, 23, 59, 59)), 0);
        assert_eq!(whole_days_between(created, at(2010, 1, 2, 0, 0, 0)), 1);
        assert_eq!(whole_days_between(created, at(2010, 1, 2, 1, 0, 0)), 1);
        assert_eq!(whole_days_between(created, at(2010, 1, 2, 23, 59, 59)), 1);
        assert_eq!(whole_days_between(created, at(2010, 1, 3, 0, 0, 0)), 2);
    }

    #[test]
    fn whole_days_in_future_truncate_toward_zero() {
        let created = at(2010, 1, 2, 0, 0, 0);
        assert_eq!(whole_days_between(created, at(2010, 1, 1, 1, 0, 0)), 0);
        assert_eq!(whole_days_between(created, at(2009, 12, 30, 0, 0, 0)), -3);
    }

    #[test]
    fn fixed_clock_advances() {
        let start = at(2020, 6, 1, 12, 0, 0);
        let clock = FixedClock::new(start);
        assert_eq!(clock.now(), start);

        clock.advance(Duration::hours(25));
        assert_eq!(clock.now(), at(2020, 6, 2, 13, 0, 0));

        clock.set(start);
        assert_eq!(clock.now(), start);
    }
}
