//! Daily quota accounting (spec.md §4.5): a fixed daily budget with a
//! reserve band that refuses allocations once it would be eaten into,
//! resetting at the next UTC midnight.

use std::sync::Mutex;

use chrono::{DateTime, Duration, TimeZone, Utc};
use yta_models::QuotaStatus;

use crate::error::{MetadataError, MetadataResult};

pub const QUOTA_LIMIT: u64 = 10_000;
pub const QUOTA_RESERVE: u64 = 1_000;

pub const COST_VIDEO: u64 = 1;
pub const COST_PLAYLIST: u64 = 2;
pub const COST_BATCH_CHUNK: u64 = 1;

struct QuotaState {
    used: u64,
    reset_time: DateTime<Utc>,
}

fn next_midnight_utc() -> DateTime<Utc> {
    let tomorrow = (Utc::now() + Duration::days(1)).date_naive();
    Utc.from_utc_datetime(&tomorrow.and_hms_opt(0, 0, 0).expect("midnight is always valid"))
}

/// Tracks quota usage against [`QUOTA_LIMIT`], refusing any reservation that
/// would push `used` past `QUOTA_LIMIT - QUOTA_RESERVE`.
pub struct QuotaTracker {
    state: Mutex<QuotaState>,
}

impl QuotaTracker {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QuotaState {
                used: 0,
                reset_time: next_midnight_utc(),
            }),
        }
    }

    fn reset_if_due(&self, state: &mut QuotaState) {
        if Utc::now() >= state.reset_time {
            state.used = 0;
            state.reset_time = next_midnight_utc();
        }
    }

    pub fn check_and_reserve(&self, units: u64) -> MetadataResult<()> {
        let mut state = self.state.lock().unwrap();
        self.reset_if_due(&mut state);
        if state.used + units > QUOTA_LIMIT - QUOTA_RESERVE {
            return Err(MetadataError::QuotaExceeded);
        }
        state.used += units;
        Ok(())
    }

    pub fn status(&self) -> QuotaStatus {
        let mut state = self.state.lock().unwrap();
        self.reset_if_due(&mut state);
        let remaining = (QUOTA_LIMIT - QUOTA_RESERVE).saturating_sub(state.used);
        QuotaStatus {
            quota_limit: QUOTA_LIMIT,
            quota_used: state.used,
            quota_reserve: QUOTA_RESERVE,
            quota_reset_time: state.reset_time,
            operations_available: remaining / COST_VIDEO,
        }
    }
}

impl Default for QuotaTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserves_within_budget() {
        let tracker = QuotaTracker::new();
        assert!(tracker.check_and_reserve(100).is_ok());
        assert_eq!(tracker.status().quota_used, 100);
    }

    #[test]
    fn refuses_once_reserve_would_be_eaten_into() {
        let tracker = QuotaTracker::new();
        tracker
            .check_and_reserve(QUOTA_LIMIT - QUOTA_RESERVE - 1)
            .unwrap();
        assert!(matches!(
            tracker.check_and_reserve(2),
            Err(MetadataError::QuotaExceeded)
        ));
        assert!(tracker.check_and_reserve(1).is_ok());
    }

    #[test]
    fn status_reports_reset_time_in_the_future() {
        let tracker = QuotaTracker::new();
        assert!(tracker.status().quota_reset_time > Utc::now());
    }
}
