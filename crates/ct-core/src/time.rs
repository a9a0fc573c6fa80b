//! Time utilities for status reporting

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Current time, but never earlier than `previous`.
///
/// The wall clock can step backwards (NTP corrections, manual changes);
/// timestamps derived from this function cannot.
///
/// # Examples
/// ```
/// use chrono::{Duration, Utc};
/// use ct_core::time::now_not_before;
///
/// let future = Utc::now() + Duration::hours(1);
/// assert_eq!(now_not_before(future), future);
/// ```
pub fn now_not_before(previous: DateTime<Utc>) -> DateTime<Utc> {
    std::cmp::max(Utc::now(), previous)
}

/// Elapsed time between two timestamps.
///
/// Returns `Duration::ZERO` if `until` is before `since`.
pub fn elapsed_between(since: DateTime<Utc>, until: DateTime<Utc>) -> Duration {
    (until - since).to_std().unwrap_or(Duration::ZERO)
}
