//! Freshness classification for a city's last weather update.
//!
//! # Clock injection
//! Every function takes `now` explicitly instead of calling `Utc::now()`,
//! so classification is deterministic in tests and identical in both
//! processes for the same inputs.
//!
//! Staleness is strictly greater than the threshold:
//!   age > threshold  →  stale
//!   age == threshold →  fresh

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Display state of a city's temperature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FreshnessState {
    Fresh,
    Loading,
    Stale,
    Unavailable,
}

impl FreshnessState {
    /// True when a fetch-on-read should be attempted.
    pub fn needs_refresh(self) -> bool {
        matches!(self, FreshnessState::Stale | FreshnessState::Unavailable)
    }
}

fn threshold_delta(threshold: Duration) -> TimeDelta {
    TimeDelta::from_std(threshold).unwrap_or(TimeDelta::MAX)
}

/// Classify a last-updated timestamp against `threshold`.
///
/// Never returns `Loading`; that state only exists alongside an in-flight
/// fetch, see [`classify_with_fetch`]. Timestamps in the future (clock skew
/// between processes) count as fresh.
pub fn classify(
    last_updated: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    threshold: Duration,
) -> FreshnessState {
    let Some(last_updated) = last_updated else {
        return FreshnessState::Unavailable;
    };

    let elapsed = now.signed_duration_since(last_updated);
    if elapsed > threshold_delta(threshold) {
        FreshnessState::Stale
    } else {
        FreshnessState::Fresh
    }
}

/// Like [`classify`], but an in-flight fetch wins over the timestamp.
pub fn classify_with_fetch(
    fetch_in_flight: bool,
    last_updated: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    threshold: Duration,
) -> FreshnessState {
    if fetch_in_flight {
        FreshnessState::Loading
    } else {
        classify(last_updated, now, threshold)
    }
}

/// Age of a reading at `now`, clamped to zero for future timestamps.
pub fn age(last_updated: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Option<TimeDelta> {
    last_updated.map(|t| now.signed_duration_since(t).max(TimeDelta::zero()))
}

/// The timestamp written when a refresh failed: already one minute past the
/// threshold, so every reader classifies the record as stale.
pub fn stale_backdate(now: DateTime<Utc>, threshold: Duration) -> DateTime<Utc> {
    let offset = threshold_delta(threshold)
        .checked_add(&TimeDelta::minutes(1))
        .unwrap_or(TimeDelta::MAX);
    now.checked_sub_signed(offset)
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
