//! Reload signal throttling.
//!
//! A single last-signal timestamp. A non-forced request inside the cooldown
//! window is suppressed and remembered as pending; a forced request always
//! goes through and restarts the window. State is process-local and resets
//! on relaunch.

use chrono::{DateTime, TimeDelta, Utc};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ReloadThrottle {
    cooldown: TimeDelta,
    last_signal: Option<DateTime<Utc>>,
    pending: bool,
}

impl ReloadThrottle {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown: TimeDelta::from_std(cooldown).unwrap_or(TimeDelta::MAX),
            last_signal: None,
            pending: false,
        }
    }

    /// Decide whether a reload requested at `now` should be sent.
    ///
    /// Returns true and records `now` when it should.
    pub fn permit(&mut self, now: DateTime<Utc>, force: bool) -> bool {
        if force || self.cooled_down(now) {
            self.last_signal = Some(now);
            self.pending = false;
            true
        } else {
            self.pending = true;
            false
        }
    }

    /// True when a suppressed request can now be sent.
    pub fn permit_pending(&mut self, now: DateTime<Utc>) -> bool {
        self.pending && self.permit(now, false)
    }

    pub fn has_pending(&self) -> bool {
        self.pending
    }

    pub fn last_signal(&self) -> Option<DateTime<Utc>> {
        self.last_signal
    }

    fn cooled_down(&self, now: DateTime<Utc>) -> bool {
        match self.last_signal {
            None => true,
            Some(last) => now.signed_duration_since(last) >= self.cooldown,
        }
    }
}
