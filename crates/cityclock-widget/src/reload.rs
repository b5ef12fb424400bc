//! Widget side of the reload signal.
//!
//! The app bumps a generation counter in the shared suite. The widget keeps
//! the last generation it rendered and rebuilds when the stored one differs.

use std::sync::Arc;
use std::time::Duration;

use cityclock_store::{reload_generation, SharedDefaults};

#[derive(Debug)]
pub struct ReloadWatch {
    defaults: Arc<SharedDefaults>,
    seen: u64,
}

impl ReloadWatch {
    /// Start watching from the current generation.
    pub fn new(defaults: Arc<SharedDefaults>) -> Self {
        defaults.synchronize();
        let seen = reload_generation(&defaults);
        Self { defaults, seen }
    }

    pub fn seen(&self) -> u64 {
        self.seen
    }

    /// True once per new generation.
    pub fn changed(&mut self) -> bool {
        self.defaults.synchronize();
        let current = reload_generation(&self.defaults);
        if current == self.seen {
            return false;
        }
        tracing::debug!("Reload generation {} -> {}", self.seen, current);
        self.seen = current;
        true
    }

    /// Poll every `interval` until a new generation appears.
    pub async fn wait(&mut self, interval: Duration) {
        while !self.changed() {
            tokio::time::sleep(interval).await;
        }
    }
}
