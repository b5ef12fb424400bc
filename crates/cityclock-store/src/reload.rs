//! Widget reload signal.
//!
//! The app cannot call into the widget process. It asks for a reload by
//! bumping a generation counter in the shared suite; the widget compares the
//! counter against the last generation it rendered.

use std::sync::Arc;

use serde_json::Value;

use crate::defaults::SharedDefaults;
use crate::store::keys;

/// Asks the widget to rebuild its timeline.
pub trait TimelineReloader: Send + Sync {
    fn reload_all_timelines(&self);
}

/// Reload signal carried through the shared container.
#[derive(Debug, Clone)]
pub struct ContainerReloader {
    defaults: Arc<SharedDefaults>,
}

impl ContainerReloader {
    pub fn new(defaults: Arc<SharedDefaults>) -> Self {
        Self { defaults }
    }
}

impl TimelineReloader for ContainerReloader {
    fn reload_all_timelines(&self) {
        self.defaults.synchronize();
        let next = reload_generation(&self.defaults).wrapping_add(1);
        self.defaults.set_value(keys::RELOAD_GENERATION, Value::from(next));
        tracing::info!("Requested widget timeline reload (generation {})", next);
    }
}

/// Current reload generation as of the last synchronize; 0 if never signalled.
pub fn reload_generation(defaults: &SharedDefaults) -> u64 {
    defaults
        .value(keys::RELOAD_GENERATION)
        .and_then(|v| v.as_u64())
        .unwrap_or(0)
}
