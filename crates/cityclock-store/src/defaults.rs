//! File-backed key/value suite inside the app group container.
//!
//! Each suite is a single JSON object at `<suite_dir>/defaults.json`. Both
//! processes open the same file. There is no lock between them:
//! - reads go through `synchronize()` first, which re-reads the file,
//! - writes re-read, change one key, and replace the file atomically
//!   (write to a temp file, then rename), so keys written by the other
//!   process since our last read survive.
//!
//! A container that cannot be created or read is not fatal. Reads return
//! `None` and writes are logged no-ops.

use std::fs;
use std::path::{Path, PathBuf};

use cityclock_core::StoreError;
use parking_lot::Mutex;
use serde_json::{Map, Value};

const SUITE_FILE: &str = "defaults.json";

/// Key/value suite shared across processes.
#[derive(Debug)]
pub struct SharedDefaults {
    /// `None` when the container could not be set up.
    path: Option<PathBuf>,
    values: Mutex<Map<String, Value>>,
}

impl SharedDefaults {
    /// Open the suite stored in `suite_dir`, creating the directory if needed.
    pub fn open(suite_dir: &Path) -> Self {
        let path = match fs::create_dir_all(suite_dir) {
            Ok(()) => Some(suite_dir.join(SUITE_FILE)),
            Err(e) => {
                tracing::warn!(
                    "Shared container {} unavailable: {}",
                    suite_dir.display(),
                    e
                );
                None
            }
        };

        let defaults = Self {
            path,
            values: Mutex::new(Map::new()),
        };
        defaults.synchronize();
        defaults
    }

    /// A suite with no backing storage. Every read is empty.
    pub fn unavailable() -> Self {
        Self {
            path: None,
            values: Mutex::new(Map::new()),
        }
    }

    pub fn is_available(&self) -> bool {
        self.path.is_some()
    }

    /// Re-read the suite from disk.
    ///
    /// Returns false when the file could not be read or parsed; the in-memory
    /// view is then empty rather than stale.
    pub fn synchronize(&self) -> bool {
        match self.load() {
            Ok(values) => {
                *self.values.lock() = values;
                true
            }
            Err(e) => {
                tracing::warn!("Shared defaults synchronize failed: {}", e);
                self.values.lock().clear();
                false
            }
        }
    }

    /// Value for `key` as of the last synchronize or write.
    pub fn value(&self, key: &str) -> Option<Value> {
        self.values.lock().get(key).cloned()
    }

    /// Store `value` under `key` and write the suite through to disk.
    pub fn set_value(&self, key: &str, value: Value) {
        if let Err(e) = self.update(|values| {
            values.insert(key.to_string(), value);
        }) {
            tracing::warn!("Failed to write shared key {}: {}", key, e);
        }
    }

    pub fn remove(&self, key: &str) {
        if let Err(e) = self.update(|values| {
            values.remove(key);
        }) {
            tracing::warn!("Failed to remove shared key {}: {}", key, e);
        }
    }

    /// Read-modify-write of the whole suite.
    fn update(&self, change: impl FnOnce(&mut Map<String, Value>)) -> Result<(), StoreError> {
        let path = self.path.as_deref().ok_or_else(|| {
            StoreError::Unavailable("app group container is not configured".to_string())
        })?;

        let mut cached = self.values.lock();
        // A corrupt file is replaced rather than blocking every future write
        let mut values = self.load().unwrap_or_default();
        change(&mut values);

        let bytes = serde_json::to_vec_pretty(&values)?;
        let tmp = path.with_extension(format!("json.tmp-{}", std::process::id()));
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, path)?;

        *cached = values;
        Ok(())
    }

    fn load(&self) -> Result<Map<String, Value>, StoreError> {
        let path = self.path.as_deref().ok_or_else(|| {
            StoreError::Unavailable("app group container is not configured".to_string())
        })?;

        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_slice::<Value>(&bytes)? {
            Value::Object(map) => Ok(map),
            other => Err(StoreError::Corrupt {
                key: SUITE_FILE.to_string(),
                message: format!("expected an object, found {}", json_kind(&other)),
            }),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
