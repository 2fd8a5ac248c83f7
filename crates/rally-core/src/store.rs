use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::CoreError;

/// JSON-valued key-value persistence contract.
///
/// The surrounding application injects an implementation; the core never
/// touches a storage backend directly. Read failures are absorbed by the
/// callers (falling back to documented defaults), write failures are
/// reported but never fatal.
///
/// # Example
/// ```
/// use rally_core::store::{KeyValueStore, MemoryStore};
/// let mut store = MemoryStore::new();
/// store.set("k", serde_json::json!(1)).unwrap();
/// assert_eq!(store.get("k"), Some(serde_json::json!(1)));
/// ```
pub trait KeyValueStore: Send {
    /// Return the stored value for `key`, or `None` if absent.
    fn get(&self, key: &str) -> Option<Value>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    /// Returns an error if the backend cannot persist the value.
    fn set(&mut self, key: &str, value: Value) -> Result<()>;
}

/// Deserialize the value under `key`, falling back to `T::default()` when
/// the key is absent or the stored value does not match the expected shape.
pub fn read_or_default<T: DeserializeOwned + Default>(
    store: &dyn KeyValueStore,
    key: &str,
) -> T {
    match store.get(key) {
        None => T::default(),
        Some(value) => serde_json::from_value(value).unwrap_or_else(|err| {
            let reason = CoreError::MalformedValue {
                key: key.to_string(),
            };
            log::warn!("{reason}, using defaults: {err}");
            T::default()
        }),
    }
}

/// Serialize `value` and store it under `key`, logging instead of
/// propagating on failure.
pub fn write_logged<T: Serialize>(store: &mut dyn KeyValueStore, key: &str, value: &T) {
    match serde_json::to_value(value) {
        Ok(json) => {
            if let Err(err) = store.set(key, json) {
                log::error!("failed to persist \"{key}\": {err}");
            }
        }
        Err(err) => log::error!("failed to serialize \"{key}\": {err}"),
    }
}

/// In-memory store. Default backend for tests and for hosts that manage
/// persistence themselves.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: HashMap<String, Value>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) -> Result<()> {
        self.values.insert(key.to_string(), value);
        Ok(())
    }
}

/// Write-through store backed by a single JSON document on disk.
///
/// The whole document is loaded once at open and rewritten on every `set`.
/// A missing or unreadable file opens as empty rather than failing: the
/// persisted summaries are reconstructible and never worth refusing to
/// start over.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    values: HashMap<String, Value>,
}

impl JsonFileStore {
    /// Open the store at `path`, loading any existing document.
    #[must_use]
    pub fn open(path: &Path) -> Self {
        let values = match std::fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str::<HashMap<String, Value>>(&content) {
                Ok(values) => values,
                Err(err) => {
                    log::warn!("corrupt store at {}, starting empty: {err}", path.display());
                    HashMap::new()
                }
            },
            Err(err) => {
                log::debug!("no store at {} ({err}), starting empty", path.display());
                HashMap::new()
            }
        };
        Self {
            path: path.to_path_buf(),
            values,
        }
    }

    fn flush(&self) -> Result<()> {
        let content = serde_json::to_string_pretty(&self.values)
            .map_err(|err| CoreError::Storage(err.to_string()))?;
        std::fs::write(&self.path, content).map_err(|err| {
            CoreError::Storage(format!("writing {}: {err}", self.path.display()))
        })?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) -> Result<()> {
        self.values.insert(key.to_string(), value);
        self.flush()
    }
}
