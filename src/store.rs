//! Typed key-value persistence boundary.
//!
//! All persisted state (settings snapshot, cached prayer entries, reminder
//! configuration) goes through the [`KeyValueStore`] trait so the scheduling
//! core never touches a concrete storage backend directly. Values are a
//! closed tagged type resolved at compile time by the caller; there is no
//! runtime type dispatch beyond matching [`StoreValue`].

use crate::error::{Result, VakitError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::debug;

/// A value that can be persisted in the store.
///
/// Closed set of primitive shapes; callers match on the variant they wrote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoreValue {
    /// Boolean flag.
    Bool(bool),
    /// Signed integer (epoch milliseconds, counters, hours/minutes).
    Int(i64),
    /// Floating-point number (coordinates).
    Float(f64),
    /// UTF-8 string (serialized snapshots and entries).
    Str(String),
    /// Sequence of strings.
    StrList(Vec<String>),
}

impl StoreValue {
    /// Returns the string payload, if this value is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer payload, if this value is an integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the boolean payload, if this value is a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

/// Scoped, persistent key-value storage.
///
/// Implementations must be safe to share across the foreground application
/// and background job invocations. Single-key operations only; no multi-key
/// transactions are assumed.
pub trait KeyValueStore: Send + Sync {
    /// Persist `value` under `key`, overwriting any prior value.
    fn save(&self, key: &str, value: StoreValue) -> Result<()>;

    /// Fetch the value stored under `key`, or `None` when absent.
    fn get(&self, key: &str) -> Result<Option<StoreValue>>;

    /// Remove the value stored under `key`. Removing an absent key is not
    /// an error.
    fn remove(&self, key: &str) -> Result<()>;

    /// List all keys starting with `prefix`.
    fn list_keys(&self, prefix: &str) -> Result<Vec<String>>;
}

/// File-backed [`KeyValueStore`] persisting a JSON map.
///
/// The whole map is loaded on open and rewritten on each mutation. A missing
/// file is an empty store. Defaults to `<config dir>/vakit/store.json`.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, StoreValue>>,
}

impl JsonFileStore {
    /// Open (or create) the store at the default location.
    ///
    /// # Errors
    ///
    /// Returns an error when no config directory can be determined or the
    /// existing file cannot be read or parsed.
    pub fn open_default() -> Result<Self> {
        let path = Self::default_path()
            .ok_or_else(|| VakitError::Store("cannot determine store path".to_owned()))?;
        Self::open(path)
    }

    /// Open (or create) the store at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error when the existing file cannot be read or parsed.
    pub fn open(path: PathBuf) -> Result<Self> {
        let entries = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| VakitError::Store(format!("cannot parse store file: {e}")))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(VakitError::Store(format!(
                    "cannot read store file {}: {e}",
                    path.display()
                )));
            }
        };

        debug!("opened key-value store at {}", path.display());
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Default path for the store file.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("vakit").join("store.json"))
    }

    fn flush(&self, entries: &BTreeMap<String, StoreValue>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| VakitError::Store(format!("cannot create store dir: {e}")))?;
        }

        let json = serde_json::to_string_pretty(entries)
            .map_err(|e| VakitError::Store(format!("cannot serialize store: {e}")))?;

        std::fs::write(&self.path, json)
            .map_err(|e| VakitError::Store(format!("cannot write store file: {e}")))?;

        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, StoreValue>> {
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl KeyValueStore for JsonFileStore {
    fn save(&self, key: &str, value: StoreValue) -> Result<()> {
        let mut entries = self.lock();
        entries.insert(key.to_owned(), value);
        self.flush(&entries)
    }

    fn get(&self, key: &str) -> Result<Option<StoreValue>> {
        Ok(self.lock().get(key).cloned())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.lock();
        if entries.remove(key).is_some() {
            self.flush(&entries)?;
        }
        Ok(())
    }

    fn list_keys(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .lock()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}
