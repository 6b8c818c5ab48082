//! Event Store
//!
//! Flat-file persistence for call events. The backing file always holds a
//! JSON array: a missing file, unparseable content or a non-array document is
//! reset to `[]` before use.
//!
//! Writes go to a temporary file in the same directory that is renamed over
//! the store, so readers never observe a partially written list.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde_json::Value;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error during event store operation: {0}")]
    IoError(#[from] io::Error),

    #[error("Failed to serialize events: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Event store lock poisoned")]
    LockPoisoned,

    #[error("Event store task failed: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),
}

/// Storage backend for the ordered list of call events.
///
/// Every mutation replaces the whole list; there is no per-event update or
/// delete.
pub trait EventStore: Send + Sync {
    /// Make sure the backing storage holds a valid (possibly empty) list.
    fn ensure(&self) -> Result<(), StoreError>;

    /// Whether the backing storage can be read, without modifying it.
    fn is_readable(&self) -> bool;

    /// Return every stored event in insertion order.
    fn load_all(&self) -> Result<Vec<Value>, StoreError>;

    /// Replace the stored list with `items`.
    fn save_all(&self, items: &[Value]) -> Result<(), StoreError>;

    /// Append one event, returning the new total.
    fn append(&self, item: Value) -> Result<usize, StoreError>;

    /// Append several events in order, returning the new total.
    fn extend(&self, items: Vec<Value>) -> Result<usize, StoreError>;

    /// Drop every stored event.
    fn clear(&self) -> Result<(), StoreError>;
}

/// Event store backed by a single pretty-printed JSON file.
pub struct JsonFileStore {
    path: PathBuf,
    // Held by every write, including self-healing resets
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> Result<MutexGuard<'_, ()>, StoreError> {
        self.write_lock.lock().map_err(|_| StoreError::LockPoisoned)
    }

    /// Read the file, returning `None` when it is missing or not a JSON array.
    fn read_valid(&self) -> Result<Option<Vec<Value>>, StoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("Event store {} does not exist yet", self.path.display());
                return Ok(None);
            }
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                warn!("Event store {} is not valid UTF-8", self.path.display());
                return Ok(None);
            }
            Err(e) => return Err(StoreError::IoError(e)),
        };

        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Array(items)) => Ok(Some(items)),
            Ok(other) => {
                warn!(
                    "Event store {} holds a JSON {} instead of a list",
                    self.path.display(),
                    json_kind(&other)
                );
                Ok(None)
            }
            Err(e) => {
                warn!("Event store {} is not valid JSON: {}", self.path.display(), e);
                Ok(None)
            }
        }
    }

    /// Load the list, healing the file if needed. Caller holds `write_lock`.
    fn load_locked(&self) -> Result<Vec<Value>, StoreError> {
        match self.read_valid()? {
            Some(items) => Ok(items),
            None => {
                warn!("Resetting event store {} to an empty list", self.path.display());
                self.write_items(&[])?;
                Ok(Vec::new())
            }
        }
    }

    fn write_items(&self, items: &[Value]) -> Result<(), StoreError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let body = serde_json::to_string_pretty(items)?;
        let mut staged = NamedTempFile::new_in(dir)?;
        staged.write_all(body.as_bytes())?;
        staged.as_file().sync_all()?;
        staged.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

impl EventStore for JsonFileStore {
    fn ensure(&self) -> Result<(), StoreError> {
        if self.read_valid()?.is_some() {
            return Ok(());
        }
        // Another writer may have replaced the file since the first read
        let _guard = self.lock()?;
        self.load_locked().map(|_| ())
    }

    fn is_readable(&self) -> bool {
        match fs::metadata(&self.path) {
            Ok(meta) => meta.is_file() && fs::File::open(&self.path).is_ok(),
            Err(e) => e.kind() == io::ErrorKind::NotFound,
        }
    }

    fn load_all(&self) -> Result<Vec<Value>, StoreError> {
        if let Some(items) = self.read_valid()? {
            return Ok(items);
        }
        let _guard = self.lock()?;
        self.load_locked()
    }

    fn save_all(&self, items: &[Value]) -> Result<(), StoreError> {
        let _guard = self.lock()?;
        self.write_items(items)
    }

    fn append(&self, item: Value) -> Result<usize, StoreError> {
        self.extend(vec![item])
    }

    fn extend(&self, new_items: Vec<Value>) -> Result<usize, StoreError> {
        let _guard = self.lock()?;

        let mut items = self.load_locked()?;
        items.extend(new_items);
        self.write_items(&items)?;
        Ok(items.len())
    }

    fn clear(&self) -> Result<(), StoreError> {
        let _guard = self.lock()?;
        self.write_items(&[])
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
