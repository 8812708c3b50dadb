//! JSON file-backed entity store.
//!
//! # Responsibility
//! - Hold every stored record keyed by `"<Class>.<id>"`, in insertion order.
//! - Load the backing file on open and rewrite it wholesale on flush.
//!
//! # Invariants
//! - Every held record is a JSON object with a registered `__class__`.
//! - Every loaded record materializes as an entity whose key is its own
//!   `"<Class>.<id>"`; corruption is reported at load, never mid-session.
//! - `flush()` writes a sibling temp file and renames it into place.
//! - Records are kept raw; entities are materialized by callers on demand.

use crate::model::class_kind::ClassKind;
use crate::model::entity::{storage_key, Entity, Record, CLASS_KEY};
use log::{debug, error, info};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

pub type StoreResult<T> = Result<T, StoreError>;

const TEMP_SUFFIX: &str = ".tmp";

/// Persistence failures. These are the only errors that abort a command loop.
#[derive(Debug)]
pub enum StoreError {
    Io { path: PathBuf, source: io::Error },
    Json(serde_json::Error),
    InvalidData(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "i/o error on `{}`: {source}", path.display()),
            Self::Json(err) => write!(f, "malformed store document: {err}"),
            Self::InvalidData(message) => write!(f, "invalid store data: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Json(err) => Some(err),
            Self::InvalidData(_) => None,
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

/// Authoritative record mapping persisted to a single JSON document.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    records: Record,
}

impl FileStore {
    /// Creates an empty, unloaded store bound to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            records: Record::new(),
        }
    }

    /// Creates a store bound to `path` and loads its current contents.
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let mut store = Self::new(path);
        store.load()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replaces in-memory state with the backing file contents.
    ///
    /// A missing or blank file yields an empty store.
    ///
    /// # Errors
    /// - `Io` when the file exists but cannot be read.
    /// - `Json` when the document is not valid JSON.
    /// - `InvalidData` when a record is not an object, names no registered
    ///   class, cannot be materialized or is stored under another key.
    pub fn load(&mut self) -> StoreResult<()> {
        let started_at = Instant::now();
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                self.records.clear();
                info!(
                    "event=store_load module=repo status=ok source=missing path={}",
                    self.path.display()
                );
                return Ok(());
            }
            Err(source) => {
                error!(
                    "event=store_load module=repo status=error error_code=read_failed path={} error={}",
                    self.path.display(),
                    source
                );
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        if text.trim().is_empty() {
            self.records.clear();
            info!(
                "event=store_load module=repo status=ok source=empty path={}",
                self.path.display()
            );
            return Ok(());
        }

        let records = match parse_document(&text) {
            Ok(records) => records,
            Err(err) => {
                error!(
                    "event=store_load module=repo status=error error_code=invalid_document path={} error={}",
                    self.path.display(),
                    err
                );
                return Err(err);
            }
        };
        self.records = records;
        info!(
            "event=store_load module=repo status=ok records={} duration_ms={}",
            self.records.len(),
            started_at.elapsed().as_millis()
        );
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterates stored records in insertion order, optionally filtered by class.
    pub fn all(&self, kind: Option<ClassKind>) -> impl Iterator<Item = (ClassKind, &Record)> {
        self.records.values().filter_map(move |value| {
            let record = value.as_object()?;
            let record_kind = record_kind(record)?;
            match kind {
                Some(wanted) if wanted != record_kind => None,
                _ => Some((record_kind, record)),
            }
        })
    }

    /// Number of records whose stored class is `kind`.
    pub fn count(&self, kind: ClassKind) -> usize {
        self.all(Some(kind)).count()
    }

    pub fn get(&self, kind: ClassKind, id: &str) -> Option<&Record> {
        self.records
            .get(&storage_key(kind, id))
            .and_then(Value::as_object)
    }

    pub fn contains(&self, kind: ClassKind, id: &str) -> bool {
        self.get(kind, id).is_some()
    }

    /// Inserts or replaces the record under `"<kind>.<id>"`.
    ///
    /// The reserved `__class__` field is forced to `kind`.
    pub fn put(&mut self, kind: ClassKind, id: &str, mut record: Record) {
        record.insert(
            CLASS_KEY.to_string(),
            Value::String(kind.name().to_string()),
        );
        self.records
            .insert(storage_key(kind, id), Value::Object(record));
    }

    /// Removes a record. Absent keys are a no-op; returns whether one was removed.
    pub fn delete(&mut self, kind: ClassKind, id: &str) -> bool {
        // shift_remove keeps the remaining records in insertion order.
        self.records.shift_remove(&storage_key(kind, id)).is_some()
    }

    /// Persists an entity: refresh `updated_at`, upsert its record, flush.
    pub fn save(&mut self, entity: &mut Entity) -> StoreResult<()> {
        entity.touch();
        self.put(entity.kind(), entity.id(), entity.to_record());
        self.flush()
    }

    /// Rewrites the backing file with the full in-memory document.
    pub fn flush(&self) -> StoreResult<()> {
        let started_at = Instant::now();
        let payload = serde_json::to_vec_pretty(&self.records)?;

        match write_atomically(&self.path, &payload) {
            Ok(()) => {
                debug!(
                    "event=store_flush module=repo status=ok records={} bytes={} duration_ms={}",
                    self.records.len(),
                    payload.len(),
                    started_at.elapsed().as_millis()
                );
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=store_flush module=repo status=error error_code=write_failed path={} error={}",
                    self.path.display(),
                    err
                );
                Err(err)
            }
        }
    }
}

/// Reads the class recorded under `__class__`, if it is registered.
pub fn record_kind(record: &Record) -> Option<ClassKind> {
    record
        .get(CLASS_KEY)
        .and_then(Value::as_str)
        .and_then(ClassKind::from_name)
}

fn parse_document(text: &str) -> StoreResult<Record> {
    let Value::Object(records) = serde_json::from_str::<Value>(text)? else {
        return Err(StoreError::InvalidData(
            "top-level value must be an object".to_string(),
        ));
    };

    for (key, value) in &records {
        let record = value.as_object().ok_or_else(|| {
            StoreError::InvalidData(format!("record `{key}` is not an object"))
        })?;
        let kind = record_kind(record).ok_or_else(|| {
            StoreError::InvalidData(format!("record `{key}` has no registered `{CLASS_KEY}`"))
        })?;
        let entity = Entity::from_record(kind, record)
            .map_err(|err| StoreError::InvalidData(format!("record `{key}` is invalid: {err}")))?;
        let expected = entity.key();
        if *key != expected {
            return Err(StoreError::InvalidData(format!(
                "record key `{key}` does not match `{expected}`"
            )));
        }
    }

    Ok(records)
}

fn write_atomically(path: &Path, payload: &[u8]) -> StoreResult<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_error(parent))?;
    }

    let temp_path = temp_path_for(path);
    let mut file = File::create(&temp_path).map_err(io_error(&temp_path))?;
    file.write_all(payload).map_err(io_error(&temp_path))?;
    file.sync_all().map_err(io_error(&temp_path))?;
    drop(file);

    if let Err(source) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(io_error(path)(source));
    }
    Ok(())
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> StoreError {
    let path = path.to_path_buf();
    move |source| StoreError::Io { path, source }
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(TEMP_SUFFIX);
    path.with_file_name(name)
}
