//! Base entity shared by every registered class.
//!
//! # Responsibility
//! - Own identity (`id`), lifecycle timestamps and free-form attributes.
//! - Convert between the in-memory entity and its flat storage record.
//! - Render the human display form.
//!
//! # Invariants
//! - `id` and `kind` never change after construction.
//! - `created_at` is set once; `updated_at` only moves on `touch()`.
//! - Records are self-describing through the reserved `__class__` key.
//! - Timestamps are written as `TIMESTAMP_FORMAT` and read back identically.

use crate::model::class_kind::ClassKind;
use chrono::{NaiveDateTime, SubsecRound, Utc};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Flat attribute mapping as stored on disk, in insertion order.
pub type Record = Map<String, Value>;

pub type ModelResult<T> = Result<T, ModelError>;

/// Reserved record key naming the entity class.
pub const CLASS_KEY: &str = "__class__";

/// Attributes that `set_attribute` refuses to change.
pub const PROTECTED_KEYS: &[&str] = &["id", "created_at", "updated_at"];

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";
const TIMESTAMP_PARSE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Errors raised while rebuilding an entity from a stored record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    MissingId,
    InvalidTimestamp { field: &'static str, value: String },
}

impl Display for ModelError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingId => write!(f, "record has no string `id`"),
            Self::InvalidTimestamp { field, value } => {
                write!(f, "record field `{field}` is not a timestamp: `{value}`")
            }
        }
    }
}

impl Error for ModelError {}

/// One live instance of a registered class.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    kind: ClassKind,
    id: String,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
    attributes: Record,
}

impl Entity {
    /// Creates a fresh entity with a generated id and `created_at == updated_at`.
    pub fn new(kind: ClassKind) -> Self {
        let now = now();
        Self {
            kind,
            id: Uuid::new_v4().to_string(),
            created_at: now,
            updated_at: now,
            attributes: Record::new(),
        }
    }

    /// Rebuilds an entity from a stored record without regenerating identity.
    ///
    /// Every key is copied verbatim except `__class__`. An empty record yields
    /// a fresh entity. Missing timestamps default to the current time.
    ///
    /// # Errors
    /// - `MissingId` when a non-empty record has no string `id`.
    /// - `InvalidTimestamp` when `created_at`/`updated_at` cannot be parsed.
    pub fn from_record(kind: ClassKind, record: &Record) -> ModelResult<Self> {
        if record.keys().all(|key| key == CLASS_KEY) {
            return Ok(Self::new(kind));
        }

        let id = record
            .get("id")
            .and_then(Value::as_str)
            .ok_or(ModelError::MissingId)?
            .to_string();
        let now = now();
        let created_at = read_timestamp(record, "created_at")?.unwrap_or(now);
        let updated_at = read_timestamp(record, "updated_at")?.unwrap_or(now);

        let attributes = record
            .iter()
            .filter(|(key, _)| key.as_str() != CLASS_KEY && !PROTECTED_KEYS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Ok(Self {
            kind,
            id,
            created_at,
            updated_at,
            attributes,
        })
    }

    pub fn kind(&self) -> ClassKind {
        self.kind
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> NaiveDateTime {
        self.created_at
    }

    pub fn updated_at(&self) -> NaiveDateTime {
        self.updated_at
    }

    /// Composite store key `"<Class>.<id>"`.
    pub fn key(&self) -> String {
        storage_key(self.kind, &self.id)
    }

    /// Class-specific attributes, excluding identity and timestamps.
    pub fn attributes(&self) -> &Record {
        &self.attributes
    }

    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Sets one attribute. Returns `false` and leaves the entity untouched for
    /// protected or reserved keys.
    pub fn set_attribute(&mut self, key: impl Into<String>, value: Value) -> bool {
        let key = key.into();
        if is_protected_key(&key) || key == CLASS_KEY {
            return false;
        }
        self.attributes.insert(key, value);
        true
    }

    /// Refreshes `updated_at`. Called by the store right before persisting.
    pub fn touch(&mut self) {
        self.updated_at = now();
    }

    /// Flat storage record: identity, timestamps, attributes, then `__class__`.
    pub fn to_record(&self) -> Record {
        let mut record = Record::new();
        record.insert("id".to_string(), Value::String(self.id.clone()));
        record.insert(
            "created_at".to_string(),
            Value::String(format_timestamp(self.created_at)),
        );
        record.insert(
            "updated_at".to_string(),
            Value::String(format_timestamp(self.updated_at)),
        );
        for (key, value) in &self.attributes {
            record.insert(key.clone(), value.clone());
        }
        record.insert(
            CLASS_KEY.to_string(),
            Value::String(self.kind.name().to_string()),
        );
        record
    }

    /// Human display form: `[<Class>] (<id>) {"key": value, ...}`.
    ///
    /// Keys are sorted so equal attribute sets always render identically.
    pub fn to_display(&self) -> String {
        let record = self.to_record();
        let sorted: BTreeMap<&str, &Value> = record
            .iter()
            .filter(|(key, _)| key.as_str() != CLASS_KEY)
            .map(|(key, value)| (key.as_str(), value))
            .collect();
        let body = sorted
            .iter()
            .map(|(key, value)| format!("{}: {value}", Value::String((*key).to_string())))
            .collect::<Vec<_>>()
            .join(", ");
        format!("[{}] ({}) {{{body}}}", self.kind, self.id)
    }
}

impl Display for Entity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_display())
    }
}

/// Builds the composite store key for a class/id pair.
pub fn storage_key(kind: ClassKind, id: &str) -> String {
    format!("{}.{id}", kind.name())
}

/// Returns whether `key` names identity or lifecycle state.
pub fn is_protected_key(key: &str) -> bool {
    PROTECTED_KEYS.contains(&key)
}

pub fn format_timestamp(value: NaiveDateTime) -> String {
    value.format(TIMESTAMP_FORMAT).to_string()
}

fn now() -> NaiveDateTime {
    // Stored precision is microseconds; keep memory identical to disk.
    Utc::now().naive_utc().trunc_subsecs(6)
}

fn read_timestamp(record: &Record, field: &'static str) -> ModelResult<Option<NaiveDateTime>> {
    let Some(value) = record.get(field) else {
        return Ok(None);
    };
    let invalid = || ModelError::InvalidTimestamp {
        field,
        value: value.to_string(),
    };
    let text = value.as_str().ok_or_else(invalid)?;
    NaiveDateTime::parse_from_str(text, TIMESTAMP_PARSE_FORMAT)
        .map(Some)
        .map_err(|_| invalid())
}

#[cfg(test)]
mod tests {
    use super::{format_timestamp, Entity, ModelError, Record, CLASS_KEY};
    use crate::model::class_kind::ClassKind;
    use serde_json::{json, Value};

    fn record(value: Value) -> Record {
        value.as_object().expect("fixture must be an object").clone()
    }

    #[test]
    fn new_entity_has_matching_timestamps() {
        let entity = Entity::new(ClassKind::User);
        assert_eq!(entity.created_at(), entity.updated_at());
        assert!(entity.attributes().is_empty());
        assert_eq!(entity.key(), format!("User.{}", entity.id()));
    }

    #[test]
    fn to_record_is_self_describing() {
        let mut entity = Entity::new(ClassKind::City);
        entity.set_attribute("name", json!("Lagos"));
        let record = entity.to_record();

        assert_eq!(record["id"], json!(entity.id()));
        assert_eq!(record["name"], json!("Lagos"));
        assert_eq!(record[CLASS_KEY], json!("City"));
        let keys: Vec<&str> = record.keys().map(String::as_str).collect();
        assert_eq!(keys, ["id", "created_at", "updated_at", "name", CLASS_KEY]);
    }

    #[test]
    fn from_record_copies_identity_verbatim() {
        let stored = record(json!({
            "id": "abc-123",
            "created_at": "2017-09-28T21:03:54.052298",
            "updated_at": "2017-09-28T21:05:54.119427",
            "age": 30,
            "__class__": "User"
        }));

        let entity = Entity::from_record(ClassKind::User, &stored).unwrap();
        assert_eq!(entity.id(), "abc-123");
        assert_eq!(
            format_timestamp(entity.created_at()),
            "2017-09-28T21:03:54.052298"
        );
        assert_eq!(entity.attribute("age"), Some(&json!(30)));
        assert!(entity.attribute(CLASS_KEY).is_none());
        assert_eq!(entity.to_record(), stored);
    }

    #[test]
    fn from_empty_record_generates_fresh_identity() {
        let entity = Entity::from_record(ClassKind::Review, &Record::new()).unwrap();
        assert!(!entity.id().is_empty());
    }

    #[test]
    fn from_record_rejects_missing_id_and_bad_timestamps() {
        let missing = record(json!({ "name": "x" }));
        assert_eq!(
            Entity::from_record(ClassKind::State, &missing).unwrap_err(),
            ModelError::MissingId
        );

        let bad = record(json!({ "id": "1", "created_at": "yesterday" }));
        assert!(matches!(
            Entity::from_record(ClassKind::State, &bad).unwrap_err(),
            ModelError::InvalidTimestamp { field: "created_at", .. }
        ));
    }

    #[test]
    fn set_attribute_refuses_protected_keys() {
        let mut entity = Entity::new(ClassKind::Place);
        let id = entity.id().to_string();
        assert!(!entity.set_attribute("id", json!("other")));
        assert!(!entity.set_attribute("updated_at", json!("2000-01-01T00:00:00.000000")));
        assert!(!entity.set_attribute(CLASS_KEY, json!("User")));
        assert_eq!(entity.id(), id);
        assert!(entity.attributes().is_empty());
    }

    #[test]
    fn display_is_sorted_and_deterministic() {
        let stored = record(json!({
            "id": "42",
            "created_at": "2020-01-01T00:00:00.000000",
            "updated_at": "2020-01-01T00:00:00.000000",
            "zeta": "last",
            "age": 7,
            "__class__": "User"
        }));
        let entity = Entity::from_record(ClassKind::User, &stored).unwrap();
        assert_eq!(
            entity.to_display(),
            "[User] (42) {\"age\": 7, \"created_at\": \"2020-01-01T00:00:00.000000\", \
             \"id\": \"42\", \"updated_at\": \"2020-01-01T00:00:00.000000\", \"zeta\": \"last\"}"
        );
    }
}
