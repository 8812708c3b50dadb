//! Closed registry of entity classes.
//!
//! # Responsibility
//! - Name every class the console accepts.
//! - Resolve user-supplied class names to constructors.
//!
//! # Invariants
//! - Resolution is exact, case-sensitive string membership against
//!   `CLASS_KINDS`; input text is never interpreted.
//! - `instantiate` is the only path from a class name to an `Entity`.

use crate::model::entity::{Entity, ModelError, Record};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Kind of a stored entity. Serialized under the reserved `__class__` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ClassKind {
    BaseModel,
    User,
    State,
    City,
    Amenity,
    Place,
    Review,
}

const CLASS_KINDS: &[ClassKind] = &[
    ClassKind::BaseModel,
    ClassKind::User,
    ClassKind::State,
    ClassKind::City,
    ClassKind::Amenity,
    ClassKind::Place,
    ClassKind::Review,
];

impl ClassKind {
    /// Returns every registered kind in declaration order.
    pub fn all() -> &'static [ClassKind] {
        CLASS_KINDS
    }

    /// Canonical class name as typed in commands and stored in records.
    pub fn name(self) -> &'static str {
        match self {
            Self::BaseModel => "BaseModel",
            Self::User => "User",
            Self::State => "State",
            Self::City => "City",
            Self::Amenity => "Amenity",
            Self::Place => "Place",
            Self::Review => "Review",
        }
    }

    /// Looks up a kind by its exact name.
    pub fn from_name(name: &str) -> Option<Self> {
        CLASS_KINDS.iter().copied().find(|kind| kind.name() == name)
    }
}

impl Display for ClassKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Registry lookup/construction errors.
#[derive(Debug, Clone, PartialEq)]
pub enum RegistryError {
    UnknownClass(String),
    Model(ModelError),
}

impl Display for RegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownClass(name) => write!(f, "unknown class `{name}`"),
            Self::Model(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RegistryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::UnknownClass(_) => None,
            Self::Model(err) => Some(err),
        }
    }
}

impl From<ModelError> for RegistryError {
    fn from(value: ModelError) -> Self {
        Self::Model(value)
    }
}

/// Returns whether `name` is one of the registered class names.
pub fn is_registered(name: &str) -> bool {
    ClassKind::from_name(name).is_some()
}

/// Builds an entity of the named class.
///
/// With `record = None` (or an empty record) a fresh entity is created;
/// otherwise the record is copied verbatim onto the entity.
///
/// # Errors
/// - `UnknownClass` when `name` is outside the registered set.
/// - `Model` when a reconstruction record lacks identity or has bad timestamps.
pub fn instantiate(name: &str, record: Option<&Record>) -> Result<Entity, RegistryError> {
    let kind =
        ClassKind::from_name(name).ok_or_else(|| RegistryError::UnknownClass(name.to_string()))?;
    match record {
        Some(record) => Ok(Entity::from_record(kind, record)?),
        None => Ok(Entity::new(kind)),
    }
}

#[cfg(test)]
mod tests {
    use super::{instantiate, is_registered, ClassKind, RegistryError};

    #[test]
    fn names_round_trip_through_lookup() {
        for kind in ClassKind::all() {
            assert_eq!(ClassKind::from_name(kind.name()), Some(*kind));
        }
        assert_eq!(ClassKind::all().len(), 7);
    }

    #[test]
    fn lookup_is_exact_and_case_sensitive() {
        assert!(is_registered("User"));
        assert!(!is_registered("user"));
        assert!(!is_registered(" User"));
        assert!(!is_registered("User()"));
        assert!(!is_registered(""));
    }

    #[test]
    fn instantiate_rejects_unknown_names() {
        let err = instantiate("__import__('os')", None).expect_err("must not resolve");
        assert_eq!(
            err,
            RegistryError::UnknownClass("__import__('os')".to_string())
        );
    }

    #[test]
    fn instantiate_builds_fresh_entity() {
        let entity = instantiate("Place", None).expect("Place is registered");
        assert_eq!(entity.kind(), ClassKind::Place);
        assert!(!entity.id().is_empty());
    }
}
