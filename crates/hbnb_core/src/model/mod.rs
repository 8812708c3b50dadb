//! Entity model and class registry.
//!
//! # Responsibility
//! - Define the entity shape shared by every registered class.
//! - Resolve class names to entity constructors without evaluating input.
//!
//! # Invariants
//! - Every entity is addressed by the composite key `"<Class>.<id>"`.
//! - The set of classes is closed at compile time.

pub mod class_kind;
pub mod entity;
