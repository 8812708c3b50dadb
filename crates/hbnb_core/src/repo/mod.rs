//! Persistence layer for entity records.
//!
//! # Responsibility
//! - Own the authoritative composite-key to record mapping.
//! - Load it from and flush it to the backing JSON file.
//!
//! # Invariants
//! - Every mutating command ends with a full-document flush.
//! - A flush never leaves a partially written backing file.

pub mod file_store;
