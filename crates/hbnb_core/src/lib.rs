//! Core of the hbnb console.
//! Owns the entity model, the JSON file store and the command router; the
//! binary crate only reads lines and prints replies.

pub mod command;
pub mod logging;
pub mod model;
pub mod repo;

pub use command::error::CommandError;
pub use command::literal::{parse_mapping, LiteralError};
pub use command::parse::{parse_line, Invocation, ParsedLine, Verb};
pub use command::router::{CommandRouter, Reply};
pub use logging::{default_log_level, init_logging, LogSettings, LoggingError};
pub use model::class_kind::{instantiate, is_registered, ClassKind, RegistryError};
pub use model::entity::{Entity, ModelError, Record, CLASS_KEY};
pub use repo::file_store::{FileStore, StoreError, StoreResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
