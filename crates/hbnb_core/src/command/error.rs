//! User-facing command errors.

use crate::repo::file_store::StoreError;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Validation failures reported to the user as a single line.
///
/// `Display` yields the exact console message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    MissingClassName,
    UnknownClass,
    MissingId,
    InstanceNotFound,
    MissingAttribute,
    MissingValue,
    MalformedBulkUpdate,
}

impl CommandError {
    /// Stable code used in log events.
    pub fn code(self) -> &'static str {
        match self {
            Self::MissingClassName => "missing_class_name",
            Self::UnknownClass => "unknown_class",
            Self::MissingId => "missing_id",
            Self::InstanceNotFound => "instance_not_found",
            Self::MissingAttribute => "missing_attribute",
            Self::MissingValue => "missing_value",
            Self::MalformedBulkUpdate => "malformed_bulk_update",
        }
    }
}

impl Display for CommandError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let message = match self {
            Self::MissingClassName => "** class name missing **",
            Self::UnknownClass => "** class doesn't exist **",
            Self::MissingId => "** instance id missing **",
            Self::InstanceNotFound => "** no instance found **",
            Self::MissingAttribute => "** attribute name missing **",
            Self::MissingValue => "** value missing **",
            Self::MalformedBulkUpdate => "Invalid Dictionary",
        };
        f.write_str(message)
    }
}

impl Error for CommandError {}

/// Internal dispatch outcome: recoverable command error or fatal store error.
#[derive(Debug)]
pub(crate) enum DispatchError {
    Command(CommandError),
    Store(StoreError),
}

impl From<CommandError> for DispatchError {
    fn from(value: CommandError) -> Self {
        Self::Command(value)
    }
}

impl From<StoreError> for DispatchError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}
