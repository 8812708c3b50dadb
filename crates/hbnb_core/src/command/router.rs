//! Single dispatcher for normalized console commands.
//!
//! # Responsibility
//! - Validate canonical invocations against the class registry and store.
//! - Execute create/show/destroy/all/count/update and format their reply.
//!
//! # Invariants
//! - Validation order is fixed: class missing, class unknown, id missing,
//!   instance not found, then (update only) attribute missing, value missing.
//!   The first failing check is the only one reported.
//! - Command errors become a reply line; only store errors escape.
//! - A rejected bulk update leaves the store untouched.

use crate::command::error::{CommandError, DispatchError};
use crate::command::literal::parse_mapping;
use crate::command::parse::{is_quoted, parse_line, unquote, Invocation, ParsedLine, Verb};
use crate::model::class_kind::{instantiate, ClassKind, RegistryError};
use crate::model::entity::{is_protected_key, Entity, Record};
use crate::repo::file_store::{FileStore, StoreError, StoreResult};
use log::{debug, info};
use serde_json::{Number, Value};

type DispatchResult = Result<Option<String>, DispatchError>;

/// What the shell should do after one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Nothing to print.
    Silent,
    /// Print this text followed by a newline.
    Line(String),
    /// Stop reading input; `newline` asks for a trailing blank line first.
    Exit { newline: bool },
}

/// Routes console lines to store operations.
pub struct CommandRouter<'store> {
    store: &'store mut FileStore,
}

impl<'store> CommandRouter<'store> {
    pub fn new(store: &'store mut FileStore) -> Self {
        Self { store }
    }

    /// Normalizes and executes one input line in either syntax.
    ///
    /// # Errors
    /// Returns `StoreError` only when persisting or reading stored data fails.
    pub fn handle_line(&mut self, line: &str) -> StoreResult<Reply> {
        match parse_line(line) {
            ParsedLine::Empty => Ok(Reply::Silent),
            ParsedLine::Unknown(text) => {
                debug!("event=command module=command status=rejected error_code=unknown_syntax");
                Ok(Reply::Line(format!("** Unknown syntax: {text} **")))
            }
            ParsedLine::Invocation(invocation) => self.execute(&invocation),
        }
    }

    /// Executes an already normalized invocation.
    pub fn execute(&mut self, invocation: &Invocation) -> StoreResult<Reply> {
        let args = invocation.args.as_slice();
        let outcome = match invocation.verb {
            Verb::Create => self.create(args),
            Verb::Show => self.show(args),
            Verb::Destroy => self.destroy(args),
            Verb::All => self.all(args),
            Verb::Count => self.count(args),
            Verb::Update => self.update(args),
            Verb::Help => Ok(Some(help(args))),
            Verb::Quit => return Ok(Reply::Exit { newline: false }),
            Verb::Eof => return Ok(Reply::Exit { newline: true }),
        };

        match outcome {
            Ok(Some(text)) => Ok(Reply::Line(text)),
            Ok(None) => Ok(Reply::Silent),
            Err(DispatchError::Command(err)) => {
                debug!(
                    "event=command module=command status=rejected verb={} error_code={}",
                    invocation.verb,
                    err.code()
                );
                Ok(Reply::Line(err.to_string()))
            }
            Err(DispatchError::Store(err)) => Err(err),
        }
    }

    fn create(&mut self, args: &[String]) -> DispatchResult {
        let name = args.first().ok_or(CommandError::MissingClassName)?;
        let mut entity = instantiate(&unquote(name), None).map_err(|err| match err {
            RegistryError::UnknownClass(_) => DispatchError::Command(CommandError::UnknownClass),
            RegistryError::Model(err) => {
                DispatchError::Store(StoreError::InvalidData(err.to_string()))
            }
        })?;
        self.store.save(&mut entity)?;
        info!(
            "event=entity_create module=command status=ok class={} id={}",
            entity.kind(),
            entity.id()
        );
        Ok(Some(entity.id().to_string()))
    }

    fn show(&self, args: &[String]) -> DispatchResult {
        let (kind, id) = self.require_instance(args)?;
        let entity = self.materialize(kind, &id)?;
        Ok(Some(entity.to_display()))
    }

    fn destroy(&mut self, args: &[String]) -> DispatchResult {
        let (kind, id) = self.require_instance(args)?;
        self.store.delete(kind, &id);
        self.store.flush()?;
        info!(
            "event=entity_destroy module=command status=ok class={} id={}",
            kind, id
        );
        Ok(None)
    }

    fn all(&self, args: &[String]) -> DispatchResult {
        let filter = match args.first() {
            Some(name) => Some(ClassKind::from_name(&unquote(name)).ok_or(CommandError::UnknownClass)?),
            None => None,
        };
        let rendered = self
            .store
            .all(filter)
            .map(|(kind, record)| entity_from(kind, record).map(|entity| entity.to_display()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Some(format!("[{}]", rendered.join(", "))))
    }

    fn count(&self, args: &[String]) -> DispatchResult {
        let kind = require_class(args)?;
        Ok(Some(self.store.count(kind).to_string()))
    }

    fn update(&mut self, args: &[String]) -> DispatchResult {
        let (kind, id) = self.require_instance(args)?;
        let attribute = args.get(2).ok_or(CommandError::MissingAttribute)?;
        let value = args.get(3).ok_or(CommandError::MissingValue)?;

        let attribute = unquote(attribute);
        if is_protected_key(&attribute) {
            return Ok(None);
        }

        let tail = args[2..].join(" ");
        let changes: Vec<(String, Value)> = if looks_like_mapping(&tail) {
            parse_mapping(&tail)
                .map_err(|_| CommandError::MalformedBulkUpdate)?
                .into_iter()
                .collect()
        } else {
            vec![(attribute, parse_scalar(value))]
        };

        let mut entity = self.materialize(kind, &id)?;
        let mut applied = 0usize;
        for (key, value) in changes {
            if entity.set_attribute(key, value) {
                applied += 1;
            }
        }
        if applied == 0 {
            return Ok(None);
        }

        self.store.save(&mut entity)?;
        info!(
            "event=entity_update module=command status=ok class={} id={} attributes={}",
            kind, id, applied
        );
        Ok(None)
    }

    fn require_instance(&self, args: &[String]) -> Result<(ClassKind, String), CommandError> {
        let kind = require_class(args)?;
        let id = args.get(1).map(|id| unquote(id)).ok_or(CommandError::MissingId)?;
        if !self.store.contains(kind, &id) {
            return Err(CommandError::InstanceNotFound);
        }
        Ok((kind, id))
    }

    fn materialize(&self, kind: ClassKind, id: &str) -> Result<Entity, DispatchError> {
        let record = self
            .store
            .get(kind, id)
            .ok_or(CommandError::InstanceNotFound)?;
        entity_from(kind, record)
    }
}

fn require_class(args: &[String]) -> Result<ClassKind, CommandError> {
    let name = args.first().ok_or(CommandError::MissingClassName)?;
    ClassKind::from_name(&unquote(name)).ok_or(CommandError::UnknownClass)
}

fn entity_from(kind: ClassKind, record: &Record) -> Result<Entity, DispatchError> {
    instantiate(kind.name(), Some(record)).map_err(|err| {
        DispatchError::Store(StoreError::InvalidData(format!(
            "stored {kind} record cannot be materialized: {err}"
        )))
    })
}

// Only a leading brace selects the bulk form; `x}` is an ordinary value.
fn looks_like_mapping(text: &str) -> bool {
    text.starts_with('{')
}

/// Types a simple-form value: quoted text stays a string, otherwise integer,
/// then finite float, else the raw text.
fn parse_scalar(token: &str) -> Value {
    if is_quoted(token) {
        return Value::String(unquote(token));
    }
    if let Ok(value) = token.parse::<i64>() {
        return Value::Number(value.into());
    }
    token
        .parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(token.to_string()))
}

fn help(args: &[String]) -> String {
    let Some(topic) = args.first() else {
        let names = Verb::all()
            .iter()
            .map(|verb| verb.name())
            .collect::<Vec<_>>()
            .join("  ");
        return format!("Documented commands (type help <topic>):\n{names}");
    };

    let text = match Verb::from_name(topic) {
        Some(Verb::Create) => "Creates an instance, saves it and prints its id.\n  create <Class>",
        Some(Verb::Show) => "Prints an instance by class and id.\n  show <Class> <id> | <Class>.show(<id>)",
        Some(Verb::Destroy) => {
            "Deletes an instance by class and id.\n  destroy <Class> <id> | <Class>.destroy(<id>)"
        }
        Some(Verb::All) => "Prints all instances, optionally of one class.\n  all [<Class>] | <Class>.all()",
        Some(Verb::Count) => "Prints the number of instances of a class.\n  count <Class> | <Class>.count()",
        Some(Verb::Update) => {
            "Sets attributes on an instance.\n  update <Class> <id> <name> <value>\n  update <Class> <id> {<name>: <value>, ...}\n  <Class>.update(<id>, <name>, <value>) | <Class>.update(<id>, {...})"
        }
        Some(Verb::Help) => "Lists commands or describes one.\n  help [<command>]",
        Some(Verb::Quit) => "Quit command to exit the program.",
        Some(Verb::Eof) => "Exits the program at end of input.",
        None => return format!("*** No help on {topic}"),
    };
    text.to_string()
}
