//! Command-line normalization.
//!
//! # Responsibility
//! - Tokenize verb-first input (`show User 1234`).
//! - Rewrite dot-call input (`User.show("1234")`) into verb-first text.
//! - Produce one canonical `Invocation` for both syntaxes.
//!
//! # Invariants
//! - Tokens keep their raw text; quotes are stripped only by `unquote`.
//! - A dot call is re-tokenized by the verb-first tokenizer, so both syntaxes
//!   reach dispatch with identical argument vectors.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::{Display, Formatter};

static DOT_CALL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([^.]*)\.([A-Za-z_][A-Za-z0-9_]*)\((.*)\)$").expect("valid dot call regex")
});

/// Commands understood by the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Create,
    Show,
    Destroy,
    All,
    Count,
    Update,
    Help,
    Quit,
    Eof,
}

const VERBS: &[Verb] = &[
    Verb::Create,
    Verb::Show,
    Verb::Destroy,
    Verb::All,
    Verb::Count,
    Verb::Update,
    Verb::Help,
    Verb::Quit,
    Verb::Eof,
];

impl Verb {
    pub fn all() -> &'static [Verb] {
        VERBS
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Show => "show",
            Self::Destroy => "destroy",
            Self::All => "all",
            Self::Count => "count",
            Self::Update => "update",
            Self::Help => "help",
            Self::Quit => "quit",
            Self::Eof => "EOF",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        VERBS.iter().copied().find(|verb| verb.name() == name)
    }

    /// Whether `<Class>.<verb>(...)` is accepted for this verb.
    pub fn accepts_dot_call(self) -> bool {
        matches!(
            self,
            Self::Create | Self::Show | Self::Destroy | Self::All | Self::Count | Self::Update
        )
    }
}

impl Display for Verb {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Canonical command: a verb plus its raw argument tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub verb: Verb,
    pub args: Vec<String>,
}

/// Result of normalizing one input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedLine {
    Empty,
    Invocation(Invocation),
    /// Neither syntax matched; carries the trimmed line for the error reply.
    Unknown(String),
}

/// Normalizes one input line in either syntax.
pub fn parse_line(line: &str) -> ParsedLine {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return ParsedLine::Empty;
    }

    if let Some(invocation) = parse_verb_first(trimmed) {
        return ParsedLine::Invocation(invocation);
    }

    rewrite_dot_call(trimmed)
        .and_then(|rewritten| parse_verb_first(&rewritten))
        .filter(|invocation| invocation.verb.accepts_dot_call())
        .map(ParsedLine::Invocation)
        .unwrap_or_else(|| ParsedLine::Unknown(trimmed.to_string()))
}

/// Parses `<verb> [args...]`; `None` when the first token is not a known verb.
pub fn parse_verb_first(line: &str) -> Option<Invocation> {
    let mut tokens = tokenize(line).into_iter();
    let verb = Verb::from_name(&tokens.next()?)?;
    Some(Invocation {
        verb,
        args: tokens.collect(),
    })
}

/// Rewrites `<Class>.<verb>(<a>, <b>)` as `"<verb> <Class> <a> <b>"`.
///
/// The class is everything before the first `.` and may be empty, in which
/// case the rewritten line carries no class argument. Arguments are split on commas outside quotes and brackets, trimmed, and
/// empty arguments are dropped. Returns `None` when the line is not a call.
pub fn rewrite_dot_call(line: &str) -> Option<String> {
    let captures = DOT_CALL_RE.captures(line.trim())?;
    let class_name = captures.get(1)?.as_str().trim();
    let verb = captures.get(2)?.as_str();
    let args = captures.get(3)?.as_str();

    let mut parts = vec![verb.to_string()];
    if !class_name.is_empty() {
        parts.push(class_name.to_string());
    }
    parts.extend(
        split_call_args(args)
            .into_iter()
            .map(|arg| arg.trim().to_string())
            .filter(|arg| !arg.is_empty()),
    );
    Some(parts.join(" "))
}

/// Splits on whitespace, keeping quoted runs (with their quotes) in one token.
pub fn tokenize(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for ch in line.chars() {
        if let Some(open) = quote {
            current.push(ch);
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == open {
                quote = None;
            }
            continue;
        }

        if ch.is_whitespace() {
            if in_token {
                tokens.push(std::mem::take(&mut current));
                in_token = false;
            }
            continue;
        }

        if ch == '"' || ch == '\'' {
            quote = Some(ch);
        }
        current.push(ch);
        in_token = true;
    }

    if in_token {
        tokens.push(current);
    }
    tokens
}

/// Returns whether `token` is wholly wrapped in matching quotes.
pub fn is_quoted(token: &str) -> bool {
    let mut chars = token.chars();
    match (chars.next(), chars.next_back()) {
        (Some(first), Some(last)) => (first == '"' || first == '\'') && first == last,
        _ => false,
    }
}

/// Strips one level of surrounding quotes and resolves `\<quote>` and `\\`.
pub fn unquote(token: &str) -> String {
    if !is_quoted(token) {
        return token.to_string();
    }
    let quote = token.chars().next().unwrap_or('"');
    let inner = &token[1..token.len() - 1];

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some(next) if next == quote || next == '\\' => out.push(next),
                Some(next) => {
                    out.push('\\');
                    out.push(next);
                }
                None => out.push('\\'),
            }
        } else {
            out.push(ch);
        }
    }
    out
}

fn split_call_args(args: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start = 0;

    for (index, ch) in args.char_indices() {
        if let Some(open) = quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == open {
                quote = None;
            }
            continue;
        }
        match ch {
            '"' | '\'' => quote = Some(ch),
            '{' | '[' => depth += 1,
            '}' | ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&args[start..index]);
                start = index + 1;
            }
            _ => {}
        }
    }
    parts.push(&args[start..]);
    parts
}
