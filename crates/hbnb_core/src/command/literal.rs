//! Strict parser for mapping literals typed at the console.
//!
//! Accepts a relaxed JSON dialect: single or double quoted strings, bare
//! identifier keys, `True`/`False`/`None` spellings and trailing commas.
//! The input is only ever parsed as data.

use crate::model::entity::Record;
use serde_json::{Number, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Parse failure with the character offset where it was detected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralError {
    pub offset: usize,
    pub message: String,
}

impl LiteralError {
    fn new(offset: usize, message: impl Into<String>) -> Self {
        Self {
            offset,
            message: message.into(),
        }
    }
}

impl Display for LiteralError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at offset {}", self.message, self.offset)
    }
}

impl Error for LiteralError {}

/// Parses `{key: value, ...}` into an ordered record.
///
/// # Errors
/// Returns `LiteralError` for unbalanced brackets, bad tokens, or trailing text.
pub fn parse_mapping(text: &str) -> Result<Record, LiteralError> {
    let mut parser = Parser::new(text);
    parser.skip_whitespace();
    if parser.peek() != Some('{') {
        return Err(LiteralError::new(parser.pos, "expected `{`"));
    }
    let Value::Object(record) = parser.parse_value()? else {
        return Err(LiteralError::new(0, "expected mapping"));
    };
    parser.skip_whitespace();
    if parser.pos != parser.chars.len() {
        return Err(LiteralError::new(parser.pos, "unexpected trailing text"));
    }
    Ok(record)
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += 1;
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, wanted: char) -> Result<(), LiteralError> {
        match self.bump() {
            Some(ch) if ch == wanted => Ok(()),
            Some(ch) => Err(LiteralError::new(
                self.pos - 1,
                format!("expected `{wanted}`, found `{ch}`"),
            )),
            None => Err(LiteralError::new(
                self.pos,
                format!("expected `{wanted}`, found end of input"),
            )),
        }
    }

    fn parse_value(&mut self) -> Result<Value, LiteralError> {
        self.skip_whitespace();
        match self.peek() {
            Some('{') => self.parse_object(),
            Some('[') => self.parse_array(),
            Some('"') | Some('\'') => self.parse_string().map(Value::String),
            Some(ch) if ch == '-' || ch == '+' || ch == '.' || ch.is_ascii_digit() => {
                self.parse_number()
            }
            Some(ch) if ch.is_alphabetic() || ch == '_' => {
                let start = self.pos;
                match self.parse_identifier().as_str() {
                    "true" | "True" => Ok(Value::Bool(true)),
                    "false" | "False" => Ok(Value::Bool(false)),
                    "null" | "None" => Ok(Value::Null),
                    other => Err(LiteralError::new(
                        start,
                        format!("unexpected identifier `{other}`"),
                    )),
                }
            }
            Some(ch) => Err(LiteralError::new(self.pos, format!("unexpected `{ch}`"))),
            None => Err(LiteralError::new(self.pos, "unexpected end of input")),
        }
    }

    fn parse_object(&mut self) -> Result<Value, LiteralError> {
        self.expect('{')?;
        let mut record = Record::new();
        loop {
            self.skip_whitespace();
            if self.peek() == Some('}') {
                self.pos += 1;
                return Ok(Value::Object(record));
            }

            let key = self.parse_key()?;
            self.skip_whitespace();
            self.expect(':')?;
            let value = self.parse_value()?;
            record.insert(key, value);

            self.skip_whitespace();
            match self.bump() {
                Some(',') => continue,
                Some('}') => return Ok(Value::Object(record)),
                Some(ch) => {
                    return Err(LiteralError::new(
                        self.pos - 1,
                        format!("expected `,` or `}}`, found `{ch}`"),
                    ))
                }
                None => return Err(LiteralError::new(self.pos, "unterminated mapping")),
            }
        }
    }

    fn parse_array(&mut self) -> Result<Value, LiteralError> {
        self.expect('[')?;
        let mut items = Vec::new();
        loop {
            self.skip_whitespace();
            if self.peek() == Some(']') {
                self.pos += 1;
                return Ok(Value::Array(items));
            }

            items.push(self.parse_value()?);

            self.skip_whitespace();
            match self.bump() {
                Some(',') => continue,
                Some(']') => return Ok(Value::Array(items)),
                Some(ch) => {
                    return Err(LiteralError::new(
                        self.pos - 1,
                        format!("expected `,` or `]`, found `{ch}`"),
                    ))
                }
                None => return Err(LiteralError::new(self.pos, "unterminated list")),
            }
        }
    }

    fn parse_key(&mut self) -> Result<String, LiteralError> {
        match self.peek() {
            Some('"') | Some('\'') => self.parse_string(),
            Some(ch) if ch.is_alphabetic() || ch == '_' => Ok(self.parse_identifier()),
            Some(ch) => Err(LiteralError::new(
                self.pos,
                format!("expected key, found `{ch}`"),
            )),
            None => Err(LiteralError::new(self.pos, "unterminated mapping")),
        }
    }

    fn parse_identifier(&mut self) -> String {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|ch| ch.is_alphanumeric() || ch == '_')
        {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    fn parse_string(&mut self) -> Result<String, LiteralError> {
        let start = self.pos;
        let quote = self
            .bump()
            .ok_or_else(|| LiteralError::new(start, "expected string"))?;
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(LiteralError::new(start, "unterminated string")),
                Some(ch) if ch == quote => return Ok(out),
                Some('\\') => out.push(self.parse_escape()?),
                Some(ch) => out.push(ch),
            }
        }
    }

    fn parse_escape(&mut self) -> Result<char, LiteralError> {
        let at = self.pos;
        match self.bump() {
            Some('n') => Ok('\n'),
            Some('t') => Ok('\t'),
            Some('r') => Ok('\r'),
            Some('0') => Ok('\0'),
            Some(ch @ ('\\' | '"' | '\'' | '/')) => Ok(ch),
            Some('u') => {
                let digits: String = (0..4).filter_map(|_| self.bump()).collect();
                u32::from_str_radix(&digits, 16)
                    .ok()
                    .filter(|_| digits.len() == 4)
                    .and_then(char::from_u32)
                    .ok_or_else(|| LiteralError::new(at, "invalid unicode escape"))
            }
            Some(ch) => Err(LiteralError::new(at, format!("invalid escape `\\{ch}`"))),
            None => Err(LiteralError::new(at, "unterminated escape")),
        }
    }

    fn parse_number(&mut self) -> Result<Value, LiteralError> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|ch| ch.is_ascii_digit() || matches!(ch, '+' | '-' | '.' | 'e' | 'E'))
        {
            self.pos += 1;
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        let invalid = || LiteralError::new(start, format!("invalid number `{text}`"));

        if !text.contains(['.', 'e', 'E']) {
            if let Ok(value) = text.parse::<i64>() {
                return Ok(Value::Number(value.into()));
            }
        }
        text.parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(invalid)
    }
}
