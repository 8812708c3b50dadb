//! Console command surface.
//!
//! # Responsibility
//! - Normalize verb-first and dot-call input into one `Invocation` shape.
//! - Validate and dispatch invocations through a single router.
//! - Parse bulk-update mapping literals as data only.
//!
//! # Invariants
//! - Both syntaxes share one validation and dispatch path.
//! - Every command yields at most one reply; user errors never abort the loop.

pub mod error;
pub mod literal;
pub mod parse;
pub mod router;
