//! Error taxonomy.
//!
//! Errors split along the engine's lifecycle:
//!
//! - `RegistryError` / `PatternError`: start-up registration problems. These
//!   abort the offending registration only; a vocabulary with one bad
//!   adapter still loads the rest.
//! - `ParseError`: script-author-facing. `ParseFailure` carries the deepest
//!   offset any candidate reached so the author gets a pointed diagnostic
//!   instead of a generic "no match".
//! - `ConvertError`: a value could not be carried between two domain types.
//!   During candidate selection this rejects one candidate; it surfaces only
//!   when nothing else matched, or at evaluation time inside a conversion
//!   wrapper.
//! - `EvalError`: per-event runtime failure. Isolated to the one evaluation
//!   call; the dispatcher decides whether to log or abort the run.

use thiserror::Error;

use crate::TimeState;

/// Start-up registration failures.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("duplicate type registration: \"{0}\"")]
    DuplicateType(String),

    #[error("duplicate converter registration: {from} -> {to}")]
    DuplicateConverter { from: String, to: String },

    #[error("unknown type \"{0}\"")]
    UnknownType(String),

    #[error("adapter \"{adapter}\": {source}")]
    Pattern {
        adapter: &'static str,
        #[source]
        source: PatternError,
    },
}

/// Malformed pattern text, reported at registration time.
#[derive(Debug, Error)]
pub enum PatternError {
    #[error("unbalanced group at byte {0}")]
    UnbalancedGroup(usize),

    #[error("empty alternative at byte {0}")]
    EmptyAlternative(usize),

    #[error("unterminated placeholder at byte {0}")]
    UnterminatedPlaceholder(usize),

    #[error("placeholder names unknown type \"{0}\"")]
    UnknownType(String),

    #[error("groups nested deeper than {max}")]
    TooDeep { max: usize },

    #[error("pattern can match without any literal text")]
    MissingLiteral,

    #[error("unexpected \"{ch}\" at byte {at}")]
    UnexpectedChar { ch: char, at: usize },
}

/// Why a sentence fragment failed to parse.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error(transparent)]
    Failure(#[from] ParseFailure),

    #[error("\"{adapter}\" does not understand the {time} state")]
    UnsupportedTime { adapter: &'static str, time: TimeState },

    #[error("unknown expected type \"{0}\"")]
    UnknownType(String),
}

/// The closest-progress diagnostic for a failed parse.
///
/// `offset` is a byte index into the (whitespace-normalized) input;
/// `expected` names what the deepest-reaching candidate was looking for
/// there.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("can't understand \"{text}\": expected {expected} at byte {offset}")]
pub struct ParseFailure {
    pub text: String,
    pub offset: usize,
    pub expected: String,
}

/// A value could not be carried from one type to another.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConvertError {
    #[error("no conversion path from {from} to {to}")]
    NoPath { from: String, to: String },

    #[error("conversion step {from} -> {to} rejected the value")]
    StepFailed { from: String, to: String },
}

/// Runtime failure while evaluating one expression tree against one event.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("\"{adapter}\" produced {count} values where a single value was required")]
    TooManyValues { adapter: String, count: usize },

    #[error(transparent)]
    Conversion(#[from] ConvertError),

    #[error("\"{adapter}\": {message}")]
    Adapter { adapter: String, message: String },
}
