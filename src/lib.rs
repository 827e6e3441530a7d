extern crate self as skribe;

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use chrono::NaiveDateTime;

#[macro_use]
mod macros;
mod api;
mod engine;
mod error;
mod kleene;
mod vocab;

pub use api::{Engine, EngineBuilder, default_engine, parse, parse_with};
pub use engine::{
    AdapterFn, AdapterSpec, Args, CompiledPattern, ConvertFn, EvalCx, EventBinding, Expr, Priority, RegId, TimeStates,
    TypeDescriptor, TypeId,
};
pub use error::{ConvertError, EvalError, ParseError, ParseFailure, PatternError, RegistryError};
pub use kleene::TriState;
pub use vocab::standard_vocabulary;

// --- Shared value model ------------------------------------------------------

/// A point in some named world. The demo vocabulary's spatial type.
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub world: String,
}

impl Location {
    pub fn new(x: f64, y: f64, z: f64, world: impl Into<String>) -> Self {
        Location { x, y, z, world: world.into() }
    }
}

/// Runtime value passed between expressions.
///
/// The enum is closed on purpose: every domain type a vocabulary registers
/// stores its values in one of these variants, and `Object` is the opaque
/// escape hatch for host-environment objects the core never inspects.
#[derive(Debug, Clone)]
pub enum Value {
    Number(f64),
    Integer(i64),
    Text(String),
    Truth(TriState),
    Instant(NaiveDateTime),
    Location(Location),
    Object { type_name: &'static str, value: Arc<dyn Any + Send + Sync> },
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Truth(a), Value::Truth(b)) => a == b,
            (Value::Instant(a), Value::Instant(b)) => a == b,
            (Value::Location(a), Value::Location(b)) => a == b,
            // Opaque host objects compare by identity.
            (Value::Object { type_name: na, value: a }, Value::Object { type_name: nb, value: b }) => {
                na == nb && Arc::ptr_eq(a, b)
            }
            _ => false,
        }
    }
}

/// Which snapshot of an event-bound value an expression reads.
///
/// Bound once while parsing (a leading "past"/"former" or "future" marker)
/// and immutable afterwards; `Present` is the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeState {
    Past,
    Present,
    Future,
}

impl fmt::Display for TimeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeState::Past => write!(f, "past"),
            TimeState::Present => write!(f, "present"),
            TimeState::Future => write!(f, "future"),
        }
    }
}
