//! Built-in domain types and the converters between them.
//!
//! Each type carries an instance check, a literal parser, and a printer.
//! Literal parsers see one whitespace-normalized fragment and must either
//! claim it whole or return `None`; they never match substrings.

use chrono::NaiveDateTime;

use crate::api::EngineBuilder;
use crate::engine::TypeDescriptor;
use crate::error::RegistryError;
use crate::kleene::TriState;
use crate::{Location, Value};

pub(super) fn register(builder: &mut EngineBuilder) -> Result<(), RegistryError> {
    builder.register_type(
        TypeDescriptor::new("number", "numbers", |v| matches!(v, Value::Number(_)))
            .with_parser(parse_number)
            .with_printer(print_number),
    )?;
    builder.register_type(
        TypeDescriptor::new("integer", "integers", |v| matches!(v, Value::Integer(_)))
            .with_parser(|s| s.parse::<i64>().ok().map(Value::Integer))
            .with_printer(|v| match v {
                Value::Integer(i) => i.to_string(),
                _ => String::new(),
            }),
    )?;
    builder.register_type(
        TypeDescriptor::new("text", "texts", |v| matches!(v, Value::Text(_)))
            .with_parser(parse_quoted)
            .with_printer(|v| match v {
                Value::Text(s) => s.clone(),
                _ => String::new(),
            }),
    )?;
    builder.register_type(
        TypeDescriptor::new("boolean", "booleans", |v| matches!(v, Value::Truth(_)))
            .with_parser(parse_truth)
            .with_printer(|v| match v {
                Value::Truth(t) => t.to_string(),
                _ => String::new(),
            }),
    )?;
    builder.register_type(
        TypeDescriptor::new("location", "locations", |v| matches!(v, Value::Location(_)))
            .with_parser(parse_location)
            .with_printer(print_location),
    )?;
    builder.register_type(
        TypeDescriptor::new("instant", "instants", |v| matches!(v, Value::Instant(_)))
            .with_parser(parse_instant)
            .with_printer(|v| match v {
                Value::Instant(t) => t.format("%Y-%m-%d %H:%M:%S").to_string(),
                _ => String::new(),
            }),
    )?;

    builder.register_converter("integer", "number", std::sync::Arc::new(|v| match v {
        Value::Integer(i) => Some(Value::Number(*i as f64)),
        _ => None,
    }))?;
    // Lossy direction: only whole numbers carry over.
    builder.register_converter("number", "integer", std::sync::Arc::new(|v| match v {
        Value::Number(n) if n.fract() == 0.0 => Some(Value::Integer(*n as i64)),
        _ => None,
    }))?;
    builder.register_converter("number", "text", std::sync::Arc::new(|v| match v {
        Value::Number(n) => Some(Value::Text(print_number(&Value::Number(*n)))),
        _ => None,
    }))?;
    builder.register_converter("integer", "text", std::sync::Arc::new(|v| match v {
        Value::Integer(i) => Some(Value::Text(i.to_string())),
        _ => None,
    }))?;
    builder.register_converter("boolean", "text", std::sync::Arc::new(|v| match v {
        Value::Truth(t) => Some(Value::Text(t.to_string())),
        _ => None,
    }))?;
    builder.register_converter("location", "text", std::sync::Arc::new(|v| match v {
        Value::Location(l) => Some(Value::Text(print_location(&Value::Location(l.clone())))),
        _ => None,
    }))?;
    builder.register_converter("instant", "text", std::sync::Arc::new(|v| match v {
        Value::Instant(t) => Some(Value::Text(t.format("%Y-%m-%d %H:%M:%S").to_string())),
        _ => None,
    }))?;
    Ok(())
}

fn parse_number(s: &str) -> Option<Value> {
    let n: f64 = s.parse().ok()?;
    n.is_finite().then_some(Value::Number(n))
}

fn print_number(v: &Value) -> String {
    match v {
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

/// Quoted text, with `""` escaping a literal quote.
fn parse_quoted(s: &str) -> Option<Value> {
    let inner = s.strip_prefix('"')?.strip_suffix('"')?;
    Some(Value::Text(inner.replace("\"\"", "\"")))
}

fn parse_truth(s: &str) -> Option<Value> {
    let state = match s.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" => TriState::True,
        "false" | "no" | "off" => TriState::False,
        "unknown" => TriState::Unknown,
        _ => return None,
    };
    Some(Value::Truth(state))
}

/// `x, y, z` with an optional `in <world>` suffix; the world defaults to
/// `"world"`. Literal parsing runs before list splitting, so the commas
/// never turn a coordinate triple into a number list.
fn parse_location(s: &str) -> Option<Value> {
    let captures = regex!(
        r"^(-?\d+(?:\.\d+)?), ?(-?\d+(?:\.\d+)?), ?(-?\d+(?:\.\d+)?)(?: in ([A-Za-z][A-Za-z0-9_-]*))?$"
    )
    .captures(s)?;
    let axis = |i: usize| captures.get(i).and_then(|m| m.as_str().parse::<f64>().ok());
    Some(Value::Location(Location {
        x: axis(1)?,
        y: axis(2)?,
        z: axis(3)?,
        world: captures.get(4).map_or("world", |m| m.as_str()).to_string(),
    }))
}

fn print_location(v: &Value) -> String {
    match v {
        Value::Location(l) => format!("{}, {}, {} in {}", l.x, l.y, l.z, l.world),
        _ => String::new(),
    }
}

fn parse_instant(s: &str) -> Option<Value> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(&format!("{s} 00:00:00"), "%Y-%m-%d %H:%M:%S"))
        .ok()
        .map(Value::Instant)
}
