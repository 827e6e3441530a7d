//! Aggregates, event readers, and the odd volatile adapter.

use rand::Rng;

use crate::api::EngineBuilder;
use crate::error::RegistryError;
use crate::{Priority, TimeStates, Value};

pub(super) fn register(builder: &mut EngineBuilder) -> Result<(), RegistryError> {
    // Aggregates force a single result even over many inputs.
    builder.register_expression(adapter! {
        id: "smallest",
        returns: "number",
        patterns: ["[the] smallest of %numbers%"],
        priority: Priority::Combined,
        plural: false,
        eval: |args, _cx| {
            Ok(extremum(args.all(0), f64::min).into_iter().collect())
        },
    })?;
    builder.register_expression(adapter! {
        id: "largest",
        returns: "number",
        patterns: ["[the] largest of %numbers%"],
        priority: Priority::Combined,
        plural: false,
        eval: |args, _cx| {
            Ok(extremum(args.all(0), f64::max).into_iter().collect())
        },
    })?;

    builder.register_expression(adapter! {
        id: "joined-text",
        returns: "text",
        patterns: ["join %texts% [with %text%]"],
        priority: Priority::Combined,
        plural: false,
        eval: |args, _cx| {
            let parts: Vec<&str> = args
                .all(0)
                .iter()
                .filter_map(|v| match v {
                    Value::Text(s) => Some(s.as_str()),
                    _ => None,
                })
                .collect();
            let delimiter = args.text(1).unwrap_or(", ");
            Ok(vec![Value::Text(parts.join(delimiter))])
        },
    })?;

    // Event-bound: reads whichever snapshot the node's time state selects.
    builder.register_expression(adapter! {
        id: "message",
        returns: "text",
        patterns: ["[the] message"],
        times: TimeStates::PRESENT.union(TimeStates::PAST),
        foldable: false,
        eval: |_args, cx| {
            Ok(cx.snapshot("message").to_vec())
        },
    })?;

    // Volatile by definition; folding it would freeze the roll.
    builder.register_expression(adapter! {
        id: "random-number",
        returns: "number",
        patterns: ["[a] random number between %number% and %number%"],
        foldable: false,
        eval: |args, _cx| {
            match (args.number(0), args.number(1)) {
                (Some(a), Some(b)) => {
                    let (low, high) = if a <= b { (a, b) } else { (b, a) };
                    Ok(vec![Value::Number(rand::thread_rng().gen_range(low..=high))])
                }
                _ => Ok(Vec::new()),
            }
        },
    })?;

    Ok(())
}

fn extremum(values: &[Value], pick: fn(f64, f64) -> f64) -> Option<Value> {
    values
        .iter()
        .filter_map(|v| match v {
            Value::Number(n) => Some(*n),
            _ => None,
        })
        .reduce(pick)
        .map(Value::Number)
}
