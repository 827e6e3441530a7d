//! Three-valued logic and comparisons.
//!
//! Truth values are Kleene tri-states, so an absent operand degrades a
//! comparison or connective to `Unknown` instead of failing the whole
//! evaluation.

use crate::api::EngineBuilder;
use crate::error::RegistryError;
use crate::kleene::TriState;
use crate::{Priority, Value};

pub(super) fn register(builder: &mut EngineBuilder) -> Result<(), RegistryError> {
    builder.register_expression(adapter! {
        id: "negation",
        returns: "boolean",
        patterns: ["not %boolean%"],
        eval: |args, _cx| {
            Ok(args.truth(0).map(|t| Value::Truth(t.negate())).into_iter().collect())
        },
    })?;

    builder.register_expression(adapter! {
        id: "conjunction",
        returns: "boolean",
        patterns: ["%boolean% and %boolean%"],
        priority: Priority::Combined,
        eval: |args, _cx| {
            let a = args.truth(0).unwrap_or(TriState::Unknown);
            let b = args.truth(1).unwrap_or(TriState::Unknown);
            Ok(vec![Value::Truth(a.and(b))])
        },
    })?;

    builder.register_expression(adapter! {
        id: "disjunction",
        returns: "boolean",
        patterns: ["%boolean% or %boolean%"],
        priority: Priority::Combined,
        eval: |args, _cx| {
            let a = args.truth(0).unwrap_or(TriState::Unknown);
            let b = args.truth(1).unwrap_or(TriState::Unknown);
            Ok(vec![Value::Truth(a.or(b))])
        },
    })?;

    // Equality comes last so that "is greater than" never loses its tail
    // to a bare "is".
    builder.register_expression(adapter! {
        id: "comparison",
        returns: "boolean",
        patterns: [
            "%number% is (greater|more) than %number%",
            "%number% is less than %number%",
            "%number% (equals|is equal to) %number%",
        ],
        priority: Priority::Combined,
        eval: |args, cx| {
            let state = match (args.number(0), args.number(1)) {
                (Some(a), Some(b)) => {
                    let holds = match cx.pattern {
                        0 => a > b,
                        1 => a < b,
                        _ => a == b,
                    };
                    TriState::from(holds)
                }
                _ => TriState::Unknown,
            };
            Ok(vec![Value::Truth(state)])
        },
    })?;

    Ok(())
}
