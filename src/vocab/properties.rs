//! Spatial property adapters.

use crate::api::EngineBuilder;
use crate::error::RegistryError;
use crate::{Priority, Value};

pub(super) fn register(builder: &mut EngineBuilder) -> Result<(), RegistryError> {
    builder.register_expression(adapter! {
        id: "altitude",
        returns: "number",
        patterns: ["[the] altitude[s] of %locations%"],
        priority: Priority::Property,
        eval: |args, _cx| {
            Ok(args
                .all(0)
                .iter()
                .filter_map(|v| match v {
                    Value::Location(l) => Some(Value::Number(l.y)),
                    _ => None,
                })
                .collect())
        },
    })?;

    // One pattern per axis; the matched pattern index picks the component.
    builder.register_expression(adapter! {
        id: "coordinate",
        returns: "number",
        patterns: [
            "[the] x( |-)coordinate[s] of %locations%",
            "[the] y( |-)coordinate[s] of %locations%",
            "[the] z( |-)coordinate[s] of %locations%",
        ],
        priority: Priority::Property,
        eval: |args, cx| {
            Ok(args
                .all(0)
                .iter()
                .filter_map(|v| match v {
                    Value::Location(l) => Some(Value::Number(match cx.pattern {
                        0 => l.x,
                        1 => l.y,
                        _ => l.z,
                    })),
                    _ => None,
                })
                .collect())
        },
    })?;

    builder.register_expression(adapter! {
        id: "world",
        returns: "text",
        patterns: ["[the] world[s] of %locations%"],
        priority: Priority::Property,
        eval: |args, _cx| {
            Ok(args
                .all(0)
                .iter()
                .filter_map(|v| match v {
                    Value::Location(l) => Some(Value::Text(l.world.clone())),
                    _ => None,
                })
                .collect())
        },
    })?;

    Ok(())
}
