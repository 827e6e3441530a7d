//! The standard vocabulary.
//!
//! Everything the engine core treats as data lives here: the built-in
//! domain types with their parsers and printers, the converters between
//! them, and the expression adapters that give sentences their meaning.
//! The core never special-cases any of it; a host can build an engine from
//! an entirely different vocabulary through [`EngineBuilder`].
//!
//! Registration order inside this module is part of its contract. The
//! converter graph breaks path ties toward earlier registrations, and
//! equal-priority adapters are tried in registration order, so reordering
//! these calls can change what a sentence means.

use crate::api::{Engine, EngineBuilder};

#[path = "vocab/logic.rs"]
mod logic;
#[path = "vocab/misc.rs"]
mod misc;
#[path = "vocab/properties.rs"]
mod properties;
#[path = "vocab/types.rs"]
mod types;


/// Build an engine over the standard vocabulary.
///
/// The standard set is static and known-good, so registration failures
/// here are programming errors, not runtime conditions.
pub fn standard_vocabulary() -> Engine {
    let mut builder = EngineBuilder::new();
    types::register(&mut builder).expect("standard types are well formed");
    properties::register(&mut builder).expect("standard properties are well formed");
    logic::register(&mut builder).expect("standard logic is well formed");
    misc::register(&mut builder).expect("standard misc adapters are well formed");
    builder.build()
}
