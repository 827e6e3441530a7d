//! Parsing and evaluation engine.
//!
//! This module is the *core* of the sentence engine. It lives as focused
//! submodules under `src/engine/` while keeping public paths stable (for
//! example `crate::engine::Expr` and `crate::engine::EventBinding`).
//!
//! ## How the parts work together
//!
//! At a high level, one sentence travels a pipeline:
//!
//! ```text
//! vocabulary  ── TypeRegistry::register        (types.rs)
//!             ── ConverterGraph::register      (convert.rs)
//!             ── ExpressionRegistry::register  (registry.rs)
//!                               │
//!                  ExpressionRegistry::freeze   (candidate order pinned)
//!                               │
//! sentence ───── parser::parse ─┼─ pattern::match_pattern per candidate
//!  + expected    (parser.rs)    │  (pattern.rs; slots recurse)
//!    type                       v
//!                             Expr tree        (eval.rs)
//!                               │
//!                  simplify::simplify           (simplify.rs)
//!                    - fold event-independent subtrees to literals
//!                               │
//!                               v
//!                  eval::evaluate(tree, EventBinding)
//!                    - strict, bottom-up, one binding per pass
//!                               │
//!                               v
//!                          Vec<Value>
//! ```
//!
//! The engine leans on **frozen candidate order**: after `freeze`, the set
//! of adapters tried for each expected type, and the order they are tried
//! in, never changes. First match wins, so parsing is deterministic for a
//! given vocabulary.
//!
//! ## Responsibilities by module
//!
//! - `types.rs`: named domain types, their instance checks, parsers, and
//!   printers, interned behind `TypeId`s.
//! - `convert.rs`: the converter graph; composes registered single-step
//!   conversions into shortest paths between types.
//! - `pattern.rs`: compiles `[opt]`, `(a|b)`, `%type%` sentence patterns and
//!   matches them against input, enumerating slot spans.
//! - `registry.rs`: adapter registrations, priority tiers, and the frozen
//!   per-type candidate lists.
//! - `parser.rs`: recursive-descent sentence parsing over the candidate
//!   lists, with literal fallback and list splitting.
//! - `eval.rs`: the `Expr` tree, `EventBinding`, and strict bottom-up
//!   evaluation.
//! - `simplify.rs`: constant folding of event-independent subtrees.
//!
//! ## Debugging
//!
//! The engine traces through `tracing`; run the CLI with
//! `RUST_LOG=skribe=trace` to watch candidate binding and folding.

#[path = "engine/convert.rs"]
mod convert;
#[path = "engine/eval.rs"]
mod eval;
#[path = "engine/parser.rs"]
mod parser;
#[path = "engine/pattern.rs"]
mod pattern;
#[path = "engine/registry.rs"]
mod registry;
#[path = "engine/simplify.rs"]
mod simplify;
#[path = "engine/types.rs"]
mod types;

pub use convert::{ConvertFn, ConverterGraph};
pub use eval::{Args, EvalCx, EventBinding, Expr};
pub use pattern::{CompiledPattern, Span};
pub use registry::{AdapterFn, AdapterSpec, ExpressionRegistry, Priority, RegId, Registration, TimeStates};
pub use types::{TypeDescriptor, TypeId, TypeRegistry};

pub(crate) use eval::evaluate;
pub(crate) use parser::parse;
pub(crate) use simplify::simplify;

/// Read-only view over the frozen engine internals, shared by the parser,
/// the simplifier, and the evaluator.
pub(crate) struct EngineView<'a> {
    pub types: &'a TypeRegistry,
    pub graph: &'a ConverterGraph,
    pub registry: &'a ExpressionRegistry,
}
