//! Expression registry.
//!
//! Every leaf adapter registers once at start-up as an [`AdapterSpec`]; the
//! registry compiles its patterns and keeps the result as an immutable
//! [`Registration`] for the life of the process. After the freeze step the
//! registry also carries, per return type, the full candidate order the
//! parser walks, which is the specificity contract:
//!
//! 1. exact return-type matches before convertible-return-type matches
//! 2. lower [`Priority`] tier first (default `Simple`)
//! 3. declaration order (first registered wins)
//!
//! Declaration order is a deliberate, test-pinned part of the contract, not
//! an accident of iteration: two adapters that overlap on the same input at
//! the same tier resolve to whichever was registered first.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{PatternError, RegistryError};
use crate::{TimeState, Value};

use super::convert::ConverterGraph;
use super::eval::{Args, EvalCx};
use super::pattern::{self, CompiledPattern};
use super::types::{TypeId, TypeRegistry};

/// Registration identifier, which is also the declaration order.
pub type RegId = usize;

bitflags::bitflags! {
    /// Which time states an adapter can serve.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TimeStates: u8 {
        const PRESENT = 1 << 0;
        const PAST    = 1 << 1;
        const FUTURE  = 1 << 2;
    }
}

impl TimeStates {
    pub fn supports(self, time: TimeState) -> bool {
        match time {
            TimeState::Present => self.contains(TimeStates::PRESENT),
            TimeState::Past => self.contains(TimeStates::PAST),
            TimeState::Future => self.contains(TimeStates::FUTURE),
        }
    }
}

/// Candidate tier. Lower tiers are tried first; `Simple` is the default for
/// plain property adapters, `Catchall` for patterns that match almost
/// anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Priority {
    #[default]
    Simple,
    Combined,
    Property,
    Catchall,
}

/// The conversion an adapter applies to its evaluated arguments.
pub type AdapterFn = Arc<dyn Fn(&Args<'_>, &EvalCx<'_>) -> Result<Vec<Value>, crate::EvalError> + Send + Sync>;

/// What a leaf adapter supplies to the engine, typically written with the
/// [`adapter!`](crate::adapter) macro.
pub struct AdapterSpec {
    pub id: &'static str,
    pub returns: &'static str,
    pub patterns: &'static [&'static str],
    pub priority: Priority,
    pub times: TimeStates,
    /// `None` derives the node's cardinality from its bound arguments;
    /// `Some` forces it (an aggregate over many inputs is still single).
    pub plural_result: Option<bool>,
    /// Eligible for constant folding. Must be `false` for anything
    /// event-dependent or volatile; never inferred.
    pub foldable: bool,
    pub eval: AdapterFn,
}

/// A compiled, frozen adapter registration.
pub struct Registration {
    pub id: &'static str,
    pub return_type: TypeId,
    pub patterns: Vec<CompiledPattern>,
    pub priority: Priority,
    pub times: TimeStates,
    pub plural_result: Option<bool>,
    pub foldable: bool,
    pub eval: AdapterFn,
    pub order: RegId,
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("id", &self.id)
            .field("return_type", &self.return_type)
            .field("patterns", &self.patterns.iter().map(|p| p.source()).collect::<Vec<_>>())
            .field("priority", &self.priority)
            .field("order", &self.order)
            .finish()
    }
}

/// All registrations plus the per-type candidate order, frozen at build.
#[derive(Debug, Default)]
pub struct ExpressionRegistry {
    registrations: Vec<Registration>,
    candidates: HashMap<TypeId, Vec<RegId>>,
}

impl ExpressionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile and store one adapter. A bad pattern aborts this registration
    /// only; previously registered adapters are unaffected.
    pub fn register(&mut self, types: &TypeRegistry, spec: AdapterSpec) -> Result<RegId, RegistryError> {
        let return_type = types.lookup(spec.returns).ok_or_else(|| RegistryError::UnknownType(spec.returns.to_string()))?;
        let mut compiled = Vec::with_capacity(spec.patterns.len());
        for pattern in spec.patterns {
            let pat = pattern::compile(pattern, types)
                .map_err(|source| RegistryError::Pattern { adapter: spec.id, source })?;
            compiled.push(pat);
        }
        if compiled.is_empty() {
            return Err(RegistryError::Pattern { adapter: spec.id, source: PatternError::MissingLiteral });
        }
        let order = self.registrations.len();
        self.registrations.push(Registration {
            id: spec.id,
            return_type,
            patterns: compiled,
            priority: spec.priority,
            times: spec.times,
            plural_result: spec.plural_result,
            foldable: spec.foldable,
            eval: spec.eval,
            order,
        });
        Ok(order)
    }

    /// Precompute the candidate order for every known type. Called once when
    /// the engine freezes; the registry is read-only afterwards.
    pub fn freeze(&mut self, types: &TypeRegistry, graph: &ConverterGraph) {
        let mut candidates = HashMap::new();
        for ty in types.ids() {
            let mut exact: Vec<RegId> = self
                .registrations
                .iter()
                .filter(|r| r.return_type == ty)
                .map(|r| r.order)
                .collect();
            exact.sort_by_key(|&id| (self.registrations[id].priority, id));

            let mut convertible: Vec<RegId> = self
                .registrations
                .iter()
                .filter(|r| r.return_type != ty && graph.path_exists(r.return_type, ty))
                .map(|r| r.order)
                .collect();
            convertible.sort_by_key(|&id| (self.registrations[id].priority, id));

            exact.extend(convertible);
            candidates.insert(ty, exact);
        }
        self.candidates = candidates;
    }

    /// Ordered candidate registrations for an expected return type.
    pub fn candidates_for(&self, ty: TypeId) -> &[RegId] {
        self.candidates.get(&ty).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn get(&self, id: RegId) -> &Registration {
        &self.registrations[id]
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }
}
