use once_cell::sync::Lazy;

use crate::engine::{self, AdapterSpec, ConvertFn, EventBinding, Expr, RegId, TypeDescriptor, TypeId};
use crate::engine::{ConverterGraph, EngineView, ExpressionRegistry, TypeRegistry};
use crate::error::{EvalError, ParseError, RegistryError};
use crate::Value;

static DEFAULT_ENGINE: Lazy<Engine> = Lazy::new(crate::vocab::standard_vocabulary);

/// Accumulates a vocabulary: domain types, converters, and expression
/// adapters. Registration order matters twice over; it decides converter
/// tie-breaks and candidate order among equal-priority adapters, so a
/// vocabulary that registers in a fixed order parses deterministically.
///
/// Types must be registered before the converters and adapters that name
/// them.
#[derive(Default)]
pub struct EngineBuilder {
    types: TypeRegistry,
    graph: ConverterGraph,
    registry: ExpressionRegistry,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a domain type. Fails if the singular or plural name is
    /// already taken.
    pub fn register_type(&mut self, descriptor: TypeDescriptor) -> Result<TypeId, RegistryError> {
        self.types.register(descriptor)
    }

    /// Register a single-step conversion between two named types.
    pub fn register_converter(
        &mut self,
        from: &str,
        to: &str,
        func: ConvertFn,
    ) -> Result<(), RegistryError> {
        let from_id = self.lookup(from)?;
        let to_id = self.lookup(to)?;
        self.graph.register(&self.types, from_id, to_id, func)
    }

    /// Register one expression adapter. A failure rejects this adapter
    /// only; everything registered before it stays.
    pub fn register_expression(&mut self, spec: AdapterSpec) -> Result<RegId, RegistryError> {
        self.registry.register(&self.types, spec)
    }

    /// Freeze the vocabulary into an immutable engine. Candidate order is
    /// pinned here and never changes afterwards.
    pub fn build(mut self) -> Engine {
        self.registry.freeze(&self.types, &self.graph);
        Engine { types: self.types, graph: self.graph, registry: self.registry }
    }

    fn lookup(&self, name: &str) -> Result<TypeId, RegistryError> {
        self.types.lookup(name).ok_or_else(|| RegistryError::UnknownType(name.to_string()))
    }
}

/// A frozen vocabulary plus the machinery to parse, simplify, and evaluate
/// sentences against it. Immutable and shareable; one engine serves any
/// number of concurrent parses and evaluations.
#[derive(Debug)]
pub struct Engine {
    types: TypeRegistry,
    graph: ConverterGraph,
    registry: ExpressionRegistry,
}

impl Engine {
    /// Parse one sentence, expecting a result of the named type.
    pub fn parse(&self, text: &str, expected: &str) -> Result<Expr, ParseError> {
        let ty = self
            .types
            .lookup(expected)
            .ok_or_else(|| ParseError::UnknownType(expected.to_string()))?;
        engine::parse(&self.view(), text, ty)
    }

    /// Fold event-independent subtrees into literals.
    pub fn simplify(&self, expr: Expr) -> Expr {
        engine::simplify(&self.view(), expr)
    }

    /// Evaluate a parsed tree against one binding.
    pub fn evaluate(&self, expr: &Expr, binding: &EventBinding) -> Result<Vec<Value>, EvalError> {
        engine::evaluate(&self.view(), expr, binding)
    }

    /// Render a value through its type's printer, falling back to a debug
    /// rendering for values no registered type claims.
    pub fn display(&self, value: &Value) -> String {
        self.types
            .type_of(value)
            .and_then(|ty| self.types.get(ty).print(value))
            .unwrap_or_else(|| format!("{value:?}"))
    }

    /// The registered name of a value's type, if any type claims it.
    pub fn type_name_of(&self, value: &Value) -> Option<&'static str> {
        self.types.type_of(value).map(|ty| self.types.name(ty))
    }

    pub fn type_name(&self, id: TypeId) -> &'static str {
        self.types.name(id)
    }

    pub fn adapter_id(&self, reg: RegId) -> &'static str {
        self.registry.get(reg).id
    }

    /// Short human label for a node, used by diagnostics.
    pub fn label(&self, expr: &Expr) -> String {
        expr.label(&self.registry)
    }

    fn view(&self) -> EngineView<'_> {
        EngineView { types: &self.types, graph: &self.graph, registry: &self.registry }
    }
}

/// The engine over the standard vocabulary, built once.
pub fn default_engine() -> &'static Engine {
    &DEFAULT_ENGINE
}

/// Parse `text` against the standard vocabulary.
///
/// # Example
/// ```
/// let expr = skribe::parse("altitude of {_spawn}", "number").unwrap();
/// ```
pub fn parse(text: &str, expected: &str) -> Result<Expr, ParseError> {
    parse_with(default_engine(), text, expected)
}

/// Parse `text` against a specific engine. Use this with a custom-built
/// vocabulary.
pub fn parse_with(engine: &Engine, text: &str, expected: &str) -> Result<Expr, ParseError> {
    engine.parse(text, expected)
}
