//! Expression trees and the evaluation engine.
//!
//! Parsing produces an [`Expr`] tree; evaluation walks it bottom-up against
//! one [`EventBinding`]. Evaluation is strict: every child is fully resolved
//! to its value sequence before the parent's adapter runs.
//!
//! ```text
//! Expr tree            EventBinding (one evaluation pass)
//!   Call ──────────▶     adapter fn(&Args, &EvalCx) ─▶ Vec<Value>
//!    ├─ Literal            ▲ time-qualified reads go through
//!    └─ Variable ──▶       │ binding.snapshot(key, cx.time)
//!        variables table ──┘
//! ```
//!
//! Cardinality: a value sequence is the universal result shape. Empty means
//! "currently absent" (not an error); single-valued nodes may produce zero
//! or one value, and anything beyond that is an `EvalError::TooManyValues`.
//!
//! The binding lives for exactly one evaluation pass. Evaluation touches no
//! shared mutable state beyond the frozen registries, so any number of
//! passes may run concurrently, each with its own binding.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::trace;

use crate::error::EvalError;
use crate::kleene::TriState;
use crate::{Location, TimeState, Value};

use super::registry::{ExpressionRegistry, RegId};
use super::types::TypeId;
use super::EngineView;

// --- Expression tree ---------------------------------------------------------

/// A parsed, typed expression node.
///
/// Children are owned by their parent; a node's time qualifier and shape are
/// fixed at parse time and never change afterwards.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A fixed value sequence, independent of any event.
    Literal { type_id: TypeId, values: Vec<Value> },
    /// A `{name}` reference resolved from the binding's variable table at
    /// evaluation time, converting each value to the first expected type it
    /// can reach.
    Variable { name: String, expected: Vec<TypeId>, plural: bool },
    /// An "a, b and c" list; evaluates to the concatenation of its parts.
    List { children: Vec<Expr> },
    /// An adapter call. `children` align with the matched pattern's slots;
    /// `None` marks a placeholder inside a skipped optional group.
    Call { reg: RegId, pattern: usize, children: Vec<Option<Expr>>, time: TimeState },
    /// Carries the inner node's values to `to` through the converter graph.
    Convert { inner: Box<Expr>, to: TypeId },
}

impl Expr {
    /// Whether this node promises at most one value.
    pub fn is_single(&self, registry: &ExpressionRegistry) -> bool {
        match self {
            Expr::Literal { values, .. } => values.len() <= 1,
            Expr::Variable { plural, .. } => !plural,
            Expr::List { .. } => false,
            Expr::Convert { inner, .. } => inner.is_single(registry),
            Expr::Call { reg, children, .. } => {
                let registration = registry.get(*reg);
                match registration.plural_result {
                    Some(plural) => !plural,
                    None => children.iter().flatten().all(|child| child.is_single(registry)),
                }
            }
        }
    }

    /// Short label for diagnostics.
    pub fn label(&self, registry: &ExpressionRegistry) -> String {
        match self {
            Expr::Literal { .. } => "literal".to_string(),
            Expr::Variable { name, .. } => format!("{{{name}}}"),
            Expr::List { .. } => "list".to_string(),
            Expr::Call { reg, .. } => registry.get(*reg).id.to_string(),
            Expr::Convert { inner, .. } => inner.label(registry),
        }
    }
}

// --- Event binding -----------------------------------------------------------

/// Runtime context for one evaluation pass.
///
/// Carries the triggering host event (opaque to the core), the variable
/// table, and per-key value snapshots for each time state. Build one per
/// event, evaluate, drop it.
#[derive(Clone, Default)]
pub struct EventBinding {
    event: Option<Arc<dyn Any + Send + Sync>>,
    variables: HashMap<String, Vec<Value>>,
    snapshots: HashMap<(String, TimeState), Vec<Value>>,
}

impl EventBinding {
    /// A binding with no event, no variables, no snapshots. This is what
    /// constant folding evaluates against.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn for_event(event: Arc<dyn Any + Send + Sync>) -> Self {
        EventBinding { event: Some(event), ..Self::default() }
    }

    pub fn with_variable(mut self, name: impl Into<String>, values: Vec<Value>) -> Self {
        self.variables.insert(name.into(), values);
        self
    }

    pub fn with_snapshot(mut self, key: impl Into<String>, time: TimeState, values: Vec<Value>) -> Self {
        self.snapshots.insert((key.into(), time), values);
        self
    }

    pub fn set_variable(&mut self, name: impl Into<String>, values: Vec<Value>) {
        self.variables.insert(name.into(), values);
    }

    pub fn variable(&self, name: &str) -> &[Value] {
        self.variables.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The value snapshot for `key` at `time`. Missing snapshots are absent,
    /// not errors.
    pub fn snapshot(&self, key: &str, time: TimeState) -> &[Value] {
        self.snapshots.get(&(key.to_string(), time)).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Downcast the opaque host event, if one is bound.
    pub fn event<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.event.as_ref()?.downcast_ref()
    }
}

impl fmt::Debug for EventBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBinding")
            .field("event", &self.event.is_some())
            .field("variables", &self.variables.keys().collect::<Vec<_>>())
            .field("snapshots", &self.snapshots.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// What an adapter sees while evaluating: the binding plus this node's
/// bound time state and which of the adapter's patterns matched.
pub struct EvalCx<'a> {
    pub binding: &'a EventBinding,
    pub time: TimeState,
    pub pattern: usize,
}

impl<'a> EvalCx<'a> {
    /// Snapshot lookup at this node's bound time state.
    pub fn snapshot(&self, key: &str) -> &[Value] {
        self.binding.snapshot(key, self.time)
    }
}

/// Evaluated argument sequences, aligned with the matched pattern's slots.
/// An absent argument (skipped optional group, or a value that is currently
/// missing) is an empty sequence.
pub struct Args<'a> {
    values: &'a [Vec<Value>],
}

impl<'a> Args<'a> {
    pub fn new(values: &'a [Vec<Value>]) -> Self {
        Args { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn all(&self, index: usize) -> &[Value] {
        self.values.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn single(&self, index: usize) -> Option<&Value> {
        self.all(index).first()
    }

    pub fn number(&self, index: usize) -> Option<f64> {
        match self.single(index)? {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn integer(&self, index: usize) -> Option<i64> {
        match self.single(index)? {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn text(&self, index: usize) -> Option<&str> {
        match self.single(index)? {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn truth(&self, index: usize) -> Option<TriState> {
        match self.single(index)? {
            Value::Truth(t) => Some(*t),
            _ => None,
        }
    }

    pub fn location(&self, index: usize) -> Option<&Location> {
        match self.single(index)? {
            Value::Location(l) => Some(l),
            _ => None,
        }
    }
}

// --- Evaluation --------------------------------------------------------------

/// Evaluate a tree bottom-up against one binding.
pub(crate) fn evaluate(env: &EngineView<'_>, expr: &Expr, binding: &EventBinding) -> Result<Vec<Value>, EvalError> {
    match expr {
        Expr::Literal { values, .. } => Ok(values.clone()),
        Expr::Variable { name, expected, plural } => {
            let mut out = Vec::new();
            for value in binding.variable(name) {
                // Values that cannot reach any expected type are dropped as
                // absent rather than failing the whole pass.
                if let Some(converted) = convert_to_first(env, value, expected) {
                    out.push(converted);
                }
            }
            if !*plural && out.len() > 1 {
                return Err(EvalError::TooManyValues { adapter: format!("{{{name}}}"), count: out.len() });
            }
            Ok(out)
        }
        Expr::List { children } => {
            let mut out = Vec::new();
            for child in children {
                out.extend(evaluate(env, child, binding)?);
            }
            Ok(out)
        }
        Expr::Convert { inner, to } => {
            let values = evaluate(env, inner, binding)?;
            let mut out = Vec::with_capacity(values.len());
            for value in values {
                if env.types.get(*to).is_instance(&value) {
                    out.push(value);
                    continue;
                }
                match env.types.type_of(&value) {
                    Some(from) => out.push(env.graph.convert(env.types, &value, from, *to)?),
                    None => return Err(EvalError::Adapter {
                        adapter: inner.label(env.registry),
                        message: format!("produced a value outside every registered type: {value:?}"),
                    }),
                }
            }
            Ok(out)
        }
        Expr::Call { reg, pattern, children, time } => {
            let registration = env.registry.get(*reg);
            let mut args = Vec::with_capacity(children.len());
            for child in children {
                match child {
                    None => args.push(Vec::new()),
                    Some(child) => {
                        let values = evaluate(env, child, binding)?;
                        if child.is_single(env.registry) && values.len() > 1 {
                            return Err(EvalError::TooManyValues {
                                adapter: child.label(env.registry),
                                count: values.len(),
                            });
                        }
                        args.push(values);
                    }
                }
            }
            let cx = EvalCx { binding, time: *time, pattern: *pattern };
            let out = (registration.eval)(&Args::new(&args), &cx)?;
            trace!(adapter = registration.id, produced = out.len(), "evaluated call");
            if expr.is_single(env.registry) && out.len() > 1 {
                return Err(EvalError::TooManyValues { adapter: registration.id.to_string(), count: out.len() });
            }
            Ok(out)
        }
    }
}

/// Convert one value to the first expected type it can reach; `None` when
/// no expected type is reachable.
fn convert_to_first(env: &EngineView<'_>, value: &Value, expected: &[TypeId]) -> Option<Value> {
    for &ty in expected {
        if env.types.get(ty).is_instance(value) {
            return Some(value.clone());
        }
    }
    let from = env.types.type_of(value)?;
    for &ty in expected {
        if let Ok(converted) = env.graph.convert(env.types, value, from, ty) {
            return Some(converted);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::convert::ConverterGraph;
    use crate::engine::registry::{AdapterSpec, Priority, TimeStates};
    use crate::engine::types::{TypeDescriptor, TypeRegistry};

    struct Fixture {
        types: TypeRegistry,
        graph: ConverterGraph,
        registry: ExpressionRegistry,
        number: TypeId,
        text: TypeId,
        doubler: RegId,
        message: RegId,
        blast: RegId,
    }

    /// Stand-in host event.
    struct Blast {
        strength: f64,
    }

    fn fixture() -> Fixture {
        let mut types = TypeRegistry::new();
        let number = types
            .register(
                TypeDescriptor::new("number", "numbers", |v| matches!(v, Value::Number(_)))
                    .with_parser(|s| s.parse::<f64>().ok().map(Value::Number)),
            )
            .unwrap();
        let text = types
            .register(TypeDescriptor::new("text", "texts", |v| matches!(v, Value::Text(_))))
            .unwrap();

        let mut graph = ConverterGraph::new();
        graph
            .register(
                &types,
                number,
                text,
                Arc::new(|v| match v {
                    Value::Number(n) => Some(Value::Text(n.to_string())),
                    _ => None,
                }),
            )
            .unwrap();

        let mut registry = ExpressionRegistry::new();
        let doubler = registry
            .register(&types, AdapterSpec {
                id: "doubled",
                returns: "number",
                patterns: &["doubled %number%"],
                priority: Priority::Simple,
                times: TimeStates::PRESENT,
                plural_result: None,
                foldable: true,
                eval: Arc::new(|args, _| {
                    Ok(args.number(0).map(|n| Value::Number(n * 2.0)).into_iter().collect())
                }),
            })
            .unwrap();
        let message = registry
            .register(&types, AdapterSpec {
                id: "message",
                returns: "text",
                patterns: &["the message"],
                priority: Priority::Simple,
                times: TimeStates::PRESENT | TimeStates::PAST,
                plural_result: Some(false),
                foldable: false,
                eval: Arc::new(|_, cx| Ok(cx.snapshot("message").to_vec())),
            })
            .unwrap();
        let blast = registry
            .register(&types, AdapterSpec {
                id: "blast-strength",
                returns: "number",
                patterns: &["the blast strength"],
                priority: Priority::Simple,
                times: TimeStates::PRESENT,
                plural_result: Some(false),
                foldable: false,
                eval: Arc::new(|_, cx| {
                    Ok(cx.binding.event::<Blast>().map(|e| Value::Number(e.strength)).into_iter().collect())
                }),
            })
            .unwrap();
        registry.freeze(&types, &graph);
        Fixture { types, graph, registry, number, text, doubler, message, blast }
    }

    fn env(f: &Fixture) -> EngineView<'_> {
        EngineView { types: &f.types, graph: &f.graph, registry: &f.registry }
    }

    #[test]
    fn literal_is_invariant_under_any_binding() {
        let f = fixture();
        let literal = Expr::Literal { type_id: f.number, values: vec![Value::Number(64.0)] };
        let empty = EventBinding::empty();
        let busy = EventBinding::empty().with_variable("x", vec![Value::Number(1.0)]).with_snapshot(
            "message",
            TimeState::Present,
            vec![Value::Text("hi".into())],
        );
        assert_eq!(evaluate(&env(&f), &literal, &empty).unwrap(), evaluate(&env(&f), &literal, &busy).unwrap());
    }

    #[test]
    fn call_evaluates_children_first() {
        let f = fixture();
        let tree = Expr::Call {
            reg: f.doubler,
            pattern: 0,
            children: vec![Some(Expr::Literal { type_id: f.number, values: vec![Value::Number(21.0)] })],
            time: TimeState::Present,
        };
        assert_eq!(evaluate(&env(&f), &tree, &EventBinding::empty()).unwrap(), vec![Value::Number(42.0)]);
    }

    #[test]
    fn absent_child_is_an_empty_sequence() {
        let f = fixture();
        let tree = Expr::Call { reg: f.doubler, pattern: 0, children: vec![None], time: TimeState::Present };
        assert_eq!(evaluate(&env(&f), &tree, &EventBinding::empty()).unwrap(), Vec::<Value>::new());
    }

    #[test]
    fn single_variable_with_many_values_fails() {
        let f = fixture();
        let var = Expr::Variable { name: "xs".into(), expected: vec![f.number], plural: false };
        let binding = EventBinding::empty().with_variable("xs", vec![Value::Number(1.0), Value::Number(2.0)]);
        assert!(matches!(
            evaluate(&env(&f), &var, &binding),
            Err(EvalError::TooManyValues { count: 2, .. })
        ));
    }

    #[test]
    fn variable_values_convert_or_drop() {
        let f = fixture();
        let var = Expr::Variable { name: "v".into(), expected: vec![f.text], plural: true };
        // A number converts via number -> text; a truth value reaches no
        // registered type and is dropped as absent.
        let binding = EventBinding::empty()
            .with_variable("v", vec![Value::Number(3.0), Value::Truth(TriState::True), Value::Text("x".into())]);
        assert_eq!(
            evaluate(&env(&f), &var, &binding).unwrap(),
            vec![Value::Text("3".into()), Value::Text("x".into())]
        );
    }

    #[test]
    fn snapshot_follows_the_bound_time_state() {
        let f = fixture();
        let binding = EventBinding::empty()
            .with_snapshot("message", TimeState::Present, vec![Value::Text("now".into())])
            .with_snapshot("message", TimeState::Past, vec![Value::Text("then".into())]);

        let present =
            Expr::Call { reg: f.message, pattern: 0, children: vec![], time: TimeState::Present };
        let past = Expr::Call { reg: f.message, pattern: 0, children: vec![], time: TimeState::Past };
        assert_eq!(evaluate(&env(&f), &present, &binding).unwrap(), vec![Value::Text("now".into())]);
        assert_eq!(evaluate(&env(&f), &past, &binding).unwrap(), vec![Value::Text("then".into())]);
    }

    #[test]
    fn adapters_downcast_the_bound_host_event() {
        let f = fixture();
        let call = Expr::Call { reg: f.blast, pattern: 0, children: vec![], time: TimeState::Present };

        let bound = EventBinding::for_event(Arc::new(Blast { strength: 4.0 }));
        assert_eq!(evaluate(&env(&f), &call, &bound).unwrap(), vec![Value::Number(4.0)]);

        // No event, or an event of another type: absent, not an error.
        assert_eq!(evaluate(&env(&f), &call, &EventBinding::empty()).unwrap(), Vec::<Value>::new());
        let other = EventBinding::for_event(Arc::new(7usize));
        assert_eq!(evaluate(&env(&f), &call, &other).unwrap(), Vec::<Value>::new());
    }

    #[test]
    fn convert_node_carries_values_across_the_graph() {
        let f = fixture();
        let tree = Expr::Convert {
            inner: Box::new(Expr::Literal { type_id: f.number, values: vec![Value::Number(7.0)] }),
            to: f.text,
        };
        assert_eq!(evaluate(&env(&f), &tree, &EventBinding::empty()).unwrap(), vec![Value::Text("7".into())]);
    }

    #[test]
    fn list_concatenates_in_order() {
        let f = fixture();
        let tree = Expr::List {
            children: vec![
                Expr::Literal { type_id: f.number, values: vec![Value::Number(1.0)] },
                Expr::Literal { type_id: f.number, values: vec![Value::Number(2.0), Value::Number(3.0)] },
            ],
        };
        assert_eq!(
            evaluate(&env(&f), &tree, &EventBinding::empty()).unwrap(),
            vec![Value::Number(1.0), Value::Number(2.0), Value::Number(3.0)]
        );
    }
}
