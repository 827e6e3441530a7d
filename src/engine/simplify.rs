//! Constant folding.
//!
//! A post-order pass over a parsed tree that evaluates event-independent
//! subtrees once, against an empty binding, and replaces them with literal
//! nodes. A node folds when every present child is already a literal and
//! its adapter opted into folding; variables, event readers, and anything
//! volatile stay unevaluated.
//!
//! Folding is semantics-preserving by construction: a folded node produces
//! exactly the value sequence evaluation would have produced, so running
//! the pass zero, one, or many times yields the same observable results.

use tracing::trace;

use super::EngineView;
use super::eval::{self, EventBinding, Expr};

/// Fold event-independent subtrees into literals. Errors during a fold
/// attempt leave the node unchanged; evaluation will surface them.
pub(crate) fn simplify(view: &EngineView<'_>, expr: Expr) -> Expr {
    match expr {
        Expr::Literal { .. } | Expr::Variable { .. } => expr,
        Expr::List { children } => {
            let children: Vec<Expr> = children.into_iter().map(|c| simplify(view, c)).collect();
            match children.first() {
                Some(Expr::Literal { type_id, .. }) if children.iter().all(is_literal) => {
                    let type_id = *type_id;
                    fold(view, Expr::List { children }, type_id)
                }
                _ => Expr::List { children },
            }
        }
        Expr::Convert { inner, to } => {
            let inner = simplify(view, *inner);
            if is_literal(&inner) {
                fold(view, Expr::Convert { inner: Box::new(inner), to }, to)
            } else {
                Expr::Convert { inner: Box::new(inner), to }
            }
        }
        Expr::Call { reg, pattern, children, time } => {
            let children: Vec<Option<Expr>> =
                children.into_iter().map(|c| c.map(|child| simplify(view, child))).collect();
            let registration = view.registry.get(reg);
            let all_literal = children.iter().flatten().all(is_literal);
            let node = Expr::Call { reg, pattern, children, time };
            if registration.foldable && all_literal {
                fold(view, node, registration.return_type)
            } else {
                node
            }
        }
    }
}

fn is_literal(expr: &Expr) -> bool {
    matches!(expr, Expr::Literal { .. })
}

/// Evaluate `node` against an empty binding and replace it with the result.
/// Any evaluation error keeps the node as-is.
fn fold(view: &EngineView<'_>, node: Expr, type_id: super::types::TypeId) -> Expr {
    match eval::evaluate(view, &node, &EventBinding::empty()) {
        Ok(values) => {
            trace!(node = %node.label(view.registry), count = values.len(), "folded");
            Expr::Literal { type_id, values }
        }
        Err(_) => node,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::convert::ConverterGraph;
    use crate::engine::registry::{AdapterSpec, ExpressionRegistry, Priority, TimeStates};
    use crate::engine::types::{TypeDescriptor, TypeRegistry, TypeId};
    use crate::{TimeState, Value};
    use std::sync::Arc;

    struct Fixture {
        types: TypeRegistry,
        graph: ConverterGraph,
        registry: ExpressionRegistry,
        number: TypeId,
        text: TypeId,
        doubler: usize,
        roll: usize,
    }

    fn fixture() -> Fixture {
        let mut types = TypeRegistry::new();
        let number = types
            .register(TypeDescriptor::new("number", "numbers", |v| matches!(v, Value::Number(_))))
            .unwrap();
        let text = types
            .register(TypeDescriptor::new("text", "texts", |v| matches!(v, Value::Text(_))))
            .unwrap();
        let mut graph = ConverterGraph::new();
        graph
            .register(&types, number, text, Arc::new(|v| match v {
                Value::Number(n) => Some(Value::Text(n.to_string())),
                _ => None,
            }))
            .unwrap();
        let mut registry = ExpressionRegistry::new();
        let doubler = registry
            .register(
                &types,
                AdapterSpec {
                    id: "doubler",
                    returns: "number",
                    patterns: &["double %number%"],
                    priority: Priority::Simple,
                    times: TimeStates::PRESENT,
                    plural_result: None,
                    foldable: true,
                    eval: Arc::new(|args, _| {
                        Ok(args.number(0).map(|n| Value::Number(n * 2.0)).into_iter().collect())
                    }),
                },
            )
            .unwrap();
        let roll = registry
            .register(
                &types,
                AdapterSpec {
                    id: "roll",
                    returns: "number",
                    patterns: &["roll %number%"],
                    priority: Priority::Simple,
                    times: TimeStates::PRESENT,
                    plural_result: None,
                    foldable: false,
                    eval: Arc::new(|args, _| {
                        Ok(args.number(0).map(Value::Number).into_iter().collect())
                    }),
                },
            )
            .unwrap();
        registry.freeze(&types, &graph);
        Fixture { types, graph, registry, number, text, doubler, roll }
    }

    fn view(f: &Fixture) -> EngineView<'_> {
        EngineView { types: &f.types, graph: &f.graph, registry: &f.registry }
    }

    fn num_literal(f: &Fixture, n: f64) -> Expr {
        Expr::Literal { type_id: f.number, values: vec![Value::Number(n)] }
    }

    fn call(reg: usize, child: Expr) -> Expr {
        Expr::Call { reg, pattern: 0, children: vec![Some(child)], time: TimeState::Present }
    }

    #[test]
    fn literal_only_call_folds_to_its_value() {
        let f = fixture();
        let folded = simplify(&view(&f), call(f.doubler, num_literal(&f, 21.0)));
        assert_eq!(folded, num_literal(&f, 42.0));
    }

    #[test]
    fn folding_works_bottom_up() {
        let f = fixture();
        let tree = call(f.doubler, call(f.doubler, num_literal(&f, 10.0)));
        assert_eq!(simplify(&view(&f), tree), num_literal(&f, 40.0));
    }

    #[test]
    fn variables_block_folding_above_them() {
        let f = fixture();
        let variable = Expr::Variable { name: "n".to_string(), expected: vec![f.number], plural: false };
        let tree = call(f.doubler, variable);
        assert_eq!(simplify(&view(&f), tree.clone()), tree);
    }

    #[test]
    fn unfoldable_adapters_are_left_alone() {
        let f = fixture();
        let tree = call(f.roll, num_literal(&f, 6.0));
        let simplified = simplify(&view(&f), tree);
        // The child may fold, the volatile call itself must not.
        assert!(matches!(simplified, Expr::Call { reg, .. } if reg == f.roll));
    }

    #[test]
    fn conversion_of_a_literal_folds() {
        let f = fixture();
        let tree = Expr::Convert { inner: Box::new(num_literal(&f, 7.0)), to: f.text };
        assert_eq!(
            simplify(&view(&f), tree),
            Expr::Literal { type_id: f.text, values: vec![Value::Text("7".to_string())] }
        );
    }

    #[test]
    fn literal_list_folds_to_one_literal() {
        let f = fixture();
        let tree = Expr::List { children: vec![num_literal(&f, 1.0), num_literal(&f, 2.0)] };
        assert_eq!(
            simplify(&view(&f), tree),
            Expr::Literal { type_id: f.number, values: vec![Value::Number(1.0), Value::Number(2.0)] }
        );
    }

    #[test]
    fn simplify_is_idempotent() {
        let f = fixture();
        let variable = Expr::Variable { name: "n".to_string(), expected: vec![f.number], plural: false };
        let tree = Expr::List { children: vec![call(f.doubler, num_literal(&f, 3.0)), call(f.doubler, variable)] };
        let once = simplify(&view(&f), tree);
        let twice = simplify(&view(&f), once.clone());
        assert_eq!(once, twice);
    }
}
