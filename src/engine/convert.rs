//! Converter graph.
//!
//! Conversions between domain types are registered as single-step directed
//! edges; `convert` composes them with a breadth-first shortest-path search.
//! The graph is expected to be shallow (one or two hops in practice), so the
//! search runs per call instead of precomputing an all-pairs table.
//!
//! Determinism: only one edge may exist per `(from, to)` pair, and BFS visits
//! the adjacency lists in registration order, so when several shortest paths
//! exist the one through the earliest-registered edge at each step wins.
//!
//! A step function returns `None` to reject a value (for example a
//! fractional number narrowed to an integer); that surfaces as
//! `ConvertError::StepFailed` naming the offending edge.

use std::sync::Arc;

use crate::Value;
use crate::error::{ConvertError, RegistryError};

use super::types::{TypeId, TypeRegistry};

pub type ConvertFn = Arc<dyn Fn(&Value) -> Option<Value> + Send + Sync>;

struct Edge {
    to: TypeId,
    func: ConvertFn,
}

/// Directed single-step conversion edges, indexed by source type.
#[derive(Default)]
pub struct ConverterGraph {
    adjacency: Vec<Vec<Edge>>,
}

impl ConverterGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn edges(&self, from: TypeId) -> &[Edge] {
        self.adjacency.get(from).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Register a single-step converter. A second edge between the same pair
    /// is rejected to keep composition deterministic.
    pub fn register(
        &mut self,
        types: &TypeRegistry,
        from: TypeId,
        to: TypeId,
        func: ConvertFn,
    ) -> Result<(), RegistryError> {
        if self.edges(from).iter().any(|e| e.to == to) {
            return Err(RegistryError::DuplicateConverter {
                from: types.name(from).to_string(),
                to: types.name(to).to_string(),
            });
        }
        if self.adjacency.len() <= from {
            self.adjacency.resize_with(from + 1, Vec::new);
        }
        self.adjacency[from].push(Edge { to, func });
        Ok(())
    }

    /// Shortest conversion path as a sequence of `(target, step)` hops.
    ///
    /// `from == to` yields the empty path. BFS parent tracking fixes each
    /// node's predecessor the first time it is reached, which is what makes
    /// the earliest-registered tie-break fall out of the visit order.
    fn path(&self, from: TypeId, to: TypeId) -> Option<Vec<(TypeId, ConvertFn)>> {
        if from == to {
            return Some(Vec::new());
        }
        let mut parent: Vec<Option<(TypeId, ConvertFn)>> = Vec::new();
        let mut visited = vec![from];
        let mut queue = std::collections::VecDeque::from([from]);
        parent.resize(self.adjacency.len().max(from.max(to) + 1), None);

        while let Some(node) = queue.pop_front() {
            for edge in self.edges(node) {
                if visited.contains(&edge.to) {
                    continue;
                }
                visited.push(edge.to);
                if edge.to >= parent.len() {
                    parent.resize(edge.to + 1, None);
                }
                parent[edge.to] = Some((node, edge.func.clone()));
                if edge.to == to {
                    // Walk parents back to the source.
                    let mut steps = Vec::new();
                    let mut at = to;
                    while at != from {
                        let (prev, func) = parent[at].clone().unwrap();
                        steps.push((at, func));
                        at = prev;
                    }
                    steps.reverse();
                    return Some(steps);
                }
                queue.push_back(edge.to);
            }
        }
        None
    }

    pub fn path_exists(&self, from: TypeId, to: TypeId) -> bool {
        self.path(from, to).is_some()
    }

    /// Carry `value` from `from` to `to` along the shortest registered path.
    pub fn convert(
        &self,
        types: &TypeRegistry,
        value: &Value,
        from: TypeId,
        to: TypeId,
    ) -> Result<Value, ConvertError> {
        let steps = self.path(from, to).ok_or_else(|| ConvertError::NoPath {
            from: types.name(from).to_string(),
            to: types.name(to).to_string(),
        })?;
        let mut current = value.clone();
        let mut at = from;
        for (next, func) in steps {
            current = func(&current).ok_or_else(|| ConvertError::StepFailed {
                from: types.name(at).to_string(),
                to: types.name(next).to_string(),
            })?;
            at = next;
        }
        Ok(current)
    }
}

impl std::fmt::Debug for ConverterGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let edges: Vec<(TypeId, Vec<TypeId>)> =
            self.adjacency.iter().enumerate().map(|(from, es)| (from, es.iter().map(|e| e.to).collect())).collect();
        f.debug_struct("ConverterGraph").field("edges", &edges).finish()
    }
}
