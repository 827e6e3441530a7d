//! Three-valued logic for deferred conditions.
//!
//! A condition evaluated against a live event is not always decidable at the
//! point it is asked: an operand may be absent because the value it reads has
//! not been produced yet. `TriState::Unknown` marks exactly that situation:
//! "not determined yet", never "unknowable". Combinators follow Kleene's
//! strong three-valued logic, so `Unknown` propagates only where the known
//! operands leave the outcome open.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriState {
    True,
    False,
    Unknown,
}

impl TriState {
    /// Kleene conjunction: `False` dominates, then `Unknown`.
    pub fn and(self, other: TriState) -> TriState {
        match (self, other) {
            (TriState::False, _) | (_, TriState::False) => TriState::False,
            (TriState::Unknown, _) | (_, TriState::Unknown) => TriState::Unknown,
            (TriState::True, TriState::True) => TriState::True,
        }
    }

    /// Kleene disjunction: `True` dominates, then `Unknown`.
    pub fn or(self, other: TriState) -> TriState {
        match (self, other) {
            (TriState::True, _) | (_, TriState::True) => TriState::True,
            (TriState::Unknown, _) | (_, TriState::Unknown) => TriState::Unknown,
            (TriState::False, TriState::False) => TriState::False,
        }
    }

    /// Negation flips the decided states and leaves `Unknown` alone.
    pub fn negate(self) -> TriState {
        match self {
            TriState::True => TriState::False,
            TriState::False => TriState::True,
            TriState::Unknown => TriState::Unknown,
        }
    }

    pub fn is_true(self) -> bool {
        self == TriState::True
    }

    pub fn is_unknown(self) -> bool {
        self == TriState::Unknown
    }
}

impl From<bool> for TriState {
    fn from(value: bool) -> Self {
        if value { TriState::True } else { TriState::False }
    }
}

impl fmt::Display for TriState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriState::True => write!(f, "true"),
            TriState::False => write!(f, "false"),
            TriState::Unknown => write!(f, "unknown"),
        }
    }
}
