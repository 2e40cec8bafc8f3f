//! Circuit states and the state-change hook.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Circuit breaker states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CircuitState {
    /// Normal operation, calls pass through and failures are counted
    Closed,
    /// Failure threshold reached, calls replay the failure that opened the circuit
    Open,
    /// Open timeout elapsed, calls are let through on trial
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "Closed"),
            CircuitState::Open => write!(f, "Open"),
            CircuitState::HalfOpen => write!(f, "HalfOpen"),
        }
    }
}

/// Hook invoked inline with every transition as `(previous, new)`.
///
/// The breaker holds its transition lock while the hook runs. The hook must
/// return promptly and must not drive the same breaker into another
/// transition (`call`, `reset`), or it will deadlock.
pub type StateChangeCallback = Arc<dyn Fn(CircuitState, CircuitState) + Send + Sync>;

/// A realized transition, as delivered to a [`StateChangeCallback`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Transition {
    pub from: CircuitState,
    pub to: CircuitState,
}

impl Transition {
    pub fn new(from: CircuitState, to: CircuitState) -> Self {
        Self { from, to }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_display() {
        assert_eq!(CircuitState::Closed.to_string(), "Closed");
        assert_eq!(CircuitState::Open.to_string(), "Open");
        assert_eq!(CircuitState::HalfOpen.to_string(), "HalfOpen");
    }

    #[test]
    fn test_transition_display() {
        let transition = Transition::new(CircuitState::HalfOpen, CircuitState::Closed);
        assert_eq!(transition.to_string(), "HalfOpen -> Closed");
    }

    #[test]
    fn test_state_serialization() {
        let json = serde_json::to_string(&CircuitState::HalfOpen).unwrap();
        assert_eq!(json, "\"HalfOpen\"");

        let state: CircuitState = serde_json::from_str("\"Open\"").unwrap();
        assert_eq!(state, CircuitState::Open);
    }
}
