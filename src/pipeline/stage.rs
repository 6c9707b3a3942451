// Copyright (c) 2025 - Cowboy AI, Inc.
//! Per-Command Stage Machine
//!
//! Every command moves through the same finite state machine:
//!
//! ```text
//! Received ─Load→ Loaded ─Accept→ Validated ─Mutate→ Mutated ─Persist→ Persisted ─Notify→ Notified
//!                   │                 │                 │
//!                   └─Reject→ Rejected←┘                 └─Conflict→ Loaded
//! ```
//!
//! `Rejected` and `Notified` are terminal. A lost conditional save sends the
//! command back to `Loaded`, where it is re-validated against fresh state.
//! Any other (stage, step) pair is a [`TransitionError`].
//!
//! Transitions are pure; the consumer drives the machine and does the I/O.

use std::fmt;

/// Result of a state transition
pub type TransitionResult<S> = Result<S, TransitionError>;

/// Errors that can occur during state transitions
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    /// Transition from current state to target state is not allowed
    #[error("Invalid transition from {from} on {step}")]
    InvalidTransition { from: String, step: String },

    /// The machine already reached a terminal stage
    #[error("Stage {0} is terminal")]
    Terminal(String),
}

/// Trait for finite state machines
pub trait StateMachine: Sized + Clone {
    /// Input type that triggers transitions
    type Input;

    /// Attempt to transition to a new state given an input
    fn transition(&self, input: &Self::Input) -> TransitionResult<Self>;

    /// Check if a transition is valid without performing it
    fn can_transition(&self, input: &Self::Input) -> bool {
        self.transition(input).is_ok()
    }
}

/// Processing stage of one command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Received,
    Loaded,
    Validated,
    Mutated,
    Persisted,
    Notified,
    Rejected,
}

impl Stage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Notified | Stage::Rejected)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Received => "received",
            Stage::Loaded => "loaded",
            Stage::Validated => "validated",
            Stage::Mutated => "mutated",
            Stage::Persisted => "persisted",
            Stage::Notified => "notified",
            Stage::Rejected => "rejected",
        };
        write!(f, "{name}")
    }
}

/// Input driving the stage machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// State was fetched from the stores
    Load,
    /// Pre-checks and rules passed
    Accept,
    /// Pre-checks, rules or the mutation failed
    Reject,
    /// New state built in memory
    Mutate,
    /// Conditional save succeeded
    Persist,
    /// Conditional save lost a race
    Conflict,
    /// Stored-state event published
    Notify,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl StateMachine for Stage {
    type Input = Step;

    fn transition(&self, step: &Step) -> TransitionResult<Self> {
        use Stage::*;

        if self.is_terminal() {
            return Err(TransitionError::Terminal(self.to_string()));
        }

        match (self, step) {
            (Received, Step::Load) => Ok(Loaded),
            (Loaded, Step::Accept) => Ok(Validated),
            (Loaded, Step::Reject) => Ok(Rejected),
            (Validated, Step::Reject) => Ok(Rejected),
            (Validated, Step::Mutate) => Ok(Mutated),
            (Mutated, Step::Persist) => Ok(Persisted),
            (Mutated, Step::Conflict) => Ok(Loaded),
            (Persisted, Step::Notify) => Ok(Notified),
            (from, step) => Err(TransitionError::InvalidTransition {
                from: from.to_string(),
                step: step.to_string(),
            }),
        }
    }
}

/// Stage machine that remembers every stage it passed through
#[derive(Debug, Clone)]
pub struct StageTracker {
    current: Stage,
    history: Vec<Stage>,
}

impl StageTracker {
    pub fn new() -> Self {
        Self {
            current: Stage::Received,
            history: vec![Stage::Received],
        }
    }

    pub fn advance(&mut self, step: Step) -> TransitionResult<Stage> {
        let next = self.current.transition(&step)?;
        self.current = next;
        self.history.push(next);
        Ok(next)
    }

    pub fn current(&self) -> Stage {
        self.current
    }

    /// Every stage visited, starting with `Received`
    pub fn history(&self) -> &[Stage] {
        &self.history
    }

    pub fn into_history(self) -> Vec<Stage> {
        self.history
    }
}

impl Default for StageTracker {
    fn default() -> Self {
        Self::new()
    }
}
