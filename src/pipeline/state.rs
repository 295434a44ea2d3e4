//! Module lifecycle
//!
//! ```text
//! PENDING -> TESTING -> COLLECTING -> GATING -> PASSED
//!               |           |           |
//!               +-----------+-----------+----> FAILED
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ModuleState {
    Pending,
    Testing,
    Collecting,
    Gating,
    Passed,
    Failed,
}

impl ModuleState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ModuleState::Passed | ModuleState::Failed)
    }

    pub fn can_transition_to(&self, next: ModuleState) -> bool {
        use ModuleState::*;
        matches!(
            (self, next),
            (Pending, Testing)
                | (Testing, Collecting)
                | (Testing, Failed)
                | (Collecting, Gating)
                | (Collecting, Failed)
                | (Gating, Passed)
                | (Gating, Failed)
        )
    }
}

impl fmt::Display for ModuleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ModuleState::Pending => "PENDING",
            ModuleState::Testing => "TESTING",
            ModuleState::Collecting => "COLLECTING",
            ModuleState::Gating => "GATING",
            ModuleState::Passed => "PASSED",
            ModuleState::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("Illegal module state transition {from} -> {to}")]
pub struct TransitionError {
    pub from: ModuleState,
    pub to: ModuleState,
}

/// Current state plus every state visited, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateMachine {
    history: Vec<ModuleState>,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self {
            history: vec![ModuleState::Pending],
        }
    }
}

impl StateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ModuleState {
        self.history
            .last()
            .copied()
            .unwrap_or(ModuleState::Pending)
    }

    pub fn history(&self) -> &[ModuleState] {
        &self.history
    }

    pub fn transition(&mut self, next: ModuleState) -> Result<(), TransitionError> {
        let from = self.state();
        if !from.can_transition_to(next) {
            return Err(TransitionError { from, to: next });
        }
        self.history.push(next);
        Ok(())
    }

    pub fn into_history(self) -> Vec<ModuleState> {
        self.history
    }
}
