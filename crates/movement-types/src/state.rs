//! Lifecycle state (`estado`) and wizard steps

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Lifecycle tag of a movement, persisted with its Spanish wire name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MovementState {
    #[serde(rename = "generado")]
    Generated,
    #[serde(rename = "asignacion_recursos")]
    ResourceAssignment,
    #[serde(rename = "planificado")]
    Planned,
    #[serde(rename = "en_ejecucion")]
    InExecution,
    #[serde(rename = "cierre_operativo")]
    OperationalClose,
    #[serde(rename = "completado")]
    Completed,
    #[serde(rename = "cancelado")]
    Cancelled,
}

impl MovementState {
    /// Canonical forward chain; `Cancelled` is an exit, not part of it
    pub const FORWARD: [MovementState; 6] = [
        Self::Generated,
        Self::ResourceAssignment,
        Self::Planned,
        Self::InExecution,
        Self::OperationalClose,
        Self::Completed,
    ];

    pub const ALL: [MovementState; 7] = [
        Self::Generated,
        Self::ResourceAssignment,
        Self::Planned,
        Self::InExecution,
        Self::OperationalClose,
        Self::Completed,
        Self::Cancelled,
    ];

    /// Wire name stored in the `estado` column
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Generated => "generado",
            Self::ResourceAssignment => "asignacion_recursos",
            Self::Planned => "planificado",
            Self::InExecution => "en_ejecucion",
            Self::OperationalClose => "cierre_operativo",
            Self::Completed => "completado",
            Self::Cancelled => "cancelado",
        }
    }

    /// Position in the forward chain. `None` for `Cancelled`.
    pub fn rank(&self) -> Option<usize> {
        Self::FORWARD.iter().position(|s| s == self)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Step a resumed workflow lands on.
    ///
    /// A cancelled movement has no step of its own; it opens read-only on the
    /// request step.
    pub fn resume_step(&self) -> WizardStep {
        match self {
            Self::Generated => WizardStep::Request,
            Self::ResourceAssignment => WizardStep::Classification,
            Self::Planned => WizardStep::Planning,
            Self::InExecution => WizardStep::Execution,
            Self::OperationalClose | Self::Completed => WizardStep::Closeout,
            Self::Cancelled => WizardStep::Request,
        }
    }

    /// Whether `self -> next` is a legal lifecycle transition.
    ///
    /// Staying put is legal (re-committing a step). Forward moves go one link
    /// at a time, except that the closeout step itself stands for
    /// `cierre_operativo`, so `en_ejecucion -> completado` is allowed.
    pub fn can_transition_to(&self, next: MovementState) -> bool {
        if self.is_terminal() {
            return false;
        }
        if next == Self::Cancelled {
            return true;
        }
        match (self.rank(), next.rank()) {
            (Some(from), Some(to)) => {
                to == from
                    || to == from + 1
                    || (*self == Self::InExecution && next == Self::Completed)
            }
            _ => false,
        }
    }

    /// State to persist after committing a step whose target is `target`.
    ///
    /// Never moves backwards: re-committing an earlier step after navigating
    /// back keeps the later state.
    pub fn after_commit(current: Option<MovementState>, target: MovementState) -> MovementState {
        match current {
            Some(current) if current.rank() > target.rank() => current,
            _ => target,
        }
    }
}

impl fmt::Display for MovementState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown movement state: {0}")]
pub struct ParseStateError(pub String);

impl FromStr for MovementState {
    type Err = ParseStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| ParseStateError(s.to_string()))
    }
}

/// The five data-capture phases of the movement wizard
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WizardStep {
    Request = 1,
    Classification = 2,
    Planning = 3,
    Execution = 4,
    Closeout = 5,
}

impl WizardStep {
    pub const ALL: [WizardStep; 5] = [
        Self::Request,
        Self::Classification,
        Self::Planning,
        Self::Execution,
        Self::Closeout,
    ];

    pub fn number(&self) -> u8 {
        *self as u8
    }

    pub fn from_number(n: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.number() == n)
    }

    pub fn next(&self) -> Option<Self> {
        Self::from_number(self.number() + 1)
    }

    pub fn previous(&self) -> Option<Self> {
        self.number().checked_sub(1).and_then(Self::from_number)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Request => "request",
            Self::Classification => "classification",
            Self::Planning => "planning",
            Self::Execution => "execution",
            Self::Closeout => "closeout",
        }
    }

    /// `estado` written when this step commits successfully
    pub fn commit_target(&self) -> MovementState {
        match self {
            Self::Request => MovementState::Generated,
            Self::Classification => MovementState::ResourceAssignment,
            Self::Planning => MovementState::Planned,
            Self::Execution => MovementState::InExecution,
            Self::Closeout => MovementState::Completed,
        }
    }
}

impl fmt::Display for WizardStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "step {} ({})", self.number(), self.label())
    }
}
