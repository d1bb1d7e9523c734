//! Error types for the movement workflow

use movement_types::{MovementState, WizardStep};
use thiserror::Error;

/// Main error type for all movement workflow operations
#[derive(Error, Debug)]
pub enum MovementError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File system error: {0}")]
    Io(#[from] std::io::Error),

    /// A step validator rejected the working copy; nothing was written
    #[error("Validation failed at {step}: {}", .violations.join("; "))]
    Validation {
        step: WizardStep,
        violations: Vec<String>,
    },

    /// The data service rejected a step commit; the working copy is untouched
    #[error("{step} commit failed while {operation}: {source}")]
    Commit {
        step: WizardStep,
        operation: String,
        #[source]
        source: Box<MovementError>,
    },

    /// Call sequence that normal wizard navigation cannot produce
    #[error("Precondition violated: {0}")]
    Precondition(String),

    #[error("Movement is {0} and can no longer be edited")]
    Immutable(MovementState),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Data service error: {0}")]
    Repository(String),
}

impl MovementError {
    /// Wrap a data-service failure with the step and operation it broke
    pub fn commit(step: WizardStep, operation: impl Into<String>, source: MovementError) -> Self {
        Self::Commit {
            step,
            operation: operation.into(),
            source: Box::new(source),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}

/// Result type for movement workflow operations
pub type Result<T> = std::result::Result<T, MovementError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_error_names_step_and_cause() {
        let err = MovementError::commit(
            WizardStep::Planning,
            "assigning employees",
            MovementError::Repository("connection reset".to_string()),
        );
        assert_eq!(
            err.to_string(),
            "step 3 (planning) commit failed while assigning employees: Data service error: connection reset"
        );
    }

    #[test]
    fn test_validation_error_lists_violations() {
        let err = MovementError::Validation {
            step: WizardStep::Request,
            violations: vec!["subject is required".to_string()],
        };
        assert!(err.is_validation());
        assert_eq!(err.to_string(), "Validation failed at step 1 (request): subject is required");
    }
}
