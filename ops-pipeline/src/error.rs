//! Error types for the pipeline stages.

use ops_adapters::gateway::GatewayError;
use thiserror::Error;

/// Result alias for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Fatal pipeline errors. Everything past planning is reported as data.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The planner could not produce a usable plan.
    #[error("Planning failed: {source}")]
    PlanningFailed {
        /// Underlying cause.
        #[from]
        source: PlanningError,
    },
}

/// Causes of a planning failure.
#[derive(Debug, Error)]
pub enum PlanningError {
    /// The model call or its output parsing failed.
    #[error(transparent)]
    Generation(#[from] GatewayError),

    /// The output did not describe a valid plan.
    #[error(transparent)]
    InvalidPlan(#[from] ops_primitives::Error),

    /// A step referenced a tool that is not registered.
    #[error("Invalid tool in plan: {name}")]
    UnknownTool {
        /// Name the model asked for.
        name: String,
    },
}

/// Whether a reported tool failure is worth another attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureClass {
    /// May succeed if attempted again.
    Transient,
    /// Will fail the same way again (unknown city, missing resource).
    Permanent,
}

/// Why a step did not succeed. Rendered into the step's failed outcome.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum StepFailure {
    /// The plan named a tool that is not registered.
    #[error("Tool '{name}' not found")]
    ToolNotFound {
        /// Requested tool name.
        name: String,
    },

    /// The tool reported a failure as part of its result.
    #[error("{message}")]
    Reported {
        /// Tool-supplied message.
        message: String,
        /// Retry classification of the message.
        class: FailureClass,
    },

    /// The tool raised an error instead of reporting a result.
    #[error("{message}")]
    Raised {
        /// Error message.
        message: String,
    },

    /// No attempt recorded a usable error message.
    #[error("Execution failed after retries")]
    Exhausted,
}

impl StepFailure {
    /// Returns `true` if another attempt may help.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ToolNotFound { .. } => false,
            Self::Reported { class, .. } => *class == FailureClass::Transient,
            Self::Raised { .. } | Self::Exhausted => true,
        }
    }
}

/// Verification could not obtain a model judgment; the caller falls back.
#[derive(Debug, Error)]
pub enum JudgmentError {
    /// The model call or its output parsing failed.
    #[error(transparent)]
    Generation(#[from] GatewayError),

    /// The output did not describe a valid judgment.
    #[error(transparent)]
    Invalid(#[from] ops_primitives::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn planning_failure_message_names_the_cause() {
        let err = PipelineError::from(PlanningError::UnknownTool {
            name: "get_stock_price".into(),
        });
        assert_eq!(err.to_string(), "Planning failed: Invalid tool in plan: get_stock_price");
    }

    #[test]
    fn only_transient_failures_are_retryable() {
        let permanent = StepFailure::Reported {
            message: "City 'Atlantis' not found".into(),
            class: FailureClass::Permanent,
        };
        assert!(!permanent.is_retryable());
        assert!(StepFailure::Raised { message: "timeout".into() }.is_retryable());
        assert_eq!(
            StepFailure::ToolNotFound { name: "x".into() }.to_string(),
            "Tool 'x' not found"
        );
    }
}
