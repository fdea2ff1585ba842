//! Per-step execution results.

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::plan::ExecutionStep;

/// What happened when a step ran.
#[derive(Clone, Debug, PartialEq)]
pub enum StepOutcome {
    /// The tool reported success with this payload (which may be `null`).
    Succeeded(Value),
    /// The step failed with this message.
    Failed(String),
}

/// Result of executing a single [`ExecutionStep`].
///
/// Serialises as `{step_number, tool_name, description, success, data, error}`.
#[derive(Clone, Debug, PartialEq)]
pub struct StepResult {
    step: ExecutionStep,
    outcome: StepOutcome,
}

impl StepResult {
    /// Records a successful step.
    #[must_use]
    pub fn succeeded(step: ExecutionStep, data: Value) -> Self {
        Self {
            step,
            outcome: StepOutcome::Succeeded(data),
        }
    }

    /// Records a failed step.
    #[must_use]
    pub fn failed(step: ExecutionStep, error: impl Into<String>) -> Self {
        Self {
            step,
            outcome: StepOutcome::Failed(error.into()),
        }
    }

    /// Returns the step this result answers.
    #[must_use]
    pub fn step(&self) -> &ExecutionStep {
        &self.step
    }

    /// Returns the outcome.
    #[must_use]
    pub fn outcome(&self) -> &StepOutcome {
        &self.outcome
    }

    /// Returns `true` if the step succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, StepOutcome::Succeeded(_))
    }

    /// Returns the payload of a successful step.
    #[must_use]
    pub fn data(&self) -> Option<&Value> {
        match &self.outcome {
            StepOutcome::Succeeded(data) => Some(data),
            StepOutcome::Failed(_) => None,
        }
    }

    /// Returns the error of a failed step.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            StepOutcome::Succeeded(_) => None,
            StepOutcome::Failed(error) => Some(error),
        }
    }

    /// Returns `true` if the step produced a non-null payload.
    #[must_use]
    pub fn has_data(&self) -> bool {
        self.data().is_some_and(|data| !data.is_null())
    }
}

impl Serialize for StepResult {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("StepResult", 6)?;
        state.serialize_field("step_number", &self.step.step_number())?;
        state.serialize_field("tool_name", self.step.tool_name())?;
        state.serialize_field("description", self.step.description())?;
        state.serialize_field("success", &self.is_success())?;
        state.serialize_field("data", &self.data())?;
        state.serialize_field("error", &self.error())?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Map, json};

    fn step() -> ExecutionStep {
        ExecutionStep::new(2, "get_news", Map::new(), "Latest headlines")
    }

    #[test]
    fn exposes_exactly_one_of_data_or_error() {
        let ok = StepResult::succeeded(step(), json!({ "articles": [] }));
        assert!(ok.is_success());
        assert!(ok.has_data());
        assert!(ok.error().is_none());

        let failed = StepResult::failed(step(), "News API request failed: timeout");
        assert!(!failed.is_success());
        assert!(failed.data().is_none());
        assert_eq!(failed.error(), Some("News API request failed: timeout"));
    }

    #[test]
    fn null_payload_counts_as_no_data() {
        let result = StepResult::succeeded(step(), Value::Null);
        assert!(result.is_success());
        assert!(!result.has_data());
    }

    #[test]
    fn serialises_flat_view() {
        let failed = StepResult::failed(step(), "boom");
        assert_eq!(
            serde_json::to_value(&failed).unwrap(),
            json!({
                "step_number": 2,
                "tool_name": "get_news",
                "description": "Latest headlines",
                "success": false,
                "data": null,
                "error": "boom"
            })
        );
    }
}
