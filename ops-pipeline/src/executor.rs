//! Runs plan steps against the tool registry with bounded retries.

use std::sync::Arc;

use ops_primitives::{ExecutionPlan, ExecutionStep, StepResult};
use ops_tools::{ToolOutcome, ToolRegistry};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{FailureClass, StepFailure};

/// Attempts per step unless overridden.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Executes steps strictly in plan order, one at a time.
#[derive(Clone, Debug)]
pub struct Executor {
    tools: Arc<ToolRegistry>,
    max_retries: u32,
}

impl Executor {
    /// Creates an executor with [`DEFAULT_MAX_RETRIES`] attempts per step.
    #[must_use]
    pub fn new(tools: Arc<ToolRegistry>) -> Self {
        Self {
            tools,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Sets the number of attempts per step.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Returns the number of attempts per step.
    #[must_use]
    pub const fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Runs every step and returns one result per step, in plan order.
    ///
    /// Step failures never abort the plan.
    pub async fn execute_plan(&self, plan: &ExecutionPlan) -> Vec<StepResult> {
        let total = plan.steps().len();
        let mut results = Vec::with_capacity(total);

        for (index, step) in plan.steps().iter().enumerate() {
            let result = self.execute_step(step).await;
            match result.error() {
                None => info!(
                    step = step.step_number(),
                    tool = step.tool_name(),
                    position = index + 1,
                    total,
                    "step succeeded"
                ),
                Some(error) => warn!(
                    step = step.step_number(),
                    tool = step.tool_name(),
                    position = index + 1,
                    total,
                    error,
                    "step failed"
                ),
            }
            results.push(result);
        }

        results
    }

    /// Runs a single step.
    pub async fn execute_step(&self, step: &ExecutionStep) -> StepResult {
        match self.attempt(step).await {
            Ok(data) => StepResult::succeeded(step.clone(), data),
            Err(failure) => StepResult::failed(step.clone(), failure.to_string()),
        }
    }

    async fn attempt(&self, step: &ExecutionStep) -> Result<Value, StepFailure> {
        let Some(tool) = self.tools.get(step.tool_name()) else {
            return Err(StepFailure::ToolNotFound {
                name: step.tool_name().to_owned(),
            });
        };

        let mut last_failure = None;
        for attempt in 1..=self.max_retries {
            let failure = match tool.invoke(step.parameters()).await {
                Ok(ToolOutcome::Success(data)) => return Ok(data),
                Ok(ToolOutcome::Failure(message)) => StepFailure::Reported {
                    class: classify_failure(&message),
                    message,
                },
                Err(err) => StepFailure::Raised {
                    message: err.reason(),
                },
            };

            debug!(
                step = step.step_number(),
                tool = step.tool_name(),
                attempt,
                error = %failure,
                retryable = failure.is_retryable(),
                "attempt failed"
            );
            let retryable = failure.is_retryable();
            last_failure = Some(failure);
            if !retryable {
                break;
            }
        }

        Err(last_failure
            .filter(|failure| !failure.to_string().is_empty())
            .unwrap_or(StepFailure::Exhausted))
    }
}

/// Classifies a tool-reported failure message.
///
/// Messages mentioning "not found" (any case) are permanent; everything else
/// is worth retrying.
// TODO: have tools report a structured error kind and drop the substring match.
#[must_use]
pub fn classify_failure(message: &str) -> FailureClass {
    if message.to_lowercase().contains("not found") {
        FailureClass::Permanent
    } else {
        FailureClass::Transient
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_is_permanent_in_any_case() {
        assert_eq!(classify_failure("City 'Atlantis' not found"), FailureClass::Permanent);
        assert_eq!(classify_failure("404 Not Found for url: x"), FailureClass::Permanent);
        assert_eq!(classify_failure("NOT FOUND"), FailureClass::Permanent);
    }

    #[test]
    fn other_failures_are_transient() {
        assert_eq!(classify_failure("connection reset"), FailureClass::Transient);
        assert_eq!(classify_failure("503 Service Unavailable"), FailureClass::Transient);
    }
}
