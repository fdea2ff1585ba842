//! Scores step results and assembles the final report.

use std::fmt;
use std::sync::Arc;

use ops_adapters::gateway::ModelGateway;
use ops_primitives::{
    ExecutionPlan, FinalOutput, GroupedResults, RunMetadata, RunStatus, StepError, StepResult,
    VerificationJudgment, VerificationSummary,
};
use serde_json::Value;
use tracing::{info, warn};

use crate::error::JudgmentError;
use crate::prompts;

/// Sampling temperature used for verification unless overridden.
pub const DEFAULT_VERIFICATION_TEMPERATURE: f32 = 0.3;

/// Suggestion attached to every fallback judgment.
pub const FALLBACK_SUGGESTION: &str = "Some steps failed - check error details";

/// Builds the [`FinalOutput`] for a run. Never fails.
#[derive(Clone)]
pub struct Verifier {
    gateway: Arc<dyn ModelGateway>,
    temperature: f32,
}

impl fmt::Debug for Verifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Verifier")
            .field("model", &self.gateway.model())
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl Verifier {
    /// Creates a verifier over the supplied gateway.
    #[must_use]
    pub fn new(gateway: Arc<dyn ModelGateway>) -> Self {
        Self {
            gateway,
            temperature: DEFAULT_VERIFICATION_TEMPERATURE,
        }
    }

    /// Overrides the sampling temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Judges `results` and assembles the report.
    ///
    /// A failed judgment call degrades to [`fallback_judgment`].
    pub async fn verify_and_format(&self, plan: &ExecutionPlan, results: &[StepResult]) -> FinalOutput {
        let successful_steps = results.iter().filter(|result| result.is_success()).count();
        let failed_steps = results.len() - successful_steps;
        let status = RunStatus::from_counts(successful_steps, failed_steps);

        let judgment = match self.judge(plan, results).await {
            Ok(judgment) => judgment,
            Err(err) => {
                warn!(error = %err, "verification degraded, using fallback judgment");
                fallback_judgment(results)
            }
        };

        let errors: Vec<StepError> = results
            .iter()
            .filter_map(|result| {
                result.error().map(|error| StepError {
                    step: result.step().step_number(),
                    tool: result.step().tool_name().to_owned(),
                    error: error.to_owned(),
                })
            })
            .collect();

        info!(%status, quality_score = judgment.quality_score, "verification complete");
        FinalOutput {
            task_summary: plan.task_summary().to_owned(),
            status,
            results: group_results(results),
            metadata: RunMetadata {
                total_steps: results.len(),
                successful_steps,
                failed_steps,
                quality_score: judgment.quality_score,
                verification: VerificationSummary::from(&judgment),
                errors: (!errors.is_empty()).then_some(errors),
            },
        }
    }

    async fn judge(
        &self,
        plan: &ExecutionPlan,
        results: &[StepResult],
    ) -> Result<VerificationJudgment, JudgmentError> {
        let raw = self
            .gateway
            .generate_structured(
                prompts::VERIFIER_SYSTEM,
                &prompts::verifier_user(plan, results),
                VerificationJudgment::schema(),
                self.temperature,
            )
            .await?;
        Ok(VerificationJudgment::from_value(raw)?)
    }
}

/// Deterministic judgment derived from success counts alone.
#[must_use]
pub fn fallback_judgment(results: &[StepResult]) -> VerificationJudgment {
    let total = results.len();
    let successful = results.iter().filter(|result| result.is_success()).count();

    VerificationJudgment {
        is_complete: successful == total,
        is_valid: successful > 0,
        missing_data: results
            .iter()
            .filter(|result| !result.is_success())
            .map(|result| result.step().description().to_owned())
            .collect(),
        quality_score: rounded_score(successful, total),
        suggestions: vec![FALLBACK_SUGGESTION.to_owned()],
    }
}

/// `round(successful / total * 10)`, half away from zero; 0 for no steps.
fn rounded_score(successful: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let tenths = (successful * 20 + total) / (2 * total);
    u8::try_from(tenths).unwrap_or(10)
}

/// Groups non-empty successful payloads by tool name, each list in call order.
#[must_use]
pub fn group_results(results: &[StepResult]) -> GroupedResults {
    let mut grouped = GroupedResults::new();
    for result in results {
        if let Some(data) = result.data().filter(|data| is_present(data)) {
            grouped.push(result.step().tool_name(), data.clone());
        }
    }
    grouped
}

/// `null`, `false`, zero, and empty strings, arrays, or objects count as absent.
#[allow(clippy::float_cmp)]
fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
    }
}
