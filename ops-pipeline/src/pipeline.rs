//! Wires planner, executor, and verifier into one invocation.

use std::sync::Arc;

use ops_adapters::gateway::ModelGateway;
use ops_primitives::{ExecutionPlan, GroupedResults, RunId, RunMetadata, RunStatus};
use ops_tools::ToolRegistry;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{Instrument, info, info_span};

use crate::error::PipelineResult;
use crate::executor::Executor;
use crate::planner::Planner;
use crate::verifier::Verifier;

/// Names of the stages a run passes through, in order.
pub const STAGES: [&str; 3] = ["planner", "executor", "verifier"];

/// One planned step as echoed back to the caller.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PlannedStep {
    /// 1-based position.
    pub step_number: u32,
    /// Tool the step invoked.
    pub tool: String,
    /// What the step was meant to do.
    pub description: String,
    /// Parameters passed to the tool.
    pub parameters: Map<String, Value>,
}

/// The plan as echoed back to the caller.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PlanView {
    /// Steps in execution order.
    pub steps: Vec<PlannedStep>,
    /// What the plan was expected to produce.
    pub expected_output: String,
}

impl From<&ExecutionPlan> for PlanView {
    fn from(plan: &ExecutionPlan) -> Self {
        Self {
            steps: plan
                .steps()
                .iter()
                .map(|step| PlannedStep {
                    step_number: step.step_number(),
                    tool: step.tool_name().to_owned(),
                    description: step.description().to_owned(),
                    parameters: step.parameters().clone(),
                })
                .collect(),
            expected_output: plan.expected_output().to_owned(),
        }
    }
}

/// Everything a caller gets back from a successful run.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TaskResponse {
    /// Summary of the task taken from the plan.
    pub task_summary: String,
    /// Overall status.
    pub status: RunStatus,
    /// Successful payloads grouped by tool name.
    pub results: GroupedResults,
    /// Statistics and verification details.
    pub metadata: RunMetadata,
    /// The plan that was executed.
    pub execution_plan: PlanView,
}

/// The full plan → execute → verify pipeline.
///
/// Holds only shared, read-only state, so one instance can serve concurrent
/// runs.
#[derive(Clone, Debug)]
pub struct Pipeline {
    tools: Arc<ToolRegistry>,
    planner: Planner,
    executor: Executor,
    verifier: Verifier,
}

impl Pipeline {
    /// Builds a pipeline with default retries and temperatures.
    #[must_use]
    pub fn new(gateway: Arc<dyn ModelGateway>, tools: Arc<ToolRegistry>) -> Self {
        Self {
            planner: Planner::new(Arc::clone(&gateway), Arc::clone(&tools)),
            executor: Executor::new(Arc::clone(&tools)),
            verifier: Verifier::new(gateway),
            tools,
        }
    }

    /// Sets the number of attempts per step.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.executor = self.executor.with_max_retries(max_retries);
        self
    }

    /// Sets the planning temperature.
    #[must_use]
    pub fn with_planning_temperature(mut self, temperature: f32) -> Self {
        self.planner = self.planner.with_temperature(temperature);
        self
    }

    /// Sets the verification temperature.
    #[must_use]
    pub fn with_verification_temperature(mut self, temperature: f32) -> Self {
        self.verifier = self.verifier.with_temperature(temperature);
        self
    }

    /// Returns the tool registry the pipeline plans against.
    #[must_use]
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Runs `task` through all three stages.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::PlanningFailed`](crate::PipelineError::PlanningFailed)
    /// if no valid plan could be produced. Step and verification failures are
    /// reported inside the response instead.
    pub async fn run(&self, task: &str) -> PipelineResult<TaskResponse> {
        let run_id = RunId::new();
        async {
            info!(task, "creating execution plan");
            let plan = self.planner.create_plan(task).await?;

            info!(steps = plan.steps().len(), "executing plan");
            let results = self.executor.execute_plan(&plan).await;

            info!("verifying results");
            let output = self.verifier.verify_and_format(&plan, &results).await;
            info!(
                status = %output.status,
                quality_score = output.metadata.quality_score,
                "run finished"
            );

            Ok(TaskResponse {
                task_summary: output.task_summary,
                status: output.status,
                results: output.results,
                metadata: output.metadata,
                execution_plan: PlanView::from(&plan),
            })
        }
        .instrument(info_span!("pipeline", %run_id))
        .await
    }
}
