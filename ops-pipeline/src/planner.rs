//! Turns a natural-language task into a validated execution plan.

use std::fmt;
use std::sync::Arc;

use ops_adapters::gateway::ModelGateway;
use ops_primitives::ExecutionPlan;
use ops_tools::ToolRegistry;
use tracing::{debug, info};

use crate::error::{PipelineResult, PlanningError};
use crate::prompts;

/// Sampling temperature used for planning unless overridden.
pub const DEFAULT_PLANNING_TEMPERATURE: f32 = 0.3;

/// Asks the model for a plan restricted to the registered tools.
#[derive(Clone)]
pub struct Planner {
    gateway: Arc<dyn ModelGateway>,
    tools: Arc<ToolRegistry>,
    temperature: f32,
}

impl fmt::Debug for Planner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Planner")
            .field("model", &self.gateway.model())
            .field("tools", &self.tools.len())
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl Planner {
    /// Creates a planner over the supplied gateway and registry.
    #[must_use]
    pub fn new(gateway: Arc<dyn ModelGateway>, tools: Arc<ToolRegistry>) -> Self {
        Self {
            gateway,
            tools,
            temperature: DEFAULT_PLANNING_TEMPERATURE,
        }
    }

    /// Overrides the sampling temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Produces a plan for `task`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::PlanningFailed`](crate::PipelineError::PlanningFailed)
    /// when the model call fails, its output is not a valid plan, or a step
    /// names an unregistered tool. There is no retry at this layer.
    pub async fn create_plan(&self, task: &str) -> PipelineResult<ExecutionPlan> {
        Ok(self.plan(task).await?)
    }

    async fn plan(&self, task: &str) -> Result<ExecutionPlan, PlanningError> {
        let system = prompts::planner_system(&self.tools.descriptors());
        let user = prompts::planner_user(task);

        let raw = self
            .gateway
            .generate_structured(&system, &user, ExecutionPlan::schema(), self.temperature)
            .await?;
        debug!(model = self.gateway.model(), "plan received");

        let plan = ExecutionPlan::from_value(raw)?;
        self.check_tools(&plan)?;

        info!(steps = plan.steps().len(), "plan created");
        Ok(plan)
    }

    fn check_tools(&self, plan: &ExecutionPlan) -> Result<(), PlanningError> {
        match plan.tool_names().find(|name| !self.tools.contains(name)) {
            Some(name) => Err(PlanningError::UnknownTool {
                name: name.to_owned(),
            }),
            None => Ok(()),
        }
    }
}
