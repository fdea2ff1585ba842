//! Planned tool invocations produced by the planner.

use std::sync::LazyLock;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::schema::{self, FieldSchema, FieldType, ObjectSchema};

static STEP_SCHEMA: LazyLock<ObjectSchema> = LazyLock::new(|| {
    ObjectSchema::new("ExecutionStep")
        .describe("Single step in execution plan")
        .field(
            FieldSchema::required("step_number", FieldType::Integer)
                .describe("Step number in sequence")
                .with_minimum(1),
        )
        .field(FieldSchema::required("tool_name", FieldType::String).describe("Name of tool to use"))
        .field(
            FieldSchema::required("parameters", FieldType::Map)
                .describe("Parameters for tool execution"),
        )
        .field(
            FieldSchema::required("description", FieldType::String)
                .describe("Human-readable description of what this step does"),
        )
});

static PLAN_SCHEMA: LazyLock<ObjectSchema> = LazyLock::new(|| {
    ObjectSchema::new("ExecutionPlan")
        .describe("Complete execution plan")
        .field(
            FieldSchema::required("task_summary", FieldType::String)
                .describe("Summary of the user's task"),
        )
        .field(
            FieldSchema::required("steps", FieldType::array_of(FieldType::Object(STEP_SCHEMA.clone())))
                .describe("Ordered list of execution steps"),
        )
        .field(
            FieldSchema::required("expected_output", FieldType::String)
                .describe("Description of expected final output"),
        )
});

/// One planned tool invocation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExecutionStep {
    step_number: u32,
    tool_name: String,
    #[serde(default)]
    parameters: Map<String, Value>,
    description: String,
}

impl ExecutionStep {
    /// Creates a step.
    #[must_use]
    pub fn new(
        step_number: u32,
        tool_name: impl Into<String>,
        parameters: Map<String, Value>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            step_number,
            tool_name: tool_name.into(),
            parameters,
            description: description.into(),
        }
    }

    /// Returns the schema a step must satisfy.
    #[must_use]
    pub fn schema() -> &'static ObjectSchema {
        &STEP_SCHEMA
    }

    /// Returns the 1-based position in the plan.
    #[must_use]
    pub const fn step_number(&self) -> u32 {
        self.step_number
    }

    /// Returns the name of the tool to invoke.
    #[must_use]
    pub fn tool_name(&self) -> &str {
        &self.tool_name
    }

    /// Returns the parameters handed to the tool.
    #[must_use]
    pub fn parameters(&self) -> &Map<String, Value> {
        &self.parameters
    }

    /// Returns the human-readable purpose of the step.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }
}

/// Ordered sequence of steps answering a task.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExecutionPlan {
    task_summary: String,
    steps: Vec<ExecutionStep>,
    expected_output: String,
}

impl ExecutionPlan {
    /// Creates a plan from already-validated parts.
    #[must_use]
    pub fn new(
        task_summary: impl Into<String>,
        steps: Vec<ExecutionStep>,
        expected_output: impl Into<String>,
    ) -> Self {
        Self {
            task_summary: task_summary.into(),
            steps,
            expected_output: expected_output.into(),
        }
    }

    /// Returns the schema a plan must satisfy.
    #[must_use]
    pub fn schema() -> &'static ObjectSchema {
        &PLAN_SCHEMA
    }

    /// Validates `value` against [`ExecutionPlan::schema`] and decodes it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SchemaViolation`] when the value does not match the
    /// schema, or [`Error::Decode`] when it cannot be represented (for
    /// example a step number beyond `u32::MAX`).
    pub fn from_value(value: Value) -> Result<Self> {
        let value = schema::conform(Self::schema(), value)?;
        serde_json::from_value(value).map_err(|source| Error::Decode {
            target: "execution plan",
            source,
        })
    }

    /// Returns the model's summary of the task.
    #[must_use]
    pub fn task_summary(&self) -> &str {
        &self.task_summary
    }

    /// Returns the steps in execution order.
    #[must_use]
    pub fn steps(&self) -> &[ExecutionStep] {
        &self.steps
    }

    /// Returns the description of the expected final output.
    #[must_use]
    pub fn expected_output(&self) -> &str {
        &self.expected_output
    }

    /// Iterates over the tool names referenced by the plan, in step order.
    pub fn tool_names(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().map(ExecutionStep::tool_name)
    }
}
