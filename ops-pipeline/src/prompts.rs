//! Instruction text for the planning and verification model calls.

use ops_primitives::{ExecutionPlan, StepResult};
use ops_tools::ToolDescriptor;
use serde_json::{Value, json};

pub(crate) const VERIFIER_SYSTEM: &str = "You are a Verifier Agent in an AI Operations Assistant system.

Your role is to validate execution results and assess their quality.

Evaluate:
1. Completeness - Did we get all expected data?
2. Validity - Is the data useful and relevant?
3. Quality - How well does it answer the user's task?

Provide constructive feedback and suggestions.";

pub(crate) fn planner_system(tools: &[ToolDescriptor]) -> String {
    let catalogue = tools
        .iter()
        .map(|tool| {
            format!(
                "- {}: {}\n  Parameters: {}",
                tool.name, tool.description, tool.parameters
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are a Planner Agent in an AI Operations Assistant system.

Your role is to analyze user requests and create a structured execution plan using available tools.

Available Tools:
{catalogue}

Instructions:
1. Understand the user's task and break it down into sequential steps
2. Select appropriate tools for each step
3. Specify exact parameters needed for each tool
4. Ensure steps are in logical order
5. Each step should have a clear purpose
6. The plan should be complete and executable

Output a structured JSON plan following the ExecutionPlan schema."
    )
}

pub(crate) fn planner_user(task: &str) -> String {
    format!(
        "User Task: {task}

Create a detailed execution plan to accomplish this task using the available tools.
Break down the task into clear, sequential steps."
    )
}

/// Per-step digest the verifier model sees; payloads themselves are withheld.
pub(crate) fn results_digest(results: &[StepResult]) -> Value {
    Value::Array(
        results
            .iter()
            .map(|result| {
                json!({
                    "step": result.step().description(),
                    "success": result.is_success(),
                    "has_data": result.has_data(),
                    "error": result.error(),
                })
            })
            .collect(),
    )
}

pub(crate) fn verifier_user(plan: &ExecutionPlan, results: &[StepResult]) -> String {
    let digest = serde_json::to_string_pretty(&results_digest(results))
        .unwrap_or_else(|_| results_digest(results).to_string());

    format!(
        "Task: {}
Expected Output: {}

Execution Results:
{digest}

Verify the quality and completeness of these results.",
        plan.task_summary(),
        plan.expected_output()
    )
}
