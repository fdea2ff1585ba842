//! Core shared types for the operations assistant pipeline.
//!
//! Everything the planner, executor, and verifier exchange lives here so the
//! stages only agree on data, never on each other's internals.

#![warn(missing_docs, clippy::pedantic)]

mod error;
mod ids;
mod output;
mod plan;
mod result;
pub mod schema;

/// Error type and result alias shared across the workspace.
pub use error::{Error, Result};
/// Identifier attached to a single pipeline invocation.
pub use ids::RunId;
/// Verification judgment and the final structured report.
pub use output::{
    FinalOutput, GroupedResults, RunMetadata, RunStatus, StepError, VerificationJudgment,
    VerificationSummary,
};
/// Planned tool invocations.
pub use plan::{ExecutionPlan, ExecutionStep};
/// Per-step execution results.
pub use result::{StepOutcome, StepResult};
/// Explicit schema descriptions used for model output and tool parameters.
pub use schema::{FieldSchema, FieldType, ObjectSchema};
