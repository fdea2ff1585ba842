//! The three-stage task pipeline: plan, execute, verify.
//!
//! A [`Pipeline`] asks the model for an [`ExecutionPlan`](ops_primitives::ExecutionPlan)
//! over the registered tools, runs every step in order through the
//! [`Executor`], and hands the step results to the [`Verifier`], which scores
//! them and assembles the final report. Only planning failures abort a run;
//! everything after that is reported as data.

#![warn(missing_docs, clippy::pedantic)]

mod error;
mod executor;
mod pipeline;
mod planner;
mod prompts;
mod verifier;

pub use error::{FailureClass, JudgmentError, PipelineError, PipelineResult, PlanningError, StepFailure};
pub use executor::{DEFAULT_MAX_RETRIES, Executor, classify_failure};
pub use pipeline::{Pipeline, PlanView, PlannedStep, STAGES, TaskResponse};
pub use planner::{DEFAULT_PLANNING_TEMPERATURE, Planner};
pub use verifier::{
    DEFAULT_VERIFICATION_TEMPERATURE, FALLBACK_SUGGESTION, Verifier, fallback_judgment,
    group_results,
};
