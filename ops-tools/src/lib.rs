//! Tool capabilities the planner can choose from and the executor can run.
//!
//! Every tool implements [`tool::Tool`]: a stable name, a description shown
//! to the model, a parameter schema, and an `invoke` that reports ordinary
//! failures as data ([`tool::ToolOutcome::Failure`]) rather than as errors.

#![warn(missing_docs, clippy::pedantic)]

pub mod github;
pub mod news;
pub mod registry;
pub mod tool;
pub mod weather;

mod fetch;

pub use registry::ToolRegistry;
pub use tool::{FnTool, Tool, ToolDescriptor, ToolError, ToolOutcome, ToolResult};
pub use fetch::DEFAULT_TOOL_TIMEOUT;
pub use github::GithubSearchTool;
pub use news::NewsTool;
pub use weather::WeatherTool;
