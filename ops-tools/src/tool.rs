//! The tool capability contract.

use std::fmt;
use std::future::Future;

use async_trait::async_trait;
use ops_primitives::ObjectSchema;
use ops_primitives::schema::conform;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use thiserror::Error;

/// Result alias for tool operations.
pub type ToolResult<T> = Result<T, ToolError>;

/// Uniform result of a tool invocation.
#[derive(Clone, Debug, PartialEq)]
pub enum ToolOutcome {
    /// The tool produced a payload.
    Success(Value),
    /// The tool failed in an ordinary way (bad input, upstream error, network).
    Failure(String),
}

impl ToolOutcome {
    /// Convenience constructor for failures.
    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure(message.into())
    }

    /// Renders the `{success, data}` / `{success, error}` wire shape.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Success(data) => json!({ "success": true, "data": data }),
            Self::Failure(error) => json!({ "success": false, "error": error }),
        }
    }
}

/// Errors raised by tools and the registry.
///
/// A tool returning `Err` is treated by the executor as a transient failure;
/// ordinary failures belong in [`ToolOutcome::Failure`].
#[derive(Debug, Error)]
pub enum ToolError {
    /// Tool name collided with an existing registration.
    #[error("tool `{name}` is already registered")]
    DuplicateTool {
        /// Name of the offending tool.
        name: String,
    },

    /// Tool name is unusable.
    #[error("invalid tool name: {reason}")]
    InvalidName {
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// Tool is missing configuration such as an API key.
    #[error("tool not configured: {reason}")]
    Configuration {
        /// Human-readable reason.
        reason: String,
    },

    /// Tool execution failed unexpectedly.
    #[error("tool execution failed: {reason}")]
    Execution {
        /// Human-readable error returned by the tool implementation.
        reason: String,
    },
}

impl ToolError {
    /// Creates an execution error from the supplied reason.
    #[must_use]
    pub fn execution(reason: impl Into<String>) -> Self {
        Self::Execution {
            reason: reason.into(),
        }
    }

    /// Creates a configuration error from the supplied reason.
    #[must_use]
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// Failure text without the variant prefix.
    #[must_use]
    pub fn reason(&self) -> String {
        match self {
            Self::Execution { reason }
            | Self::Configuration { reason }
            | Self::InvalidName { reason } => reason.clone(),
            Self::DuplicateTool { .. } => self.to_string(),
        }
    }
}

/// Name, description, and rendered parameter schema of a tool.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Unique tool name.
    pub name: String,
    /// Natural-language summary shown to the model.
    pub description: String,
    /// JSON-Schema-shaped parameter description.
    pub parameters: Value,
}

/// A named, describable, invocable unit of external work.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique, stable identifier.
    fn name(&self) -> &str;

    /// Capability summary shown to the model during planning.
    fn description(&self) -> &str;

    /// Accepted parameters with types, defaults, and choices.
    fn parameter_schema(&self) -> &ObjectSchema;

    /// Runs the tool.
    ///
    /// # Errors
    ///
    /// Implementations return `Err` only for unexpected faults; bad input and
    /// upstream or network errors are reported as [`ToolOutcome::Failure`].
    async fn invoke(&self, parameters: &Map<String, Value>) -> ToolResult<ToolOutcome>;

    /// Returns the descriptor used in prompts and listings.
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: self.name().to_owned(),
            description: self.description().to_owned(),
            parameters: self.parameter_schema().to_json_schema(),
        }
    }
}

/// Conforms `parameters` to `schema` and decodes them into `T`.
///
/// # Errors
///
/// Returns a human-readable message suitable for [`ToolOutcome::Failure`].
pub fn decode_parameters<T>(schema: &ObjectSchema, parameters: &Map<String, Value>) -> Result<T, String>
where
    T: DeserializeOwned,
{
    let value = conform(schema, Value::Object(parameters.clone()))
        .map_err(|err| format!("Invalid parameters: {err}"))?;
    serde_json::from_value(value).map_err(|err| format!("Invalid parameters: {err}"))
}

/// Tool backed by an async closure.
pub struct FnTool<F> {
    name: String,
    description: String,
    schema: ObjectSchema,
    handler: F,
}

impl<F> fmt::Debug for FnTool<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnTool")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl<F, Fut> FnTool<F>
where
    F: Fn(Map<String, Value>) -> Fut + Send + Sync,
    Fut: Future<Output = ToolResult<ToolOutcome>> + Send,
{
    /// Wraps `handler` as a tool.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        schema: ObjectSchema,
        handler: F,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            schema,
            handler,
        }
    }
}

#[async_trait]
impl<F, Fut> Tool for FnTool<F>
where
    F: Fn(Map<String, Value>) -> Fut + Send + Sync,
    Fut: Future<Output = ToolResult<ToolOutcome>> + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameter_schema(&self) -> &ObjectSchema {
        &self.schema
    }

    async fn invoke(&self, parameters: &Map<String, Value>) -> ToolResult<ToolOutcome> {
        (self.handler)(parameters.clone()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ops_primitives::{FieldSchema, FieldType};
    use serde::Deserialize;

    fn echo_schema() -> ObjectSchema {
        ObjectSchema::new("EchoParams")
            .field(FieldSchema::required("message", FieldType::String))
            .field(FieldSchema::optional("times", FieldType::Integer).with_default(1))
    }

    #[derive(Debug, Deserialize)]
    struct EchoParams {
        message: String,
        times: u32,
    }

    #[tokio::test]
    async fn closure_tool_invokes_handler() {
        let tool = FnTool::new("echo", "Echo the input", echo_schema(), |params| async move {
            Ok(ToolOutcome::Success(Value::Object(params)))
        });

        let mut params = Map::new();
        params.insert("message".into(), json!("hi"));
        let outcome = tool.invoke(&params).await.unwrap();
        assert_eq!(outcome, ToolOutcome::Success(json!({ "message": "hi" })));
    }

    #[test]
    fn descriptor_renders_schema() {
        let tool = FnTool::new("echo", "Echo the input", echo_schema(), |_params| async {
            Ok(ToolOutcome::failure("unused"))
        });
        let descriptor = tool.descriptor();
        assert_eq!(descriptor.name, "echo");
        assert_eq!(descriptor.parameters["required"], json!(["message"]));
    }

    #[test]
    fn decodes_parameters_with_defaults() {
        let mut params = Map::new();
        params.insert("message".into(), json!("hi"));
        let decoded: EchoParams = decode_parameters(&echo_schema(), &params).unwrap();
        assert_eq!(decoded.message, "hi");
        assert_eq!(decoded.times, 1);
    }

    #[test]
    fn reports_invalid_parameters_as_message() {
        let err = decode_parameters::<EchoParams>(&echo_schema(), &Map::new()).unwrap_err();
        assert!(err.starts_with("Invalid parameters"));
        assert!(err.contains("message"));
    }

    #[test]
    fn reason_drops_variant_prefix() {
        let err = ToolError::execution("connection reset by peer");
        assert_eq!(err.to_string(), "tool execution failed: connection reset by peer");
        assert_eq!(err.reason(), "connection reset by peer");

        let duplicate = ToolError::DuplicateTool { name: "echo".into() };
        assert_eq!(duplicate.reason(), "tool `echo` is already registered");
    }

    #[test]
    fn outcome_wire_shape() {
        assert_eq!(
            ToolOutcome::failure("City 'X' not found").to_value(),
            json!({ "success": false, "error": "City 'X' not found" })
        );
    }
}
