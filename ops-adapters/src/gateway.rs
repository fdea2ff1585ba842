//! Model gateway consumed by the planner and verifier.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use ops_primitives::ObjectSchema;
use ops_primitives::schema::conform;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::repair::parse_lenient;
use crate::traits::{AdapterError, CompletionRequest, ModelBackend};

/// Result alias for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Errors surfaced by [`ModelGateway`] implementations.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The backend call itself failed.
    #[error("LLM generation failed: {0}")]
    Backend(#[from] AdapterError),

    /// The reply contained no recoverable JSON.
    #[error("failed to parse JSON response: {reason} (response: {excerpt})")]
    MalformedOutput {
        /// Parser error message.
        reason: String,
        /// Leading part of the reply.
        excerpt: String,
    },

    /// The reply parsed but did not satisfy the requested schema.
    #[error("response does not match schema: {0}")]
    Schema(#[from] ops_primitives::Error),
}

/// Boundary between the pipeline and a language model.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// Returns the model identifier, for diagnostics.
    fn model(&self) -> &str;

    /// Generates a JSON object conforming to `schema`.
    ///
    /// The returned value has already passed [`conform`], so omitted optional
    /// fields carry their defaults.
    async fn generate_structured(
        &self,
        system_instruction: &str,
        user_instruction: &str,
        schema: &ObjectSchema,
        temperature: f32,
    ) -> GatewayResult<Value>;

    /// Generates free text.
    async fn generate_text(
        &self,
        system_instruction: &str,
        user_instruction: &str,
        temperature: f32,
    ) -> GatewayResult<String>;
}

/// [`ModelGateway`] over any [`ModelBackend`].
#[derive(Clone)]
pub struct BackendGateway {
    backend: Arc<dyn ModelBackend>,
    max_output_tokens: Option<u32>,
}

impl fmt::Debug for BackendGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let metadata = self.backend.metadata();
        f.debug_struct("BackendGateway")
            .field("provider", &metadata.provider())
            .field("model", &metadata.model())
            .finish_non_exhaustive()
    }
}

impl BackendGateway {
    /// Wraps the supplied backend.
    #[must_use]
    pub fn new(backend: Arc<dyn ModelBackend>) -> Self {
        Self {
            backend,
            max_output_tokens: None,
        }
    }

    /// Caps the output tokens of every request.
    #[must_use]
    pub fn with_max_output_tokens(mut self, tokens: u32) -> Self {
        self.max_output_tokens = Some(tokens);
        self
    }

    async fn complete(
        &self,
        system_instruction: &str,
        user_instruction: String,
        temperature: f32,
    ) -> GatewayResult<String> {
        let mut request = CompletionRequest::new(user_instruction)?
            .with_system_instruction(system_instruction)
            .with_temperature(temperature);
        if let Some(tokens) = self.max_output_tokens {
            request = request.with_max_output_tokens(tokens);
        }

        Ok(self.backend.complete(request).await?)
    }
}

#[async_trait]
impl ModelGateway for BackendGateway {
    fn model(&self) -> &str {
        self.backend.metadata().model()
    }

    async fn generate_structured(
        &self,
        system_instruction: &str,
        user_instruction: &str,
        schema: &ObjectSchema,
        temperature: f32,
    ) -> GatewayResult<Value> {
        let instruction = structured_instruction(user_instruction, schema);
        let reply = self
            .complete(system_instruction, instruction, temperature)
            .await?;

        debug!(schema = schema.title(), chars = reply.len(), "structured reply received");
        let value = parse_lenient(&reply).map_err(|err| GatewayError::MalformedOutput {
            reason: err.reason,
            excerpt: err.excerpt,
        })?;

        Ok(conform(schema, value)?)
    }

    async fn generate_text(
        &self,
        system_instruction: &str,
        user_instruction: &str,
        temperature: f32,
    ) -> GatewayResult<String> {
        self.complete(system_instruction, user_instruction.to_owned(), temperature)
            .await
    }
}

/// Appends the schema and the bare-JSON demand to a user instruction.
#[must_use]
pub fn structured_instruction(user_instruction: &str, schema: &ObjectSchema) -> String {
    let rendered = serde_json::to_string_pretty(&schema.to_json_schema())
        .unwrap_or_else(|_| schema.to_json_schema().to_string());
    format!(
        "{user_instruction}\n\nYou MUST respond with valid JSON matching this schema:\n{rendered}\n\nRespond ONLY with the JSON object, no additional text."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{AdapterMetadata, AdapterResult};
    use ops_primitives::{FieldSchema, FieldType};
    use serde_json::json;
    use std::sync::Mutex;

    struct StaticBackend {
        metadata: AdapterMetadata,
        reply: String,
        seen: Mutex<Vec<CompletionRequest>>,
    }

    impl StaticBackend {
        fn new(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                metadata: AdapterMetadata::new("test", "static"),
                reply: reply.to_owned(),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ModelBackend for StaticBackend {
        fn metadata(&self) -> &AdapterMetadata {
            &self.metadata
        }

        async fn complete(&self, request: CompletionRequest) -> AdapterResult<String> {
            self.seen.lock().unwrap().push(request);
            Ok(self.reply.clone())
        }
    }

    struct DownBackend(AdapterMetadata);

    #[async_trait]
    impl ModelBackend for DownBackend {
        fn metadata(&self) -> &AdapterMetadata {
            &self.0
        }

        async fn complete(&self, _request: CompletionRequest) -> AdapterResult<String> {
            Err(AdapterError::transport("connection refused"))
        }
    }

    fn schema() -> ObjectSchema {
        ObjectSchema::new("Answer")
            .field(FieldSchema::required("answer", FieldType::String))
            .field(FieldSchema::optional("confidence", FieldType::Integer).with_default(5))
    }

    #[tokio::test]
    async fn structured_output_is_repaired_and_conformed() {
        let backend = StaticBackend::new("```json\n{\"answer\": \"42\"}\n```");
        let gateway = BackendGateway::new(backend.clone());

        let value = gateway
            .generate_structured("system", "question", &schema(), 0.3)
            .await
            .unwrap();
        assert_eq!(value, json!({ "answer": "42", "confidence": 5 }));

        let seen = backend.seen.lock().unwrap();
        assert_eq!(seen[0].system_instruction(), Some("system"));
        assert_eq!(seen[0].temperature(), Some(0.3));
        assert!(seen[0].user_instruction().starts_with("question"));
        assert!(seen[0].user_instruction().contains("\"title\": \"Answer\""));
    }

    #[tokio::test]
    async fn schema_mismatch_is_rejected() {
        let gateway = BackendGateway::new(StaticBackend::new("{\"answer\": 42}"));
        let err = gateway
            .generate_structured("system", "question", &schema(), 0.3)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Schema(_)));
    }

    #[tokio::test]
    async fn unparseable_output_is_rejected() {
        let gateway = BackendGateway::new(StaticBackend::new("I cannot help with that."));
        let err = gateway
            .generate_structured("system", "question", &schema(), 0.3)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::MalformedOutput { .. }));
    }

    #[tokio::test]
    async fn backend_failures_propagate() {
        let gateway = BackendGateway::new(Arc::new(DownBackend(AdapterMetadata::new("test", "down"))));
        let err = gateway.generate_text("system", "hello", 0.7).await.unwrap_err();
        assert!(matches!(err, GatewayError::Backend(AdapterError::Transport { .. })));
        assert!(err.to_string().starts_with("LLM generation failed"));
    }

    #[tokio::test]
    async fn text_generation_passes_reply_through() {
        let backend = StaticBackend::new("plain words");
        let gateway = BackendGateway::new(backend.clone()).with_max_output_tokens(128);

        let text = gateway.generate_text("system", "hello", 0.7).await.unwrap();
        assert_eq!(text, "plain words");
        assert_eq!(backend.seen.lock().unwrap()[0].max_output_tokens(), Some(128));
        assert_eq!(gateway.model(), "static");
    }
}
