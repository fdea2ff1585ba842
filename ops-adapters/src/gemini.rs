//! Google Gemini backend.

use std::{fmt, time::Duration};

use async_trait::async_trait;
use hyper::header::RETRY_AFTER;
use hyper::{StatusCode, Uri};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::http_client::{HttpReply, HttpsClient};
use crate::traits::{
    AdapterError, AdapterMetadata, AdapterResult, CompletionRequest, ModelBackend,
};

/// Model used when none is configured.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-flash-latest";

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/";
const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 8192;
const TOP_P: f32 = 0.95;
const TOP_K: u32 = 40;

/// Configuration for the Gemini backend.
#[derive(Clone)]
pub struct GeminiConfig {
    api_key: Option<String>,
    model: String,
    base_url: String,
    timeout: Duration,
}

impl fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl GeminiConfig {
    /// Creates a configuration using the supplied model identifier.
    #[must_use]
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            api_key: None,
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_owned(),
            timeout: Duration::from_secs(60),
        }
    }

    /// Overrides the base URL used for API calls.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Configuration`] if the supplied URL is invalid.
    pub fn with_base_url(mut self, base_url: impl AsRef<str>) -> AdapterResult<Self> {
        self.base_url = sanitize_base_url(base_url.as_ref())?;
        Ok(self)
    }

    /// Sets the HTTP request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Supplies an explicit API key.
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }
}

/// Backend calling the Gemini `generateContent` endpoint over HTTPS.
pub struct GeminiBackend {
    client: HttpsClient,
    endpoint: String,
    metadata: AdapterMetadata,
    api_key: String,
    timeout: Duration,
}

impl fmt::Debug for GeminiBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiBackend")
            .field("model", &self.metadata.model())
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl GeminiBackend {
    /// Constructs a backend from the supplied configuration.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Configuration`] if the API key is missing.
    pub fn new(config: GeminiConfig) -> AdapterResult<Self> {
        let api_key = config
            .api_key
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| AdapterError::configuration("Gemini backend requires an API key"))?;

        let endpoint = format!(
            "{}v1beta/models/{}:generateContent",
            config.base_url, config.model
        );

        Ok(Self {
            client: HttpsClient::new(),
            endpoint,
            metadata: AdapterMetadata::new("gemini", config.model),
            api_key,
            timeout: config.timeout,
        })
    }

    fn build_request(request: &CompletionRequest) -> GenerateContentRequest {
        let system_instruction = request.system_instruction().map(|text| SystemInstruction {
            parts: vec![Part {
                text: text.to_owned(),
            }],
        });

        GenerateContentRequest {
            system_instruction,
            contents: vec![Content {
                role: "user".to_owned(),
                parts: vec![Part {
                    text: request.user_instruction().to_owned(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: request.temperature(),
                top_p: TOP_P,
                top_k: TOP_K,
                max_output_tokens: request
                    .max_output_tokens()
                    .unwrap_or(DEFAULT_MAX_OUTPUT_TOKENS),
            },
        }
    }

    fn build_uri(&self) -> AdapterResult<Uri> {
        format!("{}?key={}", self.endpoint, self.api_key)
            .parse::<Uri>()
            .map_err(|err| AdapterError::configuration(format!("invalid Gemini endpoint: {err}")))
    }
}

#[async_trait]
impl ModelBackend for GeminiBackend {
    fn metadata(&self) -> &AdapterMetadata {
        &self.metadata
    }

    async fn complete(&self, request: CompletionRequest) -> AdapterResult<String> {
        let payload = Self::build_request(&request);
        let body = serde_json::to_vec(&payload).map_err(|err| {
            AdapterError::invalid_request(format!("failed to encode Gemini request: {err}"))
        })?;

        debug!(model = self.metadata.model(), "sending Gemini request");
        let reply = self
            .client
            .post_json(self.build_uri()?, body, self.timeout, "Gemini")
            .await?;

        extract_text(&reply)
    }
}

fn extract_text(reply: &HttpReply) -> AdapterResult<String> {
    if reply.status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = reply
            .headers
            .get(RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
        return Err(AdapterError::RateLimited { retry_after });
    }

    if !reply.status.is_success() {
        let reason = String::from_utf8_lossy(&reply.body);
        return Err(AdapterError::response(format!(
            "Gemini returned {}: {reason}",
            reply.status
        )));
    }

    let response: GenerateContentResponse = serde_json::from_slice(&reply.body)
        .map_err(|err| AdapterError::response(format!("failed to decode Gemini response: {err}")))?;

    let text = response
        .candidates
        .into_iter()
        .filter_map(|candidate| candidate.content)
        .flat_map(|content| content.parts)
        .map(|part| part.text)
        .collect::<String>();

    if text.is_empty() {
        return Err(AdapterError::response("Gemini returned no text candidates"));
    }
    Ok(text)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<SystemInstruction>,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    role: String,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    top_p: f32,
    top_k: u32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

fn sanitize_base_url(input: &str) -> AdapterResult<String> {
    let mut base = input.trim().to_owned();
    if !(base.starts_with("http://") || base.starts_with("https://")) {
        return Err(AdapterError::configuration(
            "Gemini base URL must start with http:// or https://",
        ));
    }
    if !base.ends_with('/') {
        base.push('/');
    }
    base.parse::<Uri>()
        .map_err(|err| AdapterError::configuration(format!("invalid Gemini base URL: {err}")))?;
    Ok(base)
}
