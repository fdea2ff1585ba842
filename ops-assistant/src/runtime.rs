//! Assembles a pipeline and its collaborators from configuration.

use std::sync::Arc;

use ops_adapters::gateway::{BackendGateway, ModelGateway};
use ops_adapters::gemini::{GeminiBackend, GeminiConfig};
use ops_adapters::http_client::HttpsClient;
use ops_adapters::traits::AdapterError;
use ops_config::{
    AssistantConfig, ConfigError, ModelSettings, NEWS_API_KEY_ENV, OPENWEATHER_API_KEY_ENV,
    PipelineSettings, ToolSettings,
};
use ops_pipeline::{Pipeline, STAGES};
use ops_tools::{GithubSearchTool, NewsTool, ToolError, ToolRegistry, WeatherTool};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{info, warn};

/// Errors raised while wiring the assistant together.
#[derive(Debug, Error)]
pub enum AssemblyError {
    /// Configuration was incomplete.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The model backend rejected its settings.
    #[error(transparent)]
    Model(#[from] AdapterError),
    /// A tool rejected its settings or could not be registered.
    #[error(transparent)]
    Tool(#[from] ToolError),
}

/// Convenience alias for assembly results.
pub type AssemblyResult<T> = Result<T, AssemblyError>;

/// Registers the built-in tools.
///
/// Repository search is always available. Weather and news are registered only
/// when their API keys are configured.
///
/// # Errors
///
/// Returns [`AssemblyError::Tool`] if a configured base URL is invalid.
pub fn build_tools(settings: &ToolSettings, client: &HttpsClient) -> AssemblyResult<ToolRegistry> {
    let timeout = settings.timeout();
    let mut registry = ToolRegistry::new();

    let mut github =
        GithubSearchTool::new(settings.github_token.as_deref(), client.clone())?.with_timeout(timeout);
    if let Some(base_url) = &settings.github_base_url {
        github = github.with_base_url(base_url)?;
    }
    registry.register(Arc::new(github))?;

    if let Some(key) = settings.openweather_api_key.as_deref() {
        let mut weather = WeatherTool::new(key, client.clone())?.with_timeout(timeout);
        if let Some(base_url) = &settings.weather_base_url {
            weather = weather.with_base_url(base_url)?;
        }
        registry.register(Arc::new(weather))?;
    } else {
        warn!(env = OPENWEATHER_API_KEY_ENV, "weather tool disabled, no API key");
    }

    if let Some(key) = settings.news_api_key.as_deref() {
        let mut news = NewsTool::new(key, client.clone())?.with_timeout(timeout);
        if let Some(base_url) = &settings.news_base_url {
            news = news.with_base_url(base_url)?;
        }
        registry.register(Arc::new(news))?;
    } else {
        warn!(env = NEWS_API_KEY_ENV, "news tool disabled, no API key");
    }

    Ok(registry)
}

/// Builds the Gemini-backed gateway.
///
/// # Errors
///
/// Returns [`AssemblyError::Config`] when no API key is configured and
/// [`AssemblyError::Model`] when the backend rejects its settings.
pub fn build_gateway(settings: &ModelSettings) -> AssemblyResult<Arc<dyn ModelGateway>> {
    let key = settings.require_api_key()?;
    let mut config = GeminiConfig::new(settings.model.as_str())
        .with_api_key(key)
        .with_timeout(settings.timeout());
    if let Some(base_url) = &settings.base_url {
        config = config.with_base_url(base_url)?;
    }

    let mut gateway = BackendGateway::new(Arc::new(GeminiBackend::new(config)?));
    if let Some(tokens) = settings.max_output_tokens {
        gateway = gateway.with_max_output_tokens(tokens);
    }
    Ok(Arc::new(gateway))
}

/// Applies pipeline tuning to a gateway and registry.
#[must_use]
pub fn assemble(
    gateway: Arc<dyn ModelGateway>,
    tools: ToolRegistry,
    settings: &PipelineSettings,
) -> Pipeline {
    Pipeline::new(gateway, Arc::new(tools))
        .with_max_retries(settings.max_retries)
        .with_planning_temperature(settings.planning_temperature)
        .with_verification_temperature(settings.verification_temperature)
}

/// Builds the complete pipeline described by `config`.
///
/// # Errors
///
/// See [`build_gateway`] and [`build_tools`].
pub fn build_pipeline(config: &AssistantConfig) -> AssemblyResult<Pipeline> {
    let gateway = build_gateway(&config.model)?;
    let tools = build_tools(&config.tools, &HttpsClient::new())?;
    let pipeline = assemble(gateway, tools, &config.pipeline);

    info!(
        model = %config.model.model,
        tools = ?pipeline.tools().names().collect::<Vec<_>>(),
        max_retries = config.pipeline.max_retries,
        "assistant ready"
    );
    Ok(pipeline)
}

/// Health summary: stages, registered tools, and model.
#[must_use]
pub fn health_report(tools: &ToolRegistry, model: &str) -> Value {
    json!({
        "status": "healthy",
        "agents": STAGES,
        "tools": tools.names().collect::<Vec<_>>(),
        "llm_model": model,
    })
}

/// Descriptors of every registered tool.
#[must_use]
pub fn tools_report(tools: &ToolRegistry) -> Value {
    json!({ "tools": tools.descriptors() })
}
