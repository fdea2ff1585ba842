//! Configuration for the operations assistant.
//!
//! Settings come from built-in defaults, an optional JSON file, and finally
//! environment variables. API keys are read from the environment only and are
//! never serialized back out.

#![warn(missing_docs, clippy::pedantic)]

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Environment variable holding the Gemini API key.
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";
/// Environment variable holding the OpenWeatherMap API key.
pub const OPENWEATHER_API_KEY_ENV: &str = "OPENWEATHER_API_KEY";
/// Environment variable holding the NewsAPI key.
pub const NEWS_API_KEY_ENV: &str = "NEWS_API_KEY";
/// Environment variable holding an optional GitHub token.
pub const GITHUB_TOKEN_ENV: &str = "GITHUB_TOKEN";
/// Environment variable overriding the per-step attempt count.
pub const MAX_RETRIES_ENV: &str = "OPS_MAX_RETRIES";

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// File that was requested.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid JSON for [`AssistantConfig`].
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        /// File that was requested.
        path: PathBuf,
        /// Underlying decode error.
        #[source]
        source: serde_json::Error,
    },

    /// A setting holds an unusable value.
    #[error("invalid value for {key}: {message}")]
    InvalidValue {
        /// Setting or environment variable name.
        key: String,
        /// Why the value was rejected.
        message: String,
    },

    /// A required setting is absent.
    #[error("missing required setting {key}")]
    MissingRequired {
        /// Setting or environment variable name.
        key: String,
    },
}

impl ConfigError {
    fn invalid(key: &str, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.to_owned(),
            message: message.into(),
        }
    }
}

/// Language model settings.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// Model identifier.
    pub model: String,
    /// API root override.
    pub base_url: Option<String>,
    /// Per-call timeout in seconds.
    pub timeout_secs: u64,
    /// Output token cap override.
    pub max_output_tokens: Option<u32>,
    /// API key, from [`GEMINI_API_KEY_ENV`] only.
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            model: "gemini-flash-latest".to_owned(),
            base_url: None,
            timeout_secs: 60,
            max_output_tokens: None,
            api_key: None,
        }
    }
}

impl fmt::Debug for ModelSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelSettings")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("api_key", &redacted(self.api_key.as_ref()))
            .finish()
    }
}

impl ModelSettings {
    /// Returns the per-call timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Returns the API key.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingRequired`] when no key is configured.
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| ConfigError::MissingRequired {
                key: GEMINI_API_KEY_ENV.to_owned(),
            })
    }
}

/// Data-source tool settings.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolSettings {
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// OpenWeatherMap API root override.
    pub weather_base_url: Option<String>,
    /// NewsAPI root override.
    pub news_base_url: Option<String>,
    /// GitHub API root override.
    pub github_base_url: Option<String>,
    /// OpenWeatherMap key, from [`OPENWEATHER_API_KEY_ENV`] only.
    #[serde(skip)]
    pub openweather_api_key: Option<String>,
    /// NewsAPI key, from [`NEWS_API_KEY_ENV`] only.
    #[serde(skip)]
    pub news_api_key: Option<String>,
    /// GitHub token, from [`GITHUB_TOKEN_ENV`] only.
    #[serde(skip)]
    pub github_token: Option<String>,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            weather_base_url: None,
            news_base_url: None,
            github_base_url: None,
            openweather_api_key: None,
            news_api_key: None,
            github_token: None,
        }
    }
}

impl fmt::Debug for ToolSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolSettings")
            .field("timeout_secs", &self.timeout_secs)
            .field("weather_base_url", &self.weather_base_url)
            .field("news_base_url", &self.news_base_url)
            .field("github_base_url", &self.github_base_url)
            .field("openweather_api_key", &redacted(self.openweather_api_key.as_ref()))
            .field("news_api_key", &redacted(self.news_api_key.as_ref()))
            .field("github_token", &redacted(self.github_token.as_ref()))
            .finish()
    }
}

impl ToolSettings {
    /// Returns the per-request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Pipeline tuning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Attempts per step.
    pub max_retries: u32,
    /// Sampling temperature for planning.
    pub planning_temperature: f32,
    /// Sampling temperature for verification.
    pub verification_temperature: f32,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_retries: 2,
            planning_temperature: 0.3,
            verification_temperature: 0.3,
        }
    }
}

/// Complete assistant configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    /// Language model settings.
    pub model: ModelSettings,
    /// Data-source tool settings.
    pub tools: ToolSettings,
    /// Pipeline tuning.
    pub pipeline: PipelineSettings,
}

impl AssistantConfig {
    /// Loads the optional file at `path`, then applies the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read or parsed, or an
    /// environment override is invalid.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let base = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        base.apply_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings from a JSON file. Secrets are not read from files.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] or [`ConfigError::Parse`].
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "loaded config file");
        config.validated()
    }

    /// Builds defaults overridden by the variables `lookup` returns.
    ///
    /// # Errors
    ///
    /// Same as [`AssistantConfig::apply_lookup`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::default().apply_lookup(lookup)
    }

    /// Applies environment overrides using `lookup` to read variables.
    ///
    /// Empty values count as unset.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if an override does not parse.
    pub fn apply_lookup<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(key) = read(GEMINI_API_KEY_ENV) {
            self.model.api_key = Some(key);
        }
        if let Some(key) = read(OPENWEATHER_API_KEY_ENV) {
            self.tools.openweather_api_key = Some(key);
        }
        if let Some(key) = read(NEWS_API_KEY_ENV) {
            self.tools.news_api_key = Some(key);
        }
        if let Some(token) = read(GITHUB_TOKEN_ENV) {
            self.tools.github_token = Some(token);
        }
        if let Some(raw) = read(MAX_RETRIES_ENV) {
            self.pipeline.max_retries = parse_value(MAX_RETRIES_ENV, raw.trim())?;
        }

        self.validated()
    }

    fn validated(self) -> Result<Self, ConfigError> {
        if self.model.model.trim().is_empty() {
            return Err(ConfigError::invalid("model.model", "model name cannot be empty"));
        }
        if self.model.timeout_secs == 0 {
            return Err(ConfigError::invalid("model.timeout_secs", "must be at least 1"));
        }
        if self.tools.timeout_secs == 0 {
            return Err(ConfigError::invalid("tools.timeout_secs", "must be at least 1"));
        }
        for (key, temperature) in [
            ("pipeline.planning_temperature", self.pipeline.planning_temperature),
            ("pipeline.verification_temperature", self.pipeline.verification_temperature),
        ] {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(ConfigError::invalid(key, format!("{temperature} is outside 0.0..=2.0")));
            }
        }
        Ok(self)
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    raw.parse()
        .map_err(|err: T::Err| ConfigError::invalid(key, err.to_string()))
}

fn redacted(secret: Option<&String>) -> Option<&'static str> {
    secret.map(|_| "<redacted>")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = AssistantConfig::default();
        assert_eq!(config.model.model, "gemini-flash-latest");
        assert_eq!(config.model.timeout(), Duration::from_secs(60));
        assert_eq!(config.tools.timeout(), Duration::from_secs(10));
        assert_eq!(config.pipeline, PipelineSettings::default());
        assert_eq!(config.pipeline.max_retries, 2);
    }

    #[test]
    fn environment_supplies_secrets_and_retries() {
        let config = AssistantConfig::from_lookup(lookup(&[
                (GEMINI_API_KEY_ENV, "g-key"),
                (OPENWEATHER_API_KEY_ENV, "w-key"),
                (GITHUB_TOKEN_ENV, ""),
                (MAX_RETRIES_ENV, "4"),
            ]))
            .unwrap();

        assert_eq!(config.model.require_api_key().unwrap(), "g-key");
        assert_eq!(config.tools.openweather_api_key.as_deref(), Some("w-key"));
        assert!(config.tools.news_api_key.is_none());
        assert!(config.tools.github_token.is_none());
        assert_eq!(config.pipeline.max_retries, 4);
    }

    #[test]
    fn bad_retry_override_is_rejected() {
        let err = AssistantConfig::from_lookup(lookup(&[(MAX_RETRIES_ENV, "many")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == MAX_RETRIES_ENV));
    }

    #[test]
    fn missing_model_key_is_reported() {
        let err = AssistantConfig::default().model.require_api_key().unwrap_err();
        assert_eq!(err.to_string(), "missing required setting GEMINI_API_KEY");
    }

    #[test]
    fn partial_json_keeps_defaults_and_ignores_secrets() {
        let config: AssistantConfig = serde_json::from_str(
            r#"{"model": {"model": "gemini-pro", "api_key": "from-file"}, "pipeline": {"max_retries": 5}}"#,
        )
        .unwrap();
        assert_eq!(config.model.model, "gemini-pro");
        assert!(config.model.api_key.is_none());
        assert_eq!(config.model.timeout_secs, 60);
        assert_eq!(config.pipeline.max_retries, 5);
        assert!((config.pipeline.planning_temperature - 0.3).abs() < f32::EPSILON);
    }

    #[test]
    fn secrets_never_serialize_or_print() {
        let config = AssistantConfig::from_lookup(lookup(&[(NEWS_API_KEY_ENV, "super-secret")]))
            .unwrap();
        let rendered = serde_json::to_string(&config).unwrap();
        assert!(!rendered.contains("super-secret"));
        assert!(!format!("{config:?}").contains("super-secret"));
    }

    #[test]
    fn out_of_range_temperature_is_rejected() {
        let mut config = AssistantConfig::default();
        config.pipeline.verification_temperature = 3.5;
        let err = config.apply_lookup(lookup(&[])).unwrap_err();
        assert!(err.to_string().contains("pipeline.verification_temperature"));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = AssistantConfig::load(Some(Path::new("/nonexistent/ops-assistant.json"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
