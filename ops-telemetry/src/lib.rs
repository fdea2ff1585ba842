//! Tracing subscriber setup shared by the assistant binaries.

#![warn(missing_docs, clippy::pedantic)]

use thiserror::Error;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::ParseError;

/// Directive used when neither `RUST_LOG` nor the caller supplies one.
pub const DEFAULT_DIRECTIVE: &str = "info";

/// Errors raised while installing the subscriber.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The fallback directive did not parse.
    #[error("invalid log directive `{directive}`: {source}")]
    InvalidDirective {
        /// Directive that was rejected.
        directive: String,
        /// Parser error.
        #[source]
        source: ParseError,
    },

    /// A global subscriber was already installed.
    #[error("failed to install tracing subscriber: {reason}")]
    Install {
        /// Reason reported by `tracing-subscriber`.
        reason: String,
    },
}

/// Builds the filter from `RUST_LOG`, falling back to `default_directive`.
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidDirective`] if `RUST_LOG` is unset and
/// `default_directive` does not parse.
pub fn env_filter(default_directive: &str) -> Result<EnvFilter, TelemetryError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(default_directive).map_err(|source| {
            TelemetryError::InvalidDirective {
                directive: default_directive.to_owned(),
                source,
            }
        }),
    }
}

/// Installs a compact fmt subscriber on stderr, leaving stdout for output.
///
/// # Errors
///
/// Returns [`TelemetryError`] if the directive is invalid or a subscriber is
/// already installed.
pub fn init_tracing(default_directive: &str) -> Result<(), TelemetryError> {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(default_directive)?)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| TelemetryError::Install {
            reason: err.to_string(),
        })
}
