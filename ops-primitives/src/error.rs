//! Shared error definitions for the data model.

use thiserror::Error;

/// Result alias used throughout the data model.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while validating or decoding pipeline data.
#[derive(Debug, Error)]
pub enum Error {
    /// A value did not satisfy its schema.
    #[error("schema violation at `{path}`: {reason}")]
    SchemaViolation {
        /// JSON path of the offending value (e.g. `steps[0].tool_name`).
        path: String,
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// A schema-conformant value could not be decoded into its Rust type.
    #[error("failed to decode {target}: {source}")]
    Decode {
        /// Name of the type being decoded.
        target: &'static str,
        /// Underlying serde error.
        #[source]
        source: serde_json::Error,
    },
}

impl Error {
    /// Convenience constructor for schema violations.
    #[must_use]
    pub fn violation(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SchemaViolation {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
