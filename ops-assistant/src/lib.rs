//! Operations assistant facade.
//!
//! Bundles the workspace crates behind feature flags so embedders can pull in
//! only the pieces they need. With the `runtime` feature enabled,
//! [`runtime`] assembles a ready-to-run [`pipeline::Pipeline`] from an
//! [`config::AssistantConfig`].

#![warn(missing_docs, clippy::pedantic)]

/// Re-export shared primitives for convenience.
pub use ops_primitives as primitives;

/// Model backends and the structured-output gateway (enabled by `adapters` feature).
#[cfg(feature = "adapters")]
pub use ops_adapters as adapters;

/// Tool trait, registry, and built-in tools (enabled by `tools` feature).
#[cfg(feature = "tools")]
pub use ops_tools as tools;

/// Planner, executor, and verifier (enabled by `pipeline` feature).
#[cfg(feature = "pipeline")]
pub use ops_pipeline as pipeline;

/// Configuration loading (enabled by `config` feature).
#[cfg(feature = "config")]
pub use ops_config as config;

/// Tracing setup (enabled by `telemetry` feature).
#[cfg(feature = "telemetry")]
pub use ops_telemetry as telemetry;

#[cfg(feature = "runtime")]
pub mod runtime;
