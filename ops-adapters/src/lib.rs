//! Language-model backends and the gateway the pipeline talks to.
//!
//! Backends implement [`traits::ModelBackend`] and only know how to turn one
//! completion request into text. [`gateway::BackendGateway`] layers the
//! structured-output contract on top: schema-bearing instructions, lenient JSON
//! recovery through [`repair`], and validation against the requested schema.

#![warn(missing_docs, clippy::pedantic)]

pub mod gateway;
pub mod gemini;
pub mod http_client;
pub mod repair;
pub mod traits;
