//! Environment-driven configuration for the orchestrator and agent binaries.
//!
//! Layering: compiled-in defaults → an optional `config/*.toml` file →
//! bare (unprefixed) environment variables, matching the original system's
//! env var names exactly. A bad value (out-of-range port, negative
//! duration) is a startup failure, not a silent clamp.

mod agent;
mod orchestrator;

pub use agent::AgentConfig;
pub use orchestrator::OrchestratorConfig;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
