//! Agent process configuration: orchestrator connection details and the
//! bounded worker pool's sizing knobs.

use serde::Deserialize;

use super::ConfigError;

#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_orchestrator_host")]
    pub orchestrator_host: String,
    #[serde(default = "default_orchestrator_port")]
    pub orchestrator_port: u16,

    #[serde(default = "default_poll_timeout_ms")]
    pub poll_timeout_ms: u64,
    #[serde(default = "default_workers_limit")]
    pub workers_limit: usize,
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_orchestrator_host() -> String {
    "localhost".into()
}
fn default_orchestrator_port() -> u16 {
    50051
}
fn default_poll_timeout_ms() -> u64 {
    50
}
fn default_workers_limit() -> usize {
    10
}
fn default_buffer_size() -> usize {
    128
}
fn default_max_retries() -> u32 {
    3
}

impl AgentConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let builder = ::config::Config::builder()
            .add_source(::config::File::with_name("config/agent").required(false))
            .add_source(::config::Environment::default().try_parsing(true));

        let raw: Self = builder.build()?.try_deserialize()?;
        raw.validate()?;
        Ok(raw)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.orchestrator_port == 0 {
            return Err(ConfigError::Invalid("orchestrator_port must be nonzero".into()));
        }
        if self.workers_limit == 0 {
            return Err(ConfigError::Invalid("workers_limit must be positive".into()));
        }
        if self.buffer_size == 0 {
            return Err(ConfigError::Invalid("buffer_size must be positive".into()));
        }
        Ok(())
    }

    pub fn orchestrator_uri(&self) -> String {
        format!("http://{}:{}", self.orchestrator_host, self.orchestrator_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orchestrator_uri_formats_host_and_port() {
        let cfg = AgentConfig {
            orchestrator_host: "orchestrator".into(),
            orchestrator_port: 50051,
            poll_timeout_ms: 50,
            workers_limit: 4,
            buffer_size: 64,
            max_retries: 3,
        };
        assert_eq!(cfg.orchestrator_uri(), "http://orchestrator:50051");
    }

    #[test]
    fn validate_rejects_zero_workers() {
        let cfg = AgentConfig {
            orchestrator_host: "localhost".into(),
            orchestrator_port: 50051,
            poll_timeout_ms: 50,
            workers_limit: 0,
            buffer_size: 64,
            max_retries: 3,
        };
        assert!(cfg.validate().is_err());
    }
}
