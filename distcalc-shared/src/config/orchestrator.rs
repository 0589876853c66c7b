//! Orchestrator process configuration: listen addresses, per-operation
//! simulated latencies, and the dispatch tick interval.

use serde::Deserialize;

use super::ConfigError;

#[derive(Debug, Clone, Deserialize)]
pub struct OrchestratorConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    #[serde(default = "default_grpc_port")]
    pub grpc_port: u16,

    #[serde(default = "default_op_time_ms")]
    pub addition_time_ms: u64,
    #[serde(default = "default_op_time_ms")]
    pub subtraction_time_ms: u64,
    #[serde(default = "default_op_time_ms")]
    pub multiplication_time_ms: u64,
    #[serde(default = "default_op_time_ms")]
    pub division_time_ms: u64,

    #[serde(default = "default_poll_delay_ms")]
    pub poll_delay_ms: u64,

    #[serde(default)]
    pub database_url: Option<String>,

    #[serde(default = "default_access_ttl_secs")]
    pub access_token_ttl_secs: u64,
    #[serde(default = "default_refresh_ttl_secs")]
    pub refresh_token_ttl_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_http_port() -> u16 {
    8080
}
fn default_grpc_port() -> u16 {
    50051
}
fn default_op_time_ms() -> u64 {
    1
}
fn default_poll_delay_ms() -> u64 {
    500
}
fn default_access_ttl_secs() -> u64 {
    15 * 60
}
fn default_refresh_ttl_secs() -> u64 {
    7 * 24 * 60 * 60
}

impl OrchestratorConfig {
    /// Loads configuration layering compiled-in defaults, an optional
    /// `config/orchestrator.toml`, and bare environment variables, in that
    /// precedence order.
    pub fn load() -> Result<Self, ConfigError> {
        let builder = ::config::Config::builder()
            .add_source(::config::File::with_name("config/orchestrator").required(false))
            .add_source(
                ::config::Environment::default()
                    .try_parsing(true)
                    .with_list_parse_key("none"),
            );

        let raw: Self = builder.build()?.try_deserialize()?;
        raw.validate()?;
        Ok(raw)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.http_port == 0 || self.grpc_port == 0 {
            return Err(ConfigError::Invalid("ports must be nonzero".into()));
        }
        if self.http_port == self.grpc_port {
            return Err(ConfigError::Invalid(
                "http_port and grpc_port must differ".into(),
            ));
        }
        Ok(())
    }

    /// The per-operation simulated latency in milliseconds for the given
    /// operator, used to populate a dispatched task's `operation_time`.
    pub fn op_time_ms(&self, op: crate::domain::Operator) -> u64 {
        use crate::domain::Operator;
        match op {
            Operator::Add => self.addition_time_ms,
            Operator::Sub => self.subtraction_time_ms,
            Operator::Mul => self.multiplication_time_ms,
            Operator::Div => self.division_time_ms,
            Operator::None => 0,
        }
    }
}
