//! Agent-side error taxonomy: what can end a dispatch session or a startup
//! attempt to reach the orchestrator.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("failed to connect to orchestrator: {0}")]
    Connect(#[from] tonic::transport::Error),

    #[error("failed to open the dispatch stream: {0}")]
    Stream(#[from] tonic::Status),

    #[error("failed to receive a task from the orchestrator: {0}")]
    Recv(String),

    #[error("failed to send a task result to the orchestrator")]
    Send,
}

impl AgentError {
    /// Whether the agent's own reconnect loop should retry after this
    /// error. Only a failure to dial in the first place is retried, up to
    /// `max_retries`; a session that starts and later fails ends the
    /// process (matching the source, which does not reconnect mid-session).
    pub fn is_retryable_connect_failure(&self) -> bool {
        matches!(self, AgentError::Connect(_))
    }
}
