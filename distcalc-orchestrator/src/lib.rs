//! Orchestrator: the HTTP-facing expression API and the gRPC agent
//! dispatch stream, both built atop the shared scheduler.

pub mod bootstrap;
pub mod grpc;
pub mod http;
pub mod scheduler;

pub use bootstrap::AppState;
pub use scheduler::Scheduler;
