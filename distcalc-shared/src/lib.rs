//! Domain model, persistence, authentication, and configuration shared by the
//! distcalc orchestrator and agent binaries.

pub mod auth;
pub mod config;
pub mod domain;
pub mod errors;
pub mod logging;
pub mod parser;
pub mod store;

pub mod proto {
    //! Generated gRPC types and clients/servers for the `distcalc.v1` package.
    tonic::include_proto!("distcalc.v1");
}

pub use domain::{Expression, ExpressionStatus, Task, TaskStatus, User};
pub use errors::{AuthError, ParseError, SchedulerError, StoreError};
