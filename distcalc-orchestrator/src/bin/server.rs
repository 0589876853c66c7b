//! Orchestrator server binary: starts the HTTP API and the gRPC dispatch
//! service side by side, and shuts both down on Ctrl+C/SIGTERM.

use std::net::SocketAddr;

use distcalc_orchestrator::grpc::{DispatchServer, DispatchService};
use distcalc_orchestrator::{http, AppState};
use distcalc_shared::config::OrchestratorConfig;
use distcalc_shared::logging;
use tokio::signal;
use tonic::transport::Server as GrpcServer;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    logging::init_tracing();

    let config = OrchestratorConfig::load()?;
    info!(
        http_port = config.http_port,
        grpc_port = config.grpc_port,
        "starting distcalc orchestrator"
    );

    let state = AppState::bootstrap(config.clone()).await?;

    let http_addr: SocketAddr = format!("{}:{}", config.host, config.http_port).parse()?;
    let grpc_addr: SocketAddr = format!("{}:{}", config.host, config.grpc_port).parse()?;

    let http_router = http::router(state.clone());
    let http_listener = tokio::net::TcpListener::bind(http_addr).await?;

    let dispatch = DispatchService::new(state.scheduler.clone(), state.config.clone());

    info!(%http_addr, "HTTP API listening");
    info!(%grpc_addr, "gRPC dispatch stream listening");

    let http_server = axum::serve(http_listener, http_router).with_graceful_shutdown(shutdown_signal());
    let grpc_server = GrpcServer::builder()
        .add_service(DispatchServer::new(dispatch))
        .serve_with_shutdown(grpc_addr, shutdown_signal());

    let (http_result, grpc_result) = tokio::join!(http_server, grpc_server);
    if let Err(e) = http_result {
        error!(error = %e, "HTTP server exited with error");
    }
    if let Err(e) = grpc_result {
        error!(error = %e, "gRPC server exited with error");
    }

    info!("orchestrator shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C"),
        _ = terminate => info!("received SIGTERM"),
    }
}
