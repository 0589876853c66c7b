//! Agent process binary: connects to the orchestrator's dispatch stream and
//! evaluates tasks until the stream closes, a transport error ends the
//! session, or the process receives a shutdown signal.

use std::sync::Arc;

use distcalc_agent::connect_and_run;
use distcalc_shared::config::AgentConfig;
use distcalc_shared::logging;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    logging::init_tracing();

    let config = Arc::new(AgentConfig::load()?);
    info!(
        orchestrator = %config.orchestrator_uri(),
        workers_limit = config.workers_limit,
        "starting distcalc agent"
    );

    let cancel = CancellationToken::new();
    let run = tokio::spawn(connect_and_run(config, cancel.clone()));

    tokio::select! {
        result = run => {
            match result {
                Ok(Ok(())) => info!("dispatch session ended cleanly"),
                Ok(Err(e)) => {
                    error!(error = %e, "dispatch session ended with an error");
                    return Err(e.into());
                }
                Err(e) => anyhow::bail!("dispatch session task panicked: {e}"),
            }
        }
        _ = shutdown_signal() => {
            info!("shutdown signal received, cancelling dispatch session");
            cancel.cancel();
        }
    }

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
