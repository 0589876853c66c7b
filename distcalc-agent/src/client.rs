//! The agent's half of the `ProcessTasks` dispatch stream.
//!
//! Reimplements `backend/internal/agent/transport/grpc/grpc.go`: a
//! receive loop pulls tasks off the inbound stream into a bounded `in`
//! channel, a fixed-size worker pool drains `in` and evaluates each task
//! (`crate::worker::evaluate`), and a paced send loop forwards worker
//! output to the outbound stream at most once per `poll_timeout` tick —
//! exactly the original's ticker-gated `<-s.out` read. All three pieces
//! share one [`CancellationToken`]; any one stopping cancels the others.

use std::sync::Arc;
use std::time::Duration;

use distcalc_shared::config::AgentConfig;
use distcalc_shared::proto::dispatch_client::DispatchClient;
use distcalc_shared::proto::{Task as WireTask, TaskResult as WireTaskResult};
use tokio::sync::{mpsc, Mutex};
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tonic::transport::Channel;
use tonic::Request;
use tracing::{info, warn};

use crate::errors::AgentError;
use crate::worker;

/// Connects to `config.orchestrator_uri()`, retrying up to
/// `config.max_retries` times on failure, and runs one `ProcessTasks`
/// session to completion (until the orchestrator closes the stream, a
/// transport error occurs, or `cancel` fires).
pub async fn connect_and_run(config: Arc<AgentConfig>, cancel: CancellationToken) -> Result<(), AgentError> {
    let channel = dial_with_retries(&config).await?;
    let mut client = DispatchClient::new(channel);

    let (outbound_tx, outbound_rx) = mpsc::channel::<WireTaskResult>(config.buffer_size);
    let outbound = ReceiverStream::new(outbound_rx);

    let response = client.process_tasks(Request::new(outbound)).await?;
    let inbound = response.into_inner();

    run_session(config, inbound, outbound_tx, cancel).await
}

async fn dial_with_retries(config: &AgentConfig) -> Result<Channel, AgentError> {
    let endpoint = tonic::transport::Endpoint::from_shared(config.orchestrator_uri())
        .map_err(AgentError::Connect)?;

    let mut attempt = 0u32;
    loop {
        match endpoint.connect().await {
            Ok(channel) => return Ok(channel),
            Err(e) if attempt < config.max_retries => {
                attempt += 1;
                warn!(attempt, error = %e, "failed to connect to orchestrator, retrying");
                tokio::time::sleep(Duration::from_millis(500)).await;
            }
            Err(e) => return Err(AgentError::Connect(e)),
        }
    }
}

async fn run_session(
    config: Arc<AgentConfig>,
    inbound: tonic::Streaming<WireTask>,
    outbound_tx: mpsc::Sender<WireTaskResult>,
    cancel: CancellationToken,
) -> Result<(), AgentError> {
    let (in_tx, in_rx) = mpsc::channel::<WireTask>(config.buffer_size);
    let (out_tx, out_rx) = mpsc::channel::<WireTaskResult>(config.buffer_size);
    let in_rx = Arc::new(Mutex::new(in_rx));

    let mut workers = Vec::with_capacity(config.workers_limit);
    for _ in 0..config.workers_limit {
        workers.push(tokio::spawn(run_worker(in_rx.clone(), out_tx.clone())));
    }
    drop(out_tx);

    let get = tokio::spawn(get_tasks(inbound, in_tx, cancel.clone()));
    let pace = tokio::spawn(pace_results(config.poll_timeout_ms, out_rx, outbound_tx, cancel.clone()));

    let get_result = get.await.map_err(|_| AgentError::Recv("receive task loop panicked".into()))?;
    cancel.cancel();

    for worker in workers {
        let _ = worker.await;
    }

    let pace_result = pace.await.map_err(|_| AgentError::Send)?;

    get_result?;
    pace_result
}

async fn get_tasks(
    mut inbound: tonic::Streaming<WireTask>,
    in_tx: mpsc::Sender<WireTask>,
    cancel: CancellationToken,
) -> Result<(), AgentError> {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            msg = inbound.message() => {
                match msg {
                    Ok(Some(task)) => {
                        if in_tx.send(task).await.is_err() {
                            return Ok(());
                        }
                    }
                    Ok(None) => {
                        info!("orchestrator closed the dispatch stream");
                        return Ok(());
                    }
                    Err(status) => return Err(AgentError::Recv(status.to_string())),
                }
            }
        }
    }
}

async fn run_worker(in_rx: Arc<Mutex<mpsc::Receiver<WireTask>>>, out_tx: mpsc::Sender<WireTaskResult>) {
    loop {
        let task = {
            let mut rx = in_rx.lock().await;
            rx.recv().await
        };
        let Some(task) = task else {
            return;
        };
        let result = worker::evaluate(task).await;
        if out_tx.send(result).await.is_err() {
            return;
        }
    }
}

async fn pace_results(
    poll_timeout_ms: u64,
    mut out_rx: mpsc::Receiver<WireTaskResult>,
    outbound_tx: mpsc::Sender<WireTaskResult>,
    cancel: CancellationToken,
) -> Result<(), AgentError> {
    let mut ticker = tokio::time::interval(Duration::from_millis(poll_timeout_ms.max(1)));
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            _ = ticker.tick() => {
                match out_rx.recv().await {
                    Some(result) => {
                        if outbound_tx.send(result).await.is_err() {
                            return Err(AgentError::Send);
                        }
                    }
                    None => return Ok(()),
                }
            }
        }
    }
}
