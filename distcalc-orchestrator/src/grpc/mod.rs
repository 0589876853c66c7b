//! The `Dispatch` gRPC service: one bidirectional `ProcessTasks` session per
//! connected agent.
//!
//! Each session spawns two independent tasks sharing a single
//! [`CancellationToken`] — a send loop that ticks at `poll_delay_ms` pulling
//! ready tasks onto the outbound stream, and a receive loop that drains
//! completions off the inbound stream into [`Scheduler::ingest`]. Either
//! task returning cancels the other; this mirrors the original's
//! `errgroup.WithContext` plus two goroutines (see
//! `backend/internal/orchestrator/transport/grpc/grpc.go`) rather than
//! collapsing both directions into one state machine, per DESIGN NOTES §9.

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use distcalc_shared::config::OrchestratorConfig;
use distcalc_shared::errors::SchedulerError;
use distcalc_shared::proto::dispatch_server::Dispatch;
pub use distcalc_shared::proto::dispatch_server::DispatchServer;
use distcalc_shared::proto::{Task as WireTask, TaskResult as WireTaskResult};
use futures::Stream;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tonic::{Request, Response, Status, Streaming};
use tracing::{error, info, warn};

use crate::scheduler::{DispatchedTask, Scheduler, TaskCompletion};

const OUTBOUND_BUFFER: usize = 32;
const FAILURE_STATUS: &str = "failure";

/// Errors that end a dispatch session. Distinct from [`SchedulerError`]:
/// only a send/receive failure on the stream itself, or an `ingest`
/// failure, closes the session — an error from `next_ready` is logged and
/// that tick is skipped (see module docs and `spec.md` §4.4).
#[derive(Debug, Error)]
enum SessionError {
    #[error("failed to send task to agent")]
    Send,
    #[error("failed to receive from agent: {0}")]
    Recv(String),
    #[error("failed to ingest completion: {0}")]
    Ingest(#[from] SchedulerError),
}

pub struct DispatchService {
    scheduler: Arc<Scheduler>,
    config: Arc<OrchestratorConfig>,
}

impl DispatchService {
    pub fn new(scheduler: Arc<Scheduler>, config: Arc<OrchestratorConfig>) -> Self {
        Self { scheduler, config }
    }
}

type OutboundStream = Pin<Box<dyn Stream<Item = Result<WireTask, Status>> + Send + 'static>>;

#[tonic::async_trait]
impl Dispatch for DispatchService {
    type ProcessTasksStream = OutboundStream;

    async fn process_tasks(
        &self,
        request: Request<Streaming<WireTaskResult>>,
    ) -> Result<Response<Self::ProcessTasksStream>, Status> {
        let inbound = request.into_inner();
        let (tx, rx) = mpsc::channel(OUTBOUND_BUFFER);
        let cancel = CancellationToken::new();

        tokio::spawn(run_send_loop(
            self.scheduler.clone(),
            self.config.clone(),
            tx,
            cancel.clone(),
        ));
        tokio::spawn(run_receive_loop(self.scheduler.clone(), inbound, cancel));

        Ok(Response::new(Box::pin(ReceiverStream::new(rx))))
    }
}

async fn run_send_loop(
    scheduler: Arc<Scheduler>,
    config: Arc<OrchestratorConfig>,
    tx: mpsc::Sender<Result<WireTask, Status>>,
    cancel: CancellationToken,
) {
    if let Err(e) = send_tasks(scheduler, &config, tx, cancel.clone()).await {
        warn!(error = %e, "dispatch send loop ended");
    }
    cancel.cancel();
}

async fn run_receive_loop(
    scheduler: Arc<Scheduler>,
    inbound: Streaming<WireTaskResult>,
    cancel: CancellationToken,
) {
    if let Err(e) = receive_results(scheduler, inbound, cancel.clone()).await {
        warn!(error = %e, "dispatch receive loop ended");
    }
    cancel.cancel();
}

async fn send_tasks(
    scheduler: Arc<Scheduler>,
    config: &OrchestratorConfig,
    tx: mpsc::Sender<Result<WireTask, Status>>,
    cancel: CancellationToken,
) -> Result<(), SessionError> {
    let mut ticker = tokio::time::interval(Duration::from_millis(config.poll_delay_ms.max(1)));

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            _ = ticker.tick() => {
                match scheduler.next_ready(config).await {
                    Ok(dispatched) => {
                        if tx.send(Ok(to_wire_task(&dispatched))).await.is_err() {
                            return Err(SessionError::Send);
                        }
                    }
                    Err(SchedulerError::NoTasks) => {}
                    Err(e) => {
                        error!(error = %e, "next_ready failed, skipping this tick");
                    }
                }
            }
        }
    }
}

async fn receive_results(
    scheduler: Arc<Scheduler>,
    mut inbound: Streaming<WireTaskResult>,
    cancel: CancellationToken,
) -> Result<(), SessionError> {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            msg = inbound.message() => {
                match msg {
                    Ok(Some(result)) => {
                        scheduler.ingest(to_completion(result)).await?;
                    }
                    Ok(None) => {
                        info!("agent closed the dispatch stream");
                        return Ok(());
                    }
                    Err(status) => return Err(SessionError::Recv(status.to_string())),
                }
            }
        }
    }
}

fn to_wire_task(dispatched: &DispatchedTask) -> WireTask {
    WireTask {
        id: dispatched.task.id.clone(),
        left_arg: dispatched.task.left_arg,
        right_arg: dispatched.task.right_arg,
        op: dispatched.task.op.as_str().to_string(),
        operation_time: dispatched.op_time_ms as i64,
        is_final: dispatched.task.is_final,
    }
}

fn to_completion(result: WireTaskResult) -> TaskCompletion {
    TaskCompletion {
        task_id: result.id,
        value: result.result,
        failed: result.status == FAILURE_STATUS,
        is_final: result.is_final,
    }
}
