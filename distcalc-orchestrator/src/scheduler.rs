//! The scheduler service: the seam between the external API (HTTP, gRPC)
//! and the task/expression stores. Owns no state itself beyond the two
//! store handles.

use std::sync::Arc;

use distcalc_shared::config::OrchestratorConfig;
use distcalc_shared::domain::{Expression, ExpressionStatus, Task};
use distcalc_shared::errors::SchedulerError;
use distcalc_shared::parser;
use distcalc_shared::store::{ExpressionStore, TaskStore};
use uuid::Uuid;

/// A task pulled off the ready queue, annotated with the per-operation
/// simulated latency the agent should sleep before replying — a
/// server-side knob, not a property of the task itself.
#[derive(Debug, Clone)]
pub struct DispatchedTask {
    pub task: Task,
    pub op_time_ms: u64,
}

/// What an agent reported back for one task.
#[derive(Debug, Clone)]
pub struct TaskCompletion {
    pub task_id: String,
    pub value: f64,
    pub failed: bool,
    pub is_final: bool,
}

pub struct Scheduler {
    tasks: Arc<dyn TaskStore>,
    expressions: Arc<dyn ExpressionStore>,
}

impl Scheduler {
    pub fn new(tasks: Arc<dyn TaskStore>, expressions: Arc<dyn ExpressionStore>) -> Self {
        Self { tasks, expressions }
    }

    /// Parses `expression_text`, allocates a time-ordered expression id,
    /// and persists the decomposed tasks followed by the expression record.
    /// A crash between the two leaves an expression-less set of orphaned
    /// tasks with no observable owner — acceptable per the scheduling
    /// design's availability target, and why tasks are inserted first (an
    /// expression record is never visible without its tasks already
    /// durable).
    pub async fn submit(&self, expression_text: &str, owner: &str) -> Result<String, SchedulerError> {
        let expression_id = Uuid::now_v7().to_string();
        let tasks = parser::decompose(expression_text, &expression_id)?;

        self.tasks.insert_many(tasks).await?;
        self.expressions
            .insert(Expression {
                id: expression_id.clone(),
                owner: owner.to_string(),
                status: ExpressionStatus::Pending,
                result: 0.0,
            })
            .await?;

        Ok(expression_id)
    }

    pub async fn fetch_expression(&self, id: &str, owner: &str) -> Result<Expression, SchedulerError> {
        Ok(self.expressions.get(id, owner).await?)
    }

    pub async fn list_expressions(
        &self,
        owner: &str,
        cursor: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Expression>, SchedulerError> {
        Ok(self.expressions.list(owner, cursor, limit).await?)
    }

    /// Called from the agent dispatch path on each completion.
    ///
    /// A `failed` completion flips the owning expression straight to
    /// `failed` and cascade-deletes its remaining tasks, regardless of
    /// whether the failing task was the final one — a division-by-zero
    /// anywhere in the DAG makes the whole expression's eventual result
    /// meaningless, so there is no point letting the rest of the graph run
    /// to completion. See DESIGN.md for why this departs from the source,
    /// which propagated a failed result's numeric payload as if it had
    /// succeeded.
    pub async fn ingest(&self, completion: TaskCompletion) -> Result<(), SchedulerError> {
        if completion.failed {
            if let Some(expression_id) = Task::expression_id_of(&completion.task_id) {
                self.expressions
                    .update_status_and_result(expression_id, ExpressionStatus::Failed, 0.0)
                    .await?;
                self.tasks.delete_by_expression(expression_id).await?;
            }
            return Ok(());
        }

        self.tasks.complete(&completion.task_id, completion.value).await?;

        if completion.is_final {
            if let Some(expression_id) = Task::expression_id_of(&completion.task_id) {
                self.expressions
                    .update_status_and_result(
                        expression_id,
                        ExpressionStatus::Completed,
                        completion.value,
                    )
                    .await?;
                self.tasks.delete_by_expression(expression_id).await?;
            }
        }

        Ok(())
    }

    /// Pull primitive for the dispatch stream: wraps `take_ready`,
    /// annotating the result with the simulated latency `config` assigns
    /// to the task's own operator.
    pub async fn next_ready(&self, config: &OrchestratorConfig) -> Result<DispatchedTask, SchedulerError> {
        let task = self.tasks.take_ready().await?;
        let op_time_ms = config.op_time_ms(task.op);
        Ok(DispatchedTask { task, op_time_ms })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use distcalc_shared::store::{InMemoryExpressionStore, InMemoryTaskStore};

    fn scheduler() -> Scheduler {
        Scheduler::new(
            Arc::new(InMemoryTaskStore::new()),
            Arc::new(InMemoryExpressionStore::new()),
        )
    }

    fn test_config() -> OrchestratorConfig {
        OrchestratorConfig {
            host: "0.0.0.0".into(),
            http_port: 8080,
            grpc_port: 50051,
            addition_time_ms: 1,
            subtraction_time_ms: 1,
            multiplication_time_ms: 1,
            division_time_ms: 1,
            poll_delay_ms: 1,
            database_url: None,
            access_token_ttl_secs: 900,
            refresh_token_ttl_secs: 604_800,
        }
    }

    #[tokio::test]
    async fn submit_rejects_invalid_expressions_without_creating_records() {
        let s = scheduler();
        let err = s.submit("2+2*", "alice").await.unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidExpression(_)));
    }

    #[tokio::test]
    async fn submit_then_fetch_returns_a_pending_expression() {
        let s = scheduler();
        let id = s.submit("2+2", "alice").await.unwrap();
        let expr = s.fetch_expression(&id, "alice").await.unwrap();
        assert_eq!(expr.status, ExpressionStatus::Pending);
        assert_eq!(expr.result, 0.0);
    }

    #[tokio::test]
    async fn fetch_is_tenant_scoped() {
        let s = scheduler();
        let id = s.submit("2+2", "alice").await.unwrap();
        assert!(s.fetch_expression(&id, "bob").await.is_err());
    }

    #[tokio::test]
    async fn end_to_end_simple_addition_completes() {
        let s = scheduler();
        let cfg = test_config();
        let id = s.submit("2+2", "alice").await.unwrap();

        let dispatched = s.next_ready(&cfg).await.unwrap();
        assert_eq!(dispatched.task.id, format!("{id}:1"));
        s.ingest(TaskCompletion {
            task_id: dispatched.task.id.clone(),
            value: 2.0,
            failed: false,
            is_final: false,
        })
        .await
        .unwrap();

        let dispatched = s.next_ready(&cfg).await.unwrap();
        s.ingest(TaskCompletion {
            task_id: dispatched.task.id.clone(),
            value: 2.0,
            failed: false,
            is_final: false,
        })
        .await
        .unwrap();

        let dispatched = s.next_ready(&cfg).await.unwrap();
        assert!(dispatched.task.is_final);
        s.ingest(TaskCompletion {
            task_id: dispatched.task.id.clone(),
            value: 4.0,
            failed: false,
            is_final: true,
        })
        .await
        .unwrap();

        let expr = s.fetch_expression(&id, "alice").await.unwrap();
        assert_eq!(expr.status, ExpressionStatus::Completed);
        assert_eq!(expr.result, 4.0);
    }

    #[tokio::test]
    async fn a_failed_completion_fails_the_expression_and_drops_remaining_tasks() {
        let s = scheduler();
        let cfg = test_config();
        let id = s.submit("(1/0)+2", "alice").await.unwrap();

        // Drain every ready task until we hit the failing division.
        loop {
            let dispatched = s.next_ready(&cfg).await.unwrap();
            let is_division = dispatched.task.op == distcalc_shared::domain::Operator::Div;
            s.ingest(TaskCompletion {
                task_id: dispatched.task.id.clone(),
                value: 0.0,
                failed: is_division,
                is_final: dispatched.task.is_final,
            })
            .await
            .unwrap();
            if is_division {
                break;
            }
        }

        let expr = s.fetch_expression(&id, "alice").await.unwrap();
        assert_eq!(expr.status, ExpressionStatus::Failed);
    }

    #[tokio::test]
    async fn list_expressions_scopes_by_owner() {
        let s = scheduler();
        s.submit("2+2", "alice").await.unwrap();
        s.submit("3+3", "bob").await.unwrap();

        let alice_list = s.list_expressions("alice", None, 10).await.unwrap();
        assert_eq!(alice_list.len(), 1);
        let bob_list = s.list_expressions("bob", None, 10).await.unwrap();
        assert_eq!(bob_list.len(), 1);
    }
}
