//! The arithmetic worker: what one agent worker does with a dispatched task.
//!
//! Reimplements `backend/internal/agent/service/service.go`'s `Evaluate`:
//! sleep for the task's configured `operation_time`, simulating
//! heterogeneous per-operation cost, then apply the operator. Division by
//! zero is reported back as `status = "failure"` rather than surfaced as a
//! transport error — what a failure means for the owning expression is the
//! orchestrator's decision (`distcalc-orchestrator::scheduler::Scheduler::ingest`),
//! not this worker's.

use std::time::Duration;

use distcalc_shared::proto::{Task, TaskResult};

const STATUS_COMPLETED: &str = "completed";
const STATUS_FAILURE: &str = "failure";

/// Sleeps `task.operation_time` milliseconds, then evaluates it.
pub async fn evaluate(task: Task) -> TaskResult {
    let sleep_ms = u64::try_from(task.operation_time).unwrap_or(0);
    tokio::time::sleep(Duration::from_millis(sleep_ms)).await;

    match apply(&task.op, task.left_arg, task.right_arg) {
        Some(result) => TaskResult {
            id: task.id,
            result,
            status: STATUS_COMPLETED.to_string(),
            is_final: task.is_final,
        },
        None => TaskResult {
            id: task.id,
            result: 0.0,
            status: STATUS_FAILURE.to_string(),
            is_final: task.is_final,
        },
    }
}

fn apply(op: &str, left: f64, right: f64) -> Option<f64> {
    match op {
        "+" => Some(left + right),
        "-" => Some(left - right),
        "*" => Some(left * right),
        "/" if right != 0.0 => Some(left / right),
        "/" => None,
        "" => Some(left),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(op: &str, left: f64, right: f64, is_final: bool) -> Task {
        Task {
            id: "e1:1".into(),
            left_arg: left,
            right_arg: right,
            op: op.into(),
            operation_time: 0,
            is_final,
        }
    }

    #[tokio::test]
    async fn adds_two_operands() {
        let result = evaluate(task("+", 2.0, 3.0, false)).await;
        assert_eq!(result.status, STATUS_COMPLETED);
        assert_eq!(result.result, 5.0);
    }

    #[tokio::test]
    async fn divides_two_operands() {
        let result = evaluate(task("/", 6.0, 3.0, false)).await;
        assert_eq!(result.result, 2.0);
    }

    #[tokio::test]
    async fn division_by_zero_is_reported_as_failure() {
        let result = evaluate(task("/", 1.0, 0.0, true)).await;
        assert_eq!(result.status, STATUS_FAILURE);
        assert!(result.is_final);
    }

    #[tokio::test]
    async fn literal_task_returns_its_own_left_arg() {
        let result = evaluate(task("", 42.0, 0.0, true)).await;
        assert_eq!(result.result, 42.0);
        assert_eq!(result.status, STATUS_COMPLETED);
    }

    #[tokio::test]
    async fn unknown_operator_is_a_failure() {
        let result = evaluate(task("%", 1.0, 1.0, false)).await;
        assert_eq!(result.status, STATUS_FAILURE);
    }
}
