//! Core domain types: expressions, tasks, and users.
//!
//! These are plain data records. The invariants that govern how they move
//! between states (ready/blocked, pending/completed/failed) live in
//! [`crate::store`] and [`crate::parser`], not here.

use serde::{Deserialize, Serialize};

/// A user-submitted arithmetic expression and the state of its evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expression {
    pub id: String,
    pub owner: String,
    pub status: ExpressionStatus,
    pub result: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpressionStatus {
    Pending,
    Completed,
    Failed,
}

/// One node of an expression's task DAG: either a literal leaf (`op` empty)
/// or a binary operation over two operand slots.
///
/// `left_dep`/`right_dep` hold the id of the task that must complete before
/// `left_arg`/`right_arg` respectively carry a meaningful value. A task is
/// `ready` exactly when both dep slots are empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub expression_id: String,
    pub op: Operator,
    pub left_arg: f64,
    pub right_arg: f64,
    pub left_dep: Option<String>,
    pub right_dep: Option<String>,
    pub result: f64,
    pub status: TaskStatus,
    pub is_final: bool,
}

impl Task {
    /// A task is ready to dispatch exactly when it has no outstanding
    /// dependencies — mirrors the store invariant, used by constructors and
    /// tests that build tasks outside the store.
    pub fn is_ready(&self) -> bool {
        self.left_dep.is_none() && self.right_dep.is_none()
    }

    /// Splits a wire-format task id (`"<expression_id>:<sequence>"`) into its
    /// expression id prefix, used to route a `final` completion back to the
    /// owning expression without a separate lookup.
    pub fn expression_id_of(task_id: &str) -> Option<&str> {
        task_id.split_once(':').map(|(prefix, _)| prefix)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Blocked,
    Ready,
    Done,
}

/// The arithmetic operator a task applies, or `None` for a literal leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    Add,
    Sub,
    Mul,
    Div,
    #[serde(rename = "")]
    None,
}

impl Operator {
    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Add => "+",
            Operator::Sub => "-",
            Operator::Mul => "*",
            Operator::Div => "/",
            Operator::None => "",
        }
    }

    pub fn apply(self, left: f64, right: f64) -> Result<f64, crate::errors::SchedulerError> {
        match self {
            Operator::Add => Ok(left + right),
            Operator::Sub => Ok(left - right),
            Operator::Mul => Ok(left * right),
            Operator::Div => {
                if right == 0.0 {
                    Err(crate::errors::SchedulerError::DivisionByZero)
                } else {
                    Ok(left / right)
                }
            }
            Operator::None => Ok(left),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub hashed_password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_is_ready_when_no_deps() {
        let t = Task {
            id: "e1:1".into(),
            expression_id: "e1".into(),
            op: Operator::None,
            left_arg: 1.0,
            right_arg: 0.0,
            left_dep: None,
            right_dep: None,
            result: 0.0,
            status: TaskStatus::Ready,
            is_final: false,
        };
        assert!(t.is_ready());
    }

    #[test]
    fn task_not_ready_with_dep() {
        let t = Task {
            id: "e1:2".into(),
            expression_id: "e1".into(),
            op: Operator::Add,
            left_arg: 0.0,
            right_arg: 0.0,
            left_dep: Some("e1:1".into()),
            right_dep: None,
            result: 0.0,
            status: TaskStatus::Blocked,
            is_final: false,
        };
        assert!(!t.is_ready());
    }

    #[test]
    fn expression_id_of_splits_on_first_colon() {
        assert_eq!(Task::expression_id_of("01912abc:3"), Some("01912abc"));
        assert_eq!(Task::expression_id_of("noop"), None);
    }

    #[test]
    fn division_by_zero_is_an_error() {
        let err = Operator::Div.apply(1.0, 0.0).unwrap_err();
        assert!(matches!(err, crate::errors::SchedulerError::DivisionByZero));
    }
}
