//! Persistence traits for tasks, expressions, and users, with in-memory and
//! (optionally) PostgreSQL-backed implementations behind each.

mod in_memory;
#[cfg(feature = "postgres")]
mod postgres;

pub use in_memory::{InMemoryExpressionStore, InMemoryTaskStore, InMemoryUserStore};
#[cfg(feature = "postgres")]
pub use postgres::{PgExpressionStore, PgTaskStore, PgUserStore};

use async_trait::async_trait;

use crate::domain::{Expression, ExpressionStatus, Task, User};
use crate::errors::StoreError;

/// Durable mapping of task id to task record. Implementations must satisfy
/// the atomicity requirement on `complete`: steps 2-4 (propagate into
/// dependents, flip readiness) are observable as a single transition.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Inserts all tasks atomically; none are inserted if any id collides.
    async fn insert_many(&self, tasks: Vec<Task>) -> Result<(), StoreError>;

    /// Atomically removes and returns one ready task. `StoreError::NoTasks`
    /// if none are ready. Fairness is unspecified.
    async fn take_ready(&self) -> Result<Task, StoreError>;

    /// Records `result` as the value produced by `task_id`, propagating it
    /// into every task whose dependency slot references `task_id`. Idempotent
    /// if `task_id` is not (or no longer) present.
    async fn complete(&self, task_id: &str, result: f64) -> Result<(), StoreError>;

    /// Removes every task whose `expression_id` matches.
    async fn delete_by_expression(&self, expression_id: &str) -> Result<(), StoreError>;
}

/// Durable mapping of expression id to its owner, status, and result.
#[async_trait]
pub trait ExpressionStore: Send + Sync {
    async fn insert(&self, expression: Expression) -> Result<(), StoreError>;

    /// Tenant-scoped read: `NotFound` if absent or owned by someone else.
    async fn get(&self, id: &str, owner: &str) -> Result<Expression, StoreError>;

    /// Lexicographic cursor pagination on `id`, scoped to `owner`.
    async fn list(
        &self,
        owner: &str,
        cursor: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Expression>, StoreError>;

    async fn update_status_and_result(
        &self,
        id: &str,
        status: ExpressionStatus,
        result: f64,
    ) -> Result<(), StoreError>;
}

/// Durable mapping of username to user record, for registration and login.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert(&self, user: User) -> Result<(), StoreError>;
    async fn get_by_username(&self, username: &str) -> Result<User, StoreError>;
}
