//! PostgreSQL-backed store implementations. `take_ready` uses
//! `SELECT ... FOR UPDATE SKIP LOCKED` so concurrent dispatch loops never
//! contend on the same row; `complete`'s propagation runs inside a single
//! transaction to satisfy the atomicity requirement.

use async_trait::async_trait;
use sqlx::{PgPool, Row};

use super::{ExpressionStore, TaskStore, UserStore};
use crate::domain::{Expression, ExpressionStatus, Operator, Task, TaskStatus, User};
use crate::errors::StoreError;

pub struct PgTaskStore {
    pool: PgPool,
}

impl PgTaskStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn op_to_str(op: Operator) -> &'static str {
    op.as_str()
}

fn str_to_op(s: &str) -> Operator {
    match s {
        "+" => Operator::Add,
        "-" => Operator::Sub,
        "*" => Operator::Mul,
        "/" => Operator::Div,
        _ => Operator::None,
    }
}

fn status_to_str(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Blocked => "blocked",
        TaskStatus::Ready => "ready",
        TaskStatus::Done => "done",
    }
}

fn str_to_status(s: &str) -> TaskStatus {
    match s {
        "ready" => TaskStatus::Ready,
        "done" => TaskStatus::Done,
        _ => TaskStatus::Blocked,
    }
}

#[async_trait]
impl TaskStore for PgTaskStore {
    async fn insert_many(&self, tasks: Vec<Task>) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        for task in &tasks {
            sqlx::query(
                "INSERT INTO tasks (id, expression_id, op, left_arg, right_arg, left_dep, \
                 right_dep, result, status, is_final) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10)",
            )
            .bind(&task.id)
            .bind(&task.expression_id)
            .bind(op_to_str(task.op))
            .bind(task.left_arg)
            .bind(task.right_arg)
            .bind(&task.left_dep)
            .bind(&task.right_dep)
            .bind(task.result)
            .bind(status_to_str(task.status))
            .bind(task.is_final)
            .execute(&mut *tx)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Conflict,
                _ => StoreError::Database(e),
            })?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn take_ready(&self) -> Result<Task, StoreError> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query(
            "SELECT id, expression_id, op, left_arg, right_arg, left_dep, right_dep, result, \
             status, is_final FROM tasks WHERE status = 'ready' \
             FOR UPDATE SKIP LOCKED LIMIT 1",
        )
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(StoreError::NoTasks)?;

        let id: String = row.try_get("id")?;
        sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(&id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(Task {
            id,
            expression_id: row.try_get("expression_id")?,
            op: str_to_op(row.try_get::<String, _>("op")?.as_str()),
            left_arg: row.try_get("left_arg")?,
            right_arg: row.try_get("right_arg")?,
            left_dep: row.try_get("left_dep")?,
            right_dep: row.try_get("right_dep")?,
            result: row.try_get("result")?,
            status: str_to_status(row.try_get::<String, _>("status")?.as_str()),
            is_final: row.try_get("is_final")?,
        })
    }

    async fn complete(&self, task_id: &str, result: f64) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "UPDATE tasks SET left_arg = $1, left_dep = NULL, \
             status = CASE WHEN right_dep IS NULL THEN 'ready' ELSE status END \
             WHERE left_dep = $2",
        )
        .bind(result)
        .bind(task_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE tasks SET right_arg = $1, right_dep = NULL, \
             status = CASE WHEN left_dep IS NULL THEN 'ready' ELSE status END \
             WHERE right_dep = $2",
        )
        .bind(result)
        .bind(task_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn delete_by_expression(&self, expression_id: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM tasks WHERE expression_id = $1")
            .bind(expression_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

pub struct PgExpressionStore {
    pool: PgPool,
}

impl PgExpressionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn expr_status_to_str(status: ExpressionStatus) -> &'static str {
    match status {
        ExpressionStatus::Pending => "pending",
        ExpressionStatus::Completed => "completed",
        ExpressionStatus::Failed => "failed",
    }
}

fn str_to_expr_status(s: &str) -> ExpressionStatus {
    match s {
        "completed" => ExpressionStatus::Completed,
        "failed" => ExpressionStatus::Failed,
        _ => ExpressionStatus::Pending,
    }
}

#[async_trait]
impl ExpressionStore for PgExpressionStore {
    async fn insert(&self, expression: Expression) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO expressions (id, owner, status, result) VALUES ($1,$2,$3,$4)")
            .bind(&expression.id)
            .bind(&expression.owner)
            .bind(expr_status_to_str(expression.status))
            .bind(expression.result)
            .execute(&self.pool)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Conflict,
                _ => StoreError::Database(e),
            })?;
        Ok(())
    }

    async fn get(&self, id: &str, owner: &str) -> Result<Expression, StoreError> {
        let row = sqlx::query(
            "SELECT id, owner, status, result FROM expressions WHERE id = $1 AND owner = $2",
        )
        .bind(id)
        .bind(owner)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)?;

        Ok(Expression {
            id: row.try_get("id")?,
            owner: row.try_get("owner")?,
            status: str_to_expr_status(row.try_get::<String, _>("status")?.as_str()),
            result: row.try_get("result")?,
        })
    }

    async fn list(
        &self,
        owner: &str,
        cursor: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Expression>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, owner, status, result FROM expressions \
             WHERE owner = $1 AND ($2::text IS NULL OR id > $2) \
             ORDER BY id ASC LIMIT $3",
        )
        .bind(owner)
        .bind(cursor)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(Expression {
                    id: row.try_get("id")?,
                    owner: row.try_get("owner")?,
                    status: str_to_expr_status(row.try_get::<String, _>("status")?.as_str()),
                    result: row.try_get("result")?,
                })
            })
            .collect()
    }

    async fn update_status_and_result(
        &self,
        id: &str,
        status: ExpressionStatus,
        result: f64,
    ) -> Result<(), StoreError> {
        sqlx::query("UPDATE expressions SET status = $1, result = $2 WHERE id = $3")
            .bind(expr_status_to_str(status))
            .bind(result)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn insert(&self, user: User) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO users (id, username, hashed_password) VALUES ($1,$2,$3)")
            .bind(&user.id)
            .bind(&user.username)
            .bind(&user.hashed_password)
            .execute(&self.pool)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Conflict,
                _ => StoreError::Database(e),
            })?;
        Ok(())
    }

    async fn get_by_username(&self, username: &str) -> Result<User, StoreError> {
        let row = sqlx::query("SELECT id, username, hashed_password FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)?;

        Ok(User {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            hashed_password: row.try_get("hashed_password")?,
        })
    }
}
