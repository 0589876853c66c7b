//! In-memory store implementations: `Mutex`-guarded `HashMap`s. Hermetic
//! default for tests and single-process demo deployments.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{ExpressionStore, TaskStore, UserStore};
use crate::domain::{Expression, ExpressionStatus, Task, User};
use crate::errors::StoreError;

#[derive(Debug, Default)]
pub struct InMemoryTaskStore {
    tasks: Mutex<HashMap<String, Task>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn insert_many(&self, tasks: Vec<Task>) -> Result<(), StoreError> {
        let mut guard = self.tasks.lock().unwrap();
        if tasks.iter().any(|t| guard.contains_key(&t.id)) {
            return Err(StoreError::Conflict);
        }
        for task in tasks {
            guard.insert(task.id.clone(), task);
        }
        Ok(())
    }

    async fn take_ready(&self) -> Result<Task, StoreError> {
        let mut guard = self.tasks.lock().unwrap();
        let ready_id = guard
            .values()
            .find(|t| t.is_ready())
            .map(|t| t.id.clone())
            .ok_or(StoreError::NoTasks)?;
        Ok(guard.remove(&ready_id).expect("just matched by id"))
    }

    async fn complete(&self, task_id: &str, result: f64) -> Result<(), StoreError> {
        let mut guard = self.tasks.lock().unwrap();
        // T itself has already been removed by take_ready by the time a
        // completion is ingested; re-delivery for an unknown id is a noop.
        guard.remove(task_id);

        for dependent in guard.values_mut() {
            let mut touched = false;
            if dependent.left_dep.as_deref() == Some(task_id) {
                dependent.left_arg = result;
                dependent.left_dep = None;
                touched = true;
            }
            if dependent.right_dep.as_deref() == Some(task_id) {
                dependent.right_arg = result;
                dependent.right_dep = None;
                touched = true;
            }
            if touched && dependent.is_ready() {
                dependent.status = crate::domain::TaskStatus::Ready;
            }
        }
        Ok(())
    }

    async fn delete_by_expression(&self, expression_id: &str) -> Result<(), StoreError> {
        let mut guard = self.tasks.lock().unwrap();
        guard.retain(|_, t| t.expression_id != expression_id);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryExpressionStore {
    expressions: Mutex<HashMap<String, Expression>>,
}

impl InMemoryExpressionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ExpressionStore for InMemoryExpressionStore {
    async fn insert(&self, expression: Expression) -> Result<(), StoreError> {
        let mut guard = self.expressions.lock().unwrap();
        if guard.contains_key(&expression.id) {
            return Err(StoreError::Conflict);
        }
        guard.insert(expression.id.clone(), expression);
        Ok(())
    }

    async fn get(&self, id: &str, owner: &str) -> Result<Expression, StoreError> {
        let guard = self.expressions.lock().unwrap();
        guard
            .get(id)
            .filter(|e| e.owner == owner)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn list(
        &self,
        owner: &str,
        cursor: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Expression>, StoreError> {
        let guard = self.expressions.lock().unwrap();
        let mut owned: Vec<Expression> = guard
            .values()
            .filter(|e| e.owner == owner)
            .filter(|e| cursor.is_none_or(|c| e.id.as_str() > c))
            .cloned()
            .collect();
        owned.sort_by(|a, b| a.id.cmp(&b.id));
        owned.truncate(limit);
        Ok(owned)
    }

    async fn update_status_and_result(
        &self,
        id: &str,
        status: ExpressionStatus,
        result: f64,
    ) -> Result<(), StoreError> {
        let mut guard = self.expressions.lock().unwrap();
        if let Some(expr) = guard.get_mut(id) {
            expr.status = status;
            expr.result = result;
        }
        // A missing expression record here is a stale/noop message, not an
        // error — ingest() treats it the same way.
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: Mutex<HashMap<String, User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn insert(&self, user: User) -> Result<(), StoreError> {
        let mut guard = self.users.lock().unwrap();
        if guard.contains_key(&user.username) {
            return Err(StoreError::Conflict);
        }
        guard.insert(user.username.clone(), user);
        Ok(())
    }

    async fn get_by_username(&self, username: &str) -> Result<User, StoreError> {
        let guard = self.users.lock().unwrap();
        guard.get(username).cloned().ok_or(StoreError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Operator, TaskStatus};

    fn literal(id: &str, expr: &str, value: f64, is_final: bool) -> Task {
        Task {
            id: id.into(),
            expression_id: expr.into(),
            op: Operator::None,
            left_arg: value,
            right_arg: 0.0,
            left_dep: None,
            right_dep: None,
            result: 0.0,
            status: TaskStatus::Ready,
            is_final,
        }
    }

    fn binary(id: &str, expr: &str, op: Operator, left: &str, right: &str, is_final: bool) -> Task {
        Task {
            id: id.into(),
            expression_id: expr.into(),
            op,
            left_arg: 0.0,
            right_arg: 0.0,
            left_dep: Some(left.into()),
            right_dep: Some(right.into()),
            result: 0.0,
            status: TaskStatus::Blocked,
            is_final,
        }
    }

    #[tokio::test]
    async fn insert_many_is_all_or_nothing_on_conflict() {
        let store = InMemoryTaskStore::new();
        store
            .insert_many(vec![literal("e1:1", "e1", 1.0, false)])
            .await
            .unwrap();
        let err = store
            .insert_many(vec![
                literal("e1:1", "e1", 1.0, false),
                literal("e1:2", "e1", 2.0, true),
            ])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict));
        // The failed second insert must not have left e1:2 behind.
        let ready = store.take_ready().await.unwrap();
        assert_eq!(ready.id, "e1:1");
        assert!(matches!(
            store.take_ready().await.unwrap_err(),
            StoreError::NoTasks
        ));
    }

    #[tokio::test]
    async fn take_ready_returns_no_tasks_when_empty() {
        let store = InMemoryTaskStore::new();
        assert!(matches!(
            store.take_ready().await.unwrap_err(),
            StoreError::NoTasks
        ));
    }

    #[tokio::test]
    async fn complete_propagates_into_both_dependents() {
        let store = InMemoryTaskStore::new();
        store
            .insert_many(vec![
                literal("e1:1", "e1", 2.0, false),
                literal("e1:2", "e1", 3.0, false),
                binary("e1:3", "e1", Operator::Add, "e1:1", "e1:2", true),
            ])
            .await
            .unwrap();

        let left = store.take_ready().await.unwrap();
        assert_eq!(left.id, "e1:1");
        store.complete(&left.id, 2.0).await.unwrap();

        let right = store.take_ready().await.unwrap();
        assert_eq!(right.id, "e1:2");
        store.complete(&right.id, 3.0).await.unwrap();

        let root = store.take_ready().await.unwrap();
        assert_eq!(root.id, "e1:3");
        assert_eq!(root.left_arg, 2.0);
        assert_eq!(root.right_arg, 3.0);
        assert!(root.left_dep.is_none() && root.right_dep.is_none());
    }

    #[tokio::test]
    async fn complete_is_idempotent_on_unknown_id() {
        let store = InMemoryTaskStore::new();
        store.complete("ghost:1", 42.0).await.unwrap();
        store.complete("ghost:1", 42.0).await.unwrap();
    }

    #[tokio::test]
    async fn delete_by_expression_removes_only_matching_tasks() {
        let store = InMemoryTaskStore::new();
        store
            .insert_many(vec![
                literal("e1:1", "e1", 1.0, true),
                literal("e2:1", "e2", 2.0, true),
            ])
            .await
            .unwrap();
        store.delete_by_expression("e1").await.unwrap();
        // e2's task should remain ready for taking.
        let remaining = store.take_ready().await.unwrap();
        assert_eq!(remaining.expression_id, "e2");
    }

    #[tokio::test]
    async fn expression_list_scopes_by_owner() {
        let store = InMemoryExpressionStore::new();
        store
            .insert(Expression {
                id: "e1".into(),
                owner: "alice".into(),
                status: ExpressionStatus::Pending,
                result: 0.0,
            })
            .await
            .unwrap();
        store
            .insert(Expression {
                id: "e2".into(),
                owner: "bob".into(),
                status: ExpressionStatus::Pending,
                result: 0.0,
            })
            .await
            .unwrap();

        let alice_exprs = store.list("alice", None, 10).await.unwrap();
        assert_eq!(alice_exprs.len(), 1);
        assert_eq!(alice_exprs[0].id, "e1");
    }

    #[tokio::test]
    async fn get_is_tenant_scoped() {
        let store = InMemoryExpressionStore::new();
        store
            .insert(Expression {
                id: "e1".into(),
                owner: "alice".into(),
                status: ExpressionStatus::Pending,
                result: 0.0,
            })
            .await
            .unwrap();
        assert!(store.get("e1", "bob").await.is_err());
        assert!(store.get("e1", "alice").await.is_ok());
    }
}
