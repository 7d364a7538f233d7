//! In-memory task registry
//!
//! Shared by request handlers and workers. Each [`TaskStore::update`] runs
//! under the write lock, so a status change is observed either completely
//! or not at all.

use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::Task;

#[derive(Debug, Default)]
pub struct TaskStore {
    tasks: RwLock<HashMap<Uuid, Task>>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new PENDING task
    pub async fn create(&self, task_id: Uuid, original_filename: impl Into<String>) -> Task {
        let task = Task::new(task_id, original_filename);
        self.tasks.write().await.insert(task_id, task.clone());
        task
    }

    /// Snapshot of a task
    pub async fn get(&self, task_id: &Uuid) -> Option<Task> {
        self.tasks.read().await.get(task_id).cloned()
    }

    /// Apply `f` to a task under the write lock
    ///
    /// Returns None if the task does not exist.
    pub async fn update<F, R>(&self, task_id: &Uuid, f: F) -> Option<R>
    where
        F: FnOnce(&mut Task) -> R,
    {
        self.tasks.write().await.get_mut(task_id).map(f)
    }
}

#[cfg(test)]
impl TaskStore {
    /// Register a prepared task; false if the id is already taken
    pub(crate) async fn insert(&self, task: Task) -> bool {
        let mut tasks = self.tasks.write().await;
        if tasks.contains_key(&task.task_id) {
            return false;
        }
        tasks.insert(task.task_id, task);
        true
    }

    pub(crate) async fn len(&self) -> usize {
        self.tasks.read().await.len()
    }
}
