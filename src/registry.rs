//! In-memory task registry
//!
//! Holds one [`TaskInfo`] record per task for the lifetime of the process.
//! Records are never evicted, so completed and failed tasks stay queryable;
//! terminal statuses are never overwritten once written.

use crate::error::TaskError;
use crate::types::{TaskId, TaskInfo, TaskStatus};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

/// In-memory registry of all tasks started since process start
///
/// All operations are atomic with respect to concurrent access: reads take a
/// shared lock, writes an exclusive one, and id allocation is lock-free.
#[derive(Debug)]
pub struct TaskRegistry {
    tasks: RwLock<HashMap<TaskId, TaskInfo>>,
    next_id: AtomicU64,
}

impl TaskRegistry {
    /// Create an empty registry; the first allocated id is 1
    pub fn new() -> Self {
        Self {
            tasks: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Allocate the next task id
    ///
    /// Ids are monotonically increasing and never reused, even when the
    /// task they were allocated for fails to start.
    pub fn allocate_id(&self) -> TaskId {
        TaskId(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    /// Register a new task record
    pub async fn insert(&self, info: TaskInfo) -> Result<(), TaskError> {
        let mut tasks = self.tasks.write().await;
        if tasks.contains_key(&info.id) {
            return Err(TaskError::AlreadyExists { id: info.id.get() });
        }
        tasks.insert(info.id, info);
        Ok(())
    }

    /// Get a cloned snapshot of one task record
    pub async fn get(&self, id: TaskId) -> Option<TaskInfo> {
        self.tasks.read().await.get(&id).cloned()
    }

    /// Cloned snapshot of all task records
    pub async fn list(&self) -> HashMap<TaskId, TaskInfo> {
        self.tasks.read().await.clone()
    }

    /// Number of registered tasks
    pub async fn len(&self) -> usize {
        self.tasks.read().await.len()
    }

    /// Whether the registry has no records
    pub async fn is_empty(&self) -> bool {
        self.tasks.read().await.is_empty()
    }

    /// Apply a merge function to one record under the write lock
    pub async fn update<F>(&self, id: TaskId, f: F) -> Result<(), TaskError>
    where
        F: FnOnce(&mut TaskInfo),
    {
        let mut tasks = self.tasks.write().await;
        match tasks.get_mut(&id) {
            Some(info) => {
                f(info);
                Ok(())
            }
            None => Err(TaskError::NotFound { id: id.get() }),
        }
    }

    /// Set a task's status and message
    ///
    /// Refuses to overwrite a terminal status: once a task is stopped,
    /// completed, or failed its record is final.
    pub async fn set_status(
        &self,
        id: TaskId,
        status: TaskStatus,
        message: impl Into<String>,
    ) -> Result<(), TaskError> {
        let mut tasks = self.tasks.write().await;
        match tasks.get_mut(&id) {
            Some(info) => {
                if info.status.is_terminal() {
                    return Err(TaskError::InvalidState {
                        id: id.get(),
                        operation: "update".to_string(),
                        current_status: info.status.to_string(),
                    });
                }
                info.status = status;
                info.message = message.into();
                Ok(())
            }
            None => Err(TaskError::NotFound { id: id.get() }),
        }
    }

    /// Compare-and-set a task's status under one write lock
    ///
    /// The transition only happens when the current status equals `expected`,
    /// so two concurrent callers cannot both succeed. `operation` labels the
    /// attempted action in the `InvalidState` error.
    pub async fn transition(
        &self,
        id: TaskId,
        operation: &str,
        expected: TaskStatus,
        to: TaskStatus,
        message: impl Into<String>,
    ) -> Result<(), TaskError> {
        let mut tasks = self.tasks.write().await;
        match tasks.get_mut(&id) {
            Some(info) => {
                if info.status != expected {
                    return Err(TaskError::InvalidState {
                        id: id.get(),
                        operation: operation.to_string(),
                        current_status: info.status.to_string(),
                    });
                }
                info.status = to;
                info.message = message.into();
                Ok(())
            }
            None => Err(TaskError::NotFound { id: id.get() }),
        }
    }
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::new()
    }
}
