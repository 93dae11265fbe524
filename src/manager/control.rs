//! Task control — stop, status, list, manual conversion.

use crate::error::{Error, Result, TaskError};
use crate::types::{ConversionReport, TaskId, TaskInfo, TaskStatus};
use std::collections::HashMap;

use super::MangaDownloader;

impl MangaDownloader {
    /// Request a running task to stop
    ///
    /// The record transitions `running -> stopping` and the task's
    /// cancellation token is signalled. The job notices at its next
    /// checkpoint, closes the browser session, and writes the final
    /// `stopped` status itself.
    ///
    /// # Errors
    ///
    /// `TaskError::NotFound` for an unknown id; `TaskError::InvalidState`
    /// when the task is not running (including a second stop of the same
    /// task).
    pub async fn stop(&self, id: TaskId) -> Result<()> {
        // Compare-and-set so two concurrent stops cannot both succeed
        self.registry
            .transition(
                id,
                "stop",
                TaskStatus::Running,
                TaskStatus::Stopping,
                "stop signal sent",
            )
            .await?;

        // cancel() is idempotent; the job future removes the entry itself
        if let Some(token) = self.active_tasks.lock().await.get(&id) {
            token.cancel();
        }

        tracing::info!(task_id = id.0, "stop signal sent");
        Ok(())
    }

    /// Get a snapshot of one task's record
    pub async fn status(&self, id: TaskId) -> Result<TaskInfo> {
        self.registry
            .get(id)
            .await
            .ok_or_else(|| Error::Task(TaskError::NotFound { id: id.get() }))
    }

    /// Snapshot of every task started since process start
    pub async fn list(&self) -> HashMap<TaskId, TaskInfo> {
        self.registry.list().await
    }

    /// Convert a manga's chapter folders to PDFs right now
    ///
    /// Runs the conversion engine synchronously; scheduling errors (missing
    /// or unreadable manga directory) propagate to the caller, per-folder
    /// failures are absorbed into the report.
    ///
    /// # Errors
    ///
    /// `ShuttingDown` when shutdown has begun, otherwise conversion
    /// scheduling errors.
    pub async fn convert(&self, manga_name: &str) -> Result<ConversionReport> {
        if !self
            .accepting_new
            .load(std::sync::atomic::Ordering::SeqCst)
        {
            return Err(Error::ShuttingDown);
        }
        self.converter.convert_manga(manga_name).await
    }
}
