//! Job admission and the spawned job state machine.

use crate::browser::SessionOptions;
use crate::error::{Error, Result};
use crate::fetch::ChapterFetcher;
use crate::types::{Event, JobRequest, TaskId, TaskInfo, TaskStatus};
use chrono::Utc;
use tokio_util::sync::CancellationToken;

use super::MangaDownloader;

impl MangaDownloader {
    /// Start a fetch job and return its task id immediately
    ///
    /// The record is inserted and the cancellation token registered before the
    /// job future is spawned, so a status query for the returned id always
    /// finds a `running` record.
    ///
    /// # Errors
    ///
    /// Returns `ShuttingDown` when shutdown has begun and `Config` when the
    /// URL is empty or not parseable.
    pub async fn start_job(&self, request: JobRequest) -> Result<TaskId> {
        if !self
            .accepting_new
            .load(std::sync::atomic::Ordering::SeqCst)
        {
            return Err(Error::ShuttingDown);
        }

        if request.url.trim().is_empty() {
            return Err(Error::Config {
                message: "url must not be empty".to_string(),
                key: Some("url".to_string()),
            });
        }
        url::Url::parse(&request.url).map_err(|e| Error::Config {
            message: format!("invalid url '{}': {}", request.url, e),
            key: Some("url".to_string()),
        })?;

        let id = self.registry.allocate_id();
        self.registry
            .insert(TaskInfo {
                id,
                status: TaskStatus::Running,
                message: "downloading...".to_string(),
                url: request.url.clone(),
                element_selector: request.element_selector.clone(),
                chapter_index: request.chapter_index,
                auto_convert: request.auto_convert,
                created_at: Utc::now(),
            })
            .await?;

        let token = CancellationToken::new();
        self.active_tasks.lock().await.insert(id, token.clone());

        tracing::info!(task_id = id.0, url = %request.url, "starting download task");
        self.emit_event(Event::TaskStarted {
            id,
            url: request.url.clone(),
        });

        let downloader = self.clone();
        tokio::spawn(async move {
            downloader.run_job(id, request, token).await;
        });

        Ok(id)
    }

    /// Drive one job to its single terminal status
    ///
    /// Every exit path writes the terminal status exactly once and removes
    /// the token association as the final act.
    async fn run_job(&self, id: TaskId, request: JobRequest, token: CancellationToken) {
        let fetch_result = self.run_fetch(id, &request, &token).await;

        let (status, message, event) = match fetch_result {
            // Cancellation wins over any error raised by the same stage
            Err(e) if token.is_cancelled() || matches!(e, Error::Cancelled) => (
                TaskStatus::Stopped,
                Error::Cancelled.to_string(),
                Event::TaskStopped { id },
            ),
            Err(e) => {
                tracing::error!(task_id = id.0, error = %e, "download task failed");
                (
                    TaskStatus::Failed,
                    format!("download failed: {e}"),
                    Event::TaskFailed {
                        id,
                        error: e.to_string(),
                    },
                )
            }
            // A stop that landed after the last checkpoint still wins
            Ok(_) if token.is_cancelled() => (
                TaskStatus::Stopped,
                Error::Cancelled.to_string(),
                Event::TaskStopped { id },
            ),
            Ok(manga) if request.auto_convert => self.convert_stage(id, &manga).await,
            Ok(_) => (
                TaskStatus::Completed,
                "download complete".to_string(),
                Event::TaskCompleted { id, warning: None },
            ),
        };

        tracing::info!(task_id = id.0, status = %status, "task finished");
        if let Err(e) = self.registry.set_status(id, status, message).await {
            tracing::error!(task_id = id.0, error = %e, "failed to write terminal status");
        }
        self.emit_event(event);

        // Token association released on every exit path
        self.active_tasks.lock().await.remove(&id);
    }

    /// Fetch stage: one browser session for the lifetime of the job
    async fn run_fetch(
        &self,
        id: TaskId,
        request: &JobRequest,
        token: &CancellationToken,
    ) -> Result<String> {
        let options = SessionOptions {
            headless: request.headless,
            proxy: request.proxy.clone(),
        };
        let browser = self.launcher.launch(&options).await?;
        let fetcher = ChapterFetcher::new(
            browser,
            self.config.clone(),
            token.clone(),
            self.event_tx.clone(),
            id,
        );

        let result = fetcher
            .run(&request.url, &request.element_selector, request.chapter_index)
            .await;

        // A cancelled run already closed its session at the checkpoint
        if !matches!(result, Err(Error::Cancelled))
            && let Err(e) = fetcher.close().await
        {
            tracing::warn!(task_id = id.0, error = %e, "failed to close browser session");
        }

        result
    }

    /// Conversion stage of an auto-convert job
    ///
    /// The fetch already succeeded, so conversion problems downgrade the
    /// result to `completed_with_warning` instead of failing the task.
    async fn convert_stage(&self, id: TaskId, manga: &str) -> (TaskStatus, String, Event) {
        if let Err(e) = self
            .registry
            .update(id, |info| {
                info.message = format!("converting '{manga}' to PDF...");
            })
            .await
        {
            tracing::error!(task_id = id.0, error = %e, "failed to update task message");
        }

        match self.converter.convert_manga(manga).await {
            Ok(report) if report.failed == 0 => (
                TaskStatus::Completed,
                "download and conversion complete".to_string(),
                Event::TaskCompleted { id, warning: None },
            ),
            Ok(report) => {
                let warning = format!(
                    "{} of {} folders failed to convert",
                    report.failed, report.folders_found
                );
                (
                    TaskStatus::CompletedWithWarning,
                    format!("download complete, but conversion failed: {warning}"),
                    Event::TaskCompleted {
                        id,
                        warning: Some(warning),
                    },
                )
            }
            Err(e) => {
                tracing::warn!(task_id = id.0, error = %e, "conversion after fetch failed");
                (
                    TaskStatus::CompletedWithWarning,
                    format!("download complete, but conversion failed: {e}"),
                    Event::TaskCompleted {
                        id,
                        warning: Some(e.to_string()),
                    },
                )
            }
        }
    }
}
