//! Shutdown coordination.

use crate::error::Result;
use crate::types::Event;

use super::MangaDownloader;

impl MangaDownloader {
    /// Gracefully shut down the downloader
    ///
    /// This method performs a graceful shutdown sequence:
    /// 1. Stops accepting new jobs and manual conversions
    /// 2. Signals every active job's cancellation token
    /// 3. Waits for active jobs to unwind with a timeout (30 seconds)
    /// 4. Emits the shutdown event
    ///
    /// Jobs notice the signal at their next checkpoint and write their own
    /// `stopped` status; the registry keeps every record queryable after
    /// shutdown.
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("Initiating graceful shutdown");

        // 1. Stop accepting new jobs
        self.accepting_new
            .store(false, std::sync::atomic::Ordering::SeqCst);
        tracing::info!("Stopped accepting new jobs");

        // 2. Signal every active job
        self.cancel_all_jobs().await;

        // 3. Wait for active jobs to unwind with timeout
        let shutdown_timeout = std::time::Duration::from_secs(30);
        let wait_result =
            tokio::time::timeout(shutdown_timeout, self.wait_for_active_jobs()).await;

        match wait_result {
            Ok(()) => {
                tracing::info!("All active jobs unwound gracefully");
            }
            Err(_) => {
                tracing::warn!("Timeout waiting for jobs to unwind, proceeding with shutdown");
            }
        }

        // 4. Emit shutdown event
        self.emit_event(Event::Shutdown);

        tracing::info!("Graceful shutdown complete");
        Ok(())
    }

    /// Signal cancellation to every active job
    pub(crate) async fn cancel_all_jobs(&self) {
        let active = self.active_tasks.lock().await;
        tracing::debug!(active_count = active.len(), "Cancelling all active jobs");

        for (id, token) in active.iter() {
            tracing::debug!(task_id = id.0, "Signaling stop");
            token.cancel();
        }
    }

    /// Wait for every active job to remove its token association
    async fn wait_for_active_jobs(&self) {
        loop {
            let active_count = {
                let active = self.active_tasks.lock().await;
                active.len()
            };

            if active_count == 0 {
                return;
            }

            tracing::debug!(active_count, "Waiting for active jobs to unwind");
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        }
    }
}
