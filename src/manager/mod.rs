//! Core orchestrator split into focused submodules.
//!
//! The `MangaDownloader` struct and its methods are organized by domain:
//! - [`job`] - Job admission and the spawned job state machine
//! - [`control`] - Task control (stop, status, list, manual conversion)
//! - [`lifecycle`] - Shutdown coordination

mod control;
mod job;
mod lifecycle;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

use crate::browser::{BrowserLauncher, WebDriverLauncher};
use crate::config::Config;
use crate::convert::ConversionEngine;
use crate::error::{Error, Result};
use crate::registry::TaskRegistry;
use crate::types::{Event, TaskId};

/// Main downloader instance (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct MangaDownloader {
    /// Task registry for status tracking
    /// Public for integration tests to inspect task records
    pub registry: std::sync::Arc<TaskRegistry>,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: tokio::sync::broadcast::Sender<Event>,
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: std::sync::Arc<Config>,
    /// Session factory for fetch jobs (trait object for pluggable drivers)
    pub(crate) launcher: std::sync::Arc<dyn BrowserLauncher>,
    /// Folder-to-PDF conversion engine
    pub(crate) converter: std::sync::Arc<ConversionEngine>,
    /// Map of active jobs to their cancellation tokens (for stop operations)
    pub(crate) active_tasks: std::sync::Arc<
        tokio::sync::Mutex<
            std::collections::HashMap<TaskId, tokio_util::sync::CancellationToken>,
        >,
    >,
    /// Flag to indicate whether new jobs are accepted (set to false during shutdown)
    pub(crate) accepting_new: std::sync::Arc<std::sync::atomic::AtomicBool>,
}

impl MangaDownloader {
    /// Create a new MangaDownloader instance
    ///
    /// This initializes all core components:
    /// - Creates the work directory if absent
    /// - Sets up the event broadcast channel
    /// - Builds the task registry and conversion engine
    /// - Builds the WebDriver session launcher from the configuration
    pub async fn new(config: Config) -> Result<Self> {
        let launcher = std::sync::Arc::new(WebDriverLauncher::new(&config));
        Self::with_launcher(config, launcher).await
    }

    /// Create an instance over an injected session launcher
    ///
    /// Used by tests and demos to substitute a scripted driver; `new` routes
    /// through here with the production WebDriver launcher.
    pub async fn with_launcher(
        config: Config,
        launcher: std::sync::Arc<dyn BrowserLauncher>,
    ) -> Result<Self> {
        tokio::fs::create_dir_all(&config.work_dir)
            .await
            .map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create work directory '{}': {}",
                        config.work_dir.display(),
                        e
                    ),
                ))
            })?;

        // Broadcast channel with buffer size of 1000 events; multiple
        // subscribers receive all events independently
        let (event_tx, _rx) = tokio::sync::broadcast::channel(1000);

        let config = std::sync::Arc::new(config);
        let converter = std::sync::Arc::new(ConversionEngine::new(
            config.clone(),
            event_tx.clone(),
        ));

        Ok(Self {
            registry: std::sync::Arc::new(TaskRegistry::new()),
            event_tx,
            config,
            launcher,
            converter,
            active_tasks: std::sync::Arc::new(tokio::sync::Mutex::new(
                std::collections::HashMap::new(),
            )),
            accepting_new: std::sync::Arc::new(std::sync::atomic::AtomicBool::new(true)),
        })
    }

    /// Subscribe to task and conversion events
    ///
    /// Multiple subscribers are supported. Each subscriber receives all events
    /// independently. Events are buffered, but if a subscriber falls behind by
    /// more than 1000 events, it will receive a `RecvError::Lagged` error.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use manga_dl::{Config, MangaDownloader};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let downloader = MangaDownloader::new(Config::default()).await?;
    ///
    ///     let mut events = downloader.subscribe();
    ///     tokio::spawn(async move {
    ///         while let Ok(event) = events.recv().await {
    ///             println!("{event:?}");
    ///         }
    ///     });
    ///
    ///     Ok(())
    /// }
    /// ```
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Get the current configuration
    ///
    /// The configuration is wrapped in an Arc, so this is a cheap clone.
    pub fn get_config(&self) -> std::sync::Arc<Config> {
        std::sync::Arc::clone(&self.config)
    }

    /// Emit an event to all subscribers
    ///
    /// If there are no active subscribers, the event is silently dropped
    /// (ok() converts Err to None). Jobs keep running even when no one is
    /// listening to events.
    pub(crate) fn emit_event(&self, event: Event) {
        // send() returns Err if there are no receivers, which is fine - we just drop the event
        self.event_tx.send(event).ok();
    }

    /// Spawn the REST API server in a background task
    ///
    /// The server runs concurrently with fetch jobs and listens on the
    /// configured bind address (default: 127.0.0.1:5000).
    pub fn spawn_api_server(&self) -> tokio::task::JoinHandle<Result<()>> {
        let downloader = self.clone();
        let config = self.config.clone();

        tokio::spawn(async move { crate::api::start_api_server(downloader, config).await })
    }
}
