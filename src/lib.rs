//! # manga-dl
//!
//! Backend library for scraping manga chapters from reader sites and
//! packaging the downloaded pages into per-chapter PDFs.
//!
//! ## Design Philosophy
//!
//! manga-dl is designed to be:
//! - **Browser-driven** - Pages are fetched through a real browser session,
//!   so sites that render their chapter lists with JavaScript still work
//! - **Task-oriented** - Every download runs as a cancellable background
//!   task with an inspectable lifecycle
//! - **Library-first** - The REST API is optional; the crate embeds directly
//! - **Event-driven** - Consumers subscribe to events, no polling required
//!
//! ## Quick Start
//!
//! ```no_run
//! use manga_dl::{Config, JobRequest, MangaDownloader};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let downloader = MangaDownloader::new(Config::default()).await?;
//!
//!     // Subscribe to events
//!     let mut events = downloader.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let task_id = downloader
//!         .start_job(JobRequest::new("https://manga.example.com/comic/123/"))
//!         .await?;
//!     println!("Started task {task_id}");
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Browser automation seam and WebDriver implementation
pub mod browser;
/// Configuration types
pub mod config;
/// Image folder to PDF conversion
pub mod convert;
/// Error types
pub mod error;
/// Chapter discovery and page scraping
pub mod fetch;
/// Download manager (decomposed into focused submodules)
pub mod manager;
/// In-memory task registry
pub mod registry;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use browser::{Browser, BrowserLauncher, Element, SessionOptions, WebDriverLauncher};
pub use config::{Config, ConvertConfig, FetchConfig, IdleScrollConfig, WebDriverConfig};
pub use convert::ConversionEngine;
pub use error::{
    ApiError, ConvertError, Error, ErrorDetail, FetchError, Result, TaskError, ToHttpStatus,
};
pub use manager::MangaDownloader;
pub use registry::TaskRegistry;
pub use types::{
    Chapter, ConversionReport, Event, JobRequest, TaskId, TaskInfo, TaskStatus,
};

/// Helper function to run the downloader with graceful signal handling.
///
/// Waits for a termination signal and then calls the downloader's `shutdown()` method.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use manga_dl::{Config, MangaDownloader, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let downloader = MangaDownloader::new(Config::default()).await?;
///     let _api = downloader.spawn_api_server();
///
///     // Run with automatic signal handling
///     run_with_shutdown(downloader).await?;
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(downloader: MangaDownloader) -> Result<()> {
    wait_for_signal().await;
    downloader.shutdown().await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Set up signal handlers - these may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
