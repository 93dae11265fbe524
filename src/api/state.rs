//! Application state for the API server

use crate::{Config, MangaDownloader};
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// This struct is cloned for each request (cheap Arc clones all the way
/// down) and provides access to the downloader instance and configuration.
#[derive(Clone)]
pub struct AppState {
    /// The main MangaDownloader instance
    pub downloader: MangaDownloader,

    /// Configuration (read access for handlers)
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(downloader: MangaDownloader, config: Arc<Config>) -> Self {
        Self { downloader, config }
    }
}
