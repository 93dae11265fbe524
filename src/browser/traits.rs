//! Traits and types for driving a browser session

use crate::error::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Options for one browser session
///
/// These are request-scoped: every task picks its own headless/proxy
/// combination on top of the shared [`crate::config::WebDriverConfig`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionOptions {
    /// Run the browser without a visible window
    pub headless: bool,

    /// Proxy `host:port` routed through HTTP, when set
    pub proxy: Option<String>,
}

/// Trait for creating browser sessions
///
/// The production implementation talks to a WebDriver endpoint; tests inject
/// scripted implementations so fetch behavior can be exercised without a
/// browser.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    /// Start a new browser session
    ///
    /// # Errors
    ///
    /// Returns an error if the driver cannot be reached or the session
    /// cannot be created with the requested options.
    async fn launch(&self, options: &SessionOptions) -> Result<Box<dyn Browser>>;
}

/// One live browser session
///
/// All methods take `&self`; a session is driven from a single task but the
/// underlying clients are cheap handles.
#[async_trait]
pub trait Browser: Send + Sync {
    /// Navigate the session to a URL
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Find the first element matching a CSS selector
    ///
    /// Returns `Ok(None)` when nothing matches; errors are reserved for
    /// session-level failures.
    async fn find(&self, selector: &str) -> Result<Option<Box<dyn Element>>>;

    /// Find all elements matching a CSS selector (empty when none match)
    async fn find_all(&self, selector: &str) -> Result<Vec<Box<dyn Element>>>;

    /// Scroll the page down by a pixel delta
    async fn scroll_by(&self, delta_y: i64) -> Result<()>;

    /// Wait until an element matching the selector is present and visible
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::FetchError::WaitTimeout`] when the element
    /// does not appear within `timeout`.
    async fn wait_visible(&self, selector: &str, timeout: Duration) -> Result<Box<dyn Element>>;

    /// Download a file into a directory, returning the written path
    ///
    /// The filename is derived from the URL's last path segment.
    async fn download_file(&self, url: &str, dest_dir: &Path) -> Result<PathBuf>;

    /// Close the session and release the browser
    async fn close(&self) -> Result<()>;
}

/// A handle to one element on the current page
#[async_trait]
pub trait Element: Send + Sync {
    /// Read an attribute value (`Ok(None)` when the attribute is absent)
    async fn attr(&self, name: &str) -> Result<Option<String>>;

    /// The element's visible text
    async fn text(&self) -> Result<String>;

    /// Click the element
    async fn click(&self) -> Result<()>;

    /// Find the first descendant matching a CSS selector
    async fn find(&self, selector: &str) -> Result<Option<Box<dyn Element>>>;

    /// Find all descendants matching a CSS selector
    async fn find_all(&self, selector: &str) -> Result<Vec<Box<dyn Element>>>;

    /// Number of direct child elements
    async fn child_count(&self) -> Result<usize>;
}
