//! Browser session abstraction
//!
//! This module provides a trait-based architecture for driving the browser a
//! fetch task runs in. The fetch choreography only ever talks to the
//! [`Browser`], [`Element`], and [`BrowserLauncher`] traits, so the WebDriver
//! plumbing stays in one place and tests can substitute scripted sessions.
//!
//! ## Architecture
//!
//! - [`BrowserLauncher`]: creates sessions; one per task, with per-task
//!   headless/proxy options
//! - [`Browser`]: one live session (navigation, element queries, downloads)
//! - [`Element`]: a handle to one element on the current page
//!
//! The production implementation is [`WebDriverLauncher`], which talks to a
//! chromedriver endpoint through [`fantoccini`] and can optionally spawn the
//! driver process itself.

mod traits;
mod webdriver;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod testing;

pub use traits::{Browser, BrowserLauncher, Element, SessionOptions};
pub use webdriver::WebDriverLauncher;
