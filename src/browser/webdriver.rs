//! WebDriver-backed browser sessions
//!
//! Talks to a chromedriver endpoint through [`fantoccini`]. The launcher can
//! optionally spawn and manage the chromedriver process itself; page images
//! are downloaded over plain HTTP with the session's user agent.

use super::traits::{Browser, BrowserLauncher, Element, SessionOptions};
use crate::config::{Config, FetchConfig, WebDriverConfig};
use crate::error::{FetchError, Result};
use async_trait::async_trait;
use fantoccini::elements::Element as WdElement;
use fantoccini::error::CmdError;
use fantoccini::{Client, ClientBuilder, Locator};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Child;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// How many connect attempts to make against a freshly spawned driver
const DRIVER_CONNECT_ATTEMPTS: usize = 20;

/// Delay between connect attempts
const DRIVER_CONNECT_DELAY: Duration = Duration::from_millis(250);

/// [`BrowserLauncher`] backed by a WebDriver endpoint
///
/// With `manage_driver` enabled the first launch spawns chromedriver
/// (killed again when the launcher is dropped); otherwise an endpoint is
/// expected to already be listening at the configured URL.
pub struct WebDriverLauncher {
    fetch: FetchConfig,
    webdriver: WebDriverConfig,
    driver: Mutex<Option<Child>>,
}

impl WebDriverLauncher {
    /// Create a launcher from the crate configuration
    pub fn new(config: &Config) -> Self {
        Self {
            fetch: config.fetch.clone(),
            webdriver: config.webdriver.clone(),
            driver: Mutex::new(None),
        }
    }

    /// Spawn chromedriver once if this launcher manages the driver process
    async fn ensure_driver(&self) -> Result<()> {
        if !self.webdriver.manage_driver {
            return Ok(());
        }

        let mut guard = self.driver.lock().await;
        if guard.is_some() {
            return Ok(());
        }

        let binary = self.discover_driver()?;
        let port = driver_port(&self.webdriver.url);
        info!(binary = %binary.display(), port, "starting chromedriver");

        let child = tokio::process::Command::new(&binary)
            .arg(format!("--port={port}"))
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                FetchError::Session(format!("failed to start {}: {e}", binary.display()))
            })?;

        *guard = Some(child);
        Ok(())
    }

    /// Locate the chromedriver binary (explicit path first, then PATH)
    fn discover_driver(&self) -> Result<PathBuf> {
        if let Some(path) = &self.webdriver.driver_path {
            return Ok(path.clone());
        }
        if self.webdriver.search_path
            && let Ok(path) = which::which("chromedriver")
        {
            return Ok(path);
        }
        Err(FetchError::Session(
            "chromedriver not found; set webdriver.driver_path or start an endpoint manually"
                .to_string(),
        )
        .into())
    }

    /// Build the Chrome capabilities for one session
    fn capabilities(&self, options: &SessionOptions) -> serde_json::map::Map<String, serde_json::Value> {
        let mut args: Vec<String> = vec![
            "--incognito".to_string(),
            format!("--user-agent={}", self.fetch.user_agent),
        ];
        args.extend(self.webdriver.chrome_args.iter().cloned());
        if options.headless {
            args.push("--headless=new".to_string());
        }
        if let Some(proxy) = &options.proxy {
            args.push(format!("--proxy-server=http://{proxy}"));
        }

        let mut caps = serde_json::map::Map::new();
        caps.insert(
            "goog:chromeOptions".to_string(),
            serde_json::json!({ "args": args }),
        );
        caps
    }
}

#[async_trait]
impl BrowserLauncher for WebDriverLauncher {
    async fn launch(&self, options: &SessionOptions) -> Result<Box<dyn Browser>> {
        self.ensure_driver().await?;

        let caps = self.capabilities(options);
        let attempts = if self.webdriver.manage_driver {
            DRIVER_CONNECT_ATTEMPTS
        } else {
            1
        };

        let mut last_error = None;
        for attempt in 1..=attempts {
            match ClientBuilder::native()
                .capabilities(caps.clone())
                .connect(&self.webdriver.url)
                .await
            {
                Ok(client) => {
                    debug!(url = %self.webdriver.url, attempt, "webdriver session created");
                    let http = reqwest::Client::builder()
                        .user_agent(self.fetch.user_agent.clone())
                        .timeout(self.fetch.download_timeout)
                        .build()?;
                    return Ok(Box::new(WebDriverSession {
                        client,
                        http,
                    }));
                }
                Err(e) => {
                    last_error = Some(e);
                    if attempt < attempts {
                        tokio::time::sleep(DRIVER_CONNECT_DELAY).await;
                    }
                }
            }
        }

        let reason = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "unknown error".to_string());
        Err(FetchError::Session(format!(
            "could not connect to {}: {reason}",
            self.webdriver.url
        ))
        .into())
    }
}

/// One live WebDriver session
struct WebDriverSession {
    client: Client,
    http: reqwest::Client,
}

#[async_trait]
impl Browser for WebDriverSession {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.client.goto(url).await.map_err(|e| {
            FetchError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            }
            .into()
        })
    }

    async fn find(&self, selector: &str) -> Result<Option<Box<dyn Element>>> {
        match self.client.find(Locator::Css(selector)).await {
            Ok(element) => Ok(Some(Box::new(WebDriverElement {
                client: self.client.clone(),
                element,
            }))),
            Err(CmdError::NoSuchElement(_)) => Ok(None),
            Err(e) => Err(FetchError::Interaction {
                action: format!("find {selector}"),
                reason: e.to_string(),
            }
            .into()),
        }
    }

    async fn find_all(&self, selector: &str) -> Result<Vec<Box<dyn Element>>> {
        let elements = self
            .client
            .find_all(Locator::Css(selector))
            .await
            .map_err(|e| FetchError::Interaction {
                action: format!("find {selector}"),
                reason: e.to_string(),
            })?;

        Ok(elements
            .into_iter()
            .map(|element| {
                Box::new(WebDriverElement {
                    client: self.client.clone(),
                    element,
                }) as Box<dyn Element>
            })
            .collect())
    }

    async fn scroll_by(&self, delta_y: i64) -> Result<()> {
        self.client
            .execute("window.scrollBy(0, arguments[0]);", vec![delta_y.into()])
            .await
            .map_err(|e| FetchError::Interaction {
                action: "scroll".to_string(),
                reason: e.to_string(),
            })?;
        Ok(())
    }

    async fn wait_visible(&self, selector: &str, timeout: Duration) -> Result<Box<dyn Element>> {
        match self
            .client
            .wait()
            .at_most(timeout)
            .for_element(Locator::Css(selector))
            .await
        {
            Ok(element) => Ok(Box::new(WebDriverElement {
                client: self.client.clone(),
                element,
            })),
            Err(CmdError::WaitTimeout) => Err(FetchError::WaitTimeout {
                selector: selector.to_string(),
                seconds: timeout.as_secs(),
            }
            .into()),
            Err(e) => Err(FetchError::Interaction {
                action: format!("wait for {selector}"),
                reason: e.to_string(),
            }
            .into()),
        }
    }

    async fn download_file(&self, url: &str, dest_dir: &Path) -> Result<PathBuf> {
        download_to(&self.http, url, dest_dir).await
    }

    async fn close(&self) -> Result<()> {
        self.client.clone().close().await.map_err(|e| {
            FetchError::Interaction {
                action: "close".to_string(),
                reason: e.to_string(),
            }
            .into()
        })
    }
}

/// A WebDriver element handle, carrying the client for script execution
struct WebDriverElement {
    client: Client,
    element: WdElement,
}

#[async_trait]
impl Element for WebDriverElement {
    async fn attr(&self, name: &str) -> Result<Option<String>> {
        self.element.attr(name).await.map_err(|e| {
            FetchError::Interaction {
                action: format!("read attribute {name}"),
                reason: e.to_string(),
            }
            .into()
        })
    }

    async fn text(&self) -> Result<String> {
        self.element.text().await.map_err(|e| {
            FetchError::Interaction {
                action: "read text".to_string(),
                reason: e.to_string(),
            }
            .into()
        })
    }

    async fn click(&self) -> Result<()> {
        self.element.clone().click().await.map(|_| ()).map_err(|e| {
            FetchError::Interaction {
                action: "click".to_string(),
                reason: e.to_string(),
            }
            .into()
        })
    }

    async fn find(&self, selector: &str) -> Result<Option<Box<dyn Element>>> {
        match self.element.find(Locator::Css(selector)).await {
            Ok(element) => Ok(Some(Box::new(WebDriverElement {
                client: self.client.clone(),
                element,
            }))),
            Err(CmdError::NoSuchElement(_)) => Ok(None),
            Err(e) => Err(FetchError::Interaction {
                action: format!("find {selector}"),
                reason: e.to_string(),
            }
            .into()),
        }
    }

    async fn find_all(&self, selector: &str) -> Result<Vec<Box<dyn Element>>> {
        let elements = self
            .element
            .find_all(Locator::Css(selector))
            .await
            .map_err(|e| FetchError::Interaction {
                action: format!("find {selector}"),
                reason: e.to_string(),
            })?;

        Ok(elements
            .into_iter()
            .map(|element| {
                Box::new(WebDriverElement {
                    client: self.client.clone(),
                    element,
                }) as Box<dyn Element>
            })
            .collect())
    }

    async fn child_count(&self) -> Result<usize> {
        let element = serde_json::to_value(&self.element)?;
        let value = self
            .client
            .execute("return arguments[0].children.length;", vec![element])
            .await
            .map_err(|e| FetchError::Interaction {
                action: "count children".to_string(),
                reason: e.to_string(),
            })?;
        Ok(value.as_u64().unwrap_or(0) as usize)
    }
}

/// Fetch one page image over plain HTTP into the chapter folder
///
/// The file is named after the last URL path segment. Non-2xx statuses are
/// download failures, the caller decides whether they fail the run.
async fn download_to(http: &reqwest::Client, url: &str, dest_dir: &Path) -> Result<PathBuf> {
    let download_error = |reason: String| FetchError::PageDownload {
        url: url.to_string(),
        reason,
    };

    let response = http
        .get(url)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| download_error(e.to_string()))?;
    let bytes = response
        .bytes()
        .await
        .map_err(|e| download_error(e.to_string()))?;

    let path = dest_dir.join(filename_from_url(url));
    tokio::fs::write(&path, &bytes)
        .await
        .map_err(|e| download_error(e.to_string()))?;

    Ok(path)
}

/// Derive a filename from the last non-empty path segment of a URL
///
/// Falls back to "page" when the URL has no usable segment, so a download
/// always lands somewhere predictable.
fn filename_from_url(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments().and_then(|segments| {
                segments
                    .filter(|s| !s.is_empty())
                    .next_back()
                    .map(str::to_string)
            })
        })
        .unwrap_or_else(|| "page".to_string())
}

/// Port of the WebDriver endpoint URL (9515 when unspecified)
fn driver_port(url: &str) -> u16 {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.port())
        .unwrap_or(9515)
}
