//! Scripted browser fakes for exercising fetch behavior without a driver
//!
//! [`FakeSite`] models a tiny site as url -> page -> selector -> elements.
//! Sessions built from it implement the [`Browser`] traits and record every
//! interaction into a shared [`SiteState`] log that tests assert against.

use super::traits::{Browser, BrowserLauncher, Element, SessionOptions};
use crate::error::{FetchError, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Shared interaction log for one scripted site
#[derive(Default)]
pub(crate) struct SiteState {
    pub(crate) navigations: Mutex<Vec<String>>,
    pub(crate) scrolls: Mutex<Vec<i64>>,
    pub(crate) clicks: Mutex<Vec<String>>,
    pub(crate) downloads: Mutex<Vec<String>>,
    pub(crate) launches: Mutex<Vec<SessionOptions>>,
    pub(crate) closed: AtomicBool,
}

impl SiteState {
    pub(crate) fn navigated(&self) -> Vec<String> {
        self.navigations.lock().unwrap().clone()
    }

    pub(crate) fn clicked(&self) -> Vec<String> {
        self.clicks.lock().unwrap().clone()
    }

    pub(crate) fn downloaded(&self) -> Vec<String> {
        self.downloads.lock().unwrap().clone()
    }

    pub(crate) fn launched(&self) -> Vec<SessionOptions> {
        self.launches.lock().unwrap().clone()
    }

    pub(crate) fn scroll_count(&self) -> usize {
        self.scrolls.lock().unwrap().len()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// One scripted element, built with the `with_*` chain
#[derive(Clone, Default)]
pub(crate) struct FakeElement {
    label: String,
    attrs: HashMap<String, String>,
    text: String,
    children: HashMap<String, Vec<FakeElement>>,
    child_count: usize,
    state: Option<Arc<SiteState>>,
}

impl FakeElement {
    pub(crate) fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            ..Default::default()
        }
    }

    pub(crate) fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.insert(name.to_string(), value.to_string());
        self
    }

    pub(crate) fn with_text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub(crate) fn with_child(mut self, selector: &str, child: FakeElement) -> Self {
        self.children.entry(selector.to_string()).or_default().push(child);
        self
    }

    pub(crate) fn with_child_count(mut self, count: usize) -> Self {
        self.child_count = count;
        self
    }

    fn attach(&mut self, state: &Arc<SiteState>) {
        self.state = Some(state.clone());
        for children in self.children.values_mut() {
            for child in children.iter_mut() {
                child.attach(state);
            }
        }
    }
}

#[async_trait]
impl Element for FakeElement {
    async fn attr(&self, name: &str) -> Result<Option<String>> {
        Ok(self.attrs.get(name).cloned())
    }

    async fn text(&self) -> Result<String> {
        Ok(self.text.clone())
    }

    async fn click(&self) -> Result<()> {
        if let Some(state) = &self.state {
            state.clicks.lock().unwrap().push(self.label.clone());
        }
        Ok(())
    }

    async fn find(&self, selector: &str) -> Result<Option<Box<dyn Element>>> {
        Ok(self
            .children
            .get(selector)
            .and_then(|children| children.first())
            .cloned()
            .map(|child| Box::new(child) as Box<dyn Element>))
    }

    async fn find_all(&self, selector: &str) -> Result<Vec<Box<dyn Element>>> {
        Ok(self
            .children
            .get(selector)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .map(|child| Box::new(child) as Box<dyn Element>)
            .collect())
    }

    async fn child_count(&self) -> Result<usize> {
        Ok(self.child_count)
    }
}

/// One scripted page: selector -> matching elements
#[derive(Clone, Default)]
pub(crate) struct FakePage {
    elements: HashMap<String, Vec<FakeElement>>,
}

impl FakePage {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_element(mut self, selector: &str, element: FakeElement) -> Self {
        self.elements
            .entry(selector.to_string())
            .or_default()
            .push(element);
        self
    }
}

/// A catalog page with a chapter list container and a title block
pub(crate) fn catalog_page(manga: &str, chapters: &[(&str, &str)]) -> FakePage {
    let mut list = FakeElement::new("#chapter-list-0");
    for (title, href) in chapters {
        list = list.with_child(
            "a",
            FakeElement::new("a")
                .with_attr("title", title)
                .with_attr("href", href),
        );
    }

    let title_block =
        FakeElement::new(".book-title").with_child("h1", FakeElement::new("h1").with_text(manga));

    FakePage::new()
        .with_element("#chapter-list-0", list)
        .with_element(".book-title", title_block)
}

/// A chapter page with a page image, a page dropdown, and a next button
pub(crate) fn chapter_page(img_src: &str, pages: usize) -> FakePage {
    FakePage::new()
        .with_element(
            "#mangaFile",
            FakeElement::new("#mangaFile").with_attr("src", img_src),
        )
        .with_element(
            "#pageSelect",
            FakeElement::new("#pageSelect").with_child_count(pages),
        )
        .with_element("#next", FakeElement::new("#next"))
}

/// Scripted site builder
pub(crate) struct FakeSite {
    state: Arc<SiteState>,
    pages: HashMap<String, FakePage>,
    navigate_delay: Duration,
    fail_navigation: Option<String>,
    failing_downloads: HashSet<String>,
    download_bytes: Vec<u8>,
    fail_launch: Option<String>,
}

impl FakeSite {
    pub(crate) fn new() -> Self {
        Self {
            state: Arc::new(SiteState::default()),
            pages: HashMap::new(),
            navigate_delay: Duration::ZERO,
            fail_navigation: None,
            failing_downloads: HashSet::new(),
            download_bytes: b"fake page image".to_vec(),
            fail_launch: None,
        }
    }

    pub(crate) fn state(&self) -> Arc<SiteState> {
        self.state.clone()
    }

    pub(crate) fn with_page(mut self, url: &str, mut page: FakePage) -> Self {
        for elements in page.elements.values_mut() {
            for element in elements.iter_mut() {
                element.attach(&self.state);
            }
        }
        self.pages.insert(url.to_string(), page);
        self
    }

    /// Every navigation waits this long before resolving
    pub(crate) fn with_navigate_delay(mut self, delay: Duration) -> Self {
        self.navigate_delay = delay;
        self
    }

    /// Every navigation fails with this reason
    pub(crate) fn with_failing_navigation(mut self, reason: &str) -> Self {
        self.fail_navigation = Some(reason.to_string());
        self
    }

    /// Downloads of this URL fail
    pub(crate) fn with_failing_download(mut self, url: &str) -> Self {
        self.failing_downloads.insert(url.to_string());
        self
    }

    /// Bytes written for every successful download
    pub(crate) fn with_download_bytes(mut self, bytes: Vec<u8>) -> Self {
        self.download_bytes = bytes;
        self
    }

    /// Session creation fails with this reason
    pub(crate) fn with_failing_launch(mut self, reason: &str) -> Self {
        self.fail_launch = Some(reason.to_string());
        self
    }

    /// Build one session directly (for driving a fetcher without a launcher)
    pub(crate) fn browser(&self) -> FakeBrowser {
        FakeBrowser {
            pages: self.pages.clone(),
            current: Mutex::new(None),
            state: self.state.clone(),
            navigate_delay: self.navigate_delay,
            fail_navigation: self.fail_navigation.clone(),
            failing_downloads: self.failing_downloads.clone(),
            download_bytes: self.download_bytes.clone(),
        }
    }

    /// Consume the site into an injectable launcher
    pub(crate) fn launcher(self) -> Arc<FakeLauncher> {
        Arc::new(FakeLauncher { site: self })
    }
}

/// [`BrowserLauncher`] handing out sessions over one scripted site
pub(crate) struct FakeLauncher {
    site: FakeSite,
}

#[async_trait]
impl BrowserLauncher for FakeLauncher {
    async fn launch(&self, options: &SessionOptions) -> Result<Box<dyn Browser>> {
        self.site
            .state
            .launches
            .lock()
            .unwrap()
            .push(options.clone());
        if let Some(reason) = &self.site.fail_launch {
            return Err(FetchError::Session(reason.clone()).into());
        }
        Ok(Box::new(self.site.browser()))
    }
}

/// One scripted session
pub(crate) struct FakeBrowser {
    pages: HashMap<String, FakePage>,
    current: Mutex<Option<String>>,
    state: Arc<SiteState>,
    navigate_delay: Duration,
    fail_navigation: Option<String>,
    failing_downloads: HashSet<String>,
    download_bytes: Vec<u8>,
}

impl FakeBrowser {
    fn current_elements(&self, selector: &str) -> Result<Vec<FakeElement>> {
        let current = self.current.lock().unwrap().clone();
        let url = current.ok_or_else(|| FetchError::Interaction {
            action: format!("find {selector}"),
            reason: "no page loaded".to_string(),
        })?;
        let page = self.pages.get(&url).ok_or_else(|| FetchError::Interaction {
            action: format!("find {selector}"),
            reason: format!("unknown page {url}"),
        })?;
        Ok(page.elements.get(selector).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl Browser for FakeBrowser {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.state.navigations.lock().unwrap().push(url.to_string());
        if !self.navigate_delay.is_zero() {
            tokio::time::sleep(self.navigate_delay).await;
        }
        if let Some(reason) = &self.fail_navigation {
            return Err(FetchError::Navigation {
                url: url.to_string(),
                reason: reason.clone(),
            }
            .into());
        }
        if !self.pages.contains_key(url) {
            return Err(FetchError::Navigation {
                url: url.to_string(),
                reason: "no such page".to_string(),
            }
            .into());
        }
        *self.current.lock().unwrap() = Some(url.to_string());
        Ok(())
    }

    async fn find(&self, selector: &str) -> Result<Option<Box<dyn Element>>> {
        Ok(self
            .current_elements(selector)?
            .into_iter()
            .next()
            .map(|element| Box::new(element) as Box<dyn Element>))
    }

    async fn find_all(&self, selector: &str) -> Result<Vec<Box<dyn Element>>> {
        Ok(self
            .current_elements(selector)?
            .into_iter()
            .map(|element| Box::new(element) as Box<dyn Element>)
            .collect())
    }

    async fn scroll_by(&self, delta_y: i64) -> Result<()> {
        self.state.scrolls.lock().unwrap().push(delta_y);
        Ok(())
    }

    async fn wait_visible(&self, selector: &str, timeout: Duration) -> Result<Box<dyn Element>> {
        match self.find(selector).await? {
            Some(element) => Ok(element),
            None => Err(FetchError::WaitTimeout {
                selector: selector.to_string(),
                seconds: timeout.as_secs(),
            }
            .into()),
        }
    }

    async fn download_file(&self, url: &str, dest_dir: &Path) -> Result<PathBuf> {
        self.state.downloads.lock().unwrap().push(url.to_string());
        if self.failing_downloads.contains(url) {
            return Err(FetchError::PageDownload {
                url: url.to_string(),
                reason: "scripted failure".to_string(),
            }
            .into());
        }
        let name = url
            .rsplit('/')
            .find(|s| !s.is_empty())
            .unwrap_or("page")
            .to_string();
        let path = dest_dir.join(name);
        tokio::fs::write(&path, &self.download_bytes).await?;
        Ok(path)
    }

    async fn close(&self) -> Result<()> {
        self.state.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
