//! Chapter fetch choreography
//!
//! Drives one browser session through a manga catalog page: resolve the
//! title and chapter list, then walk every chapter page by page, downloading
//! the page images into the work directory. The flow is cancellation-aware:
//! a stop request is noticed at the points the flow naturally pauses, the
//! session is closed on the spot, and the task unwinds with
//! [`Error::Cancelled`].


use crate::browser::{Browser, Element};
use crate::config::Config;
use crate::error::{Error, FetchError, Result};
use crate::types::{Chapter, Event, TaskId};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Fetches every chapter of one manga through a browser session
///
/// Owns the session for the duration of one task. The caller closes the
/// session after `run` returns; a cancelled run closes it itself.
pub struct ChapterFetcher {
    browser: Box<dyn Browser>,
    config: Arc<Config>,
    token: CancellationToken,
    events: broadcast::Sender<Event>,
    task_id: TaskId,
}

impl ChapterFetcher {
    /// Create a fetcher over a live browser session
    pub fn new(
        browser: Box<dyn Browser>,
        config: Arc<Config>,
        token: CancellationToken,
        events: broadcast::Sender<Event>,
        task_id: TaskId,
    ) -> Self {
        Self {
            browser,
            config,
            token,
            events,
            task_id,
        }
    }

    /// Fetch all chapters reachable from a catalog page
    ///
    /// `element_selector` names the chapter list container on the catalog
    /// page; `chapter_index` picks which matching container to read when the
    /// page has several. Returns the resolved manga title, which is also the
    /// name of the directory the chapters were written under.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cancelled`] when a stop was requested, and fetch
    /// errors for navigation, missing elements, or an out-of-range index.
    /// Individual page download failures do not fail the run.
    pub async fn run(
        &self,
        url: &str,
        element_selector: &str,
        chapter_index: usize,
    ) -> Result<String> {
        self.checkpoint().await?;
        self.navigate_bounded(url).await?;

        // consent gate, clicked when the site interposes it
        if let Some(consent) = self.browser.find(&self.config.fetch.consent_selector).await? {
            debug!(task_id = self.task_id.0, "clicking consent checkbox");
            consent.click().await?;
        }

        self.idle_scroll().await?;
        self.checkpoint().await?;

        self.browser
            .wait_visible(element_selector, self.config.fetch.element_timeout)
            .await?;
        let containers = self.browser.find_all(element_selector).await?;
        let count = containers.len();
        let container =
            containers
                .into_iter()
                .nth(chapter_index)
                .ok_or_else(|| FetchError::IndexOutOfRange {
                    selector: element_selector.to_string(),
                    index: chapter_index,
                    count,
                })?;
        let links = container
            .find_all(&self.config.fetch.chapter_link_selector)
            .await?;

        let manga = self.resolve_title().await?;
        let chapters = self.collect_chapters(links).await?;
        info!(
            task_id = self.task_id.0,
            manga = %manga,
            chapters = chapters.len(),
            "resolved manga and chapter list"
        );
        self.events
            .send(Event::MangaResolved {
                id: self.task_id,
                manga: manga.clone(),
                chapters: chapters.len(),
            })
            .ok();

        for chapter in &chapters {
            self.checkpoint().await?;
            info!(task_id = self.task_id.0, chapter = %chapter.title, "fetching chapter");
            self.events
                .send(Event::ChapterStarted {
                    id: self.task_id,
                    chapter: chapter.title.clone(),
                })
                .ok();

            let pages = self.fetch_chapter(&manga, chapter).await?;

            info!(task_id = self.task_id.0, chapter = %chapter.title, pages, "chapter fetched");
            self.events
                .send(Event::ChapterFetched {
                    id: self.task_id,
                    chapter: chapter.title.clone(),
                    pages,
                })
                .ok();
        }

        Ok(manga)
    }

    /// Close the underlying browser session
    pub async fn close(&self) -> Result<()> {
        self.browser.close().await
    }

    /// Bail out if a stop was requested
    ///
    /// The browser is closed on the spot (best effort) so the window
    /// disappears as soon as the user stops the task, not when the job
    /// future unwinds.
    async fn checkpoint(&self) -> Result<()> {
        if self.token.is_cancelled() {
            info!(task_id = self.task_id.0, "stop requested, closing browser session");
            let _ = self.browser.close().await;
            return Err(Error::Cancelled);
        }
        Ok(())
    }

    /// Navigate with the configured time bound
    async fn navigate_bounded(&self, url: &str) -> Result<()> {
        let limit = self.config.fetch.navigation_timeout;
        match tokio::time::timeout(limit, self.browser.navigate(url)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Navigation {
                url: url.to_string(),
                reason: format!("timed out after {}s", limit.as_secs()),
            }
            .into()),
        }
    }

    /// Scroll down a little, like a reader would, between page loads
    async fn idle_scroll(&self) -> Result<()> {
        let idle = self.config.fetch.idle;
        let moves = rand::thread_rng().gen_range(idle.moves_min..=idle.moves_max);
        for _ in 0..moves {
            self.checkpoint().await?;
            let wait_ms = rand::thread_rng().gen_range(idle.wait_min_ms..=idle.wait_max_ms);
            tokio::time::sleep(Duration::from_millis(wait_ms)).await;
            let delta = rand::thread_rng().gen_range(idle.scroll_min_px..=idle.scroll_max_px);
            self.browser.scroll_by(delta).await?;
        }
        Ok(())
    }

    /// Manga title: the first h1 inside the configured title block
    async fn resolve_title(&self) -> Result<String> {
        let selector = &self.config.fetch.title_selector;
        let block = self
            .browser
            .find(selector)
            .await?
            .ok_or_else(|| FetchError::ElementNotFound {
                selector: selector.clone(),
            })?;
        let heading = block
            .find("h1")
            .await?
            .ok_or_else(|| FetchError::ElementNotFound {
                selector: format!("{selector} h1"),
            })?;

        let title = heading.text().await?.trim().to_string();
        if title.is_empty() {
            return Err(FetchError::ElementNotFound {
                selector: format!("{selector} h1"),
            }
            .into());
        }
        Ok(sanitize_component(&title))
    }

    /// Read title/href off every anchor into an insertion-ordered list
    ///
    /// Anchors without both attributes are skipped. A repeated title keeps
    /// its original position in the list but its link is replaced, so the
    /// newest link for a chapter wins.
    async fn collect_chapters(&self, links: Vec<Box<dyn Element>>) -> Result<Vec<Chapter>> {
        let mut chapters: Vec<Chapter> = Vec::new();
        for link in links {
            self.checkpoint().await?;
            let Some(title) = link.attr("title").await? else {
                continue;
            };
            let Some(href) = link.attr("href").await? else {
                continue;
            };
            match chapters.iter_mut().find(|c| c.title == title) {
                Some(existing) => existing.url = href,
                None => chapters.push(Chapter { title, url: href }),
            }
        }
        Ok(chapters)
    }

    /// Fetch one chapter: count its pages, then download them in order
    async fn fetch_chapter(&self, manga: &str, chapter: &Chapter) -> Result<usize> {
        self.checkpoint().await?;
        self.navigate_bounded(&chapter.url).await?;

        let fetch = &self.config.fetch;
        self.browser
            .wait_visible(&fetch.page_image_selector, fetch.element_timeout)
            .await?;
        let select = self
            .browser
            .find(&fetch.page_select_selector)
            .await?
            .ok_or_else(|| FetchError::ElementNotFound {
                selector: fetch.page_select_selector.clone(),
            })?;
        let total = select.child_count().await?;

        let folder = self
            .config
            .work_dir
            .join(manga)
            .join(format!("{manga} - {}", sanitize_component(&chapter.title)));
        tokio::fs::create_dir_all(&folder).await?;
        debug!(
            task_id = self.task_id.0,
            folder = %folder.display(),
            pages = total,
            "created chapter folder"
        );

        for page in 1..=total {
            self.checkpoint().await?;
            self.idle_scroll().await?;

            let image = self
                .browser
                .wait_visible(&fetch.page_image_selector, fetch.element_timeout)
                .await?;
            match image.attr("src").await? {
                Some(src) => {
                    debug!(task_id = self.task_id.0, page, total, url = %src, "downloading page");
                    if let Err(e) = self.browser.download_file(&src, &folder).await {
                        warn!(
                            task_id = self.task_id.0,
                            page,
                            url = %src,
                            error = %e,
                            "page download failed, skipping"
                        );
                        self.events
                            .send(Event::PageFailed {
                                id: self.task_id,
                                url: src,
                                error: e.to_string(),
                            })
                            .ok();
                    }
                }
                None => {
                    warn!(
                        task_id = self.task_id.0,
                        page, "page image has no src attribute, skipping"
                    );
                    self.events
                        .send(Event::PageFailed {
                            id: self.task_id,
                            url: chapter.url.clone(),
                            error: "page image has no src attribute".to_string(),
                        })
                        .ok();
                }
            }

            self.checkpoint().await?;
            if let Some(next) = self.browser.find(&fetch.next_page_selector).await? {
                next.click().await?;
            }
        }

        Ok(total)
    }
}

/// Make a scraped title safe to use as a single path component
///
/// Titles come straight off the page, so path separators and NULs are
/// replaced before the name touches the filesystem.
fn sanitize_component(name: &str) -> String {
    name.replace(['/', '\\', '\0'], "_")
}
