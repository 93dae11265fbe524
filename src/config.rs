//! Configuration types for manga-dl

use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf, time::Duration};
use utoipa::ToSchema;

/// Fetch behavior configuration (timeouts, selectors, idle scrolling)
///
/// Groups settings related to how catalog and chapter pages are driven.
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct FetchConfig {
    /// Maximum time to wait for a page navigation (default: 10s)
    #[serde(default = "default_navigation_timeout", with = "duration_serde")]
    pub navigation_timeout: Duration,

    /// Maximum time to wait for an element to become visible (default: 30s)
    #[serde(default = "default_element_timeout", with = "duration_serde")]
    pub element_timeout: Duration,

    /// Maximum time for a single page image download (default: 120s)
    #[serde(default = "default_download_timeout", with = "duration_serde")]
    pub download_timeout: Duration,

    /// User agent sent by the browser session
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Selector for the adult-content consent checkbox, clicked when present
    #[serde(default = "default_consent_selector")]
    pub consent_selector: String,

    /// Selector for the element holding the manga title (title is its first h1)
    #[serde(default = "default_title_selector")]
    pub title_selector: String,

    /// Selector for chapter links inside the chapter list container
    #[serde(default = "default_chapter_link_selector")]
    pub chapter_link_selector: String,

    /// Selector for the page image on a chapter page
    #[serde(default = "default_page_image_selector")]
    pub page_image_selector: String,

    /// Selector for the page dropdown used to count pages
    #[serde(default = "default_page_select_selector")]
    pub page_select_selector: String,

    /// Selector for the next-page control, clicked when present
    #[serde(default = "default_next_page_selector")]
    pub next_page_selector: String,

    /// Idle scrolling performed between page loads to mimic a reader
    #[serde(default)]
    pub idle: IdleScrollConfig,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            navigation_timeout: default_navigation_timeout(),
            element_timeout: default_element_timeout(),
            download_timeout: default_download_timeout(),
            user_agent: default_user_agent(),
            consent_selector: default_consent_selector(),
            title_selector: default_title_selector(),
            chapter_link_selector: default_chapter_link_selector(),
            page_image_selector: default_page_image_selector(),
            page_select_selector: default_page_select_selector(),
            next_page_selector: default_next_page_selector(),
            idle: IdleScrollConfig::default(),
        }
    }
}

/// Idle scrolling parameters
///
/// Each idle pass performs between `moves_min` and `moves_max` scroll moves;
/// every move waits a random interval and scrolls down a random distance.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, ToSchema)]
pub struct IdleScrollConfig {
    /// Minimum scroll moves per pass (default: 1)
    #[serde(default = "default_moves_min")]
    pub moves_min: u32,

    /// Maximum scroll moves per pass (default: 2)
    #[serde(default = "default_moves_max")]
    pub moves_max: u32,

    /// Minimum wait before each move in milliseconds (default: 1000)
    #[serde(default = "default_wait_min_ms")]
    pub wait_min_ms: u64,

    /// Maximum wait before each move in milliseconds (default: 2000)
    #[serde(default = "default_wait_max_ms")]
    pub wait_max_ms: u64,

    /// Minimum scroll distance per move in pixels (default: 100)
    #[serde(default = "default_scroll_min_px")]
    pub scroll_min_px: i64,

    /// Maximum scroll distance per move in pixels (default: 800)
    #[serde(default = "default_scroll_max_px")]
    pub scroll_max_px: i64,
}

impl Default for IdleScrollConfig {
    fn default() -> Self {
        Self {
            moves_min: default_moves_min(),
            moves_max: default_moves_max(),
            wait_min_ms: default_wait_min_ms(),
            wait_max_ms: default_wait_max_ms(),
            scroll_min_px: default_scroll_min_px(),
            scroll_max_px: default_scroll_max_px(),
        }
    }
}

/// PDF conversion configuration
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ConvertConfig {
    /// Maximum chapter folders converted concurrently (default: 4, must be >= 1)
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// Page image extension to collect, matched case-insensitively (default: "webp")
    #[serde(default = "default_image_ext")]
    pub image_ext: String,

    /// DPI used to size PDF pages from image pixel dimensions (default: 96.0)
    #[serde(default = "default_pdf_dpi")]
    pub pdf_dpi: f32,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            image_ext: default_image_ext(),
            pdf_dpi: default_pdf_dpi(),
        }
    }
}

/// WebDriver endpoint and driver process configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct WebDriverConfig {
    /// WebDriver endpoint URL (default: "http://localhost:9515")
    #[serde(default = "default_webdriver_url")]
    pub url: String,

    /// Path to the chromedriver executable (auto-detected if None)
    #[serde(default)]
    pub driver_path: Option<PathBuf>,

    /// Whether to search PATH for chromedriver if no explicit path is set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,

    /// Spawn and manage a chromedriver process instead of connecting to an
    /// already-running endpoint (default: false)
    #[serde(default)]
    pub manage_driver: bool,

    /// Extra Chrome arguments applied to every session
    #[serde(default = "default_chrome_args")]
    pub chrome_args: Vec<String>,
}

impl Default for WebDriverConfig {
    fn default() -> Self {
        Self {
            url: default_webdriver_url(),
            driver_path: None,
            search_path: true,
            manage_driver: false,
            chrome_args: default_chrome_args(),
        }
    }
}

/// API and external server integration configuration
///
/// Groups settings for external access and control interfaces.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct ServerIntegrationConfig {
    /// REST API configuration
    #[serde(default)]
    pub api: ApiConfig,
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiConfig {
    /// Address to bind to (default: 127.0.0.1:5000)
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Enable Swagger UI at /swagger-ui (default: true)
    #[serde(default = "default_true")]
    pub swagger_ui: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: true,
        }
    }
}

/// Main configuration for MangaDownloader
///
/// Fields are organized into logical sub-configs for maintainability:
/// - [`fetch`](FetchConfig) — timeouts, selectors, idle scrolling
/// - [`convert`](ConvertConfig) — PDF conversion concurrency and page sizing
/// - [`webdriver`](WebDriverConfig) — WebDriver endpoint and driver process
/// - [`server`](ServerIntegrationConfig) — REST API settings
///
/// Fetch, convert, and server sub-configs are flattened so the JSON format
/// stays flat; the webdriver section is nested under its own key.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct Config {
    /// Working directory downloads and PDFs are written under (default: "./downloads")
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,

    /// Fetch behavior settings (timeouts, selectors, idle scrolling)
    #[serde(flatten)]
    pub fetch: FetchConfig,

    /// PDF conversion settings
    #[serde(flatten)]
    pub convert: ConvertConfig,

    /// WebDriver endpoint and driver process settings
    #[serde(default)]
    pub webdriver: WebDriverConfig,

    /// API and external server integration
    #[serde(flatten)]
    pub server: ServerIntegrationConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            work_dir: default_work_dir(),
            fetch: FetchConfig::default(),
            convert: ConvertConfig::default(),
            webdriver: WebDriverConfig::default(),
            server: ServerIntegrationConfig::default(),
        }
    }
}

// Convenience accessors — allow call sites to use `config.work_dir()` etc.
// without reaching through the sub-config structs.
impl Config {
    /// Working directory
    pub fn work_dir(&self) -> &PathBuf {
        &self.work_dir
    }

    /// Maximum concurrent folder conversions
    pub fn max_workers(&self) -> usize {
        self.convert.max_workers
    }

    /// Page navigation timeout
    pub fn navigation_timeout(&self) -> Duration {
        self.fetch.navigation_timeout
    }

    /// Element visibility timeout
    pub fn element_timeout(&self) -> Duration {
        self.fetch.element_timeout
    }
}

fn default_work_dir() -> PathBuf {
    PathBuf::from("./downloads")
}

fn default_navigation_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_element_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_download_timeout() -> Duration {
    Duration::from_secs(120)
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/80.0.3987.149 Safari/537.36"
        .to_string()
}

fn default_consent_selector() -> String {
    "#checkAdult".to_string()
}

fn default_title_selector() -> String {
    ".book-title".to_string()
}

fn default_chapter_link_selector() -> String {
    "a".to_string()
}

fn default_page_image_selector() -> String {
    "#mangaFile".to_string()
}

fn default_page_select_selector() -> String {
    "#pageSelect".to_string()
}

fn default_next_page_selector() -> String {
    "#next".to_string()
}

fn default_moves_min() -> u32 {
    1
}

fn default_moves_max() -> u32 {
    2
}

fn default_wait_min_ms() -> u64 {
    1000
}

fn default_wait_max_ms() -> u64 {
    2000
}

fn default_scroll_min_px() -> i64 {
    100
}

fn default_scroll_max_px() -> i64 {
    800
}

fn default_max_workers() -> usize {
    4
}

fn default_image_ext() -> String {
    "webp".to_string()
}

fn default_pdf_dpi() -> f32 {
    96.0
}

fn default_webdriver_url() -> String {
    "http://localhost:9515".to_string()
}

fn default_chrome_args() -> Vec<String> {
    vec![
        "--no-sandbox".to_string(),
        "--disable-dev-shm-usage".to_string(),
        "--disable-gpu".to_string(),
    ]
}

fn default_true() -> bool {
    true
}

fn default_bind_address() -> SocketAddr {
    ([127, 0, 0, 1], 5000).into()
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
