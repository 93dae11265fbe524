//! Core types for manga-dl

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Unique identifier for a task
///
/// Ids are assigned monotonically starting at 1 and are never reused
/// or evicted for the lifetime of the process.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl TaskId {
    /// Create a new TaskId
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the inner u64 value
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl From<u64> for TaskId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<TaskId> for u64 {
    fn from(id: TaskId) -> Self {
        id.0
    }
}

impl PartialEq<u64> for TaskId {
    fn eq(&self, other: &u64) -> bool {
        self.0 == *other
    }
}

impl PartialEq<TaskId> for u64 {
    fn eq(&self, other: &TaskId) -> bool {
        *self == other.0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TaskId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// Task status
///
/// `Running` and `Stopping` are live statuses; the other four are terminal
/// and never change once written.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Fetch in progress
    Running,
    /// Stop requested, waiting for the task to unwind
    Stopping,
    /// Stopped by user request
    Stopped,
    /// Finished successfully
    Completed,
    /// Download finished but conversion failed
    CompletedWithWarning,
    /// Failed with an error
    Failed,
}

impl TaskStatus {
    /// Whether this status is terminal (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Stopped
                | TaskStatus::Completed
                | TaskStatus::CompletedWithWarning
                | TaskStatus::Failed
        )
    }

    /// The wire representation of this status
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Running => "running",
            TaskStatus::Stopping => "stopping",
            TaskStatus::Stopped => "stopped",
            TaskStatus::Completed => "completed",
            TaskStatus::CompletedWithWarning => "completed_with_warning",
            TaskStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Information about a task in the registry
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct TaskInfo {
    /// Unique task identifier
    pub id: TaskId,

    /// Current status
    pub status: TaskStatus,

    /// Human-readable progress or result text
    pub message: String,

    /// Catalog page URL the task was started with
    pub url: String,

    /// CSS selector for the chapter list container
    pub element_selector: String,

    /// Which matching container to read chapters from
    pub chapter_index: usize,

    /// Whether to convert downloaded chapters to PDF after the fetch
    pub auto_convert: bool,

    /// When the task was created
    pub created_at: DateTime<Utc>,
}

/// Request to start a download task
///
/// Field defaults match the request-level defaults of the HTTP API:
/// a minimal request only needs `url`.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct JobRequest {
    /// Catalog page URL to fetch chapters from
    pub url: String,

    /// CSS selector for the chapter list container (default: "#chapter-list-0")
    #[serde(default = "default_element_selector")]
    pub element_selector: String,

    /// Which matching container to use (default: 0)
    #[serde(default)]
    pub chapter_index: usize,

    /// Run the browser session headless (default: false)
    #[serde(default)]
    pub headless: bool,

    /// Optional proxy host:port for the browser session
    #[serde(default)]
    pub proxy: Option<String>,

    /// Convert downloaded chapters to PDF after the fetch (default: true)
    #[serde(default = "default_true")]
    pub auto_convert: bool,
}

impl JobRequest {
    /// Create a request for a URL with all defaults
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            element_selector: default_element_selector(),
            chapter_index: 0,
            headless: false,
            proxy: None,
            auto_convert: true,
        }
    }
}

fn default_element_selector() -> String {
    "#chapter-list-0".to_string()
}

fn default_true() -> bool {
    true
}

/// A discovered chapter: entry title and the page it links to
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Chapter {
    /// Chapter title (also used in the folder name)
    pub title: String,

    /// URL of the chapter's first page
    pub url: String,
}

/// Outcome counts for one conversion run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ConversionReport {
    /// Candidate chapter folders discovered under the manga directory
    pub folders_found: usize,

    /// Folders successfully converted to PDF
    pub converted: usize,

    /// Folders skipped because they contained no page images
    pub skipped: usize,

    /// Folders whose conversion failed (logged, sources kept)
    pub failed: usize,
}

/// Event emitted during task and conversion lifecycles
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Fetch task spawned
    TaskStarted {
        /// Task ID
        id: TaskId,
        /// Catalog page URL
        url: String,
    },

    /// Manga title and chapter list resolved from the catalog page
    MangaResolved {
        /// Task ID
        id: TaskId,
        /// Resolved manga title
        manga: String,
        /// Number of chapters discovered
        chapters: usize,
    },

    /// Started fetching one chapter
    ChapterStarted {
        /// Task ID
        id: TaskId,
        /// Chapter title
        chapter: String,
    },

    /// Finished fetching one chapter
    ChapterFetched {
        /// Task ID
        id: TaskId,
        /// Chapter title
        chapter: String,
        /// Pages the chapter reported
        pages: usize,
    },

    /// A single page download failed and was skipped
    PageFailed {
        /// Task ID
        id: TaskId,
        /// Image URL that failed
        url: String,
        /// Error text
        error: String,
    },

    /// Task finished successfully
    TaskCompleted {
        /// Task ID
        id: TaskId,
        /// Warning text when conversion failed after a successful download
        #[serde(skip_serializing_if = "Option::is_none")]
        warning: Option<String>,
    },

    /// Task stopped by user request
    TaskStopped {
        /// Task ID
        id: TaskId,
    },

    /// Task failed
    TaskFailed {
        /// Task ID
        id: TaskId,
        /// Error text
        error: String,
    },

    /// Conversion run started
    ConversionStarted {
        /// Manga name being converted
        manga: String,
        /// Candidate folders found
        folders: usize,
    },

    /// One chapter folder converted to PDF
    FolderConverted {
        /// Manga name
        manga: String,
        /// Folder name (PDF is named after it)
        folder: String,
        /// Pages in the assembled document
        pages: usize,
    },

    /// One chapter folder failed to convert
    FolderFailed {
        /// Manga name
        manga: String,
        /// Folder name
        folder: String,
        /// Error text
        error: String,
    },

    /// Conversion run finished
    ConversionFinished {
        /// Manga name
        manga: String,
        /// Outcome counts
        report: ConversionReport,
    },

    /// Graceful shutdown initiated
    Shutdown,
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    // --- TaskId conversions ---

    #[test]
    fn task_id_from_u64_and_back() {
        let id = TaskId::from(42_u64);
        let raw: u64 = id.into();
        assert_eq!(
            raw, 42,
            "round-trip through From<u64>/Into<u64> must preserve value"
        );
    }

    #[test]
    fn task_id_from_str_parses_valid_integer() {
        let id = TaskId::from_str("123").unwrap();
        assert_eq!(id.get(), 123);
    }

    #[test]
    fn task_id_from_str_rejects_negative() {
        assert!(
            TaskId::from_str("-7").is_err(),
            "TaskId wraps u64 and must reject negatives"
        );
    }

    #[test]
    fn task_id_from_str_rejects_non_numeric() {
        assert!(
            TaskId::from_str("abc").is_err(),
            "non-numeric string must fail to parse"
        );
    }

    #[test]
    fn task_id_from_str_rejects_empty_string() {
        assert!(
            TaskId::from_str("").is_err(),
            "empty string must not parse to a TaskId"
        );
    }

    #[test]
    fn task_id_from_str_rejects_whitespace_padded_input() {
        // u64::from_str is strict and does not trim
        assert!(
            TaskId::from_str(" 123 ").is_err(),
            "whitespace-padded string must not parse — API callers must trim before parsing"
        );
    }

    #[test]
    fn task_id_from_str_rejects_u64_overflow_without_panic() {
        // u64::MAX = 18446744073709551615, so u64::MAX + 1 must fail gracefully
        assert!(
            TaskId::from_str("18446744073709551616").is_err(),
            "u64::MAX + 1 must produce an error, not wrap or panic"
        );
    }

    #[test]
    fn task_id_display_matches_inner_value() {
        let id = TaskId::new(999);
        assert_eq!(
            id.to_string(),
            "999",
            "Display should produce the raw u64 value"
        );
    }

    #[test]
    fn task_id_partial_eq_with_u64() {
        let id = TaskId::new(10);
        assert!(id == 10_u64, "TaskId should equal matching u64");
        assert!(10_u64 == id, "u64 should equal matching TaskId (symmetric)");
        assert!(id != 11_u64, "TaskId should not equal different u64");
    }

    #[test]
    fn task_id_serializes_transparently_as_number() {
        let json = serde_json::to_string(&TaskId(7)).unwrap();
        assert_eq!(json, "7", "transparent serde must not wrap the id");

        let back: TaskId = serde_json::from_str("7").unwrap();
        assert_eq!(back, TaskId(7));
    }

    // --- TaskStatus ---

    #[test]
    fn task_status_wire_strings_match_as_str() {
        let cases = [
            (TaskStatus::Running, "running"),
            (TaskStatus::Stopping, "stopping"),
            (TaskStatus::Stopped, "stopped"),
            (TaskStatus::Completed, "completed"),
            (TaskStatus::CompletedWithWarning, "completed_with_warning"),
            (TaskStatus::Failed, "failed"),
        ];

        for (status, expected) in cases {
            assert_eq!(status.as_str(), expected);
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(
                json,
                format!("\"{expected}\""),
                "serde representation must match as_str for {status:?}"
            );
            let back: TaskStatus = serde_json::from_str(&json).unwrap();
            assert_eq!(back, status, "wire string must deserialize back");
        }
    }

    #[test]
    fn only_running_and_stopping_are_live() {
        assert!(!TaskStatus::Running.is_terminal());
        assert!(!TaskStatus::Stopping.is_terminal());
        assert!(TaskStatus::Stopped.is_terminal());
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::CompletedWithWarning.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
    }

    // --- JobRequest defaults ---

    #[test]
    fn job_request_minimal_json_applies_defaults() {
        let request: JobRequest =
            serde_json::from_str(r#"{"url": "https://example.com/manga/1"}"#).unwrap();

        assert_eq!(request.url, "https://example.com/manga/1");
        assert_eq!(
            request.element_selector, "#chapter-list-0",
            "element_selector must default to the catalog list selector"
        );
        assert_eq!(request.chapter_index, 0);
        assert!(!request.headless, "headless must default to false");
        assert!(request.proxy.is_none());
        assert!(request.auto_convert, "auto_convert must default to true");
    }

    #[test]
    fn job_request_explicit_fields_override_defaults() {
        let request: JobRequest = serde_json::from_str(
            r##"{
                "url": "https://example.com/manga/2",
                "element_selector": "#alt-list",
                "chapter_index": 3,
                "headless": true,
                "proxy": "127.0.0.1:8080",
                "auto_convert": false
            }"##,
        )
        .unwrap();

        assert_eq!(request.element_selector, "#alt-list");
        assert_eq!(request.chapter_index, 3);
        assert!(request.headless);
        assert_eq!(request.proxy.as_deref(), Some("127.0.0.1:8080"));
        assert!(!request.auto_convert);
    }

    #[test]
    fn job_request_new_matches_serde_defaults() {
        let from_ctor = JobRequest::new("https://example.com/manga/3");
        let from_json: JobRequest =
            serde_json::from_str(r#"{"url": "https://example.com/manga/3"}"#).unwrap();

        assert_eq!(from_ctor.element_selector, from_json.element_selector);
        assert_eq!(from_ctor.chapter_index, from_json.chapter_index);
        assert_eq!(from_ctor.headless, from_json.headless);
        assert_eq!(from_ctor.auto_convert, from_json.auto_convert);
    }

    // --- Event serialization ---

    #[test]
    fn event_serializes_with_type_tag() {
        let event = Event::TaskStopped { id: TaskId(3) };
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["type"], "task_stopped");
        assert_eq!(json["id"], 3);
    }

    #[test]
    fn task_completed_event_omits_absent_warning() {
        let event = Event::TaskCompleted {
            id: TaskId(1),
            warning: None,
        };
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["type"], "task_completed");
        assert!(
            json.get("warning").is_none(),
            "warning must be omitted when None"
        );
    }

    #[test]
    fn conversion_finished_event_carries_report_counts() {
        let event = Event::ConversionFinished {
            manga: "Some Manga".into(),
            report: ConversionReport {
                folders_found: 5,
                converted: 3,
                skipped: 1,
                failed: 1,
            },
        };
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["type"], "conversion_finished");
        assert_eq!(json["manga"], "Some Manga");
        assert_eq!(json["report"]["folders_found"], 5);
        assert_eq!(json["report"]["converted"], 3);
        assert_eq!(json["report"]["skipped"], 1);
        assert_eq!(json["report"]["failed"], 1);
    }
}
