use super::*;
use crate::browser::testing::{FakeSite, catalog_page, chapter_page};
use crate::manager::test_helpers::{create_test_downloader, png_bytes};
use crate::types::{TaskInfo, TaskStatus};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use std::time::Duration;
use tower::ServiceExt;

const CATALOG: &str = "https://manga.example.com/comic/49301/";
const CH1: &str = "https://manga.example.com/c/1";
const IMG1: &str = "https://img.example.com/p1.png";

fn one_chapter_site() -> FakeSite {
    FakeSite::new()
        .with_page(CATALOG, catalog_page("Some Manga", &[("Ch 1", CH1)]))
        .with_page(CH1, chapter_page(IMG1, 1))
        .with_download_bytes(png_bytes())
}

/// Router plus the downloader and work dir backing it
async fn test_app(site: FakeSite) -> (Router, MangaDownloader, tempfile::TempDir) {
    let (downloader, work) = create_test_downloader(site.launcher()).await;
    let app = create_router(downloader.clone(), downloader.get_config());
    (app, downloader, work)
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

async fn wait_terminal(downloader: &MangaDownloader, id: u64) -> TaskInfo {
    for _ in 0..500 {
        let info = downloader.status(crate::types::TaskId(id)).await.unwrap();
        if info.status.is_terminal() {
            return info;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("task {id} never reached a terminal status");
}

#[tokio::test]
async fn health_reports_ok_and_version() {
    let (app, _downloader, _work) = test_app(FakeSite::new()).await;

    let response = app.oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn cors_headers_are_present_when_enabled() {
    let (app, _downloader, _work) = test_app(FakeSite::new()).await;

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .contains_key("access-control-allow-origin"),
        "CORS header should be present when CORS is enabled"
    );
}

#[tokio::test]
async fn start_download_returns_202_with_task_id() {
    let (app, downloader, _work) = test_app(one_chapter_site()).await;

    let response = app
        .oneshot(post_json(
            "/download",
            serde_json::json!({"url": CATALOG, "auto_convert": false}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let body = body_json(response).await;
    assert_eq!(body["task_id"], 1, "first allocated id is 1");

    wait_terminal(&downloader, 1).await;
}

#[tokio::test]
async fn start_download_with_empty_url_is_400() {
    let (app, _downloader, _work) = test_app(FakeSite::new()).await;

    let response = app
        .oneshot(post_json("/download", serde_json::json!({"url": ""})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "config_error");
}

#[tokio::test]
async fn status_of_started_task_is_visible() {
    let (app, downloader, _work) = test_app(one_chapter_site()).await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/download",
            serde_json::json!({"url": CATALOG, "auto_convert": false}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let response = app.oneshot(get("/status/1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["id"], 1);
    assert_eq!(body["url"], CATALOG);

    wait_terminal(&downloader, 1).await;
}

#[tokio::test]
async fn status_of_unknown_task_is_404() {
    let (app, _downloader, _work) = test_app(FakeSite::new()).await;

    let response = app.oneshot(get("/status/99")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "task_not_found");
    assert_eq!(body["error"]["details"]["task_id"], 99);
}

#[tokio::test]
async fn stop_of_unknown_task_is_404() {
    let (app, _downloader, _work) = test_app(FakeSite::new()).await;

    let response = app
        .oneshot(post_json("/stop/99", serde_json::json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn stop_of_running_task_returns_stopping() {
    let site = one_chapter_site().with_navigate_delay(Duration::from_millis(200));
    let (app, downloader, _work) = test_app(site).await;

    let response = app
        .clone()
        .oneshot(post_json("/download", serde_json::json!({"url": CATALOG})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let response = app
        .oneshot(post_json("/stop/1", serde_json::json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["task_id"], 1);
    assert_eq!(body["status"], "stopping");

    let info = wait_terminal(&downloader, 1).await;
    assert_eq!(info.status, TaskStatus::Stopped);
}

#[tokio::test]
async fn stop_of_finished_task_is_409() {
    let (app, downloader, _work) = test_app(one_chapter_site()).await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/download",
            serde_json::json!({"url": CATALOG, "auto_convert": false}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    wait_terminal(&downloader, 1).await;

    let response = app
        .oneshot(post_json("/stop/1", serde_json::json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "invalid_state");
}

#[tokio::test]
async fn tasks_lists_every_record() {
    let (app, downloader, _work) = test_app(one_chapter_site()).await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/download",
            serde_json::json!({"url": CATALOG, "auto_convert": false}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    wait_terminal(&downloader, 1).await;

    let response = app.oneshot(get("/tasks")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body.is_object());
    assert_eq!(body["1"]["id"], 1, "record must be keyed by its id");
}

#[tokio::test]
async fn convert_of_unknown_manga_is_404() {
    let (app, _downloader, _work) = test_app(FakeSite::new()).await;

    let response = app
        .oneshot(post_json(
            "/convert",
            serde_json::json!({"manga_name": "Ghost Manga"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "manga_not_found");
}

#[tokio::test]
async fn convert_returns_the_report() {
    let (app, _downloader, work) = test_app(FakeSite::new()).await;

    // one chapter folder with one decodable page
    let folder = work
        .path()
        .join("downloads")
        .join("Some Manga")
        .join("Some Manga - Ch 1");
    std::fs::create_dir_all(&folder).unwrap();
    std::fs::write(folder.join("p1.png"), png_bytes()).unwrap();

    let response = app
        .oneshot(post_json(
            "/convert",
            serde_json::json!({"manga_name": "Some Manga"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["folders_found"], 1);
    assert_eq!(body["converted"], 1);
    assert_eq!(body["failed"], 0);
}

#[tokio::test]
async fn openapi_spec_is_served() {
    let (app, _downloader, _work) = test_app(FakeSite::new()).await;

    let response = app.oneshot(get("/openapi.json")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["openapi"].as_str().unwrap().starts_with("3."));
    assert!(body["paths"]["/download"].is_object());
}

#[tokio::test]
async fn events_endpoint_streams_sse() {
    let (app, _downloader, _work) = test_app(FakeSite::new()).await;

    let response = app.oneshot(get("/events")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok()),
        Some("text/event-stream")
    );
}

#[tokio::test]
async fn api_server_spawns_and_binds() {
    let site = FakeSite::new();
    let (downloader, _work) = create_test_downloader(site.launcher()).await;

    let mut config = (*downloader.get_config()).clone();
    // Port 0 = OS assigns a free port
    config.server.api.bind_address = "127.0.0.1:0".parse().unwrap();
    let config = std::sync::Arc::new(config);

    let api_handle = tokio::spawn({
        let downloader = downloader.clone();
        let config = config.clone();
        async move { start_api_server(downloader, config).await }
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!api_handle.is_finished(), "server must still be serving");
    api_handle.abort();
}
