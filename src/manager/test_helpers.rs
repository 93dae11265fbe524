//! Shared test helpers for creating MangaDownloader instances in tests.

use crate::browser::BrowserLauncher;
use crate::config::{Config, IdleScrollConfig};
use crate::manager::MangaDownloader;
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;

/// Helper to create a test MangaDownloader over an injected launcher.
/// Returns the downloader and the tempdir (which must be kept alive).
pub(crate) async fn create_test_downloader(
    launcher: Arc<dyn BrowserLauncher>,
) -> (MangaDownloader, tempfile::TempDir) {
    let temp_dir = tempdir().unwrap();

    let mut config = Config::default();
    config.work_dir = temp_dir.path().join("downloads");
    config.fetch.navigation_timeout = Duration::from_secs(5);
    config.fetch.element_timeout = Duration::from_secs(2);
    // keep idle scrolling instant and deterministic
    config.fetch.idle = IdleScrollConfig {
        moves_min: 1,
        moves_max: 1,
        wait_min_ms: 0,
        wait_max_ms: 0,
        scroll_min_px: 1,
        scroll_max_px: 1,
    };
    // tests download PNG pages so conversion can decode them
    config.convert.image_ext = "png".to_string();
    config.convert.max_workers = 2;

    let downloader = MangaDownloader::with_launcher(config, launcher)
        .await
        .unwrap();
    (downloader, temp_dir)
}

/// A tiny valid PNG, used as the scripted download payload
pub(crate) fn png_bytes() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(4, 6, image::Rgb([120, 80, 40]));
    let mut bytes = Vec::new();
    img.write_to(
        &mut std::io::Cursor::new(&mut bytes),
        image::ImageFormat::Png,
    )
    .unwrap();
    bytes
}
