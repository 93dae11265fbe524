//! Convert already-downloaded chapter folders into per-chapter PDFs.
//!
//! Usage: `cargo run --example convert -- "Some Manga" [work_dir]`
//!
//! Looks for chapter folders under `<work_dir>/<manga name>/` and replaces
//! each one with a PDF named after it.

use manga_dl::{Config, MangaDownloader};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,manga_dl=debug".into()),
        )
        .init();

    let manga = std::env::args()
        .nth(1)
        .ok_or("usage: convert <manga name> [work_dir]")?;

    let mut config = Config::default();
    if let Some(dir) = std::env::args().nth(2) {
        config.work_dir = dir.into();
    }

    let downloader = MangaDownloader::new(config).await?;
    let report = downloader.convert(&manga).await?;

    println!(
        "{manga}: {} folders, {} converted, {} skipped, {} failed",
        report.folders_found, report.converted, report.skipped, report.failed
    );
    Ok(())
}
