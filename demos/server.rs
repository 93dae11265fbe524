//! Run the downloader with its REST API until Ctrl+C.
//!
//! Usage: `cargo run --example server [config.json]`
//!
//! Without an argument the default configuration is used: work dir
//! `./downloads`, API on 127.0.0.1:5000, WebDriver endpoint expected at
//! http://localhost:9515.

use manga_dl::{Config, MangaDownloader, run_with_shutdown};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,manga_dl=debug".into()),
        )
        .init();

    let config: Config = match std::env::args().nth(1) {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(&path)?)?,
        None => Config::default(),
    };

    let downloader = MangaDownloader::new(config).await?;

    // Mirror every event into the log
    let mut events = downloader.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            tracing::info!(?event, "event");
        }
    });

    let api = downloader.spawn_api_server();
    tracing::info!(
        address = %downloader.get_config().server.api.bind_address,
        "REST API listening"
    );

    run_with_shutdown(downloader).await?;
    api.abort();
    Ok(())
}
