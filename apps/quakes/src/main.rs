mod config;
mod render;

use std::{path::PathBuf, sync::Arc};

use anyhow::{bail, Context, Result};
use clap::Parser;
use feed_core::{CatalogClient, FeedController, FeedEvent};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Recent earthquakes from a GeoJSON event catalog
#[derive(Parser, Debug)]
struct Args {
    /// Only show events at or above this magnitude
    #[arg(long, value_parser = parse_magnitude)]
    min_magnitude: Option<f64>,
    /// Number of pages to load
    #[arg(long, default_value_t = 1)]
    pages: u32,
    /// Settings file (defaults to ./quakes.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Print one JSON object per event instead of a table
    #[arg(long)]
    json: bool,
}

fn parse_magnitude(raw: &str) -> Result<f64, String> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| format!("'{raw}' is not a number"))?;
    if !value.is_finite() {
        return Err(format!("'{raw}' is not a finite magnitude"));
    }
    Ok(value)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();
    let settings = config::load_settings(args.config.as_deref())?;
    debug!(?settings, "settings loaded");

    let client =
        CatalogClient::new(settings.catalog_options()).context("failed to set up catalog client")?;
    let feed = Arc::new(FeedController::new(
        Arc::new(client),
        settings.feed_options(),
    ));
    let watcher = watch_feed(feed.subscribe().await);

    match args.min_magnitude {
        Some(min_magnitude)
            if min_magnitude.is_finite() && min_magnitude != settings.min_magnitude =>
        {
            feed.set_filter(min_magnitude).await
        }
        _ => feed.refresh().await,
    }
    for _ in 1..args.pages {
        if !feed.snapshot().await.has_more {
            break;
        }
        feed.load_more().await;
    }

    let snapshot = feed.snapshot().await;
    drop(feed);
    finish_watcher(watcher).await;

    if snapshot.shows_error() {
        bail!("{}", snapshot.error);
    }
    if !snapshot.error.is_empty() {
        warn!(error = %snapshot.error, "showing partial results");
    }

    let output = if args.json {
        render::render_json_lines(&snapshot.records)?
    } else {
        render::render_list(&snapshot.records)
    };
    print!("{output}");
    info!(
        count = snapshot.records.len(),
        min_magnitude = snapshot.min_magnitude,
        has_more = snapshot.has_more,
        "done"
    );
    Ok(())
}

/// Logs feed transitions until the controller is dropped.
fn watch_feed(mut events: mpsc::UnboundedReceiver<FeedEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(FeedEvent::Changed(snapshot)) = events.recv().await {
            debug!(
                records = snapshot.records.len(),
                loading = snapshot.is_loading,
                page = snapshot.page,
                has_more = snapshot.has_more,
                "feed changed"
            );
        }
    })
}

/// Waits for the watcher to drain; returns false if it panicked or was cancelled.
async fn finish_watcher(watcher: JoinHandle<()>) -> bool {
    match watcher.await {
        Ok(()) => true,
        Err(err) => {
            warn!(error = %err, "feed watcher task failed");
            false
        }
    }
}
