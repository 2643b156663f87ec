use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use chrono::TimeDelta;
use feed_core::{
    CatalogClientOptions, FeedOptions, DEFAULT_CATALOG_URL, DEFAULT_PAGE_SIZE,
    DEFAULT_WINDOW_HOURS, MAX_PAGE_SIZE,
};
use serde::Deserialize;

pub const DEFAULT_SETTINGS_FILE: &str = "quakes.toml";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub base_url: String,
    pub page_size: u32,
    pub window_hours: i64,
    pub min_magnitude: f64,
    pub request_timeout_seconds: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_CATALOG_URL.into(),
            page_size: DEFAULT_PAGE_SIZE,
            window_hours: DEFAULT_WINDOW_HOURS,
            min_magnitude: 0.0,
            request_timeout_seconds: 30,
        }
    }
}

impl Settings {
    pub fn catalog_options(&self) -> CatalogClientOptions {
        CatalogClientOptions {
            base_url: self.base_url.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_seconds),
            ..CatalogClientOptions::default()
        }
    }

    pub fn feed_options(&self) -> FeedOptions {
        FeedOptions {
            page_size: self.page_size,
            window: TimeDelta::try_hours(self.window_hours)
                .unwrap_or_else(|| TimeDelta::hours(DEFAULT_WINDOW_HOURS)),
            initial_min_magnitude: self.min_magnitude,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    base_url: Option<String>,
    page_size: Option<u32>,
    window_hours: Option<i64>,
    min_magnitude: Option<f64>,
    request_timeout_seconds: Option<u64>,
}

/// Defaults, then the settings file, then environment variables. An explicit
/// `path` must exist; the default `quakes.toml` is optional.
pub fn load_settings(path: Option<&Path>) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    let (file, required) = match path {
        Some(path) => (path.to_path_buf(), true),
        None => (PathBuf::from(DEFAULT_SETTINGS_FILE), false),
    };
    match fs::read_to_string(&file) {
        Ok(raw) => apply_file(&mut settings, &raw)
            .with_context(|| format!("invalid settings file '{}'", file.display()))?,
        Err(err) if required => {
            return Err(err)
                .with_context(|| format!("failed to read settings file '{}'", file.display()))
        }
        Err(_) => {}
    }

    apply_env(&mut settings, |key| std::env::var(key).ok());
    Ok(normalize(settings))
}

fn apply_file(settings: &mut Settings, raw: &str) -> anyhow::Result<()> {
    let file_cfg: FileSettings = toml::from_str(raw)?;
    if let Some(v) = file_cfg.base_url {
        settings.base_url = v;
    }
    if let Some(v) = file_cfg.page_size {
        settings.page_size = v;
    }
    if let Some(v) = file_cfg.window_hours {
        settings.window_hours = v;
    }
    if let Some(v) = file_cfg.min_magnitude {
        settings.min_magnitude = v;
    }
    if let Some(v) = file_cfg.request_timeout_seconds {
        settings.request_timeout_seconds = v;
    }
    Ok(())
}

fn apply_env(settings: &mut Settings, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("QUAKES_BASE_URL") {
        settings.base_url = v;
    }
    if let Some(v) = var("APP__BASE_URL") {
        settings.base_url = v;
    }

    if let Some(v) = var("APP__PAGE_SIZE").and_then(|v| v.parse().ok()) {
        settings.page_size = v;
    }
    if let Some(v) = var("APP__WINDOW_HOURS").and_then(|v| v.parse().ok()) {
        settings.window_hours = v;
    }
    if let Some(v) = var("APP__MIN_MAGNITUDE").and_then(|v| v.parse().ok()) {
        settings.min_magnitude = v;
    }
    if let Some(v) = var("APP__REQUEST_TIMEOUT_SECONDS").and_then(|v| v.parse().ok()) {
        settings.request_timeout_seconds = v;
    }
}

fn normalize(mut settings: Settings) -> Settings {
    let defaults = Settings::default();
    if settings.base_url.trim().is_empty() {
        settings.base_url = defaults.base_url;
    }
    settings.page_size = settings.page_size.clamp(1, MAX_PAGE_SIZE);
    if settings.window_hours <= 0 {
        settings.window_hours = defaults.window_hours;
    }
    if !settings.min_magnitude.is_finite() {
        settings.min_magnitude = defaults.min_magnitude;
    }
    if settings.request_timeout_seconds == 0 {
        settings.request_timeout_seconds = defaults.request_timeout_seconds;
    }
    settings
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
