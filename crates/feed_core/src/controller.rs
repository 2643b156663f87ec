//! Feed controller: owns the loaded records and their loading, error,
//! pagination and filter state, and publishes every change to subscribers.
//!
//! Each refresh starts a new generation and anchors the recency window; pages
//! loaded afterwards reuse that window so offsets stay stable. Fetches
//! remember the generation they were issued in and their results are dropped
//! if a later refresh (or filter change) has started since, so the most recent
//! request always decides the visible state.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use shared::domain::{EarthquakeRecord, EventId};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use crate::source::{EarthquakeSource, PageQuery};

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const DEFAULT_WINDOW_HOURS: i64 = 24;
/// Largest `limit` the catalog accepts in a single request.
pub const MAX_PAGE_SIZE: u32 = 20_000;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone)]
pub struct FeedOptions {
    pub page_size: u32,
    /// Length of the recency window ending at the moment a refresh starts.
    pub window: TimeDelta,
    pub initial_min_magnitude: f64,
}

impl Default for FeedOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            window: TimeDelta::hours(DEFAULT_WINDOW_HOURS),
            initial_min_magnitude: 0.0,
        }
    }
}

/// Read-only view of the feed handed to observers.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedSnapshot {
    pub records: Vec<EarthquakeRecord>,
    pub is_loading: bool,
    pub min_magnitude: f64,
    pub error: String,
    pub page: u32,
    pub has_more: bool,
}

impl FeedSnapshot {
    /// The list should show the error text instead of an (empty) list.
    pub fn shows_error(&self) -> bool {
        !self.error.is_empty() && self.records.is_empty()
    }
}

#[derive(Debug, Clone)]
pub enum FeedEvent {
    Changed(FeedSnapshot),
}

struct FeedState {
    records: Vec<EarthquakeRecord>,
    is_loading: bool,
    min_magnitude: f64,
    error: String,
    page: u32,
    has_more: bool,
    generation: u64,
    window: Option<(DateTime<Utc>, DateTime<Utc>)>,
    subscribers: Vec<mpsc::UnboundedSender<FeedEvent>>,
}

impl FeedState {
    fn new(min_magnitude: f64) -> Self {
        Self {
            records: Vec::new(),
            is_loading: false,
            min_magnitude,
            error: String::new(),
            page: 1,
            has_more: true,
            generation: 0,
            window: None,
            subscribers: Vec::new(),
        }
    }

    fn snapshot(&self) -> FeedSnapshot {
        FeedSnapshot {
            records: self.records.clone(),
            is_loading: self.is_loading,
            min_magnitude: self.min_magnitude,
            error: self.error.clone(),
            page: self.page,
            has_more: self.has_more,
        }
    }
}

struct PendingFetch {
    query: PageQuery,
    generation: u64,
}

pub struct FeedController {
    source: Arc<dyn EarthquakeSource>,
    clock: Arc<dyn Clock>,
    page_size: u32,
    window: TimeDelta,
    state: Mutex<FeedState>,
}

impl FeedController {
    pub fn new(source: Arc<dyn EarthquakeSource>, options: FeedOptions) -> Self {
        Self::with_clock(source, options, Arc::new(SystemClock))
    }

    pub fn with_clock(
        source: Arc<dyn EarthquakeSource>,
        options: FeedOptions,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let initial_min_magnitude = if options.initial_min_magnitude.is_finite() {
            options.initial_min_magnitude
        } else {
            0.0
        };
        Self {
            source,
            clock,
            page_size: options.page_size.clamp(1, MAX_PAGE_SIZE),
            window: options.window,
            state: Mutex::new(FeedState::new(initial_min_magnitude)),
        }
    }

    /// Receives one event per state change, in the order the changes were
    /// applied. Delivery is unbounded, so a slow reader never misses a
    /// transition. Dropping the receiver unsubscribes.
    pub async fn subscribe(&self) -> mpsc::UnboundedReceiver<FeedEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.state.lock().await.subscribers.push(tx);
        rx
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub async fn snapshot(&self) -> FeedSnapshot {
        self.state.lock().await.snapshot()
    }

    pub async fn record(&self, id: &EventId) -> Option<EarthquakeRecord> {
        self.state
            .lock()
            .await
            .records
            .iter()
            .find(|record| record.id() == id)
            .cloned()
    }

    /// Discards the current records and loads the first page again.
    pub async fn refresh(&self) {
        let pending = {
            let mut state = self.state.lock().await;
            self.begin_refresh(&mut state)
        };
        self.complete_refresh(pending).await;
    }

    /// Changes the minimum magnitude and refreshes. Setting the current value
    /// again does nothing.
    pub async fn set_filter(&self, min_magnitude: f64) {
        if !min_magnitude.is_finite() {
            warn!(min_magnitude, "feed: ignoring non-finite magnitude filter");
            return;
        }
        let pending = {
            let mut state = self.state.lock().await;
            if state.min_magnitude == min_magnitude {
                debug!(min_magnitude, "feed: filter unchanged");
                return;
            }
            info!(
                from = state.min_magnitude,
                to = min_magnitude,
                "feed: magnitude filter changed"
            );
            state.min_magnitude = min_magnitude;
            self.begin_refresh(&mut state)
        };
        self.complete_refresh(pending).await;
    }

    /// Appends the next page. Returns without touching state while another
    /// fetch is in flight or after the feed has been exhausted.
    pub async fn load_more(&self) {
        let pending = {
            let mut state = self.state.lock().await;
            if state.is_loading || !state.has_more {
                return;
            }
            state.is_loading = true;
            self.publish(&mut state);
            let offset = state
                .page
                .saturating_mul(self.page_size)
                .saturating_add(1);
            let window = state.window.unwrap_or_else(|| self.current_window());
            PendingFetch {
                query: self.page_query(window, state.min_magnitude, offset),
                generation: state.generation,
            }
        };
        debug!(
            offset = pending.query.offset,
            generation = pending.generation,
            "feed: loading next page"
        );

        let result = self.source.fetch_page(&pending.query).await;

        let mut state = self.state.lock().await;
        if state.generation != pending.generation {
            debug!(
                generation = pending.generation,
                current = state.generation,
                "feed: dropping page from superseded generation"
            );
            return;
        }
        state.is_loading = false;
        match result {
            Ok(records) if records.len() < self.page_size as usize => {
                debug!(count = records.len(), "feed: short page, no more results");
                state.has_more = false;
            }
            Ok(records) => {
                state.records.extend(records);
                state.page += 1;
            }
            Err(err) => {
                warn!(error = %err, "feed: loading next page failed");
                state.error = err.to_string();
            }
        }
        self.publish(&mut state);
    }

    fn begin_refresh(&self, state: &mut FeedState) -> PendingFetch {
        state.generation += 1;
        state.error.clear();
        state.page = 1;
        state.has_more = true;
        state.records.clear();
        state.is_loading = true;
        self.publish(state);
        info!(
            generation = state.generation,
            min_magnitude = state.min_magnitude,
            "feed: refreshing"
        );
        let window = self.current_window();
        state.window = Some(window);
        PendingFetch {
            query: self.page_query(window, state.min_magnitude, 1),
            generation: state.generation,
        }
    }

    async fn complete_refresh(&self, pending: PendingFetch) {
        let result = self.source.fetch_page(&pending.query).await;

        let mut state = self.state.lock().await;
        if state.generation != pending.generation {
            debug!(
                generation = pending.generation,
                current = state.generation,
                "feed: dropping superseded refresh"
            );
            return;
        }
        state.is_loading = false;
        match result {
            Ok(records) => {
                state.has_more = records.len() == self.page_size as usize;
                info!(
                    count = records.len(),
                    has_more = state.has_more,
                    "feed: refresh complete"
                );
                state.records = records;
            }
            Err(err) => {
                warn!(error = %err, "feed: refresh failed");
                state.error = err.to_string();
            }
        }
        self.publish(&mut state);
    }

    fn current_window(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        let end_time = self.clock.now();
        let start_time = end_time
            .checked_sub_signed(self.window)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        (start_time, end_time)
    }

    fn page_query(
        &self,
        (start_time, end_time): (DateTime<Utc>, DateTime<Utc>),
        min_magnitude: f64,
        offset: u32,
    ) -> PageQuery {
        PageQuery {
            start_time,
            end_time,
            min_magnitude,
            limit: self.page_size,
            offset,
        }
    }

    /// Called with the state lock held so subscribers observe changes in the
    /// order they were applied. Subscribers whose receiver is gone are pruned.
    fn publish(&self, state: &mut FeedState) {
        let snapshot = state.snapshot();
        state
            .subscribers
            .retain(|tx| tx.send(FeedEvent::Changed(snapshot.clone())).is_ok());
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
