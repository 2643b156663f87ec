//! Earthquake feed core: a paginating, filterable view over a remote event
//! catalog, plus the client that talks to that catalog.

pub mod controller;
pub mod source;

pub use controller::{
    Clock, FeedController, FeedEvent, FeedOptions, FeedSnapshot, SystemClock,
    DEFAULT_PAGE_SIZE, DEFAULT_WINDOW_HOURS, MAX_PAGE_SIZE,
};
pub use source::{
    CatalogClient, CatalogClientOptions, EarthquakeSource, PageQuery, SourceError,
    DEFAULT_CATALOG_URL,
};
pub use shared::domain::{EarthquakeRecord, Epicenter, EventId, MagnitudeBand};
