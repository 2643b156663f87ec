use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const UNKNOWN_PLACE: &str = "Unknown location";
pub const UNKNOWN_STATUS: &str = "unknown";

/// Source-assigned event identifier, e.g. `us7000abcd`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub String);

impl EventId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Epicenter {
    pub latitude: f64,
    pub longitude: f64,
    /// Kilometers below the surface.
    pub depth_km: f64,
}

/// Severity bands used when presenting a magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MagnitudeBand {
    Minor,
    Light,
    Moderate,
    Strong,
}

impl MagnitudeBand {
    pub fn classify(magnitude: f64) -> Self {
        if magnitude < 2.0 {
            Self::Minor
        } else if magnitude < 4.0 {
            Self::Light
        } else if magnitude < 6.0 {
            Self::Moderate
        } else {
            Self::Strong
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Minor => "minor",
            Self::Light => "light",
            Self::Moderate => "moderate",
            Self::Strong => "strong",
        }
    }
}

/// A single catalog event. Fields are fixed at construction; a refreshed feed
/// replaces records rather than editing them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarthquakeRecord {
    id: EventId,
    magnitude: f64,
    place: String,
    time: DateTime<Utc>,
    epicenter: Epicenter,
    status: String,
}

impl EarthquakeRecord {
    pub fn new(
        id: EventId,
        magnitude: f64,
        place: Option<String>,
        time: DateTime<Utc>,
        epicenter: Epicenter,
        status: Option<String>,
    ) -> Self {
        Self {
            id,
            magnitude,
            place: place.unwrap_or_else(|| UNKNOWN_PLACE.to_string()),
            time,
            epicenter,
            status: status.unwrap_or_else(|| UNKNOWN_STATUS.to_string()),
        }
    }

    pub fn id(&self) -> &EventId {
        &self.id
    }

    pub fn magnitude(&self) -> f64 {
        self.magnitude
    }

    pub fn place(&self) -> &str {
        &self.place
    }

    pub fn time(&self) -> DateTime<Utc> {
        self.time
    }

    pub fn epicenter(&self) -> Epicenter {
        self.epicenter
    }

    pub fn latitude(&self) -> f64 {
        self.epicenter.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.epicenter.longitude
    }

    pub fn depth(&self) -> f64 {
        self.epicenter.depth_km
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn band(&self) -> MagnitudeBand {
        MagnitudeBand::classify(self.magnitude)
    }
}
