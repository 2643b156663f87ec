//! GeoJSON wire schema returned by the event catalog and its strict decode
//! into [`EarthquakeRecord`]s.

use chrono::DateTime;
use serde::{Deserialize, Serialize};

use crate::{
    domain::{EarthquakeRecord, Epicenter, EventId},
    error::DecodeError,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feature {
    pub id: Option<String>,
    pub properties: Properties,
    pub geometry: Option<Geometry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Properties {
    pub mag: Option<f64>,
    pub place: Option<String>,
    /// Epoch milliseconds.
    pub time: Option<i64>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Geometry {
    /// `[longitude, latitude, depth]`
    pub coordinates: Vec<f64>,
}

pub fn decode_feature_collection(body: &[u8]) -> Result<Vec<EarthquakeRecord>, DecodeError> {
    let collection: FeatureCollection = serde_json::from_slice(body)?;
    collection
        .features
        .into_iter()
        .enumerate()
        .map(|(index, feature)| feature.into_record(index))
        .collect()
}

impl Feature {
    /// `index` is the feature's position in its collection, used to point at
    /// features that lack an id.
    pub fn into_record(self, index: usize) -> Result<EarthquakeRecord, DecodeError> {
        let missing = |field| DecodeError::MissingField { index, field };

        let id = self.id.ok_or_else(|| missing("id"))?;
        let magnitude = self.properties.mag.ok_or_else(|| missing("properties.mag"))?;
        let millis = self.properties.time.ok_or_else(|| missing("properties.time"))?;
        let geometry = self.geometry.ok_or_else(|| missing("geometry"))?;

        let [longitude, latitude, depth_km] = match geometry.coordinates[..] {
            [longitude, latitude, depth_km, ..] => [longitude, latitude, depth_km],
            _ => {
                return Err(DecodeError::Coordinates {
                    id,
                    len: geometry.coordinates.len(),
                })
            }
        };
        let time = DateTime::from_timestamp_millis(millis).ok_or_else(|| DecodeError::Timestamp {
            id: id.clone(),
            millis,
        })?;

        Ok(EarthquakeRecord::new(
            EventId(id),
            magnitude,
            self.properties.place,
            time,
            Epicenter {
                latitude,
                longitude,
                depth_km,
            },
            self.properties.status,
        ))
    }
}
