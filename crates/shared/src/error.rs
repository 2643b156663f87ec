use thiserror::Error;

/// Ways a catalog response can fail to become records.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed feature collection: {0}")]
    Json(#[from] serde_json::Error),
    #[error("feature #{index} is missing required field `{field}`")]
    MissingField { index: usize, field: &'static str },
    #[error("feature {id} has {len} coordinates, expected [longitude, latitude, depth]")]
    Coordinates { id: String, len: usize },
    #[error("feature {id} has out-of-range time {millis}")]
    Timestamp { id: String, millis: i64 },
}
