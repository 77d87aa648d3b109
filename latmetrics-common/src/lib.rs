use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One raw observation from the dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub region: String,
    pub latency_ms: f64,
    pub uptime_pct: f64,
}

impl Sample {
    pub fn new(region: impl Into<String>, latency_ms: f64, uptime_pct: f64) -> Self {
        Self { region: region.into(), latency_ms, uptime_pct }
    }
}

/// Body of `POST /`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsRequest {
    /// Regions to report on, in the order they should appear in the result.
    pub regions: Vec<String>,
    pub threshold_ms: i64,
}

/// Summary for a single region. Numeric fields are rounded to two decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionMetrics {
    pub avg_latency: f64,
    pub p95_latency: f64,
    pub avg_uptime: f64,
    pub breaches: u64,
}

/// Region -> summary, keyed in request order.
pub type MetricsResult = IndexMap<String, RegionMetrics>;

/// Body of `GET /health`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub regions: usize,
    pub samples: usize,
}

/// Error types for LatMetrics operations
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LatMetricsError {
    #[error("Dataset unavailable: {0}")]
    DataUnavailable(String),

    #[error("Region has no samples: {0}")]
    EmptyRegionData(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("HTTP {0}: {1}")]
    HttpError(u16, String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// JSON error envelope returned by the server for all error responses
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Result type for LatMetrics operations
pub type Result<T> = std::result::Result<T, LatMetricsError>;
