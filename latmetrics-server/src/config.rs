/// Maximum accepted size of a `POST /` body. Matches axum's default; roughly 100k
/// region names fit.
pub const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Position of the p95 sample, as a fraction of the last sorted index.
pub const P95_FRACTION: f64 = 0.95;

/// Default listen address for the binary.
pub const DEFAULT_ADDR: &str = "0.0.0.0:8000";

/// Default dataset file, relative to the working directory.
pub const DEFAULT_DATA_FILE: &str = "data.json";

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_LOG_FILTER: &str = "info,latmetrics_server=debug,tower_http=debug";
