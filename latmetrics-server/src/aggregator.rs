use crate::config::P95_FRACTION;
use crate::loader::{RegionIndex, RegionSeries};
use latmetrics_common::{LatMetricsError, MetricsResult, RegionMetrics, Result};

pub use crate::numeric::{mean, round2};

/// Compute per-region summaries for `regions` against `index`.
///
/// Regions missing from the index are skipped without error, so callers may ask for a
/// superset of what the dataset holds. A region whose series is empty is also skipped
/// (with a warning) rather than failing the whole request. Repeated regions yield a
/// single entry at the position of their first occurrence.
pub fn aggregate(index: &RegionIndex, regions: &[String], threshold_ms: i64) -> MetricsResult {
    let mut result = MetricsResult::with_capacity(regions.len());

    for region in regions {
        if result.contains_key(region) {
            continue;
        }
        let Some(series) = index.get(region) else {
            tracing::debug!(region = %region, "region not in dataset, skipping");
            continue;
        };
        match summarize(region, series, threshold_ms) {
            Ok(metrics) => {
                result.insert(region.clone(), metrics);
            }
            Err(err) => {
                tracing::warn!(region = %region, error = %err, "omitting region from result");
            }
        }
    }

    tracing::debug!(requested = regions.len(), reported = result.len(), threshold_ms, "aggregated");
    result
}

/// Summarize a single region's series.
pub fn summarize(region: &str, series: &RegionSeries, threshold_ms: i64) -> Result<RegionMetrics> {
    let latencies = series.latencies();
    let uptimes = series.uptimes();
    if latencies.is_empty() || uptimes.is_empty() {
        return Err(LatMetricsError::EmptyRegionData(region.to_string()));
    }

    let mut sorted = latencies.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let p95 = sorted[p95_index(sorted.len())];

    let threshold = threshold_ms as f64;
    let breaches = latencies.iter().filter(|&&l| l > threshold).count() as u64;

    Ok(RegionMetrics {
        avg_latency: round2(mean(latencies)),
        p95_latency: round2(p95),
        avg_uptime: round2(mean(uptimes)),
        breaches,
    })
}

/// Zero-based index of the p95 element in a sorted slice of length `n`:
/// `floor(0.95 * (n - 1))`, no interpolation. `n` must be at least 1.
pub fn p95_index(n: usize) -> usize {
    (P95_FRACTION * n.saturating_sub(1) as f64).floor() as usize
}
