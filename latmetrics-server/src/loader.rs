use latmetrics_common::{LatMetricsError, Result, Sample};
use std::collections::HashMap;
use std::path::PathBuf;

/// Latency and uptime observations for one region, in dataset order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegionSeries {
    latencies: Vec<f64>,
    uptimes: Vec<f64>,
}

impl RegionSeries {
    fn push(&mut self, sample: &Sample) {
        self.latencies.push(sample.latency_ms);
        self.uptimes.push(sample.uptime_pct);
    }

    pub fn latencies(&self) -> &[f64] {
        &self.latencies
    }

    pub fn uptimes(&self) -> &[f64] {
        &self.uptimes
    }

    pub fn len(&self) -> usize {
        self.latencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.latencies.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn from_parts_for_test(latencies: Vec<f64>, uptimes: Vec<f64>) -> Self {
        Self { latencies, uptimes }
    }
}

/// Samples grouped by region. Immutable once built; a refresh builds a new index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegionIndex {
    series: HashMap<String, RegionSeries>,
}

impl RegionIndex {
    /// Group `samples` by region in a single pass.
    pub fn from_samples<'a, I>(samples: I) -> Self
    where
        I: IntoIterator<Item = &'a Sample>,
    {
        let mut series: HashMap<String, RegionSeries> = HashMap::new();
        for sample in samples {
            series.entry(sample.region.clone()).or_default().push(sample);
        }
        Self { series }
    }

    pub fn get(&self, region: &str) -> Option<&RegionSeries> {
        self.series.get(region)
    }

    pub fn contains(&self, region: &str) -> bool {
        self.series.contains_key(region)
    }

    /// Region identifiers, sorted.
    pub fn regions(&self) -> Vec<&str> {
        let mut regions: Vec<&str> = self.series.keys().map(String::as_str).collect();
        regions.sort_unstable();
        regions
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Total number of samples across all regions.
    pub fn sample_count(&self) -> usize {
        self.series.values().map(RegionSeries::len).sum()
    }

    #[cfg(test)]
    pub(crate) fn with_series_for_test(region: &str, series: RegionSeries) -> Self {
        let mut index = Self::default();
        index.series.insert(region.to_string(), series);
        index
    }
}

/// Build a [`RegionIndex`] from decoded samples.
///
/// Fails with `DataUnavailable` if any sample carries a non-finite latency or uptime,
/// since such a record cannot have come from a well-formed dataset.
pub fn load(samples: &[Sample]) -> Result<RegionIndex> {
    if let Some((position, sample)) = samples
        .iter()
        .enumerate()
        .find(|(_, s)| !s.latency_ms.is_finite() || !s.uptime_pct.is_finite())
    {
        return Err(LatMetricsError::DataUnavailable(format!(
            "sample {} for region {:?} has a non-finite value",
            position, sample.region
        )));
    }
    Ok(RegionIndex::from_samples(samples))
}

/// Read from `source` and build the index.
pub fn load_from(source: &dyn SampleSource) -> Result<RegionIndex> {
    let samples = source.read_samples()?;
    let index = load(&samples)?;
    tracing::info!(
        source = %source.describe(),
        regions = index.len(),
        samples = index.sample_count(),
        "dataset loaded"
    );
    Ok(index)
}

/// Anything that can produce the raw sample sequence.
pub trait SampleSource: Send + Sync {
    fn read_samples(&self) -> Result<Vec<Sample>>;

    /// Human-readable description used in logs.
    fn describe(&self) -> String;

    /// `true` if the backing data does not exist at all, as opposed to existing but
    /// being unreadable or malformed.
    fn is_missing(&self) -> bool {
        false
    }
}

/// A JSON array of samples on disk.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SampleSource for JsonFileSource {
    fn read_samples(&self) -> Result<Vec<Sample>> {
        let raw = std::fs::read_to_string(&self.path).map_err(|e| {
            LatMetricsError::DataUnavailable(format!("{}: {}", self.path.display(), e))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            LatMetricsError::DataUnavailable(format!("{}: {}", self.path.display(), e))
        })
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn is_missing(&self) -> bool {
        matches!(std::fs::metadata(&self.path), Err(e) if e.kind() == std::io::ErrorKind::NotFound)
    }
}

/// Tries `primary`, then `fallback` if the primary does not exist. A primary that
/// exists but cannot be read or decoded is an error; it is not masked by the fallback.
pub struct FallbackSource {
    primary: Box<dyn SampleSource>,
    fallback: Box<dyn SampleSource>,
}

impl FallbackSource {
    pub fn new(primary: Box<dyn SampleSource>, fallback: Box<dyn SampleSource>) -> Self {
        Self { primary, fallback }
    }
}

impl SampleSource for FallbackSource {
    fn read_samples(&self) -> Result<Vec<Sample>> {
        match self.primary.read_samples() {
            Ok(samples) => Ok(samples),
            Err(primary_err) if !self.primary.is_missing() => Err(primary_err),
            Err(primary_err) => {
                tracing::warn!(
                    primary = %self.primary.describe(),
                    fallback = %self.fallback.describe(),
                    error = %primary_err,
                    "primary dataset missing, trying fallback"
                );
                self.fallback.read_samples()
            }
        }
    }

    fn describe(&self) -> String {
        format!("{} (fallback {})", self.primary.describe(), self.fallback.describe())
    }

    fn is_missing(&self) -> bool {
        self.primary.is_missing() && self.fallback.is_missing()
    }
}

/// Samples held in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticSource(pub Vec<Sample>);

impl SampleSource for StaticSource {
    fn read_samples(&self) -> Result<Vec<Sample>> {
        Ok(self.0.clone())
    }

    fn describe(&self) -> String {
        format!("in-memory ({} samples)", self.0.len())
    }
}
