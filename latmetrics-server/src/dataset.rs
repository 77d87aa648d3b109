use crate::loader::{load_from, RegionIndex, SampleSource};
use arc_swap::ArcSwap;
use latmetrics_common::Result;
use std::sync::Arc;
use std::time::Duration;

/// When the dataset is read from its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadMode {
    /// Load once when the dataset is opened and serve that snapshot.
    #[default]
    Startup,
    /// Read the source on every request; nothing is kept between requests.
    PerRequest,
}

/// Owns the sample source and the currently published [`RegionIndex`] snapshot.
///
/// Readers get an `Arc` to an immutable index. `reload` publishes a new index with an
/// atomic swap, so aggregations already running keep the snapshot they started with.
pub struct Dataset {
    source: Box<dyn SampleSource>,
    mode: LoadMode,
    current: ArcSwap<RegionIndex>,
}

impl Dataset {
    /// Open the dataset. In `Startup` mode the source is read immediately and any
    /// `DataUnavailable` error is returned to the caller.
    pub fn open(source: Box<dyn SampleSource>, mode: LoadMode) -> Result<Self> {
        let initial = match mode {
            LoadMode::Startup => load_from(source.as_ref())?,
            LoadMode::PerRequest => RegionIndex::default(),
        };
        Ok(Self { source, mode, current: ArcSwap::from_pointee(initial) })
    }

    pub fn mode(&self) -> LoadMode {
        self.mode
    }

    /// The index to aggregate against for one request.
    pub fn snapshot(&self) -> Result<Arc<RegionIndex>> {
        match self.mode {
            LoadMode::Startup => Ok(self.current.load_full()),
            LoadMode::PerRequest => load_from(self.source.as_ref()).map(Arc::new),
        }
    }

    /// Re-read the source and publish the result. On failure the previous snapshot stays
    /// in place. Returns the number of regions in the new snapshot.
    pub fn reload(&self) -> Result<usize> {
        let index = load_from(self.source.as_ref())?;
        let regions = index.len();
        self.current.store(Arc::new(index));
        Ok(regions)
    }

    /// Spawn a task that calls [`Dataset::reload`] every `interval`. Each reload runs on
    /// the blocking pool since it reads the source synchronously.
    /// Does nothing useful in `PerRequest` mode, where every request already reloads.
    pub fn spawn_reloader(self: &Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        let dataset = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await; // consume the immediate first tick
            loop {
                ticker.tick().await;
                let target = Arc::clone(&dataset);
                match tokio::task::spawn_blocking(move || target.reload()).await {
                    Ok(Ok(regions)) => tracing::info!(regions, "dataset reloaded"),
                    Ok(Err(err)) => tracing::warn!(error = %err, "dataset reload failed, keeping previous snapshot"),
                    Err(err) => tracing::warn!(error = %err, "dataset reload task failed, keeping previous snapshot"),
                }
            }
        })
    }
}
