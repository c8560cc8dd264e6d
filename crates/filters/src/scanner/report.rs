//! Per-file load outcomes and per-cycle scan reports.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};

/// Outcome of loading a single filter file.
#[derive(Debug, Clone)]
pub struct LoadResult {
    /// Path to the file that was loaded.
    pub path: PathBuf,
    /// Status of the load attempt.
    pub status: LoadStatus,
}

/// Status of a single file load attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadStatus {
    /// A new instance went live.
    Loaded,
    /// Unchanged since the last load, or an abstract template.
    Unchanged,
    /// Compile, instantiation or I/O error. The previous instance, if any, stays live.
    Failed { error: String },
}

/// Everything one scan cycle did.
#[derive(Debug, Clone)]
pub struct ScanReport {
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
    pub results: Vec<LoadResult>,
    /// Roots that could not be resolved this cycle.
    pub unresolved_roots: Vec<String>,
}

impl ScanReport {
    pub(super) fn start() -> Self {
        Self {
            started_at: Utc::now(),
            duration: Duration::ZERO,
            results: Vec::new(),
            unresolved_roots: Vec::new(),
        }
    }

    pub fn loaded(&self) -> usize {
        self.count(|s| matches!(s, LoadStatus::Loaded))
    }

    pub fn unchanged(&self) -> usize {
        self.count(|s| matches!(s, LoadStatus::Unchanged))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, LoadStatus::Failed { .. }))
    }

    /// Whether any filter went live this cycle.
    pub fn changed(&self) -> bool {
        self.loaded() > 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &LoadResult> {
        self.results
            .iter()
            .filter(|r| matches!(r.status, LoadStatus::Failed { .. }))
    }

    fn count(&self, pred: impl Fn(&LoadStatus) -> bool) -> usize {
        self.results.iter().filter(|r| pred(&r.status)).count()
    }
}
