//! [`FilterScanner`]: interval-driven directory polling on a dedicated thread.

use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, RwLock};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use sieve_core::{FilterConfig, FilterError, Result};

use crate::loader::FilterLoader;
use crate::sync::{lock, read, write};

use super::discovery::{discover_files, FilenameFilter};
use super::report::{LoadResult, LoadStatus, ScanReport};
use super::resolver::{FsResolver, ResourceResolver};

/// Builder for [`FilterScanner`].
pub struct ScannerBuilder {
    loader: Arc<FilterLoader>,
    roots: Vec<String>,
    interval: Duration,
    resolver: Arc<dyn ResourceResolver>,
    filename_filter: FilenameFilter,
}

impl ScannerBuilder {
    pub fn new(loader: Arc<FilterLoader>) -> Self {
        Self {
            loader,
            roots: Vec::new(),
            interval: Duration::from_secs(5),
            resolver: Arc::new(FsResolver::new()),
            filename_filter: FilenameFilter::default(),
        }
    }

    /// Roots, poll interval, resource fallback and extensions from config.
    pub fn from_config(loader: Arc<FilterLoader>, config: &FilterConfig) -> Self {
        Self::new(loader)
            .roots(config.roots.iter().cloned())
            .interval(config.poll_interval())
            .resolver(FsResolver::with_resource_dirs(config.resource_dirs.iter().cloned()))
            .filename_filter(FilenameFilter::extensions(&config.extensions))
    }

    pub fn root(mut self, root: impl Into<String>) -> Self {
        self.roots.push(root.into());
        self
    }

    pub fn roots(mut self, roots: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.roots.extend(roots.into_iter().map(Into::into));
        self
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn resolver(mut self, resolver: impl ResourceResolver + 'static) -> Self {
        self.resolver = Arc::new(resolver);
        self
    }

    pub fn filename_filter(mut self, filter: FilenameFilter) -> Self {
        self.filename_filter = filter;
        self
    }

    /// Resolve every root, run one full scan, then start the poller thread.
    ///
    /// An unresolvable root or a zero interval is a [`FilterError::Config`];
    /// per-file failures in the initial scan are only reported.
    pub fn init(self) -> Result<FilterScanner> {
        if self.interval.is_zero() {
            return Err(FilterError::Config("poll interval must be positive".to_string()));
        }
        if self.roots.is_empty() {
            warn!("filter scanner started without any roots");
        }
        for root in &self.roots {
            self.resolver.resolve(root)?;
        }

        let shared = Arc::new(ScannerState {
            loader: self.loader,
            roots: self.roots,
            interval: self.interval,
            resolver: self.resolver,
            filename_filter: self.filename_filter,
            running: AtomicBool::new(true),
            cycles: AtomicU64::new(0),
            last_report: RwLock::new(None),
        });

        let report = shared.run_cycle();
        info!(
            loaded = report.loaded(),
            failed = report.failed(),
            filters = shared.loader.len(),
            "initial filter scan complete"
        );

        let (stop_tx, stop_rx) = mpsc::channel();
        let poller_state = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name("filter-poller".to_string())
            .spawn(move || poller_state.poll(stop_rx))
            .map_err(|e| FilterError::Config(format!("failed to spawn filter poller: {e}")))?;

        Ok(FilterScanner {
            shared,
            stop_tx: Mutex::new(Some(stop_tx)),
            poller: Mutex::new(Some(handle)),
        })
    }
}

/// Periodically discovers filter files and feeds them to a [`FilterLoader`].
///
/// Dropping the scanner signals shutdown without waiting for the poller.
pub struct FilterScanner {
    shared: Arc<ScannerState>,
    stop_tx: Mutex<Option<mpsc::Sender<()>>>,
    poller: Mutex<Option<JoinHandle<()>>>,
}

impl FilterScanner {
    pub fn builder(loader: Arc<FilterLoader>) -> ScannerBuilder {
        ScannerBuilder::new(loader)
    }

    /// Start polling `roots` every `interval_seconds` with default collaborators.
    pub fn init(
        loader: Arc<FilterLoader>,
        interval_seconds: u64,
        roots: impl IntoIterator<Item = impl Into<String>>,
    ) -> Result<Self> {
        ScannerBuilder::new(loader)
            .interval(Duration::from_secs(interval_seconds))
            .roots(roots)
            .init()
    }

    /// Run one scan cycle on the calling thread.
    pub fn scan_now(&self) -> ScanReport {
        self.shared.run_cycle()
    }

    /// Stop future cycles. A cycle already in progress runs to completion.
    pub fn shutdown(&self) {
        if self.shared.running.swap(false, Ordering::AcqRel) {
            info!("filter scanner shutdown requested");
        }
        // Dropping the sender wakes the poller out of its sleep.
        lock(&self.stop_tx).take();
    }

    /// Shut down and wait for the poller thread to exit.
    pub fn join(&self) {
        self.shutdown();
        if let Some(handle) = lock(&self.poller).take() {
            if handle.join().is_err() {
                error!("filter poller thread panicked");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// Completed scan cycles, including the initial one.
    pub fn cycles(&self) -> u64 {
        self.shared.cycles.load(Ordering::Acquire)
    }

    pub fn last_report(&self) -> Option<ScanReport> {
        read(&self.shared.last_report).clone()
    }

    pub fn loader(&self) -> &Arc<FilterLoader> {
        &self.shared.loader
    }

    pub fn interval(&self) -> Duration {
        self.shared.interval
    }
}

impl Drop for FilterScanner {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// State shared between the scanner handle and the poller thread.
struct ScannerState {
    loader: Arc<FilterLoader>,
    roots: Vec<String>,
    interval: Duration,
    resolver: Arc<dyn ResourceResolver>,
    filename_filter: FilenameFilter,
    running: AtomicBool,
    cycles: AtomicU64,
    last_report: RwLock<Option<ScanReport>>,
}

impl ScannerState {
    /// Poller loop. The running flag is only consulted between cycles.
    fn poll(&self, stop_rx: mpsc::Receiver<()>) {
        debug!(interval = ?self.interval, "filter poller started");
        while self.running.load(Ordering::Acquire) {
            match stop_rx.recv_timeout(self.interval) {
                Err(RecvTimeoutError::Timeout) => {}
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
            if !self.running.load(Ordering::Acquire) {
                break;
            }

            // A panicking collaborator ends this cycle, not the loop.
            if panic::catch_unwind(AssertUnwindSafe(|| self.run_cycle())).is_err() {
                error!("filter scan cycle panicked");
            }
        }
        info!("filter poller stopped");
    }

    fn run_cycle(&self) -> ScanReport {
        let started = Instant::now();
        let mut report = ScanReport::start();

        for path in self.collect_files(&mut report) {
            let status = match self.loader.load_from_file(&path) {
                Ok(true) => LoadStatus::Loaded,
                Ok(false) => LoadStatus::Unchanged,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to load filter file");
                    LoadStatus::Failed { error: e.to_string() }
                }
            };
            report.results.push(LoadResult { path, status });
        }

        report.duration = started.elapsed();
        if report.changed() || report.failed() > 0 {
            info!(
                loaded = report.loaded(),
                failed = report.failed(),
                filters = self.loader.len(),
                "filter scan cycle finished"
            );
        }

        self.cycles.fetch_add(1, Ordering::AcqRel);
        *write(&self.last_report) = Some(report.clone());
        report
    }

    /// Files of every root in discovery order. Roots that stopped resolving
    /// since init are logged and skipped for this cycle.
    fn collect_files(&self, report: &mut ScanReport) -> Vec<PathBuf> {
        let mut files = Vec::new();
        for root in &self.roots {
            match self.resolver.resolve(root) {
                Ok(dir) => files.extend(discover_files(&dir, &self.filename_filter)),
                Err(e) => {
                    error!(root = %root, error = %e, "filter root unavailable");
                    report.unresolved_roots.push(root.clone());
                }
            }
        }
        files
    }
}
