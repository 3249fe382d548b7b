//! The extraction loop.
//!
//! [`ExtractionSession`] is the state shared with the interrupt handler; all
//! mutation goes through its methods. [`SessionRunner`] drives the
//! scan / grow cycle against one browser surface until the results stop
//! growing, the result limit is hit, or a cancel is requested.

use crate::config::{ScoutConfig, Timing};
use crate::extraction::{FieldExtractor, ListingNavigator, PaginationController};
use crate::models::ListingRecord;
use crate::scrapers::{bounded, BrowserSurface};
use chrono::Local;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tracing::{debug, info, warn};

#[derive(Debug, Default)]
struct SessionState {
    records: Vec<ListingRecord>,
    processed: HashSet<usize>,
    consecutive_failures: u32,
    no_growth: u32,
}

/// Accumulated results and counters of one search.
///
/// Records keep extraction order. An index lands in the processed set exactly
/// when an attempt was made for it, successful or not, so a position that
/// keeps failing is never retried.
#[derive(Debug)]
pub struct ExtractionSession {
    state: Mutex<SessionState>,
    cancelled: AtomicBool,
    running: watch::Sender<bool>,
}

/// Marks the session as running until dropped, including on panic
pub struct RunGuard<'a> {
    session: &'a ExtractionSession,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.session.running.send_replace(false);
    }
}

impl Default for ExtractionSession {
    fn default() -> Self {
        let (running, _) = watch::channel(false);
        Self {
            state: Mutex::default(),
            cancelled: AtomicBool::new(false),
            running,
        }
    }
}

impl ExtractionSession {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic elsewhere must not cost us the records
    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Ask the loop to stop at its next check. Returns `true` for the first request.
    pub fn request_cancel(&self) -> bool {
        !self.cancelled.swap(true, Ordering::SeqCst)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Flag a run as in progress for as long as the guard lives
    pub fn enter_run(&self) -> RunGuard<'_> {
        self.running.send_replace(true);
        RunGuard { session: self }
    }

    pub fn is_running(&self) -> bool {
        *self.running.borrow()
    }

    /// Resolve once no run is in progress. Immediate when none ever started.
    pub async fn wait_idle(&self) {
        let mut running = self.running.subscribe();
        // The sender lives in `self`, so this cannot see a closed channel
        let _ = running.wait_for(|active| !*active).await;
    }

    pub fn is_processed(&self, index: usize) -> bool {
        self.state().processed.contains(&index)
    }

    /// Claim `index` for an attempt. `false` if it was attempted before.
    pub fn begin_attempt(&self, index: usize) -> bool {
        self.state().processed.insert(index)
    }

    /// Append a record and clear the failure streak.
    ///
    /// A record without a name is refused and counted as a failure instead.
    pub fn record_success(&self, record: ListingRecord) -> bool {
        let mut state = self.state();
        if record.name.trim().is_empty() {
            state.consecutive_failures += 1;
            return false;
        }
        state.records.push(record);
        state.consecutive_failures = 0;
        true
    }

    /// Count a failed listing, returning the current streak
    pub fn record_failure(&self) -> u32 {
        let mut state = self.state();
        state.consecutive_failures += 1;
        state.consecutive_failures
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.state().consecutive_failures
    }

    pub fn reset_failures(&self) {
        self.state().consecutive_failures = 0;
    }

    pub fn record_growth(&self) {
        self.state().no_growth = 0;
    }

    /// Count a pagination attempt that loaded nothing, returning the streak
    pub fn record_no_growth(&self) -> u32 {
        let mut state = self.state();
        state.no_growth += 1;
        state.no_growth
    }

    pub fn record_count(&self) -> usize {
        self.state().records.len()
    }

    pub fn processed_count(&self) -> usize {
        self.state().processed.len()
    }

    /// Copy of everything collected so far, in extraction order
    pub fn snapshot(&self) -> Vec<ListingRecord> {
        self.state().records.clone()
    }
}

/// Why a run ended on its own
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    /// Pagination stopped producing new listings
    Exhausted,
    /// The results list was empty at the start of a pass
    EmptyResults,
    /// The configured result limit was reached
    LimitReached,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    Terminated(TerminationReason),
    Cancelled,
}

/// Outcome of [`SessionRunner::run`]
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub end: SessionEnd,
    pub records: Vec<ListingRecord>,
    pub passes: usize,
    pub attempted: usize,
}

impl SessionReport {
    pub fn was_cancelled(&self) -> bool {
        self.end == SessionEnd::Cancelled
    }

    /// The search came back empty: the first pass found no listing to visit
    pub fn found_nothing(&self) -> bool {
        self.end == SessionEnd::Terminated(TerminationReason::EmptyResults) && self.attempted == 0
    }
}

/// Thresholds and waits for one run
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Failure streak above which a recovery scroll is tried
    pub max_consecutive_failures: u32,
    /// Pagination attempts in a row without growth that end the run
    pub max_no_growth: u32,
    pub max_results: Option<usize>,
    pub timing: Timing,
    /// Where to save the page when a panel yields no name
    pub debug_snapshot_dir: Option<PathBuf>,
}

impl SessionSettings {
    pub fn from_config(config: &ScoutConfig) -> Self {
        Self {
            max_consecutive_failures: config.session.max_consecutive_failures,
            max_no_growth: config.session.max_no_growth,
            max_results: config.session.max_results,
            timing: config.timing(),
            debug_snapshot_dir: None,
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from_config(&ScoutConfig::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Scanning,
    Growing,
    Terminated(TerminationReason),
    Cancelled,
}

/// Drives navigator, extractor and pagination over one shared surface
pub struct SessionRunner<S: BrowserSurface> {
    session: Arc<ExtractionSession>,
    surface: Arc<S>,
    navigator: ListingNavigator<S>,
    extractor: FieldExtractor<S>,
    pagination: PaginationController<S>,
    settings: SessionSettings,
}

impl<S: BrowserSurface> SessionRunner<S> {
    pub fn new(surface: Arc<S>, session: Arc<ExtractionSession>, settings: SessionSettings) -> Self {
        let timing = settings.timing;
        Self {
            navigator: ListingNavigator::new(Arc::clone(&surface), timing),
            extractor: FieldExtractor::new(Arc::clone(&surface), timing),
            pagination: PaginationController::new(Arc::clone(&surface), timing),
            surface,
            session,
            settings,
        }
    }

    /// Run until the results are exhausted or a cancel is observed
    pub async fn run(&self) -> SessionReport {
        let _running = self.session.enter_run();
        info!("Extraction in progress, press Ctrl+C at any time to stop and save");

        let mut phase = Phase::Scanning;
        let mut passes = 0;

        let end = loop {
            phase = match phase {
                Phase::Scanning => {
                    passes += 1;
                    self.scan().await
                }
                Phase::Growing => self.grow().await,
                Phase::Terminated(reason) => break SessionEnd::Terminated(reason),
                Phase::Cancelled => break SessionEnd::Cancelled,
            };
        };

        let records = self.session.snapshot();
        match end {
            SessionEnd::Terminated(reason) => {
                info!("Extraction finished ({:?}): {} results", reason, records.len())
            }
            SessionEnd::Cancelled => info!("Extraction cancelled with {} results", records.len()),
        }

        SessionReport {
            end,
            records,
            passes,
            attempted: self.session.processed_count(),
        }
    }

    fn limit_reached(&self) -> bool {
        self.settings
            .max_results
            .is_some_and(|limit| self.session.record_count() >= limit)
    }

    /// One sweep over every listing rendered at the start of the pass
    async fn scan(&self) -> Phase {
        if self.session.is_cancelled() {
            return Phase::Cancelled;
        }

        let total = self.pagination.current_count().await;
        if total == 0 {
            warn!("No listings found!");
            return Phase::Terminated(TerminationReason::EmptyResults);
        }

        for index in 0..total {
            if self.session.is_cancelled() {
                info!("Stopping extraction as requested...");
                return Phase::Cancelled;
            }
            if self.limit_reached() {
                return Phase::Terminated(TerminationReason::LimitReached);
            }
            if self.session.is_processed(index) {
                continue;
            }

            info!(
                "Processing listing {}/{} (Total extracted: {})",
                index + 1,
                total,
                self.session.record_count()
            );
            if let Some(reason) = self.visit(index).await {
                return Phase::Terminated(reason);
            }
        }

        if self.session.is_cancelled() {
            return Phase::Cancelled;
        }
        if self.limit_reached() {
            return Phase::Terminated(TerminationReason::LimitReached);
        }
        Phase::Growing
    }

    /// Navigate to one listing and extract it. A recovery scroll that
    /// exhausts the results ends the run.
    async fn visit(&self, index: usize) -> Option<TerminationReason> {
        if !self.session.begin_attempt(index) {
            return None;
        }

        if self.navigator.activate(index).await {
            let fields = self.extractor.extract_current().await;
            match fields.into_record() {
                Some(record) => {
                    self.session.record_success(record);
                }
                None => {
                    warn!("No data extracted for listing {}", index + 1);
                    self.save_debug_snapshot(index).await;
                    self.session.record_failure();
                }
            }
        } else {
            self.session.record_failure();
        }

        if self.session.consecutive_failures() > self.settings.max_consecutive_failures {
            // Usually an overlay or stale list; a scroll tends to shake it loose
            info!("Multiple failures, trying to scroll for more results...");
            self.session.reset_failures();
            let grew = self.pagination.grow_results().await;
            return self.note_growth(grew);
        }
        None
    }

    /// Feed a pagination outcome into the no-growth streak
    fn note_growth(&self, grew: bool) -> Option<TerminationReason> {
        if grew {
            self.session.record_growth();
            info!("New results loaded, continuing extraction...");
            return None;
        }

        let misses = self.session.record_no_growth();
        info!(
            "No new results loaded this time ({}/{})",
            misses, self.settings.max_no_growth
        );
        if misses >= self.settings.max_no_growth {
            info!("No more results available. Extraction complete!");
            return Some(TerminationReason::Exhausted);
        }
        None
    }

    /// Ask for more results after a full pass
    async fn grow(&self) -> Phase {
        if self.session.is_cancelled() {
            return Phase::Cancelled;
        }

        info!(
            "Scrolling to load more results... (Total extracted so far: {})",
            self.session.record_count()
        );

        let grew = self.pagination.grow_results().await;
        if let Some(reason) = self.note_growth(grew) {
            return Phase::Terminated(reason);
        }

        tokio::time::sleep(self.settings.timing.pass_delay).await;
        Phase::Scanning
    }

    async fn save_debug_snapshot(&self, index: usize) {
        let Some(dir) = &self.settings.debug_snapshot_dir else {
            return;
        };

        let html = match bounded(self.settings.timing.action_timeout, self.surface.page_html()).await {
            Ok(html) => html,
            Err(e) => {
                debug!("Could not capture page for listing {}: {}", index + 1, e);
                return;
            }
        };

        let path = dir.join(format!(
            "listing_{}_{}.html",
            index + 1,
            Local::now().format("%Y%m%d_%H%M%S")
        ));
        let written = async {
            tokio::fs::create_dir_all(dir).await?;
            tokio::fs::write(&path, html).await
        }
        .await;

        match written {
            Ok(()) => info!("Saved page HTML to {}", path.display()),
            Err(e) => warn!("Could not save debug snapshot {}: {}", path.display(), e),
        }
    }
}
