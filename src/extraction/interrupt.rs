use crate::export::{ExportKind, ExportWriter, OutputLayout};
use crate::extraction::ExtractionSession;
use crate::models::ExportContext;
use crate::scrapers::BrowserSurface;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Exit status used when a second Ctrl+C skips the graceful path
pub const FORCED_EXIT_CODE: i32 = 130;

/// Only one handler may own the process's Ctrl+C
static INSTALLED: AtomicBool = AtomicBool::new(false);

/// Ctrl+C path: stop the loop, checkpoint what we have, release the browser.
///
/// Runs at most once. The listing being extracted when the interrupt arrives
/// is finished first; the snapshot and the close only happen once the runner
/// is idle. Nothing in here escalates; a failed checkpoint is only logged.
pub struct InterruptHandler<S: BrowserSurface> {
    session: Arc<ExtractionSession>,
    surface: Arc<S>,
    exporter: Arc<dyn ExportWriter>,
    context: ExportContext,
    layout: OutputLayout,
    fired: AtomicBool,
    in_progress: Mutex<()>,
}

impl<S: BrowserSurface + 'static> InterruptHandler<S> {
    pub fn new(
        session: Arc<ExtractionSession>,
        surface: Arc<S>,
        exporter: Arc<dyn ExportWriter>,
        context: ExportContext,
        layout: OutputLayout,
    ) -> Self {
        Self {
            session,
            surface,
            exporter,
            context,
            layout,
            fired: AtomicBool::new(false),
            in_progress: Mutex::new(()),
        }
    }

    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }

    /// Handle an interrupt. Returns the checkpoint path when one was written.
    ///
    /// A second caller waits for the first to finish and then returns `None`.
    pub async fn handle(&self) -> Option<PathBuf> {
        let _in_progress = self.in_progress.lock().await;
        if self.fired.swap(true, Ordering::SeqCst) {
            debug!("Interrupt already handled");
            return None;
        }

        warn!("🛑 STOPPING EXTRACTION... finishing the current listing, then saving");
        self.session.request_cancel();
        self.session.wait_idle().await;

        let records = self.session.snapshot();
        let saved = if records.is_empty() {
            info!("ℹ️ No data to save");
            None
        } else {
            let path = self.layout.path_for(ExportKind::Stopped, &self.context.search_query);
            match self.exporter.write(&records, &self.context, &path) {
                Ok(()) => {
                    info!("✅ Data saved to {} ({} results)", path.display(), records.len());
                    Some(path)
                }
                Err(e) => {
                    error!("❌ Failed to save checkpoint {}: {}", path.display(), e);
                    None
                }
            }
        };

        self.surface.close().await;
        saved
    }

    /// Bind the handler to Ctrl+C for the rest of the process.
    ///
    /// Returns `None` if a handler was already installed. After the first
    /// interrupt has been handled, a second one exits immediately.
    pub fn install(self: Arc<Self>) -> Option<JoinHandle<()>> {
        if INSTALLED.swap(true, Ordering::SeqCst) {
            warn!("Interrupt handler already installed");
            return None;
        }

        Some(tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl+C: {}. Interrupts will not be handled gracefully.", e);
                return;
            }
            self.handle().await;

            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("\n⚠️  Force exiting (checkpoint may be incomplete).");
                std::process::exit(FORCED_EXIT_CODE);
            }
        }))
    }
}
