use crate::config::Timing;
use crate::extraction::{LISTING_LINKS, RESULTS_FEED};
use crate::scrapers::{bounded, BrowserSurface};
use std::sync::Arc;
use tracing::{debug, warn};

/// Loads more results by scrolling the results list.
///
/// The page never says "this was the last page", so a grown listing count is
/// the only evidence of progress we get.
pub struct PaginationController<S: BrowserSurface> {
    surface: Arc<S>,
    timing: Timing,
}

impl<S: BrowserSurface> PaginationController<S> {
    pub fn new(surface: Arc<S>, timing: Timing) -> Self {
        Self { surface, timing }
    }

    /// Number of listings rendered right now. Always re-queried; a failed
    /// lookup counts as zero.
    pub async fn current_count(&self) -> usize {
        match bounded(self.timing.action_timeout, self.surface.find_all(LISTING_LINKS)).await {
            Ok(listings) => listings.len(),
            Err(e) => {
                debug!("Could not count listings: {}", e);
                0
            }
        }
    }

    /// Scroll the list to the bottom, wait, and report whether the count grew
    pub async fn grow_results(&self) -> bool {
        let before = self.current_count().await;

        if let Err(e) = bounded(
            self.timing.action_timeout,
            self.surface.scroll_panel_to_bottom(RESULTS_FEED),
        )
        .await
        {
            warn!("Error scrolling: {}", e);
            return false;
        }
        tokio::time::sleep(self.timing.scroll_settle).await;

        let after = self.current_count().await;
        debug!("Listing count {} -> {} after scroll", before, after);

        after > before
    }
}
