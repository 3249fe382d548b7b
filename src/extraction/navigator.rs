use crate::config::Timing;
use crate::extraction::LISTING_LINKS;
use crate::scrapers::{bounded, BrowserSurface};
use std::sync::Arc;
use tracing::{debug, warn};

/// Opens the detail panel of a listing by its position in the results list
pub struct ListingNavigator<S: BrowserSurface> {
    surface: Arc<S>,
    timing: Timing,
}

impl<S: BrowserSurface> ListingNavigator<S> {
    pub fn new(surface: Arc<S>, timing: Timing) -> Self {
        Self { surface, timing }
    }

    /// Scroll listing `index` into view, click it and let the panel settle.
    ///
    /// Returns `false` when the index is outside the currently rendered list
    /// or any step fails. The list grows while we work, so a missing index is
    /// expected and never an error.
    pub async fn activate(&self, index: usize) -> bool {
        let limit = self.timing.action_timeout;

        let listings = match bounded(limit, self.surface.find_all(LISTING_LINKS)).await {
            Ok(listings) => listings,
            Err(e) => {
                warn!("Error clicking listing {}: {}", index, e);
                return false;
            }
        };

        let Some(listing) = listings.into_iter().nth(index) else {
            debug!("Listing {} is not in the visible range", index);
            return false;
        };

        if let Err(e) = bounded(limit, self.surface.scroll_into_view(&listing)).await {
            warn!("Error scrolling to listing {}: {}", index, e);
            return false;
        }
        tokio::time::sleep(self.timing.scroll_into_view_settle).await;

        if let Err(e) = bounded(limit, self.surface.click(&listing)).await {
            warn!("Error clicking listing {}: {}", index, e);
            return false;
        }
        tokio::time::sleep(self.timing.activation_settle).await;

        true
    }
}
