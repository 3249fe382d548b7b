use crate::scrapers::types::{ElementHandle, SurfaceError};
use async_trait::async_trait;
use std::time::Duration;

pub type SurfaceResult<T> = Result<T, SurfaceError>;

/// Browser automation surface the extraction loop drives.
///
/// Handles are positional (`selector` + index into its matches) and only
/// meaningful until the page changes underneath them. Every call may fail with
/// a timeout or not-found outcome; callers never assume success.
#[async_trait]
pub trait BrowserSurface: Send + Sync {
    /// Load a URL in the current tab
    async fn navigate(&self, url: &str) -> SurfaceResult<()>;

    /// All elements currently matching `selector`, in document order
    async fn find_all(&self, selector: &str) -> SurfaceResult<Vec<ElementHandle>>;

    /// First element matching `selector`, if any
    async fn find(&self, selector: &str) -> SurfaceResult<Option<ElementHandle>> {
        Ok(self.find_all(selector).await?.into_iter().next())
    }

    /// Rendered text of an element, `None` when it is gone or empty
    async fn read_text(&self, handle: &ElementHandle) -> SurfaceResult<Option<String>>;

    async fn read_attribute(&self, handle: &ElementHandle, name: &str) -> SurfaceResult<Option<String>>;

    async fn click(&self, handle: &ElementHandle) -> SurfaceResult<()>;

    async fn scroll_into_view(&self, handle: &ElementHandle) -> SurfaceResult<()>;

    /// Scroll a scrollable container to its bottom edge
    async fn scroll_panel_to_bottom(&self, selector: &str) -> SurfaceResult<()>;

    /// Wait until `selector` matches at least one element
    async fn wait_for(&self, selector: &str, timeout: Duration) -> SurfaceResult<()>;

    /// Full page HTML, used for debug snapshots
    async fn page_html(&self) -> SurfaceResult<String>;

    /// Release the surface. Returns `true` only for the call that actually closed it.
    async fn close(&self) -> bool;
}
