use crate::scrapers::traits::{BrowserSurface, SurfaceResult};
use crate::scrapers::types::{ElementHandle, SurfaceError};
use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::debug;

/// Read-only surface over a saved HTML page.
///
/// Lets the field extractor run offline against a detail panel captured with
/// `--debug-snapshots`. Clicks and scrolls succeed but change nothing.
pub struct SnapshotSurface {
    html: String,
    closed: AtomicBool,
}

impl SnapshotSurface {
    pub fn from_html(html: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            closed: AtomicBool::new(false),
        }
    }

    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let html = std::fs::read_to_string(path)?;
        debug!("Loaded snapshot {} ({} bytes)", path.display(), html.len());
        Ok(Self::from_html(html))
    }

    fn ensure_open(&self) -> SurfaceResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            Err(SurfaceError::Closed)
        } else {
            Ok(())
        }
    }

    fn parse_selector(selector: &str) -> SurfaceResult<Selector> {
        Selector::parse(selector)
            .map_err(|e| SurfaceError::Script(format!("invalid selector '{}': {:?}", selector, e)))
    }

    fn count(&self, selector: &str) -> SurfaceResult<usize> {
        self.ensure_open()?;
        let selector = Self::parse_selector(selector)?;
        let document = Html::parse_document(&self.html);
        let count = document.select(&selector).count();
        Ok(count)
    }

    /// Apply `f` to the element behind `handle`, `None` if it does not exist
    fn with_element<T>(
        &self,
        handle: &ElementHandle,
        f: impl FnOnce(ElementRef<'_>) -> T,
    ) -> SurfaceResult<Option<T>> {
        self.ensure_open()?;
        let selector = Self::parse_selector(&handle.selector)?;
        let document = Html::parse_document(&self.html);
        let found = document.select(&selector).nth(handle.index).map(f);
        Ok(found)
    }
}

fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

#[async_trait]
impl BrowserSurface for SnapshotSurface {
    async fn navigate(&self, _url: &str) -> SurfaceResult<()> {
        self.ensure_open()
    }

    async fn find_all(&self, selector: &str) -> SurfaceResult<Vec<ElementHandle>> {
        let count = self.count(selector)?;
        Ok((0..count).map(|i| ElementHandle::new(selector, i)).collect())
    }

    async fn read_text(&self, handle: &ElementHandle) -> SurfaceResult<Option<String>> {
        let text = self.with_element(handle, element_text)?;
        Ok(text.filter(|t| !t.is_empty()))
    }

    async fn read_attribute(&self, handle: &ElementHandle, name: &str) -> SurfaceResult<Option<String>> {
        let value = self.with_element(handle, |el| el.value().attr(name).map(|v| v.trim().to_string()))?;
        Ok(value.flatten().filter(|v| !v.is_empty()))
    }

    async fn click(&self, handle: &ElementHandle) -> SurfaceResult<()> {
        match self.with_element(handle, |_| ())? {
            Some(()) => Ok(()),
            None => Err(SurfaceError::NotFound(handle.selector.clone())),
        }
    }

    async fn scroll_into_view(&self, handle: &ElementHandle) -> SurfaceResult<()> {
        self.click(handle).await
    }

    async fn scroll_panel_to_bottom(&self, selector: &str) -> SurfaceResult<()> {
        if self.count(selector)? == 0 {
            return Err(SurfaceError::NotFound(selector.to_string()));
        }
        Ok(())
    }

    async fn wait_for(&self, selector: &str, _timeout: Duration) -> SurfaceResult<()> {
        if self.count(selector)? == 0 {
            return Err(SurfaceError::NotFound(selector.to_string()));
        }
        Ok(())
    }

    async fn page_html(&self) -> SurfaceResult<String> {
        self.ensure_open()?;
        Ok(self.html.clone())
    }

    async fn close(&self) -> bool {
        !self.closed.swap(true, Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
          <div role="main">
            <h1 class="DUwDvf">  Blue   Door Cafe </h1>
            <a href="tel:+15551234567" data-item-id="phone:tel:+15551234567">Call</a>
            <button data-item-id="address" aria-label="Address: 1 Main St"></button>
          </div>
        </body></html>
    "#;

    #[tokio::test]
    async fn reads_text_and_attributes() {
        let surface = SnapshotSurface::from_html(PAGE);

        let heading = surface.find("h1.DUwDvf").await.unwrap().unwrap();
        assert_eq!(surface.read_text(&heading).await.unwrap().as_deref(), Some("Blue Door Cafe"));

        let address = surface.find("button[data-item-id]").await.unwrap().unwrap();
        assert_eq!(
            surface.read_attribute(&address, "aria-label").await.unwrap().as_deref(),
            Some("Address: 1 Main St")
        );
        assert_eq!(surface.read_attribute(&address, "href").await.unwrap(), None);
    }

    #[tokio::test]
    async fn missing_elements_are_not_errors() {
        let surface = SnapshotSurface::from_html(PAGE);
        assert!(surface.find("div[role=\"feed\"]").await.unwrap().is_none());
        let stale = ElementHandle::new("h1.DUwDvf", 3);
        assert_eq!(surface.read_text(&stale).await.unwrap(), None);
        assert!(matches!(surface.click(&stale).await, Err(SurfaceError::NotFound(_))));
    }

    #[tokio::test]
    async fn close_is_single_shot() {
        let surface = SnapshotSurface::from_html(PAGE);
        assert!(surface.close().await);
        assert!(!surface.close().await);
        assert!(matches!(surface.find_all("h1").await, Err(SurfaceError::Closed)));
    }
}
