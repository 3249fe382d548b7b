use async_trait::async_trait;
use maps_scout::extraction::{ExtractionSession, LISTING_LINKS};
use maps_scout::scrapers::{BrowserSurface, ElementHandle, SnapshotSurface, SurfaceError, SurfaceResult};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Something the extraction loop did to the page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Navigate(String),
    Click(usize),
    ScrollFeed,
    Close,
}

type ClickHook = Box<dyn FnOnce() + Send>;

/// Fake results page driven by a script.
///
/// `counts` is the listing count before the first scroll and after each
/// following one; the last entry repeats once the script runs out. Clicking a
/// listing opens its panel, which is then served through a [`SnapshotSurface`].
pub struct ScriptedSurface {
    visible: Mutex<usize>,
    growth: Mutex<VecDeque<usize>>,
    panels: HashMap<usize, String>,
    failing_clicks: HashSet<usize>,
    on_click: Mutex<Option<(usize, ClickHook)>>,
    current: Mutex<Option<usize>>,
    events: Mutex<Vec<Event>>,
    closed: AtomicBool,
}

impl ScriptedSurface {
    pub fn new(counts: &[usize]) -> Self {
        let mut growth: VecDeque<usize> = counts.iter().copied().collect();
        let visible = growth.pop_front().unwrap_or(0);
        Self {
            visible: Mutex::new(visible),
            growth: Mutex::new(growth),
            panels: HashMap::new(),
            failing_clicks: HashSet::new(),
            on_click: Mutex::new(None),
            current: Mutex::new(None),
            events: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Serve `html` as the panel of listing `index` instead of the default one
    pub fn with_panel(mut self, index: usize, html: impl Into<String>) -> Self {
        self.panels.insert(index, html.into());
        self
    }

    /// Clicking any of these listings fails
    pub fn with_failing_clicks(mut self, indices: impl IntoIterator<Item = usize>) -> Self {
        self.failing_clicks.extend(indices);
        self
    }

    /// Run `hook` once, as soon as listing `index` is clicked
    pub fn on_click(&self, index: usize, hook: impl FnOnce() + Send + 'static) {
        *self.on_click.lock().unwrap() = Some((index, Box::new(hook)));
    }

    /// Request a cancel on `session` as soon as listing `index` is clicked
    pub fn cancel_on_click(&self, index: usize, session: Arc<ExtractionSession>) {
        self.on_click(index, move || {
            session.request_cancel();
        });
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn clicks(&self) -> Vec<usize> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Click(i) => Some(i),
                _ => None,
            })
            .collect()
    }

    pub fn feed_scrolls(&self) -> usize {
        self.events().iter().filter(|e| **e == Event::ScrollFeed).count()
    }

    pub fn close_count(&self) -> usize {
        self.events().iter().filter(|e| **e == Event::Close).count()
    }

    fn log(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }

    fn ensure_open(&self) -> SurfaceResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            Err(SurfaceError::Closed)
        } else {
            Ok(())
        }
    }

    fn visible(&self) -> usize {
        *self.visible.lock().unwrap()
    }

    fn panel_html(&self, index: usize) -> String {
        self.panels
            .get(&index)
            .cloned()
            .unwrap_or_else(|| super::panel(&format!("Listing {}", index)))
    }

    /// The open detail panel, or an empty page before the first click
    fn open_panel(&self) -> SnapshotSurface {
        let html = match *self.current.lock().unwrap() {
            Some(index) => self.panel_html(index),
            None => "<html></html>".to_string(),
        };
        SnapshotSurface::from_html(html)
    }

    fn listing(&self, handle: &ElementHandle) -> SurfaceResult<usize> {
        if handle.index < self.visible() {
            Ok(handle.index)
        } else {
            Err(SurfaceError::NotFound(handle.selector.clone()))
        }
    }
}

#[async_trait]
impl BrowserSurface for ScriptedSurface {
    async fn navigate(&self, url: &str) -> SurfaceResult<()> {
        self.ensure_open()?;
        self.log(Event::Navigate(url.to_string()));
        Ok(())
    }

    async fn find_all(&self, selector: &str) -> SurfaceResult<Vec<ElementHandle>> {
        self.ensure_open()?;
        if selector == LISTING_LINKS {
            return Ok((0..self.visible()).map(|i| ElementHandle::new(selector, i)).collect());
        }
        self.open_panel().find_all(selector).await
    }

    async fn read_text(&self, handle: &ElementHandle) -> SurfaceResult<Option<String>> {
        self.ensure_open()?;
        if handle.selector == LISTING_LINKS {
            let index = self.listing(handle)?;
            return Ok(Some(format!("Listing {}", index)));
        }
        self.open_panel().read_text(handle).await
    }

    async fn read_attribute(&self, handle: &ElementHandle, name: &str) -> SurfaceResult<Option<String>> {
        self.ensure_open()?;
        if handle.selector == LISTING_LINKS {
            self.listing(handle)?;
            return Ok(None);
        }
        self.open_panel().read_attribute(handle, name).await
    }

    async fn click(&self, handle: &ElementHandle) -> SurfaceResult<()> {
        self.ensure_open()?;
        let index = self.listing(handle)?;
        self.log(Event::Click(index));

        let hook = {
            let mut slot = self.on_click.lock().unwrap();
            match slot.take() {
                Some((at, hook)) if at == index => Some(hook),
                other => {
                    *slot = other;
                    None
                }
            }
        };
        if let Some(hook) = hook {
            hook();
            // Give whatever the hook started a chance to run mid-listing
            tokio::task::yield_now().await;
        }

        if self.failing_clicks.contains(&index) {
            return Err(SurfaceError::Script(format!("listing {} is covered", index)));
        }
        *self.current.lock().unwrap() = Some(index);
        Ok(())
    }

    async fn scroll_into_view(&self, handle: &ElementHandle) -> SurfaceResult<()> {
        self.ensure_open()?;
        self.listing(handle).map(|_| ())
    }

    async fn scroll_panel_to_bottom(&self, _selector: &str) -> SurfaceResult<()> {
        self.ensure_open()?;
        self.log(Event::ScrollFeed);
        if let Some(next) = self.growth.lock().unwrap().pop_front() {
            *self.visible.lock().unwrap() = next;
        }
        Ok(())
    }

    async fn wait_for(&self, _selector: &str, _timeout: Duration) -> SurfaceResult<()> {
        self.ensure_open()
    }

    async fn page_html(&self) -> SurfaceResult<String> {
        self.ensure_open()?;
        self.open_panel().page_html().await
    }

    async fn close(&self) -> bool {
        let first = !self.closed.swap(true, Ordering::SeqCst);
        if first {
            self.log(Event::Close);
        }
        first
    }
}
