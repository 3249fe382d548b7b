use crate::config::BrowserConfig;
use crate::scrapers::traits::{BrowserSurface, SurfaceResult};
use crate::scrapers::types::{ElementHandle, SurfaceError};
use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// A running Chrome process and the tab we drive
struct ChromeSession {
    browser: Browser,
    tab: Arc<Tab>,
}

/// Browser surface backed by headless_chrome.
///
/// headless_chrome is blocking, so every call runs on tokio's blocking pool.
/// The session mutex is held until the blocking work returns, even when the
/// caller has given up on it: interactions are strictly one at a time, and
/// `close()` waits for an in-flight call to finish.
pub struct ChromeSurface {
    session: Arc<Mutex<Option<ChromeSession>>>,
}

/// Run `op` on the blocking pool against the value in `slot`.
///
/// The owned guard moves into the blocking task, so dropping this future
/// (a timeout in `bounded`) does not release the lock early.
async fn run_locked<S, T, F>(slot: &Arc<Mutex<Option<S>>>, op: F) -> SurfaceResult<T>
where
    S: Send + 'static,
    T: Send + 'static,
    F: FnOnce(&S) -> anyhow::Result<T> + Send + 'static,
{
    let guard = Arc::clone(slot).lock_owned().await;
    if guard.is_none() {
        return Err(SurfaceError::Closed);
    }

    let outcome = tokio::task::spawn_blocking(move || guard.as_ref().map(op))
        .await
        .map_err(|e| SurfaceError::Script(format!("browser task failed: {}", e)))?
        .ok_or(SurfaceError::Closed)?;

    outcome.map_err(|e| SurfaceError::Script(e.to_string()))
}

impl ChromeSurface {
    /// Launch Chrome and open the tab used for the whole run
    pub fn launch(config: &BrowserConfig) -> Result<Self, SurfaceError> {
        info!("Launching Chrome (headless: {})...", config.headless);

        let in_container = std::env::var("MAPS_SCOUT_CONTAINER").is_ok()
            || Path::new("/.dockerenv").exists();
        let chrome_path = config
            .chrome_path
            .clone()
            .or_else(|| std::env::var("CHROME_PATH").ok().map(PathBuf::from));

        if in_container && config.sandbox {
            debug!("Container detected, disabling Chrome sandbox");
        }

        let options = LaunchOptions::default_builder()
            .headless(config.headless)
            .sandbox(config.sandbox && !in_container)
            .window_size(Some((config.window_width, config.window_height)))
            .path(chrome_path)
            .build()
            .map_err(|e| SurfaceError::Launch(format!("invalid launch options: {}", e)))?;

        let browser = Browser::new(options).map_err(|e| SurfaceError::Launch(e.to_string()))?;
        let tab = browser
            .new_tab()
            .map_err(|e| SurfaceError::Launch(format!("could not open tab: {}", e)))?;

        Ok(Self {
            session: Arc::new(Mutex::new(Some(ChromeSession { browser, tab }))),
        })
    }

    /// Run a blocking operation against the tab
    async fn with_tab<T, F>(&self, op: F) -> SurfaceResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Tab) -> anyhow::Result<T> + Send + 'static,
    {
        run_locked(&self.session, move |session: &ChromeSession| op(&session.tab)).await
    }

    async fn eval(&self, script: String) -> SurfaceResult<Value> {
        self.with_tab(move |tab| {
            let remote = tab.evaluate(&script, false)?;
            Ok(remote.value.unwrap_or(Value::Null))
        })
        .await
    }

    /// Evaluate `body` with `el` bound to the handle's element.
    /// The script yields `null` when the element no longer exists.
    async fn eval_on(&self, handle: &ElementHandle, body: &str) -> SurfaceResult<Value> {
        let script = format!(
            "(() => {{ const el = document.querySelectorAll({})[{}]; if (!el) return null; {} }})()",
            js_string(&handle.selector),
            handle.index,
            body
        );
        self.eval(script).await
    }
}

/// Quote a Rust string as a JavaScript string literal
fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

fn non_empty_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        _ => None,
    }
}

#[async_trait]
impl BrowserSurface for ChromeSurface {
    async fn navigate(&self, url: &str) -> SurfaceResult<()> {
        debug!("Navigating to {}", url);
        let url = url.to_string();
        self.with_tab(move |tab| {
            tab.navigate_to(&url)?;
            tab.wait_until_navigated()?;
            Ok(())
        })
        .await
    }

    async fn find_all(&self, selector: &str) -> SurfaceResult<Vec<ElementHandle>> {
        let script = format!("document.querySelectorAll({}).length", js_string(selector));
        let count = self.eval(script).await?.as_u64().unwrap_or(0) as usize;
        Ok((0..count).map(|i| ElementHandle::new(selector, i)).collect())
    }

    async fn read_text(&self, handle: &ElementHandle) -> SurfaceResult<Option<String>> {
        let value = self.eval_on(handle, "return el.innerText || el.textContent || '';").await?;
        Ok(non_empty_string(value))
    }

    async fn read_attribute(&self, handle: &ElementHandle, name: &str) -> SurfaceResult<Option<String>> {
        let body = format!("return el.getAttribute({});", js_string(name));
        let value = self.eval_on(handle, &body).await?;
        Ok(non_empty_string(value))
    }

    async fn click(&self, handle: &ElementHandle) -> SurfaceResult<()> {
        let value = self.eval_on(handle, "el.click(); return true;").await?;
        if value.is_null() {
            return Err(SurfaceError::NotFound(handle.selector.clone()));
        }
        Ok(())
    }

    async fn scroll_into_view(&self, handle: &ElementHandle) -> SurfaceResult<()> {
        let value = self
            .eval_on(handle, "el.scrollIntoView({block: 'center'}); return true;")
            .await?;
        if value.is_null() {
            return Err(SurfaceError::NotFound(handle.selector.clone()));
        }
        Ok(())
    }

    async fn scroll_panel_to_bottom(&self, selector: &str) -> SurfaceResult<()> {
        let script = format!(
            "(() => {{ const p = document.querySelector({}); if (!p) return false; p.scrollTop = p.scrollHeight; return true; }})()",
            js_string(selector)
        );
        match self.eval(script).await? {
            Value::Bool(true) => Ok(()),
            _ => Err(SurfaceError::NotFound(selector.to_string())),
        }
    }

    async fn wait_for(&self, selector: &str, timeout: Duration) -> SurfaceResult<()> {
        let owned = selector.to_string();
        self.with_tab(move |tab| {
            tab.wait_for_element_with_custom_timeout(&owned, timeout)?;
            Ok(())
        })
        .await
        .map_err(|e| match e {
            SurfaceError::Script(msg) => {
                debug!("wait_for '{}' failed: {}", selector, msg);
                SurfaceError::NotFound(selector.to_string())
            }
            other => other,
        })
    }

    async fn page_html(&self) -> SurfaceResult<String> {
        let value = self.eval("document.documentElement.outerHTML".to_string()).await?;
        Ok(value.as_str().unwrap_or("").to_string())
    }

    async fn close(&self) -> bool {
        let mut guard = self.session.lock().await;
        match guard.take() {
            Some(session) => {
                // Dropping the Browser terminates the Chrome process
                let ChromeSession { browser, tab } = session;
                if let Err(e) = tab.close(true) {
                    warn!("Tab did not close cleanly: {}", e);
                }
                drop(browser);
                info!("🔒 Browser closed");
                true
            }
            None => false,
        }
    }
}
