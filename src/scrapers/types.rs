use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Positional reference to an element: the `index`-th match of `selector`.
///
/// Not a stable identity. The page can re-render between two calls, so a
/// handle is only trusted within the visible-count snapshot it came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementHandle {
    pub selector: String,
    pub index: usize,
}

impl ElementHandle {
    pub fn new(selector: impl Into<String>, index: usize) -> Self {
        Self {
            selector: selector.into(),
            index,
        }
    }
}

/// Failures reported by a [`BrowserSurface`](crate::scrapers::BrowserSurface)
#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("no element matches '{0}'")]
    NotFound(String),

    #[error("browser surface is closed")]
    Closed,

    #[error("browser script failed: {0}")]
    Script(String),

    #[error("failed to launch browser: {0}")]
    Launch(String),
}

/// Run a surface call with a hard upper bound on how long it may take
pub async fn bounded<T, F>(limit: Duration, call: F) -> Result<T, SurfaceError>
where
    F: Future<Output = Result<T, SurfaceError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(SurfaceError::Timeout(limit)),
    }
}
