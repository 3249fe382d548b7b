use crate::config::Timing;
use crate::extraction::RESULTS_FEED;
use crate::scrapers::{bounded, BrowserSurface, SurfaceError};
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

pub const MAPS_URL: &str = "https://www.google.com/maps";

/// Button captions of the consent dialog shown before the map loads
const CONSENT_CAPTIONS: &[&str] = &["accept", "reject", "got it"];

/// Buttons inspected when looking for the consent dialog
const CONSENT_SCAN_LIMIT: usize = 50;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("invalid search URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("could not open the search page: {0}")]
    Navigation(#[source] SurfaceError),

    #[error("no search results appeared: {0}")]
    NoResults(#[source] SurfaceError),
}

/// Maps search URL for a free-text query
pub fn search_url(query: &str) -> Result<Url, SearchError> {
    let mut url = Url::parse(MAPS_URL)?;
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.push("search").push(query.trim());
    }
    Ok(url)
}

/// Load the results for `query` and wait until the results list is rendered.
///
/// Failing here means there is nothing to extract; the caller treats it as fatal.
pub async fn open_search<S: BrowserSurface>(
    surface: &S,
    query: &str,
    timing: &Timing,
) -> Result<(), SearchError> {
    let url = search_url(query)?;
    info!("Opening {}", url);

    bounded(timing.action_timeout * 3, surface.navigate(url.as_str()))
        .await
        .map_err(SearchError::Navigation)?;
    tokio::time::sleep(timing.navigation_settle).await;

    if dismiss_consent(surface, timing).await {
        tokio::time::sleep(timing.activation_settle).await;
    }

    bounded(
        timing.action_timeout * 2,
        surface.wait_for(RESULTS_FEED, timing.action_timeout),
    )
    .await
    .map_err(SearchError::NoResults)?;

    info!("Search results detected. Starting extraction...");
    Ok(())
}

/// Click through a cookie/consent dialog if one is showing
async fn dismiss_consent<S: BrowserSurface>(surface: &S, timing: &Timing) -> bool {
    let limit = timing.action_timeout;
    let buttons = match bounded(limit, surface.find_all("button")).await {
        Ok(buttons) => buttons,
        Err(e) => {
            debug!("No buttons to check for consent: {}", e);
            return false;
        }
    };

    for button in buttons.iter().take(CONSENT_SCAN_LIMIT) {
        let Ok(Some(caption)) = bounded(limit, surface.read_text(button)).await else {
            continue;
        };
        let caption = caption.to_lowercase();
        if CONSENT_CAPTIONS.iter().any(|c| caption.contains(c)) {
            debug!("Dismissing consent dialog via '{}'", caption);
            return bounded(limit, surface.click(button)).await.is_ok();
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::SnapshotSurface;

    #[test]
    fn query_is_encoded_as_a_path_segment() {
        let url = search_url(" coffee near Union Square ").unwrap();
        assert_eq!(url.as_str(), "https://www.google.com/maps/search/coffee%20near%20Union%20Square");
    }

    #[test]
    fn slashes_in_query_stay_inside_the_segment() {
        let url = search_url("24/7 pharmacy").unwrap();
        assert_eq!(url.path(), "/maps/search/24%2F7%20pharmacy");
    }

    #[tokio::test]
    async fn page_with_feed_opens() {
        let surface = SnapshotSurface::from_html(
            r#"<button>Accept all</button><div role="feed"><a href="/maps/place/x">x</a></div>"#,
        );
        assert!(open_search(&surface, "bakery", &Timing::immediate()).await.is_ok());
    }

    #[tokio::test]
    async fn page_without_feed_is_fatal() {
        let surface = SnapshotSurface::from_html("<p>Google Maps can't find bakery</p>");
        let err = open_search(&surface, "bakery", &Timing::immediate()).await.unwrap_err();
        assert!(matches!(err, SearchError::NoResults(_)));
    }
}
