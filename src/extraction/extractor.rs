use crate::config::Timing;
use crate::extraction::parse;
use crate::models::PanelFields;
use crate::scrapers::{bounded, BrowserSurface};
use std::sync::Arc;
use tracing::{debug, info};

/// Where a strategy reads its raw text from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// Rendered text of the first element matching the selector
    Text(&'static str),
    /// Attribute of the first element matching the selector
    Attribute(&'static str, &'static str),
    /// `aria-label` of detail buttons whose id or label mentions the keyword
    InfoLabel(&'static str),
    /// Rendered text of detail buttons whose id or label mentions the keyword
    InfoText(&'static str),
}

/// One way of obtaining a field: read `source`, then `parse` it
pub struct Strategy<T> {
    pub source: Source,
    pub parse: fn(&str) -> Option<T>,
}

const fn strategy<T>(source: Source, parse: fn(&str) -> Option<T>) -> Strategy<T> {
    Strategy { source, parse }
}

/// Buttons and links in the detail panel that carry phone/website/address
pub const INFO_BUTTONS: &str = "button[data-item-id], button[data-tooltip], a[data-item-id]";

pub const NAME: &[Strategy<String>] = &[
    strategy(Source::Text("h1.DUwDvf.fontHeadlineLarge"), parse::non_empty),
    strategy(Source::Text("h1[class*=\"fontHeadlineLarge\"]"), parse::non_empty),
    strategy(Source::Text("h1.DUwDvf"), parse::non_empty),
    strategy(Source::Text("[role=\"main\"] h1"), parse::non_empty),
];

pub const CATEGORY: &[Strategy<String>] = &[
    strategy(Source::Text("button[jsaction*=\"category\"] .DkEaL"), parse::non_empty),
    strategy(Source::Text(".DkEaL"), parse::non_empty),
];

pub const PHONE: &[Strategy<String>] = &[
    strategy(Source::InfoLabel("phone"), parse::label_value),
    strategy(Source::InfoText("phone"), parse::phone),
    strategy(Source::Attribute("a[href^=\"tel:\"]", "href"), parse::tel_href),
];

pub const WEBSITE: &[Strategy<String>] = &[
    strategy(Source::InfoText("website"), parse::website),
    strategy(Source::InfoLabel("website"), website_label),
];

pub const ADDRESS: &[Strategy<String>] = &[
    strategy(Source::InfoLabel("address"), parse::label_value),
    strategy(Source::InfoText("address"), parse::non_empty),
];

pub const RATING: &[Strategy<f64>] = &[
    strategy(
        Source::Attribute("span[role=\"img\"][aria-label*=\"stars\"]", "aria-label"),
        parse::rating,
    ),
    strategy(Source::Text("span.MW4etd"), parse::rating),
];

pub const REVIEWS: &[Strategy<u64>] = &[
    strategy(Source::Text("span.UY7F9 a span"), parse::review_count),
    strategy(Source::Text(".UY7F9"), parse::review_count),
];

pub const HOURS: &[Strategy<String>] = &[
    strategy(Source::Text("[data-item-id=\"oh\"] .fontBodyMedium"), parse::non_empty),
    strategy(Source::Text(".t39EBf .fontBodyMedium"), parse::non_empty),
];

pub const PRICE_LEVEL: &[Strategy<String>] = &[
    strategy(Source::Attribute("span[aria-label*=\"Price\"]", "aria-label"), parse::price_level),
    strategy(Source::Text("span[aria-label*=\"Price\"]"), parse::price_level),
    strategy(Source::Text(".mgr77e .fontBodyMedium"), parse::price_level),
];

pub const EMAIL: &[Strategy<String>] = &[strategy(Source::Text("div[role=\"main\"]"), parse::email)];

fn website_label(label: &str) -> Option<String> {
    parse::label_value(label).and_then(|value| parse::website(&value))
}

/// What we know about one detail button
#[derive(Debug, Clone, Default)]
struct InfoButton {
    key: String,
    aria_label: Option<String>,
    text: Option<String>,
}

impl InfoButton {
    fn mentions(&self, keyword: &str) -> bool {
        self.key.contains(keyword)
    }
}

/// Reads raw values out of the currently open detail panel.
///
/// Every surface error is logged and becomes "nothing here".
struct PanelReader<'a, S: BrowserSurface> {
    surface: &'a S,
    timing: &'a Timing,
    info_buttons: Option<Vec<InfoButton>>,
}

impl<'a, S: BrowserSurface> PanelReader<'a, S> {
    fn new(surface: &'a S, timing: &'a Timing) -> Self {
        Self {
            surface,
            timing,
            info_buttons: None,
        }
    }

    async fn text_of(&self, selector: &str) -> Option<String> {
        let limit = self.timing.action_timeout;
        let handle = match bounded(limit, self.surface.find(selector)).await {
            Ok(Some(handle)) => handle,
            Ok(None) => return None,
            Err(e) => {
                debug!("Lookup of '{}' failed: {}", selector, e);
                return None;
            }
        };
        bounded(limit, self.surface.read_text(&handle))
            .await
            .unwrap_or_else(|e| {
                debug!("Reading text of '{}' failed: {}", selector, e);
                None
            })
    }

    async fn attribute_of(&self, selector: &str, name: &str) -> Option<String> {
        let limit = self.timing.action_timeout;
        let handle = match bounded(limit, self.surface.find(selector)).await {
            Ok(Some(handle)) => handle,
            Ok(None) => return None,
            Err(e) => {
                debug!("Lookup of '{}' failed: {}", selector, e);
                return None;
            }
        };
        bounded(limit, self.surface.read_attribute(&handle, name))
            .await
            .unwrap_or_else(|e| {
                debug!("Reading {} of '{}' failed: {}", name, selector, e);
                None
            })
    }

    async fn info_buttons(&mut self) -> &[InfoButton] {
        if self.info_buttons.is_none() {
            let buttons = self.load_info_buttons().await;
            self.info_buttons = Some(buttons);
        }
        self.info_buttons.as_deref().unwrap_or(&[])
    }

    async fn load_info_buttons(&self) -> Vec<InfoButton> {
        let limit = self.timing.action_timeout;
        let handles = match bounded(limit, self.surface.find_all(INFO_BUTTONS)).await {
            Ok(handles) => handles,
            Err(e) => {
                debug!("Could not list detail buttons: {}", e);
                return Vec::new();
            }
        };

        let mut buttons = Vec::with_capacity(handles.len());
        for handle in &handles {
            let item_id = bounded(limit, self.surface.read_attribute(handle, "data-item-id"))
                .await
                .ok()
                .flatten();
            let aria_label = bounded(limit, self.surface.read_attribute(handle, "aria-label"))
                .await
                .ok()
                .flatten();
            let text = bounded(limit, self.surface.read_text(handle)).await.ok().flatten();

            let key = format!(
                "{} {}",
                item_id.as_deref().unwrap_or(""),
                aria_label.as_deref().unwrap_or("")
            )
            .to_lowercase();

            buttons.push(InfoButton { key, aria_label, text });
        }
        buttons
    }

    /// Candidate raw values for a source, best first
    async fn candidates(&mut self, source: Source) -> Vec<String> {
        match source {
            Source::Text(selector) => self.text_of(selector).await.into_iter().collect(),
            Source::Attribute(selector, name) => self.attribute_of(selector, name).await.into_iter().collect(),
            Source::InfoLabel(keyword) => self
                .info_buttons()
                .await
                .iter()
                .filter(|b| b.mentions(keyword))
                .filter_map(|b| b.aria_label.clone())
                .collect(),
            Source::InfoText(keyword) => self
                .info_buttons()
                .await
                .iter()
                .filter(|b| b.mentions(keyword))
                .filter_map(|b| b.text.clone())
                .collect(),
        }
    }

    /// Walk the strategies in order; the first one that parses wins
    async fn first_match<T>(&mut self, field: &str, strategies: &[Strategy<T>]) -> Option<T> {
        for strategy in strategies {
            for raw in self.candidates(strategy.source).await {
                if let Some(value) = (strategy.parse)(&raw) {
                    return Some(value);
                }
            }
        }
        debug!("No value found for {}", field);
        None
    }
}

/// Pulls a [`PanelFields`] out of whatever detail panel is currently open
pub struct FieldExtractor<S: BrowserSurface> {
    surface: Arc<S>,
    timing: Timing,
}

impl<S: BrowserSurface> FieldExtractor<S> {
    pub fn new(surface: Arc<S>, timing: Timing) -> Self {
        Self { surface, timing }
    }

    /// Extract every field from the open panel. Never fails; fields that
    /// cannot be read are left unset.
    pub async fn extract_current(&self) -> PanelFields {
        // Give the panel time to populate
        tokio::time::sleep(self.timing.panel_settle).await;

        let mut reader = PanelReader::new(self.surface.as_ref(), &self.timing);

        let fields = PanelFields {
            name: reader.first_match("name", NAME).await,
            category: reader.first_match("category", CATEGORY).await,
            phone: reader.first_match("phone", PHONE).await,
            website: reader.first_match("website", WEBSITE).await,
            address: reader.first_match("address", ADDRESS).await,
            rating: reader.first_match("rating", RATING).await,
            reviews_count: reader.first_match("reviews", REVIEWS).await,
            hours: reader.first_match("hours", HOURS).await,
            price_level: reader.first_match("price level", PRICE_LEVEL).await,
            email: reader.first_match("email", EMAIL).await,
        };

        info!(
            "Extracted: {} - Phone: {}",
            fields.name.as_deref().unwrap_or("Unknown"),
            fields.phone.as_deref().unwrap_or("N/A")
        );

        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::SnapshotSurface;

    fn extractor(html: &str) -> FieldExtractor<SnapshotSurface> {
        FieldExtractor::new(Arc::new(SnapshotSurface::from_html(html)), Timing::immediate())
    }

    const FULL_PANEL: &str = r#"
        <html><body><div role="main">
          <h1 class="DUwDvf fontHeadlineLarge">Blue Door Cafe</h1>
          <span role="img" aria-label="4.6 stars"></span>
          <span class="UY7F9"><a><span>(1,234)</span></a></span>
          <button jsaction="pane.category"><span class="DkEaL">Coffee shop</span></button>
          <span aria-label="Price: $$">$$</span>
          <button data-item-id="address" aria-label="Address: 1 Main St, Springfield">1 Main St</button>
          <a data-item-id="authority" aria-label="Website: bluedoor.cafe">bluedoor.cafe</a>
          <button data-item-id="phone:tel:5551234567" aria-label="Phone: (555) 123-4567">(555) 123-4567</button>
          <div data-item-id="oh"><div class="fontBodyMedium">Open until 6 PM</div></div>
          <p>Write to hello@bluedoor.cafe for catering</p>
        </div></body></html>
    "#;

    #[tokio::test]
    async fn extracts_a_complete_panel() {
        let fields = extractor(FULL_PANEL).extract_current().await;

        assert_eq!(fields.name.as_deref(), Some("Blue Door Cafe"));
        assert_eq!(fields.category.as_deref(), Some("Coffee shop"));
        assert_eq!(fields.phone.as_deref(), Some("(555) 123-4567"));
        assert_eq!(fields.website.as_deref(), Some("bluedoor.cafe"));
        assert_eq!(fields.address.as_deref(), Some("1 Main St, Springfield"));
        assert_eq!(fields.rating, Some(4.6));
        assert_eq!(fields.reviews_count, Some(1234));
        assert_eq!(fields.hours.as_deref(), Some("Open until 6 PM"));
        assert_eq!(fields.price_level.as_deref(), Some("Price: $$"));
        assert_eq!(fields.email.as_deref(), Some("hello@bluedoor.cafe"));
    }

    #[tokio::test]
    async fn later_name_selector_is_used_when_earlier_ones_find_nothing() {
        let html = r#"
            <div role="main">
              <h1 class="title fontHeadlineLarge">Harbor Books</h1>
            </div>
        "#;
        let fields = extractor(html).extract_current().await;
        assert_eq!(fields.name.as_deref(), Some("Harbor Books"));
    }

    #[tokio::test]
    async fn phone_falls_back_to_tel_link() {
        let html = r#"
            <div role="main">
              <h1 class="DUwDvf">Corner Pharmacy</h1>
              <a href="tel:+15550001111">Call</a>
            </div>
        "#;
        let fields = extractor(html).extract_current().await;
        assert_eq!(fields.phone.as_deref(), Some("+15550001111"));
    }

    #[tokio::test]
    async fn phone_button_text_is_parsed_when_label_has_no_value() {
        let html = r#"
            <div role="main">
              <h1 class="DUwDvf">Corner Pharmacy</h1>
              <button data-item-id="phone:tel:9876543210" aria-label="Call phone number">Call 987-654-3210</button>
            </div>
        "#;
        let fields = extractor(html).extract_current().await;
        assert_eq!(fields.phone.as_deref(), Some("987-654-3210"));
    }

    #[tokio::test]
    async fn empty_panel_leaves_everything_unset() {
        let fields = extractor("<html><body></body></html>").extract_current().await;
        assert_eq!(fields, PanelFields::default());
    }

    #[tokio::test]
    async fn price_without_currency_is_ignored() {
        let html = r#"
            <div role="main">
              <h1 class="DUwDvf">Corner Pharmacy</h1>
              <span aria-label="Price: moderate">moderate</span>
            </div>
        "#;
        let fields = extractor(html).extract_current().await;
        assert!(fields.price_level.is_none());
    }

    #[tokio::test]
    async fn closed_surface_degrades_to_empty_fields() {
        let surface = Arc::new(SnapshotSurface::from_html(FULL_PANEL));
        surface.close().await;
        let fields = FieldExtractor::new(surface, Timing::immediate()).extract_current().await;
        assert!(fields.name.is_none());
        assert!(fields.phone.is_none());
    }
}
