#![allow(dead_code)]

pub mod scripted;

use maps_scout::config::Timing;
use maps_scout::extraction::SessionSettings;

/// Default thresholds with every settle delay removed
pub fn fast_settings() -> SessionSettings {
    SessionSettings {
        timing: Timing::immediate(),
        ..SessionSettings::default()
    }
}

/// A detail panel the field extractor can read a full record from
pub fn panel(name: &str) -> String {
    format!(
        r#"<div role="main">
            <h1 class="DUwDvf fontHeadlineLarge">{name}</h1>
            <button jsaction="pane.rating.category"><span class="DkEaL">Bookstore</span></button>
            <span role="img" aria-label="4.5 stars"></span>
            <span class="UY7F9"><a><span>(120)</span></a></span>
            <button data-item-id="address" aria-label="Address: 12 Dock Rd">12 Dock Rd</button>
            <button data-item-id="phone:tel:5551234567" aria-label="Phone: (555) 123-4567">(555) 123-4567</button>
        </div>"#
    )
}

/// A detail panel without any name heading
pub fn nameless_panel() -> String {
    r#"<div role="main"><button data-item-id="address" aria-label="Address: Nowhere">Nowhere</button></div>"#
        .to_string()
}
