//! Pure text parsers used by the field strategies.
//!
//! Each function takes raw text read from the page and returns the value it
//! recognises, or `None`. None of them can fail.

use once_cell::sync::Lazy;
use regex::Regex;

/// Shortest phone match we believe is a real number
pub const MIN_PHONE_LEN: usize = 10;

/// International-ish, dashed 10 digit, plain 10 digit. Tried in this order.
static PHONE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"[+]?[(]?[0-9]{1,3}[)]?[-\s.]?[(]?[0-9]{1,4}[)]?[-\s.]?[0-9]{1,4}[-\s.]?[0-9]{1,9}",
        r"\b\d{3}[-.]?\d{3}[-.]?\d{4}\b",
        r"\b\d{10}\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid phone pattern"))
    .collect()
});

static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").expect("valid regex"));

static DECIMAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\d.]+").expect("valid regex"));

static GROUPED_INTEGER: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\d,]+").expect("valid regex"));

static FILENAME_UNSAFE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s-]").expect("valid regex"));

static FILENAME_SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[-\s]+").expect("valid regex"));

static NON_DIALABLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\d+]").expect("valid regex"));

/// Trimmed text, `None` when blank
pub fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// First phone-looking run in free text.
///
/// Each pattern contributes only its first match; that match is accepted when
/// it is at least [`MIN_PHONE_LEN`] characters once trimmed, otherwise the next
/// pattern gets a turn.
pub fn phone(text: &str) -> Option<String> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    PHONE_PATTERNS.iter().find_map(|pattern| {
        let candidate = pattern.find(text)?.as_str().trim();
        (candidate.len() >= MIN_PHONE_LEN).then(|| candidate.to_string())
    })
}

/// Number behind a `tel:` link
pub fn tel_href(href: &str) -> Option<String> {
    non_empty(href.trim().strip_prefix("tel:")?)
}

/// First address-like token anywhere in the text, taken verbatim
pub fn email(text: &str) -> Option<String> {
    EMAIL.find(text).map(|m| m.as_str().to_string())
}

/// Value half of an accessibility label such as `"Phone: 555 0100"`
pub fn label_value(label: &str) -> Option<String> {
    let (_, value) = label.split_once(':')?;
    non_empty(value)
}

/// Website text must at least look like a host or URL
pub fn website(text: &str) -> Option<String> {
    let text = non_empty(text)?;
    (text.contains('.') || text.to_lowercase().contains("http")).then_some(text)
}

/// First decimal in a label like `"4.6 stars"`
pub fn rating(text: &str) -> Option<f64> {
    DECIMAL
        .find_iter(text)
        .find_map(|m| m.as_str().trim_matches('.').parse::<f64>().ok())
        .filter(|value| value.is_finite())
}

/// First integer in text like `"(1,234)"`, with thousands separators removed
pub fn review_count(text: &str) -> Option<u64> {
    let digits = GROUPED_INTEGER.find(text)?.as_str().replace(',', "");
    digits.parse().ok()
}

/// Price level only counts when it carries a currency marker
pub fn price_level(text: &str) -> Option<String> {
    non_empty(text).filter(|t| t.contains('$'))
}

/// Reduce a search query to something safe inside a file name.
///
/// Drops everything except word characters, whitespace and hyphens, then
/// collapses runs of whitespace/hyphens into a single underscore.
pub fn filename_slug(query: &str) -> String {
    let cleaned = FILENAME_UNSAFE.replace_all(query.trim(), "");
    FILENAME_SEPARATORS.replace_all(&cleaned, "_").into_owned()
}

/// Normalise a phone number for export: digits and `+` only when that still
/// leaves a plausible number, otherwise the original text.
pub fn clean_phone(phone: &str) -> String {
    let cleaned = NON_DIALABLE.replace_all(phone, "");
    if cleaned.len() >= MIN_PHONE_LEN {
        cleaned.into_owned()
    } else {
        phone.to_string()
    }
}
