use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Fields read from a detail panel before we know whether the listing counts.
///
/// Every field is optional here, including the name. A panel only becomes a
/// [`ListingRecord`] once a non-empty name was found.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PanelFields {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub address: Option<String>,
    pub category: Option<String>,
    pub hours: Option<String>,
    pub price_level: Option<String>,
    pub rating: Option<f64>,
    pub reviews_count: Option<u64>,
}

impl PanelFields {
    /// Promote the panel to a record, or `None` if it has no usable name.
    pub fn into_record(self) -> Option<ListingRecord> {
        let name = self.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())?;

        Some(ListingRecord {
            name,
            phone: self.phone,
            email: self.email,
            website: self.website,
            address: self.address,
            category: self.category,
            hours: self.hours,
            price_level: self.price_level,
            rating: self.rating,
            reviews_count: self.reviews_count,
        })
    }
}

/// One extracted listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingRecord {
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub address: Option<String>,
    pub category: Option<String>,
    pub hours: Option<String>,
    pub price_level: Option<String>,
    pub rating: Option<f64>,
    pub reviews_count: Option<u64>,
}

impl ListingRecord {
    /// Record with only a name set
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            phone: None,
            email: None,
            website: None,
            address: None,
            category: None,
            hours: None,
            price_level: None,
            rating: None,
            reviews_count: None,
        }
    }
}

/// Run-level values merged into every exported row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportContext {
    pub search_query: String,
    pub extracted_at: DateTime<Local>,
}

impl ExportContext {
    pub fn new(search_query: impl Into<String>) -> Self {
        Self {
            search_query: search_query.into(),
            extracted_at: Local::now(),
        }
    }

    /// Timestamp as written into the `extraction_date` column
    pub fn extraction_date(&self) -> String {
        self.extracted_at.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panel_without_name_is_not_a_record() {
        let fields = PanelFields {
            phone: Some("987-654-3210".to_string()),
            ..Default::default()
        };
        assert!(fields.into_record().is_none());
    }

    #[test]
    fn blank_name_is_not_a_record() {
        let fields = PanelFields {
            name: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(fields.into_record().is_none());
    }

    #[test]
    fn named_panel_keeps_its_fields() {
        let fields = PanelFields {
            name: Some(" Blue Door Cafe ".to_string()),
            rating: Some(4.6),
            reviews_count: Some(120),
            ..Default::default()
        };
        let record = fields.into_record().unwrap();
        assert_eq!(record.name, "Blue Door Cafe");
        assert_eq!(record.rating, Some(4.6));
        assert_eq!(record.reviews_count, Some(120));
        assert!(record.phone.is_none());
    }
}
