use crate::models::{ExportContext, ListingRecord};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Coverage and rating statistics for an export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportSummary {
    pub total_records: usize,
    pub with_phone: usize,
    pub with_email: usize,
    pub with_website: usize,
    pub with_rating: usize,
    pub average_rating: Option<f64>,
    pub highest_rating: Option<f64>,
    pub lowest_rating: Option<f64>,
    pub extraction_date: String,
    pub search_query: String,
}

fn filled(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

impl ExportSummary {
    pub fn from_records(records: &[ListingRecord], context: &ExportContext) -> Self {
        let ratings: Vec<f64> = records.iter().filter_map(|r| r.rating).collect();

        let average_rating = if ratings.is_empty() {
            None
        } else {
            Some(ratings.iter().sum::<f64>() / ratings.len() as f64)
        };

        Self {
            total_records: records.len(),
            with_phone: records.iter().filter(|r| filled(&r.phone)).count(),
            with_email: records.iter().filter(|r| filled(&r.email)).count(),
            with_website: records.iter().filter(|r| filled(&r.website)).count(),
            with_rating: ratings.len(),
            average_rating,
            highest_rating: ratings.iter().copied().reduce(f64::max),
            lowest_rating: ratings.iter().copied().reduce(f64::min),
            extraction_date: context.extraction_date(),
            search_query: context.search_query.clone(),
        }
    }
}

impl fmt::Display for ExportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rating = |value: Option<f64>| value.map(|v| format!("{:.2}", v)).unwrap_or_else(|| "-".to_string());

        writeln!(f, "=== Summary Statistics ===")?;
        writeln!(f, "Total Records:        {}", self.total_records)?;
        writeln!(f, "Records with Phone:   {}", self.with_phone)?;
        writeln!(f, "Records with Email:   {}", self.with_email)?;
        writeln!(f, "Records with Website: {}", self.with_website)?;
        writeln!(f, "Records with Rating:  {}", self.with_rating)?;
        writeln!(f, "Average Rating:       {}", rating(self.average_rating))?;
        writeln!(f, "Highest Rating:       {}", rating(self.highest_rating))?;
        writeln!(f, "Lowest Rating:        {}", rating(self.lowest_rating))?;
        writeln!(f, "Extraction Date:      {}", self.extraction_date)?;
        write!(f, "Search Query:         {}", self.search_query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, phone: Option<&str>, rating: Option<f64>) -> ListingRecord {
        let mut record = ListingRecord::named(name);
        record.phone = phone.map(str::to_string);
        record.rating = rating;
        record
    }

    #[test]
    fn counts_coverage_and_ratings() {
        let records = vec![
            record("A", Some("555-000-1111"), Some(4.0)),
            record("B", None, Some(5.0)),
            record("C", Some(" "), None),
        ];
        let summary = ExportSummary::from_records(&records, &ExportContext::new("bakeries"));

        assert_eq!(summary.total_records, 3);
        assert_eq!(summary.with_phone, 1);
        assert_eq!(summary.with_rating, 2);
        assert_eq!(summary.average_rating, Some(4.5));
        assert_eq!(summary.highest_rating, Some(5.0));
        assert_eq!(summary.lowest_rating, Some(4.0));
        assert_eq!(summary.search_query, "bakeries");
    }

    #[test]
    fn no_ratings_means_no_rating_stats() {
        let summary = ExportSummary::from_records(&[record("A", None, None)], &ExportContext::new("q"));
        assert_eq!(summary.with_rating, 0);
        assert!(summary.average_rating.is_none());
        assert!(summary.highest_rating.is_none());
        assert!(summary.to_string().contains("Average Rating:       -"));
    }
}
