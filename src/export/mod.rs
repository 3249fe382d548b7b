pub mod summary;

use crate::extraction::parse;
use crate::models::{ExportContext, ListingRecord};
use chrono::{DateTime, Local};
use csv::Writer;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

pub use summary::ExportSummary;

/// Column order of the exported sheet
pub const COLUMNS: [&str; 12] = [
    "name",
    "phone",
    "email",
    "website",
    "address",
    "rating",
    "reviews_count",
    "category",
    "hours",
    "price_level",
    "extraction_date",
    "search_query",
];

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("no results to save")]
    Empty,

    #[error("failed to write export: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to write CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to write summary: {0}")]
    Json(#[from] serde_json::Error),
}

/// Persists an ordered sequence of records as a table
pub trait ExportWriter: Send + Sync {
    fn write(&self, records: &[ListingRecord], context: &ExportContext, path: &Path) -> Result<(), ExportError>;
}

/// Which run produced the file; decides its name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    /// End of a normal run
    Complete,
    /// Checkpoint written on Ctrl+C
    Stopped,
    /// Fallback after an unexpected error
    Emergency,
}

/// Where export files go and how they are named
#[derive(Debug, Clone)]
pub struct OutputLayout {
    pub directory: PathBuf,
    pub prefix: String,
}

impl OutputLayout {
    pub fn new(directory: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            prefix: prefix.into(),
        }
    }

    pub fn file_name(&self, kind: ExportKind, query: &str, at: DateTime<Local>) -> String {
        let timestamp = at.format("%Y%m%d_%H%M%S");
        match kind {
            ExportKind::Complete => {
                let slug = parse::filename_slug(query);
                if slug.is_empty() {
                    format!("{}_results_{}.csv", self.prefix, timestamp)
                } else {
                    format!("{}_{}_{}.csv", self.prefix, slug, timestamp)
                }
            }
            ExportKind::Stopped => format!("{}_results_stopped_{}.csv", self.prefix, timestamp),
            ExportKind::Emergency => format!("{}_results_emergency_{}.csv", self.prefix, timestamp),
        }
    }

    /// Path for a file written now
    pub fn path_for(&self, kind: ExportKind, query: &str) -> PathBuf {
        self.directory.join(self.file_name(kind, query, Local::now()))
    }
}

/// Summary file written next to an export
pub fn summary_path(export_path: &Path) -> PathBuf {
    export_path.with_extension("summary.json")
}

/// CSV export with an optional JSON summary beside it
#[derive(Debug, Clone)]
pub struct CsvExporter {
    with_summary: bool,
}

impl CsvExporter {
    pub fn new() -> Self {
        Self { with_summary: true }
    }

    /// Only the CSV, no summary file
    pub fn without_summary() -> Self {
        Self { with_summary: false }
    }

    fn row(record: &ListingRecord, context: &ExportContext) -> Vec<String> {
        let text = |value: &Option<String>| value.clone().unwrap_or_default();
        vec![
            record.name.clone(),
            record.phone.as_deref().map(parse::clean_phone).unwrap_or_default(),
            text(&record.email),
            text(&record.website),
            text(&record.address),
            record.rating.map(|r| r.to_string()).unwrap_or_default(),
            record.reviews_count.map(|c| c.to_string()).unwrap_or_default(),
            text(&record.category),
            text(&record.hours),
            text(&record.price_level),
            context.extraction_date(),
            context.search_query.clone(),
        ]
    }
}

impl Default for CsvExporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ExportWriter for CsvExporter {
    fn write(&self, records: &[ListingRecord], context: &ExportContext, path: &Path) -> Result<(), ExportError> {
        if records.is_empty() {
            return Err(ExportError::Empty);
        }
        debug!("Exporting {} results to CSV: {}", records.len(), path.display());

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut wtr = Writer::from_path(path)?;
        wtr.write_record(COLUMNS)?;
        for record in records {
            wtr.write_record(Self::row(record, context))?;
        }
        wtr.flush()?;

        if self.with_summary {
            let summary = ExportSummary::from_records(records, context);
            let json = serde_json::to_string_pretty(&summary)?;
            fs::write(summary_path(path), json)?;
        }

        info!("💾 Saved {} results to {}", records.len(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 3, 9, 14, 5, 7).unwrap()
    }

    #[test]
    fn complete_file_name_uses_query_slug() {
        let layout = OutputLayout::new("out", "google_maps");
        assert_eq!(
            layout.file_name(ExportKind::Complete, "pizza near me", at()),
            "google_maps_pizza_near_me_20260309_140507.csv"
        );
    }

    #[test]
    fn unusable_query_falls_back_to_results() {
        let layout = OutputLayout::new("out", "google_maps");
        assert_eq!(
            layout.file_name(ExportKind::Complete, "!!!", at()),
            "google_maps_results_20260309_140507.csv"
        );
    }

    #[test]
    fn checkpoint_names_are_distinct() {
        let layout = OutputLayout::new("out", "scout");
        assert_eq!(
            layout.file_name(ExportKind::Stopped, "pizza", at()),
            "scout_results_stopped_20260309_140507.csv"
        );
        assert_eq!(
            layout.file_name(ExportKind::Emergency, "pizza", at()),
            "scout_results_emergency_20260309_140507.csv"
        );
    }

    #[test]
    fn summary_sits_next_to_export() {
        assert_eq!(
            summary_path(Path::new("out/google_maps_x.csv")),
            PathBuf::from("out/google_maps_x.summary.json")
        );
    }

    #[test]
    fn row_cleans_phone_and_merges_context() {
        let mut record = ListingRecord::named("Blue Door Cafe");
        record.phone = Some("(555) 123-4567".to_string());
        record.rating = Some(4.5);
        let context = ExportContext::new("cafes");

        let row = CsvExporter::row(&record, &context);
        assert_eq!(row.len(), COLUMNS.len());
        assert_eq!(row[0], "Blue Door Cafe");
        assert_eq!(row[1], "5551234567");
        assert_eq!(row[5], "4.5");
        assert_eq!(row[6], "");
        assert_eq!(row[11], "cafes");
    }

    #[test]
    fn empty_export_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let result = CsvExporter::new().write(&[], &ExportContext::new("x"), &dir.path().join("x.csv"));
        assert!(matches!(result, Err(ExportError::Empty)));
        assert!(!dir.path().join("x.csv").exists());
    }
}
