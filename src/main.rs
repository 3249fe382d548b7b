use anyhow::{Context, Result};
use clap::Parser;
use maps_scout::cli::{self, Cli, Commands};
use maps_scout::config::{ScoutConfig, Timing};
use maps_scout::export::{CsvExporter, ExportKind, ExportSummary, ExportWriter, OutputLayout};
use maps_scout::extraction::{
    open_search, ExtractionSession, FieldExtractor, InterruptHandler, SessionReport, SessionRunner,
    SessionSettings,
};
use maps_scout::models::{ExportContext, ListingRecord};
use maps_scout::scrapers::{BrowserSurface, ChromeSurface, SnapshotSurface};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut config = match ScoutConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    cli.apply_overrides(&mut config);

    let outcome = match &cli.command {
        Some(Commands::Inspect { file }) => inspect(file).await,
        None => scout(&cli, &config).await,
    };

    match outcome {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Interactive search-and-extract run
async fn scout(cli: &Cli, config: &ScoutConfig) -> Result<ExitCode> {
    info!("🗺️  Maps Scout - Google Maps listing extractor");
    info!("==============================================");

    let query = cli::resolve_query(cli).context("Failed to read search query")?;
    if query.is_empty() {
        error!("A search query is required");
        return Ok(ExitCode::FAILURE);
    }

    let timing = config.timing();
    let surface = Arc::new(ChromeSurface::launch(&config.browser).context("Failed to launch Chrome browser")?);

    if let Err(e) = open_search(surface.as_ref(), &query, &timing).await {
        error!("{}. Please check the query and try again.", e);
        surface.close().await;
        return Ok(ExitCode::FAILURE);
    }

    let context = ExportContext::new(query.as_str());
    let layout = OutputLayout::new(&config.output.directory, &config.output.file_prefix);
    let exporter: Arc<dyn ExportWriter> = Arc::new(CsvExporter::new());
    let session = Arc::new(ExtractionSession::new());

    let interrupt = Arc::new(InterruptHandler::new(
        Arc::clone(&session),
        Arc::clone(&surface),
        Arc::clone(&exporter),
        context.clone(),
        layout.clone(),
    ));
    Arc::clone(&interrupt).install();

    let mut settings = SessionSettings::from_config(config);
    settings.debug_snapshot_dir = cli.debug_snapshot_dir();
    let runner = SessionRunner::new(Arc::clone(&surface), Arc::clone(&session), settings);

    // Run on its own task so a panic inside the loop still leaves us the records
    let run = tokio::spawn(async move { runner.run().await }).await;

    let code = match run {
        Ok(report) if report.was_cancelled() => {
            // Writes the checkpoint, or waits for the Ctrl+C task that is writing it
            interrupt.handle().await;
            info!("✅ Extraction stopped with {} results", report.records.len());
            ExitCode::SUCCESS
        }
        Ok(report) if report.found_nothing() => {
            error!("No results found for \"{}\"", context.search_query);
            ExitCode::FAILURE
        }
        Ok(report) => finish(&report, exporter.as_ref(), &context, &layout),
        Err(e) => {
            error!("Extraction loop failed: {}", e);
            emergency_save(&session, exporter.as_ref(), &context, &layout);
            ExitCode::FAILURE
        }
    };

    // No-op if the interrupt handler already closed it
    surface.close().await;
    Ok(code)
}

/// Normal end of run: export, summary, preview
fn finish(
    report: &SessionReport,
    exporter: &dyn ExportWriter,
    context: &ExportContext,
    layout: &OutputLayout,
) -> ExitCode {
    if report.records.is_empty() {
        warn!("No results were extracted, nothing to save");
        return ExitCode::SUCCESS;
    }

    let path = layout.path_for(ExportKind::Complete, &context.search_query);
    if let Err(e) = exporter.write(&report.records, context, &path) {
        error!("❌ Failed to save results to {}: {}", path.display(), e);
        return ExitCode::FAILURE;
    }

    println!("\n{}", "=".repeat(60));
    println!("EXTRACTION COMPLETE ✅");
    println!("{}", "=".repeat(60));
    println!(
        "Extracted {} results in {} passes ({} listings visited)",
        report.records.len(),
        report.passes,
        report.attempted
    );
    println!("Results saved to: {}\n", path.display());
    println!("{}", ExportSummary::from_records(&report.records, context));

    println!("\nFirst {} results preview:", report.records.len().min(5));
    for (i, record) in report.records.iter().take(5).enumerate() {
        print_record(i + 1, record);
    }

    ExitCode::SUCCESS
}

fn emergency_save(
    session: &ExtractionSession,
    exporter: &dyn ExportWriter,
    context: &ExportContext,
    layout: &OutputLayout,
) {
    let records = session.snapshot();
    if records.is_empty() {
        return;
    }

    let path = layout.path_for(ExportKind::Emergency, &context.search_query);
    match exporter.write(&records, context, &path) {
        Ok(()) => info!("Emergency save completed: {}", path.display()),
        Err(e) => error!("❌ Emergency save failed: {}", e),
    }
}

/// Extract a saved detail panel offline
async fn inspect(file: &Path) -> Result<ExitCode> {
    let surface = Arc::new(
        SnapshotSurface::from_file(file).with_context(|| format!("Failed to read {}", file.display()))?,
    );
    let extractor = FieldExtractor::new(surface, Timing::immediate());

    match extractor.extract_current().await.into_record() {
        Some(record) => {
            print_record(1, &record);
            Ok(ExitCode::SUCCESS)
        }
        None => {
            warn!("No listing name found in {}", file.display());
            Ok(ExitCode::FAILURE)
        }
    }
}

fn print_record(position: usize, record: &ListingRecord) {
    println!("\n{}. {}", position, record.name);
    if let Some(phone) = &record.phone {
        println!("   📞 Phone: {}", phone);
    }
    if let Some(email) = &record.email {
        println!("   📧 Email: {}", email);
    }
    if let Some(website) = &record.website {
        println!("   🌐 Website: {}", website);
    }
    if let Some(rating) = record.rating {
        match record.reviews_count {
            Some(reviews) => println!("   ⭐ Rating: {} stars ({} reviews)", rating, reviews),
            None => println!("   ⭐ Rating: {} stars", rating),
        }
    }
    if let Some(category) = &record.category {
        println!("   🏷️ Category: {}", category);
    }
    if let Some(address) = &record.address {
        println!("   📍 Address: {}", address);
    }
}
