use crate::config::ScoutConfig;
use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "maps-scout")]
#[command(about = "Extract business listings from a Google Maps search into a CSV file")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Search query; prompted for when omitted
    #[arg(short, long)]
    pub query: Option<String>,

    /// Configuration file (defaults to ./maps-scout.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Run Chrome without a visible window
    #[arg(long)]
    pub headless: bool,

    /// Directory for exported files
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Stop after this many results
    #[arg(long, value_name = "N")]
    pub max_results: Option<usize>,

    /// Save the page HTML to debug/ whenever a listing yields no name
    #[arg(long)]
    pub debug_snapshots: bool,

    /// Verbose logging (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the field extractor against a saved detail panel
    Inspect {
        /// HTML file captured with --debug-snapshots
        file: PathBuf,
    },
}

/// Directory used for --debug-snapshots
pub const DEBUG_SNAPSHOT_DIR: &str = "debug";

impl Cli {
    /// Fold command-line flags over the file configuration
    pub fn apply_overrides(&self, config: &mut ScoutConfig) {
        if self.headless {
            config.browser.headless = true;
        }
        if let Some(dir) = &self.output_dir {
            config.output.directory = dir.clone();
        }
        if let Some(limit) = self.max_results {
            config.session.max_results = Some(limit);
        }
    }

    pub fn debug_snapshot_dir(&self) -> Option<PathBuf> {
        self.debug_snapshots.then(|| PathBuf::from(DEBUG_SNAPSHOT_DIR))
    }

    /// Log filter matching the -v count
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

/// Ask for the search query on the terminal. An empty answer stays empty.
pub fn prompt_query<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> io::Result<String> {
    write!(output, "\nEnter your search query (e.g. \"dentists in Austin\"): ")?;
    output.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim().to_string())
}

/// Query from `--query`, falling back to the interactive prompt
pub fn resolve_query(cli: &Cli) -> io::Result<String> {
    match cli.query.as_deref().map(str::trim) {
        Some(query) if !query.is_empty() => Ok(query.to_string()),
        _ => {
            let stdin = io::stdin();
            prompt_query(&mut stdin.lock(), &mut io::stdout())
        }
    }
}
