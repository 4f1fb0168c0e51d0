// src/main.rs
mod utils;
mod vocab;
mod extract;
mod normalize;
mod storage;

use chrono::{Days, Local, NaiveDate};
use clap::Parser;
use extract::{CellSanitizer, TableExtractor};
use normalize::{normalize_snapshots, Snapshot};
use std::path::{Path, PathBuf};
use storage::StorageManager;
use utils::AppError;
use vocab::SiteVocabulary;

/// Command Line Interface for the substitution-plan normalizer
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Raw HTML snapshot of the "today" slide
    #[arg(long, default_value = "webuntis_subst_raw_1.html")]
    today: PathBuf,

    /// Raw HTML snapshot of the "tomorrow" slide (skipped when missing)
    #[arg(long, default_value = "webuntis_subst_raw_2.html")]
    tomorrow: PathBuf,

    /// Hint date for the "today" snapshot, dd.mm.yyyy (default: current date)
    #[arg(long)]
    hint_date: Option<String>,

    /// Explicit date for the "today" snapshot, dd.mm.yyyy; disables date
    /// inference ("tomorrow" gets the following day)
    #[arg(short, long)]
    date: Option<String>,

    /// Output directory for the normalized record set
    #[arg(short, long, default_value = "./")]
    output_dir: String,
}

fn parse_cli_date(value: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(value, "%d.%m.%Y")
        .map_err(|e| AppError::Config(format!("Invalid date '{}' (expected dd.mm.yyyy): {}", value, e)))
}

/// Reads one snapshot file into a `Snapshot`, or `None` when the file is
/// absent or unreadable.
fn load_snapshot(
    path: &Path,
    extractor: &TableExtractor,
    hint_date: NaiveDate,
    explicit_date: Option<NaiveDate>,
) -> Option<Snapshot> {
    let html = match std::fs::read_to_string(path) {
        Ok(html) => html,
        Err(e) => {
            tracing::debug!("Snapshot {} not readable: {}", path.display(), e);
            return None;
        }
    };
    tracing::info!("Loaded snapshot {} ({} bytes)", path.display(), html.len());
    Some(Snapshot { tables: extractor.extract(&html), hint_date, explicit_date })
}

fn main() -> Result<(), AppError> {
    // 1. Setup Logging (reads RUST_LOG env var)
    utils::logging::setup_logging();

    // 2. Parse CLI Arguments
    let args = Args::parse();
    tracing::info!("Starting normalization for args: {:?}", args);

    let hint_date = match &args.hint_date {
        Some(value) => parse_cli_date(value)?,
        None => Local::now().date_naive(),
    };
    let explicit_date = args.date.as_deref().map(parse_cli_date).transpose()?;
    let next_day = |d: NaiveDate| d.checked_add_days(Days::new(1)).unwrap_or(d);

    // 3. Initialize the pipeline components
    let site = SiteVocabulary::default();
    let extractor = TableExtractor::new(site.clone(), CellSanitizer::default());
    let storage = StorageManager::new(&args.output_dir)?;

    // 4. Load the snapshots ("tomorrow" is optional)
    let mut snapshots = Vec::new();
    if let Some(snap) = load_snapshot(&args.today, &extractor, hint_date, explicit_date) {
        snapshots.push(snap);
    }
    if let Some(snap) =
        load_snapshot(&args.tomorrow, &extractor, next_day(hint_date), explicit_date.map(next_day))
    {
        snapshots.push(snap);
    }

    if snapshots.is_empty() {
        return Err(AppError::MissingInput(format!(
            "neither {} nor {} could be read",
            args.today.display(),
            args.tomorrow.display()
        )));
    }

    // 5. Normalize
    let records = normalize_snapshots(snapshots, &site);
    if records.is_empty() {
        // Reported, not fatal: an empty output set is still written so
        // downstream consumers see the day emptied out.
        tracing::warn!("Zero rows survived classification; writing empty outputs");
    }

    // 6. Write both encodings
    let json_path = storage.save_json(&records)?;
    let csv_path = storage.save_csv(&records)?;

    tracing::info!(
        "Done. {} record(s) -> {} / {}",
        records.len(),
        json_path.display(),
        csv_path.display()
    );

    Ok(())
}
