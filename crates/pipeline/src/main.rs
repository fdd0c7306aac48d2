use anyhow::Result;
use chrono::{Local, NaiveDate};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use dataset::DatasetConfig;
use harvest::{AliasTable, ClientConfig, Harvester};
use network::CollaborationGraph;
use normalize::NormalizeConfig;

/// Retrieve tech-company patents from the PatentsView API, normalize
/// assignee names, build the inventor collaboration network and emit the
/// flat dataset tables.
#[derive(Parser)]
#[command(name = "patent-pipeline")]
struct Cli {
    /// PatentsView API key
    #[arg(long)]
    api_key: String,

    /// Earliest filing/grant date (YYYY-MM-DD)
    #[arg(long, default_value = "2010-01-01")]
    start_date: NaiveDate,

    /// Latest filing/grant date (YYYY-MM-DD); defaults to today
    #[arg(long)]
    end_date: Option<NaiveDate>,

    /// CSV path the harvester appends to
    #[arg(long, default_value = "tech_company_patents.csv")]
    output_file: PathBuf,

    /// Directory for the five dataset tables
    #[arg(long, default_value = "outputs")]
    dataset_dir: PathBuf,

    /// Rows inspected on each side during assignee inference
    #[arg(long, default_value_t = 10)]
    window_size: usize,

    /// Majority share a firm needs within the window to be adopted
    #[arg(long, default_value_t = 0.7)]
    majority_threshold: f64,

    /// Dataset window start (application date, inclusive)
    #[arg(long, default_value = "2020-01-01")]
    dataset_start: NaiveDate,

    /// Dataset window end (application date, inclusive)
    #[arg(long, default_value = "2025-04-30")]
    dataset_end: NaiveDate,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let end_date = cli.end_date.unwrap_or_else(|| Local::now().date_naive());
    let aliases = AliasTable::builtin();

    // Stage 1: harvest. Per-company failures are logged inside the loop
    // and retried on the next invocation; they do not fail the run.
    let harvester = Harvester::new(cli.api_key, aliases.clone(), ClientConfig::default())?;
    harvester
        .run(cli.start_date, end_date, &cli.output_file)
        .await?;

    // Stage 2: normalize assignee names in the harvested table.
    let mut rows = harvest::rows::read_rows(&cli.output_file)?;
    info!(rows = rows.len(), "Loaded harvested table");

    let canonical = aliases.canonical_set();
    let report = normalize::normalize_rows(
        &mut rows,
        &canonical,
        &NormalizeConfig {
            window: cli.window_size,
            majority_threshold: cli.majority_threshold,
        },
    );
    if !report.unresolved.is_empty() {
        info!(names = ?report.unresolved, "Assignees left unresolved");
    }

    // Stage 3: collaboration network over the full normalized table.
    let graph = CollaborationGraph::build(&rows);

    // Stage 4: cut to the dataset window and emit the five tables.
    let config = DatasetConfig {
        window_start: cli.dataset_start,
        window_end: cli.dataset_end,
    };
    let filtered = dataset::filter_window(&rows, config.window_start, config.window_end);
    info!(
        kept = filtered.len(),
        total = rows.len(),
        "Applied dataset window"
    );
    dataset::emit_all(&filtered, &graph, &aliases, &cli.dataset_dir)?;

    info!(dir = %cli.dataset_dir.display(), "Dataset complete");
    Ok(())
}
