//! One-shot importer: merges a CSV file or an exported JSON collection into
//! the configured candidate store and prints a summary.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use serde_json::Value;
use tracing::info;

use talent_crm::config::Config;
use talent_crm::service::CandidateService;
use talent_crm::store::open_store;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum InputFormat {
    Csv,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "talent-import", version, about = "Merge candidate records into the store by email")]
struct Args {
    /// CSV file with a header row, or a JSON array of candidates
    input: PathBuf,

    /// Source tag for rows that do not carry one (e.g. "CSV", "Drive")
    #[arg(long)]
    source: Option<String>,

    /// Input format; inferred from the file extension when omitted
    #[arg(long, value_enum)]
    format: Option<InputFormat>,

    /// Override DATA_PATH for the JSON file store
    #[arg(long)]
    data: Option<PathBuf>,
}

fn infer_format(path: &Path) -> Result<InputFormat> {
    match path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase) {
        Some(ext) if ext == "csv" => Ok(InputFormat::Csv),
        Some(ext) if ext == "json" => Ok(InputFormat::Json),
        _ => bail!(
            "cannot infer the format of {}; pass --format csv|json",
            path.display()
        ),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut config = Config::from_env()?;
    let args = Args::parse();
    if let Some(data) = args.data.clone() {
        config.data_path = data;
    }

    talent_crm::init_tracing(&config.rust_log);

    let format = match args.format {
        Some(format) => format,
        None => infer_format(&args.input)?,
    };
    let text = tokio::fs::read_to_string(&args.input)
        .await
        .with_context(|| format!("Failed to read {}", args.input.display()))?;

    let store = open_store(&config).await?;
    let service = CandidateService::from_config(store, &config)?;

    info!("Importing {} as {:?}", args.input.display(), format);
    let summary = match format {
        InputFormat::Csv => service.import_csv(&text, args.source.as_deref()).await?,
        InputFormat::Json => {
            let records: Vec<Value> = serde_json::from_str(&text)
                .with_context(|| format!("{} is not a JSON array", args.input.display()))?;
            service.import_json(records, args.source.as_deref()).await?
        }
    };
    let stats = service.stats().await?;

    println!("Import complete:");
    println!("  added:   {}", summary.report.added);
    println!("  updated: {}", summary.report.updated);
    println!("  skipped: {}", summary.report.skipped);
    if summary.report.folded > 0 {
        println!("  folded duplicate stored records: {}", summary.report.folded);
    }
    println!("  total:   {}", summary.total);
    println!("  average AI score: {}", stats.average_ai_score);
    println!("  top matches (90+): {}", stats.top_matches);

    Ok(())
}
