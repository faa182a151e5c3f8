//! Offline run analyzer.
//!
//! Reads a run metadata JSON file and a samples JSONL file, runs the full
//! diagnostic pipeline, and writes the analysis summary as pretty JSON.
//!
//! Usage:
//!   cargo run --bin analyze-run -- --metadata run_meta.json --samples run.jsonl
//!   cargo run --bin analyze-run -- --metadata run_meta.json --samples run.jsonl --config analysis.toml --output summary.json

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::Value;
use tracing::{info, warn};

use vibediag::config::AnalysisConfig;
use vibediag::summarize_run_json;

/// Offline vibration-diagnostics run analyzer.
#[derive(Parser)]
#[command(name = "analyze-run")]
struct Args {
    /// Path to the run metadata JSON file.
    #[arg(long)]
    metadata: PathBuf,

    /// Path to the samples JSONL file (one sample record per line).
    #[arg(long)]
    samples: PathBuf,

    /// Optional analysis-config TOML overlay.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output path for the summary JSON. Defaults to stdout.
    #[arg(long, short)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let cfg = match &args.config {
        Some(path) => AnalysisConfig::load_file(path)
            .with_context(|| format!("loading config overlay {}", path.display()))?,
        None => AnalysisConfig::default(),
    };

    let metadata: Value = serde_json::from_reader(
        File::open(&args.metadata)
            .with_context(|| format!("opening metadata {}", args.metadata.display()))?,
    )
    .context("parsing metadata JSON")?;

    let samples = read_jsonl(&args.samples)?;
    info!(
        samples = samples.len(),
        metadata = %args.metadata.display(),
        "inputs loaded"
    );

    let summary = summarize_run_json(&metadata, &samples, &cfg)
        .context("metadata is not a valid run record")?;

    info!(
        findings = summary.findings.len(),
        top_causes = summary.top_causes.len(),
        tier = ?summary.certainty_tier_key,
        "analysis complete"
    );

    match &args.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("creating output {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, &summary)?;
            writer.flush()?;
        }
        None => {
            let stdout = std::io::stdout();
            let mut writer = BufWriter::new(stdout.lock());
            serde_json::to_writer_pretty(&mut writer, &summary)?;
            writeln!(writer)?;
            writer.flush()?;
        }
    }
    Ok(())
}

/// Read one JSON value per non-empty line; malformed lines are skipped
/// with a warning rather than aborting the run.
fn read_jsonl(path: &PathBuf) -> Result<Vec<Value>> {
    let file =
        File::open(path).with_context(|| format!("opening samples {}", path.display()))?;
    let reader = BufReader::new(file);
    let mut values = Vec::new();
    let mut skipped = 0usize;
    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(trimmed) {
            Ok(v) => values.push(v),
            Err(_) => skipped += 1,
        }
    }
    if skipped > 0 {
        warn!(skipped, "skipped malformed JSONL lines");
    }
    Ok(values)
}
