//! CLI harness: read a transaction CSV, run the forensic analysis
//! engine, print the Result Document as JSON.
//!
//! Grounded on the teacher's `examples/validate_transactions.rs`
//! demonstrator binary, restructured onto this crate's batch API, with
//! `clap` (shared with the `m0rs3c0d3-Glasswally`/`panon-btc-cory`
//! sibling pack members) for argument parsing and `csv` for reading the
//! canonical-schema input — the CLI/test-fixture boundary is the one
//! place this crate reads tabular text, so it's also the one place that
//! needs a CSV reader.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use serde::Deserialize;

use launder_scan::{AnalysisEngine, RawTransaction};

#[derive(Parser, Debug)]
#[command(
    name = "launder-scan",
    version,
    about = "Batch money-laundering forensic analysis over a transaction CSV"
)]
struct Cli {
    /// Path to a CSV file with columns source,target,amount[,timestamp]
    #[arg(long)]
    input: PathBuf,

    /// Pretty-print the JSON result document
    #[arg(long)]
    pretty: bool,
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    source: String,
    target: String,
    amount: String,
    #[serde(default)]
    timestamp: Option<String>,
}

fn read_rows(path: &Path) -> Result<Vec<RawTransaction>, csv::Error> {
    let mut reader = csv::Reader::from_path(path)?;
    reader
        .deserialize::<CsvRow>()
        .map(|row| {
            row.map(|row| RawTransaction {
                source: row.source,
                target: row.target,
                amount: row.amount,
                timestamp: row.timestamp,
            })
        })
        .collect()
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let rows = match read_rows(&cli.input) {
        Ok(rows) => rows,
        Err(err) => {
            eprintln!("error reading {}: {err}", cli.input.display());
            return ExitCode::FAILURE;
        }
    };

    let engine = AnalysisEngine::new();
    let document = match engine.analyze(&rows) {
        Ok(document) => document,
        Err(err) => {
            eprintln!("analysis failed: {err}");
            return ExitCode::FAILURE;
        }
    };

    let json = if cli.pretty {
        serde_json::to_string_pretty(&document)
    } else {
        serde_json::to_string(&document)
    };

    match json {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("failed to serialize result document: {err}");
            ExitCode::FAILURE
        }
    }
}
