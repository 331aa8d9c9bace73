//! hppskim CLI

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;

use hpp_skim::{BinnedFakeRates, EventRecord, SkimConfig, Skimmer, skim_partitioned};

#[derive(Parser)]
#[command(name = "hppskim")]
#[command(about = "hppskim - Event skimming for the doubly-charged Higgs search")]
#[command(version)]
struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a skim over JSONL event records
    Skim {
        /// Run configuration (JSON)
        #[arg(short, long)]
        config: PathBuf,

        /// Input event records, one JSON object per line
        #[arg(short, long)]
        input: PathBuf,

        /// Output file for the counter totals (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Records per rayon partition (0 = single-threaded pass)
        #[arg(long, default_value = "0")]
        partition_size: usize,
    },

    /// Validate a run configuration and its fake-rate artifact
    Validate {
        /// Run configuration (JSON)
        #[arg(short, long)]
        config: PathBuf,
    },
}

/// On-disk run configuration: the engine config plus the calibration
/// artifact location.
#[derive(Deserialize)]
struct RunConfig {
    #[serde(flatten)]
    skim: SkimConfig,
    /// Fake-rate calibration artifact (JSON).
    fake_rates: PathBuf,
}

fn load_config(path: &PathBuf) -> Result<RunConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let cfg: RunConfig = serde_json::from_str(&raw)
        .with_context(|| format!("parsing config {}", path.display()))?;
    cfg.skim.validate()?;
    Ok(cfg)
}

fn read_records(path: &PathBuf) -> Result<Vec<EventRecord>> {
    let file =
        File::open(path).with_context(|| format!("opening input {}", path.display()))?;
    let mut records = Vec::new();
    for (n, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: EventRecord = serde_json::from_str(&line)
            .with_context(|| format!("parsing record on line {}", n + 1))?;
        records.push(record);
    }
    Ok(records)
}

fn run_skim(
    config: PathBuf,
    input: PathBuf,
    output: Option<PathBuf>,
    partition_size: usize,
) -> Result<()> {
    let cfg = load_config(&config)?;
    let fakes = BinnedFakeRates::from_path(&cfg.fake_rates)
        .with_context(|| format!("loading fake rates {}", cfg.fake_rates.display()))?;
    let records = read_records(&input)?;
    tracing::info!(records = records.len(), sample = cfg.skim.sample.as_str(), "skimming");

    let entries = if partition_size > 0 {
        skim_partitioned(&cfg.skim, &fakes, &records, partition_size)?
    } else {
        let mut skimmer = Skimmer::new(cfg.skim, fakes)?;
        for record in &records {
            skimmer.process_record(record)?;
        }
        skimmer.flush()
    };
    tracing::info!(bins = entries.len(), "skim complete");

    match output {
        Some(path) => {
            let file = File::create(&path)
                .with_context(|| format!("creating output {}", path.display()))?;
            let mut w = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut w, &entries)?;
            w.write_all(b"\n")?;
        }
        None => {
            let stdout = std::io::stdout();
            let mut w = stdout.lock();
            serde_json::to_writer_pretty(&mut w, &entries)?;
            w.write_all(b"\n")?;
        }
    }
    Ok(())
}

fn run_validate(config: PathBuf) -> Result<()> {
    let cfg = load_config(&config)?;
    BinnedFakeRates::from_path(&cfg.fake_rates)
        .with_context(|| format!("loading fake rates {}", cfg.fake_rates.display()))?;
    println!("ok: sample '{}', variant {:?}", cfg.skim.sample, cfg.skim.variant);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt().with_max_level(cli.log_level).with_target(false).init();

    match cli.command {
        Commands::Skim { config, input, output, partition_size } => {
            run_skim(config, input, output, partition_size)
        }
        Commands::Validate { config } => run_validate(config),
    }
}
