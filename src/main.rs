use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use uni_transcripts::analysis;
use uni_transcripts::data::builder::IngestPolicy;
use uni_transcripts::AnalysisConfig;

#[derive(Parser)]
#[command(name = "uni-transcripts", version, about = "University transcript analysis")]
struct Cli {
    /// TOML file with directory, columns and queries
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory of <uni>.csv / <uni>.json transcripts
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Where result files are written
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// Abort on the first file that fails to load
    #[arg(long, global = true)]
    strict: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest and run every configured query (default)
    Analyse,
    /// Ingest and print the passing rate per university
    PassingRates,
    /// Report which files in the data directory are eligible
    Check,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = resolve_config(&cli)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match cli.command.unwrap_or(Command::Analyse) {
        Command::Analyse => {
            analysis::run_analysis(&config, &mut out)?;
        }
        Command::PassingRates => {
            analysis::run_passing_rates(&config, &mut out)?;
        }
        Command::Check => {
            analysis::run_check(&config, &mut out)?;
        }
    }
    out.flush()?;
    Ok(())
}

fn resolve_config(cli: &Cli) -> Result<AnalysisConfig> {
    let mut config = match &cli.config {
        Some(path) => AnalysisConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => AnalysisConfig::default(),
    };
    if let Some(dir) = &cli.data_dir {
        config.directory = dir.clone();
    }
    if let Some(dir) = &cli.output_dir {
        config.output_dir = dir.clone();
    }
    if cli.strict {
        config.policy = IngestPolicy::Strict;
    }
    Ok(config)
}
