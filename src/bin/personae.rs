//! personae command-line entry point.
//!
//! Loads the raw-entity and trial tables, resolves person references into
//! canonical entities and writes the resolution artifacts.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use personae::config::{ConfigOverrides, FileConfig};
use personae::resolution::MergeStrategy;
use personae::storage::{load_inputs, write_outputs};
use personae::Resolver;

/// Command-line arguments for personae
#[derive(Parser, Debug)]
#[command(name = "personae")]
#[command(about = "Resolve noisy person references from trial records into canonical entities")]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "PERSONAE_CONFIG")]
    config: Option<PathBuf>,

    /// Raw-entity table (JSON object keyed by raw name)
    #[arg(long, env = "PERSONAE_ENTITIES")]
    entities: Option<PathBuf>,

    /// Trial metadata table (JSON)
    #[arg(long, env = "PERSONAE_TRIALS")]
    trials: Option<PathBuf>,

    /// Directory receiving the output artifacts
    #[arg(short, long, env = "PERSONAE_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Minimum token-set similarity (0-100) for a fuzzy merge
    #[arg(long, env = "PERSONAE_MERGE_THRESHOLD")]
    merge_threshold: Option<f64>,

    /// Minimum given-name similarity (0-100) for a fuzzy merge
    #[arg(long, env = "PERSONAE_GIVEN_NAME_THRESHOLD")]
    given_name_threshold: Option<f64>,

    /// Keys shorter than this many characters never merge
    #[arg(long, env = "PERSONAE_MIN_KEY_LENGTH")]
    min_key_length: Option<usize>,

    /// Merge strategy: greedy or transitive
    #[arg(long, env = "PERSONAE_MERGE_STRATEGY")]
    merge_strategy: Option<MergeStrategy>,

    /// Do not attach `la X` / `le X` references to full names
    #[arg(long)]
    no_surname_attach: bool,

    /// Distinct witness trials needed to count as a super-witness
    #[arg(long, env = "PERSONAE_SUPER_WITNESS_MIN")]
    super_witness_min: Option<usize>,

    /// Log level or filter directive (RUST_LOG takes precedence)
    #[arg(long, env = "PERSONAE_LOG_LEVEL")]
    log_level: Option<String>,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            entities: self.entities.clone(),
            trials: self.trials.clone(),
            output_dir: self.output_dir.clone(),
            merge_threshold: self.merge_threshold,
            given_name_threshold: self.given_name_threshold,
            min_key_length: self.min_key_length,
            merge_strategy: self.merge_strategy,
            attach_surname_references: self.no_surname_attach.then_some(false),
            super_witness_min_trials: self.super_witness_min,
            log_level: self.log_level.clone(),
        }
    }
}

/// A bare level applies to this crate only; anything else is used as a
/// full filter directive.
fn filter_directive(level: &str) -> String {
    match level.trim().to_ascii_lowercase().as_str() {
        lvl @ ("trace" | "debug" | "info" | "warn" | "error" | "off") => format!("personae={lvl}"),
        _ => level.to_string(),
    }
}

/// File configuration (or defaults) with the command-line overrides applied.
fn effective_config(args: &Args) -> Result<FileConfig> {
    let file_config = match &args.config {
        Some(path) => FileConfig::load(path).context("Failed to load configuration")?,
        None => FileConfig::default(),
    };
    Ok(file_config.with_overrides(args.overrides()))
}

fn main() -> Result<()> {
    let args = Args::parse();

    // The log level may come from the file, so it is read before tracing starts.
    let config = effective_config(&args)?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter_directive(&config.logging.level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match &args.config {
        Some(path) => info!(path = %path.display(), "Loaded configuration file"),
        None => info!("No configuration file, using defaults"),
    }

    let resolver = Resolver::new(config.resolver.clone()).context("Invalid resolver configuration")?;

    let inputs = load_inputs(&config.paths).context("Failed to load input tables")?;

    let resolution = resolver.resolve(&inputs.entities.table, &inputs.trials.table);

    let written = write_outputs(&config.paths.output_dir, &resolution, &inputs, resolver.config())
        .with_context(|| format!("Failed to write outputs to {}", config.paths.output_dir.display()))?;

    let stats = &resolution.statistics;
    info!(
        raw_entities = stats.total_raw_entities,
        canonical_entities = stats.total_canonical_entities,
        compression_ratio = %format!("{:.2}", stats.compression_ratio),
        transitions = resolution.transitions.len(),
        super_witnesses = resolution.super_witnesses.len(),
        skipped_records = inputs.entities.malformed.len(),
        skipped_trials = inputs.trials.malformed.len(),
        artifacts = written.len(),
        "Entity resolution complete"
    );

    Ok(())
}
