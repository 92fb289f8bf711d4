use std::path::PathBuf;
use std::process::ExitCode;

use brewlake::dimension::normalize_str;
use brewlake::{ConfigUpdate, LakeConfig, Result, RunContext};
use clap::{Args, Parser, Subcommand};
use time::macros::format_description;
use time::{Date, OffsetDateTime};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Brewery lake silver and gold passes")]
struct Cli {
    /// TOML configuration file. Environment variables and flags override it.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Overrides {
    /// Root of the standard lake layout.
    #[arg(long, global = true)]
    lake_root: Option<PathBuf>,
    #[arg(long, global = true)]
    raw_dir: Option<PathBuf>,
    #[arg(long, global = true)]
    dim_dir: Option<PathBuf>,
    #[arg(long, global = true)]
    fact_dir: Option<PathBuf>,
    #[arg(long, global = true)]
    gold_dir: Option<PathBuf>,
    #[arg(long, global = true)]
    signal_dir: Option<PathBuf>,
    /// Raw files per fact write.
    #[arg(long, global = true)]
    files_per_batch: Option<usize>,
    /// Rows per chunk when scanning facts.
    #[arg(long, global = true)]
    scan_chunk_size: Option<usize>,
}

impl From<Overrides> for ConfigUpdate {
    fn from(o: Overrides) -> Self {
        ConfigUpdate {
            lake_root: o.lake_root,
            raw_dir: o.raw_dir,
            dim_dir: o.dim_dir,
            fact_dir: o.fact_dir,
            gold_dir: o.gold_dir,
            signal_dir: o.signal_dir,
            files_per_batch: o.files_per_batch,
            scan_chunk_size: o.scan_chunk_size,
        }
    }
}

#[derive(Args)]
struct DayArgs {
    /// Run day as YYYY-MM-DD. Defaults to today (UTC).
    #[arg(long, value_parser = parse_day)]
    date: Option<Date>,
}

impl DayArgs {
    fn day(&self) -> Date {
        self.date.unwrap_or_else(|| OffsetDateTime::now_utc().date())
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Load a raw day into the dimension and fact stores, then deduplicate it
    Silver(DayArgs),
    /// Recompute the gold summary from the fact store
    Gold(DayArgs),
    /// Deduplicate one day's fact batch
    Dedup(DayArgs),
    /// Print the normalized form of a value
    Normalize { value: String },
    /// Print the effective configuration as TOML
    Config,
}

fn parse_day(value: &str) -> std::result::Result<Date, String> {
    Date::parse(value, format_description!("[year]-[month]-[day]"))
        .map_err(|e| format!("expected YYYY-MM-DD: {e}"))
}

fn resolve_config(path: Option<&PathBuf>, overrides: Overrides) -> Result<LakeConfig> {
    let base = match path {
        Some(path) => LakeConfig::load(path)?,
        None => LakeConfig::default(),
    };
    let mut config = base.apply_env()?;
    config.apply_update(overrides.into());
    config.validate()?;
    Ok(config)
}

fn run(cli: Cli) -> Result<()> {
    let Cli {
        config,
        overrides,
        command,
    } = cli;
    let config = resolve_config(config.as_ref(), overrides)?;

    match command {
        Commands::Silver(args) => {
            let day = args.day();
            let ctx = RunContext::new(format!("silver-{day}"));
            let report = brewlake::run_silver(&config, day, &ctx)?;
            println!(
                "silver {}: {} raw files, {} rows written, {} after dedup",
                report.batch,
                report.raw_files,
                report.rows_written(),
                report.dedup.rows_after
            );
        }
        Commands::Gold(args) => {
            let day = args.day();
            let ctx = RunContext::new(format!("gold-{day}"));
            let report = brewlake::run_gold(&config, day, &ctx)?;
            println!(
                "gold: {} groups from {} rows -> {}",
                report.aggregate.groups,
                report.aggregate.rows_scanned,
                report.aggregate.path.display()
            );
        }
        Commands::Dedup(args) => {
            let day = args.day();
            let ctx = RunContext::new(format!("dedup-{day}"));
            let report = brewlake::run_dedup(&config, day, &ctx)?;
            println!(
                "dedup {}: {:?}, {} -> {} rows",
                report.batch, report.outcome, report.rows_before, report.rows_after
            );
        }
        Commands::Normalize { value } => println!("{}", normalize_str(&value)),
        Commands::Config => print!("{}", config.to_toml_string()?),
    }
    Ok(())
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(kind = %err.kind(), "{err}");
            ExitCode::FAILURE
        }
    }
}
