//! SeriesLab CLI: retrieve SGS series into a workbook.
//!
//! Commands:
//! - `run`: fetch every mapped series and write the workbook
//! - `plan`: show the axis, batches and sheet layouts without fetching

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use serieslab_core::consolidate::ConsolidatedTable;
use serieslab_core::data::SgsProvider;
use serieslab_core::distribute::distribute;
use serieslab_runner::{
    execute, PipelineConfig, PipelineError, RunOutcome, RunPlan, TracingProgress,
};

#[derive(Parser)]
#[command(name = "serieslab", about = "SeriesLab: batch retrieval of BCB SGS time series")]
struct Cli {
    /// Debug-level logging (RUST_LOG takes precedence).
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch all mapped series and write the workbook.
    Run {
        #[command(flatten)]
        opts: RunOptions,

        /// Do not back up the previous workbook.
        #[arg(long, default_value_t = false)]
        no_backup: bool,
    },
    /// Print the axis, batches and sheet layouts. No network access.
    Plan {
        #[command(flatten)]
        opts: RunOptions,
    },
}

#[derive(Args)]
struct RunOptions {
    /// Path to a TOML run config. Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Series mapping CSV (Codigo, Coluna, Aba).
    #[arg(long)]
    series: Option<PathBuf>,

    /// Output workbook directory.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Start date (YYYY-MM-DD). Defaults to 2010-01-01.
    #[arg(long)]
    start: Option<String>,

    /// End date (YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    end: Option<String>,

    /// Concurrent batch tasks.
    #[arg(long)]
    workers: Option<usize>,

    /// Series per combined call.
    #[arg(long)]
    batch_size: Option<usize>,
}

impl RunOptions {
    /// Load the config file (if any) and apply command-line overrides.
    fn into_config(self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_file(path)?,
            None => PipelineConfig::default(),
        };

        if let Some(series) = self.series {
            config.input.series = series;
        }
        if let Some(output) = self.output {
            config.output.directory = output;
        }
        if let Some(start) = self.start.as_deref() {
            config.run.start_date = parse_date(start)?;
        }
        if let Some(end) = self.end.as_deref() {
            config.run.end_date = Some(parse_date(end)?);
        }
        if let Some(workers) = self.workers {
            config.run.max_workers = workers;
        }
        if let Some(batch_size) = self.batch_size {
            config.run.batch_size = batch_size;
        }

        config.validate()?;
        Ok(config)
    }
}

fn parse_date(text: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .with_context(|| format!("invalid date '{text}', expected YYYY-MM-DD"))
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Run { opts, no_backup } => run_cmd(opts, no_backup),
        Commands::Plan { opts } => plan_cmd(opts),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err:#}");
            let code = err
                .downcast_ref::<PipelineError>()
                .map(PipelineError::exit_code)
                .unwrap_or(1);
            ExitCode::from(code)
        }
    }
}

fn run_cmd(opts: RunOptions, no_backup: bool) -> Result<()> {
    let started = Local::now();
    println!("Process started at {}", started.format("%Y-%m-%d %H:%M:%S"));

    let mut config = opts.into_config()?;
    if no_backup {
        config.output.backup = None;
    }

    let today = started.date_naive();
    let plan = RunPlan::load(&config, today)?;
    let provider = SgsProvider::new(config.sgs_settings(plan.end))
        .context("failed to set up the SGS client")?;

    let outcome = execute(&config, plan, &provider, &TracingProgress)?;
    print_summary(&outcome);

    let finished = Local::now();
    println!(
        "Process finished at {} ({:.1}s)",
        finished.format("%Y-%m-%d %H:%M:%S"),
        (finished - started).num_milliseconds() as f64 / 1000.0
    );
    Ok(())
}

fn print_summary(outcome: &RunOutcome) {
    let s = &outcome.summary;
    let manifest = &outcome.workbook.manifest;

    println!();
    println!("=== Run Summary ===");
    println!(
        "Batches:            {} ({} fell back, {} crashed)",
        s.batches, s.fallbacks, s.worker_errors
    );
    println!("Series retrieved:   {}", s.succeeded);
    println!("No data in period:  {}", s.no_data_in_period);
    println!("Failed permanently: {}", s.permanently_failed);
    println!("Sheets written:     {}", manifest.sheets.len());
    for sheet in &manifest.sheets {
        println!(
            "  {:<24} {} columns, {} filled",
            sheet.name,
            sheet.columns.len(),
            sheet.filled_columns
        );
    }
    if !manifest.skipped_sheets.is_empty() {
        println!("Sheets skipped:     {}", manifest.skipped_sheets.join(", "));
    }
    println!("Dataset hash:       {}", manifest.dataset_hash);
    println!("Workbook:           {}", outcome.workbook.directory.display());
}

fn plan_cmd(opts: RunOptions) -> Result<()> {
    let config = opts.into_config()?;
    let plan = RunPlan::load(&config, Local::now().date_naive())?;

    match (plan.axis.first(), plan.axis.last()) {
        (Some(first), Some(last)) => println!(
            "Axis: {first} .. {last} ({} points, {:?})",
            plan.axis.len(),
            plan.axis.frequency()
        ),
        _ => println!("Axis: empty ({} .. {})", plan.start, plan.end),
    }

    println!(
        "Batches: {} of up to {} series, {} workers",
        plan.batches.len(),
        config.run.batch_size,
        config.run.max_workers
    );
    for batch in &plan.batches {
        let ids: Vec<String> = batch.ids.iter().map(|id| id.to_string()).collect();
        println!("  #{:<3} {}", batch.index + 1, ids.join(" "));
    }

    let layout = distribute(&ConsolidatedTable::empty(plan.axis.clone()), &plan.mapping.rows);
    if layout.sheets.is_empty() {
        bail!("no sheet has a valid column layout");
    }
    println!("Sheets:");
    for sheet in &layout.sheets {
        let labels = sheet.column_labels();
        let range = match (labels.first(), labels.last()) {
            (Some(a), Some(b)) => format!("{a}..{b}"),
            _ => "-".to_string(),
        };
        println!("  {:<24} {range} ({} columns)", sheet.name, labels.len());
    }
    for skipped in &layout.skipped {
        println!("  {:<24} skipped: {}", skipped.name, skipped.reason);
    }
    Ok(())
}
