//! CS Adjust CLI - recompute concentrations from instrument exports
//!
//! Runs the poll loop without a window, or recomputes the report once.
//! Paths not given on the command line come from the saved path record.

use anyhow::{bail, Context, Result};
use aspect_cs_adjust::pipeline::compute_once;
use aspect_cs_adjust::settings::{load_saved_paths, save_paths, settings_path};
use aspect_cs_adjust::{Monitor, MonitorConfig, OutputRow, PollEvent, ResultLayout, WatchPaths};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "cs-adjust")]
#[command(about = "Recompute sample concentrations against bracketing calibration standards")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct PathArgs {
    /// Standards table (comma-delimited)
    #[arg(short, long)]
    standards: Option<PathBuf>,

    /// Instrument result export (semicolon-delimited)
    #[arg(short, long)]
    results: Option<PathBuf>,

    /// Report file to write
    #[arg(short = 'o', long)]
    report: Option<PathBuf>,
}

impl PathArgs {
    /// Fill in anything not given from the saved record.
    fn resolve(self) -> WatchPaths {
        let saved = load_saved_paths();
        WatchPaths {
            standards: self.standards.unwrap_or(saved.standards),
            report: self.report.unwrap_or(saved.report),
            results: self.results.unwrap_or(saved.results),
        }
    }

    fn is_empty(&self) -> bool {
        self.standards.is_none() && self.results.is_none() && self.report.is_none()
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Watch the result export and keep the report up to date
    Run {
        #[command(flatten)]
        paths: PathArgs,

        /// Length of one tick in milliseconds
        #[arg(long, default_value = "1000")]
        tick_ms: u64,

        /// Ticks between re-reads of the result export
        #[arg(long, default_value = "5")]
        threshold: u32,

        /// Do not update the saved path record
        #[arg(long)]
        no_save: bool,
    },

    /// Recompute the report once and print it
    Compute {
        #[command(flatten)]
        paths: PathArgs,
    },

    /// Show the saved paths, or store new ones
    Paths {
        #[command(flatten)]
        paths: PathArgs,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            paths,
            tick_ms,
            threshold,
            no_save,
        } => {
            let mut config = MonitorConfig::new(paths.resolve());
            config.tick = Duration::from_millis(tick_ms);
            config.threshold = threshold;
            config.settings_file = if no_save { None } else { settings_path() };
            run(config)?;
        }
        Commands::Compute { paths } => {
            let paths = paths.resolve();
            let rows = compute_once(&paths, &ResultLayout::default())
                .with_context(|| format!("Failed to recompute {}", paths.results.display()))?;
            print_table(&rows);
        }
        Commands::Paths { paths } => {
            let file = settings_path().context("No configuration directory available")?;
            if !paths.is_empty() {
                save_paths(&file, &paths.resolve())
                    .with_context(|| format!("Failed to write {}", file.display()))?;
            }
            let current = load_saved_paths();
            println!("Record:    {}", file.display());
            println!("Standards: {}", current.standards.display());
            println!("Report:    {}", current.report.display());
            println!("Results:   {}", current.results.display());
        }
    }

    Ok(())
}

/// Run the monitor in the foreground until it stops or fails.
fn run(config: MonitorConfig) -> Result<()> {
    let (tx, rx) = futures::channel::mpsc::unbounded();
    let report = config.paths.report.clone();
    let _monitor = Monitor::start(config, tx).context("Failed to start monitor")?;

    for event in futures::executor::block_on_stream(rx) {
        match event {
            PollEvent::Tick(n) => log::debug!("tick {}", n),
            PollEvent::Unchanged => {}
            PollEvent::OutputReady(cycle) => {
                println!(
                    "[{}] {} rows{}",
                    cycle.finished_at.format("%H:%M:%S"),
                    cycle.rows.len(),
                    if cycle.written {
                        format!(", written to {}", report.display())
                    } else {
                        ", report unchanged".to_string()
                    }
                );
            }
            PollEvent::Failed(e) => bail!("Monitor failed: {}", e),
            PollEvent::Stopped => break,
        }
    }
    Ok(())
}

fn print_table(rows: &[OutputRow]) {
    let h = OutputRow::HEADERS;
    println!(
        "{:>6} {:<16} {:<14} {:>14} {:>9} {:>8} {:>12} {:<10} {:<8}",
        h[0], h[1], h[2], h[3], h[5], h[6], h[7], h[8], h[9]
    );
    println!("{:-<105}", "");
    for r in rows {
        println!(
            "{:>6} {:<16} {:<14} {:>14} {:>9} {:>8} {:>12} {:<10} {:<8}",
            r.number.trim(),
            r.name.trim(),
            r.line.trim(),
            r.concentration,
            r.secondary_factor.trim(),
            r.position.trim(),
            r.absorbance.trim(),
            r.date.trim(),
            r.time.trim()
        );
    }
}
