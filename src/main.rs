//! investing-scraper CLI
//!
//! - `run`: scrape indicators once and upload their CSV snapshots
//! - `list`: show the configured indicators
//! - `schedule`: scrape on a cron schedule until interrupted

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use investing_scraper_lib::config::{Settings, StorageBackend};
use investing_scraper_lib::core::{scheduler, RunReport};
use investing_scraper_lib::indicators::{IndicatorSpec, Registry, RowOrder};

#[derive(Parser)]
#[command(name = "investing-scraper")]
#[command(about = "Scrape indicator tables into CSV snapshots on blob storage")]
#[command(version)]
struct Cli {
    /// Storage backend override (gcs, local)
    #[arg(long, global = true)]
    backend: Option<StorageBackend>,

    /// Directory for the local backend
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape once and exit
    Run {
        /// Indicator ids to scrape (default: all)
        #[arg(long = "indicator", short)]
        indicators: Vec<String>,
    },
    /// List configured indicators
    List {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Scrape all indicators on a cron schedule
    Schedule {
        /// Six-field cron expression; falls back to SCRAPE_CRON
        #[arg(long)]
        cron: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("investing_scraper=info,investing_scraper_lib=info")))
        .init();

    let cli = Cli::parse();
    let mut settings = Settings::from_env()?;
    if let Some(backend) = cli.backend {
        settings.backend = backend;
    }
    if let Some(dir) = cli.output_dir {
        settings.local_output_dir = dir;
    }

    match cli.command {
        Commands::Run { indicators } => {
            let specs = resolve(&indicators)?;
            let pipeline = investing_scraper_lib::build_pipeline(&settings).await?;
            let reports = pipeline.run_all(&specs).await;
            print_reports(&reports);
            let failed = reports.iter().filter(|r| !r.is_persisted()).count();
            if failed > 0 {
                bail!("{} of {} indicators failed", failed, reports.len());
            }
        }
        Commands::List { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(Registry::all())?);
            } else {
                println!("{:<28} | {:<38} | {:<12} | {}", "Id", "Destination", "Row order", "Source");
                println!("{}", "-".repeat(115));
                for spec in Registry::all() {
                    let order = match spec.row_order {
                        RowOrder::NewestFirst => "newest first",
                        RowOrder::OldestFirst => "oldest first",
                    };
                    println!("{:<28} | {:<38} | {:<12} | {}", spec.id, spec.destination_key(), order, spec.source_url);
                }
            }
        }
        Commands::Schedule { cron } => {
            let Some(cron) = cron.or_else(|| settings.cron.clone()) else {
                bail!("no cron expression: pass --cron or set SCRAPE_CRON");
            };
            let pipeline = investing_scraper_lib::build_pipeline(&settings).await?;
            let specs: Vec<&'static IndicatorSpec> = Registry::all().iter().collect();
            let mut sched = scheduler::start(pipeline, specs, &cron).await?;

            tokio::signal::ctrl_c().await?;
            tracing::info!("shutting down scheduler");
            sched.shutdown().await?;
        }
    }

    Ok(())
}

fn resolve(ids: &[String]) -> Result<Vec<&'static IndicatorSpec>> {
    if ids.is_empty() {
        return Ok(Registry::all().iter().collect());
    }
    let (specs, unknown) = Registry::select(ids);
    if !unknown.is_empty() {
        bail!("unknown indicator(s): {}", unknown.join(", "));
    }
    Ok(specs)
}

fn print_reports(reports: &[RunReport]) {
    println!("\n{:<28} | {:<10} | {:>7} | {:>8} | {}", "Indicator", "State", "Records", "Rejected", "Key / Error");
    println!("{}", "-".repeat(100));
    for r in reports {
        let detail = match &r.error {
            Some(e) => e.to_string(),
            None => r.destination_key.clone(),
        };
        println!("{:<28} | {:<10} | {:>7} | {:>8} | {}", r.indicator_id, r.state.to_string(), r.records, r.rows_rejected, detail);
    }
}
