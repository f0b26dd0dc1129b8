#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the hazard forecast pipeline.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Instant;

use clap::{Parser, Subcommand};
use hazard_classify::CyclonePolicy;
use hazard_cli_utils::{IndicatifProgress, MultiProgress};
use hazard_ingest::pipeline::{self, Engines, RunOptions, RunProgress, RunSummary, SourceChain};
use hazard_ingest::PipelineConfig;
use hazard_source::FetchContext;
use hazard_source::progress::null_progress;

#[derive(Parser)]
#[command(name = "hazard_ingest", about = "Hazard forecast classification and aggregation")]
struct Cli {
    /// Override TOML file (falls back to `HAZARD_CONFIG`)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify and store text hazards (and flood unless skipped)
    Run {
        /// Leave the flood feed out of this run
        #[arg(long)]
        skip_flood: bool,
        /// Print records as JSON instead of writing them
        #[arg(long)]
        dry_run: bool,
        /// Comma-separated list of source IDs (overrides `HAZARD_SOURCES` env var)
        #[arg(long)]
        sources: Option<String>,
    },
    /// Classify and store cyclone hazards
    Cyclone {
        /// Cyclone gate: `strict` (warning colours only) or `lenient`.
        /// Defaults to the classifier configuration.
        #[arg(long)]
        policy: Option<String>,
        /// Use every circle instead of the latest impacted circles
        #[arg(long)]
        all_circles: bool,
        /// Print records as JSON instead of writing them
        #[arg(long)]
        dry_run: bool,
        /// Comma-separated list of source IDs (overrides `HAZARD_SOURCES` env var)
        #[arg(long)]
        sources: Option<String>,
    },
    /// Classify and store flood hazards only
    Flood {
        /// Print records as JSON instead of writing them
        #[arg(long)]
        dry_run: bool,
    },
    /// Replace the district warning assignment snapshot
    AssignWarnings {
        /// Comma-separated list of source IDs (overrides `HAZARD_SOURCES` env var)
        #[arg(long)]
        sources: Option<String>,
    },
    /// List the configured fallback chain in priority order
    Sources,
    /// Create all tables on every configured engine
    Migrate,
}

fn progress(multi: &MultiProgress, chain_len: usize) -> RunProgress {
    RunProgress {
        chain: IndicatifProgress::chain_bar(multi, u64::try_from(chain_len).unwrap_or(u64::MAX)),
        writes: IndicatifProgress::writes_bar(multi, "Writing hazard tables"),
    }
}

fn build_chain(config: &PipelineConfig, engines: &Engines) -> Result<SourceChain, Box<dyn std::error::Error>> {
    let defs = config.enabled_sources();
    log::info!(
        "Source chain: {}",
        defs.iter().map(|d| d.id.as_str()).collect::<Vec<_>>().join(" -> ")
    );
    let chain = SourceChain::build(&defs, engines.primary())?;
    if chain.is_empty() {
        return Err("No hazard sources enabled".into());
    }
    Ok(chain)
}

fn report(summary: &RunSummary, dry_run: bool) -> Result<(), Box<dyn std::error::Error>> {
    if dry_run {
        println!("{}", serde_json::to_string_pretty(&summary.records)?);
        return Ok(());
    }

    let Some(report) = &summary.report else {
        return Ok(());
    };
    for write in &report.written {
        log::info!("{}: {} rows -> {}", write.engine, write.rows, write.table);
    }
    if !report.failures.is_empty() {
        log::error!("{} table writes failed", report.failures.len());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = hazard_cli_utils::init_logger();
    let cli = Cli::parse();
    let start = Instant::now();

    match cli.command {
        Commands::Sources => {
            let config = PipelineConfig::load(cli.config.as_deref(), None)?;
            println!("{:<20} {:<10} {:<14} NAME", "ID", "PRIORITY", "KIND");
            println!("{}", "-".repeat(70));
            for def in config.enabled_sources() {
                println!("{:<20} {:<10} {:<14} {}", def.id, def.priority, def.kind(), def.name);
            }
        }
        Commands::Migrate => {
            let config = PipelineConfig::load(cli.config.as_deref(), None)?;
            let engines = Engines::open(&config)?;
            let report = pipeline::migrate(&config, &engines);
            log::info!(
                "Migrations complete: {} tables ensured, {} failed",
                report.written.len(),
                report.failures.len()
            );
        }
        Commands::Run {
            skip_flood,
            dry_run,
            sources,
        } => {
            let config = PipelineConfig::load(cli.config.as_deref(), sources.as_deref())?;
            let engines = Engines::open(&config)?;
            let chain = build_chain(&config, &engines)?;
            let options = RunOptions { skip_flood, dry_run };

            let summary = pipeline::run_text(
                &config,
                &engines,
                &chain,
                &FetchContext::new()?,
                options,
                &progress(&multi, chain.len()),
            )
            .await?;
            report(&summary, dry_run)?;
        }
        Commands::Cyclone {
            policy,
            all_circles,
            dry_run,
            sources,
        } => {
            let config = PipelineConfig::load(cli.config.as_deref(), sources.as_deref())?;
            let policy = match policy {
                Some(p) => CyclonePolicy::from_str(&p).map_err(|_| format!("Unknown cyclone policy: {p}"))?,
                None => config.classifier.cyclone.policy,
            };
            let engines = Engines::open(&config)?;
            let chain = build_chain(&config, &engines)?;
            let options = RunOptions {
                skip_flood: true,
                dry_run,
            };

            let summary = pipeline::run_cyclone(
                &config,
                &engines,
                &chain,
                &FetchContext::new()?,
                policy,
                all_circles,
                options,
                &progress(&multi, chain.len()),
            )
            .await?;
            report(&summary, dry_run)?;
        }
        Commands::Flood { dry_run } => {
            let config = PipelineConfig::load(cli.config.as_deref(), None)?;
            let engines = Engines::open(&config)?;
            let options = RunOptions {
                skip_flood: false,
                dry_run,
            };

            let summary = pipeline::run_flood(
                &config,
                &engines,
                &FetchContext::new()?,
                options,
                &RunProgress {
                    chain: null_progress(),
                    writes: IndicatifProgress::writes_bar(&multi, "Writing flood table"),
                },
            )
            .await?;
            report(&summary, dry_run)?;
        }
        Commands::AssignWarnings { sources } => {
            let config = PipelineConfig::load(cli.config.as_deref(), sources.as_deref())?;
            let engines = Engines::open(&config)?;
            let chain = build_chain(&config, &engines)?;

            let report = pipeline::assign_warnings(
                &engines,
                &chain,
                &FetchContext::new()?,
                &progress(&multi, chain.len()),
            )
            .await?;
            log::info!(
                "Assignment snapshot: {} rows written, {} engines failed",
                report.rows_written(),
                report.failures.len()
            );
        }
    }

    log::info!("Done in {:.1}s", start.elapsed().as_secs_f64());
    Ok(())
}
