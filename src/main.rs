//! trawl main entry point
//!
//! This is the command-line interface for timeline and social-graph runs.

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use trawl::config::{load_config_with_hash, Config, OutputFormat};
use trawl::crawler::{crawl_graph, crawl_timelines};
use trawl::graph::NeighborMode;
use trawl::input::load_entities;
use trawl::output::{print_report, RunReport, TsvCorpusWriter, TsvEdgeWriter};
use trawl::storage::{open_storage, SqliteSink, SqliteStorage, Storage};
use trawl::TrawlError;

/// trawl: date-window timeline and social-graph retrieval
///
/// Reads a list of entities, one per line, and retrieves either the part of
/// each entity's timeline that falls inside a date window, or each entity's
/// neighbor edges, from a rate-limited REST API.
#[derive(Parser, Debug)]
#[command(name = "trawl")]
#[command(version)]
#[command(about = "Date-window timeline and social-graph retrieval", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, value_name = "CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    /// Validate config and inputs and show what would be crawled
    #[arg(long, global = true)]
    dry_run: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Retrieve each entity's timeline within a date window
    Timeline {
        /// File listing one entity per line
        #[arg(value_name = "USERS_FILE")]
        users_file: PathBuf,

        /// Output directory (tsv) or database file (sqlite)
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,

        /// Window start, RFC 3339 or YYYY-MM-DD (overrides [window] start)
        #[arg(long)]
        start: Option<String>,

        /// Window end, RFC 3339 or YYYY-MM-DD (overrides [window] end)
        #[arg(long)]
        end: Option<String>,
    },

    /// Retrieve each entity's neighbor edges
    Graph {
        /// File listing one entity per line
        #[arg(value_name = "USERS_FILE")]
        users_file: PathBuf,

        /// Edge file (tsv) or database file (sqlite)
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,

        /// Neighbor paging: cursor or single-shot (overrides [crawler] neighbor-mode)
        #[arg(long)]
        mode: Option<NeighborMode>,
    },

    /// Show the latest run stored in a SQLite output database and exit
    Stats {
        /// Database file written by a sqlite-format run
        #[arg(value_name = "DATABASE")]
        database: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    if let Some(path) = &cli.config {
        tracing::info!("Loading configuration from: {}", path.display());
    }
    let (mut config, config_hash) = load_config_with_hash(cli.config.as_deref())
        .context("failed to load configuration")?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    let shutdown = CancellationToken::new();
    spawn_interrupt_handler(shutdown.clone());

    match cli.command {
        Command::Timeline {
            users_file,
            output,
            start,
            end,
        } => {
            config.window = config.window.with_overrides(start, end);
            let report = handle_timeline(
                &config,
                &config_hash,
                &users_file,
                &output,
                cli.dry_run,
                shutdown,
            )
            .await?;
            if let Some(report) = report {
                print_report(&report);
            }
        }
        Command::Graph {
            users_file,
            output,
            mode,
        } => {
            if let Some(mode) = mode {
                config.crawler.neighbor_mode = mode;
            }
            let report = handle_graph(
                &config,
                &config_hash,
                &users_file,
                &output,
                cli.dry_run,
                shutdown,
            )
            .await?;
            if let Some(report) = report {
                print_report(&report);
            }
        }
        Command::Stats { database } => handle_stats(&database)?,
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("trawl=info,warn"),
            1 => EnvFilter::new("trawl=debug,info"),
            2 => EnvFilter::new("trawl=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Cancels `shutdown` on Ctrl-C so sleeps end and no further entity starts
fn spawn_interrupt_handler(shutdown: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping after the current request");
            shutdown.cancel();
        }
    });
}

/// Handles the timeline subcommand
async fn handle_timeline(
    config: &Config,
    config_hash: &str,
    users_file: &Path,
    output: &Path,
    dry_run: bool,
    shutdown: CancellationToken,
) -> anyhow::Result<Option<RunReport>> {
    let window = config.window.resolve()?.ok_or_else(|| {
        anyhow!("timeline runs need a date window: pass --start and --end or set [window]")
    })?;
    let entities = load_entities(users_file)?;
    tracing::info!(
        "{} entities, window {}, {} output to {}",
        entities.len(),
        window,
        config.output.format,
        output.display()
    );

    if dry_run {
        print_dry_run(config, entities.len(), output);
        println!("  Window: {}", window);
        return Ok(None);
    }

    let report = match config.output.format {
        OutputFormat::Tsv => {
            let mut sink = TsvCorpusWriter::create(output)?;
            crawl_timelines(config, &entities, &window, &mut sink, shutdown).await?
        }
        OutputFormat::Sqlite => {
            let mut sink = SqliteSink::start(open_storage(output)?, config_hash, "timeline")?;
            let result = crawl_timelines(config, &entities, &window, &mut sink, shutdown).await;
            finish_sqlite(&mut sink, result)?
        }
    };
    Ok(Some(report))
}

/// Handles the graph subcommand
async fn handle_graph(
    config: &Config,
    config_hash: &str,
    users_file: &Path,
    output: &Path,
    dry_run: bool,
    shutdown: CancellationToken,
) -> anyhow::Result<Option<RunReport>> {
    let entities = load_entities(users_file)?;
    tracing::info!(
        "{} entities, {} mode, {} output to {}",
        entities.len(),
        config.crawler.neighbor_mode,
        config.output.format,
        output.display()
    );

    if dry_run {
        print_dry_run(config, entities.len(), output);
        return Ok(None);
    }

    let report = match config.output.format {
        OutputFormat::Tsv => {
            let mut sink = TsvEdgeWriter::create(output)?;
            crawl_graph(config, &entities, &mut sink, shutdown).await?
        }
        OutputFormat::Sqlite => {
            let mut sink = SqliteSink::start(open_storage(output)?, config_hash, "graph")?;
            let result = crawl_graph(config, &entities, &mut sink, shutdown).await;
            finish_sqlite(&mut sink, result)?
        }
    };
    Ok(Some(report))
}

/// Closes a SQLite run according to how the crawl ended
fn finish_sqlite(
    sink: &mut SqliteSink,
    result: Result<RunReport, TrawlError>,
) -> anyhow::Result<RunReport> {
    match result {
        Ok(report) => {
            sink.finish(&report)?;
            Ok(report)
        }
        Err(e) => {
            if let Err(abandon_err) = sink.abandon() {
                tracing::error!("Could not mark run as failed: {}", abandon_err);
            }
            Err(e.into())
        }
    }
}

/// Prints the effective settings of a dry run
fn print_dry_run(config: &Config, entity_count: usize, output: &Path) {
    println!("=== trawl Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Page size: {}", config.crawler.page_size);
    println!("  Pacing delay: {}ms", config.crawler.pacing_delay_ms);
    println!("  Chunk size: {}", config.crawler.chunk_size);
    println!("  Neighbor mode: {}", config.crawler.neighbor_mode);
    println!("  Resolve names: {}", config.crawler.resolve_names);

    println!("\nRetry:");
    println!("  Budget: {}", config.retry.budget);
    println!("  Network delay: {}ms", config.retry.network_delay_ms);
    println!(
        "  Rate-limit slack: {}s (page-index), {}s (cursor)",
        config.retry.page_index_slack_secs, config.retry.cursor_slack_secs
    );

    println!("\nAPI:");
    println!("  Base URL: {}", config.api.base_url);
    println!("  User agent: {}", config.api.user_agent);
    if let Some(var) = &config.api.token_env {
        println!("  Token variable: {}", var);
    }

    println!("\nOutput:");
    println!("  Format: {}", config.output.format);
    println!("  Path: {}", output.display());

    println!("\nWould crawl {} entities", entity_count);
}

/// Handles the stats subcommand: shows the latest stored run
fn handle_stats(database: &Path) -> anyhow::Result<()> {
    if !database.exists() {
        return Err(anyhow!("database not found: {}", database.display()));
    }
    let storage = SqliteStorage::new(database)?;
    let run = storage
        .get_latest_run()?
        .ok_or_else(|| anyhow!("no runs found in {}", database.display()))?;

    println!("=== Run {} ===\n", run.id);
    println!("  Mode: {}", run.mode);
    println!("  Status: {}", run.status.to_db_string());
    println!("  Started: {}", run.started_at);
    println!(
        "  Finished: {}",
        run.finished_at.as_deref().unwrap_or("(not finished)")
    );
    println!("  Config hash: {}", run.config_hash);
    println!("  Feed items: {}", storage.count_feed_items(run.id)?);
    println!("  Edges: {}", storage.count_edges(run.id)?);
    println!();

    let outcomes = storage.load_entity_outcomes(run.id)?;
    println!("Entities ({}):", outcomes.len());
    for report in &outcomes {
        match &report.cause {
            Some(cause) => println!(
                "  - {} [{}] {} records: {}",
                report.entity, report.outcome, report.records, cause
            ),
            None => println!(
                "  - {} [{}] {} records",
                report.entity, report.outcome, report.records
            ),
        }
    }
    println!();

    let tally = storage.load_failure_tally(run.id)?;
    if tally.is_empty() {
        println!("Failure Tally: none");
    } else {
        println!("Failure Tally:");
        for (code, count) in tally {
            println!("  {}: {}", code, count);
        }
    }

    Ok(())
}
