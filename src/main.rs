//! `phantom-scan`: find npm packages that import modules they never declare.
//!
//! # Flow
//! 1. Parse CLI arguments ([`cli`]) and install the tracing subscriber.
//! 2. Load config ([`config::load_config`]) and open the findings store ([`store`]).
//! 3. Run the requested command:
//!    - `menu` / `downloads` / `collect`: batch over the package universe
//!      ([`universe`], [`batch`]): registry metadata and download counts
//!      ([`registry`]), then clone, install and check ([`analyzer`]).
//!    - `seed`: import the text format ([`seed`]).
//!    - `report`, `show`, `search`, `list`, `clear`: query or reset the store
//!      and render the result ([`report`]).

mod analyzer;
mod batch;
mod cli;
mod config;
mod error;
mod menu;
mod models;
mod registry;
mod report;
mod retry;
mod seed;
mod store;
mod universe;

use std::io::BufReader;

use anyhow::{bail, Result};
use clap::Parser;
use colored::Colorize;
use serde::Serialize;
use tracing::{info, Level};

use batch::{BatchSummary, Scanner};
use cli::{Cli, Command, OutputFormat, RangeArgs};
use config::{load_config, Config};
use menu::{Menu, Task};
use models::IndexRange;
use report::Analysis;
use store::FindingsStore;
use universe::Universe;

#[tokio::main]
async fn main() -> Result<()> {
    let mut cli = Cli::parse();

    let level = if cli.quiet {
        Level::ERROR
    } else if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cwd = std::env::current_dir()?;
    let mut config = load_config(&cwd, cli.config.as_deref())?;
    if let Some(db) = &cli.db {
        config.store.path = db.clone();
    }
    if let Some(names) = &cli.names {
        config.universe.names = names.clone();
    }

    // The one store handle for the whole run.
    let store = FindingsStore::open(&config.store.path)?;

    match cli.command.take().unwrap_or(Command::Menu) {
        Command::Menu => {
            let universe = load_universe(&config, cli.quiet)?;
            let stdin = std::io::stdin();
            let selection = Menu::new(
                BufReader::new(stdin.lock()),
                std::io::stdout(),
                universe.len(),
                config.batch.auto_range(),
            )
            .run()?;
            run_task(&config, &store, &universe, selection.task, selection.range, &cli).await?;
        }
        Command::Downloads(args) => {
            let universe = load_universe(&config, cli.quiet)?;
            let range = resolve_range(&args, &config, &universe)?;
            run_task(&config, &store, &universe, Task::Downloads, range, &cli).await?;
        }
        Command::Collect(args) => {
            let universe = load_universe(&config, cli.quiet)?;
            let range = resolve_range(&args, &config, &universe)?;
            run_task(&config, &store, &universe, Task::Collect, range, &cli).await?;
        }
        Command::Seed { file } => {
            let count = seed::seed_from_file(&store, &file)?;
            println!("Seeded {} entries from {}", count, file.display());
        }
        Command::Report { format } => {
            let analysis = Analysis::from_store(&store);
            match format {
                OutputFormat::Terminal => {
                    report::terminal::render_analysis(&analysis, store.path(), cli.quiet)
                }
                OutputFormat::Json => print_json(&analysis)?,
            }
        }
        Command::Show { package, format } => match store.get(&package) {
            Some(finding) => match format {
                OutputFormat::Terminal => report::terminal::render_findings(&[finding]),
                OutputFormat::Json => print_json(&finding)?,
            },
            None => {
                eprintln!("No findings recorded for {}", package);
                std::process::exit(1);
            }
        },
        Command::Search { dependency, format } => {
            let findings = store.search_by_dependency(&dependency);
            match format {
                OutputFormat::Terminal if findings.is_empty() => {
                    println!("No packages list {} as a phantom dependency", dependency)
                }
                OutputFormat::Terminal => report::terminal::render_findings(&findings),
                OutputFormat::Json => print_json(&findings)?,
            }
        }
        Command::List { format } => {
            let findings = store.list_all();
            match format {
                OutputFormat::Terminal => report::terminal::render_findings(&findings),
                OutputFormat::Json => print_json(&findings)?,
            }
        }
        Command::Clear { yes } => {
            if !yes {
                bail!("clearing {} is irreversible; pass --yes to confirm", store.path().display());
            }
            store.clear()?;
            println!("Cleared {}", store.path().display());
        }
    }

    Ok(())
}

fn load_universe(config: &Config, quiet: bool) -> Result<Universe> {
    let universe = Universe::load(&config.universe.names)?;
    if !quiet {
        println!(
            "Total number of packages (from {}): {}\n",
            config.universe.names.display(),
            universe.len()
        );
    }
    Ok(universe)
}

/// Explicit `--start/--end`, validated against the universe, or the configured range.
fn resolve_range(args: &RangeArgs, config: &Config, universe: &Universe) -> Result<IndexRange> {
    let (Some(start), Some(end)) = (args.start, args.end) else {
        return Ok(config.batch.auto_range());
    };
    let start = menu::validate_start(&start.to_string(), universe.len())
        .map_err(|msg| anyhow::anyhow!("--start {start}: {msg}"))?;
    let end = menu::validate_end(&end.to_string(), start, universe.len())
        .map_err(|msg| anyhow::anyhow!("--end {end}: {msg}"))?;
    Ok(IndexRange { start, end })
}

async fn run_task(
    config: &Config,
    store: &FindingsStore,
    universe: &Universe,
    task: Task,
    range: IndexRange,
    cli: &Cli,
) -> Result<()> {
    let names = universe.slice(range);
    if !cli.quiet {
        println!("Starting process for range {}\n", range);
    }
    info!(%range, packages = names.len(), "Starting batch");

    let scanner = Scanner::new(config, store, cli.verbose, cli.quiet)?;
    let mut stdout = std::io::stdout();
    let summary = match task {
        Task::Downloads => scanner.report_downloads(names, &mut stdout).await?,
        Task::Collect => scanner.collect(names, &mut stdout).await?,
    };

    print_summary(task, &summary);
    Ok(())
}

fn print_summary(task: Task, summary: &BatchSummary) {
    match task {
        Task::Downloads => println!(
            "\n {} {} packages, {} failed",
            "Done:".green().bold(),
            summary.processed,
            summary.failed
        ),
        Task::Collect => println!(
            "\n {} {} packages, {} with phantom dependencies, {} skipped after errors",
            "Done:".green().bold(),
            summary.processed,
            summary.with_phantoms.to_string().yellow(),
            summary.failed
        ),
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
