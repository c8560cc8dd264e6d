mod cli;
mod config;

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::info;

use sieve_core::{Config, FilterDefinition};
use sieve_filters::{
    DefaultFactory, FilterCompiler, FilterLoader, FilterScanner, LoaderContext, ScannerBuilder,
    YamlCompiler,
};

use crate::cli::{CliArgs, Command, ConfigOverrides};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();

    match args.command {
        Command::Check { file } => check(&file),
        Command::Run => run(load_config(&args.overrides)?).await,
        Command::List { filter_type } => {
            list(load_config(&args.overrides)?, filter_type.as_deref()).await
        }
    }
}

fn load_config(overrides: &ConfigOverrides) -> Result<Config> {
    sieve_core::config::load_dotenv();
    config::resolve(overrides).context("failed to load configuration")
}

fn new_loader() -> Arc<FilterLoader> {
    Arc::new(FilterLoader::new(LoaderContext::new(
        Arc::new(YamlCompiler::new()),
        Arc::new(DefaultFactory),
    )))
}

/// Initial scan runs on a blocking thread; it reads and compiles files.
async fn start_scanner(config: &Config) -> Result<FilterScanner> {
    let builder = ScannerBuilder::from_config(new_loader(), &config.filters);
    let scanner = tokio::task::spawn_blocking(move || builder.init())
        .await
        .context("scanner init task failed")?
        .context("failed to start filter scanner")?;
    Ok(scanner)
}

async fn run(config: Config) -> Result<()> {
    config.log_summary();
    let scanner = Arc::new(start_scanner(&config).await?);
    log_active_filters(scanner.loader());

    // Log the active set whenever a poll cycle changes it.
    let watcher = Arc::clone(&scanner);
    let reporter = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(watcher.interval());
        let mut seen_cycles = watcher.cycles();
        loop {
            ticker.tick().await;
            let cycles = watcher.cycles();
            if cycles == seen_cycles {
                continue;
            }
            seen_cycles = cycles;
            if watcher.last_report().is_some_and(|r| r.changed()) {
                log_active_filters(watcher.loader());
            }
        }
    });

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;
    info!("interrupt received, stopping filter scanner");

    reporter.abort();
    tokio::task::spawn_blocking(move || scanner.join())
        .await
        .context("scanner shutdown task failed")?;
    info!("sieve exited cleanly");
    Ok(())
}

fn log_active_filters(loader: &FilterLoader) {
    for filter_type in loader.filter_types() {
        let names: Vec<String> = loader
            .filters_by_type(&filter_type)
            .iter()
            .map(|f| format!("{}({})", f.name(), f.priority()))
            .collect();
        info!(filter_type = %filter_type, filters = ?names, "active filters");
    }
}

#[derive(Serialize)]
struct FilterSummary {
    name: String,
    priority: i32,
}

async fn list(config: Config, only_type: Option<&str>) -> Result<()> {
    let scanner = start_scanner(&config).await?;
    scanner.shutdown();

    let loader = scanner.loader();
    let types = match only_type {
        Some(t) => vec![t.to_string()],
        None => loader.filter_types(),
    };

    let mut grouped: BTreeMap<String, Vec<FilterSummary>> = BTreeMap::new();
    for filter_type in types {
        let filters = loader
            .filters_by_type(&filter_type)
            .iter()
            .map(|f| FilterSummary {
                name: f.name().to_string(),
                priority: f.priority(),
            })
            .collect();
        grouped.insert(filter_type, filters);
    }

    println!("{}", serde_json::to_string_pretty(&grouped)?);

    if let Some(report) = scanner.last_report() {
        for failure in report.failures() {
            tracing::warn!(
                path = %failure.path.display(),
                status = ?failure.status,
                "filter failed to load"
            );
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct CheckOutput<'a> {
    instantiable: bool,
    definition: &'a FilterDefinition,
}

fn check(file: &Path) -> Result<()> {
    let definition = YamlCompiler::new()
        .compile_file(file)
        .with_context(|| format!("failed to compile {}", file.display()))?;
    let output = CheckOutput {
        instantiable: definition.is_instantiable(),
        definition: &definition,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
