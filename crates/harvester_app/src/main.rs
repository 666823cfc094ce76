mod cli;
mod config;

use anyhow::Context;
use clap::Parser;
use harvest_logging::{harvest_info, harvest_warn, level_from_verbosity};
use harvester_engine::{FileReport, HarvestEngine};

use crate::cli::Cli;
use crate::config::AppConfig;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    config.apply_cli(&cli);

    harvest_logging::initialize(config.log.destination(), level_from_verbosity(cli.verbose));

    if config.inputs.is_empty() {
        harvest_warn!("no input files given");
        return Ok(());
    }
    harvest_info!(
        "{} input file(s), mode {:?}, up to {} records in flight, {} proxy credential(s)",
        config.inputs.len(),
        config.mode,
        config.max_concurrency.max(1),
        config.proxy.credentials.len()
    );

    let engine = HarvestEngine::new(config.pipeline_config()?, config.fetch_settings())
        .context("cannot start harvester engine")?;

    // Failed files are logged by the engine and skipped.
    for (_, result) in engine.run_files(&config.inputs) {
        if let Ok(report) = result {
            print_report(&report);
        }
    }
    Ok(())
}

fn print_report(report: &FileReport) {
    println!("{} -> {}", report.input.display(), report.output.display());
    println!("  {}", report.summary);
    println!(
        "  served via proxy: {}, elapsed: {:.2}s",
        report.proxy_hits(),
        report.elapsed.as_secs_f64()
    );
    if !report.summary.duplicate_emails.is_empty() {
        println!(
            "  duplicate emails: {}",
            report.summary.duplicate_emails.join(", ")
        );
    }
}
