//! Score several finance input files as consecutive batches
//!
//! The rules file is checked for changes before each batch and reloaded if it
//! moved on disk. A batch always runs against a single rule snapshot; a bad
//! edit to the rules keeps the previous rules in force.

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use std::path::PathBuf;
use std::time::Instant;
use underwriting_scores::batch::{export_finance, run_finance, BatchStats};
use underwriting_scores::settings::{dated_dir, FinanceSettings};
use underwriting_scores::source::{load_finance_inputs, MemorySource};
use underwriting_scores::{FinanceRules, RuleStore};

#[derive(Parser)]
#[command(name = "score_batch", about = "Run finance scoring over several input files")]
struct Cli {
    #[command(flatten)]
    settings: FinanceSettings,

    /// Input files or directories, one batch each
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let start = Instant::now();

    let store = match &cli.settings.rules {
        Some(path) => RuleStore::open(path)
            .with_context(|| format!("loading finance rules from {}", path.display()))?,
        None => RuleStore::from_rules(FinanceRules::default_rules()?),
    };
    let out_dir = dated_dir(&cli.settings.output_dir, Local::now().date_naive());

    let mut totals = BatchStats::default();
    for input in &cli.inputs {
        match store.reload_if_changed() {
            Ok(true) => log::info!("Rules reloaded before batch {}", input.display()),
            Ok(false) => {}
            Err(err) => log::error!("Rules reload failed, keeping previous rules: {}", err),
        }

        let load = match load_finance_inputs(input) {
            Ok(load) => load,
            Err(err) => {
                log::error!("Skipping batch {}: {}", input.display(), err);
                totals.source_failures += 1;
                continue;
            }
        };

        let batch_start = Instant::now();
        let mut batch = run_finance(&store, &MemorySource::finance(load.inputs));
        batch.stats.source_failures += load.failures;
        export_finance(&mut batch, &out_dir).context("preparing finance output directory")?;
        log::info!(
            "Batch {} done in {:?}: {} scored, {} written",
            input.display(),
            batch_start.elapsed(),
            batch.stats.scored,
            batch.stats.written
        );

        totals.scored += batch.stats.scored;
        totals.source_failures += batch.stats.source_failures;
        totals.manual_review += batch.stats.manual_review;
        totals.written += batch.stats.written;
        totals.export_failures += batch.stats.export_failures;
    }

    println!("{}", serde_json::to_string_pretty(&totals)?);
    log::info!("Total time: {:?}", start.elapsed());
    Ok(())
}
