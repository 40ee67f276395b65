//! Underwriting Scores CLI
//!
//! Finance and health scoring over files, plus single-proposal finance scoring

use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use underwriting_scores::batch::{export_finance, export_health, run_finance, run_health};
use underwriting_scores::report::FinanceReport;
use underwriting_scores::settings::{
    dated_dir, FinanceSettings, HealthSettings, FINANCE_DATA, FIN_RULES_YAML, HEALTH_RULES_FILE,
};
use underwriting_scores::source::{load_finance_inputs, DocumentLabs, JsonDirSource, MemorySource};
use underwriting_scores::validation::missing_request_fields;
use underwriting_scores::{FinanceEngine, FinanceInput, FinanceRules, HealthRules, RuleSet, RuleStore};

#[derive(Parser)]
#[command(
    name = "underwriting-scores",
    version,
    about = "Finance and health risk scoring for insurance proposals"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score finance proposals from a CSV file, JSON file or directory of JSON files
    Finance(FinanceCommand),
    /// Score health proposals from a directory of JSON payloads
    Health(HealthCommand),
    /// Score one finance proposal and print the result as JSON
    ScoreOne(ScoreOneCommand),
    /// Load and validate rule files without scoring
    CheckRules(CheckRulesCommand),
}

#[derive(Args)]
struct FinanceCommand {
    /// Proposal inputs
    #[arg(long)]
    input: PathBuf,
    #[command(flatten)]
    settings: FinanceSettings,
}

#[derive(Args)]
struct HealthCommand {
    #[command(flatten)]
    settings: HealthSettings,
}

#[derive(Args)]
struct ScoreOneCommand {
    /// Proposal as a JSON object
    #[arg(long, env = FINANCE_DATA)]
    json: Option<String>,
    #[arg(long, env = FIN_RULES_YAML)]
    rules: Option<PathBuf>,
}

#[derive(Args)]
struct CheckRulesCommand {
    #[arg(long, env = FIN_RULES_YAML)]
    finance: Option<PathBuf>,
    #[arg(long, env = HEALTH_RULES_FILE)]
    health: Option<PathBuf>,
}

fn open_store<R: RuleSet>(path: Option<PathBuf>, defaults: fn() -> Result<R, underwriting_scores::ConfigError>) -> Result<RuleStore<R>> {
    match path {
        Some(path) => RuleStore::open(&path)
            .with_context(|| format!("loading {} rules from {}", R::NAME, path.display())),
        None => {
            log::info!("Using built-in {} rules", R::NAME);
            Ok(RuleStore::from_rules(defaults().context("built-in rules are invalid")?))
        }
    }
}

fn run_finance_command(cmd: FinanceCommand) -> Result<()> {
    let settings = cmd.settings;
    let store = open_store(settings.rules, FinanceRules::default_rules)?;
    let load = load_finance_inputs(&cmd.input)
        .with_context(|| format!("reading finance inputs from {}", cmd.input.display()))?;
    if load.inputs.is_empty() {
        log::warn!("No finance proposals found in {}", cmd.input.display());
    }

    let mut batch = run_finance(&store, &MemorySource::finance(load.inputs));
    batch.stats.source_failures += load.failures;
    let out_dir = dated_dir(&settings.output_dir, Local::now().date_naive());
    export_finance(&mut batch, &out_dir).context("preparing finance output directory")?;

    println!("{}", serde_json::to_string_pretty(&batch.stats)?);
    Ok(())
}

fn run_health_command(cmd: HealthCommand) -> Result<()> {
    let settings = cmd.settings;
    let store = open_store(settings.rules, HealthRules::default_rules)?;
    let source = JsonDirSource::open(&settings.input_dir)
        .with_context(|| format!("listing health inputs in {}", settings.input_dir.display()))?;

    let mut batch = run_health(&store, &source, &DocumentLabs);
    let out_dir = dated_dir(&settings.output_dir, Local::now().date_naive());
    export_health(&mut batch, &out_dir).context("writing health results")?;

    println!("{}", serde_json::to_string_pretty(&batch.stats)?);
    Ok(())
}

fn run_score_one(cmd: ScoreOneCommand) -> Result<()> {
    let body = match cmd.json {
        Some(body) => body,
        None => bail!("no proposal given: pass --json or set {}", FINANCE_DATA),
    };
    let input: FinanceInput = serde_json::from_str(&body).context("parsing proposal JSON")?;
    let missing = missing_request_fields(&input);
    if !missing.is_empty() {
        bail!("missing required fields: {}", missing.join(", "));
    }

    let store = open_store(cmd.rules, FinanceRules::default_rules)?;
    log::info!("Calculating finance score for proposal {}", input.proposal_number);
    let engine = FinanceEngine::new(store.snapshot());
    let report = FinanceReport::new(&engine.score(&input)).calculated_at(Local::now());

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn run_check_rules(cmd: CheckRulesCommand) -> Result<()> {
    let finance = open_store(cmd.finance, FinanceRules::default_rules)?;
    let health = open_store(cmd.health, HealthRules::default_rules)?;
    println!(
        "finance rules OK ({} category rules, {} flag rules)",
        finance.snapshot().decisions().categories().len(),
        finance.snapshot().decisions().flags().len()
    );
    println!(
        "health rules OK ({} category rules, {} flag rules)",
        health.snapshot().decisions().categories().len(),
        health.snapshot().decisions().flags().len()
    );
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Finance(cmd) => run_finance_command(cmd),
        Commands::Health(cmd) => run_health_command(cmd),
        Commands::ScoreOne(cmd) => run_score_one(cmd),
        Commands::CheckRules(cmd) => run_check_rules(cmd),
    }
}
