//! Runtime settings shared by the binaries
//!
//! Every setting is a command-line flag that falls back to an environment
//! variable, then to a built-in default.

use chrono::NaiveDate;
use clap::Args;
use std::path::{Path, PathBuf};

pub const FIN_RULES_YAML: &str = "FIN_RULES_YAML";
pub const FIN_OUTPUT_DIR: &str = "FIN_OUTPUT_DIR";
pub const HEALTH_RULES_FILE: &str = "HEALTH_RULES_FILE";
pub const HEALTH_INPUT_DIR: &str = "HEALTH_INPUT_DIR";
pub const HEALTH_OUTPUT_DIR: &str = "HEALTH_OUTPUT_DIR";
/// Single-entity finance request body
pub const FINANCE_DATA: &str = "FINANCE_DATA";

#[derive(Debug, Clone, PartialEq, Eq, Args)]
pub struct FinanceSettings {
    /// Finance rules YAML; built-in rules when unset
    #[arg(long, env = FIN_RULES_YAML)]
    pub rules: Option<PathBuf>,

    /// Base directory for results (a dated folder is created below it)
    #[arg(long, env = FIN_OUTPUT_DIR, default_value = "finance_scores")]
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Args)]
pub struct HealthSettings {
    /// Health rules YAML; built-in rules when unset
    #[arg(long, env = HEALTH_RULES_FILE)]
    pub rules: Option<PathBuf>,

    /// Directory of health proposal JSON payloads
    #[arg(long, env = HEALTH_INPUT_DIR, default_value = "health_inputs")]
    pub input_dir: PathBuf,

    #[arg(long, env = HEALTH_OUTPUT_DIR, default_value = "health_scores")]
    pub output_dir: PathBuf,
}

/// `<base>/<YYYYMMDD>`
pub fn dated_dir(base: &Path, date: NaiveDate) -> PathBuf {
    base.join(date.format("%Y%m%d").to_string())
}
