//! Underwriting Scores - rule-driven finance and health risk scoring
//!
//! This library provides:
//! - YAML rule sets (weights, band tables, decision tables) with hot reload
//! - Input canonicalisation and feature derivation (income ratios, lifestyle and CBC points)
//! - Banded scoring, weighted and member-averaged aggregation
//! - Ordered, first-match risk category and underwriting flag decisions
//! - Parallel batch scoring with per-entity JSON export

pub mod aggregate;
pub mod bands;
pub mod batch;
pub mod decision;
pub mod engine;
pub mod error;
pub mod features;
pub mod input;
pub mod preprocess;
pub mod record;
pub mod report;
pub mod rules;
pub mod settings;
pub mod source;
pub mod validation;

// Re-export commonly used types
pub use bands::{Band, BandTable, MissPolicy};
pub use decision::{Decision, DecisionTable};
pub use engine::{FinanceEngine, FinanceScore, HealthEngine, HealthScore};
pub use error::{ConfigError, ExportError, InputError, SourceError};
pub use input::{FinanceInput, HealthProposal, LabValues};
pub use record::{ComponentScore, ScoreFactor, ScoreRecord};
pub use rules::{FinanceRules, HealthRules, RuleSet, RuleStore};
pub use settings::{FinanceSettings, HealthSettings};
