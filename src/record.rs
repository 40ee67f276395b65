//! Score records produced per scored entity

use serde::{Deserialize, Serialize};

/// Maximum number of factors kept on a record
pub const MAX_TOP_FACTORS: usize = 3;

/// Why a component has no score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComputationGap {
    /// Missing inputs or a non-positive denominator
    UndefinedRatio,
    /// The metric fell outside every band
    OutOfBands,
}

/// One scored component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentScore {
    pub name: String,

    /// Input amount the metric was derived from
    pub raw_value: Option<f64>,

    pub ratio_or_metric: Option<f64>,

    pub score: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gap: Option<ComputationGap>,
}

impl ComponentScore {
    /// Build a component, classifying a missing score
    pub fn new(name: &str, raw_value: Option<f64>, metric: Option<f64>, score: Option<i64>) -> Self {
        let gap = match (metric, score) {
            (None, _) => Some(ComputationGap::UndefinedRatio),
            (Some(_), None) => Some(ComputationGap::OutOfBands),
            _ => None,
        };
        Self {
            name: name.to_string(),
            raw_value,
            ratio_or_metric: metric,
            score,
            gap,
        }
    }
}

/// A component's weighted share of the final score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreFactor {
    pub feature: String,
    pub score: Option<i64>,
    pub weight: f64,
    pub contribution: f64,
}

/// Highest-contribution factors, at most [`MAX_TOP_FACTORS`].
/// Ties keep their input order.
pub fn top_factors(mut factors: Vec<ScoreFactor>) -> Vec<ScoreFactor> {
    factors.sort_by(|a, b| b.contribution.total_cmp(&a.contribution));
    factors.truncate(MAX_TOP_FACTORS);
    factors
}

/// Result of scoring one entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub entity_id: String,
    pub component_scores: Vec<ComponentScore>,
    pub final_score: Option<i64>,
    pub risk_category: Option<String>,
    pub underwriting_flag: String,
    pub top_factors: Vec<ScoreFactor>,
    pub validation_issues: Vec<String>,
}

impl ScoreRecord {
    pub fn component(&self, name: &str) -> Option<&ComponentScore> {
        self.component_scores.iter().find(|c| c.name == name)
    }
}
