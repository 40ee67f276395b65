//! Banded threshold scoring
//!
//! A band table is an ordered list of intervals, each mapped to an integer
//! score. Evaluation is first-match-wins.

use serde::{Deserialize, Serialize};

fn default_inclusive_max() -> bool {
    true
}

/// A single scoring interval. `None` bounds are unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    #[serde(default)]
    pub min: Option<f64>,

    #[serde(default)]
    pub max: Option<f64>,

    /// Whether `max` itself belongs to the band
    #[serde(default = "default_inclusive_max")]
    pub inclusive_max: bool,

    pub score: i64,
}

impl Band {
    pub fn new(min: Option<f64>, max: Option<f64>, inclusive_max: bool, score: i64) -> Self {
        Self {
            min,
            max,
            inclusive_max,
            score,
        }
    }

    /// Whether `value` lies inside this band
    pub fn contains(&self, value: f64) -> bool {
        let ok_min = self.min.map_or(true, |min| value >= min);
        let ok_max = match self.max {
            None => true,
            Some(max) if self.inclusive_max => value <= max,
            Some(max) => value < max,
        };
        ok_min && ok_max
    }
}

/// What to return when a value falls in no band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissPolicy {
    /// No score (finance)
    #[default]
    #[serde(alias = "none")]
    Null,
    /// Score of the last band (health percent-outside-range tables)
    ClampToLast,
}

/// Ordered band table with its miss policy
#[derive(Debug, Clone, PartialEq)]
pub struct BandTable {
    bands: Vec<Band>,
    miss: MissPolicy,
}

impl BandTable {
    pub fn new(bands: Vec<Band>, miss: MissPolicy) -> Self {
        Self { bands, miss }
    }

    pub fn bands(&self) -> &[Band] {
        &self.bands
    }

    pub fn miss_policy(&self) -> MissPolicy {
        self.miss
    }

    /// Score a value against the table
    pub fn score(&self, value: Option<f64>) -> Option<i64> {
        score_with_policy(value, &self.bands, self.miss)
    }
}

/// First-match band lookup. `None` input or no matching band yields `None`.
pub fn score(value: Option<f64>, bands: &[Band]) -> Option<i64> {
    let value = value?;
    if value.is_nan() {
        return None;
    }
    bands.iter().find(|band| band.contains(value)).map(|band| band.score)
}

/// Band lookup with an explicit policy for values outside every band
pub fn score_with_policy(value: Option<f64>, bands: &[Band], miss: MissPolicy) -> Option<i64> {
    let value = value?;
    match (score(Some(value), bands), miss) {
        (Some(s), _) => Some(s),
        (None, MissPolicy::Null) => None,
        (None, MissPolicy::ClampToLast) => bands.last().map(|band| band.score),
    }
}
