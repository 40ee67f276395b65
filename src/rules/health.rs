//! Health rule set: lifestyle point mappings, CBC normal ranges and
//! percent-outside-range bands, and risk buckets

use super::decisions::{compile_decisions, CategoryDoc, DecisionsDoc};
use crate::bands::{Band, BandTable, MissPolicy};
use crate::decision::DecisionTable;
use crate::error::ConfigError;
use crate::preprocess::{normalize_key, UNKNOWN_KEY};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Fields health decision rules may reference
pub const HEALTH_FIELDS: &[&str] = &["score", "final_score", "lifestyle", "cbc"];

/// Hemoglobin range used when neither the member's sex nor `Unknown` is configured
pub const DEFAULT_HEMOGLOBIN_RANGE: NormalRange = NormalRange::new(12.0, 17.5);

/// Lab markers scored by distance from their normal range
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Marker {
    Hemoglobin,
    Wbc,
    Platelets,
    Mcv,
}

impl Marker {
    pub const ALL: [Marker; 4] = [Marker::Hemoglobin, Marker::Wbc, Marker::Platelets, Marker::Mcv];

    pub fn key(&self) -> &'static str {
        match self {
            Marker::Hemoglobin => "hemoglobin",
            Marker::Wbc => "wbc",
            Marker::Platelets => "platelets",
            Marker::Mcv => "mcv",
        }
    }

    /// Lab value keys accepted for this marker, in priority order
    pub fn lab_keys(&self) -> &'static [&'static str] {
        match self {
            Marker::Hemoglobin => &["hemoglobin", "hb"],
            Marker::Wbc => &["wbc", "white_blood_cell"],
            Marker::Platelets => &["platelets"],
            Marker::Mcv => &["mcv"],
        }
    }

    fn default_range(&self) -> NormalRange {
        match self {
            Marker::Hemoglobin => DEFAULT_HEMOGLOBIN_RANGE,
            Marker::Wbc => NormalRange::new(4.0, 11.0),
            Marker::Platelets => NormalRange::new(150.0, 400.0),
            Marker::Mcv => NormalRange::new(80.0, 100.0),
        }
    }
}

/// Composite red-cell pattern key in the markers section
pub const RBC_PATTERN_KEY: &str = "rbc_pattern";

/// Inclusive normal interval for a lab marker
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalRange {
    pub lower: f64,
    pub upper: f64,
}

impl NormalRange {
    pub const fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    /// Relative distance of `value` outside the range, 0 inside it.
    /// `None` when the value is missing or the violated bound is not positive.
    pub fn pct_outside(&self, value: Option<f64>) -> Option<f64> {
        let value = value?;
        if self.lower <= value && value <= self.upper {
            Some(0.0)
        } else if value < self.lower && self.lower > 0.0 {
            Some((self.lower - value).abs() / self.lower)
        } else if value > self.upper && self.upper > 0.0 {
            Some((value - self.upper).abs() / self.upper)
        } else {
            None
        }
    }

    fn from_pair(context: &str, pair: [f64; 2]) -> Result<Self, ConfigError> {
        if !(pair[0] <= pair[1]) {
            return Err(ConfigError::InvalidBand {
                component: context.to_string(),
                index: 0,
                reason: format!("normal range lower {} exceeds upper {}", pair[0], pair[1]),
            });
        }
        Ok(Self::new(pair[0], pair[1]))
    }
}

/// Percent-outside-range bands applied to every marker.
/// Both ends inclusive, first match wins.
pub fn default_percent_bands() -> Vec<Band> {
    vec![
        Band::new(Some(0.0), Some(0.0), true, 12),
        Band::new(Some(0.0), Some(0.10), true, 10),
        Band::new(Some(0.10), Some(0.20), true, 8),
        Band::new(Some(0.20), Some(0.30), true, 4),
        Band::new(Some(0.30), Some(0.40), true, 2),
        Band::new(Some(0.40), None, true, 0),
    ]
}

/// Categorical answer → points, with an `UNKNOWN` fallback entry
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointsMapping {
    points: BTreeMap<String, i64>,
}

impl PointsMapping {
    pub fn new(raw: &BTreeMap<String, i64>) -> Self {
        let points = raw
            .iter()
            .filter_map(|(k, v)| normalize_key(k).map(|key| (key, *v)))
            .collect();
        Self { points }
    }

    /// Canonical key for an answer: itself if mapped, else `UNKNOWN`
    pub fn canonical<'a>(&self, key: Option<&'a str>) -> &'a str {
        match key {
            Some(k) if self.points.contains_key(k) => k,
            _ => UNKNOWN_KEY,
        }
    }

    /// Points for an already-normalised key
    pub fn points(&self, key: Option<&str>) -> i64 {
        self.points
            .get(self.canonical(key))
            .copied()
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubcomponentDoc {
    #[serde(default)]
    pub mapping: BTreeMap<String, i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LifestyleDoc {
    #[serde(default)]
    pub subcomponents: BTreeMap<String, SubcomponentDoc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarkerDoc {
    #[serde(default)]
    pub normal_range: Option<[f64; 2]>,

    /// Sex-specific ranges (hemoglobin), keyed `Male` / `Female` / `Unknown`
    #[serde(default)]
    pub normal_ranges: BTreeMap<String, [f64; 2]>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CbcDoc {
    #[serde(default)]
    pub percent_bands: Option<Vec<Band>>,

    #[serde(default)]
    pub markers: BTreeMap<String, MarkerDoc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HealthComponentsDoc {
    #[serde(default)]
    pub lifestyle: LifestyleDoc,

    #[serde(default)]
    pub cbc: CbcDoc,
}

fn default_health_miss() -> MissPolicy {
    MissPolicy::ClampToLast
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HealthOptions {
    /// Policy for percentages outside every band
    #[serde(default = "default_health_miss")]
    pub out_of_bands: MissPolicy,
}

impl Default for HealthOptions {
    fn default() -> Self {
        Self {
            out_of_bands: default_health_miss(),
        }
    }
}

/// Older documents keep their buckets under `aggregation.risk_buckets`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AggregationDoc {
    #[serde(default)]
    pub risk_buckets: Vec<CategoryDoc>,
}

/// Health rules document as written in YAML
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HealthRulesDoc {
    #[serde(default)]
    pub options: HealthOptions,

    #[serde(default)]
    pub components: HealthComponentsDoc,

    #[serde(default)]
    pub decisions: DecisionsDoc,

    #[serde(default)]
    pub aggregation: Option<AggregationDoc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LifestyleRules {
    pub smoking: PointsMapping,
    pub alcohol: PointsMapping,
    pub diet: PointsMapping,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CbcRules {
    pub percent_bands: BandTable,
    /// Hemoglobin ranges keyed by normalised sex
    hemoglobin_by_sex: BTreeMap<String, NormalRange>,
    ranges: BTreeMap<Marker, NormalRange>,
}

impl CbcRules {
    /// Normal range for a marker; hemoglobin depends on sex
    pub fn range(&self, marker: Marker, sex: Option<&str>) -> NormalRange {
        if marker == Marker::Hemoglobin {
            let by_sex = sex.and_then(|s| self.hemoglobin_by_sex.get(s));
            return by_sex
                .or_else(|| self.hemoglobin_by_sex.get(UNKNOWN_KEY))
                .copied()
                .unwrap_or(DEFAULT_HEMOGLOBIN_RANGE);
        }
        self.ranges
            .get(&marker)
            .copied()
            .unwrap_or_else(|| marker.default_range())
    }
}

/// Validated, immutable health rule set
#[derive(Debug, Clone)]
pub struct HealthRules {
    pub lifestyle: LifestyleRules,
    pub cbc: CbcRules,
    decisions: DecisionTable,
}

impl HealthRules {
    pub fn compile(doc: HealthRulesDoc) -> Result<Self, ConfigError> {
        let subs = &doc.components.lifestyle.subcomponents;
        for key in subs.keys() {
            if !matches!(
                key.as_str(),
                "smoking" | "alcohol" | "diet" | "physical_activity" | "sleep"
            ) {
                return Err(ConfigError::UnknownComponent(format!("lifestyle.{key}")));
            }
        }
        let mapping = |name: &str| {
            subs.get(name)
                .map(|s| PointsMapping::new(&s.mapping))
                .unwrap_or_default()
        };
        let lifestyle = LifestyleRules {
            smoking: mapping("smoking"),
            alcohol: mapping("alcohol"),
            diet: mapping("diet"),
        };

        let cbc_doc = &doc.components.cbc;
        let bands = cbc_doc
            .percent_bands
            .clone()
            .unwrap_or_else(default_percent_bands);
        super::check_bands("cbc.percent_bands", &bands)?;
        if bands.is_empty() {
            return Err(ConfigError::InvalidBand {
                component: "cbc.percent_bands".to_string(),
                index: 0,
                reason: "at least one band is required".to_string(),
            });
        }

        let mut ranges = BTreeMap::new();
        let mut hemoglobin_by_sex = BTreeMap::new();
        for (key, marker_doc) in &cbc_doc.markers {
            if key == RBC_PATTERN_KEY {
                continue;
            }
            let marker = Marker::ALL
                .into_iter()
                .find(|m| m.key() == key)
                .ok_or_else(|| ConfigError::UnknownComponent(format!("cbc.{key}")))?;
            let context = format!("cbc.{key}");
            if let Some(pair) = marker_doc.normal_range {
                ranges.insert(marker, NormalRange::from_pair(&context, pair)?);
            }
            if marker == Marker::Hemoglobin {
                for (sex, pair) in &marker_doc.normal_ranges {
                    if let Some(sex_key) = normalize_key(sex) {
                        hemoglobin_by_sex.insert(sex_key, NormalRange::from_pair(&context, *pair)?);
                    }
                }
                if let Some(range) = ranges.get(&Marker::Hemoglobin) {
                    hemoglobin_by_sex.entry(UNKNOWN_KEY.to_string()).or_insert(*range);
                }
            }
        }

        let mut decisions_doc = doc.decisions.clone();
        if decisions_doc.risk_categories.is_empty() {
            if let Some(aggregation) = &doc.aggregation {
                decisions_doc.risk_categories = aggregation.risk_buckets.clone();
            }
        }
        let decisions = compile_decisions(&decisions_doc, HEALTH_FIELDS)?;

        Ok(Self {
            lifestyle,
            cbc: CbcRules {
                percent_bands: BandTable::new(bands, doc.options.out_of_bands),
                hemoglobin_by_sex,
                ranges,
            },
            decisions,
        })
    }

    pub fn decisions(&self) -> &DecisionTable {
        &self.decisions
    }
}
