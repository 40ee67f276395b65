//! Finance rule set: component weights, band tables and decision rules

use super::decisions::{compile_decisions, DecisionsDoc};
use crate::bands::{Band, BandTable, MissPolicy};
use crate::decision::DecisionTable;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Fields finance decision rules may reference
pub const FINANCE_FIELDS: &[&str] = &["final_score", "sar_score", "tsar_score", "premium_score"];

/// Finance ratio components, in output order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FinanceComponent {
    /// Sum assured / income
    Sar,
    /// (Sum assured + other insurance sum assured) / income
    Tsar,
    /// Premium / income
    Premium,
}

impl FinanceComponent {
    pub const ALL: [FinanceComponent; 3] = [
        FinanceComponent::Sar,
        FinanceComponent::Tsar,
        FinanceComponent::Premium,
    ];

    /// Name used in the rules document and in score factors
    pub fn key(&self) -> &'static str {
        match self {
            FinanceComponent::Sar => "sar_income_ratio",
            FinanceComponent::Tsar => "tsar_income_ratio",
            FinanceComponent::Premium => "premium_income_ratio",
        }
    }

    /// Name of the component's score in decision rules and output
    pub fn score_field(&self) -> &'static str {
        match self {
            FinanceComponent::Sar => "sar_score",
            FinanceComponent::Tsar => "tsar_score",
            FinanceComponent::Premium => "premium_score",
        }
    }

    /// Weight used when the rules document does not name one
    pub fn default_weight(&self) -> f64 {
        match self {
            FinanceComponent::Sar => 0.5,
            FinanceComponent::Tsar | FinanceComponent::Premium => 0.25,
        }
    }

    pub fn from_key(key: &str) -> Result<Self, ConfigError> {
        Self::ALL
            .into_iter()
            .find(|c| c.key() == key)
            .ok_or_else(|| ConfigError::UnknownComponent(key.to_string()))
    }
}

/// What to do with a weighted component that has no band table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingBandsPolicy {
    /// Reject the rules document
    #[default]
    Error,
    /// Score the component as absent, contributing 0
    Zero,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FinanceOptions {
    #[serde(default)]
    pub missing_bands: MissingBandsPolicy,

    /// Policy for ratios outside every band
    #[serde(default)]
    pub out_of_bands: MissPolicy,
}

/// Finance rules document as written in YAML
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FinanceRulesDoc {
    #[serde(default)]
    pub options: FinanceOptions,

    #[serde(default)]
    pub weights: BTreeMap<String, f64>,

    #[serde(default)]
    pub components: BTreeMap<String, Vec<Band>>,

    #[serde(default)]
    pub decisions: DecisionsDoc,
}

/// Validated, immutable finance rule set
#[derive(Debug, Clone)]
pub struct FinanceRules {
    weights: BTreeMap<FinanceComponent, f64>,
    bands: BTreeMap<FinanceComponent, BandTable>,
    decisions: DecisionTable,
}

impl FinanceRules {
    /// Validate and compile a parsed document
    pub fn compile(doc: FinanceRulesDoc) -> Result<Self, ConfigError> {
        let mut bands = BTreeMap::new();
        for (key, list) in &doc.components {
            let component = FinanceComponent::from_key(key)?;
            super::check_bands(key, list)?;
            bands.insert(component, BandTable::new(list.clone(), doc.options.out_of_bands));
        }

        let mut weights = BTreeMap::new();
        for (key, &weight) in &doc.weights {
            let component = FinanceComponent::from_key(key)?;
            if !(weight >= 0.0) || !weight.is_finite() {
                return Err(ConfigError::NegativeWeight {
                    component: key.clone(),
                    weight,
                });
            }
            if !bands.contains_key(&component) {
                match doc.options.missing_bands {
                    MissingBandsPolicy::Error => return Err(ConfigError::MissingBands(key.clone())),
                    MissingBandsPolicy::Zero => {
                        log::warn!("weight '{}' has no bands; it will contribute 0", key)
                    }
                }
            }
            weights.insert(component, weight);
        }

        for component in FinanceComponent::ALL {
            if !weights.contains_key(&component) {
                log::info!(
                    "no weight for '{}', using the default {}",
                    component.key(),
                    component.default_weight()
                );
                weights.insert(component, component.default_weight());
            }
        }

        let decisions = compile_decisions(&doc.decisions, FINANCE_FIELDS)?;

        Ok(Self {
            weights,
            bands,
            decisions,
        })
    }

    pub fn weight(&self, component: FinanceComponent) -> f64 {
        self.weights
            .get(&component)
            .copied()
            .unwrap_or_else(|| component.default_weight())
    }

    pub fn bands(&self, component: FinanceComponent) -> Option<&BandTable> {
        self.bands.get(&component)
    }

    pub fn decisions(&self) -> &DecisionTable {
        &self.decisions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(yaml: &str) -> FinanceRulesDoc {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_compile_minimal() {
        let rules = FinanceRules::compile(doc(r#"
weights: {sar_income_ratio: 1.0}
components:
  sar_income_ratio:
    - {max: 10, score: 10}
    - {min: 10, score: 2}
"#))
        .unwrap();
        assert_eq!(rules.weight(FinanceComponent::Sar), 1.0);
        assert_eq!(rules.weight(FinanceComponent::Tsar), 0.25);
        assert_eq!(rules.bands(FinanceComponent::Sar).unwrap().score(Some(5.0)), Some(10));
        assert!(rules.bands(FinanceComponent::Premium).is_none());
    }

    #[test]
    fn test_absent_weights_use_defaults() {
        let rules = FinanceRules::compile(doc(r#"
weights: {tsar_income_ratio: 0.0}
components:
  sar_income_ratio: [{score: 10}]
  tsar_income_ratio: [{score: 10}]
  premium_income_ratio: [{score: 6}]
"#))
        .unwrap();
        assert_eq!(rules.weight(FinanceComponent::Sar), 0.5);
        assert_eq!(rules.weight(FinanceComponent::Tsar), 0.0);
        assert_eq!(rules.weight(FinanceComponent::Premium), 0.25);

        let no_weights = FinanceRules::compile(doc(r#"
components:
  sar_income_ratio: [{score: 10}]
"#))
        .unwrap();
        let weights: Vec<f64> = FinanceComponent::ALL
            .iter()
            .map(|c| no_weights.weight(*c))
            .collect();
        assert_eq!(weights, vec![0.5, 0.25, 0.25]);
    }

    #[test]
    fn test_negative_weight_rejected() {
        let err = FinanceRules::compile(doc(r#"
weights: {sar_income_ratio: -0.5}
components:
  sar_income_ratio: [{score: 1}]
"#))
        .unwrap_err();
        assert!(matches!(err, ConfigError::NegativeWeight { .. }));
    }

    #[test]
    fn test_missing_bands_policy() {
        let strict = FinanceRules::compile(doc("weights: {tsar_income_ratio: 0.25}"));
        assert!(matches!(strict, Err(ConfigError::MissingBands(k)) if k == "tsar_income_ratio"));

        let lenient = FinanceRules::compile(doc(r#"
options: {missing_bands: zero}
weights: {tsar_income_ratio: 0.25}
"#))
        .unwrap();
        assert_eq!(lenient.weight(FinanceComponent::Tsar), 0.25);
        assert!(lenient.bands(FinanceComponent::Tsar).is_none());
    }

    #[test]
    fn test_unknown_component_rejected() {
        let err = FinanceRules::compile(doc("weights: {loan_ratio: 0.5}")).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownComponent(k) if k == "loan_ratio"));
    }

    #[test]
    fn test_component_keys_roundtrip() {
        for c in FinanceComponent::ALL {
            assert_eq!(FinanceComponent::from_key(c.key()).unwrap(), c);
        }
        assert_eq!(FinanceComponent::Premium.score_field(), "premium_score");
    }
}
