//! Rule definitions: weights, band tables and decision tables
//!
//! Documents are parsed from YAML into raw `*Doc` structs, then validated and
//! compiled into immutable rule sets. Any fault here is a [`ConfigError`] and
//! aborts the run before scoring starts.

mod condition;
mod decisions;
mod finance;
mod health;
pub mod loader;

pub use condition::{Condition, ConditionSpec, ScoreContext};
pub use decisions::{compile_decisions, CategoryDoc, DecisionsDoc, FlagDoc};
pub use finance::{
    FinanceComponent, FinanceOptions, FinanceRules, FinanceRulesDoc, MissingBandsPolicy,
    FINANCE_FIELDS,
};
pub use health::{
    default_percent_bands, CbcRules, HealthRules, HealthRulesDoc, LifestyleRules, Marker,
    NormalRange, PointsMapping, HEALTH_FIELDS, RBC_PATTERN_KEY,
};
pub use loader::{RuleSet, RuleStore, DEFAULT_FINANCE_RULES, DEFAULT_HEALTH_RULES};

use crate::bands::Band;
use crate::error::ConfigError;

/// Reject bands with NaN bounds or `min > max`
pub(crate) fn check_bands(component: &str, bands: &[Band]) -> Result<(), ConfigError> {
    for (index, band) in bands.iter().enumerate() {
        let invalid = |reason: String| ConfigError::InvalidBand {
            component: component.to_string(),
            index,
            reason,
        };
        if band.min.is_some_and(f64::is_nan) || band.max.is_some_and(f64::is_nan) {
            return Err(invalid("NaN bound".to_string()));
        }
        if let (Some(min), Some(max)) = (band.min, band.max) {
            if min > max {
                return Err(invalid(format!("min {min} exceeds max {max}")));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_bands() {
        assert!(check_bands("x", &[Band::new(Some(1.0), Some(2.0), true, 1)]).is_ok());
        assert!(check_bands("x", &[Band::new(Some(0.0), Some(0.0), true, 1)]).is_ok());
        assert!(check_bands("x", &[Band::new(Some(3.0), Some(2.0), true, 1)]).is_err());
        assert!(check_bands("x", &[Band::new(Some(f64::NAN), None, true, 1)]).is_err());
    }
}
