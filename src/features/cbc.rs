//! Complete blood count points for one insured member
//!
//! Each marker is scored by how far (relatively) it sits outside its normal
//! range, banded through the configured percent table. The red-cell pattern
//! is a fixed rule over three lab flags.

use crate::input::LabValues;
use crate::preprocess::{loose_flag, loose_number};
use crate::rules::{CbcRules, Marker};
use serde::Serialize;

/// Points per CBC marker
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CbcBreakdown {
    pub hemoglobin: i64,
    pub wbc: i64,
    pub platelets: i64,
    pub mcv: i64,
    pub rbc_pattern: i64,
}

impl CbcBreakdown {
    pub fn total(&self) -> i64 {
        self.hemoglobin + self.wbc + self.platelets + self.mcv + self.rbc_pattern
    }

    fn set(&mut self, marker: Marker, points: i64) {
        match marker {
            Marker::Hemoglobin => self.hemoglobin = points,
            Marker::Wbc => self.wbc = points,
            Marker::Platelets => self.platelets = points,
            Marker::Mcv => self.mcv = points,
        }
    }
}

/// First parseable value among a marker's accepted keys
pub fn marker_value(labs: &LabValues, marker: Marker) -> Option<f64> {
    marker
        .lab_keys()
        .iter()
        .find_map(|key| loose_number(labs.get(*key)))
}

/// Low Hb with low MCV scores 4, no abnormal flag scores 12, anything else 8
pub fn rbc_pattern_points(hb_low: bool, mcv_low: bool, rdw_high: bool) -> i64 {
    if hb_low && mcv_low {
        4
    } else if !hb_low && !mcv_low && !rdw_high {
        12
    } else {
        8
    }
}

/// Score one member's CBC. `sex` is the normalised key (e.g. `FEMALE`).
/// A marker with no usable value scores 0.
pub fn cbc_points(labs: &LabValues, sex: Option<&str>, rules: &CbcRules) -> CbcBreakdown {
    let mut breakdown = CbcBreakdown::default();

    for marker in Marker::ALL {
        let value = marker_value(labs, marker);
        let pct = rules.range(marker, sex).pct_outside(value);
        let points = rules.percent_bands.score(pct).unwrap_or(0);
        breakdown.set(marker, points);
    }

    breakdown.rbc_pattern = rbc_pattern_points(
        loose_flag(labs.get("hb_low_flag")),
        loose_flag(labs.get("mcv_low_flag")),
        loose_flag(labs.get("rdw_high_flag")),
    );

    breakdown
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::HealthRules;
    use serde_json::json;

    fn labs(pairs: &[(&str, serde_json::Value)]) -> LabValues {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn test_rbc_pattern_rule() {
        assert_eq!(rbc_pattern_points(true, true, false), 4);
        assert_eq!(rbc_pattern_points(true, true, true), 4);
        assert_eq!(rbc_pattern_points(false, false, false), 12);
        assert_eq!(rbc_pattern_points(false, false, true), 8);
        assert_eq!(rbc_pattern_points(true, false, false), 8);
        assert_eq!(rbc_pattern_points(false, true, false), 8);
    }

    #[test]
    fn test_all_normal_panel() {
        let rules = HealthRules::default_rules().unwrap();
        let panel = labs(&[
            ("hemoglobin", json!(14.0)),
            ("wbc", json!(6.5)),
            ("platelets", json!(250)),
            ("mcv", json!(90)),
        ]);
        let b = cbc_points(&panel, Some("MALE"), &rules.cbc);
        assert_eq!(b.total(), 60);
    }

    #[test]
    fn test_out_of_range_markers() {
        let rules = HealthRules::default_rules().unwrap();
        let panel = labs(&[
            // Female range 12.0-15.5: 10.5 is 12.5% low -> 8
            ("hb", json!("10.5")),
            // 11.0 upper: 13.2 is 20% high -> 8 (0.20 inclusive in the 0.10-0.20 band)
            ("white_blood_cell", json!(13.2)),
            // 400 upper: 1000 is 150% high -> beyond all finite bands -> 0
            ("platelets", json!(1000)),
            ("hb_low_flag", json!(true)),
            ("mcv_low_flag", json!(true)),
        ]);
        let b = cbc_points(&panel, Some("FEMALE"), &rules.cbc);
        assert_eq!(b.hemoglobin, 8);
        assert_eq!(b.wbc, 8);
        assert_eq!(b.platelets, 0);
        assert_eq!(b.mcv, 0); // missing
        assert_eq!(b.rbc_pattern, 4);
    }

    #[test]
    fn test_sex_changes_hemoglobin_range() {
        let rules = HealthRules::default_rules().unwrap();
        let panel = labs(&[("hemoglobin", json!(13.0))]);
        // Inside female range, 3.7% below male range
        assert_eq!(cbc_points(&panel, Some("FEMALE"), &rules.cbc).hemoglobin, 12);
        assert_eq!(cbc_points(&panel, Some("MALE"), &rules.cbc).hemoglobin, 10);
    }

    #[test]
    fn test_empty_labs() {
        let rules = HealthRules::default_rules().unwrap();
        let b = cbc_points(&LabValues::new(), None, &rules.cbc);
        assert_eq!(b, CbcBreakdown { rbc_pattern: 12, ..Default::default() });
    }
}
