//! Aggregation of component scores into a final score
//!
//! Rounding is round-half-to-even throughout, so `8.5` becomes `8` and `9.5`
//! becomes `10`.

use serde::Serialize;

/// Round to the nearest integer, ties to even
pub fn round_half_even(value: f64) -> i64 {
    value.round_ties_even() as i64
}

/// One weighted term of the finance aggregate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedScore {
    pub weight: f64,
    pub score: Option<i64>,
}

impl WeightedScore {
    pub fn new(weight: f64, score: Option<i64>) -> Self {
        Self { weight, score }
    }

    /// `weight * score`, with a missing score contributing 0
    pub fn contribution(&self) -> f64 {
        self.score.map_or(0.0, |s| s as f64 * self.weight)
    }
}

/// `round(Σ weight · score)`.
///
/// Missing scores contribute 0 and the remaining weights are not
/// renormalised. The result is `None` only when every score is missing.
pub fn weighted_final(terms: &[WeightedScore]) -> Option<i64> {
    if terms.iter().all(|t| t.score.is_none()) {
        return None;
    }
    let total: f64 = terms.iter().map(WeightedScore::contribution).sum();
    Some(round_half_even(total))
}

/// Per-proposal health totals averaged across insured members
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HealthTotals {
    pub lifestyle: Option<i64>,
    pub cbc: Option<i64>,
}

impl HealthTotals {
    /// `lifestyle + cbc`, `None` when there were no members
    pub fn final_score(&self) -> Option<i64> {
        Some(self.lifestyle? + self.cbc?)
    }
}

/// `round(Σ points / n)`, `None` for an empty member list
pub fn member_average(points: &[i64]) -> Option<i64> {
    if points.is_empty() {
        return None;
    }
    let sum: i64 = points.iter().sum();
    Some(round_half_even(sum as f64 / points.len() as f64))
}

/// Average lifestyle and CBC points independently across members
pub fn health_totals(members: &[(i64, i64)]) -> HealthTotals {
    let lifestyle: Vec<i64> = members.iter().map(|(l, _)| *l).collect();
    let cbc: Vec<i64> = members.iter().map(|(_, c)| *c).collect();
    HealthTotals {
        lifestyle: member_average(&lifestyle),
        cbc: member_average(&cbc),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_half_even() {
        assert_eq!(round_half_even(8.5), 8);
        assert_eq!(round_half_even(9.5), 10);
        assert_eq!(round_half_even(8.4), 8);
        assert_eq!(round_half_even(8.6), 9);
        assert_eq!(round_half_even(0.0), 0);
    }

    #[test]
    fn test_weighted_final() {
        let terms = [
            WeightedScore::new(0.5, Some(10)),
            WeightedScore::new(0.25, Some(8)),
            WeightedScore::new(0.25, Some(6)),
        ];
        // 0.5*10 + 0.25*8 + 0.25*6 = 8.5
        assert_eq!(weighted_final(&terms), Some(8));
    }

    #[test]
    fn test_missing_score_contributes_zero() {
        let terms = [
            WeightedScore::new(0.5, Some(10)),
            WeightedScore::new(0.25, None),
            WeightedScore::new(0.25, Some(6)),
        ];
        // 5 + 0 + 1.5, not renormalised
        assert_eq!(weighted_final(&terms), Some(6));

        let none = [WeightedScore::new(0.5, None), WeightedScore::new(0.5, None)];
        assert_eq!(weighted_final(&none), None);
        assert_eq!(weighted_final(&[]), None);
    }

    #[test]
    fn test_health_averages() {
        let totals = health_totals(&[(20, 40), (30, 50)]);
        assert_eq!(totals.lifestyle, Some(25));
        assert_eq!(totals.cbc, Some(45));
        assert_eq!(totals.final_score(), Some(70));
    }

    #[test]
    fn test_health_averages_round_and_empty() {
        let totals = health_totals(&[(21, 40), (30, 49)]);
        // 25.5 -> 26, 44.5 -> 44
        assert_eq!(totals.lifestyle, Some(26));
        assert_eq!(totals.cbc, Some(44));

        let empty = health_totals(&[]);
        assert_eq!(empty, HealthTotals::default());
        assert_eq!(empty.final_score(), None);
    }
}
