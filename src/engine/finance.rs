//! Finance scoring pipeline for one proposal

use crate::aggregate::{weighted_final, WeightedScore};
use crate::decision::{Decision, FINAL_SCORE};
use crate::features::{component_numerator, FinanceRatios};
use crate::input::FinanceInput;
use crate::preprocess::CanonicalFinance;
use crate::record::{top_factors, ComponentScore, ScoreFactor, ScoreRecord};
use crate::rules::{FinanceComponent, FinanceRules, ScoreContext};
use crate::validation::finance_issues;
use std::sync::Arc;

/// Everything computed for one finance proposal
#[derive(Debug, Clone, PartialEq)]
pub struct FinanceScore {
    pub record: ScoreRecord,
    /// Canonical inputs the score was computed from
    pub input: CanonicalFinance,
    pub ratios: FinanceRatios,
}

impl FinanceScore {
    pub fn component_score(&self, component: FinanceComponent) -> Option<i64> {
        self.record.component(component.key()).and_then(|c| c.score)
    }
}

/// Finance engine bound to one rule snapshot
#[derive(Debug, Clone)]
pub struct FinanceEngine {
    rules: Arc<FinanceRules>,
}

impl FinanceEngine {
    pub fn new(rules: Arc<FinanceRules>) -> Self {
        Self { rules }
    }

    /// Score one proposal. Never fails: bad inputs degrade to missing scores.
    pub fn score(&self, raw: &FinanceInput) -> FinanceScore {
        let input = CanonicalFinance::from_input(raw);
        let ratios = FinanceRatios::derive(&input);

        let mut components = Vec::with_capacity(FinanceComponent::ALL.len());
        let mut terms = Vec::with_capacity(FinanceComponent::ALL.len());
        let mut factors = Vec::with_capacity(FinanceComponent::ALL.len());
        let mut ctx = ScoreContext::new();

        for component in FinanceComponent::ALL {
            let metric = ratios.get(component);
            let score = self.rules.bands(component).and_then(|table| table.score(metric));
            let term = WeightedScore::new(self.rules.weight(component), score);

            components.push(ComponentScore::new(
                component.key(),
                component_numerator(&input, component),
                metric,
                score,
            ));
            factors.push(ScoreFactor {
                feature: component.key().to_string(),
                score,
                weight: term.weight,
                contribution: term.contribution(),
            });
            ctx.set(component.score_field(), score.map(|s| s as f64));
            terms.push(term);
        }

        let final_score = weighted_final(&terms);
        ctx.set(FINAL_SCORE, final_score.map(|s| s as f64));
        let Decision {
            risk_category,
            underwriting_flag,
        } = self.rules.decisions().evaluate(&ctx);

        let validation_issues = finance_issues(&input);
        if final_score.is_none() {
            log::warn!(
                "proposal {}: no computable finance component, routed to {}",
                input.proposal_number,
                underwriting_flag
            );
        }
        log::debug!(
            "proposal {}: final={:?} category={:?} flag={}",
            input.proposal_number,
            final_score,
            risk_category,
            underwriting_flag
        );

        FinanceScore {
            record: ScoreRecord {
                entity_id: input.proposal_number.clone(),
                component_scores: components,
                final_score,
                risk_category,
                underwriting_flag,
                top_factors: top_factors(factors),
                validation_issues,
            },
            input,
            ratios,
        }
    }

    /// Score many proposals against the same rules
    pub fn score_all(&self, inputs: &[FinanceInput]) -> Vec<FinanceScore> {
        inputs.iter().map(|input| self.score(input)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::MANUAL_REVIEW;
    use crate::record::ComputationGap;
    use serde_json::json;

    fn engine() -> FinanceEngine {
        FinanceEngine::new(Arc::new(FinanceRules::default_rules().unwrap()))
    }

    fn input(income: serde_json::Value, premium: serde_json::Value, sa: serde_json::Value, other: serde_json::Value) -> FinanceInput {
        serde_json::from_value(json!({
            "proposal_number": "P-1",
            "proposer_id": "C-1",
            "annual_income": income,
            "premium": premium,
            "sum_assured": sa,
            "other_insurance_sum_assured": other
        }))
        .unwrap()
    }

    #[test]
    fn test_low_risk_proposal() {
        // SAR 5 -> 10, TSAR 5 -> 10, premium 0.05 -> 10
        let result = engine().score(&input(json!(1_000_000), json!(50_000), json!(5_000_000), json!(0)));
        let record = &result.record;
        assert_eq!(result.component_score(FinanceComponent::Sar), Some(10));
        assert_eq!(result.component_score(FinanceComponent::Tsar), Some(10));
        assert_eq!(result.component_score(FinanceComponent::Premium), Some(10));
        assert_eq!(record.final_score, Some(10));
        assert_eq!(record.risk_category.as_deref(), Some("Low"));
        assert_eq!(record.underwriting_flag, "Auto Approve");
        assert!(record.validation_issues.is_empty());
    }

    #[test]
    fn test_missing_income_routes_to_manual_review() {
        let mut raw = input(json!(null), json!(50_000), json!(5_000_000), json!(0));
        raw.annual_income = None;
        let result = engine().score(&raw);
        let record = &result.record;
        assert_eq!(record.final_score, None);
        assert_eq!(record.risk_category, None);
        assert_eq!(record.underwriting_flag, MANUAL_REVIEW);
        assert_eq!(record.validation_issues, vec!["missing_annual_income"]);
        assert!(record
            .component_scores
            .iter()
            .all(|c| c.gap == Some(ComputationGap::UndefinedRatio)));
    }

    #[test]
    fn test_partial_components_contribute_zero() {
        // TSAR undefined without other insurance; SAR 10 -> 10, premium 0.05 -> 10
        let mut raw = input(json!(1_000_000), json!(50_000), json!(10_000_000), json!(null));
        raw.other_insurance_sum_assured = None;
        let result = engine().score(&raw);
        assert_eq!(result.component_score(FinanceComponent::Tsar), None);
        // 0.5*10 + 0.25*0 + 0.25*10 = 7.5 -> 8
        assert_eq!(result.record.final_score, Some(8));
        assert_eq!(result.record.risk_category.as_deref(), Some("Moderate"));
        assert_eq!(result.record.top_factors[0].feature, "sar_income_ratio");
        assert_eq!(result.record.top_factors[2].feature, "tsar_income_ratio");
    }

    #[test]
    fn test_same_input_same_record() {
        let engine = engine();
        let raw = input(json!("2,500,000"), json!("90,000"), json!(40_000_000), json!(5_000_000));
        let first = serde_json::to_string(&engine.score(&raw).record).unwrap();
        for _ in 0..5 {
            assert_eq!(serde_json::to_string(&engine.score(&raw).record).unwrap(), first);
        }
    }
}
