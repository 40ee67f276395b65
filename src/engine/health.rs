//! Health scoring pipeline for one proposal and all its insured members

use crate::aggregate::{health_totals, HealthTotals};
use crate::decision::{Decision, FINAL_SCORE};
use crate::features::{cbc_points, lifestyle_points, CbcBreakdown, LifestyleBreakdown};
use crate::input::{HealthProposal, InsuredMember, LabValues};
use crate::preprocess::value_key;
use crate::record::{top_factors, ComponentScore, ScoreFactor, ScoreRecord};
use crate::rules::{HealthRules, ScoreContext};
use crate::validation::health_issues;
use serde::Serialize;
use std::sync::Arc;

/// Per-member subcomponent points
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MemberBreakdown {
    pub lifestyle: LifestyleBreakdown,
    pub cbc: CbcBreakdown,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemberScore {
    pub member_id: Option<String>,
    pub lifestyle_points: i64,
    pub cbc_points: i64,
    pub component_breakdown: MemberBreakdown,
}

/// Everything computed for one health proposal
#[derive(Debug, Clone, PartialEq)]
pub struct HealthScore {
    pub record: ScoreRecord,
    pub members: Vec<MemberScore>,
    pub component_totals: HealthTotals,
}

/// Health engine bound to one rule snapshot
#[derive(Debug, Clone)]
pub struct HealthEngine {
    rules: Arc<HealthRules>,
}

impl HealthEngine {
    pub fn new(rules: Arc<HealthRules>) -> Self {
        Self { rules }
    }

    fn score_member(&self, member: &InsuredMember, labs: &LabValues) -> MemberScore {
        let sex = value_key(member.sex());
        let lifestyle = lifestyle_points(member.lifestyle.as_ref(), &self.rules.lifestyle);
        let cbc = cbc_points(labs, sex.as_deref(), &self.rules.cbc);
        MemberScore {
            member_id: member.member_id.clone(),
            lifestyle_points: lifestyle.total(),
            cbc_points: cbc.total(),
            component_breakdown: MemberBreakdown { lifestyle, cbc },
        }
    }

    /// Score a proposal given the lab values matched to its documents.
    /// The labs apply to every insured member on the proposal.
    pub fn score(&self, proposal: &HealthProposal, labs: &LabValues) -> HealthScore {
        let entity_id = proposal.entity_id();
        let members: Vec<MemberScore> = proposal
            .insured_members
            .iter()
            .map(|member| self.score_member(member, labs))
            .collect();

        let points: Vec<(i64, i64)> = members
            .iter()
            .map(|m| (m.lifestyle_points, m.cbc_points))
            .collect();
        let totals = health_totals(&points);
        let final_score = totals.final_score();
        if final_score.is_none() {
            log::warn!("proposal {}: no insured members, health score not computed", entity_id);
        }

        let lifestyle_sum: i64 = members.iter().map(|m| m.lifestyle_points).sum();
        let cbc_sum: i64 = members.iter().map(|m| m.cbc_points).sum();
        let component_scores = vec![
            ComponentScore::new(
                "lifestyle",
                Some(lifestyle_sum as f64),
                totals.lifestyle.map(|v| v as f64),
                totals.lifestyle,
            ),
            ComponentScore::new(
                "cbc",
                Some(cbc_sum as f64),
                totals.cbc.map(|v| v as f64),
                totals.cbc,
            ),
        ];
        let factors = component_scores
            .iter()
            .map(|c| ScoreFactor {
                feature: c.name.clone(),
                score: c.score,
                weight: 1.0,
                contribution: c.score.unwrap_or(0) as f64,
            })
            .collect();

        let final_value = final_score.map(|s| s as f64);
        let ctx = ScoreContext::new()
            .with("score", final_value)
            .with(FINAL_SCORE, final_value)
            .with("lifestyle", totals.lifestyle.map(|v| v as f64))
            .with("cbc", totals.cbc.map(|v| v as f64));
        let Decision {
            risk_category,
            underwriting_flag,
        } = self.rules.decisions().evaluate(&ctx);

        log::debug!(
            "proposal {}: {} member(s), health={:?} category={:?} flag={}",
            entity_id,
            members.len(),
            final_score,
            risk_category,
            underwriting_flag
        );

        HealthScore {
            record: ScoreRecord {
                entity_id,
                component_scores,
                final_score,
                risk_category,
                underwriting_flag,
                top_factors: top_factors(factors),
                validation_issues: health_issues(proposal, labs),
            },
            members,
            component_totals: totals,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::MANUAL_REVIEW;
    use serde_json::json;

    fn engine() -> HealthEngine {
        HealthEngine::new(Arc::new(HealthRules::default_rules().unwrap()))
    }

    fn normal_labs() -> LabValues {
        [
            ("hemoglobin", json!(14.5)),
            ("wbc", json!(7.0)),
            ("platelets", json!(250)),
            ("mcv", json!(90)),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
    }

    fn proposal(members: serde_json::Value) -> HealthProposal {
        serde_json::from_value(json!({
            "proposal": {"proposal_number": "H-1", "proposer_id": "C-1"},
            "insured_members": members
        }))
        .unwrap()
    }

    #[test]
    fn test_healthy_single_member() {
        let p = proposal(json!([{
            "member_id": "M1",
            "demographics": {"sex": "Male"},
            "lifestyle": {
                "smoking_status": "Never",
                "alcohol_consumption": "None",
                "physical_activity": 200,
                "diet": "Balanced",
                "sleep_hours": 8,
                "sleep_quality": "Good"
            }
        }]));
        let result = engine().score(&p, &normal_labs());
        // 12 + 8 + 10 + 4 + 6 = 40 lifestyle, 60 cbc
        assert_eq!(result.members[0].lifestyle_points, 40);
        assert_eq!(result.members[0].cbc_points, 60);
        assert_eq!(result.record.final_score, Some(100));
        assert_eq!(result.record.risk_category.as_deref(), Some("Low"));
        assert_eq!(result.record.underwriting_flag, "Auto Approve");
        assert!(result.record.validation_issues.is_empty());
    }

    #[test]
    fn test_members_are_averaged() {
        let p = proposal(json!([
            {"member_id": "A", "lifestyle": {"smoking_status": "current", "alcohol_consumption": "heavy",
                                             "physical_activity": 0, "diet": "fast food", "sleep_hours": 4}},
            {"member_id": "B", "lifestyle": {"smoking_status": "never", "alcohol_consumption": "never",
                                             "physical_activity": 150, "diet": "vegan", "sleep_hours": 7}}
        ]));
        let result = engine().score(&p, &LabValues::new());
        // A: 0 + 0 + 2 + 0 + 0 = 2 (FAST_FOOD), B: 12 + 8 + 10 + 4 + 6 = 40
        assert_eq!(result.members[0].lifestyle_points, 2);
        assert_eq!(result.members[1].lifestyle_points, 40);
        // no labs: each member gets only the rbc pattern 12
        assert_eq!(result.component_totals.lifestyle, Some(21));
        assert_eq!(result.component_totals.cbc, Some(12));
        assert_eq!(result.record.final_score, Some(33));
        assert_eq!(result.record.risk_category.as_deref(), Some("Very High"));
        assert_eq!(result.record.underwriting_flag, "Refer to Medical Underwriter");
        assert_eq!(result.record.validation_issues, vec!["missing_lab_values"]);
    }

    #[test]
    fn test_no_members_is_insufficient_data() {
        let p = proposal(json!([]));
        let result = engine().score(&p, &normal_labs());
        assert!(result.members.is_empty());
        assert_eq!(result.record.final_score, None);
        assert_eq!(result.record.risk_category, None);
        assert_eq!(result.record.underwriting_flag, MANUAL_REVIEW);
        assert_eq!(result.record.validation_issues, vec!["missing_insured_members"]);
    }
}
