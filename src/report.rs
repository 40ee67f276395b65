//! JSON output shapes written per scored entity

use crate::aggregate::HealthTotals;
use crate::engine::{FinanceScore, HealthScore, MemberScore};
use crate::input::ProposalHeader;
use crate::record::ScoreFactor;
use crate::rules::FinanceComponent;
use chrono::{DateTime, Local};
use serde::Serialize;

/// Per-proposal finance result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinanceReport {
    pub proposal_number: String,
    pub proposer_id: Option<String>,
    pub sar_income_ratio: Option<f64>,
    pub tsar_income_ratio: Option<f64>,
    pub premium_income_ratio: Option<f64>,
    pub sar_score: Option<i64>,
    pub tsar_score: Option<i64>,
    pub premium_score: Option<i64>,
    pub final_finance_score: Option<i64>,
    pub risk_category: Option<String>,
    pub underwriting_flag: String,
    pub score_factors: Vec<ScoreFactor>,
    pub validation_issues: Vec<String>,

    /// Only set on single-entity responses
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calculated_at: Option<String>,
}

impl FinanceReport {
    pub fn new(score: &FinanceScore) -> Self {
        let record = &score.record;
        Self {
            proposal_number: score.input.proposal_number.clone(),
            proposer_id: score.input.proposer_id.clone(),
            sar_income_ratio: score.ratios.sar_income_ratio,
            tsar_income_ratio: score.ratios.tsar_income_ratio,
            premium_income_ratio: score.ratios.premium_income_ratio,
            sar_score: score.component_score(FinanceComponent::Sar),
            tsar_score: score.component_score(FinanceComponent::Tsar),
            premium_score: score.component_score(FinanceComponent::Premium),
            final_finance_score: record.final_score,
            risk_category: record.risk_category.clone(),
            underwriting_flag: record.underwriting_flag.clone(),
            score_factors: record.top_factors.clone(),
            validation_issues: record.validation_issues.clone(),
            calculated_at: None,
        }
    }

    /// Stamp the report with a calculation time
    pub fn calculated_at(mut self, at: DateTime<Local>) -> Self {
        self.calculated_at = Some(at.to_rfc3339());
        self
    }
}

/// Per-proposal health result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub proposal_number: String,
    pub proposer_id: Option<String>,
    pub health_score: Option<i64>,
    pub risk_category: Option<String>,
    pub underwriting_flag: String,
    pub members: Vec<MemberScore>,
    pub component_totals: HealthTotals,
    pub validation_issues: Vec<String>,
}

impl HealthReport {
    pub fn new(header: &ProposalHeader, score: &HealthScore) -> Self {
        let record = &score.record;
        Self {
            proposal_number: record.entity_id.clone(),
            proposer_id: header.proposer_id.clone(),
            health_score: record.final_score,
            risk_category: record.risk_category.clone(),
            underwriting_flag: record.underwriting_flag.clone(),
            members: score.members.clone(),
            component_totals: score.component_totals,
            validation_issues: record.validation_issues.clone(),
        }
    }
}

/// `health_score_<proposal>.json`: the proposal header with its score
#[derive(Debug, Clone, Serialize)]
pub struct HealthExport<'a> {
    pub proposal: &'a ProposalHeader,
    pub score: &'a HealthReport,
}

/// `summary.json` for a health batch
#[derive(Debug, Clone, Default, Serialize)]
pub struct HealthSummary {
    pub results: Vec<HealthReport>,
}
