//! Row validation: report missing or rejected inputs without blocking scoring

use crate::input::{FinanceInput, HealthProposal, LabValues};
use crate::preprocess::CanonicalFinance;

/// Fields a finance row needs for a complete score
pub const FINANCE_REQUIRED: &[&str] = &["annual_income", "premium", "sum_assured"];

/// Fields a single-entity request must carry before it is scored at all
pub const SINGLE_SCORE_REQUIRED: &[&str] = &[
    "proposal_number",
    "proposer_id",
    "annual_income",
    "premium",
    "sum_assured",
];

/// `missing_<field>` for each required field the predicate reports absent,
/// in the order given
pub fn missing_fields<F>(required: &[&str], is_present: F) -> Vec<String>
where
    F: Fn(&str) -> bool,
{
    required
        .iter()
        .filter(|field| !is_present(field))
        .map(|field| format!("missing_{field}"))
        .collect()
}

/// Issues for a canonical finance row: a blank proposal number, then missing
/// required fields, then `invalid_<field>` for every value that was supplied
/// but rejected. A rejected field is reported only as invalid.
pub fn finance_issues(row: &CanonicalFinance) -> Vec<String> {
    let mut issues = Vec::new();
    if row.proposal_number.trim().is_empty() {
        issues.push("missing_proposal_number".to_string());
    }
    let rejected = |field: &str| row.rejected.iter().any(|err| err.field() == field);
    issues.extend(missing_fields(FINANCE_REQUIRED, |f| {
        row.field(f).is_some() || rejected(f)
    }));
    issues.extend(row.rejected.iter().map(|err| err.issue_tag()));
    issues
}

/// Raw fields missing from a single-entity request
pub fn missing_request_fields(input: &FinanceInput) -> Vec<String> {
    SINGLE_SCORE_REQUIRED
        .iter()
        .filter(|f| !input.has_field(f))
        .map(|f| f.to_string())
        .collect()
}

/// Issues for a health proposal given the lab values found for it
pub fn health_issues(proposal: &HealthProposal, labs: &LabValues) -> Vec<String> {
    let mut issues = Vec::new();
    if proposal.proposal.proposal_number.is_none() {
        issues.push("missing_proposal_number".to_string());
    }
    if proposal.insured_members.is_empty() {
        issues.push("missing_insured_members".to_string());
    }
    if proposal.insured_members.iter().any(|m| m.lifestyle.is_none()) {
        issues.push("missing_lifestyle".to_string());
    }
    if labs.is_empty() {
        issues.push("missing_lab_values".to_string());
    }
    issues
}
