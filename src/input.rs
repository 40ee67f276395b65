//! Scoring input records as supplied by the extraction collaborator
//!
//! Fields are kept as raw JSON values; canonicalisation happens in
//! [`crate::preprocess`] so malformed values degrade instead of failing the parse.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Accept identifiers written as JSON strings or numbers
fn de_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(id_text(&Value::deserialize(deserializer)?).unwrap_or_default())
}

fn de_opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(id_text(&Value::deserialize(deserializer)?))
}

fn id_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// One proposal to be finance-scored
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinanceInput {
    #[serde(default, deserialize_with = "de_id")]
    pub proposal_number: String,

    #[serde(default, deserialize_with = "de_opt_id")]
    pub proposer_id: Option<String>,

    #[serde(default)]
    pub annual_income: Option<Value>,

    #[serde(default)]
    pub premium: Option<Value>,

    #[serde(default)]
    pub sum_assured: Option<Value>,

    #[serde(default)]
    pub other_insurance_sum_assured: Option<Value>,

    #[serde(default)]
    pub occupation: Option<String>,
}

impl FinanceInput {
    /// Whether a named field was supplied with a non-null value
    pub fn has_field(&self, name: &str) -> bool {
        let value = match name {
            "proposal_number" => return !self.proposal_number.is_empty(),
            "proposer_id" => return self.proposer_id.is_some(),
            "annual_income" => &self.annual_income,
            "premium" => &self.premium,
            "sum_assured" => &self.sum_assured,
            "other_insurance_sum_assured" => &self.other_insurance_sum_assured,
            "occupation" => return self.occupation.is_some(),
            _ => return false,
        };
        !matches!(value, None | Some(Value::Null))
    }
}

/// Proposal header carried through to health output
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProposalHeader {
    #[serde(default, deserialize_with = "de_opt_id")]
    pub proposal_number: Option<String>,

    #[serde(default, deserialize_with = "de_opt_id")]
    pub proposer_id: Option<String>,

    /// Remaining proposal columns, echoed untouched
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Demographics {
    #[serde(default)]
    pub sex: Option<Value>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Lifestyle questionnaire answers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Lifestyle {
    #[serde(default)]
    pub smoking_status: Option<Value>,

    #[serde(default)]
    pub alcohol_consumption: Option<Value>,

    /// Minutes of moderate activity per week
    #[serde(default)]
    pub physical_activity: Option<Value>,

    #[serde(default)]
    pub diet: Option<Value>,

    #[serde(default)]
    pub sleep_hours: Option<Value>,

    #[serde(default)]
    pub sleep_quality: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InsuredMember {
    #[serde(default, deserialize_with = "de_opt_id")]
    pub member_id: Option<String>,

    #[serde(default)]
    pub demographics: Option<Demographics>,

    #[serde(default)]
    pub lifestyle: Option<Lifestyle>,

    #[serde(default)]
    pub medical_conditions: Option<Value>,
}

impl InsuredMember {
    pub fn sex(&self) -> Option<&Value> {
        self.demographics.as_ref().and_then(|d| d.sex.as_ref())
    }
}

/// Uploaded document with the matching collaborator's output attached
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub id: Option<Value>,

    /// JSON payload of extracted fields, either as a string or an object
    #[serde(default)]
    pub extracted_data: Option<Value>,

    #[serde(default)]
    pub processed_extracted_data: Option<Value>,
}

/// One proposal to be health-scored, with all insured members
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthProposal {
    #[serde(default)]
    pub proposal: ProposalHeader,

    #[serde(default)]
    pub proposer: Option<Value>,

    #[serde(default)]
    pub insured_members: Vec<InsuredMember>,

    #[serde(default)]
    pub documents: Vec<Document>,
}

impl HealthProposal {
    /// Entity id used for output naming
    pub fn entity_id(&self) -> String {
        self.proposal
            .proposal_number
            .clone()
            .unwrap_or_else(|| "unknown".to_string())
    }
}

/// Flat marker-name to value map produced by document matching
pub type LabValues = BTreeMap<String, Value>;
