//! Canonicalisation of raw input fields
//!
//! Numeric fields become non-negative `f64` or are rejected; categorical fields
//! become upper-case enumeration keys. Rejections are reported, never raised.

use crate::error::InputError;
use crate::input::FinanceInput;
use serde::Serialize;
use serde_json::Value;

/// Key used for any categorical value not present in a mapping
pub const UNKNOWN_KEY: &str = "UNKNOWN";

/// Canonicalise a raw JSON value to a non-negative float
pub fn canonical_number(field: &str, raw: Option<&Value>) -> Result<f64, InputError> {
    match raw {
        None | Some(Value::Null) => Err(InputError::Missing(field.to_string())),
        Some(Value::Number(n)) => match n.as_f64() {
            Some(v) => check_non_negative(field, v),
            None => Err(InputError::Unparsable {
                field: field.to_string(),
                raw: n.to_string(),
            }),
        },
        Some(Value::String(s)) => parse_number_str(field, s),
        Some(other) => Err(InputError::Unparsable {
            field: field.to_string(),
            raw: other.to_string(),
        }),
    }
}

/// Parse a textual number, stripping thousands separators first
pub fn parse_number_str(field: &str, raw: &str) -> Result<f64, InputError> {
    let cleaned: String = raw.chars().filter(|c| *c != ',').collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return Err(InputError::Missing(field.to_string()));
    }
    match cleaned.parse::<f64>() {
        // "NaN" and "inf" parse successfully but are not data
        Ok(v) if v.is_finite() => check_non_negative(field, v),
        _ => Err(InputError::Unparsable {
            field: field.to_string(),
            raw: raw.to_string(),
        }),
    }
}

fn check_non_negative(field: &str, value: f64) -> Result<f64, InputError> {
    if value < 0.0 {
        Err(InputError::Negative {
            field: field.to_string(),
            value,
        })
    } else {
        Ok(value)
    }
}

/// Lenient float read used for lifestyle and lab values: anything that is not a
/// finite number (or a numeric string) is `None`. Sign is preserved.
pub fn loose_number(raw: Option<&Value>) -> Option<f64> {
    match raw? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

/// Truthiness of a lab flag (`true`, non-zero numbers, "true"/"yes"/"1")
pub fn loose_flag(raw: Option<&Value>) -> bool {
    match raw {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map(|v| v != 0.0).unwrap_or(false),
        Some(Value::String(s)) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "true" | "yes" | "y" | "1"
        ),
        _ => false,
    }
}

/// Normalise a categorical value to its enumeration key.
///
/// Trims, upper-cases and joins inner whitespace with `_`, so
/// `" former smoker "` becomes `FORMER_SMOKER`. Empty input is `None`.
pub fn normalize_key(raw: &str) -> Option<String> {
    let parts: Vec<&str> = raw.split_whitespace().collect();
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("_").to_uppercase())
}

/// Key for a JSON categorical value; numbers and booleans are stringified
pub fn value_key(raw: Option<&Value>) -> Option<String> {
    match raw? {
        Value::String(s) => normalize_key(s),
        Value::Number(n) => normalize_key(&n.to_string()),
        Value::Bool(b) => normalize_key(&b.to_string()),
        _ => None,
    }
}

/// Finance input after canonicalisation
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CanonicalFinance {
    pub proposal_number: String,
    pub proposer_id: Option<String>,
    pub annual_income: Option<f64>,
    pub premium: Option<f64>,
    pub sum_assured: Option<f64>,
    pub other_insurance_sum_assured: Option<f64>,
    pub occupation: Option<String>,
    /// Fields that were present but rejected
    #[serde(skip)]
    pub rejected: Vec<InputError>,
}

impl CanonicalFinance {
    /// Canonicalise a raw finance record
    pub fn from_input(input: &FinanceInput) -> Self {
        let mut rejected = Vec::new();
        let mut number = |field: &str, raw: &Option<Value>| -> Option<f64> {
            match canonical_number(field, raw.as_ref()) {
                Ok(v) => Some(v),
                Err(InputError::Missing(_)) => None,
                Err(err) => {
                    log::debug!("proposal {}: {}", input.proposal_number, err);
                    rejected.push(err);
                    None
                }
            }
        };

        let annual_income = number("annual_income", &input.annual_income);
        let premium = number("premium", &input.premium);
        let sum_assured = number("sum_assured", &input.sum_assured);
        let other_insurance_sum_assured =
            number("other_insurance_sum_assured", &input.other_insurance_sum_assured);

        Self {
            proposal_number: input.proposal_number.clone(),
            proposer_id: input.proposer_id.clone(),
            annual_income,
            premium,
            sum_assured,
            other_insurance_sum_assured,
            occupation: input.occupation.as_deref().and_then(normalize_key),
            rejected,
        }
    }

    /// Canonical value of a named numeric field
    pub fn field(&self, name: &str) -> Option<f64> {
        match name {
            "annual_income" => self.annual_income,
            "premium" => self.premium,
            "sum_assured" => self.sum_assured,
            "other_insurance_sum_assured" => self.other_insurance_sum_assured,
            _ => None,
        }
    }
}
