//! Decision section of a rules document and its compilation

use super::condition::{Condition, ConditionSpec};
use crate::decision::{CategoryRule, DecisionTable, FlagRule, FINAL_SCORE, MANUAL_REVIEW};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One risk category entry: either `{score, label}` or
/// `{if, category, underwriting_flag}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CategoryDoc {
    #[serde(default)]
    pub score: Option<i64>,

    #[serde(default)]
    pub label: Option<String>,

    #[serde(default, rename = "if")]
    pub condition: Option<ConditionSpec>,

    #[serde(default)]
    pub category: Option<String>,

    #[serde(default)]
    pub underwriting_flag: Option<String>,
}

/// One underwriting flag entry. `when` holds membership tests keyed
/// `<field>_in`, all of which must hold.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FlagDoc {
    #[serde(default)]
    pub when: BTreeMap<String, Vec<f64>>,

    #[serde(default, rename = "if")]
    pub condition: Option<ConditionSpec>,

    #[serde(default)]
    pub flag: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecisionsDoc {
    #[serde(default)]
    pub risk_categories: Vec<CategoryDoc>,

    #[serde(default)]
    pub underwriting_flags: Vec<FlagDoc>,
}

fn compile_category(index: usize, doc: &CategoryDoc) -> Result<CategoryRule, ConfigError> {
    let invalid = |reason: &str| ConfigError::Condition {
        expr: format!("risk_categories[{index}]"),
        reason: reason.to_string(),
    };

    let condition = match (&doc.score, &doc.condition) {
        (Some(score), None) => Condition::Eq {
            field: FINAL_SCORE.to_string(),
            value: *score as f64,
        },
        (None, Some(spec)) => spec.compile()?,
        (Some(_), Some(_)) => return Err(invalid("set either 'score' or 'if', not both")),
        (None, None) => return Err(invalid("needs 'score' or 'if'")),
    };

    let label = doc
        .label
        .clone()
        .or_else(|| doc.category.clone())
        .ok_or_else(|| invalid("needs 'label' or 'category'"))?;

    Ok(CategoryRule {
        condition,
        label,
        flag: doc.underwriting_flag.clone(),
    })
}

fn compile_flag(index: usize, doc: &FlagDoc) -> Result<FlagRule, ConfigError> {
    let mut parts = Vec::new();
    for (key, values) in &doc.when {
        let field = key.strip_suffix("_in").ok_or_else(|| ConfigError::Condition {
            expr: format!("underwriting_flags[{index}].when.{key}"),
            reason: "keys must be '<field>_in'".to_string(),
        })?;
        parts.push(Condition::In {
            field: field.to_string(),
            values: values.clone(),
        });
    }
    if let Some(spec) = &doc.condition {
        parts.push(spec.compile()?);
    }

    let condition = if parts.len() == 1 {
        parts.remove(0)
    } else {
        Condition::And(parts)
    };

    Ok(FlagRule {
        condition,
        flag: doc.flag.clone().unwrap_or_else(|| MANUAL_REVIEW.to_string()),
    })
}

/// Compile the decisions section, rejecting references to unknown fields
pub fn compile_decisions(doc: &DecisionsDoc, known_fields: &[&str]) -> Result<DecisionTable, ConfigError> {
    let categories = doc
        .risk_categories
        .iter()
        .enumerate()
        .map(|(i, c)| compile_category(i, c))
        .collect::<Result<Vec<_>, _>>()?;
    let flags = doc
        .underwriting_flags
        .iter()
        .enumerate()
        .map(|(i, f)| compile_flag(i, f))
        .collect::<Result<Vec<_>, _>>()?;

    for rule in &categories {
        rule.condition.check_fields(known_fields)?;
    }
    for rule in &flags {
        rule.condition.check_fields(known_fields)?;
    }

    Ok(DecisionTable::new(categories, flags))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::ScoreContext;

    const FIELDS: &[&str] = &["final_score", "premium_score", "sar_score", "score"];

    #[test]
    fn test_exact_score_categories() {
        let doc: DecisionsDoc = serde_yaml::from_str(r#"
risk_categories:
  - {score: 10, label: Low}
  - {score: 9, label: Low}
  - {score: 5, label: High}
"#)
        .unwrap();
        let table = compile_decisions(&doc, FIELDS).unwrap();
        let ctx = ScoreContext::new().with("final_score", Some(9.0));
        assert_eq!(table.evaluate(&ctx).risk_category.as_deref(), Some("Low"));
        let ctx = ScoreContext::new().with("final_score", Some(7.0));
        assert_eq!(table.evaluate(&ctx).risk_category.as_deref(), Some("Unknown"));
    }

    #[test]
    fn test_when_membership_is_conjunctive() {
        let doc: DecisionsDoc = serde_yaml::from_str(r#"
underwriting_flags:
  - when: {final_score_in: [9, 10], premium_score_in: [8, 10]}
    flag: Auto Approve
  - when: {final_score_in: [9, 10]}
    flag: Standard Review
"#)
        .unwrap();
        let table = compile_decisions(&doc, FIELDS).unwrap();

        let both = ScoreContext::new()
            .with("final_score", Some(10.0))
            .with("premium_score", Some(8.0));
        assert_eq!(table.evaluate(&both).underwriting_flag, "Auto Approve");

        // premium_score missing fails its membership test
        let no_premium = ScoreContext::new()
            .with("final_score", Some(10.0))
            .with("premium_score", None);
        assert_eq!(table.evaluate(&no_premium).underwriting_flag, "Standard Review");
    }

    #[test]
    fn test_predicate_categories_with_flags() {
        let doc: DecisionsDoc = serde_yaml::from_str(r#"
risk_categories:
  - {if: "score >= 80", category: Low, underwriting_flag: Auto Approve}
  - {if: "60 <= score < 80", category: Medium, underwriting_flag: Standard Review}
"#)
        .unwrap();
        let table = compile_decisions(&doc, FIELDS).unwrap();
        let ctx = ScoreContext::new()
            .with("final_score", Some(65.0))
            .with("score", Some(65.0));
        let decision = table.evaluate(&ctx);
        assert_eq!(decision.risk_category.as_deref(), Some("Medium"));
        assert_eq!(decision.underwriting_flag, "Standard Review");
    }

    #[test]
    fn test_invalid_entries() {
        let doc = DecisionsDoc {
            risk_categories: vec![CategoryDoc {
                label: Some("Low".into()),
                ..Default::default()
            }],
            underwriting_flags: vec![],
        };
        assert!(compile_decisions(&doc, FIELDS).is_err());

        let doc: DecisionsDoc = serde_yaml::from_str(r#"
underwriting_flags:
  - when: {final_score: [1]}
    flag: X
"#)
        .unwrap();
        assert!(compile_decisions(&doc, FIELDS).is_err());

        let doc: DecisionsDoc = serde_yaml::from_str(r#"
underwriting_flags:
  - when: {income_score_in: [1]}
    flag: X
"#)
        .unwrap();
        assert!(matches!(
            compile_decisions(&doc, FIELDS),
            Err(ConfigError::UnknownField(f)) if f == "income_score"
        ));
    }

    #[test]
    fn test_flag_defaults_to_manual_review() {
        let doc: DecisionsDoc = serde_yaml::from_str(r#"
underwriting_flags:
  - when: {final_score_in: [3]}
"#)
        .unwrap();
        let table = compile_decisions(&doc, FIELDS).unwrap();
        assert_eq!(table.flags()[0].flag, MANUAL_REVIEW);
    }
}
