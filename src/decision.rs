//! Decision evaluation: risk category and underwriting flag
//!
//! Both lookups are ordered, first-match-wins rule lists evaluated against the
//! already computed scores. Rule order is significant.

use crate::rules::{Condition, ScoreContext};
use serde::Serialize;

/// Category when the final score matches no rule
pub const DEFAULT_CATEGORY: &str = "Unknown";

/// Flag when no rule applies or the final score is missing
pub const MANUAL_REVIEW: &str = "Manual Review";

/// Context field carrying the final score
pub const FINAL_SCORE: &str = "final_score";

/// Maps a condition to a risk category, optionally carrying its own flag
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryRule {
    pub condition: Condition,
    pub label: String,
    pub flag: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlagRule {
    pub condition: Condition,
    pub flag: String,
}

/// Outcome of evaluating a decision table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub risk_category: Option<String>,
    pub underwriting_flag: String,
}

impl Decision {
    fn manual_review() -> Self {
        Self {
            risk_category: None,
            underwriting_flag: MANUAL_REVIEW.to_string(),
        }
    }
}

/// Ordered category and flag rules
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecisionTable {
    categories: Vec<CategoryRule>,
    flags: Vec<FlagRule>,
}

impl DecisionTable {
    pub fn new(categories: Vec<CategoryRule>, flags: Vec<FlagRule>) -> Self {
        Self { categories, flags }
    }

    pub fn categories(&self) -> &[CategoryRule] {
        &self.categories
    }

    pub fn flags(&self) -> &[FlagRule] {
        &self.flags
    }

    /// First category rule whose condition holds
    pub fn match_category(&self, ctx: &ScoreContext) -> Option<&CategoryRule> {
        self.categories.iter().find(|rule| rule.condition.evaluate(ctx))
    }

    /// First flag rule whose condition holds
    pub fn match_flag(&self, ctx: &ScoreContext) -> Option<&FlagRule> {
        self.flags.iter().find(|rule| rule.condition.evaluate(ctx))
    }

    /// Resolve category and flag.
    ///
    /// A missing final score short-circuits to no category and manual review.
    /// Otherwise the flag comes from the first matching flag rule, then from
    /// the matched category rule, then defaults to manual review.
    pub fn evaluate(&self, ctx: &ScoreContext) -> Decision {
        if ctx.get(FINAL_SCORE).is_none() {
            return Decision::manual_review();
        }

        let category = self.match_category(ctx);
        let risk_category = Some(
            category
                .map(|rule| rule.label.clone())
                .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
        );

        let underwriting_flag = self
            .match_flag(ctx)
            .map(|rule| rule.flag.clone())
            .or_else(|| category.and_then(|rule| rule.flag.clone()))
            .unwrap_or_else(|| MANUAL_REVIEW.to_string());

        Decision {
            risk_category,
            underwriting_flag,
        }
    }
}
