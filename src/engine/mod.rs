//! Scoring engines: preprocess, derive, band, aggregate, decide, validate

mod finance;
mod health;

pub use finance::{FinanceEngine, FinanceScore};
pub use health::{HealthEngine, HealthScore, MemberBreakdown, MemberScore};
