//! Feature derivation: finance ratios and per-member health points

mod cbc;
mod finance;
mod lifestyle;

pub use cbc::{cbc_points, marker_value, rbc_pattern_points, CbcBreakdown};
pub use finance::{component_numerator, income_ratio, total_sum_assured, FinanceRatios};
pub use lifestyle::{
    activity_points, lifestyle_points, sleep_points, LifestyleBreakdown, ACTIVITY_FULL_MINUTES,
    ACTIVITY_PARTIAL_MINUTES,
};
