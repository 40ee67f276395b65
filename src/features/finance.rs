//! Sum-assured and premium to income ratios

use crate::preprocess::CanonicalFinance;
use crate::rules::FinanceComponent;
use serde::Serialize;

/// `numerator / income`, defined only for a present numerator and positive income
pub fn income_ratio(numerator: Option<f64>, income: Option<f64>) -> Option<f64> {
    match (numerator, income) {
        (Some(n), Some(i)) if i > 0.0 => Some(n / i),
        _ => None,
    }
}

/// Derived finance ratios for one proposal
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct FinanceRatios {
    pub sar_income_ratio: Option<f64>,
    pub tsar_income_ratio: Option<f64>,
    pub premium_income_ratio: Option<f64>,
}

impl FinanceRatios {
    pub fn derive(input: &CanonicalFinance) -> Self {
        let income = input.annual_income;
        Self {
            sar_income_ratio: income_ratio(input.sum_assured, income),
            tsar_income_ratio: income_ratio(total_sum_assured(input), income),
            premium_income_ratio: income_ratio(input.premium, income),
        }
    }

    pub fn get(&self, component: FinanceComponent) -> Option<f64> {
        match component {
            FinanceComponent::Sar => self.sar_income_ratio,
            FinanceComponent::Tsar => self.tsar_income_ratio,
            FinanceComponent::Premium => self.premium_income_ratio,
        }
    }
}

/// Sum assured including prior coverage; both parts must be known
pub fn total_sum_assured(input: &CanonicalFinance) -> Option<f64> {
    Some(input.sum_assured? + input.other_insurance_sum_assured?)
}

/// The raw amount a component's ratio is built from
pub fn component_numerator(input: &CanonicalFinance, component: FinanceComponent) -> Option<f64> {
    match component {
        FinanceComponent::Sar => input.sum_assured,
        FinanceComponent::Tsar => total_sum_assured(input),
        FinanceComponent::Premium => input.premium,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn canon(income: Option<f64>, sa: Option<f64>, other: Option<f64>, premium: Option<f64>) -> CanonicalFinance {
        CanonicalFinance {
            proposal_number: "P".into(),
            annual_income: income,
            sum_assured: sa,
            other_insurance_sum_assured: other,
            premium,
            ..Default::default()
        }
    }

    #[test]
    fn test_ratios_with_positive_income() {
        for income in [1.0, 350_000.0, 1e9] {
            let r = FinanceRatios::derive(&canon(Some(income), Some(5e6), Some(1e6), Some(5e4)));
            assert_relative_eq!(r.sar_income_ratio.unwrap(), 5e6 / income);
            assert_relative_eq!(r.tsar_income_ratio.unwrap(), 6e6 / income);
            assert_relative_eq!(r.premium_income_ratio.unwrap(), 5e4 / income);
        }
    }

    #[test]
    fn test_zero_or_missing_income_is_undefined() {
        for income in [Some(0.0), None] {
            let r = FinanceRatios::derive(&canon(income, Some(5e6), Some(1e6), Some(5e4)));
            assert_eq!(r, FinanceRatios::default());
        }
    }

    #[test]
    fn test_tsar_needs_all_three_fields() {
        let r = FinanceRatios::derive(&canon(Some(1e5), Some(1e6), None, None));
        assert_relative_eq!(r.sar_income_ratio.unwrap(), 10.0);
        assert_eq!(r.tsar_income_ratio, None);
        assert_eq!(r.premium_income_ratio, None);
        assert_eq!(r.get(FinanceComponent::Sar), r.sar_income_ratio);
    }
}
