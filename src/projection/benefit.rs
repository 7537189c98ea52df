//! Benefit-based (förmånsbestämd) projection

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::params::{BenefitLevel, BenefitRules};
use crate::policy::CalculationPolicy;
use crate::result::Warning;

/// Benefit-based projection outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenefitProjection {
    pub years_of_service: u32,
    /// Bracket that set the percentage, if any matched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_level: Option<BenefitLevel>,
    pub benefit_percent: f64,
    pub annual_salary: f64,
    pub annual_pension: f64,
    pub monthly_pension: f64,
    /// Pension paid over the payout horizon; a comparison figure, not a savings balance
    pub capital_equivalent: f64,
    #[serde(skip)]
    pub warnings: Vec<Warning>,
}

/// Projector for benefit-based scenarios
///
/// Pension is a bracketed share of final salary; there is no compounding
/// and no contribution figure.
pub struct BenefitProjector<'a> {
    rules: &'a BenefitRules,
    policy: &'a CalculationPolicy,
}

impl<'a> BenefitProjector<'a> {
    pub fn new(rules: &'a BenefitRules, policy: &'a CalculationPolicy) -> Self {
        Self { rules, policy }
    }

    pub fn project(&self, monthly_salary: f64, years_of_service: u32, years_to_retirement: i32) -> BenefitProjection {
        let mut warnings = Vec::new();

        let matched_level = self.rules.select(years_of_service).copied();
        let benefit_percent = match matched_level {
            Some(level) => level.percent,
            None => {
                warn!(
                    "No benefit level matches {years_of_service} years of service; parameter table looks incomplete"
                );
                warnings.push(Warning::NoMatchingBenefitLevel);
                0.0
            }
        };

        let annual_salary = monthly_salary.max(0.0) * 12.0;
        if monthly_salary <= 0.0 {
            warnings.push(Warning::ZeroSalary);
        }

        let (annual_pension, monthly_pension) = if years_to_retirement <= 0 {
            warnings.push(Warning::NoYearsToRetirement);
            (0.0, 0.0)
        } else {
            let annual = annual_salary * benefit_percent;
            (annual, annual / 12.0)
        };
        let capital_equivalent = monthly_pension * self.policy.payout_months();

        info!(
            "Benefit projection: {years_of_service} years of service, level {:.2}%, monthly pension {monthly_pension:.2}",
            benefit_percent * 100.0
        );

        BenefitProjection {
            years_of_service,
            matched_level,
            benefit_percent,
            annual_salary,
            annual_pension,
            monthly_pension,
            capital_equivalent,
            warnings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn beta_rules() -> BenefitRules {
        BenefitRules::new(vec![
            BenefitLevel { years_condition: "<=30".parse().unwrap(), percent: 0.10 },
            BenefitLevel { years_condition: ">30".parse().unwrap(), percent: 0.65 },
        ])
    }

    #[test]
    fn test_beta_example() {
        let policy = CalculationPolicy::default();
        let rules = beta_rules();
        let p = BenefitProjector::new(&rules, &policy).project(50_000.0, 32, 25);
        assert_eq!(p.benefit_percent, 0.65);
        assert_relative_eq!(p.annual_pension, 390_000.0, max_relative = 1e-12);
        assert_relative_eq!(p.monthly_pension, 32_500.0, max_relative = 1e-12);
        assert_relative_eq!(p.capital_equivalent, 32_500.0 * 240.0, max_relative = 1e-12);
        assert!(p.warnings.is_empty());
    }

    #[test]
    fn test_short_service_bracket() {
        let policy = CalculationPolicy::default();
        let rules = beta_rules();
        let p = BenefitProjector::new(&rules, &policy).project(40_000.0, 30, 10);
        assert_eq!(p.benefit_percent, 0.10);
        assert_relative_eq!(p.monthly_pension, 4_000.0, max_relative = 1e-12);
    }

    #[test]
    fn test_no_matching_level_gives_zero() {
        let policy = CalculationPolicy::default();
        let rules = BenefitRules::new(vec![BenefitLevel {
            years_condition: ">=10".parse().unwrap(),
            percent: 0.5,
        }]);
        let p = BenefitProjector::new(&rules, &policy).project(40_000.0, 5, 20);
        assert_eq!(p.monthly_pension, 0.0);
        assert!(p.matched_level.is_none());
        assert!(p.warnings.contains(&Warning::NoMatchingBenefitLevel));
    }

    #[test]
    fn test_already_retired() {
        let policy = CalculationPolicy::default();
        let rules = beta_rules();
        let p = BenefitProjector::new(&rules, &policy).project(40_000.0, 35, 0);
        assert_eq!(p.monthly_pension, 0.0);
        assert!(p.warnings.contains(&Warning::NoYearsToRetirement));
    }
}
