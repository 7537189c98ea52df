//! Contribution-based (premiebestämd) projection
//!
//! Salary is split at the annual income cap, each part earns its own
//! contribution rate, and the yearly contribution is compounded up to
//! retirement. The capital is spread over the policy's payout horizon.

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::params::ContributionRules;
use crate::policy::{CalculationPolicy, CompoundingConvention};
use crate::result::Warning;

/// Salary exchanged for pension each month, with the share paid in
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SalaryExchange {
    pub monthly_amount: f64,
    /// Percent of the exchanged amount paid in as premium
    pub premium_pct: f64,
}

impl SalaryExchange {
    pub fn annual_contribution(&self) -> f64 {
        self.monthly_amount * 12.0 * (self.premium_pct / 100.0)
    }
}

/// How the annual contribution was put together
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContributionBreakdown {
    pub annual_salary: f64,
    pub income_cap: f64,
    pub salary_below_cap: f64,
    pub salary_above_cap: f64,
    pub contribution_below_cap: f64,
    pub contribution_above_cap: f64,
    pub salary_exchange_contribution: f64,
    pub annual_contribution: f64,
}

impl ContributionBreakdown {
    pub fn compute(monthly_salary: f64, rules: &ContributionRules, exchange: Option<SalaryExchange>) -> Self {
        if monthly_salary <= 0.0 {
            return Self {
                annual_salary: 0.0,
                income_cap: rules.income_cap(),
                salary_below_cap: 0.0,
                salary_above_cap: 0.0,
                contribution_below_cap: 0.0,
                contribution_above_cap: 0.0,
                salary_exchange_contribution: 0.0,
                annual_contribution: 0.0,
            };
        }

        let annual_salary = monthly_salary * 12.0;
        let income_cap = rules.income_cap();
        let salary_below_cap = annual_salary.min(income_cap);
        let salary_above_cap = (annual_salary - income_cap).max(0.0);

        let contribution_below_cap = salary_below_cap * rules.rate_below_cap;
        let contribution_above_cap = salary_above_cap * rules.rate_above_cap;
        let salary_exchange_contribution = exchange.map(|e| e.annual_contribution()).unwrap_or(0.0);

        Self {
            annual_salary,
            income_cap,
            salary_below_cap,
            salary_above_cap,
            contribution_below_cap,
            contribution_above_cap,
            salary_exchange_contribution,
            annual_contribution: contribution_below_cap + contribution_above_cap + salary_exchange_contribution,
        }
    }

    pub fn monthly_contribution(&self) -> f64 {
        self.annual_contribution / 12.0
    }
}

/// One year of the accumulation schedule
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccumulationYear {
    /// 1-based contribution year
    pub year: u32,
    pub age: u32,
    pub opening_capital: f64,
    pub contribution: f64,
    pub growth: f64,
    pub closing_capital: f64,
}

/// Compound a level annual contribution over `years` years
///
/// `ContributeThenGrow` pays in at the start of each year, so every
/// contribution earns a full year of growth in its own year.
/// `CohortDiscounting` pays in at the end of each year; the closing capital
/// equals `sum(C * (1 + g)^(n - i))` over contribution years `i = 1..=n`.
pub fn accumulate(
    annual_contribution: f64,
    years: u32,
    growth_rate: f64,
    convention: CompoundingConvention,
    start_age: u32,
) -> Vec<AccumulationYear> {
    let mut schedule = Vec::with_capacity(years as usize);
    let mut capital = 0.0;

    for year in 1..=years {
        let opening_capital = capital;
        let growth = match convention {
            CompoundingConvention::ContributeThenGrow => (opening_capital + annual_contribution) * growth_rate,
            CompoundingConvention::CohortDiscounting => opening_capital * growth_rate,
        };
        capital = opening_capital + annual_contribution + growth;

        debug!(
            "Year {year}: contribution {annual_contribution:.2}, growth {growth:.2}, capital {capital:.2}"
        );

        schedule.push(AccumulationYear {
            year,
            age: start_age.saturating_add(year - 1),
            opening_capital,
            contribution: annual_contribution,
            growth,
            closing_capital: capital,
        });
    }

    schedule
}

/// Contribution-based projection outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContributionProjection {
    pub breakdown: ContributionBreakdown,
    pub growth_rate: f64,
    pub total_capital: f64,
    pub monthly_pension: f64,
    pub schedule: Vec<AccumulationYear>,
    #[serde(skip)]
    pub warnings: Vec<Warning>,
}

/// Projector for contribution-based scenarios
pub struct ContributionProjector<'a> {
    rules: &'a ContributionRules,
    policy: &'a CalculationPolicy,
}

impl<'a> ContributionProjector<'a> {
    pub fn new(rules: &'a ContributionRules, policy: &'a CalculationPolicy) -> Self {
        Self { rules, policy }
    }

    /// Growth rate actually compounded for a given return rate
    pub fn growth_rate(&self, return_rate: f64) -> f64 {
        if self.policy.deduct_admin_fee {
            return_rate - self.rules.admin_fee
        } else {
            return_rate
        }
    }

    pub fn project(
        &self,
        age: u32,
        monthly_salary: f64,
        years_to_retirement: i32,
        return_rate: f64,
        exchange: Option<SalaryExchange>,
    ) -> ContributionProjection {
        let mut warnings = Vec::new();
        if monthly_salary <= 0.0 {
            warnings.push(Warning::ZeroSalary);
        }

        let breakdown = ContributionBreakdown::compute(monthly_salary, self.rules, exchange);
        let growth_rate = self.growth_rate(return_rate);

        debug!(
            "Income cap {:.0}: below {:.0} @ {:.2}%, above {:.0} @ {:.2}%",
            breakdown.income_cap,
            breakdown.salary_below_cap,
            self.rules.rate_below_cap * 100.0,
            breakdown.salary_above_cap,
            self.rules.rate_above_cap * 100.0,
        );

        if years_to_retirement <= 0 {
            warnings.push(Warning::NoYearsToRetirement);
            return ContributionProjection {
                breakdown,
                growth_rate,
                total_capital: 0.0,
                monthly_pension: 0.0,
                schedule: Vec::new(),
                warnings,
            };
        }

        let schedule = accumulate(
            breakdown.annual_contribution,
            years_to_retirement as u32,
            growth_rate,
            self.policy.compounding,
            age,
        );
        let total_capital = schedule.last().map(|y| y.closing_capital).unwrap_or(0.0);
        let monthly_pension = total_capital / self.policy.payout_months();

        info!(
            "Contribution projection: annual contribution {:.2}, capital {:.2} after {} years at {:.2}%, monthly pension {:.2}",
            breakdown.annual_contribution,
            total_capital,
            years_to_retirement,
            growth_rate * 100.0,
            monthly_pension,
        );

        ContributionProjection {
            breakdown,
            growth_rate,
            total_capital,
            monthly_pension,
            schedule,
            warnings,
        }
    }
}
