//! Calculation results and the assumptions recorded alongside them

use serde::{Deserialize, Serialize};

use crate::params::{AgreementScenarioParameters, SchemeKind};
use crate::policy::CompoundingConvention;
use crate::projection::{BenefitProjection, ContributionProjection};

/// Degenerate-but-valid conditions worth telling the user about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Warning {
    /// Salary is zero, so nothing is contributed or earned
    ZeroSalary,
    /// Retirement age is not after current age
    NoYearsToRetirement,
    /// No benefit bracket matches the years of service; the table is incomplete
    NoMatchingBenefitLevel,
}

impl Warning {
    pub fn as_str(&self) -> &'static str {
        match self {
            Warning::ZeroSalary => "zero_salary",
            Warning::NoYearsToRetirement => "no_years_to_retirement",
            Warning::NoMatchingBenefitLevel => "no_matching_benefit_level",
        }
    }
}

/// Where a defaulted value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueSource {
    UserInput,
    ScenarioDefault,
    PolicyConstant,
    /// Computed from other inputs (e.g. years of service from start year)
    Derived,
}

/// A value together with the layer that supplied it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Resolved<T> {
    pub value: T,
    pub source: ValueSource,
}

impl<T: Copy> Resolved<T> {
    pub fn new(value: T, source: ValueSource) -> Self {
        Self { value, source }
    }

    /// First present value of user input, scenario default, then policy constant
    pub fn layered(user: Option<T>, scenario: Option<T>, policy: T) -> Self {
        match (user, scenario) {
            (Some(v), _) => Self::new(v, ValueSource::UserInput),
            (None, Some(v)) => Self::new(v, ValueSource::ScenarioDefault),
            (None, None) => Self::new(policy, ValueSource::PolicyConstant),
        }
    }
}

/// Every assumption a result depends on, for "assumptions used" disclosure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectiveParameters {
    pub agreement: String,
    pub scenario: String,

    /// Scenario record as it was in the snapshot used
    pub scenario_parameters: AgreementScenarioParameters,

    pub retirement_age: Resolved<u32>,

    /// Return rate before any fee deduction (contribution-based only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_rate: Option<Resolved<f64>>,

    /// Rate actually compounded, after optional admin-fee deduction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub growth_rate: Option<f64>,

    pub admin_fee_deducted: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub income_cap: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compounding: Option<CompoundingConvention>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub years_of_service: Option<Resolved<u32>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub benefit_percent: Option<f64>,

    pub payout_years: u32,
    pub current_year: i32,
}

/// Formula-specific working
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProjectionDetail {
    ContributionBased(ContributionProjection),
    BenefitBased(BenefitProjection),
}

/// Output of one calculation; immutable once built
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationResult {
    pub kind: SchemeKind,
    pub monthly_contribution: f64,
    /// Only for contribution-based scenarios
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annual_contribution: Option<f64>,
    pub total_capital: f64,
    pub monthly_pension: f64,
    pub annual_pension: f64,
    /// Signed; zero or negative means already at or past retirement age
    pub years_to_retirement: i32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<Warning>,
    pub effective_parameters: EffectiveParameters,
    pub detail: ProjectionDetail,
}

impl CalculationResult {
    pub fn has_warning(&self, warning: Warning) -> bool {
        self.warnings.contains(&warning)
    }
}
