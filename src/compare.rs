//! Side-by-side comparison of two scenarios for the same person

use log::info;
use serde::{Deserialize, Serialize};

use crate::calculator::Calculator;
use crate::error::{ComparisonError, Side};
use crate::input::CalculationInput;
use crate::result::CalculationResult;

/// Percentage difference of `a` relative to `b`
///
/// Both zero gives 0; `b` zero with `a` non-zero gives 100.
pub fn percentage_difference(a: f64, b: f64) -> f64 {
    if b == 0.0 {
        if a == 0.0 {
            0.0
        } else {
            100.0
        }
    } else {
        (a - b) / b * 100.0
    }
}

/// An (agreement, scenario) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioRef {
    pub agreement: String,
    pub scenario: String,
}

impl ScenarioRef {
    pub fn new(agreement: impl Into<String>, scenario: impl Into<String>) -> Self {
        Self {
            agreement: agreement.into(),
            scenario: scenario.into(),
        }
    }
}

impl std::fmt::Display for ScenarioRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.agreement, self.scenario)
    }
}

/// One metric on both sides; `absolute` is A minus B
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricDifference {
    pub a: f64,
    pub b: f64,
    pub absolute: f64,
    pub percentage: f64,
}

impl MetricDifference {
    pub fn new(a: f64, b: f64) -> Self {
        Self {
            a,
            b,
            absolute: a - b,
            percentage: percentage_difference(a, b),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Differences {
    pub monthly_pension: MetricDifference,
    pub total_capital: MetricDifference,
    pub monthly_contribution: MetricDifference,
    /// In whole years; degenerate sides count their signed value
    pub years_to_retirement: MetricDifference,
}

impl Differences {
    pub fn between(a: &CalculationResult, b: &CalculationResult) -> Self {
        Self {
            monthly_pension: MetricDifference::new(a.monthly_pension, b.monthly_pension),
            total_capital: MetricDifference::new(a.total_capital, b.total_capital),
            monthly_contribution: MetricDifference::new(a.monthly_contribution, b.monthly_contribution),
            years_to_retirement: MetricDifference::new(
                f64::from(a.years_to_retirement),
                f64::from(b.years_to_retirement),
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub a: ScenarioRef,
    pub b: ScenarioRef,
    pub result_a: CalculationResult,
    pub result_b: CalculationResult,
    pub differences: Differences,
}

/// Runs the same input through two scenarios
pub struct Comparator<'a> {
    calculator: &'a Calculator,
}

impl<'a> Comparator<'a> {
    pub fn new(calculator: &'a Calculator) -> Self {
        Self { calculator }
    }

    pub fn compare(
        &self,
        a: &ScenarioRef,
        b: &ScenarioRef,
        input: &CalculationInput,
    ) -> Result<ComparisonResult, ComparisonError> {
        let result_a = self
            .calculator
            .calculate(&a.agreement, &a.scenario, input)
            .map_err(|source| ComparisonError { side: Side::A, source })?;
        let result_b = self
            .calculator
            .calculate(&b.agreement, &b.scenario, input)
            .map_err(|source| ComparisonError { side: Side::B, source })?;

        let differences = Differences::between(&result_a, &result_b);
        info!(
            "Compared {a} vs {b}: monthly pension {:+.0} ({:+.1}%)",
            differences.monthly_pension.absolute, differences.monthly_pension.percentage
        );

        Ok(ComparisonResult {
            a: a.clone(),
            b: b.clone(),
            result_a,
            result_b,
            differences,
        })
    }
}

impl Calculator {
    /// Shorthand for `Comparator::new(self).compare(..)`
    pub fn compare(
        &self,
        a: &ScenarioRef,
        b: &ScenarioRef,
        input: &CalculationInput,
    ) -> Result<ComparisonResult, ComparisonError> {
        Comparator::new(self).compare(a, b, input)
    }
}
