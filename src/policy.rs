//! Calculation policy: the constants and conventions that are not part of
//! any agreement's parameters

use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::StoreError;

/// How yearly contributions are accumulated into capital
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CompoundingConvention {
    /// Each year: add the year's contribution, then apply one year of growth
    #[default]
    ContributeThenGrow,
    /// Each year's contribution grows for the years remaining after it,
    /// `C * (1 + g)^(n - i)` for contribution year `i` of `n`
    CohortDiscounting,
}

impl CompoundingConvention {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompoundingConvention::ContributeThenGrow => "contribute_then_grow",
            CompoundingConvention::CohortDiscounting => "cohort_discounting",
        }
    }
}

/// Policy applied to every calculation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationPolicy {
    /// Assumed payout horizon used to turn capital into a monthly pension
    #[serde(default = "default_payout_years")]
    pub payout_years: u32,

    #[serde(default)]
    pub compounding: CompoundingConvention,

    /// Subtract the scenario's admin fee from the growth rate
    #[serde(default)]
    pub deduct_admin_fee: bool,

    /// Used when neither the user nor the scenario gives a return rate
    #[serde(default = "default_fallback_return_rate")]
    pub fallback_return_rate: f64,

    /// Used when neither the user nor the scenario gives a retirement age
    #[serde(default = "default_fallback_retirement_age")]
    pub fallback_retirement_age: u32,

    /// Pin "this year" for reproducible service-year arithmetic; system clock when unset
    #[serde(default)]
    pub current_year: Option<i32>,
}

fn default_payout_years() -> u32 { 20 }
fn default_fallback_return_rate() -> f64 { 0.03 }
fn default_fallback_retirement_age() -> u32 { 65 }

impl Default for CalculationPolicy {
    fn default() -> Self {
        Self {
            payout_years: 20,
            compounding: CompoundingConvention::ContributeThenGrow,
            deduct_admin_fee: false,
            fallback_return_rate: 0.03,
            fallback_retirement_age: 65,
            current_year: None,
        }
    }
}

impl CalculationPolicy {
    pub fn from_json_str(json: &str) -> Result<Self, StoreError> {
        let policy: Self = serde_json::from_str(json)?;
        policy.validate()?;
        Ok(policy)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), StoreError> {
        if self.payout_years == 0 {
            return Err(StoreError::InvalidPolicy("payout_years must be at least 1".into()));
        }
        if !self.fallback_return_rate.is_finite() || self.fallback_return_rate <= -1.0 {
            return Err(StoreError::InvalidPolicy(format!(
                "fallback_return_rate out of range: {}",
                self.fallback_return_rate
            )));
        }
        Ok(())
    }

    /// Year used as "now" in service-year arithmetic
    pub fn current_year(&self) -> i32 {
        self.current_year.unwrap_or_else(|| chrono::Local::now().year())
    }

    pub fn payout_months(&self) -> f64 {
        self.payout_years as f64 * 12.0
    }
}
