//! Per-scenario parameter record and its validated rule form

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::levels::{BenefitLevel, BenefitRules};

/// Which pension formula a scenario uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemeKind {
    /// Premiebestämd: accumulated contributions plus growth
    ContributionBased,
    /// Förmånsbestämd: bracketed percentage of final salary
    BenefitBased,
}

impl SchemeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemeKind::ContributionBased => "contribution_based",
            SchemeKind::BenefitBased => "benefit_based",
        }
    }
}

/// Parameter record for one (agreement, scenario), as published by the
/// document-extraction job
///
/// Fields this crate does not know about are kept in `extra` and written
/// back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgreementScenarioParameters {
    #[serde(rename = "type")]
    pub kind: SchemeKind,

    /// Contribution rate on salary up to the income cap (0.045 = 4.5%)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contribution_rate_below_cap: Option<f64>,

    /// Contribution rate on salary above the income cap
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contribution_rate_above_cap: Option<f64>,

    /// Number of income base amounts making up the annual cap (typically 7.5)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub income_cap_base_amount: Option<f64>,

    /// Inkomstbasbelopp, SEK per year
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub income_base_amount: Option<f64>,

    /// Annual admin fee as a fraction of capital
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_fee_percentage: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_return_rate: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_retirement_age: Option<u32>,

    #[serde(default, alias = "defined_benefit_levels", skip_serializing_if = "Option::is_none")]
    pub benefit_levels: Option<Vec<BenefitLevel>>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Contribution-based rule set with every required field present
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContributionRules {
    pub rate_below_cap: f64,
    pub rate_above_cap: f64,
    pub income_cap_base_amount: f64,
    pub income_base_amount: f64,
    pub admin_fee: f64,
}

impl ContributionRules {
    /// Annual income ceiling in SEK
    ///
    /// Already an annual figure; it is compared against `monthly_salary * 12`
    /// and never multiplied by 12 again.
    pub fn income_cap(&self) -> f64 {
        self.income_cap_base_amount * self.income_base_amount
    }
}

/// Closed set of formulas, resolved once when parameters are loaded
#[derive(Debug, Clone, PartialEq)]
pub enum SchemeRules {
    ContributionBased(ContributionRules),
    BenefitBased(BenefitRules),
}

impl SchemeRules {
    pub fn kind(&self) -> SchemeKind {
        match self {
            SchemeRules::ContributionBased(_) => SchemeKind::ContributionBased,
            SchemeRules::BenefitBased(_) => SchemeKind::BenefitBased,
        }
    }
}

impl AgreementScenarioParameters {
    /// Validate the record and convert it to the rule set matching its type
    pub fn to_rules(&self) -> Result<SchemeRules, String> {
        if let Some(rate) = self.default_return_rate {
            if !rate.is_finite() || rate <= -1.0 {
                return Err(format!("default_return_rate out of range: {rate}"));
            }
        }
        if let Some(fee) = self.admin_fee_percentage {
            check_fraction("admin_fee_percentage", fee)?;
        }

        match self.kind {
            SchemeKind::ContributionBased => {
                if self.benefit_levels.as_ref().is_some_and(|l| !l.is_empty()) {
                    return Err("contribution_based scenario must not carry benefit_levels".into());
                }
                let rate_below_cap = require(self.contribution_rate_below_cap, "contribution_rate_below_cap")?;
                let rate_above_cap = require(self.contribution_rate_above_cap, "contribution_rate_above_cap")?;
                let income_cap_base_amount = require(self.income_cap_base_amount, "income_cap_base_amount")?;
                let income_base_amount = require(self.income_base_amount, "income_base_amount")?;

                check_fraction("contribution_rate_below_cap", rate_below_cap)?;
                check_fraction("contribution_rate_above_cap", rate_above_cap)?;
                check_positive("income_cap_base_amount", income_cap_base_amount)?;
                check_positive("income_base_amount", income_base_amount)?;

                Ok(SchemeRules::ContributionBased(ContributionRules {
                    rate_below_cap,
                    rate_above_cap,
                    income_cap_base_amount,
                    income_base_amount,
                    admin_fee: self.admin_fee_percentage.unwrap_or(0.0),
                }))
            }
            SchemeKind::BenefitBased => {
                if self.contribution_rate_below_cap.is_some() || self.contribution_rate_above_cap.is_some() {
                    return Err("benefit_based scenario must not carry contribution rates".into());
                }
                let levels = match &self.benefit_levels {
                    Some(levels) if !levels.is_empty() => levels.clone(),
                    _ => return Err("benefit_based scenario requires benefit_levels".into()),
                };
                for level in &levels {
                    check_fraction("benefit level percent", level.percent)?;
                }
                Ok(SchemeRules::BenefitBased(BenefitRules::new(levels)))
            }
        }
    }
}

fn require(value: Option<f64>, name: &str) -> Result<f64, String> {
    value.ok_or_else(|| format!("missing {name}"))
}

fn check_fraction(name: &str, value: f64) -> Result<(), String> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(format!("{name} must be a fraction between 0 and 1, got {value}"))
    }
}

fn check_positive(name: &str, value: f64) -> Result<(), String> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(format!("{name} must be positive, got {value}"))
    }
}
