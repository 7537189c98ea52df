//! Calculation dispatcher
//!
//! Resolves the scenario, checks that the personal facts its formula needs
//! are present, fills agreement-level defaults through one layered lookup
//! (user input, then scenario default, then policy constant) and runs the
//! matching projector. Personal facts are never defaulted.

use log::{debug, info};
use std::sync::Arc;

use crate::error::{CalcError, StoreError};
use crate::history::{HistoryEntry, HistorySink};
use crate::input::{check_age, CalculationInput, Field, ServiceEdit, ServiceTimeline};
use crate::params::{ParameterStore, ResolvedScenario, SchemeKind, SchemeRules};
use crate::policy::CalculationPolicy;
use crate::projection::{BenefitProjector, ContributionProjector, SalaryExchange};
use crate::result::{CalculationResult, EffectiveParameters, ProjectionDetail, Resolved, ValueSource};

/// Fields every scenario type needs
const ALWAYS_REQUIRED: [Field; 2] = [Field::Age, Field::MonthlySalary];

/// Gap list for a scenario type: required fields absent from `input`
///
/// Years of service may be given directly or as a start year; when neither
/// is present the gap is reported as `years_of_service`.
pub fn missing_fields(kind: SchemeKind, input: &CalculationInput) -> Vec<Field> {
    let mut missing = Vec::new();
    if input.age.is_none() {
        missing.push(Field::Age);
    }
    if input.monthly_salary.is_none() {
        missing.push(Field::MonthlySalary);
    }
    if kind == SchemeKind::BenefitBased && input.years_of_service.is_none() && input.start_work_year.is_none() {
        missing.push(Field::YearsOfService);
    }
    if kind == SchemeKind::ContributionBased
        && input.salary_exchange.is_some_and(|amount| amount > 0.0)
        && input.salary_exchange_premium.is_none()
    {
        missing.push(Field::SalaryExchangePremium);
    }
    missing
}

/// Fields that must be supplied before a scenario of `kind` can be calculated
pub fn required_fields(kind: SchemeKind) -> Vec<Field> {
    let mut fields = ALWAYS_REQUIRED.to_vec();
    if kind == SchemeKind::BenefitBased {
        fields.push(Field::YearsOfService);
    }
    fields
}

/// Stateless calculation front door; safe to share across threads
pub struct Calculator {
    store: Arc<ParameterStore>,
    policy: CalculationPolicy,
    history: Option<Arc<dyn HistorySink>>,
}

impl Calculator {
    pub fn new(store: Arc<ParameterStore>, policy: CalculationPolicy) -> Self {
        Self {
            store,
            policy,
            history: None,
        }
    }

    /// Calculator over the bundled parameters and default policy
    pub fn bundled() -> Result<Self, StoreError> {
        Ok(Self::new(Arc::new(ParameterStore::bundled()?), CalculationPolicy::default()))
    }

    /// Record every successful calculation to `sink`
    pub fn with_history(mut self, sink: Arc<dyn HistorySink>) -> Self {
        self.history = Some(sink);
        self
    }

    pub fn store(&self) -> &ParameterStore {
        &self.store
    }

    pub fn policy(&self) -> &CalculationPolicy {
        &self.policy
    }

    /// Resolve the scenario and calculate
    pub fn calculate(&self, agreement: &str, scenario: &str, input: &CalculationInput) -> Result<CalculationResult, CalcError> {
        let resolved = self.store.resolve(agreement, scenario)?;
        let result = self.calculate_with(&resolved, input)?;

        if let Some(history) = &self.history {
            history.record(HistoryEntry::new(&resolved.agreement, &resolved.scenario, input, &result));
        }
        Ok(result)
    }

    /// Calculate against an already resolved scenario; no side effects
    pub fn calculate_with(&self, resolved: &ResolvedScenario, input: &CalculationInput) -> Result<CalculationResult, CalcError> {
        let kind = resolved.rules.kind();

        let missing = missing_fields(kind, input);
        if !missing.is_empty() {
            debug!(
                "{}/{}: missing {:?}",
                resolved.agreement, resolved.scenario, missing
            );
            return Err(CalcError::MissingParameter { missing });
        }
        input.validate()?;

        let (age, monthly_salary) = match (input.age, input.monthly_salary) {
            (Some(age), Some(salary)) => (age, salary),
            _ => return Err(CalcError::MissingParameter { missing: ALWAYS_REQUIRED.to_vec() }),
        };
        if let Some(exchange) = input.salary_exchange {
            if exchange > monthly_salary {
                return Err(CalcError::invalid(format!(
                    "salary_exchange ({exchange}) exceeds monthly_salary ({monthly_salary})"
                )));
            }
        }

        let params = &resolved.parameters;
        let retirement_age = Resolved::layered(
            input.retirement_age,
            params.default_retirement_age,
            self.policy.fallback_retirement_age,
        );
        check_age(Field::RetirementAge, retirement_age.value)?;
        let years_to_retirement = years_between(age, retirement_age.value);
        let current_year = self.policy.current_year();

        info!(
            "Calculating {}/{} ({}): age {age}, salary {monthly_salary:.0}, retirement age {} ({:?})",
            resolved.agreement,
            resolved.scenario,
            kind.as_str(),
            retirement_age.value,
            retirement_age.source,
        );

        let mut effective = EffectiveParameters {
            agreement: resolved.agreement.clone(),
            scenario: resolved.scenario.clone(),
            scenario_parameters: params.clone(),
            retirement_age,
            return_rate: None,
            growth_rate: None,
            admin_fee_deducted: false,
            income_cap: None,
            compounding: None,
            years_of_service: None,
            benefit_percent: None,
            payout_years: self.policy.payout_years,
            current_year,
        };

        match &resolved.rules {
            SchemeRules::ContributionBased(rules) => {
                let return_rate = Resolved::layered(
                    input.return_rate,
                    params.default_return_rate,
                    self.policy.fallback_return_rate,
                );
                let exchange = match (input.salary_exchange, input.salary_exchange_premium) {
                    (Some(monthly_amount), Some(premium_pct)) if monthly_amount > 0.0 => {
                        Some(SalaryExchange { monthly_amount, premium_pct })
                    }
                    _ => None,
                };

                let projector = ContributionProjector::new(rules, &self.policy);
                let growth_rate = projector.growth_rate(return_rate.value);
                if !growth_rate.is_finite() || growth_rate <= -1.0 {
                    return Err(CalcError::invalid(format!(
                        "growth rate after admin fee must be above -1.0, got {growth_rate}"
                    )));
                }
                let projection = projector.project(age, monthly_salary, years_to_retirement, return_rate.value, exchange);

                effective.return_rate = Some(return_rate);
                effective.growth_rate = Some(projection.growth_rate);
                effective.admin_fee_deducted = self.policy.deduct_admin_fee;
                effective.income_cap = Some(rules.income_cap());
                effective.compounding = Some(self.policy.compounding);

                Ok(CalculationResult {
                    kind,
                    monthly_contribution: projection.breakdown.monthly_contribution(),
                    annual_contribution: Some(projection.breakdown.annual_contribution),
                    total_capital: projection.total_capital,
                    monthly_pension: projection.monthly_pension,
                    annual_pension: projection.monthly_pension * 12.0,
                    years_to_retirement,
                    warnings: projection.warnings.clone(),
                    effective_parameters: effective,
                    detail: ProjectionDetail::ContributionBased(projection),
                })
            }
            SchemeRules::BenefitBased(rules) => {
                let timeline = ServiceTimeline::new(age, retirement_age.value, current_year);
                let years_of_service = resolve_years_of_service(input, &timeline)?;

                let projector = BenefitProjector::new(rules, &self.policy);
                let projection = projector.project(monthly_salary, years_of_service.value, years_to_retirement);

                effective.years_of_service = Some(years_of_service);
                effective.benefit_percent = Some(projection.benefit_percent);

                Ok(CalculationResult {
                    kind,
                    monthly_contribution: 0.0,
                    annual_contribution: None,
                    total_capital: projection.capital_equivalent,
                    monthly_pension: projection.monthly_pension,
                    annual_pension: projection.annual_pension,
                    years_to_retirement,
                    warnings: projection.warnings.clone(),
                    effective_parameters: effective,
                    detail: ProjectionDetail::BenefitBased(projection),
                })
            }
        }
    }

    /// Timeline linking years of service and start year for this scenario
    ///
    /// Uses the same retirement-age defaulting as `calculate`.
    pub fn service_timeline(
        &self,
        agreement: &str,
        scenario: &str,
        input: &CalculationInput,
    ) -> Result<ServiceTimeline, CalcError> {
        let resolved = self.store.resolve(agreement, scenario)?;
        let age = input.age.ok_or(CalcError::MissingParameter { missing: vec![Field::Age] })?;
        input.validate()?;
        let retirement_age = Resolved::layered(
            input.retirement_age,
            resolved.parameters.default_retirement_age,
            self.policy.fallback_retirement_age,
        );
        check_age(Field::RetirementAge, retirement_age.value)?;
        Ok(ServiceTimeline::new(age, retirement_age.value, self.policy.current_year()))
    }

    /// Update one of years-of-service / start-year and recompute the other
    pub fn edit_service(
        &self,
        agreement: &str,
        scenario: &str,
        input: &CalculationInput,
        edit: ServiceEdit,
    ) -> Result<CalculationInput, CalcError> {
        let timeline = self.service_timeline(agreement, scenario, input)?;
        let mut updated = input.clone();
        updated.apply_service_edit(edit, &timeline);
        updated.validate()?;
        Ok(updated)
    }
}

/// Signed whole years from `age` to `retirement_age`
fn years_between(age: u32, retirement_age: u32) -> i32 {
    let years = i64::from(retirement_age) - i64::from(age);
    i32::try_from(years).unwrap_or(if years < 0 { i32::MIN } else { i32::MAX })
}

/// Years of service from direct input, or derived from the start year
///
/// When both are given they must agree on the timeline.
fn resolve_years_of_service(input: &CalculationInput, timeline: &ServiceTimeline) -> Result<Resolved<u32>, CalcError> {
    match (input.years_of_service, input.start_work_year) {
        (Some(years), Some(start)) => {
            let derived = timeline.years_of_service(start);
            if derived != years {
                return Err(CalcError::invalid(format!(
                    "years_of_service ({years}) does not match start_work_year {start} (gives {derived} years at retirement in {})",
                    timeline.retirement_year()
                )));
            }
            Ok(Resolved::new(years, ValueSource::UserInput))
        }
        (Some(years), None) => Ok(Resolved::new(years, ValueSource::UserInput)),
        (None, Some(start)) => Ok(Resolved::new(timeline.years_of_service(start), ValueSource::Derived)),
        (None, None) => Err(CalcError::MissingParameter { missing: vec![Field::YearsOfService] }),
    }
}
