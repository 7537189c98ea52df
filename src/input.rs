//! Calculation input and the service-years / start-year binding

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::CalcError;

/// Upper bound for ages and service years
pub const MAX_AGE: u32 = 150;

/// Latest accepted calendar year
pub const MAX_YEAR: i32 = 9999;

/// Named input fields, used for gap lists and re-prompting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Age,
    MonthlySalary,
    RetirementAge,
    YearsOfService,
    StartWorkYear,
    ReturnRate,
    SalaryExchange,
    SalaryExchangePremium,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Age => "age",
            Field::MonthlySalary => "monthly_salary",
            Field::RetirementAge => "retirement_age",
            Field::YearsOfService => "years_of_service",
            Field::StartWorkYear => "start_work_year",
            Field::ReturnRate => "return_rate",
            Field::SalaryExchange => "salary_exchange",
            Field::SalaryExchangePremium => "salary_exchange_premium",
        }
    }

    /// Swedish label shown when asking the user for the value
    pub fn label_sv(&self) -> &'static str {
        match self {
            Field::Age => "ålder",
            Field::MonthlySalary => "månadslön",
            Field::RetirementAge => "pensionsålder",
            Field::YearsOfService => "antal tjänsteår",
            Field::StartWorkYear => "år du började arbeta",
            Field::ReturnRate => "förväntad avkastning",
            Field::SalaryExchange => "belopp för löneväxling",
            Field::SalaryExchangePremium => "arbetsgivarens påslag vid löneväxling",
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Personal facts for one calculation request
///
/// Every field is optional on the wire so that absent facts can be reported
/// back as a gap list instead of being defaulted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalculationInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,

    /// Gross monthly salary (SEK)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_salary: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retirement_age: Option<u32>,

    /// Completed years of service at retirement
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub years_of_service: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_work_year: Option<i32>,

    /// Annual return override as a fraction (0.03 = 3%)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_rate: Option<f64>,

    /// Monthly gross salary exchanged into pension (SEK)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salary_exchange: Option<f64>,

    /// Share of the exchanged amount paid into pension, in percent (105.8 = amount plus 5.8%)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salary_exchange_premium: Option<f64>,
}

impl CalculationInput {
    /// Input with the two facts every calculation needs
    pub fn new(age: u32, monthly_salary: f64) -> Self {
        Self {
            age: Some(age),
            monthly_salary: Some(monthly_salary),
            ..Default::default()
        }
    }

    pub fn with_retirement_age(mut self, retirement_age: u32) -> Self {
        self.retirement_age = Some(retirement_age);
        self
    }

    pub fn with_years_of_service(mut self, years: u32) -> Self {
        self.years_of_service = Some(years);
        self
    }

    pub fn with_start_work_year(mut self, year: i32) -> Self {
        self.start_work_year = Some(year);
        self
    }

    pub fn with_return_rate(mut self, rate: f64) -> Self {
        self.return_rate = Some(rate);
        self
    }

    pub fn with_salary_exchange(mut self, monthly_amount: f64, premium_pct: f64) -> Self {
        self.salary_exchange = Some(monthly_amount);
        self.salary_exchange_premium = Some(premium_pct);
        self
    }

    /// Overlay `other` on top of `self`; fields present in `other` win
    pub fn merged_with(&self, other: &CalculationInput) -> CalculationInput {
        CalculationInput {
            age: other.age.or(self.age),
            monthly_salary: other.monthly_salary.or(self.monthly_salary),
            retirement_age: other.retirement_age.or(self.retirement_age),
            years_of_service: other.years_of_service.or(self.years_of_service),
            start_work_year: other.start_work_year.or(self.start_work_year),
            return_rate: other.return_rate.or(self.return_rate),
            salary_exchange: other.salary_exchange.or(self.salary_exchange),
            salary_exchange_premium: other.salary_exchange_premium.or(self.salary_exchange_premium),
        }
    }

    /// Apply an edit to one of the two service fields and recompute the other
    pub fn apply_service_edit(&mut self, edit: ServiceEdit, timeline: &ServiceTimeline) {
        match edit {
            ServiceEdit::StartWorkYear(year) => {
                self.start_work_year = Some(year);
                self.years_of_service = Some(timeline.years_of_service(year));
            }
            ServiceEdit::YearsOfService(years) => {
                self.years_of_service = Some(years);
                self.start_work_year = Some(timeline.start_work_year(years));
            }
        }
    }

    /// Range checks on values that are present
    ///
    /// Zero salary passes (degenerate result), negative or non-finite values do not.
    pub fn validate(&self) -> Result<(), CalcError> {
        if let Some(age) = self.age {
            check_age(Field::Age, age)?;
        }
        if let Some(retirement_age) = self.retirement_age {
            check_age(Field::RetirementAge, retirement_age)?;
        }
        if let Some(years) = self.years_of_service {
            check_age(Field::YearsOfService, years)?;
        }
        if let Some(year) = self.start_work_year {
            if !(0..=MAX_YEAR).contains(&year) {
                return Err(CalcError::invalid(format!(
                    "start_work_year must be between 0 and {MAX_YEAR}, got {year}"
                )));
            }
        }
        if let Some(salary) = self.monthly_salary {
            check_amount(Field::MonthlySalary, salary)?;
        }
        if let Some(amount) = self.salary_exchange {
            check_amount(Field::SalaryExchange, amount)?;
        }
        if let Some(premium) = self.salary_exchange_premium {
            check_amount(Field::SalaryExchangePremium, premium)?;
        }
        if let Some(rate) = self.return_rate {
            if !rate.is_finite() || rate <= -1.0 {
                return Err(CalcError::invalid(format!(
                    "return_rate must be a finite fraction above -1.0, got {rate}"
                )));
            }
        }
        Ok(())
    }

    /// Hash of the canonical JSON form, used as part of history keys
    ///
    /// First 8 bytes of its SHA-256, so it is the same across runs and builds.
    pub fn fingerprint(&self) -> u64 {
        let canonical = serde_json::to_string(self).unwrap_or_default();
        let digest = Sha256::digest(canonical.as_bytes());
        digest[..8].iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b))
    }
}

/// Ages and year counts must lie in `0..=MAX_AGE`
pub(crate) fn check_age(field: Field, value: u32) -> Result<(), CalcError> {
    if value > MAX_AGE {
        return Err(CalcError::invalid(format!("{field} must be at most {MAX_AGE}, got {value}")));
    }
    Ok(())
}

fn check_amount(field: Field, value: f64) -> Result<(), CalcError> {
    if !value.is_finite() {
        return Err(CalcError::invalid(format!("{field} must be a finite number")));
    }
    if value < 0.0 {
        return Err(CalcError::invalid(format!("{field} must not be negative, got {value}")));
    }
    Ok(())
}

/// An edit to one side of the years-of-service / start-year pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceEdit {
    StartWorkYear(i32),
    YearsOfService(u32),
}

/// Links completed years of service to the calendar year work started
///
/// Both directions go through the projected retirement year, so converting
/// one way and back returns the original value whenever work starts no
/// later than retirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceTimeline {
    pub age: u32,
    pub retirement_age: u32,
    pub current_year: i32,
}

impl ServiceTimeline {
    pub fn new(age: u32, retirement_age: u32, current_year: i32) -> Self {
        Self { age, retirement_age, current_year }
    }

    pub fn retirement_year(&self) -> i32 {
        let years_left = i64::from(self.retirement_age) - i64::from(self.age);
        clamp_year(i64::from(self.current_year) + years_left)
    }

    /// Years of service at retirement; never negative
    pub fn years_of_service(&self, start_work_year: i32) -> u32 {
        let years = i64::from(self.retirement_year()) - i64::from(start_work_year);
        u32::try_from(years.max(0)).unwrap_or(u32::MAX)
    }

    pub fn start_work_year(&self, years_of_service: u32) -> i32 {
        clamp_year(i64::from(self.retirement_year()) - i64::from(years_of_service))
    }
}

fn clamp_year(year: i64) -> i32 {
    i32::try_from(year).unwrap_or(if year < 0 { i32::MIN } else { i32::MAX })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeline_round_trip() {
        let timeline = ServiceTimeline::new(40, 65, 2024);
        assert_eq!(timeline.retirement_year(), 2049);

        for start in [1990, 2000, 2010, 2024, 2049] {
            let years = timeline.years_of_service(start);
            assert_eq!(timeline.start_work_year(years), start);
        }
    }

    #[test]
    fn test_start_after_retirement_clamps_to_zero() {
        let timeline = ServiceTimeline::new(60, 65, 2024);
        assert_eq!(timeline.years_of_service(2035), 0);
    }

    #[test]
    fn test_service_edit_keeps_fields_consistent() {
        let timeline = ServiceTimeline::new(40, 65, 2024);
        let mut input = CalculationInput::new(40, 35_000.0);

        input.apply_service_edit(ServiceEdit::StartWorkYear(2017), &timeline);
        assert_eq!(input.years_of_service, Some(32));
        assert_eq!(input.start_work_year, Some(2017));

        input.apply_service_edit(ServiceEdit::YearsOfService(20), &timeline);
        assert_eq!(input.start_work_year, Some(2029));
        assert_eq!(input.years_of_service, Some(20));
    }

    #[test]
    fn test_validate_rejects_negative_salary() {
        let input = CalculationInput::new(40, -1.0);
        assert!(matches!(input.validate(), Err(CalcError::InvalidInput { .. })));

        let zero = CalculationInput::new(40, 0.0);
        assert!(zero.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_total_loss_return() {
        let input = CalculationInput::new(40, 30_000.0).with_return_rate(-1.0);
        assert!(input.validate().is_err());

        let nan = CalculationInput::new(40, 30_000.0).with_return_rate(f64::NAN);
        assert!(nan.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_out_of_range_facts() {
        let cases = [
            CalculationInput::new(u32::MAX, 50_000.0),
            CalculationInput::new(151, 50_000.0),
            CalculationInput::new(40, 50_000.0).with_retirement_age(5_000_000),
            CalculationInput::new(40, 50_000.0).with_years_of_service(u32::MAX),
            CalculationInput::new(40, 50_000.0).with_start_work_year(-5),
            CalculationInput::new(40, 50_000.0).with_start_work_year(i32::MIN),
            CalculationInput::new(40, 50_000.0).with_start_work_year(i32::MAX),
        ];
        for input in cases {
            assert!(
                matches!(input.validate(), Err(CalcError::InvalidInput { .. })),
                "accepted {input:?}"
            );
        }

        let edge = CalculationInput::new(MAX_AGE, 50_000.0)
            .with_retirement_age(MAX_AGE)
            .with_start_work_year(0);
        assert!(edge.validate().is_ok());
    }

    #[test]
    fn test_timeline_extremes_do_not_overflow() {
        let timeline = ServiceTimeline::new(40, 65, 2024);
        assert_eq!(timeline.years_of_service(i32::MIN), u32::try_from(2049i64 - i64::from(i32::MIN)).unwrap());
        assert_eq!(timeline.years_of_service(i32::MAX), 0);
        assert_eq!(timeline.start_work_year(u32::MAX), i32::MIN);

        let reversed = ServiceTimeline::new(u32::MAX, 0, i32::MIN);
        assert_eq!(reversed.retirement_year(), i32::MIN);
    }

    #[test]
    fn test_fingerprint_is_fixed() {
        let input = CalculationInput::new(40, 50_000.0);
        let canonical = serde_json::to_string(&input).unwrap();
        let digest = Sha256::digest(canonical.as_bytes());
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest[..8]);
        assert_eq!(input.fingerprint(), u64::from_be_bytes(head));
    }

    #[test]
    fn test_merge_prefers_new_values() {
        let profile = CalculationInput::new(40, 30_000.0).with_retirement_age(67);
        let update = CalculationInput {
            monthly_salary: Some(32_000.0),
            ..Default::default()
        };
        let merged = profile.merged_with(&update);
        assert_eq!(merged.age, Some(40));
        assert_eq!(merged.monthly_salary, Some(32_000.0));
        assert_eq!(merged.retirement_age, Some(67));
    }

    #[test]
    fn test_fingerprint_is_deterministic() {
        let a = CalculationInput::new(40, 50_000.0).with_retirement_age(65);
        let b = CalculationInput::new(40, 50_000.0).with_retirement_age(65);
        let c = CalculationInput::new(41, 50_000.0).with_retirement_age(65);
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
    }

    #[test]
    fn test_absent_fields_not_serialized() {
        let input = CalculationInput::new(40, 50_000.0);
        let json = serde_json::to_value(&input).unwrap();
        assert_eq!(json, serde_json::json!({"age": 40, "monthly_salary": 50000.0}));
    }
}
