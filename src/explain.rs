//! Swedish presentation text for results
//!
//! All figures come from the result and its effective parameters; nothing
//! here recomputes or assumes a value.

use crate::compare::ComparisonResult;
use crate::input::Field;
use crate::result::{CalculationResult, ProjectionDetail, ValueSource, Warning};

/// Whole kronor with space-grouped thousands, e.g. `1 239 869`
pub fn format_sek(amount: f64) -> String {
    let rounded = amount.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(c);
    }
    if rounded < 0.0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

/// Percent with up to two decimals and a decimal comma, e.g. `4,5 %`
pub fn format_percent(fraction: f64) -> String {
    let text = format!("{:.2}", fraction * 100.0);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    format!("{} %", text.replace('.', ","))
}

fn source_sv(source: ValueSource) -> &'static str {
    match source {
        ValueSource::UserInput => "angivet av dig",
        ValueSource::ScenarioDefault => "avtalets standardvärde",
        ValueSource::PolicyConstant => "generellt antagande",
        ValueSource::Derived => "beräknat",
    }
}

/// One-paragraph answer for a calculation
pub fn summary(result: &CalculationResult) -> String {
    let eff = &result.effective_parameters;
    let retirement_age = eff.retirement_age.value;

    if result.has_warning(Warning::NoYearsToRetirement) {
        return format!(
            "Enligt {} ({}) finns inga år kvar till pensionsåldern {retirement_age}, så ingen framtida pension har beräknats.",
            eff.agreement, eff.scenario
        );
    }

    let headline = format!(
        "Baserat på dina uppgifter uppskattas din pension enligt {} ({}) till ca {} kr/mån från {retirement_age} års ålder.",
        eff.agreement,
        eff.scenario,
        format_sek(result.monthly_pension)
    );

    match &result.detail {
        ProjectionDetail::ContributionBased(_) => format!(
            "{headline} Det motsvarar ett totalt kapital på ca {} kr, baserat på en avsättning på {} kr/mån under {} år.",
            format_sek(result.total_capital),
            format_sek(result.monthly_contribution),
            result.years_to_retirement
        ),
        ProjectionDetail::BenefitBased(p) => format!(
            "{headline} Detta baseras på en förmånsnivå om {} av slutlönen efter {} års tjänstetid.",
            format_percent(p.benefit_percent),
            p.years_of_service
        ),
    }
}

/// Assumptions the result depends on, one line each
pub fn assumptions(result: &CalculationResult) -> Vec<String> {
    let eff = &result.effective_parameters;
    let mut lines = vec![format!(
        "Pensionsålder {} ({})",
        eff.retirement_age.value,
        source_sv(eff.retirement_age.source)
    )];

    if let Some(rate) = eff.return_rate {
        lines.push(format!("Avkastning {} per år ({})", format_percent(rate.value), source_sv(rate.source)));
    }
    if eff.admin_fee_deducted {
        if let Some(growth) = eff.growth_rate {
            lines.push(format!("Avgift avdragen, tillväxt {} per år", format_percent(growth)));
        }
    }
    if let Some(cap) = eff.income_cap {
        lines.push(format!("Inkomsttak {} kr per år", format_sek(cap)));
    }
    if let Some(years) = eff.years_of_service {
        lines.push(format!("Tjänstetid {} år ({})", years.value, source_sv(years.source)));
    }
    lines.push(format!("Utbetalning under {} år", eff.payout_years));

    for warning in &result.warnings {
        lines.push(
            match warning {
                Warning::ZeroSalary => "Lönen är noll, så inga avsättningar görs",
                Warning::NoYearsToRetirement => "Inga år kvar till pensionsåldern",
                Warning::NoMatchingBenefitLevel => "Ingen förmånsnivå matchar tjänstetiden",
            }
            .to_string(),
        );
    }
    lines
}

/// Step-by-step answer to "hur räknade du?"
pub fn explain(result: &CalculationResult) -> String {
    let eff = &result.effective_parameters;
    let mut steps: Vec<String> = Vec::new();

    match &result.detail {
        ProjectionDetail::ContributionBased(p) => {
            let b = &p.breakdown;
            steps.push(format!(
                "Årslönen är {} kr och inkomsttaket {} kr.",
                format_sek(b.annual_salary),
                format_sek(b.income_cap)
            ));
            steps.push(format!(
                "Avsättning under taket: {} kr, över taket: {} kr per år.",
                format_sek(b.contribution_below_cap),
                format_sek(b.contribution_above_cap)
            ));
            if b.salary_exchange_contribution > 0.0 {
                steps.push(format!(
                    "Löneväxling tillför {} kr per år.",
                    format_sek(b.salary_exchange_contribution)
                ));
            }
            steps.push(format!(
                "Totalt {} kr per år ({} kr/mån) under {} år, med en tillväxt på {} per år, ger ett kapital på {} kr.",
                format_sek(b.annual_contribution),
                format_sek(result.monthly_contribution),
                result.years_to_retirement.max(0),
                format_percent(p.growth_rate),
                format_sek(result.total_capital)
            ));
            steps.push(format!(
                "Kapitalet fördelas över {} år, vilket ger {} kr/mån.",
                eff.payout_years,
                format_sek(result.monthly_pension)
            ));
        }
        ProjectionDetail::BenefitBased(p) => {
            steps.push(format!(
                "Med {} års tjänstetid gäller förmånsnivån {}.",
                p.years_of_service,
                format_percent(p.benefit_percent)
            ));
            steps.push(format!(
                "{} av årslönen {} kr ger {} kr per år, alltså {} kr/mån.",
                format_percent(p.benefit_percent),
                format_sek(p.annual_salary),
                format_sek(p.annual_pension),
                format_sek(p.monthly_pension)
            ));
        }
    }

    let mut text = String::from("Så här räknade jag:\n");
    for (i, step) in steps.iter().enumerate() {
        text.push_str(&format!("{}. {step}\n", i + 1));
    }
    text.push_str("Antaganden:\n");
    for line in assumptions(result) {
        text.push_str(&format!("- {line}\n"));
    }
    text
}

/// Prompt asking for the fields a calculation still needs
pub fn missing_fields_prompt(missing: &[Field]) -> String {
    let labels: Vec<&str> = missing.iter().map(|f| f.label_sv()).collect();
    format!("Jag behöver följande information för att beräkna: {}.", labels.join(", "))
}

pub fn comparison_summary(comparison: &ComparisonResult) -> String {
    let diff = &comparison.differences.monthly_pension;
    if diff.absolute == 0.0 {
        return format!(
            "{} och {} ger samma pension, ca {} kr/mån.",
            comparison.a,
            comparison.b,
            format_sek(diff.a)
        );
    }
    let relation = if diff.absolute > 0.0 { "högre" } else { "lägre" };
    format!(
        "{} ger ca {} kr/mån och {} ca {} kr/mån. Pensionen enligt {} är {} kr/mån {relation} ({}).",
        comparison.a,
        format_sek(diff.a),
        comparison.b,
        format_sek(diff.b),
        comparison.a,
        format_sek(diff.absolute.abs()),
        format_percent(diff.percentage.abs() / 100.0)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculator::Calculator;
    use crate::input::CalculationInput;

    #[test]
    fn test_format_sek() {
        assert_eq!(format_sek(1_239_869.07), "1 239 869");
        assert_eq!(format_sek(999.5), "1 000");
        assert_eq!(format_sek(0.0), "0");
        assert_eq!(format_sek(-45_000.0), "-45 000");
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(0.045), "4,5 %");
        assert_eq!(format_percent(0.65), "65 %");
        assert_eq!(format_percent(0.019), "1,9 %");
    }

    #[test]
    fn test_contribution_summary() {
        let calc = Calculator::bundled().unwrap();
        let result = calc
            .calculate("ITP1", "standard", &CalculationInput::new(40, 50_000.0))
            .unwrap();
        let text = summary(&result);
        assert!(text.contains("ITP1 (standard)"));
        assert!(text.contains("under 25 år"));
        assert!(text.contains(&format_sek(result.monthly_pension)));

        let steps = explain(&result);
        assert!(steps.starts_with("Så här räknade jag:"));
        assert!(steps.contains("Pensionsålder 65"));
    }

    #[test]
    fn test_benefit_summary() {
        let calc = Calculator::bundled().unwrap();
        let input = CalculationInput::new(40, 50_000.0).with_years_of_service(32);
        let result = calc.calculate("PA16", "Avd2", &input).unwrap();
        let text = summary(&result);
        assert!(text.contains("32 500 kr/mån"));
        assert!(text.contains("65 % av slutlönen"));
    }

    #[test]
    fn test_missing_prompt() {
        let prompt = missing_fields_prompt(&[Field::Age, Field::MonthlySalary]);
        assert!(prompt.starts_with("Jag behöver följande information"));
        assert!(prompt.contains(Field::Age.label_sv()));
    }
}
