//! Best-effort parameter extraction from Swedish free text
//!
//! Pulls the calculation facts a user states in a question ("jag är 45 år
//! och tjänar 35 000 kr") into a partial `CalculationInput`. Anything not
//! recognised is left unset; the calculator reports what is still missing.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::ops::Range;

use crate::calculator;
use crate::input::{CalculationInput, Field};
use crate::params::SchemeKind;

const AMOUNT: &str = r"(\d{1,3}(?:[ \u{a0}]\d{3})+|\d+)";

static SALARY_EXCHANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?i)löneväxl\w*\s+(?:med\s+|bort\s+)?{AMOUNT}\s*(?:kr|kronor|sek)?")).unwrap()
});

static SALARY: Lazy<Regex> = Lazy::new(|| Regex::new(&format!(r"(?i){AMOUNT}\s*(?:kr|kronor|sek)\b")).unwrap());

static RETIREMENT_AGE: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)vid\s+(\d{2})\s*års?\s+(?:ålder\s+)?pension").unwrap(),
        Regex::new(r"(?i)pension(?:era\s+mig|eras?)?\s+(?:vid|som)\s+(\d{2})").unwrap(),
        Regex::new(r"(?i)pensionsålder(?:n)?\s+(?:på\s+|är\s+)?(\d{2})").unwrap(),
        Regex::new(r"(?i)gå\s+i\s+pension\s+(?:vid|som)\s+(\d{2})").unwrap(),
    ]
});

static YEARS_OF_SERVICE: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)(\d{1,2})\s*(?:tjänsteår|års?\s+tjänstetid|år\s+i\s+tjänst)").unwrap(),
        Regex::new(r"(?i)(?:jobbat|arbetat|varit\s+anställd)\s+(?:i\s+)?(\d{1,2})\s*år").unwrap(),
        Regex::new(r"(?i)tjänstetid\s+(?:på\s+|är\s+)?(\d{1,2})\s*år").unwrap(),
    ]
});

static START_WORK_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:började|startade|anställd|anställdes)\D{0,30}?((?:19|20)\d{2})").unwrap());

static RETURN_RATE: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)avkastning\w*\s+(?:på\s+|om\s+)?(\d+(?:[.,]\d+)?)\s*(?:%|procent)").unwrap(),
        Regex::new(r"(?i)(\d+(?:[.,]\d+)?)\s*(?:%|procent)\s+(?:i\s+)?(?:årlig\s+|per\s+år\s+i\s+)?avkastning").unwrap(),
    ]
});

static AGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b(\d{2})\s*år\b").unwrap());

static SCENARIO: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bavd(?:elning)?[\s\.]?(1|2)\b").unwrap());

static AGREEMENTS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    vec![
        (Regex::new(r"(?i)\bitp\s?-?1\b").unwrap(), "ITP1"),
        (Regex::new(r"(?i)\bitp\s?-?2\b").unwrap(), "ITP2"),
        (Regex::new(r"(?i)\bsaf[\s-]?lo\b").unwrap(), "SAF-LO"),
        (Regex::new(r"(?i)\bpa\s?-?16\b").unwrap(), "PA16"),
        (Regex::new(r"(?i)\bakap[\s-]?kr\b").unwrap(), "AKAP-KR"),
        (Regex::new(r"(?i)\bakap[\s-]?kl\b").unwrap(), "AKAP-KL"),
        (Regex::new(r"(?i)\bkap[\s-]?kl\b").unwrap(), "KAP-KL"),
        (Regex::new(r"(?i)\bpa[\s-]?kfs\b").unwrap(), "PA-KFS"),
    ]
});

static CALCULATION_QUERY: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)hur\s+mycket").unwrap(),
        Regex::new(r"(?i)vad\s+får\s+jag").unwrap(),
        Regex::new(r"(?i)beräkna").unwrap(),
        Regex::new(r"(?i)räkna\s+ut").unwrap(),
        Regex::new(r"(?i)min\s+månadslön").unwrap(),
        Regex::new(r"(?i)jag\s+tjänar").unwrap(),
    ]
});

static EXPLANATION_REQUEST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)hur\s+räknade\s+du|hur\s+kom\s+du\s+fram|visa\s+beräkning(?:en)?|förklara\s+beräkningen").unwrap()
});

/// Facts found in a question; any part may be absent
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedQuery {
    pub agreement: Option<String>,
    pub scenario: Option<String>,
    pub input: CalculationInput,
}

impl ExtractedQuery {
    /// Gap list for a scenario of `kind` given what was extracted
    pub fn missing_fields(&self, kind: SchemeKind) -> Vec<Field> {
        calculator::missing_fields(kind, &self.input)
    }
}

/// Does the text ask for a pension figure?
pub fn is_calculation_query(text: &str) -> bool {
    CALCULATION_QUERY.iter().any(|re| re.is_match(text))
}

/// Does the text ask how the previous figure was reached?
pub fn is_explanation_request(text: &str) -> bool {
    EXPLANATION_REQUEST.is_match(text)
}

fn parse_amount(digits: &str) -> Option<f64> {
    digits
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect::<String>()
        .parse()
        .ok()
}

fn parse_rate(text: &str) -> Option<f64> {
    text.replace(',', ".").parse::<f64>().ok().map(|pct| pct / 100.0)
}

fn overlaps(span: &Range<usize>, taken: &[Range<usize>]) -> bool {
    taken.iter().any(|t| span.start < t.end && t.start < span.end)
}

/// First capture of the first matching pattern, with the whole match span
fn first_capture<'t>(patterns: &[Regex], text: &'t str) -> Option<(Captures<'t>, Range<usize>)> {
    patterns.iter().find_map(|re| {
        re.captures(text).and_then(|caps| {
            let span = caps.get(0)?.range();
            Some((caps, span))
        })
    })
}

/// Extract what can be recognised from `text`
///
/// Phrases claimed by a more specific fact (service years, retirement age,
/// salary exchange) are not reused for age or salary.
pub fn extract(text: &str) -> ExtractedQuery {
    let mut query = ExtractedQuery::default();
    let mut taken: Vec<Range<usize>> = Vec::new();

    if let Some((caps, span)) = first_capture(&YEARS_OF_SERVICE, text) {
        query.input.years_of_service = caps[1].parse().ok();
        taken.push(span);
    }

    if let Some(caps) = START_WORK_YEAR.captures(text) {
        query.input.start_work_year = caps[1].parse().ok();
        if let Some(m) = caps.get(0) {
            taken.push(m.range());
        }
    }

    if let Some((caps, span)) = first_capture(&RETIREMENT_AGE, text) {
        query.input.retirement_age = caps[1].parse().ok();
        taken.push(span);
    }

    if let Some((caps, span)) = first_capture(&RETURN_RATE, text) {
        query.input.return_rate = parse_rate(&caps[1]);
        taken.push(span);
    }

    if let Some(caps) = SALARY_EXCHANGE.captures(text) {
        query.input.salary_exchange = parse_amount(&caps[1]);
        if let Some(m) = caps.get(0) {
            taken.push(m.range());
        }
    }

    query.input.monthly_salary = SALARY
        .captures_iter(text)
        .filter(|caps| caps.get(0).is_some_and(|m| !overlaps(&m.range(), &taken)))
        .find_map(|caps| parse_amount(&caps[1]));

    query.input.age = AGE
        .captures_iter(text)
        .filter(|caps| caps.get(0).is_some_and(|m| !overlaps(&m.range(), &taken)))
        .find_map(|caps| caps[1].parse().ok());

    query.scenario = SCENARIO.captures(text).map(|caps| format!("Avd{}", &caps[1]));

    query.agreement = AGREEMENTS
        .iter()
        .find(|(re, _)| re.is_match(text))
        .map(|(_, name)| name.to_string());

    query
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_question() {
        let q = extract("Jag är 45 år och tjänar 35 000 kr i månaden. Hur mycket får jag i ITP1 vid 67 års pension?");
        assert_eq!(q.input.age, Some(45));
        assert_eq!(q.input.monthly_salary, Some(35_000.0));
        assert_eq!(q.input.retirement_age, Some(67));
        assert_eq!(q.agreement.as_deref(), Some("ITP1"));
        assert!(q.missing_fields(SchemeKind::ContributionBased).is_empty());
    }

    #[test]
    fn test_service_years_not_taken_as_age() {
        let q = extract("PA16 avdelning 2, jag har 32 års tjänstetid och är 58 år, lön 42000 kronor");
        assert_eq!(q.input.years_of_service, Some(32));
        assert_eq!(q.input.age, Some(58));
        assert_eq!(q.input.monthly_salary, Some(42_000.0));
        assert_eq!(q.scenario.as_deref(), Some("Avd2"));
        assert_eq!(q.agreement.as_deref(), Some("PA16"));
    }

    #[test]
    fn test_salary_exchange_not_taken_as_salary() {
        let q = extract("Jag löneväxlar 2 000 kr och tjänar 50 000 kr, SAF-LO");
        assert_eq!(q.input.salary_exchange, Some(2_000.0));
        assert_eq!(q.input.monthly_salary, Some(50_000.0));
        assert_eq!(q.agreement.as_deref(), Some("SAF-LO"));
        assert_eq!(q.missing_fields(SchemeKind::ContributionBased), vec![Field::Age, Field::SalaryExchangePremium]);
    }

    #[test]
    fn test_start_year_and_return() {
        let q = extract("Jag började 1998 och räknar med 4,5 % avkastning");
        assert_eq!(q.input.start_work_year, Some(1998));
        assert_eq!(q.input.return_rate, Some(0.045));
        assert!(q.input.age.is_none());
    }

    #[test]
    fn test_gap_list_for_empty_text() {
        let q = extract("Hur mycket pension får jag?");
        assert_eq!(q, ExtractedQuery::default());
        assert_eq!(
            q.missing_fields(SchemeKind::BenefitBased),
            vec![Field::Age, Field::MonthlySalary, Field::YearsOfService]
        );
    }

    #[test]
    fn test_intents() {
        assert!(is_calculation_query("Kan du räkna ut min pension?"));
        assert!(!is_calculation_query("Vad är ett inkomstbasbelopp?"));
        assert!(is_explanation_request("Hur räknade du?"));
        assert!(!is_explanation_request("Hur mycket får jag?"));
    }
}
