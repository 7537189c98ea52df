//! JSON request/response envelope shared by the CLI and the Lambda handler

use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::calculator::Calculator;
use crate::compare::{ComparisonResult, ScenarioRef};
use crate::error::{CalcError, ErrorResponse, Side};
use crate::explain;
use crate::extract;
use crate::input::{CalculationInput, Field};
use crate::result::CalculationResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationRequest {
    pub agreement: String,
    pub scenario: String,
    #[serde(flatten)]
    pub input: CalculationInput,
    /// Include the step-by-step explanation
    #[serde(default)]
    pub explain: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRequest {
    pub a: ScenarioRef,
    pub b: ScenarioRef,
    #[serde(flatten)]
    pub input: CalculationInput,
}

/// Free-text question plus whatever is already known about the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AskRequest {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agreement: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenario: Option<String>,
    #[serde(default)]
    pub profile: CalculationInput,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ApiRequest {
    Calculate(CalculationRequest),
    Compare(ComparisonRequest),
    Ask(AskRequest),
    Agreements,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ApiResponse {
    Calculation {
        agreement: String,
        scenario: String,
        result: Box<CalculationResult>,
        summary: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        explanation: Option<String>,
    },
    Comparison {
        comparison: Box<ComparisonResult>,
        summary: String,
    },
    /// Recoverable missing-parameter error: ask the user for these fields and resend
    NeedsInput {
        error_kind: String,
        missing_fields: Vec<Field>,
        prompt: String,
        input: CalculationInput,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        side: Option<Side>,
    },
    Agreements {
        agreements: BTreeMap<String, Vec<String>>,
    },
    Error(ErrorResponse),
}

impl ApiResponse {
    fn error(error_kind: &str, message: impl Into<String>) -> Self {
        ApiResponse::Error(ErrorResponse {
            error_kind: error_kind.to_string(),
            message: message.into(),
            missing_fields: None,
            side: None,
        })
    }

    fn needs_input(missing: &[Field], input: CalculationInput, side: Option<Side>) -> Self {
        ApiResponse::NeedsInput {
            error_kind: "missing_parameter".to_string(),
            prompt: explain::missing_fields_prompt(missing),
            missing_fields: missing.to_vec(),
            input,
            side,
        }
    }

    /// HTTP status for the response
    pub fn http_status(&self) -> u16 {
        match self {
            ApiResponse::NeedsInput { .. } => 422,
            ApiResponse::Error(e) => match e.error_kind.as_str() {
                "unknown_agreement" | "unknown_scenario" => 404,
                _ => 400,
            },
            _ => 200,
        }
    }
}

/// Parse and handle a raw JSON request body
pub fn handle_json(calculator: &Calculator, body: &[u8]) -> ApiResponse {
    match serde_json::from_slice::<ApiRequest>(body) {
        Ok(request) => handle(calculator, request),
        Err(e) => ApiResponse::error("invalid_request", format!("could not parse request: {e}")),
    }
}

pub fn handle(calculator: &Calculator, request: ApiRequest) -> ApiResponse {
    match request {
        ApiRequest::Calculate(req) => calculate(calculator, &req.agreement, &req.scenario, req.input, req.explain),
        ApiRequest::Compare(req) => compare(calculator, &req.a, &req.b, req.input),
        ApiRequest::Ask(req) => ask(calculator, req),
        ApiRequest::Agreements => agreements(calculator),
    }
}

fn calculate(calculator: &Calculator, agreement: &str, scenario: &str, input: CalculationInput, with_explanation: bool) -> ApiResponse {
    match calculator.calculate(agreement, scenario, &input) {
        Ok(result) => {
            let resolved_agreement = result.effective_parameters.agreement.clone();
            let resolved_scenario = result.effective_parameters.scenario.clone();
            ApiResponse::Calculation {
                agreement: resolved_agreement,
                scenario: resolved_scenario,
                summary: explain::summary(&result),
                explanation: with_explanation.then(|| explain::explain(&result)),
                result: Box::new(result),
            }
        }
        Err(CalcError::MissingParameter { missing }) => ApiResponse::needs_input(&missing, input, None),
        Err(e) => ApiResponse::Error(ErrorResponse::from(&e)),
    }
}

fn compare(calculator: &Calculator, a: &ScenarioRef, b: &ScenarioRef, input: CalculationInput) -> ApiResponse {
    match calculator.compare(a, b, &input) {
        Ok(comparison) => ApiResponse::Comparison {
            summary: explain::comparison_summary(&comparison),
            comparison: Box::new(comparison),
        },
        Err(e) => match e.source.missing_fields() {
            Some(missing) => ApiResponse::needs_input(missing, input, Some(e.side)),
            None => ApiResponse::Error(ErrorResponse::from(&e)),
        },
    }
}

/// Extract facts from the question, merge them over the known profile and calculate
///
/// The agreement must be named; a scenario may be omitted only when the
/// agreement has exactly one.
fn ask(calculator: &Calculator, req: AskRequest) -> ApiResponse {
    let extracted = extract::extract(&req.text);
    let input = req.profile.merged_with(&extracted.input);

    let Some(agreement) = req.agreement.or(extracted.agreement) else {
        return ApiResponse::error("missing_agreement", "no agreement named in the question");
    };

    let scenario = match req.scenario.or(extracted.scenario) {
        Some(scenario) => scenario,
        None => {
            let snapshot = calculator.store().snapshot();
            match snapshot.scenarios(&agreement) {
                None => return ApiResponse::Error(ErrorResponse::from(&CalcError::UnknownAgreement { agreement })),
                Some(scenarios) if scenarios.len() == 1 => scenarios[0].to_string(),
                Some(scenarios) => {
                    return ApiResponse::error(
                        "missing_scenario",
                        format!("{agreement} has several scenarios: {}", scenarios.join(", ")),
                    )
                }
            }
        }
    };

    info!("Question resolved to {agreement}/{scenario}");
    calculate(calculator, &agreement, &scenario, input, extract::is_explanation_request(&req.text))
}

fn agreements(calculator: &Calculator) -> ApiResponse {
    let snapshot = calculator.store().snapshot();
    let agreements = snapshot
        .agreements()
        .map(|a| {
            let scenarios = snapshot
                .scenarios(a)
                .unwrap_or_default()
                .into_iter()
                .map(str::to_string)
                .collect();
            (a.to_string(), scenarios)
        })
        .collect();
    ApiResponse::Agreements { agreements }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn calc() -> Calculator {
        Calculator::bundled().unwrap()
    }

    fn send(value: serde_json::Value) -> ApiResponse {
        handle_json(&calc(), value.to_string().as_bytes())
    }

    #[test]
    fn test_calculate_request() {
        let resp = send(json!({
            "action": "calculate",
            "agreement": "itp1",
            "scenario": "standard",
            "age": 40,
            "monthly_salary": 50000,
            "explain": true
        }));
        match resp {
            ApiResponse::Calculation { agreement, result, explanation, .. } => {
                assert_eq!(agreement, "ITP1");
                assert_eq!(result.years_to_retirement, 25);
                assert!(explanation.is_some());
            }
            other => panic!("unexpected response {other:?}"),
        }
    }

    #[test]
    fn test_missing_fields_become_prompt() {
        let resp = send(json!({
            "action": "calculate",
            "agreement": "PA16",
            "scenario": "Avd2",
            "monthly_salary": 50000
        }));
        assert_eq!(resp.http_status(), 422);

        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["status"], "needs_input");
        assert_eq!(json["error_kind"], "missing_parameter");
        assert_eq!(json["missing_fields"], json!(["age", "years_of_service"]));

        match resp {
            ApiResponse::NeedsInput { missing_fields, input, .. } => {
                assert_eq!(missing_fields, vec![Field::Age, Field::YearsOfService]);
                assert_eq!(input.monthly_salary, Some(50_000.0));
            }
            other => panic!("unexpected response {other:?}"),
        }
    }

    #[test]
    fn test_compare_missing_fields_name_side() {
        let resp = send(json!({
            "action": "compare",
            "a": {"agreement": "ITP1", "scenario": "standard"},
            "b": {"agreement": "PA16", "scenario": "Avd2"},
            "age": 40,
            "monthly_salary": 50000
        }));
        assert_eq!(resp.http_status(), 422);
        match resp {
            ApiResponse::NeedsInput { error_kind, missing_fields, side, .. } => {
                assert_eq!(error_kind, "missing_parameter");
                assert_eq!(missing_fields, vec![Field::YearsOfService]);
                assert_eq!(side, Some(Side::B));
            }
            other => panic!("unexpected response {other:?}"),
        }
    }

    #[test]
    fn test_error_statuses() {
        let unknown = send(json!({
            "action": "calculate", "agreement": "XYZ", "scenario": "s", "age": 40, "monthly_salary": 1
        }));
        assert_eq!(unknown.http_status(), 404);

        let invalid = send(json!({
            "action": "calculate", "agreement": "ITP1", "scenario": "standard", "age": 40, "monthly_salary": -1
        }));
        assert_eq!(invalid.http_status(), 400);

        let out_of_range = send(json!({
            "action": "calculate", "agreement": "PA16", "scenario": "Avd2", "age": 40, "monthly_salary": 50000,
            "start_work_year": -5
        }));
        match &out_of_range {
            ApiResponse::Error(e) => assert_eq!(e.error_kind, "invalid_input"),
            other => panic!("unexpected response {other:?}"),
        }
        assert_eq!(out_of_range.http_status(), 400);

        let garbage = handle_json(&calc(), b"{not json");
        match garbage {
            ApiResponse::Error(e) => assert_eq!(e.error_kind, "invalid_request"),
            other => panic!("unexpected response {other:?}"),
        }
    }

    #[test]
    fn test_compare_request() {
        let resp = send(json!({
            "action": "compare",
            "a": {"agreement": "ITP1", "scenario": "standard"},
            "b": {"agreement": "SAF-LO", "scenario": "standard"},
            "age": 40,
            "monthly_salary": 60000
        }));
        match resp {
            ApiResponse::Comparison { comparison, .. } => {
                assert!(comparison.differences.monthly_pension.absolute > 0.0);
            }
            other => panic!("unexpected response {other:?}"),
        }
    }

    #[test]
    fn test_ask_uses_profile_and_text() {
        let resp = send(json!({
            "action": "ask",
            "text": "Hur mycket får jag i PA16 avdelning 2? Jag har 32 tjänsteår.",
            "profile": {"age": 40, "monthly_salary": 50000}
        }));
        match resp {
            ApiResponse::Calculation { scenario, result, .. } => {
                assert_eq!(scenario, "Avd2");
                assert_eq!(result.monthly_pension, 32_500.0);
            }
            other => panic!("unexpected response {other:?}"),
        }
    }

    #[test]
    fn test_ask_needs_scenario_when_ambiguous() {
        let resp = send(json!({
            "action": "ask",
            "text": "Jag är 40 år och tjänar 30 000 kr i PA16"
        }));
        match resp {
            ApiResponse::Error(e) => assert_eq!(e.error_kind, "missing_scenario"),
            other => panic!("unexpected response {other:?}"),
        }

        let resp = send(json!({"action": "ask", "text": "Jag är 40 år och tjänar 30 000 kr i ITP1"}));
        assert!(matches!(resp, ApiResponse::Calculation { .. }));
    }

    #[test]
    fn test_agreements_listing() {
        match send(json!({"action": "agreements"})) {
            ApiResponse::Agreements { agreements } => {
                assert_eq!(agreements["PA16"], vec!["Avd1".to_string(), "Avd2".to_string()]);
            }
            other => panic!("unexpected response {other:?}"),
        }
    }
}
