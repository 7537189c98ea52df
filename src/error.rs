//! Error taxonomy for parameter resolution, calculation and comparison

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::input::Field;

/// Errors raised by a single calculation request
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalcError {
    /// Agreement is not present in the parameter store
    #[error("unknown agreement '{agreement}'")]
    UnknownAgreement { agreement: String },

    /// Agreement exists but has no such scenario
    #[error("unknown scenario '{scenario}' for agreement '{agreement}'")]
    UnknownScenario { agreement: String, scenario: String },

    /// Required personal facts are absent; the caller should ask for them and retry
    #[error("missing required fields: {}", join_fields(.missing))]
    MissingParameter { missing: Vec<Field> },

    /// Input is present but unusable
    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },
}

fn join_fields(fields: &[Field]) -> String {
    fields.iter().map(|f| f.as_str()).collect::<Vec<_>>().join(", ")
}

impl CalcError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        CalcError::InvalidInput { reason: reason.into() }
    }

    /// Stable snake_case identifier used in wire error objects
    pub fn kind(&self) -> &'static str {
        match self {
            CalcError::UnknownAgreement { .. } => "unknown_agreement",
            CalcError::UnknownScenario { .. } => "unknown_scenario",
            CalcError::MissingParameter { .. } => "missing_parameter",
            CalcError::InvalidInput { .. } => "invalid_input",
        }
    }

    /// Only missing parameters are worth re-prompting for
    pub fn is_recoverable(&self) -> bool {
        matches!(self, CalcError::MissingParameter { .. })
    }

    pub fn missing_fields(&self) -> Option<&[Field]> {
        match self {
            CalcError::MissingParameter { missing } => Some(missing),
            _ => None,
        }
    }
}

/// Which side of a comparison a result or failure belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    A,
    B,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::A => write!(f, "A"),
            Side::B => write!(f, "B"),
        }
    }
}

/// A comparison fails as a whole when either calculation fails
#[derive(Debug, Clone, PartialEq, Error)]
#[error("comparison side {side} failed: {source}")]
pub struct ComparisonError {
    pub side: Side,
    #[source]
    pub source: CalcError,
}

/// Errors loading parameters, policy or history files
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid parameters for {agreement}/{scenario}: {reason}")]
    InvalidScenario {
        agreement: String,
        scenario: String,
        reason: String,
    },

    #[error("invalid calculation policy: {0}")]
    InvalidPolicy(String),
}

/// Serialisable error object returned to front ends
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error_kind: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing_fields: Option<Vec<Field>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub side: Option<Side>,
}

impl From<&CalcError> for ErrorResponse {
    fn from(err: &CalcError) -> Self {
        Self {
            error_kind: err.kind().to_string(),
            message: err.to_string(),
            missing_fields: err.missing_fields().map(|m| m.to_vec()),
            side: None,
        }
    }
}

impl From<&ComparisonError> for ErrorResponse {
    fn from(err: &ComparisonError) -> Self {
        Self {
            side: Some(err.side),
            message: err.to_string(),
            ..ErrorResponse::from(&err.source)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_parameter_message() {
        let err = CalcError::MissingParameter {
            missing: vec![Field::Age, Field::MonthlySalary],
        };
        assert_eq!(err.to_string(), "missing required fields: age, monthly_salary");
        assert_eq!(err.kind(), "missing_parameter");
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_error_response_from_comparison() {
        let err = ComparisonError {
            side: Side::B,
            source: CalcError::MissingParameter { missing: vec![Field::YearsOfService] },
        };
        let resp = ErrorResponse::from(&err);
        assert_eq!(resp.error_kind, "missing_parameter");
        assert_eq!(resp.side, Some(Side::B));
        assert_eq!(resp.missing_fields, Some(vec![Field::YearsOfService]));

        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["side"], "b");
        assert_eq!(json["missing_fields"][0], "years_of_service");
    }

    #[test]
    fn test_unknown_agreement_is_not_recoverable() {
        let err = CalcError::UnknownAgreement { agreement: "XYZ".into() };
        assert!(!err.is_recoverable());
        let resp = ErrorResponse::from(&err);
        assert!(resp.missing_fields.is_none());
        let json = serde_json::to_value(&resp).unwrap();
        assert!(json.get("missing_fields").is_none());
    }
}
