//! Benefit-percentage brackets keyed on completed years of service

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Comparison operator in a years condition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YearsOp {
    Lt,
    Le,
    Eq,
    Ge,
    Gt,
}

impl YearsOp {
    fn symbol(&self) -> &'static str {
        match self {
            YearsOp::Lt => "<",
            YearsOp::Le => "<=",
            YearsOp::Eq => "=",
            YearsOp::Ge => ">=",
            YearsOp::Gt => ">",
        }
    }
}

/// Condition over completed years of service, e.g. `<=30` or `>30`
///
/// Accepts the ASCII forms `<`, `<=`, `=`, `>=`, `>`, the Unicode `≤`/`≥`,
/// and a bare number meaning equality. Always rendered in ASCII form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct YearsCondition {
    pub op: YearsOp,
    pub threshold: u32,
}

impl YearsCondition {
    pub fn new(op: YearsOp, threshold: u32) -> Self {
        Self { op, threshold }
    }

    pub fn matches(&self, years: u32) -> bool {
        match self.op {
            YearsOp::Lt => years < self.threshold,
            YearsOp::Le => years <= self.threshold,
            YearsOp::Eq => years == self.threshold,
            YearsOp::Ge => years >= self.threshold,
            YearsOp::Gt => years > self.threshold,
        }
    }
}

impl FromStr for YearsCondition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();

        // Longest prefixes first so "<=" is not read as "<"
        let prefixes: [(&str, YearsOp); 7] = [
            ("<=", YearsOp::Le),
            (">=", YearsOp::Ge),
            ("≤", YearsOp::Le),
            ("≥", YearsOp::Ge),
            ("<", YearsOp::Lt),
            (">", YearsOp::Gt),
            ("=", YearsOp::Eq),
        ];

        let (op, rest) = prefixes
            .iter()
            .find_map(|(prefix, op)| compact.strip_prefix(*prefix).map(|rest| (*op, rest)))
            .unwrap_or((YearsOp::Eq, compact.as_str()));

        let threshold = rest
            .parse::<u32>()
            .map_err(|_| format!("invalid years condition '{s}'"))?;

        Ok(Self { op, threshold })
    }
}

impl TryFrom<String> for YearsCondition {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<YearsCondition> for String {
    fn from(cond: YearsCondition) -> Self {
        cond.to_string()
    }
}

impl fmt::Display for YearsCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.op.symbol(), self.threshold)
    }
}

/// One bracket: benefit percent of final salary when the condition holds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BenefitLevel {
    #[serde(alias = "years")]
    pub years_condition: YearsCondition,
    /// Fraction of final annual salary (0.10 = 10%)
    pub percent: f64,
}

/// Ordered bracket table for a benefit-based scenario
#[derive(Debug, Clone, PartialEq)]
pub struct BenefitRules {
    levels: Vec<BenefitLevel>,
}

impl BenefitRules {
    pub fn new(levels: Vec<BenefitLevel>) -> Self {
        Self { levels }
    }

    pub fn levels(&self) -> &[BenefitLevel] {
        &self.levels
    }

    /// Matching level for the given years of service
    ///
    /// When several levels match, the one listed last wins.
    pub fn select(&self, years_of_service: u32) -> Option<&BenefitLevel> {
        self.levels
            .iter()
            .rev()
            .find(|level| level.years_condition.matches(years_of_service))
    }
}
