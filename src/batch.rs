//! CSV batch evaluation
//!
//! One calculation request per input row; rows are evaluated in parallel
//! against a shared calculator and written back in input order. A failing
//! row produces an error row, not a failed batch.

use log::info;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

use crate::calculator::Calculator;
use crate::input::CalculationInput;

/// Input row; empty cells are absent facts
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BatchRequest {
    pub agreement: String,
    pub scenario: String,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub monthly_salary: Option<f64>,
    #[serde(default)]
    pub retirement_age: Option<u32>,
    #[serde(default)]
    pub years_of_service: Option<u32>,
    #[serde(default)]
    pub start_work_year: Option<i32>,
    #[serde(default)]
    pub return_rate: Option<f64>,
    #[serde(default)]
    pub salary_exchange: Option<f64>,
    #[serde(default)]
    pub salary_exchange_premium: Option<f64>,
}

impl BatchRequest {
    pub fn input(&self) -> CalculationInput {
        CalculationInput {
            age: self.age,
            monthly_salary: self.monthly_salary,
            retirement_age: self.retirement_age,
            years_of_service: self.years_of_service,
            start_work_year: self.start_work_year,
            return_rate: self.return_rate,
            salary_exchange: self.salary_exchange,
            salary_exchange_premium: self.salary_exchange_premium,
        }
    }
}

/// Output row
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchResult {
    pub row: usize,
    pub agreement: String,
    pub scenario: String,
    pub status: String,
    pub error_kind: Option<String>,
    pub message: Option<String>,
    pub monthly_contribution: Option<f64>,
    pub total_capital: Option<f64>,
    pub monthly_pension: Option<f64>,
    pub annual_pension: Option<f64>,
    pub years_to_retirement: Option<i32>,
    pub warnings: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub rows: usize,
    pub succeeded: usize,
    pub failed: usize,
}

pub fn evaluate(calculator: &Calculator, row: usize, request: &BatchRequest) -> BatchResult {
    let base = BatchResult {
        row,
        agreement: request.agreement.clone(),
        scenario: request.scenario.clone(),
        ..Default::default()
    };
    match calculator.calculate(&request.agreement, &request.scenario, &request.input()) {
        Ok(result) => BatchResult {
            status: "ok".to_string(),
            monthly_contribution: Some(result.monthly_contribution),
            total_capital: Some(result.total_capital),
            monthly_pension: Some(result.monthly_pension),
            annual_pension: Some(result.annual_pension),
            years_to_retirement: Some(result.years_to_retirement),
            warnings: result.warnings.iter().map(|w| w.as_str()).collect::<Vec<_>>().join(";"),
            ..base
        },
        Err(err) => BatchResult {
            status: "error".to_string(),
            error_kind: Some(err.kind().to_string()),
            message: Some(err.to_string()),
            ..base
        },
    }
}

/// Read requests from `reader`, write one result row each to `writer`
///
/// Row numbers are 1-based data rows (header excluded).
pub fn run_batch<R: Read, W: Write>(calculator: &Calculator, reader: R, writer: W) -> Result<BatchSummary, csv::Error> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let requests: Vec<BatchRequest> = rdr.deserialize().collect::<Result<_, _>>()?;
    info!("Evaluating {} batch requests", requests.len());

    let results: Vec<BatchResult> = requests
        .par_iter()
        .enumerate()
        .map(|(i, request)| evaluate(calculator, i + 1, request))
        .collect();

    let mut wtr = csv::Writer::from_writer(writer);
    let mut summary = BatchSummary { rows: results.len(), ..Default::default() };
    for result in &results {
        if result.status == "ok" {
            summary.succeeded += 1;
        } else {
            summary.failed += 1;
        }
        wtr.serialize(result)?;
    }
    wtr.flush()?;

    info!(
        "Batch complete: {} rows, {} ok, {} failed",
        summary.rows, summary.succeeded, summary.failed
    );
    Ok(summary)
}
