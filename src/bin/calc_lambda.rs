//! AWS Lambda HTTP handler around the JSON API
//!
//! Environment:
//! - `PENSION_PARAMETERS`: parameter file path (bundled parameters when unset)
//! - `PENSION_POLICY`: calculation policy JSON path (defaults when unset)

use anyhow::Context;
use lambda_http::{run, service_fn, Body, Error, Request, Response};
use log::info;
use pension_calc::api;
use pension_calc::{CalculationPolicy, Calculator, ParameterStore};
use std::sync::Arc;

fn build_calculator() -> anyhow::Result<Calculator> {
    let store = match std::env::var("PENSION_PARAMETERS") {
        Ok(path) => ParameterStore::from_path(&path).with_context(|| format!("Failed to load parameters from {path}"))?,
        Err(_) => ParameterStore::bundled().context("Bundled parameters are invalid")?,
    };
    let policy = match std::env::var("PENSION_POLICY") {
        Ok(path) => CalculationPolicy::from_path(&path).with_context(|| format!("Failed to load policy from {path}"))?,
        Err(_) => CalculationPolicy::default(),
    };
    policy.validate()?;
    Ok(Calculator::new(Arc::new(store), policy))
}

fn handle_event(calculator: &Calculator, event: Request) -> Result<Response<Body>, Error> {
    let response = api::handle_json(calculator, event.body().as_ref());
    let body = serde_json::to_string(&response)?;
    Ok(Response::builder()
        .status(response.http_status())
        .header("content-type", "application/json")
        .body(Body::Text(body))?)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    env_logger::init();
    let calculator = Arc::new(build_calculator()?);
    info!(
        "Calculator ready with {} agreements",
        calculator.store().snapshot().agreements().count()
    );

    run(service_fn(move |event: Request| {
        let calculator = Arc::clone(&calculator);
        async move { handle_event(&calculator, event) }
    }))
    .await
}
