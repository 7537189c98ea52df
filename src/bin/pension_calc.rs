//! Command line front end: calculate, compare, ask, batch, agreements

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use pension_calc::api::{self, ApiRequest, ApiResponse, AskRequest};
use pension_calc::explain;
use pension_calc::history::{HistorySink, JsonlHistory};
use pension_calc::projection::AccumulationYear;
use pension_calc::result::ProjectionDetail;
use pension_calc::{
    batch, CalculationInput, CalculationPolicy, CalculationResult, Calculator, CompoundingConvention,
    ParameterStore, ScenarioRef,
};
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "pension_calc", about = "Occupational pension calculator for Swedish collective agreements")]
struct Cli {
    /// Parameter file (agreement -> scenario -> record); bundled parameters when omitted
    #[arg(long, global = true)]
    params: Option<PathBuf>,

    /// Calculation policy JSON file
    #[arg(long, global = true)]
    policy: Option<PathBuf>,

    #[arg(long, global = true)]
    payout_years: Option<u32>,

    #[arg(long, global = true, value_enum)]
    compounding: Option<Compounding>,

    /// Deduct each scenario's admin fee from the growth rate
    #[arg(long, global = true)]
    deduct_admin_fee: bool,

    /// Pin the current year
    #[arg(long, global = true)]
    current_year: Option<i32>,

    /// Append every calculation to this JSON-lines file
    #[arg(long, global = true)]
    history: Option<PathBuf>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum Compounding {
    ContributeThenGrow,
    CohortDiscounting,
}

impl From<Compounding> for CompoundingConvention {
    fn from(value: Compounding) -> Self {
        match value {
            Compounding::ContributeThenGrow => CompoundingConvention::ContributeThenGrow,
            Compounding::CohortDiscounting => CompoundingConvention::CohortDiscounting,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// List agreements and their scenarios
    Agreements,
    /// Calculate one scenario
    Calculate {
        #[arg(long)]
        agreement: String,
        #[arg(long)]
        scenario: String,
        #[command(flatten)]
        person: PersonArgs,
        /// Show the step-by-step explanation
        #[arg(long)]
        explain: bool,
        /// Print the year-by-year accumulation schedule
        #[arg(long)]
        schedule: bool,
    },
    /// Compare two scenarios for the same person
    Compare {
        #[arg(long)]
        agreement_a: String,
        #[arg(long)]
        scenario_a: String,
        #[arg(long)]
        agreement_b: String,
        #[arg(long)]
        scenario_b: String,
        #[command(flatten)]
        person: PersonArgs,
    },
    /// Answer a Swedish free-text question
    Ask {
        text: String,
        #[arg(long)]
        agreement: Option<String>,
        #[arg(long)]
        scenario: Option<String>,
        #[command(flatten)]
        person: PersonArgs,
    },
    /// Evaluate a CSV of requests in parallel
    Batch {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
    },
}

#[derive(Args)]
struct PersonArgs {
    #[arg(long)]
    age: Option<u32>,
    /// Gross monthly salary (SEK)
    #[arg(long)]
    salary: Option<f64>,
    #[arg(long)]
    retirement_age: Option<u32>,
    #[arg(long)]
    years_of_service: Option<u32>,
    #[arg(long)]
    start_work_year: Option<i32>,
    /// Annual return as a fraction (0.03 = 3%)
    #[arg(long)]
    return_rate: Option<f64>,
    /// Monthly salary exchanged into pension (SEK)
    #[arg(long)]
    salary_exchange: Option<f64>,
    /// Percent of the exchanged amount paid in (e.g. 105.8)
    #[arg(long)]
    salary_exchange_premium: Option<f64>,
}

impl PersonArgs {
    fn input(&self) -> CalculationInput {
        CalculationInput {
            age: self.age,
            monthly_salary: self.salary,
            retirement_age: self.retirement_age,
            years_of_service: self.years_of_service,
            start_work_year: self.start_work_year,
            return_rate: self.return_rate,
            salary_exchange: self.salary_exchange,
            salary_exchange_premium: self.salary_exchange_premium,
        }
    }
}

fn build_policy(cli: &Cli) -> Result<CalculationPolicy> {
    let mut policy = match &cli.policy {
        Some(path) => CalculationPolicy::from_path(path)
            .with_context(|| format!("Failed to load policy from {}", path.display()))?,
        None => CalculationPolicy::default(),
    };
    if let Some(years) = cli.payout_years {
        policy.payout_years = years;
    }
    if let Some(compounding) = cli.compounding {
        policy.compounding = compounding.into();
    }
    if cli.deduct_admin_fee {
        policy.deduct_admin_fee = true;
    }
    if cli.current_year.is_some() {
        policy.current_year = cli.current_year;
    }
    policy.validate()?;
    Ok(policy)
}

fn build_calculator(cli: &Cli) -> Result<(Calculator, Option<Arc<JsonlHistory>>)> {
    let store = match &cli.params {
        Some(path) => ParameterStore::from_path(path)
            .with_context(|| format!("Failed to load parameters from {}", path.display()))?,
        None => ParameterStore::bundled().context("Bundled parameters are invalid")?,
    };
    let mut calculator = Calculator::new(Arc::new(store), build_policy(cli)?);

    let history = match &cli.history {
        Some(path) => {
            let sink = Arc::new(
                JsonlHistory::open(path).with_context(|| format!("Failed to open history file {}", path.display()))?,
            );
            calculator = calculator.with_history(sink.clone() as Arc<dyn HistorySink>);
            Some(sink)
        }
        None => None,
    };
    Ok((calculator, history))
}

fn print_result(result: &CalculationResult, explanation: bool, schedule: bool) {
    println!("{}", explain::summary(result));
    println!();
    println!("  Monthly contribution: {:>12} kr", explain::format_sek(result.monthly_contribution));
    println!("  Total capital:        {:>12} kr", explain::format_sek(result.total_capital));
    println!("  Monthly pension:      {:>12} kr", explain::format_sek(result.monthly_pension));
    println!("  Years to retirement:  {:>12}", result.years_to_retirement);
    for line in explain::assumptions(result) {
        println!("  - {line}");
    }
    if explanation {
        println!();
        print!("{}", explain::explain(result));
    }
    if schedule {
        if let ProjectionDetail::ContributionBased(p) = &result.detail {
            print_schedule(&p.schedule);
        }
    }
}

fn print_schedule(schedule: &[AccumulationYear]) {
    println!();
    println!("{:<6} {:<5} {:>14} {:>12} {:>12} {:>14}", "Year", "Age", "Opening", "Contrib", "Growth", "Closing");
    for row in schedule {
        println!(
            "{:<6} {:<5} {:>14.2} {:>12.2} {:>12.2} {:>14.2}",
            row.year, row.age, row.opening_capital, row.contribution, row.growth, row.closing_capital
        );
    }
}

/// Print an API response; returns false for errors
fn print_response(response: &ApiResponse, json: bool, explanation: bool, schedule: bool) -> Result<bool> {
    if json {
        println!("{}", serde_json::to_string_pretty(response)?);
        return Ok(!matches!(response, ApiResponse::Error(_)));
    }
    match response {
        ApiResponse::Calculation { result, explanation: text, .. } => {
            print_result(result, explanation && text.is_none(), schedule);
            if let Some(text) = text {
                println!();
                print!("{text}");
            }
        }
        ApiResponse::Comparison { comparison, summary } => {
            println!("{summary}");
            let d = &comparison.differences;
            println!();
            println!("{:<22} {:>14} {:>14} {:>14} {:>9}", "", comparison.a.to_string(), comparison.b.to_string(), "A - B", "%");
            for (label, m) in [
                ("Monthly pension", d.monthly_pension),
                ("Total capital", d.total_capital),
                ("Monthly contribution", d.monthly_contribution),
            ] {
                println!(
                    "{:<22} {:>14} {:>14} {:>14} {:>8.1}%",
                    label,
                    explain::format_sek(m.a),
                    explain::format_sek(m.b),
                    explain::format_sek(m.absolute),
                    m.percentage
                );
            }
            let years = d.years_to_retirement;
            println!(
                "{:<22} {:>14} {:>14} {:>14} {:>8.1}%",
                "Years to retirement", years.a, years.b, years.absolute, years.percentage
            );
        }
        ApiResponse::NeedsInput { prompt, .. } => println!("{prompt}"),
        ApiResponse::Agreements { agreements } => {
            for (agreement, scenarios) in agreements {
                println!("{agreement}: {}", scenarios.join(", "));
            }
        }
        ApiResponse::Error(e) => {
            eprintln!("Error ({}): {}", e.error_kind, e.message);
            return Ok(false);
        }
    }
    Ok(true)
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let (calculator, history) = build_calculator(&cli)?;

    let ok = match &cli.command {
        Command::Agreements => print_response(&api::handle(&calculator, ApiRequest::Agreements), cli.json, false, false)?,
        Command::Calculate { agreement, scenario, person, explain, schedule } => {
            let request = ApiRequest::Calculate(api::CalculationRequest {
                agreement: agreement.clone(),
                scenario: scenario.clone(),
                input: person.input(),
                explain: *explain,
            });
            print_response(&api::handle(&calculator, request), cli.json, *explain, *schedule)?
        }
        Command::Compare { agreement_a, scenario_a, agreement_b, scenario_b, person } => {
            let request = ApiRequest::Compare(api::ComparisonRequest {
                a: ScenarioRef::new(agreement_a.as_str(), scenario_a.as_str()),
                b: ScenarioRef::new(agreement_b.as_str(), scenario_b.as_str()),
                input: person.input(),
            });
            print_response(&api::handle(&calculator, request), cli.json, false, false)?
        }
        Command::Ask { text, agreement, scenario, person } => {
            let request = ApiRequest::Ask(AskRequest {
                text: text.clone(),
                agreement: agreement.clone(),
                scenario: scenario.clone(),
                profile: person.input(),
            });
            print_response(&api::handle(&calculator, request), cli.json, false, false)?
        }
        Command::Batch { input, output } => {
            let start = Instant::now();
            let reader = File::open(input).with_context(|| format!("Failed to open {}", input.display()))?;
            let writer = BufWriter::new(
                File::create(output).with_context(|| format!("Failed to create {}", output.display()))?,
            );
            let summary = batch::run_batch(&calculator, reader, writer)?;
            println!(
                "{} rows ({} ok, {} failed) written to {} in {:?}",
                summary.rows,
                summary.succeeded,
                summary.failed,
                output.display(),
                start.elapsed()
            );
            true
        }
    };

    if let Some(history) = history {
        history.close();
    }
    if !ok {
        bail!("calculation failed");
    }
    Ok(())
}
