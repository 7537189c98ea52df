//! End-to-end properties of the calculator over a small fixed catalog

use approx::assert_relative_eq;
use pension_calc::input::{ServiceEdit, ServiceTimeline};
use pension_calc::result::Warning;
use pension_calc::{
    CalcError, CalculationInput, CalculationPolicy, Calculator, Field, ParameterSnapshot, ParameterStore,
    ScenarioRef,
};
use std::sync::Arc;
use std::thread;

const CATALOG: &str = r#"{
    "Alpha": {
        "default": {
            "type": "contribution_based",
            "contribution_rate_below_cap": 0.045,
            "contribution_rate_above_cap": 0.30,
            "income_cap_base_amount": 7.5,
            "income_base_amount": 74000,
            "default_return_rate": 0.019
        }
    },
    "Gamma": {
        "default": {
            "type": "contribution_based",
            "contribution_rate_below_cap": 0.06,
            "contribution_rate_above_cap": 0.06,
            "income_cap_base_amount": 7.5,
            "income_base_amount": 74000,
            "default_return_rate": 0.03,
            "default_retirement_age": 67
        }
    },
    "Beta": {
        "default": {
            "type": "benefit_based",
            "defined_benefit_levels": [
                {"years": "<=30", "percent": 0.10},
                {"years": ">30", "percent": 0.65}
            ]
        }
    }
}"#;

fn calculator() -> Calculator {
    let store = ParameterStore::new(ParameterSnapshot::from_json_str(CATALOG).unwrap());
    let policy = CalculationPolicy {
        current_year: Some(2024),
        ..Default::default()
    };
    Calculator::new(Arc::new(store), policy)
}

#[test]
fn zero_return_is_pure_accumulation() {
    let calc = calculator();
    for salary in [0.0, 12_345.5, 30_000.0, 46_250.0, 50_000.0, 123_456.78] {
        for age in [25, 40, 64] {
            let input = CalculationInput::new(age, salary).with_return_rate(0.0);
            let result = calc.calculate("Alpha", "default", &input).unwrap();
            let expected = result.annual_contribution.unwrap() * result.years_to_retirement as f64;
            assert_relative_eq!(result.total_capital, expected, max_relative = 1e-12, epsilon = 1e-9);
        }
    }
}

#[test]
fn years_to_retirement_is_difference_and_never_negative_pension() {
    let calc = calculator();
    for age in [30u32, 50, 65, 66, 70] {
        for retirement_age in [60u32, 65, 67] {
            let input = CalculationInput::new(age, 40_000.0)
                .with_retirement_age(retirement_age)
                .with_years_of_service(20);
            for agreement in ["Alpha", "Beta"] {
                let result = calc.calculate(agreement, "default", &input).unwrap();
                assert_eq!(result.years_to_retirement, retirement_age as i32 - age as i32);
                if retirement_age <= age {
                    assert_eq!(result.monthly_pension, 0.0);
                    assert!(result.has_warning(Warning::NoYearsToRetirement));
                } else {
                    assert!(result.monthly_pension > 0.0);
                }
            }
        }
    }
}

#[test]
fn service_years_round_trip() {
    for age in [20u32, 35, 50, 64] {
        for retirement_age in [65u32, 67] {
            let timeline = ServiceTimeline::new(age, retirement_age, 2024);
            for start in 1975..=timeline.retirement_year() {
                let years = timeline.years_of_service(start);
                assert_eq!(timeline.start_work_year(years), start);
            }
        }
    }

    let calc = calculator();
    let input = CalculationInput::new(45, 40_000.0);
    let edited = calc
        .edit_service("Beta", "default", &input, ServiceEdit::StartWorkYear(2000))
        .unwrap();
    let back = calc
        .edit_service("Beta", "default", &edited, ServiceEdit::YearsOfService(edited.years_of_service.unwrap()))
        .unwrap();
    assert_eq!(back.start_work_year, Some(2000));
}

#[test]
fn benefit_percent_changes_only_at_boundary() {
    let calc = calculator();
    let percents: Vec<f64> = (0..=45)
        .map(|years| {
            let input = CalculationInput::new(40, 50_000.0).with_years_of_service(years);
            calc.calculate("Beta", "default", &input)
                .unwrap()
                .effective_parameters
                .benefit_percent
                .unwrap()
        })
        .collect();

    for (years, pair) in percents.windows(2).enumerate() {
        if years + 1 == 31 {
            assert_eq!(pair, [0.10, 0.65]);
        } else {
            assert_eq!(pair[0], pair[1], "percent changed between {years} and {}", years + 1);
        }
    }
}

#[test]
fn comparison_is_antisymmetric() {
    let calc = calculator();
    let alpha = ScenarioRef::new("Alpha", "default");
    let gamma = ScenarioRef::new("Gamma", "default");
    for salary in [25_000.0, 46_250.0, 80_000.0] {
        let input = CalculationInput::new(38, salary);
        let ab = calc.compare(&alpha, &gamma, &input).unwrap();
        let ba = calc.compare(&gamma, &alpha, &input).unwrap();
        assert_relative_eq!(
            ab.differences.monthly_pension.absolute,
            -ba.differences.monthly_pension.absolute,
            max_relative = 1e-12
        );
        assert_eq!(ab.differences.years_to_retirement.absolute, -2.0);
        assert_eq!(ba.differences.years_to_retirement.absolute, 2.0);
        assert_relative_eq!(ab.differences.years_to_retirement.percentage, -2.0 / 29.0 * 100.0, max_relative = 1e-12);
    }
}

#[test]
fn missing_age_is_reported_not_defaulted() {
    let calc = calculator();
    let mut input = CalculationInput::new(40, 50_000.0).with_retirement_age(65);
    input.age = None;
    match calc.calculate("Alpha", "default", &input) {
        Err(CalcError::MissingParameter { missing }) => assert_eq!(missing, vec![Field::Age]),
        other => panic!("expected missing age, got {other:?}"),
    }
}

#[test]
fn out_of_range_personal_facts_are_invalid() {
    let calc = calculator();
    let cases = [
        ("Alpha", CalculationInput::new(u32::MAX, 50_000.0).with_retirement_age(65)),
        ("Alpha", CalculationInput::new(151, 50_000.0)),
        ("Alpha", CalculationInput::new(40, 50_000.0).with_retirement_age(3_000_000)),
        ("Beta", CalculationInput::new(40, 50_000.0).with_start_work_year(-5)),
        ("Beta", CalculationInput::new(40, 50_000.0).with_start_work_year(i32::MIN)),
        ("Beta", CalculationInput::new(40, 50_000.0).with_start_work_year(i32::MAX)),
    ];
    for (agreement, input) in cases {
        match calc.calculate(agreement, "default", &input) {
            Err(CalcError::InvalidInput { .. }) => {}
            other => panic!("{agreement} {input:?}: expected invalid input, got {other:?}"),
        }
    }
}

#[test]
fn alpha_golden_values() {
    let calc = calculator();
    let input = CalculationInput::new(40, 50_000.0).with_retirement_age(65);
    let result = calc.calculate("Alpha", "default", &input).unwrap();
    assert_eq!(result.years_to_retirement, 25);
    assert_eq!(result.effective_parameters.income_cap, Some(555_000.0));
    assert_relative_eq!(result.annual_contribution.unwrap(), 38_475.0, max_relative = 1e-12);
    assert_relative_eq!(result.total_capital, 1_239_869.0729499143, max_relative = 1e-9);
    assert_relative_eq!(result.monthly_pension, 5_166.121137291309, max_relative = 1e-9);
}

#[test]
fn beta_example_with_legacy_field_names() {
    let calc = calculator();
    let input = CalculationInput::new(40, 50_000.0).with_years_of_service(32);
    let result = calc.calculate("Beta", "default", &input).unwrap();
    assert_eq!(result.effective_parameters.benefit_percent, Some(0.65));
    assert_relative_eq!(result.annual_pension, 390_000.0, max_relative = 1e-12);
    assert_relative_eq!(result.monthly_pension, 32_500.0, max_relative = 1e-12);
}

#[test]
fn refresh_is_atomic_for_readers() {
    let old = CATALOG.to_string();
    let new = CATALOG.replace("\"default_return_rate\": 0.019", "\"default_return_rate\": 0.0");
    let store = Arc::new(ParameterStore::new(ParameterSnapshot::from_json_str(&old).unwrap()));
    let calc = Arc::new(Calculator::new(store.clone(), CalculationPolicy::default()));
    let input = CalculationInput::new(40, 50_000.0).with_retirement_age(65);

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let calc = Arc::clone(&calc);
            let input = input.clone();
            thread::spawn(move || {
                (0..200)
                    .map(|_| calc.calculate("Alpha", "default", &input).unwrap().total_capital)
                    .collect::<Vec<f64>>()
            })
        })
        .collect();

    for i in 0..50 {
        let json = if i % 2 == 0 { &new } else { &old };
        store.refresh(ParameterSnapshot::from_json_str(json).unwrap());
    }

    for reader in readers {
        for capital in reader.join().unwrap() {
            let grown = (capital - 1_239_869.0729499143).abs() < 1e-6;
            let flat = (capital - 38_475.0 * 25.0).abs() < 1e-6;
            assert!(grown || flat, "mixed snapshot produced {capital}");
        }
    }
}
