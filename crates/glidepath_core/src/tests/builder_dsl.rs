//! Tests for the builder DSL

use crate::config::{PersonBuilder, SimulationBuilder};
use crate::error::ConfigError;
use crate::model::{
    FilingStatus, GuardrailConfig, MarketAssumptions, PolicyTables, WithdrawalTiming,
};
use crate::simulation::{SimulationContext, simulate};

#[test]
fn test_defaults() {
    let params = SimulationBuilder::new()
        .primary(PersonBuilder::new(60))
        .living_expenses(40_000.0)
        .build()
        .unwrap();

    assert_eq!(params.as_of, jiff::civil::date(2025, 1, 1));
    assert_eq!(params.policy_year, 2024);
    assert_eq!(params.filing_status, FilingStatus::Single);
    assert_eq!(params.primary.retirement_age, 65);
    assert_eq!(params.primary.life_expectancy, 90);
    assert!(!params.use_guardrails);
    assert_eq!(params.withdrawal_timing, WithdrawalTiming::default());
    assert_eq!(params.seed, None);
}

#[test]
fn test_spouse_defaults_to_joint_filing() {
    let params = SimulationBuilder::new()
        .primary(PersonBuilder::new(60))
        .spouse(PersonBuilder::new(58))
        .build()
        .unwrap();
    assert_eq!(params.filing_status, FilingStatus::MarriedFilingJointly);

    let params = SimulationBuilder::new()
        .primary(PersonBuilder::new(60))
        .spouse(PersonBuilder::new(58))
        .filing_status(FilingStatus::Single)
        .build()
        .unwrap();
    assert_eq!(params.filing_status, FilingStatus::Single);
}

#[test]
fn test_missing_primary_is_rejected() {
    let err = SimulationBuilder::new().living_expenses(1.0).build().unwrap_err();
    assert!(matches!(
        err,
        ConfigError::InvalidValue {
            field: "primary",
            ..
        }
    ));
}

#[test]
fn test_birth_date_overrides_current_age() {
    let params = SimulationBuilder::new()
        .as_of_date(jiff::civil::date(2030, 3, 1))
        .primary(PersonBuilder::new(1).birth_date(1970, 6, 15).life_expectancy(80))
        .build()
        .unwrap();
    assert_eq!(params.primary.age_as_of(params.as_of), 59);
    assert_eq!(params.horizon_years().unwrap(), 21);
}

#[test]
fn test_guardrail_config_is_validated() {
    let tuned = GuardrailConfig {
        cut: 0.15,
        preservation_sunset_years: 10,
        ..GuardrailConfig::default()
    };
    let params = SimulationBuilder::new()
        .primary(PersonBuilder::new(65))
        .guardrails(true)
        .guardrail_config(tuned)
        .build()
        .unwrap();
    assert_eq!(params.guardrails, tuned);

    let err = SimulationBuilder::new()
        .primary(PersonBuilder::new(65))
        .guardrail_config(GuardrailConfig {
            raise: 1.5,
            ..GuardrailConfig::default()
        })
        .build()
        .unwrap_err();
    assert!(matches!(
        err,
        ConfigError::InvalidValue {
            field: "guardrails.raise",
            ..
        }
    ));
}

#[test]
fn test_one_time_expense_lands_in_its_year() {
    let params = SimulationBuilder::new()
        .primary(PersonBuilder::new(65).retire_at(65).life_expectancy(70))
        .assets(0.0, 500_000.0, 0.0, 0.0, 0.0)
        .market(MarketAssumptions::single_portfolio(0.0, 0.0))
        .inflation(0.0)
        .living_expenses(20_000.0)
        .one_time_expense(67, 15_000.0)
        .build()
        .unwrap();
    let tables = PolicyTables::default();
    let ctx = SimulationContext::new(&params, &tables).unwrap();
    let result = simulate(&ctx, 3).unwrap();

    for record in &result.yearly {
        let expected = if record.primary_age == 67 { 15_000.0 } else { 0.0 };
        assert_eq!(record.one_time, expected, "age {}", record.primary_age);
    }
}
