//! End-to-end household scenarios
//!
//! Full batches through the pool with realistic inputs. Bounds here are
//! loose on purpose: they pin behavior, not exact Monte Carlo estimates.

use crate::config::{PersonBuilder, SimulationBuilder};
use crate::model::{
    AggregateResult, LtcAssumptions, Phase, PolicyTables, RunMode, SimulationParams,
};
use crate::pool::{ExecutionPool, MonteCarloProgress, MonteCarloRequest, run_monte_carlo};
use crate::simulation::{SimulationContext, simulate};

/// 50 year old retiring at 65, planning to 85, $1M across three buckets,
/// 7% / 12% returns, $50k living expenses and a $20k pension from 65
fn example_household(living: f64) -> SimulationParams {
    SimulationBuilder::new()
        .as_of(2025, 1, 1)
        .primary(
            PersonBuilder::new(50)
                .retire_at(65)
                .life_expectancy(85)
                .pension(20_000.0, 65),
        )
        .assets(700_000.0, 200_000.0, 100_000.0, 60_000.0, 0.0)
        .single_portfolio(0.07, 0.12)
        .living_expenses(living)
        .inflation(0.025)
        .guardrails(false)
        .build()
        .unwrap()
}

fn run(params: &SimulationParams, trials: usize, mode: RunMode, seed: u64) -> AggregateResult {
    let pool = ExecutionPool::new(0).unwrap();
    let request = MonteCarloRequest {
        trials,
        mode,
        seed: Some(seed),
        timeout: None,
    };
    run_monte_carlo(
        params,
        &PolicyTables::default(),
        &request,
        &pool,
        &MonteCarloProgress::new(),
    )
    .unwrap()
}

// ============================================================================
// Reference household
// ============================================================================

#[test]
fn test_example_household_success_is_uncertain() {
    let params = example_household(50_000.0);
    let result = run(&params, 1000, RunMode::Score, 20_250_101);

    assert_eq!(result.completed, 1000);
    assert_eq!(result.dropped.total(), 0);
    assert!(
        result.success_probability > 0.0 && result.success_probability < 1.0,
        "success probability {}",
        result.success_probability
    );
    assert!(result.percentile_10 <= result.median_ending_balance);
    assert!(result.median_ending_balance <= result.percentile_90);
}

#[test]
fn test_example_household_median_beats_risk_free_floor() {
    let params = example_household(50_000.0);
    let result = run(&params, 1000, RunMode::Score, 20_250_101);

    // Starting assets at the risk-free rate for 35 years, minus an upper
    // estimate of every retired withdrawal: living expenses grossed up 30%
    // for taxes and premiums, net of the $20k pension
    let start = params.assets.total_assets();
    let grown = start * 1.03_f64.powi(35);
    let withdrawn: f64 = (15..35)
        .map(|t| 50_000.0 * 1.025_f64.powi(t) * 1.3 - 20_000.0)
        .sum();
    assert!(
        result.median_ending_balance >= grown - withdrawn,
        "median {} below floor {}",
        result.median_ending_balance,
        grown - withdrawn
    );
}

#[test]
fn test_example_household_bands_cover_every_year() {
    let params = example_household(50_000.0);
    let result = run(&params, 300, RunMode::Bands, 5);
    let bands = result.per_year.unwrap();

    assert_eq!(bands.len(), 35);
    assert_eq!(bands[&0].age, 50);
    assert_eq!(bands[&34].age, 84);
    // Nothing is withdrawn before 65, so the median grows
    assert!(bands[&14].p50 > bands[&0].p50);
}

#[test]
fn test_small_expense_change_moves_success_smoothly() {
    // $200 a month more spending, same seed: no cliff
    let base = run(&example_household(50_000.0), 1000, RunMode::Score, 42);
    let more = run(&example_household(52_400.0), 1000, RunMode::Score, 42);

    assert!(more.success_probability <= base.success_probability);
    assert!(
        (base.success_probability - more.success_probability).abs() < 0.05,
        "{} -> {}",
        base.success_probability,
        more.success_probability
    );
}

// ============================================================================
// Guardrails
// ============================================================================

#[test]
fn test_guardrails_fire_and_are_summed() {
    let mut params = example_household(60_000.0);
    params.use_guardrails = true;
    params.market = crate::model::MarketAssumptions::single_portfolio(0.06, 0.16);

    let result = run(&params, 200, RunMode::Score, 13);
    assert!(result.guardrails.capital_preservation > 0);
    assert!(result.guardrails.prosperity > 0);
    assert!(result.guardrails.inflation_skips > 0);
}

#[test]
fn test_guardrail_records_match_stats() {
    let mut params = example_household(60_000.0);
    params.use_guardrails = true;
    params.market = crate::model::MarketAssumptions::single_portfolio(0.06, 0.16);
    let tables = PolicyTables::default();
    let ctx = SimulationContext::new(&params, &tables).unwrap();

    for seed in 0..40 {
        let result = simulate(&ctx, seed).unwrap();
        let stats = result.guardrails;
        let fired = result.yearly.iter().filter(|r| r.guardrail.is_some()).count() as u64;
        let skipped = result.yearly.iter().filter(|r| r.inflation_skipped).count() as u64;
        assert_eq!(
            fired,
            stats.capital_preservation + stats.prosperity + stats.portfolio_management
        );
        assert_eq!(skipped, stats.inflation_skips);
        for record in &result.yearly {
            if record.guardrail_adjusted() {
                assert!(record.phase.is_retired() || record.phase == Phase::Depleted);
            }
        }
    }
}

#[test]
fn test_pension_covered_start_does_not_trigger_cuts() {
    // The pension covers the first years outright; later withdrawals are
    // small next to a growing portfolio and must not read as overspending
    let params = SimulationBuilder::new()
        .as_of(2025, 1, 1)
        .primary(
            PersonBuilder::new(65)
                .retire_at(65)
                .life_expectancy(95)
                .pension(60_000.0, 65),
        )
        .assets(0.0, 1_000_000.0, 0.0, 0.0, 0.0)
        .single_portfolio(0.06, 0.0)
        .living_expenses(50_000.0)
        .inflation(0.03)
        .guardrails(true)
        .build()
        .unwrap();
    let tables = PolicyTables::default();
    let ctx = SimulationContext::new(&params, &tables).unwrap();
    let result = simulate(&ctx, 1).unwrap();

    assert!(result.success);
    assert_eq!(result.guardrails.capital_preservation, 0);
    assert_eq!(result.guardrails.portfolio_management, 0);
    for (t, record) in result.yearly.iter().enumerate() {
        let scheduled = 50_000.0 * 1.03_f64.powi(t as i32);
        assert!(
            record.living >= scheduled - 1e-6,
            "year {t}: living {} below {scheduled}",
            record.living
        );
    }
}

// ============================================================================
// Medicare
// ============================================================================

fn medicare_household(age: u8, prior_magi: Vec<f64>) -> SimulationParams {
    SimulationBuilder::new()
        .as_of(2025, 1, 1)
        .primary(PersonBuilder::new(age).retire_at(age).life_expectancy(age + 6))
        .assets(0.0, 1_000_000.0, 0.0, 0.0, 0.0)
        .single_portfolio(0.05, 0.0)
        .living_expenses(40_000.0)
        .prior_magi(prior_magi)
        .build()
        .unwrap()
}

#[test]
fn test_irmaa_uses_magi_from_two_years_prior() {
    // Tax-free withdrawals keep simulated MAGI at zero, so only the seeded
    // history can trigger a surcharge
    let params = medicare_household(66, vec![600_000.0, 10_000.0]);
    let tables = PolicyTables::default();
    let ctx = SimulationContext::new(&params, &tables).unwrap();
    let result = simulate(&ctx, 1).unwrap();

    assert!(result.yearly[0].taxes.irmaa > 0.0);
    assert!(result.yearly[0].taxes.medicare > result.yearly[0].taxes.irmaa);
    for record in &result.yearly[1..] {
        assert_eq!(record.taxes.irmaa, 0.0, "year {}", record.year);
        assert!(record.taxes.medicare > 0.0);
    }
}

#[test]
fn test_irmaa_needs_a_medicare_member() {
    let params = medicare_household(58, vec![600_000.0, 600_000.0]);
    let tables = PolicyTables::default();
    let ctx = SimulationContext::new(&params, &tables).unwrap();
    let result = simulate(&ctx, 1).unwrap();

    assert!(result.yearly.iter().all(|r| r.primary_age < 65));
    for record in &result.yearly {
        assert_eq!(record.taxes.irmaa, 0.0);
        assert_eq!(record.taxes.medicare, 0.0);
    }
}

// ============================================================================
// Couples and care
// ============================================================================

#[test]
fn test_survivor_keeps_larger_social_security() {
    let params = SimulationBuilder::new()
        .as_of(2025, 1, 1)
        .primary(
            PersonBuilder::new(70)
                .retire_at(65)
                .life_expectancy(75)
                .social_security(36_000.0, 67),
        )
        .spouse(
            PersonBuilder::new(70)
                .retire_at(65)
                .life_expectancy(85)
                .social_security(12_000.0, 67),
        )
        .assets(300_000.0, 200_000.0, 0.0, 0.0, 100_000.0)
        .single_portfolio(0.05, 0.0)
        .living_expenses(40_000.0)
        .inflation(0.0)
        .build()
        .unwrap();
    let tables = PolicyTables::default();
    let ctx = SimulationContext::new(&params, &tables).unwrap();
    let result = simulate(&ctx, 1).unwrap();

    let together = &result.yearly[0];
    let widowed = &result.yearly[5];
    assert!((together.social_security_gross - 48_000.0).abs() < 1e-6);
    assert_eq!(widowed.primary_age, 75);
    assert!((widowed.social_security_gross - 36_000.0).abs() < 1e-6);
}

#[test]
fn test_care_events_reported_per_trial() {
    let params = SimulationBuilder::new()
        .as_of(2025, 1, 1)
        .primary(PersonBuilder::new(75).retire_at(65).life_expectancy(100))
        .assets(400_000.0, 100_000.0, 200_000.0, 120_000.0, 50_000.0)
        .living_expenses(45_000.0)
        .ltc(LtcAssumptions::enabled())
        .build()
        .unwrap();
    let tables = PolicyTables::default();
    let ctx = SimulationContext::new(&params, &tables).unwrap();

    let mut events = 0;
    for seed in 0..100 {
        let result = simulate(&ctx, seed).unwrap();
        for event in &result.ltc_events {
            assert!(event.start_age >= 75);
            assert!(event.duration_years >= 1);
            assert!(event.out_of_pocket_total >= 0.0);
        }
        let yearly_cost: f64 = result.yearly.iter().map(|r| r.ltc_cost).sum();
        if result.ltc_events.is_empty() {
            assert_eq!(yearly_cost, 0.0);
        }
        events += result.ltc_events.len();
        assert!(matches!(result.final_phase, Phase::Completed | Phase::Depleted));
    }
    assert!(events > 0);
}
