//! Criterion benchmarks for glidepath_core simulation
//!
//! Run with: cargo bench -p glidepath_core

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use glidepath_core::config::{PersonBuilder, SimulationBuilder};
use glidepath_core::model::{LtcAssumptions, PolicyTables, RegimeModel, RunMode, SimulationParams};
use glidepath_core::returns::ReturnGenerator;
use glidepath_core::simulation::{SimulationContext, simulate};
use glidepath_core::{ExecutionPool, MonteCarloProgress, MonteCarloRequest, run_monte_carlo};
use rand::SeedableRng;
use rand::rngs::StdRng;

fn create_household(guardrails: bool) -> SimulationParams {
    SimulationBuilder::new()
        .as_of(2025, 1, 1)
        .primary(
            PersonBuilder::new(55)
                .retire_at(62)
                .life_expectancy(95)
                .wages(120_000.0)
                .social_security(30_000.0, 67),
        )
        .spouse(
            PersonBuilder::new(53)
                .retire_at(60)
                .life_expectancy(95)
                .social_security(18_000.0, 67),
        )
        .assets(900_000.0, 250_000.0, 300_000.0, 180_000.0, 60_000.0)
        .contributions(23_000.0, 7_000.0, 10_000.0)
        .living_expenses(85_000.0)
        .healthcare(12_000.0, 4_000.0)
        .guardrails(guardrails)
        .ltc(LtcAssumptions::enabled())
        .build()
        .expect("valid benchmark household")
}

fn bench_return_draws(c: &mut Criterion) {
    let params = create_household(false);
    let generator = ReturnGenerator::new(&params.market).expect("valid market");
    let mut rng = StdRng::seed_from_u64(1);
    let mut regime = Default::default();

    c.bench_function("return_draw", |b| {
        b.iter(|| generator.next_year(black_box(&mut rng), &mut regime))
    });
}

fn bench_single_scenario(c: &mut Criterion) {
    let tables = PolicyTables::default();
    let mut group = c.benchmark_group("scenario");

    for guardrails in [false, true] {
        let params = create_household(guardrails);
        let ctx = SimulationContext::new(&params, &tables).expect("valid context");
        group.bench_with_input(
            BenchmarkId::new("guardrails", guardrails),
            &guardrails,
            |b, _| b.iter(|| simulate(black_box(&ctx), black_box(42))),
        );
    }

    let mut regimes = create_household(false);
    regimes.market.regimes = Some(RegimeModel::us_equity_cycle());
    let ctx = SimulationContext::new(&regimes, &tables).expect("valid context");
    group.bench_function("regimes", |b| b.iter(|| simulate(black_box(&ctx), black_box(42))));

    group.finish();
}

fn bench_monte_carlo(c: &mut Criterion) {
    let mut group = c.benchmark_group("monte_carlo");
    group.sample_size(10);
    let params = create_household(true);
    let tables = PolicyTables::default();
    let pool = ExecutionPool::new(0).expect("worker pool");

    for (trials, mode) in [(500, RunMode::Score), (1000, RunMode::Score), (1000, RunMode::Bands)] {
        let request = MonteCarloRequest {
            trials,
            mode,
            seed: Some(7),
            timeout: None,
        };
        group.bench_with_input(
            BenchmarkId::new(format!("{mode:?}").to_lowercase(), trials),
            &request,
            |b, request| {
                b.iter(|| {
                    run_monte_carlo(
                        black_box(&params),
                        &tables,
                        request,
                        &pool,
                        &MonteCarloProgress::new(),
                    )
                })
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_return_draws,
    bench_single_scenario,
    bench_monte_carlo
);
criterion_main!(benches);
