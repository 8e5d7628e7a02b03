//! Execution pool
//!
//! Fans N independent trials out over a fixed set of worker threads and
//! folds the finished ones into an [`AggregateResult`]. Each trial seeds its
//! own RNG from `(base_seed, trial_index)`, so the outcome does not depend on
//! the number of workers or on scheduling.

use std::num::NonZeroUsize;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::aggregate::Aggregator;
use crate::error::{ConfigError, SimulationError, TrialError};
use crate::model::{
    AggregateResult, DroppedTrials, PolicyTables, RunMode, ScenarioResult, SimulationParams,
};
use crate::simulation::{SimulationContext, simulate};

/// Progress tracking and cancellation for a Monte Carlo batch
#[derive(Debug, Clone)]
pub struct MonteCarloProgress {
    /// Completed trials counter
    completed: Arc<AtomicUsize>,
    /// Cancellation flag
    cancelled: Arc<AtomicBool>,
}

impl MonteCarloProgress {
    #[must_use]
    pub fn new() -> Self {
        Self {
            completed: Arc::new(AtomicUsize::new(0)),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Share atomics owned by the caller (e.g. a UI thread polling progress)
    pub fn from_atomics(completed: Arc<AtomicUsize>, cancelled: Arc<AtomicBool>) -> Self {
        Self {
            completed,
            cancelled,
        }
    }

    #[must_use]
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Relaxed)
    }

    fn increment(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    /// Stop dispatching new trials; in-flight ones are discarded
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

impl Default for MonteCarloProgress {
    fn default() -> Self {
        Self::new()
    }
}

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Seed of trial `trial_index` within a batch seeded with `base_seed`
#[must_use]
pub fn derive_seed(base_seed: u64, trial_index: u64) -> u64 {
    splitmix64(base_seed ^ splitmix64(trial_index))
}

/// What a caller asks of one batch
#[derive(Debug, Clone, PartialEq)]
pub struct MonteCarloRequest {
    pub trials: usize,
    pub mode: RunMode,
    /// Overrides `SimulationParams::seed`; random when both are absent
    pub seed: Option<u64>,
    /// Wall-clock budget for the whole batch
    pub timeout: Option<Duration>,
}

impl Default for MonteCarloRequest {
    fn default() -> Self {
        Self {
            trials: 1000,
            mode: RunMode::Score,
            seed: None,
            timeout: None,
        }
    }
}

/// Fixed-size set of worker threads
#[derive(Debug)]
pub struct ExecutionPool {
    workers: usize,
    #[cfg(feature = "parallel")]
    pool: rayon::ThreadPool,
}

impl ExecutionPool {
    /// `workers == 0` uses every available core
    pub fn new(workers: usize) -> Result<Self, SimulationError> {
        let workers = if workers == 0 {
            std::thread::available_parallelism().map_or(1, NonZeroUsize::get)
        } else {
            workers
        };
        Self::build(workers)
    }

    #[cfg(feature = "parallel")]
    fn build(workers: usize) -> Result<Self, SimulationError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("glidepath-worker-{i}"))
            .build()
            .map_err(|e| SimulationError::Pool(e.to_string()))?;
        Ok(Self { workers, pool })
    }

    #[cfg(not(feature = "parallel"))]
    fn build(workers: usize) -> Result<Self, SimulationError> {
        Ok(Self { workers })
    }

    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run `f` for every index in `0..n`, results in index order
    #[cfg(feature = "parallel")]
    fn run<T, F>(&self, n: usize, f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send,
    {
        self.pool.install(|| (0..n).into_par_iter().map(&f).collect())
    }

    /// Without the `parallel` feature trials run one after another
    #[cfg(not(feature = "parallel"))]
    fn run<T, F>(&self, n: usize, f: F) -> Vec<T>
    where
        F: Fn(usize) -> T,
    {
        (0..n).map(f).collect()
    }
}

enum TrialOutcome {
    Completed(Box<ScenarioResult>),
    Failed(TrialError),
    Panicked,
    Cancelled,
}

struct Batch<'a> {
    ctx: &'a SimulationContext<'a>,
    base_seed: u64,
    deadline: Option<Instant>,
    progress: &'a MonteCarloProgress,
}

impl Batch<'_> {
    fn stopped(&self) -> bool {
        if self.progress.is_cancelled() {
            return true;
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            self.progress.cancel();
            return true;
        }
        false
    }

    fn run_trial(&self, index: usize) -> TrialOutcome {
        if self.stopped() {
            return TrialOutcome::Cancelled;
        }
        let seed = derive_seed(self.base_seed, index as u64);
        let outcome = catch_unwind(AssertUnwindSafe(|| simulate(self.ctx, seed)));
        // Anything that finishes after cancellation was in flight
        if self.stopped() {
            return TrialOutcome::Cancelled;
        }
        self.progress.increment();
        match outcome {
            Ok(Ok(result)) => TrialOutcome::Completed(Box::new(result)),
            Ok(Err(e)) => TrialOutcome::Failed(e),
            Err(_) => TrialOutcome::Panicked,
        }
    }
}

/// Run a full batch and aggregate the trials that completed
pub fn run_monte_carlo(
    params: &SimulationParams,
    tables: &PolicyTables,
    request: &MonteCarloRequest,
    pool: &ExecutionPool,
    progress: &MonteCarloProgress,
) -> Result<AggregateResult, SimulationError> {
    if request.trials == 0 {
        return Err(ConfigError::InvalidValue {
            field: "trials",
            value: 0.0,
            reason: "at least one trial is required",
        }
        .into());
    }
    let ctx = SimulationContext::new(params, tables)?;
    if progress.is_cancelled() {
        return Err(SimulationError::Cancelled);
    }

    let base_seed = request
        .seed
        .or(params.seed)
        .unwrap_or_else(rand::random::<u64>);
    tracing::info!(
        trials = request.trials,
        workers = pool.workers(),
        mode = ?request.mode,
        seed = base_seed,
        horizon = ctx.horizon,
        "Starting Monte Carlo batch"
    );

    let batch = Batch {
        ctx: &ctx,
        base_seed,
        deadline: request.timeout.map(|t| Instant::now() + t),
        progress,
    };
    let outcomes = pool.run(request.trials, |i| batch.run_trial(i));

    let mut aggregator = Aggregator::new(request.mode, request.trials);
    let mut dropped = DroppedTrials::default();
    let mut cancelled = 0;
    let mut first_error = None;
    for outcome in outcomes {
        match outcome {
            TrialOutcome::Completed(result) => aggregator.push(&result),
            TrialOutcome::Failed(e) => {
                dropped.numerical += 1;
                first_error.get_or_insert(e);
            }
            TrialOutcome::Panicked => dropped.panicked += 1,
            TrialOutcome::Cancelled => cancelled += 1,
        }
    }

    if dropped.total() > 0 {
        tracing::warn!(
            numerical = dropped.numerical,
            panicked = dropped.panicked,
            first_error = ?first_error,
            "Dropped trials"
        );
    }
    if cancelled > 0 {
        tracing::info!(cancelled, completed = aggregator.completed(), "Batch cancelled");
    }
    if aggregator.completed() == 0 {
        return Err(SimulationError::NoTrialsCompleted {
            dropped: dropped.total(),
            cancelled,
        });
    }

    let result = aggregator.finish(request.trials, base_seed, dropped, cancelled);
    tracing::debug!(
        completed = result.completed,
        success_probability = result.success_probability,
        median_ending_balance = result.median_ending_balance,
        "Monte Carlo batch finished"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PersonBuilder, SimulationBuilder};

    fn params() -> SimulationParams {
        SimulationBuilder::new()
            .primary(PersonBuilder::new(65).life_expectancy(80))
            .assets(200_000.0, 100_000.0, 100_000.0, 80_000.0, 20_000.0)
            .living_expenses(25_000.0)
            .build()
            .unwrap()
    }

    #[test]
    fn test_derive_seed_is_stable_and_spread() {
        assert_eq!(derive_seed(42, 7), derive_seed(42, 7));
        assert_ne!(derive_seed(42, 7), derive_seed(42, 8));
        assert_ne!(derive_seed(42, 7), derive_seed(43, 7));
    }

    #[test]
    fn test_progress_counts_completed_trials() {
        let params = params();
        let tables = PolicyTables::default();
        let pool = ExecutionPool::new(2).unwrap();
        let progress = MonteCarloProgress::new();
        let request = MonteCarloRequest {
            trials: 40,
            seed: Some(5),
            ..MonteCarloRequest::default()
        };
        let result = run_monte_carlo(&params, &tables, &request, &pool, &progress).unwrap();
        assert_eq!(progress.completed(), 40);
        assert_eq!(result.completed, 40);
        assert_eq!(result.base_seed, 5);
        assert_eq!(result.cancelled, 0);
    }

    #[test]
    fn test_cancelled_before_start() {
        let params = params();
        let tables = PolicyTables::default();
        let pool = ExecutionPool::new(1).unwrap();
        let progress = MonteCarloProgress::new();
        progress.cancel();
        let err = run_monte_carlo(
            &params,
            &tables,
            &MonteCarloRequest::default(),
            &pool,
            &progress,
        )
        .unwrap_err();
        assert_eq!(err, SimulationError::Cancelled);
    }

    #[test]
    fn test_expired_deadline_completes_nothing() {
        let params = params();
        let tables = PolicyTables::default();
        let pool = ExecutionPool::new(2).unwrap();
        let progress = MonteCarloProgress::new();
        let request = MonteCarloRequest {
            trials: 50,
            timeout: Some(Duration::ZERO),
            ..MonteCarloRequest::default()
        };
        let err = run_monte_carlo(&params, &tables, &request, &pool, &progress).unwrap_err();
        assert_eq!(
            err,
            SimulationError::NoTrialsCompleted {
                dropped: 0,
                cancelled: 50
            }
        );
        assert!(progress.is_cancelled());
    }

    #[test]
    fn test_zero_trials_is_config_error() {
        let params = params();
        let tables = PolicyTables::default();
        let pool = ExecutionPool::new(1).unwrap();
        let request = MonteCarloRequest {
            trials: 0,
            ..MonteCarloRequest::default()
        };
        let err = run_monte_carlo(
            &params,
            &tables,
            &request,
            &pool,
            &MonteCarloProgress::new(),
        )
        .unwrap_err();
        assert!(matches!(err, SimulationError::Config(_)));
    }
}
