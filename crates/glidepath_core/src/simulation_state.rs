use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::guardrails::GuardrailState;
use crate::ltc::LtcState;
use crate::model::{
    AssetBuckets, GuardrailStats, Phase, Regime, ScenarioResult, SimulationParams, YearlyCashFlow,
};

/// Runtime state of one trial. Owned by the trial; nothing here is shared.
#[derive(Debug, Clone)]
pub struct ScenarioState {
    pub timeline: ScenarioTimeline,
    pub portfolio: ScenarioPortfolio,
    pub taxes: ScenarioTaxState,
    pub spending: GuardrailState,
    pub ltc: LtcState,
    pub history: ScenarioHistory,
    pub phase: Phase,
    pub rng: StdRng,
}

#[derive(Debug, Clone, Copy)]
pub struct ScenarioTimeline {
    /// Current year index (0-based from `as_of`)
    pub year: usize,
    pub horizon: usize,
}

impl ScenarioTimeline {
    #[must_use]
    pub fn years_remaining(&self) -> usize {
        self.horizon - self.year
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.year >= self.horizon
    }
}

#[derive(Debug, Clone)]
pub struct ScenarioPortfolio {
    pub buckets: AssetBuckets,
    pub regime: Regime,
    /// Last year's nominal return on the invested buckets
    pub prior_return: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct ScenarioTaxState {
    /// Inflation-deflated MAGI by tax year, oldest first: the caller's
    /// `prior_magi` followed by each simulated year
    pub magi_history: Vec<f64>,
    /// Under- (positive) or over-withheld (negative) tax from last year
    pub true_up: f64,
}

impl ScenarioTaxState {
    /// MAGI from exactly two tax years before the current one
    #[must_use]
    pub fn magi_two_years_prior(&self) -> f64 {
        let n = self.magi_history.len();
        if n >= 2 { self.magi_history[n - 2] } else { 0.0 }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScenarioHistory {
    pub records: Vec<YearlyCashFlow>,
    pub guardrails: GuardrailStats,
    pub depletion_year: Option<usize>,
}

impl ScenarioState {
    #[must_use]
    pub fn new(params: &SimulationParams, horizon: usize, seed: u64) -> Self {
        Self {
            timeline: ScenarioTimeline { year: 0, horizon },
            portfolio: ScenarioPortfolio {
                buckets: params.assets,
                regime: Regime::default(),
                prior_return: None,
            },
            taxes: ScenarioTaxState {
                magi_history: params.prior_magi.clone(),
                true_up: 0.0,
            },
            spending: GuardrailState::default(),
            ltc: LtcState::default(),
            history: ScenarioHistory {
                records: Vec::with_capacity(horizon),
                ..ScenarioHistory::default()
            },
            phase: Phase::default(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Append the year's record and move to the next year
    pub fn push_record(&mut self, record: YearlyCashFlow) {
        self.history.records.push(record);
        self.timeline.year += 1;
    }

    /// Move to `Depleted` after the money ran out in `year`
    pub fn deplete(&mut self, year: usize) {
        self.phase = Phase::Depleted;
        self.portfolio.buckets.clear();
        self.history.depletion_year.get_or_insert(year);
    }

    #[must_use]
    pub fn finish(mut self) -> ScenarioResult {
        if self.phase != Phase::Depleted {
            self.phase = Phase::Completed;
        }
        ScenarioResult {
            success: self.phase == Phase::Completed,
            ending_balance: self.portfolio.buckets.total_assets(),
            yearly: self.history.records,
            guardrails: self.history.guardrails,
            depletion_year: self.history.depletion_year,
            ltc_events: self.ltc.into_events(),
            final_phase: self.phase,
        }
    }
}
