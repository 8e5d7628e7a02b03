//! Fan-in of completed trials into an [`AggregateResult`]
//!
//! Everything here is order-independent: counts are integers and every
//! percentile is taken over a sorted copy of the sample, so the pool may
//! hand trials over in any order.

use std::collections::BTreeMap;

use crate::model::{
    AggregateResult, DroppedTrials, GuardrailStats, RunMode, ScenarioResult, YearBand,
};

/// Linear-interpolated percentile of an ascending sample, `p` in `[0, 1]`.
/// Returns 0 for an empty sample.
#[must_use]
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let rank = p.clamp(0.0, 1.0) * (n - 1) as f64;
            let lo = rank.floor() as usize;
            let hi = rank.ceil() as usize;
            let weight = rank - lo as f64;
            sorted[lo] + (sorted[hi] - sorted[lo]) * weight
        }
    }
}

fn sorted(mut values: Vec<f64>) -> Vec<f64> {
    values.sort_by(f64::total_cmp);
    values
}

/// Collects the parts of each trial the chosen mode needs
#[derive(Debug, Clone)]
pub struct Aggregator {
    mode: RunMode,
    successes: usize,
    ending_balances: Vec<f64>,
    /// Year index -> ending balance of every trajectory that reached it
    yearly_balances: BTreeMap<usize, Vec<f64>>,
    ages: BTreeMap<usize, u8>,
    guardrails: GuardrailStats,
}

impl Aggregator {
    #[must_use]
    pub fn new(mode: RunMode, expected_trials: usize) -> Self {
        Self {
            mode,
            successes: 0,
            ending_balances: Vec::with_capacity(expected_trials),
            yearly_balances: BTreeMap::new(),
            ages: BTreeMap::new(),
            guardrails: GuardrailStats::default(),
        }
    }

    pub fn push(&mut self, result: &ScenarioResult) {
        if result.success {
            self.successes += 1;
        }
        self.ending_balances.push(result.ending_balance);
        self.guardrails += result.guardrails;

        if self.mode == RunMode::Bands {
            for record in &result.yearly {
                self.yearly_balances
                    .entry(record.year)
                    .or_default()
                    .push(record.ending_balance);
                self.ages.entry(record.year).or_insert(record.primary_age);
            }
        }
    }

    #[must_use]
    pub fn completed(&self) -> usize {
        self.ending_balances.len()
    }

    #[must_use]
    pub fn finish(
        self,
        requested: usize,
        base_seed: u64,
        dropped: DroppedTrials,
        cancelled: usize,
    ) -> AggregateResult {
        let completed = self.completed();
        let balances = sorted(self.ending_balances);

        let per_year = (self.mode == RunMode::Bands).then(|| {
            self.yearly_balances
                .into_iter()
                .map(|(year, values)| {
                    let values = sorted(values);
                    let band = YearBand {
                        p05: percentile(&values, 0.05),
                        p25: percentile(&values, 0.25),
                        p50: percentile(&values, 0.50),
                        p75: percentile(&values, 0.75),
                        p95: percentile(&values, 0.95),
                        count: values.len(),
                        age: self.ages.get(&year).copied().unwrap_or_default(),
                    };
                    (year, band)
                })
                .collect()
        });

        AggregateResult {
            mode: self.mode,
            requested,
            completed,
            dropped,
            cancelled,
            base_seed,
            successes: self.successes,
            success_probability: if completed == 0 {
                0.0
            } else {
                self.successes as f64 / completed as f64
            },
            median_ending_balance: percentile(&balances, 0.5),
            percentile_10: percentile(&balances, 0.10),
            percentile_90: percentile(&balances, 0.90),
            per_year,
            guardrails: self.guardrails,
        }
    }
}
