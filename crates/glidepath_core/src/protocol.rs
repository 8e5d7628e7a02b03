//! Worker protocol
//!
//! A worker receives one [`Task`] as JSON, runs the batch and answers with a
//! [`TaskResult`]. Failures are answered too, as `{"kind": "error", ..}`,
//! so a caller never waits on a task that went wrong.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, SimulationError};
use crate::model::{AggregateResult, PolicyTables, RunMode, SimulationParams, YearBand};
use crate::pool::{ExecutionPool, MonteCarloProgress, MonteCarloRequest, run_monte_carlo};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Task {
    Score {
        params: Box<SimulationParams>,
        runs: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        seed: Option<u64>,
    },
    Bands {
        params: Box<SimulationParams>,
        runs: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        seed: Option<u64>,
    },
}

impl Task {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let task: Self = serde_json::from_str(json)?;
        task.params().validate()?;
        Ok(task)
    }

    #[must_use]
    pub fn params(&self) -> &SimulationParams {
        match self {
            Task::Score { params, .. } | Task::Bands { params, .. } => params,
        }
    }

    #[must_use]
    pub fn request(&self) -> MonteCarloRequest {
        let (mode, runs, seed) = match self {
            Task::Score { runs, seed, .. } => (RunMode::Score, *runs, *seed),
            Task::Bands { runs, seed, .. } => (RunMode::Bands, *runs, *seed),
        };
        MonteCarloRequest {
            trials: runs,
            mode,
            seed,
            timeout: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TaskResult {
    #[serde(rename_all = "camelCase")]
    Score {
        successes: usize,
        /// Trials that were aggregated
        total: usize,
        median_ending_balance: f64,
        percentile10: f64,
        percentile90: f64,
        dropped: usize,
    },
    #[serde(rename_all = "camelCase")]
    Bands {
        per_year: BTreeMap<usize, YearBand>,
        probability_of_success: f64,
        median_ending_balance: f64,
        dropped: usize,
    },
    Error {
        message: String,
    },
}

impl From<AggregateResult> for TaskResult {
    fn from(result: AggregateResult) -> Self {
        let dropped = result.dropped.total();
        match result.mode {
            RunMode::Score => TaskResult::Score {
                successes: result.successes,
                total: result.completed,
                median_ending_balance: result.median_ending_balance,
                percentile10: result.percentile_10,
                percentile90: result.percentile_90,
                dropped,
            },
            RunMode::Bands => TaskResult::Bands {
                per_year: result.per_year.unwrap_or_default(),
                probability_of_success: result.success_probability,
                median_ending_balance: result.median_ending_balance,
                dropped,
            },
        }
    }
}

impl From<SimulationError> for TaskResult {
    fn from(err: SimulationError) -> Self {
        TaskResult::Error {
            message: err.to_string(),
        }
    }
}

/// Run one task to completion on `pool`
pub fn handle_task(task: &Task, tables: &PolicyTables, pool: &ExecutionPool) -> TaskResult {
    let progress = MonteCarloProgress::new();
    match run_monte_carlo(task.params(), tables, &task.request(), pool, &progress) {
        Ok(result) => result.into(),
        Err(e) => {
            tracing::warn!(error = %e, "Task failed");
            e.into()
        }
    }
}

/// Decode, run and encode one JSON message. Malformed input yields an error
/// result rather than a failure.
pub fn handle_message(json: &str, tables: &PolicyTables, pool: &ExecutionPool) -> String {
    let result = match Task::from_json(json) {
        Ok(task) => handle_task(&task, tables, pool),
        Err(e) => SimulationError::from(e).into(),
    };
    serde_json::to_string(&result).unwrap_or_else(|e| {
        format!(r#"{{"kind":"error","message":"could not encode result: {e}"}}"#)
    })
}
