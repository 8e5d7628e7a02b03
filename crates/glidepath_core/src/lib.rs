//! Retirement Monte Carlo engine
//!
//! This crate estimates the probability that a household's assets last
//! through retirement. Each trial walks the plan year by year and models:
//! - Correlated, regime-switching returns across four asset classes
//! - Federal, state, capital gains, NIIT and IRMAA taxes from policy-year tables
//! - Social Security (claim-age adjusted, with survivor benefits) and pensions
//! - Required minimum distributions
//! - Long-term care onset, insurance benefit pools and Medicaid spend-down
//! - Tax-aware withdrawal sequencing across four buckets
//! - Optional Guyton-Klinger guardrails on the living budget
//!
//! Trials run on a fixed worker pool and are aggregated into success
//! probabilities and per-year percentile bands.
//!
//! # Builder DSL
//!
//! ```ignore
//! use glidepath_core::{ExecutionPool, MonteCarloProgress, MonteCarloRequest, run_monte_carlo};
//! use glidepath_core::config::{PersonBuilder, SimulationBuilder};
//! use glidepath_core::model::PolicyTables;
//!
//! let params = SimulationBuilder::new()
//!     .as_of(2025, 1, 1)
//!     .primary(PersonBuilder::new(50).retire_at(65).life_expectancy(85))
//!     .assets(700_000.0, 200_000.0, 100_000.0, 60_000.0, 0.0)
//!     .single_portfolio(0.07, 0.12)
//!     .living_expenses(50_000.0)
//!     .build()?;
//!
//! let pool = ExecutionPool::new(0)?;
//! let result = run_monte_carlo(
//!     &params,
//!     &PolicyTables::default(),
//!     &MonteCarloRequest::default(),
//!     &pool,
//!     &MonteCarloProgress::new(),
//! )?;
//! ```

#![warn(clippy::all)]

// ============================================================================
// Core modules
// ============================================================================

pub mod aggregate;
pub mod benefits;
pub mod error;
pub mod guardrails;
pub mod ltc;
pub mod pool;
pub mod protocol;
pub mod returns;
pub mod simulation;
pub mod simulation_state;
pub mod taxes;
pub mod withdrawal;

// ============================================================================
// Type definition modules
// ============================================================================

pub mod config;
pub mod model;

// ============================================================================
// Test modules
// ============================================================================

#[cfg(test)]
mod tests;

// ============================================================================
// Public re-exports for convenience
// ============================================================================

pub use config::{PersonBuilder, SimulationBuilder};
pub use error::{ConfigError, SimulationError, TrialError};
pub use pool::{ExecutionPool, MonteCarloProgress, MonteCarloRequest, run_monte_carlo};
pub use protocol::{Task, TaskResult, handle_task};
