use std::collections::BTreeMap;
use std::ops::AddAssign;

use serde::{Deserialize, Serialize};

use super::buckets::AssetBuckets;
use super::ltc::LtcEvent;

/// Scenario state-machine phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// At least one member still working; contributions, no discretionary
    /// withdrawals
    #[default]
    Accumulation,
    RetiredPreRmd,
    RetiredPostRmd,
    /// Assets exhausted with an unmet need; zero records to the horizon
    Depleted,
    /// Horizon reached without a shortfall
    Completed,
}

impl Phase {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Depleted | Phase::Completed)
    }

    #[must_use]
    pub fn is_retired(self) -> bool {
        matches!(self, Phase::RetiredPreRmd | Phase::RetiredPostRmd)
    }
}

/// Output mode of a Monte Carlo request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Success probability and ending-balance percentiles
    #[default]
    Score,
    /// Per-year percentile bands as well
    Bands,
}

/// Per-bucket amounts (withdrawals or contributions)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BucketAmounts {
    pub cash_equivalents: f64,
    pub capital_gains: f64,
    pub tax_deferred: f64,
    pub tax_free: f64,
}

impl BucketAmounts {
    #[must_use]
    pub fn total(&self) -> f64 {
        self.cash_equivalents + self.capital_gains + self.tax_deferred + self.tax_free
    }
}

/// Taxes charged in one year, by kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TaxBreakdown {
    pub federal: f64,
    pub state: f64,
    pub capital_gains: f64,
    pub niit: f64,
    /// Medicare Part B base premium plus IRMAA surcharge
    pub medicare: f64,
    pub irmaa: f64,
}

impl TaxBreakdown {
    /// Income taxes only (Medicare premiums are an expense, not a tax)
    #[must_use]
    pub fn income_taxes(&self) -> f64 {
        self.federal + self.state + self.capital_gains + self.niit
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardrailRule {
    CapitalPreservation,
    Prosperity,
    PortfolioManagement,
}

/// Count of guardrail firings, summed across years (and across trials in an
/// aggregate)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardrailStats {
    pub capital_preservation: u64,
    pub prosperity: u64,
    pub portfolio_management: u64,
    pub inflation_skips: u64,
}

impl GuardrailStats {
    pub fn record(&mut self, rule: GuardrailRule) {
        match rule {
            GuardrailRule::CapitalPreservation => self.capital_preservation += 1,
            GuardrailRule::Prosperity => self.prosperity += 1,
            GuardrailRule::PortfolioManagement => self.portfolio_management += 1,
        }
    }

    #[must_use]
    pub fn total_adjustments(&self) -> u64 {
        self.capital_preservation + self.prosperity + self.portfolio_management + self.inflation_skips
    }
}

impl AddAssign for GuardrailStats {
    fn add_assign(&mut self, rhs: Self) {
        self.capital_preservation += rhs.capital_preservation;
        self.prosperity += rhs.prosperity;
        self.portfolio_management += rhs.portfolio_management;
        self.inflation_skips += rhs.inflation_skips;
    }
}

/// One simulated year. Nominal dollars throughout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct YearlyCashFlow {
    /// Years since `as_of` (0-based)
    pub year: usize,
    pub primary_age: u8,
    pub spouse_age: Option<u8>,
    pub phase: Phase,

    // Income
    pub wages: f64,
    pub part_time: f64,
    pub pension: f64,
    pub social_security_gross: f64,
    pub social_security_taxable: f64,
    pub rmd: f64,
    /// RMD in excess of the year's need, paid out and taxed
    pub unplanned_rmd_inflow: f64,
    pub withdrawals: BucketAmounts,
    pub contributions: BucketAmounts,

    // Expenses
    pub living: f64,
    pub healthcare: f64,
    pub housing: f64,
    pub one_time: f64,
    pub ltc_cost: f64,
    pub ltc_insurance_paid: f64,
    pub ltc_out_of_pocket: f64,
    pub taxes: TaxBreakdown,
    /// Tax owed (positive) or refunded (negative) after reconciling the
    /// year, carried into next year's need
    pub tax_true_up: f64,

    /// Weighted return of the invested buckets
    pub portfolio_return: f64,
    pub shortfall: f64,
    pub ending_balance: f64,
    pub buckets: AssetBuckets,

    pub guardrail: Option<GuardrailRule>,
    pub inflation_skipped: bool,
}

impl YearlyCashFlow {
    #[must_use]
    pub fn guardrail_adjusted(&self) -> bool {
        self.guardrail.is_some() || self.inflation_skipped
    }

    #[must_use]
    pub fn guaranteed_income(&self) -> f64 {
        self.wages + self.part_time + self.pension + self.social_security_gross
    }

    #[must_use]
    pub fn total_expenses(&self) -> f64 {
        self.living
            + self.healthcare
            + self.housing
            + self.one_time
            + self.ltc_out_of_pocket
            + self.taxes.income_taxes()
            + self.taxes.medicare
    }
}

/// Outcome of a single trial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioResult {
    /// No shortfall over the full horizon
    pub success: bool,
    pub ending_balance: f64,
    pub yearly: Vec<YearlyCashFlow>,
    pub guardrails: GuardrailStats,
    pub depletion_year: Option<usize>,
    pub ltc_events: Vec<LtcEvent>,
    pub final_phase: Phase,
}

/// Trials that were discarded rather than aggregated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DroppedTrials {
    /// Non-finite values during the trial
    pub numerical: usize,
    /// The trial panicked
    pub panicked: usize,
}

impl DroppedTrials {
    #[must_use]
    pub fn total(&self) -> usize {
        self.numerical + self.panicked
    }
}

/// Percentiles of the end-of-year portfolio for one simulated year
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct YearBand {
    pub p05: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p95: f64,
    pub count: usize,
    /// Primary member's age in that year
    pub age: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateResult {
    pub mode: RunMode,
    pub requested: usize,
    pub completed: usize,
    pub dropped: DroppedTrials,
    /// Trials never run or discarded because of cancellation
    pub cancelled: usize,
    pub base_seed: u64,
    pub successes: usize,
    /// successes / completed
    pub success_probability: f64,
    pub median_ending_balance: f64,
    pub percentile_10: f64,
    pub percentile_90: f64,
    /// Only populated in `RunMode::Bands`
    pub per_year: Option<BTreeMap<usize, YearBand>>,
    pub guardrails: GuardrailStats,
}
