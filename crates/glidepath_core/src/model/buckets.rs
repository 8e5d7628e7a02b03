//! Tax-treatment buckets holding the household portfolio
//!
//! Balances are private so every mutation goes through a method that floors
//! the bucket at zero and recomputes `total_assets`.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// The four tax-treatment buckets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BucketKind {
    CashEquivalents,
    CapitalGains,
    TaxDeferred,
    TaxFree,
}

/// Plain balances as supplied by the caller (or an asset-classification
/// service)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BucketBalances {
    #[serde(default)]
    pub tax_deferred: f64,
    #[serde(default)]
    pub tax_free: f64,
    #[serde(default)]
    pub capital_gains: f64,
    /// Cost basis of the capital-gains bucket
    #[serde(default)]
    pub cost_basis: f64,
    #[serde(default)]
    pub cash_equivalents: f64,
}

impl BucketBalances {
    /// Every balance, and the basis, must be finite and non-negative
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("assets.tax_deferred", self.tax_deferred),
            ("assets.tax_free", self.tax_free),
            ("assets.capital_gains", self.capital_gains),
            ("assets.cost_basis", self.cost_basis),
            ("assets.cash_equivalents", self.cash_equivalents),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidValue {
                    field,
                    value,
                    reason: "must be a finite, non-negative amount",
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BucketBalances", into = "BucketBalances")]
pub struct AssetBuckets {
    tax_deferred: f64,
    tax_free: f64,
    capital_gains: f64,
    cost_basis: f64,
    cash_equivalents: f64,
    total_assets: f64,
}

impl TryFrom<BucketBalances> for AssetBuckets {
    type Error = ConfigError;

    fn try_from(b: BucketBalances) -> Result<Self, Self::Error> {
        b.validate()?;
        let mut buckets = Self {
            tax_deferred: b.tax_deferred,
            tax_free: b.tax_free,
            capital_gains: b.capital_gains,
            cost_basis: b.cost_basis,
            cash_equivalents: b.cash_equivalents,
            total_assets: 0.0,
        };
        buckets.settle();
        Ok(buckets)
    }
}

impl From<AssetBuckets> for BucketBalances {
    fn from(b: AssetBuckets) -> Self {
        Self {
            tax_deferred: b.tax_deferred,
            tax_free: b.tax_free,
            capital_gains: b.capital_gains,
            cost_basis: b.cost_basis,
            cash_equivalents: b.cash_equivalents,
        }
    }
}

impl AssetBuckets {
    /// Build from trusted balances, flooring anything negative. Caller input
    /// goes through `TryFrom<BucketBalances>` instead.
    #[must_use]
    pub fn new(
        tax_deferred: f64,
        tax_free: f64,
        capital_gains: f64,
        cost_basis: f64,
        cash_equivalents: f64,
    ) -> Self {
        let mut buckets = Self {
            tax_deferred,
            tax_free,
            capital_gains,
            cost_basis,
            cash_equivalents,
            total_assets: 0.0,
        };
        buckets.settle();
        buckets
    }

    #[must_use]
    pub fn tax_deferred(&self) -> f64 {
        self.tax_deferred
    }

    #[must_use]
    pub fn tax_free(&self) -> f64 {
        self.tax_free
    }

    #[must_use]
    pub fn capital_gains(&self) -> f64 {
        self.capital_gains
    }

    #[must_use]
    pub fn cost_basis(&self) -> f64 {
        self.cost_basis
    }

    #[must_use]
    pub fn cash_equivalents(&self) -> f64 {
        self.cash_equivalents
    }

    #[must_use]
    pub fn total_assets(&self) -> f64 {
        self.total_assets
    }

    #[must_use]
    pub fn balance(&self, kind: BucketKind) -> f64 {
        match kind {
            BucketKind::CashEquivalents => self.cash_equivalents,
            BucketKind::CapitalGains => self.capital_gains,
            BucketKind::TaxDeferred => self.tax_deferred,
            BucketKind::TaxFree => self.tax_free,
        }
    }

    /// Fraction of the capital-gains bucket that is unrealized gain
    #[must_use]
    pub fn gains_fraction(&self) -> f64 {
        if self.capital_gains <= 0.0 {
            return 0.0;
        }
        (1.0 - self.cost_basis / self.capital_gains).clamp(0.0, 1.0)
    }

    /// Remove up to `amount` from a bucket and return what was actually
    /// removed. Selling from the capital-gains bucket releases basis
    /// pro-rata.
    pub fn withdraw(&mut self, kind: BucketKind, amount: f64) -> f64 {
        let taken = amount.max(0.0).min(self.balance(kind));
        match kind {
            BucketKind::CashEquivalents => self.cash_equivalents -= taken,
            BucketKind::CapitalGains => {
                if self.capital_gains > 0.0 {
                    let basis_share = self.cost_basis / self.capital_gains;
                    self.cost_basis -= taken * basis_share.min(1.0);
                }
                self.capital_gains -= taken;
            }
            BucketKind::TaxDeferred => self.tax_deferred -= taken,
            BucketKind::TaxFree => self.tax_free -= taken,
        }
        self.settle();
        taken
    }

    /// Add money to a bucket. Deposits into the capital-gains bucket are new
    /// money and carry full basis.
    pub fn deposit(&mut self, kind: BucketKind, amount: f64) {
        let amount = amount.max(0.0);
        match kind {
            BucketKind::CashEquivalents => self.cash_equivalents += amount,
            BucketKind::CapitalGains => {
                self.capital_gains += amount;
                self.cost_basis += amount;
            }
            BucketKind::TaxDeferred => self.tax_deferred += amount,
            BucketKind::TaxFree => self.tax_free += amount,
        }
        self.settle();
    }

    /// Apply one period of growth. `invested` applies to the three invested
    /// buckets, `cash` to cash equivalents. Basis is unaffected.
    pub fn grow(&mut self, invested: f64, cash: f64) {
        self.tax_deferred *= invested;
        self.tax_free *= invested;
        self.capital_gains *= invested;
        self.cash_equivalents *= cash;
        self.settle();
    }

    /// Zero every bucket (used once a scenario is depleted)
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Check the bucket invariant: every balance non-negative and the total
    /// equal to their sum
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        let sum = self.tax_deferred + self.tax_free + self.capital_gains + self.cash_equivalents;
        self.tax_deferred >= 0.0
            && self.tax_free >= 0.0
            && self.capital_gains >= 0.0
            && self.cash_equivalents >= 0.0
            && (sum - self.total_assets).abs() <= 1e-6 * sum.max(1.0)
    }

    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.tax_deferred.is_finite()
            && self.tax_free.is_finite()
            && self.capital_gains.is_finite()
            && self.cost_basis.is_finite()
            && self.cash_equivalents.is_finite()
    }

    fn settle(&mut self) {
        // Sub-cent residue from floating point is treated as empty
        for balance in [
            &mut self.tax_deferred,
            &mut self.tax_free,
            &mut self.capital_gains,
            &mut self.cash_equivalents,
        ] {
            if *balance < 1e-9 {
                *balance = 0.0;
            }
        }
        // Basis may exceed value (unrealized loss) but never outlives the bucket
        if self.capital_gains == 0.0 || self.cost_basis < 0.0 {
            self.cost_basis = 0.0;
        }
        self.total_assets =
            self.tax_deferred + self.tax_free + self.capital_gains + self.cash_equivalents;
    }
}
