//! Capital-market assumptions: per-class return/volatility, correlations,
//! target allocation and the optional market-regime chain.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const NUM_ASSET_CLASSES: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetClass {
    Equity,
    Bonds,
    Cash,
    Alternatives,
}

impl AssetClass {
    pub const ALL: [AssetClass; NUM_ASSET_CLASSES] = [
        AssetClass::Equity,
        AssetClass::Bonds,
        AssetClass::Cash,
        AssetClass::Alternatives,
    ];

    #[must_use]
    pub fn index(self) -> usize {
        match self {
            AssetClass::Equity => 0,
            AssetClass::Bonds => 1,
            AssetClass::Cash => 2,
            AssetClass::Alternatives => 3,
        }
    }
}

/// Expected annual arithmetic return and volatility of one asset class
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassAssumption {
    pub expected_return: f64,
    pub volatility: f64,
}

impl ClassAssumption {
    #[must_use]
    pub const fn new(expected_return: f64, volatility: f64) -> Self {
        Self {
            expected_return,
            volatility,
        }
    }
}

/// Target weights across the four classes (must sum to one)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub stocks: f64,
    pub bonds: f64,
    pub cash: f64,
    pub alternatives: f64,
}

impl Allocation {
    #[must_use]
    pub fn weights(&self) -> [f64; NUM_ASSET_CLASSES] {
        [self.stocks, self.bonds, self.cash, self.alternatives]
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        let weights = self.weights();
        let sum: f64 = weights.iter().sum();
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) || (sum - 1.0).abs() > 1e-6 {
            return Err(ConfigError::InvalidWeights { sum });
        }
        Ok(())
    }
}

impl Default for Allocation {
    fn default() -> Self {
        Self {
            stocks: 0.6,
            bonds: 0.35,
            cash: 0.05,
            alternatives: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Regime {
    #[default]
    Bull,
    Bear,
    Recession,
}

impl Regime {
    pub const ALL: [Regime; 3] = [Regime::Bull, Regime::Bear, Regime::Recession];

    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Regime::Bull => 0,
            Regime::Bear => 1,
            Regime::Recession => 2,
        }
    }
}

/// How a regime modifies the base draw
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegimeEffect {
    /// Added to each class's expected return (equity, bonds, cash, alternatives)
    pub mean_shift: [f64; NUM_ASSET_CLASSES],
    /// Scales the correlated shock
    pub volatility_multiplier: f64,
}

/// Markov chain over market regimes.
///
/// `transitions[from][to]` is the annual probability of moving between
/// regimes, indexed by `Regime::index`. Rows must sum to one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeModel {
    pub bull: RegimeEffect,
    pub bear: RegimeEffect,
    pub recession: RegimeEffect,
    pub transitions: [[f64; 3]; 3],
}

impl RegimeModel {
    /// Long bull runs, short bear markets, occasional recessions
    #[must_use]
    pub fn us_equity_cycle() -> Self {
        Self {
            bull: RegimeEffect {
                mean_shift: [0.03, 0.0, 0.0, 0.015],
                volatility_multiplier: 0.8,
            },
            bear: RegimeEffect {
                mean_shift: [-0.12, 0.01, 0.0, -0.05],
                volatility_multiplier: 1.4,
            },
            recession: RegimeEffect {
                mean_shift: [-0.20, 0.02, -0.005, -0.08],
                volatility_multiplier: 1.7,
            },
            transitions: [[0.85, 0.10, 0.05], [0.45, 0.40, 0.15], [0.40, 0.25, 0.35]],
        }
    }

    #[must_use]
    pub fn effect(&self, regime: Regime) -> &RegimeEffect {
        match regime {
            Regime::Bull => &self.bull,
            Regime::Bear => &self.bear,
            Regime::Recession => &self.recession,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        for row in &self.transitions {
            let sum: f64 = row.iter().sum();
            if row.iter().any(|p| !p.is_finite() || *p < 0.0) || (sum - 1.0).abs() > 1e-6 {
                return Err(ConfigError::InvalidValue {
                    field: "regimes.transitions",
                    value: sum,
                    reason: "each row must be a probability distribution",
                });
            }
        }
        for regime in Regime::ALL {
            let effect = self.effect(regime);
            if !effect.volatility_multiplier.is_finite() || effect.volatility_multiplier < 0.0 {
                return Err(ConfigError::InvalidValue {
                    field: "regimes.volatility_multiplier",
                    value: effect.volatility_multiplier,
                    reason: "must be non-negative and finite",
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketAssumptions {
    pub equity: ClassAssumption,
    pub bonds: ClassAssumption,
    pub cash: ClassAssumption,
    pub alternatives: ClassAssumption,
    /// 4×4 correlation matrix in `AssetClass::index` order
    pub correlation: Vec<Vec<f64>>,
    #[serde(default)]
    pub allocation: Allocation,
    #[serde(default)]
    pub regimes: Option<RegimeModel>,
    /// Deterministic yield used for sanity floors and reporting
    #[serde(default = "default_risk_free_rate")]
    pub risk_free_rate: f64,
}

fn default_risk_free_rate() -> f64 {
    0.03
}

impl Default for MarketAssumptions {
    fn default() -> Self {
        Self {
            equity: ClassAssumption::new(0.095, 0.17),
            bonds: ClassAssumption::new(0.045, 0.06),
            cash: ClassAssumption::new(0.03, 0.01),
            alternatives: ClassAssumption::new(0.07, 0.12),
            correlation: vec![
                vec![1.0, 0.10, 0.0, 0.60],
                vec![0.10, 1.0, 0.20, 0.15],
                vec![0.0, 0.20, 1.0, 0.0],
                vec![0.60, 0.15, 0.0, 1.0],
            ],
            allocation: Allocation::default(),
            regimes: None,
            risk_free_rate: default_risk_free_rate(),
        }
    }
}

impl MarketAssumptions {
    /// A single risky portfolio with the given mean and volatility; bonds,
    /// cash and alternatives are present but unweighted. Cash earns the
    /// risk-free rate with no volatility.
    #[must_use]
    pub fn single_portfolio(expected_return: f64, volatility: f64) -> Self {
        Self {
            equity: ClassAssumption::new(expected_return, volatility),
            cash: ClassAssumption::new(default_risk_free_rate(), 0.0),
            allocation: Allocation {
                stocks: 1.0,
                bonds: 0.0,
                cash: 0.0,
                alternatives: 0.0,
            },
            ..Self::default()
        }
    }

    #[must_use]
    pub fn class(&self, class: AssetClass) -> &ClassAssumption {
        match class {
            AssetClass::Equity => &self.equity,
            AssetClass::Bonds => &self.bonds,
            AssetClass::Cash => &self.cash,
            AssetClass::Alternatives => &self.alternatives,
        }
    }

    #[must_use]
    pub fn means(&self) -> [f64; NUM_ASSET_CLASSES] {
        AssetClass::ALL.map(|c| self.class(c).expected_return)
    }

    #[must_use]
    pub fn volatilities(&self) -> [f64; NUM_ASSET_CLASSES] {
        AssetClass::ALL.map(|c| self.class(c).volatility)
    }

    /// Covariance matrix `Σ = diag(σ)·ρ·diag(σ)` after validating the
    /// correlation matrix
    pub fn covariance(&self) -> Result<[[f64; NUM_ASSET_CLASSES]; NUM_ASSET_CLASSES], ConfigError> {
        let rho = &self.correlation;
        if rho.len() != NUM_ASSET_CLASSES || rho.iter().any(|row| row.len() != NUM_ASSET_CLASSES) {
            return Err(ConfigError::InvalidCorrelation {
                reason: format!("expected a {NUM_ASSET_CLASSES}x{NUM_ASSET_CLASSES} matrix"),
            });
        }

        let sigma = self.volatilities();
        let mut cov = [[0.0; NUM_ASSET_CLASSES]; NUM_ASSET_CLASSES];
        for i in 0..NUM_ASSET_CLASSES {
            if (rho[i][i] - 1.0).abs() > 1e-9 {
                return Err(ConfigError::InvalidCorrelation {
                    reason: format!("diagonal entry {i} is {}, expected 1", rho[i][i]),
                });
            }
            for j in 0..NUM_ASSET_CLASSES {
                let r = rho[i][j];
                if !r.is_finite() || !(-1.0..=1.0).contains(&r) {
                    return Err(ConfigError::InvalidCorrelation {
                        reason: format!("entry ({i}, {j}) = {r} is outside [-1, 1]"),
                    });
                }
                if (r - rho[j][i]).abs() > 1e-9 {
                    return Err(ConfigError::InvalidCorrelation {
                        reason: format!("entries ({i}, {j}) and ({j}, {i}) differ"),
                    });
                }
                cov[i][j] = r * sigma[i] * sigma[j];
            }
        }
        Ok(cov)
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        for class in AssetClass::ALL {
            let a = self.class(class);
            if !a.expected_return.is_finite() || a.expected_return <= -1.0 {
                return Err(ConfigError::InvalidValue {
                    field: "expected_return",
                    value: a.expected_return,
                    reason: "must be finite and greater than -100%",
                });
            }
            if !a.volatility.is_finite() || a.volatility < 0.0 {
                return Err(ConfigError::InvalidValue {
                    field: "volatility",
                    value: a.volatility,
                    reason: "must be non-negative and finite",
                });
            }
        }
        if !self.risk_free_rate.is_finite() {
            return Err(ConfigError::InvalidValue {
                field: "risk_free_rate",
                value: self.risk_free_rate,
                reason: "must be finite",
            });
        }
        self.allocation.validate()?;
        if let Some(regimes) = &self.regimes {
            regimes.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_assumptions_validate() {
        let market = MarketAssumptions::default();
        assert!(market.validate().is_ok());
        let cov = market.covariance().unwrap();
        assert!((cov[0][0] - 0.17 * 0.17).abs() < 1e-12);
        assert!((cov[0][3] - 0.60 * 0.17 * 0.12).abs() < 1e-12);
    }

    #[test]
    fn test_asymmetric_correlation_rejected() {
        let mut market = MarketAssumptions::default();
        market.correlation[0][1] = 0.5;
        assert!(matches!(
            market.covariance(),
            Err(ConfigError::InvalidCorrelation { .. })
        ));
    }

    #[test]
    fn test_weights_must_sum_to_one() {
        let mut market = MarketAssumptions::default();
        market.allocation.stocks = 0.9;
        assert!(matches!(
            market.validate(),
            Err(ConfigError::InvalidWeights { .. })
        ));
    }

    #[test]
    fn test_regime_rows_must_sum_to_one() {
        let mut regimes = RegimeModel::us_equity_cycle();
        assert!(regimes.validate().is_ok());
        regimes.transitions[1] = [0.5, 0.5, 0.5];
        assert!(regimes.validate().is_err());
    }
}
