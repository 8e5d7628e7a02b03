//! Correlated annual asset-class returns
//!
//! The covariance matrix is factored once per configuration. Each year the
//! generator draws independent standard normals `z` and returns `μ + L·z`,
//! optionally shifted and scaled by the current market regime.

use rand::Rng;
use rand_distr::{Distribution, StandardNormal};

use crate::error::ConfigError;
use crate::model::{AssetClass, MarketAssumptions, NUM_ASSET_CLASSES, Regime, RegimeModel};

type Matrix = [[f64; NUM_ASSET_CLASSES]; NUM_ASSET_CLASSES];

/// Lower-triangular Cholesky factor `L` with `A = L·Lᵀ`.
///
/// Positive semi-definite matrices with zero pivots (e.g. a riskless class)
/// are accepted as long as the rest of the column is also zero; anything
/// else fails with `NotPositiveSemiDefinite`.
pub fn cholesky(matrix: &Matrix) -> Result<Matrix, ConfigError> {
    let n = NUM_ASSET_CLASSES;
    let scale = (0..n).map(|i| matrix[i][i].abs()).fold(0.0, f64::max).max(1e-300);
    let tol = 1e-12 * scale;
    let mut l = [[0.0; NUM_ASSET_CLASSES]; NUM_ASSET_CLASSES];

    for j in 0..n {
        let mut sum = 0.0;
        for k in 0..j {
            sum += l[j][k] * l[j][k];
        }
        let pivot = matrix[j][j] - sum;
        if !pivot.is_finite() || pivot < -tol {
            return Err(ConfigError::NotPositiveSemiDefinite { row: j, pivot });
        }

        if pivot <= tol {
            // Zero pivot: the column below must have no residual either
            for i in (j + 1)..n {
                let mut s = 0.0;
                for k in 0..j {
                    s += l[i][k] * l[j][k];
                }
                let residual = matrix[i][j] - s;
                if residual.abs() > 1e-9 * scale.sqrt() {
                    return Err(ConfigError::NotPositiveSemiDefinite { row: i, pivot });
                }
            }
            continue;
        }

        let d = pivot.sqrt();
        l[j][j] = d;
        for i in (j + 1)..n {
            let mut s = 0.0;
            for k in 0..j {
                s += l[i][k] * l[j][k];
            }
            l[i][j] = (matrix[i][j] - s) / d;
        }
    }
    Ok(l)
}

/// One year's draw
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YearReturns {
    /// Per-class returns in `AssetClass::index` order
    pub classes: [f64; NUM_ASSET_CLASSES],
    /// Target-weighted return applied to the invested buckets
    pub portfolio: f64,
    /// Return on the cash-equivalents bucket
    pub cash: f64,
    /// Regime the draw was made in
    pub regime: Regime,
}

/// Immutable per-configuration return model, shared by every trial
#[derive(Debug, Clone)]
pub struct ReturnGenerator {
    means: [f64; NUM_ASSET_CLASSES],
    factor: Matrix,
    weights: [f64; NUM_ASSET_CLASSES],
    regimes: Option<RegimeModel>,
}

impl ReturnGenerator {
    /// Validate the assumptions and factor the covariance matrix
    pub fn new(market: &MarketAssumptions) -> Result<Self, ConfigError> {
        market.validate()?;
        let covariance = market.covariance()?;
        let factor = cholesky(&covariance)?;
        Ok(Self {
            means: market.means(),
            factor,
            weights: market.allocation.weights(),
            regimes: market.regimes.clone(),
        })
    }

    /// Draw one year of returns and advance the regime chain.
    ///
    /// Always consumes the same number of random values per call (four
    /// normals, plus one uniform when regimes are enabled) so trials stay
    /// aligned regardless of portfolio state.
    pub fn next_year<R: Rng + ?Sized>(&self, rng: &mut R, regime: &mut Regime) -> YearReturns {
        let z: [f64; NUM_ASSET_CLASSES] =
            std::array::from_fn(|_| StandardNormal.sample(rng));

        let (shift, multiplier) = match &self.regimes {
            Some(model) => {
                let effect = model.effect(*regime);
                (effect.mean_shift, effect.volatility_multiplier)
            }
            None => ([0.0; NUM_ASSET_CLASSES], 1.0),
        };

        let mut classes = [0.0; NUM_ASSET_CLASSES];
        for i in 0..NUM_ASSET_CLASSES {
            let mut shock = 0.0;
            for j in 0..=i {
                shock += self.factor[i][j] * z[j];
            }
            classes[i] = (self.means[i] + shift[i] + multiplier * shock).max(-1.0);
        }

        let drawn_in = *regime;
        if let Some(model) = &self.regimes {
            *regime = next_regime(model, *regime, rng.random::<f64>());
        }

        let portfolio = classes
            .iter()
            .zip(self.weights.iter())
            .map(|(r, w)| r * w)
            .sum::<f64>()
            .max(-1.0);

        YearReturns {
            classes,
            portfolio,
            cash: classes[AssetClass::Cash.index()],
            regime: drawn_in,
        }
    }
}

fn next_regime(model: &RegimeModel, current: Regime, u: f64) -> Regime {
    let row = &model.transitions[current.index()];
    let mut cumulative = 0.0;
    for regime in Regime::ALL {
        cumulative += row[regime.index()];
        if u < cumulative {
            return regime;
        }
    }
    // Rounding left u above the last cumulative sum
    Regime::ALL
        .into_iter()
        .rev()
        .find(|r| row[r.index()] > 0.0)
        .unwrap_or(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn reconstruct(l: &Matrix) -> Matrix {
        let mut a = [[0.0; NUM_ASSET_CLASSES]; NUM_ASSET_CLASSES];
        for i in 0..NUM_ASSET_CLASSES {
            for j in 0..NUM_ASSET_CLASSES {
                for k in 0..NUM_ASSET_CLASSES {
                    a[i][j] += l[i][k] * l[j][k];
                }
            }
        }
        a
    }

    #[test]
    fn test_cholesky_reconstructs_covariance() {
        let cov = MarketAssumptions::default().covariance().unwrap();
        let l = cholesky(&cov).unwrap();
        let back = reconstruct(&l);
        for i in 0..NUM_ASSET_CLASSES {
            for j in 0..NUM_ASSET_CLASSES {
                assert!((back[i][j] - cov[i][j]).abs() < 1e-12);
                if j > i {
                    assert_eq!(l[i][j], 0.0);
                }
            }
        }
    }

    #[test]
    fn test_cholesky_accepts_riskless_class() {
        let market = MarketAssumptions::single_portfolio(0.07, 0.12);
        let mut cov = market.covariance().unwrap();
        // Zero out correlations with the riskless cash class
        for i in 0..NUM_ASSET_CLASSES {
            cov[2][i] = 0.0;
            cov[i][2] = 0.0;
        }
        let l = cholesky(&cov).unwrap();
        assert_eq!(l[2][2], 0.0);
    }

    #[test]
    fn test_cholesky_rejects_indefinite() {
        let mut market = MarketAssumptions::default();
        // Pairwise-plausible but jointly impossible correlations
        market.correlation = vec![
            vec![1.0, 0.9, 0.0, -0.9],
            vec![0.9, 1.0, 0.0, 0.9],
            vec![0.0, 0.0, 1.0, 0.0],
            vec![-0.9, 0.9, 0.0, 1.0],
        ];
        let cov = market.covariance().unwrap();
        assert!(matches!(
            cholesky(&cov),
            Err(ConfigError::NotPositiveSemiDefinite { .. })
        ));
        assert!(ReturnGenerator::new(&market).is_err());
    }

    #[test]
    fn test_zero_volatility_is_deterministic() {
        let generator = ReturnGenerator::new(&MarketAssumptions::single_portfolio(0.05, 0.0)).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let mut regime = Regime::Bull;
        for _ in 0..10 {
            let year = generator.next_year(&mut rng, &mut regime);
            assert!((year.portfolio - 0.05).abs() < 1e-12);
            assert!((year.cash - 0.03).abs() < 1e-12);
        }
    }

    #[test]
    fn test_sample_moments_match_assumptions() {
        let generator = ReturnGenerator::new(&MarketAssumptions::default()).unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        let mut regime = Regime::Bull;
        let n = 20_000;
        let draws: Vec<[f64; NUM_ASSET_CLASSES]> = (0..n)
            .map(|_| generator.next_year(&mut rng, &mut regime).classes)
            .collect();

        let mean = |k: usize| draws.iter().map(|d| d[k]).sum::<f64>() / n as f64;
        let (m0, m3) = (mean(0), mean(3));
        assert!((m0 - 0.095).abs() < 0.01);

        let cov03 = draws.iter().map(|d| (d[0] - m0) * (d[3] - m3)).sum::<f64>() / n as f64;
        let corr = cov03 / (0.17 * 0.12);
        assert!((corr - 0.60).abs() < 0.05, "corr = {corr}");
    }

    #[test]
    fn test_regimes_start_in_bull_and_transition() {
        let market = MarketAssumptions {
            regimes: Some(RegimeModel::us_equity_cycle()),
            ..MarketAssumptions::default()
        };
        let generator = ReturnGenerator::new(&market).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let mut regime = Regime::default();

        let first = generator.next_year(&mut rng, &mut regime);
        assert_eq!(first.regime, Regime::Bull);

        let mut seen_non_bull = false;
        for _ in 0..200 {
            if generator.next_year(&mut rng, &mut regime).regime != Regime::Bull {
                seen_non_bull = true;
            }
        }
        assert!(seen_non_bull);
    }

    #[test]
    fn test_next_regime_walks_cumulative_row() {
        let model = RegimeModel::us_equity_cycle();
        assert_eq!(next_regime(&model, Regime::Bull, 0.10), Regime::Bull);
        assert_eq!(next_regime(&model, Regime::Bull, 0.90), Regime::Bear);
        assert_eq!(next_regime(&model, Regime::Bull, 0.97), Regime::Recession);
    }
}
