//! Long-term-care assumptions, insurance policies and event records

use serde::{Deserialize, Serialize};

use super::ids::PersonId;
use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    #[default]
    Female,
    Male,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Excellent,
    #[default]
    Good,
    Fair,
    Poor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CareSetting {
    HomeCare,
    AssistedLiving,
    NursingHome,
}

/// Traditional LTC policy terms
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LtcInsurance {
    /// Days of care paid out of pocket before benefits start
    pub elimination_days: u16,
    /// Maximum daily benefit in `as_of` dollars
    pub daily_benefit: f64,
    /// Benefit pool expressed in years of maximum daily benefit
    pub benefit_period_years: f64,
    /// Compound inflation-protection rider (0.0 when absent)
    #[serde(default)]
    pub inflation_rider: f64,
}

/// Annual onset probability for ages at or above `min_age` (until the next
/// band)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IncidenceBand {
    pub min_age: u8,
    pub annual_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CareSettingProfile {
    pub setting: CareSetting,
    /// Probability this setting is chosen at onset
    pub probability: f64,
    pub mean_duration_years: f64,
    /// Mean annual cost in `as_of` dollars
    pub annual_cost: f64,
    /// Log-normal dispersion of the annual cost
    pub cost_dispersion: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LtcAssumptions {
    pub enabled: bool,
    /// Sorted by `min_age` ascending
    pub incidence: Vec<IncidenceBand>,
    pub female_multiplier: f64,
    pub male_multiplier: f64,
    /// Multipliers for excellent, good, fair, poor health
    pub health_multipliers: [f64; 4],
    pub settings: Vec<CareSettingProfile>,
    /// Annual growth of care costs
    pub cost_inflation: f64,
    pub max_duration_years: u8,
    pub max_episodes_per_person: u8,
    /// Countable assets below which Medicaid takes over care costs
    pub medicaid_asset_threshold: f64,
}

impl Default for LtcAssumptions {
    fn default() -> Self {
        Self {
            enabled: false,
            incidence: vec![
                IncidenceBand {
                    min_age: 0,
                    annual_rate: 0.002,
                },
                IncidenceBand {
                    min_age: 65,
                    annual_rate: 0.01,
                },
                IncidenceBand {
                    min_age: 75,
                    annual_rate: 0.03,
                },
                IncidenceBand {
                    min_age: 85,
                    annual_rate: 0.08,
                },
            ],
            female_multiplier: 1.2,
            male_multiplier: 1.0,
            health_multipliers: [0.6, 1.0, 1.5, 2.2],
            settings: vec![
                CareSettingProfile {
                    setting: CareSetting::HomeCare,
                    probability: 0.45,
                    mean_duration_years: 1.5,
                    annual_cost: 75_000.0,
                    cost_dispersion: 0.25,
                },
                CareSettingProfile {
                    setting: CareSetting::AssistedLiving,
                    probability: 0.30,
                    mean_duration_years: 2.0,
                    annual_cost: 64_000.0,
                    cost_dispersion: 0.20,
                },
                CareSettingProfile {
                    setting: CareSetting::NursingHome,
                    probability: 0.25,
                    mean_duration_years: 2.5,
                    annual_cost: 116_000.0,
                    cost_dispersion: 0.15,
                },
            ],
            cost_inflation: 0.04,
            max_duration_years: 10,
            max_episodes_per_person: 2,
            medicaid_asset_threshold: 2_000.0,
        }
    }
}

impl LtcAssumptions {
    /// Default assumptions with the modeler switched on
    #[must_use]
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn health_multiplier(&self, health: HealthStatus) -> f64 {
        let i = match health {
            HealthStatus::Excellent => 0,
            HealthStatus::Good => 1,
            HealthStatus::Fair => 2,
            HealthStatus::Poor => 3,
        };
        self.health_multipliers[i]
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if !self.enabled {
            return Ok(());
        }
        if self.incidence.is_empty() || self.settings.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "ltc",
                value: 0.0,
                reason: "incidence bands and care settings are required when LTC is enabled",
            });
        }
        let total: f64 = self.settings.iter().map(|s| s.probability).sum();
        if (total - 1.0).abs() > 1e-6 {
            return Err(ConfigError::InvalidValue {
                field: "ltc.settings.probability",
                value: total,
                reason: "care-setting probabilities must sum to 1",
            });
        }
        for s in &self.settings {
            if !(s.mean_duration_years > 0.0) || !(s.annual_cost >= 0.0) || !(s.cost_dispersion >= 0.0)
            {
                return Err(ConfigError::InvalidValue {
                    field: "ltc.settings",
                    value: s.mean_duration_years,
                    reason: "duration must be positive, cost and dispersion non-negative",
                });
            }
        }
        for band in &self.incidence {
            if !(0.0..=1.0).contains(&band.annual_rate) {
                return Err(ConfigError::InvalidValue {
                    field: "ltc.incidence.annual_rate",
                    value: band.annual_rate,
                    reason: "must be a probability",
                });
            }
        }
        if self.max_duration_years == 0 {
            return Err(ConfigError::InvalidValue {
                field: "ltc.max_duration_years",
                value: 0.0,
                reason: "must be at least one year",
            });
        }
        Ok(())
    }
}

/// One long-term-care episode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LtcEvent {
    pub person: PersonId,
    pub start_age: u8,
    pub duration_years: u8,
    pub setting: CareSetting,
    /// Cost of care in the first year of the episode (nominal)
    pub annual_cost: f64,
    /// Insurer-paid amount in the first year of the episode
    pub insurance_offset: f64,
    pub insurance_paid_total: f64,
    pub out_of_pocket_total: f64,
    pub medicaid_required: bool,
}
