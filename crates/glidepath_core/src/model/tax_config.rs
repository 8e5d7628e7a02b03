//! Tax policy tables
//!
//! Everything the tax and benefit calculators need is carried here and
//! selected by policy year, so a run is pinned to one vintage of tax law.
//! The figures in `TaxPolicy::us_2024` are illustrative.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::rmd::RmdTable;
use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FilingStatus {
    #[default]
    Single,
    MarriedFilingJointly,
}

/// A single bracket in a progressive tax system
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TaxBracket {
    /// Income threshold where this bracket begins
    pub threshold: f64,
    /// Marginal rate for income in this bracket (e.g., 0.22 for 22%)
    pub rate: f64,
}

/// A value that differs by filing status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilingTable<T> {
    pub single: T,
    pub married_joint: T,
}

impl<T> FilingTable<T> {
    #[must_use]
    pub fn get(&self, status: FilingStatus) -> &T {
        match status {
            FilingStatus::Single => &self.single,
            FilingStatus::MarriedFilingJointly => &self.married_joint,
        }
    }
}

/// Provisional-income thresholds for Social Security taxation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SocialSecurityThresholds {
    /// Above this, up to 50% of benefits become taxable
    pub base: f64,
    /// Above this, up to 85% of benefits become taxable
    pub adjusted_base: f64,
}

/// One IRMAA tier: MAGI above `magi_threshold` adds `monthly_surcharge`
/// (Part B + Part D) per Medicare beneficiary
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IrmaaTier {
    pub magi_threshold: f64,
    pub monthly_surcharge: f64,
}

/// Flat state income tax
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct StateTax {
    pub rate: f64,
    #[serde(default)]
    pub exempts_social_security: bool,
}

/// Complete table set for one policy year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxPolicy {
    pub year: i16,
    /// Federal ordinary-income brackets (sorted by threshold ascending)
    pub brackets: FilingTable<Vec<TaxBracket>>,
    pub standard_deduction: FilingTable<f64>,
    /// Extra deduction per taxpayer aged 65+
    pub senior_deduction: FilingTable<f64>,
    pub social_security: FilingTable<SocialSecurityThresholds>,
    pub niit_threshold: FilingTable<f64>,
    pub niit_rate: f64,
    /// Tiers sorted by threshold ascending
    pub irmaa: FilingTable<Vec<IrmaaTier>>,
    /// Standard annual Part B premium per beneficiary
    pub medicare_base_premium: f64,
    /// Age of Medicare eligibility
    pub medicare_age: u8,
    /// Long-term capital gains rate
    pub capital_gains_rate: f64,
    pub rmd_table: RmdTable,
    pub rmd_start_age: u8,
    /// Social Security full retirement age
    pub full_retirement_age: u8,
    pub states: FxHashMap<String, StateTax>,
}

impl TaxPolicy {
    #[must_use]
    pub fn us_2024() -> Self {
        let bracket = |threshold, rate| TaxBracket { threshold, rate };
        let tier = |magi_threshold, monthly_surcharge| IrmaaTier {
            magi_threshold,
            monthly_surcharge,
        };

        let mut states = FxHashMap::default();
        for (code, rate, exempts_social_security) in [
            ("AK", 0.0, true),
            ("FL", 0.0, true),
            ("NV", 0.0, true),
            ("TX", 0.0, true),
            ("WA", 0.0, true),
            ("AZ", 0.025, true),
            ("PA", 0.0307, true),
            ("IL", 0.0495, true),
            ("MA", 0.05, true),
            ("NY", 0.055, true),
            ("CO", 0.044, false),
            ("CA", 0.066, true),
        ] {
            states.insert(
                code.to_string(),
                StateTax {
                    rate,
                    exempts_social_security,
                },
            );
        }

        TaxPolicy {
            year: 2024,
            brackets: FilingTable {
                single: vec![
                    bracket(0.0, 0.10),
                    bracket(11_600.0, 0.12),
                    bracket(47_150.0, 0.22),
                    bracket(100_525.0, 0.24),
                    bracket(191_950.0, 0.32),
                    bracket(243_725.0, 0.35),
                    bracket(609_350.0, 0.37),
                ],
                married_joint: vec![
                    bracket(0.0, 0.10),
                    bracket(23_200.0, 0.12),
                    bracket(94_300.0, 0.22),
                    bracket(201_050.0, 0.24),
                    bracket(383_900.0, 0.32),
                    bracket(487_450.0, 0.35),
                    bracket(731_200.0, 0.37),
                ],
            },
            standard_deduction: FilingTable {
                single: 14_600.0,
                married_joint: 29_200.0,
            },
            senior_deduction: FilingTable {
                single: 1_950.0,
                married_joint: 1_550.0,
            },
            social_security: FilingTable {
                single: SocialSecurityThresholds {
                    base: 25_000.0,
                    adjusted_base: 34_000.0,
                },
                married_joint: SocialSecurityThresholds {
                    base: 32_000.0,
                    adjusted_base: 44_000.0,
                },
            },
            niit_threshold: FilingTable {
                single: 200_000.0,
                married_joint: 250_000.0,
            },
            niit_rate: 0.038,
            irmaa: FilingTable {
                single: vec![
                    tier(103_000.0, 82.80),
                    tier(129_000.0, 208.00),
                    tier(161_000.0, 333.30),
                    tier(193_000.0, 423.60),
                    tier(500_000.0, 500.30),
                ],
                married_joint: vec![
                    tier(206_000.0, 82.80),
                    tier(258_000.0, 208.00),
                    tier(322_000.0, 333.30),
                    tier(386_000.0, 423.60),
                    tier(750_000.0, 500.30),
                ],
            },
            medicare_base_premium: 174.70 * 12.0,
            medicare_age: 65,
            capital_gains_rate: 0.15,
            rmd_table: RmdTable::irs_uniform_lifetime_2024(),
            rmd_start_age: 73,
            full_retirement_age: 67,
            states,
        }
    }

    /// State entry for a two-letter code (case-insensitive)
    pub fn state(&self, code: &str) -> Result<&StateTax, ConfigError> {
        self.states
            .get(&code.to_ascii_uppercase())
            .ok_or_else(|| ConfigError::UnknownState(code.to_string()))
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        self.rmd_table.validate()?;
        for brackets in [&self.brackets.single, &self.brackets.married_joint] {
            if brackets.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "brackets",
                    value: 0.0,
                    reason: "at least one bracket is required",
                });
            }
            if brackets.windows(2).any(|w| w[1].threshold < w[0].threshold) {
                return Err(ConfigError::InvalidValue {
                    field: "brackets.threshold",
                    value: brackets[0].threshold,
                    reason: "brackets must be sorted by threshold",
                });
            }
        }
        for rate in [self.capital_gains_rate, self.niit_rate] {
            if !(0.0..1.0).contains(&rate) {
                return Err(ConfigError::InvalidValue {
                    field: "rate",
                    value: rate,
                    reason: "rates must be in [0, 1)",
                });
            }
        }
        Ok(())
    }
}

/// Tax policies keyed by policy year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyTables {
    policies: FxHashMap<i16, TaxPolicy>,
}

impl Default for PolicyTables {
    fn default() -> Self {
        Self::new().with_policy(TaxPolicy::us_2024())
    }
}

impl PolicyTables {
    /// Empty table set
    #[must_use]
    pub fn new() -> Self {
        Self {
            policies: FxHashMap::default(),
        }
    }

    /// Add (or replace) the policy for its year
    #[must_use]
    pub fn with_policy(mut self, policy: TaxPolicy) -> Self {
        self.policies.insert(policy.year, policy);
        self
    }

    /// Policy years on file, ascending
    #[must_use]
    pub fn years(&self) -> Vec<i16> {
        let mut years: Vec<i16> = self.policies.keys().copied().collect();
        years.sort_unstable();
        years
    }

    pub fn get(&self, year: i16) -> Result<&TaxPolicy, ConfigError> {
        self.policies
            .get(&year)
            .ok_or(ConfigError::UnknownPolicyYear(year))
    }
}
