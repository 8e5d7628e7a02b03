//! Simulation inputs
//!
//! `SimulationParams` is built once by the caller and shared read-only by
//! every trial. Amounts are annual and expressed in `as_of` dollars unless a
//! field says otherwise.

use jiff::civil::Date;
use serde::{Deserialize, Serialize};

use super::buckets::AssetBuckets;
use super::ids::PersonId;
use super::ltc::{Gender, HealthStatus, LtcAssumptions, LtcInsurance};
use super::market::MarketAssumptions;
use super::tax_config::FilingStatus;
use crate::error::ConfigError;

fn default_policy_year() -> i16 {
    2024
}

/// When in the year the withdrawal happens relative to that year's growth
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalTiming {
    /// Withdraw, then grow the remainder for the full year
    #[default]
    Start,
    /// Grow half a year, withdraw, grow the other half
    Mid,
    /// Grow the full balance, then withdraw
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SocialSecurity {
    /// Annual benefit if claimed at full retirement age
    pub benefit_at_full_retirement_age: f64,
    pub claim_age: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Pension {
    /// Annual amount at `start_age` (nominal, not inflation adjusted)
    pub annual_amount: f64,
    pub start_age: u8,
    /// Annual cost-of-living adjustment once payments start
    #[serde(default)]
    pub cola: f64,
    /// Fraction paid to a surviving spouse
    #[serde(default)]
    pub survivor_fraction: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PartTimeIncome {
    pub annual_amount: f64,
    pub start_age: u8,
    /// Last age (inclusive) with part-time income
    pub end_age: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Person {
    pub current_age: u8,
    /// When present, the age is derived from `as_of` instead of `current_age`
    #[serde(default)]
    pub birth_date: Option<Date>,
    pub retirement_age: u8,
    pub life_expectancy: u8,
    #[serde(default)]
    pub gender: Gender,
    #[serde(default)]
    pub health: HealthStatus,
    /// Gross wages while working
    #[serde(default)]
    pub wages: f64,
    #[serde(default)]
    pub social_security: Option<SocialSecurity>,
    #[serde(default)]
    pub pension: Option<Pension>,
    #[serde(default)]
    pub part_time: Option<PartTimeIncome>,
    #[serde(default)]
    pub ltc_insurance: Option<LtcInsurance>,
}

impl Person {
    /// Age on the reference date
    #[must_use]
    pub fn age_as_of(&self, as_of: Date) -> u8 {
        let Some(birth) = self.birth_date else {
            return self.current_age;
        };
        let years = as_of.year() - birth.year();
        let before_birthday = (as_of.month(), as_of.day()) < (birth.month(), birth.day());
        let age = if before_birthday { years - 1 } else { years };
        age.clamp(0, i16::from(u8::MAX)) as u8
    }
}

/// Annual savings while working
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Contributions {
    #[serde(default)]
    pub tax_deferred: f64,
    #[serde(default)]
    pub tax_free: f64,
    #[serde(default)]
    pub taxable: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OneTimeExpense {
    /// Primary member's age in the year of the expense
    pub age: u8,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExpenseSchedule {
    /// Household living expenses
    pub living: f64,
    /// Per-person healthcare cost before Medicare eligibility
    #[serde(default)]
    pub healthcare_pre_medicare: f64,
    /// Per-person out-of-pocket healthcare once on Medicare (premiums are
    /// added separately)
    #[serde(default)]
    pub healthcare_medicare: f64,
    /// Healthcare inflation; general inflation when absent
    #[serde(default)]
    pub healthcare_inflation: Option<f64>,
    /// Housing cost (mortgage, rent) in nominal dollars
    #[serde(default)]
    pub housing: f64,
    /// Primary member's age when housing cost ends (e.g. mortgage payoff)
    #[serde(default)]
    pub housing_end_age: Option<u8>,
    #[serde(default)]
    pub one_time: Vec<OneTimeExpense>,
}

impl ExpenseSchedule {
    #[must_use]
    pub fn living_only(living: f64) -> Self {
        Self {
            living,
            healthcare_pre_medicare: 0.0,
            healthcare_medicare: 0.0,
            healthcare_inflation: None,
            housing: 0.0,
            housing_end_age: None,
            one_time: Vec::new(),
        }
    }
}

/// Guyton-Klinger tuning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GuardrailConfig {
    /// Capital preservation fires when the rate exceeds initial × (1 + band)
    pub upper_band: f64,
    /// Prosperity fires when the rate falls below initial × (1 − band)
    pub lower_band: f64,
    pub cut: f64,
    pub raise: f64,
    /// Smaller cut applied by the portfolio-management rule
    pub portfolio_management_cut: f64,
    /// Capital preservation is disabled in the final years of the plan
    pub preservation_sunset_years: u8,
}

impl Default for GuardrailConfig {
    fn default() -> Self {
        Self {
            upper_band: 0.20,
            lower_band: 0.20,
            cut: 0.10,
            raise: 0.10,
            portfolio_management_cut: 0.05,
            preservation_sunset_years: 15,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulationParams {
    /// Reference date for ages and dollar amounts
    pub as_of: Date,
    /// Selects the tax tables
    #[serde(default = "default_policy_year")]
    pub policy_year: i16,
    pub primary: Person,
    #[serde(default)]
    pub spouse: Option<Person>,
    #[serde(default)]
    pub filing_status: FilingStatus,
    /// Two-letter state of residence
    pub state: String,
    /// Starting balances
    pub assets: AssetBuckets,
    #[serde(default)]
    pub contributions: Contributions,
    #[serde(default)]
    pub market: MarketAssumptions,
    pub expenses: ExpenseSchedule,
    pub inflation_rate: f64,
    #[serde(default)]
    pub use_guardrails: bool,
    #[serde(default)]
    pub guardrails: GuardrailConfig,
    #[serde(default)]
    pub withdrawal_timing: WithdrawalTiming,
    #[serde(default)]
    pub ltc: LtcAssumptions,
    /// MAGI for the years before `as_of`, oldest first; seeds the IRMAA
    /// two-year lookback
    #[serde(default)]
    pub prior_magi: Vec<f64>,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl SimulationParams {
    /// Decode from JSON. Type mismatches (e.g. a number sent as a string)
    /// are rejected, never coerced.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let params: Self = serde_json::from_str(json)?;
        params.validate()?;
        Ok(params)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Household members present in the plan
    pub fn members(&self) -> impl Iterator<Item = (PersonId, &Person)> {
        std::iter::once((PersonId::Primary, &self.primary))
            .chain(self.spouse.as_ref().map(|s| (PersonId::Spouse, s)))
    }

    /// Years from `as_of` until the last member reaches life expectancy
    pub fn horizon_years(&self) -> Result<usize, ConfigError> {
        let mut horizon = 0i32;
        for (_, person) in self.members() {
            let age = person.age_as_of(self.as_of);
            horizon = horizon.max(i32::from(person.life_expectancy) - i32::from(age));
        }
        if horizon <= 0 {
            return Err(ConfigError::NonPositiveHorizon {
                current_age: self.primary.age_as_of(self.as_of),
                life_expectancy: self.primary.life_expectancy,
            });
        }
        Ok(horizon as usize)
    }
}
