//! Simulation Builder
//!
//! Fluent construction of validated `SimulationParams`.
//!
//! # Example
//!
//! ```ignore
//! use glidepath_core::config::{PersonBuilder, SimulationBuilder};
//!
//! let params = SimulationBuilder::new()
//!     .as_of(2025, 1, 1)
//!     .primary(PersonBuilder::new(50)
//!         .retire_at(65)
//!         .life_expectancy(85)
//!         .pension(20_000.0, 65))
//!     .assets(700_000.0, 200_000.0, 100_000.0, 60_000.0, 0.0)
//!     .single_portfolio(0.07, 0.12)
//!     .living_expenses(50_000.0)
//!     .build()?;
//! ```

use jiff::civil::Date;

use crate::error::ConfigError;
use crate::model::{
    AssetBuckets, BucketBalances, Contributions, ExpenseSchedule, FilingStatus, Gender, GuardrailConfig,
    HealthStatus, LtcAssumptions, LtcInsurance, MarketAssumptions, OneTimeExpense,
    PartTimeIncome, Pension, Person, RegimeModel, SimulationParams, SocialSecurity,
    WithdrawalTiming,
};

/// Builder for one household member
#[derive(Debug, Clone)]
pub struct PersonBuilder {
    person: Person,
}

impl PersonBuilder {
    /// Start from the member's age on the `as_of` date. Defaults: retire at
    /// 65, plan to 90, no income streams.
    #[must_use]
    pub fn new(current_age: u8) -> Self {
        Self {
            person: Person {
                current_age,
                birth_date: None,
                retirement_age: 65,
                life_expectancy: 90,
                gender: Gender::default(),
                health: HealthStatus::default(),
                wages: 0.0,
                social_security: None,
                pension: None,
                part_time: None,
                ltc_insurance: None,
            },
        }
    }

    #[must_use]
    pub fn birth_date(mut self, year: i16, month: i8, day: i8) -> Self {
        self.person.birth_date = Some(jiff::civil::date(year, month, day));
        self
    }

    #[must_use]
    pub fn retire_at(mut self, age: u8) -> Self {
        self.person.retirement_age = age;
        self
    }

    #[must_use]
    pub fn life_expectancy(mut self, age: u8) -> Self {
        self.person.life_expectancy = age;
        self
    }

    #[must_use]
    pub fn gender(mut self, gender: Gender) -> Self {
        self.person.gender = gender;
        self
    }

    #[must_use]
    pub fn health(mut self, health: HealthStatus) -> Self {
        self.person.health = health;
        self
    }

    #[must_use]
    pub fn wages(mut self, annual: f64) -> Self {
        self.person.wages = annual;
        self
    }

    /// Benefit payable at full retirement age, claimed at `claim_age`
    #[must_use]
    pub fn social_security(mut self, benefit_at_fra: f64, claim_age: u8) -> Self {
        self.person.social_security = Some(SocialSecurity {
            benefit_at_full_retirement_age: benefit_at_fra,
            claim_age,
        });
        self
    }

    /// Flat pension with no COLA or survivor benefit
    #[must_use]
    pub fn pension(self, annual: f64, start_age: u8) -> Self {
        self.pension_with(Pension {
            annual_amount: annual,
            start_age,
            cola: 0.0,
            survivor_fraction: 0.0,
        })
    }

    #[must_use]
    pub fn pension_with(mut self, pension: Pension) -> Self {
        self.person.pension = Some(pension);
        self
    }

    #[must_use]
    pub fn part_time(mut self, annual: f64, start_age: u8, end_age: u8) -> Self {
        self.person.part_time = Some(PartTimeIncome {
            annual_amount: annual,
            start_age,
            end_age,
        });
        self
    }

    #[must_use]
    pub fn ltc_insurance(mut self, policy: LtcInsurance) -> Self {
        self.person.ltc_insurance = Some(policy);
        self
    }

    #[must_use]
    pub fn build(self) -> Person {
        self.person
    }
}

/// Builder for `SimulationParams`
#[derive(Debug, Clone)]
pub struct SimulationBuilder {
    as_of: Date,
    policy_year: i16,
    primary: Option<Person>,
    spouse: Option<Person>,
    filing_status: Option<FilingStatus>,
    state: String,
    assets: BucketBalances,
    contributions: Contributions,
    market: MarketAssumptions,
    expenses: ExpenseSchedule,
    inflation_rate: f64,
    use_guardrails: bool,
    guardrails: GuardrailConfig,
    withdrawal_timing: WithdrawalTiming,
    ltc: LtcAssumptions,
    prior_magi: Vec<f64>,
    seed: Option<u64>,
}

impl Default for SimulationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulationBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            as_of: jiff::civil::date(2025, 1, 1),
            policy_year: 2024,
            primary: None,
            spouse: None,
            filing_status: None,
            state: "TX".to_string(),
            assets: BucketBalances::default(),
            contributions: Contributions::default(),
            market: MarketAssumptions::default(),
            expenses: ExpenseSchedule::living_only(0.0),
            inflation_rate: 0.025,
            use_guardrails: false,
            guardrails: GuardrailConfig::default(),
            withdrawal_timing: WithdrawalTiming::default(),
            ltc: LtcAssumptions::default(),
            prior_magi: Vec::new(),
            seed: None,
        }
    }

    // =========================================================================
    // Household
    // =========================================================================

    #[must_use]
    pub fn as_of(mut self, year: i16, month: i8, day: i8) -> Self {
        self.as_of = jiff::civil::date(year, month, day);
        self
    }

    #[must_use]
    pub fn as_of_date(mut self, date: Date) -> Self {
        self.as_of = date;
        self
    }

    #[must_use]
    pub fn policy_year(mut self, year: i16) -> Self {
        self.policy_year = year;
        self
    }

    #[must_use]
    pub fn primary(mut self, person: PersonBuilder) -> Self {
        self.primary = Some(person.build());
        self
    }

    /// Adding a spouse defaults the filing status to married filing jointly
    #[must_use]
    pub fn spouse(mut self, person: PersonBuilder) -> Self {
        self.spouse = Some(person.build());
        self
    }

    #[must_use]
    pub fn filing_status(mut self, status: FilingStatus) -> Self {
        self.filing_status = Some(status);
        self
    }

    #[must_use]
    pub fn state(mut self, code: &str) -> Self {
        self.state = code.to_string();
        self
    }

    // =========================================================================
    // Assets & savings
    // =========================================================================

    #[must_use]
    pub fn assets(
        mut self,
        tax_deferred: f64,
        tax_free: f64,
        capital_gains: f64,
        cost_basis: f64,
        cash_equivalents: f64,
    ) -> Self {
        self.assets = BucketBalances {
            tax_deferred,
            tax_free,
            capital_gains,
            cost_basis,
            cash_equivalents,
        };
        self
    }

    #[must_use]
    pub fn contributions(mut self, tax_deferred: f64, tax_free: f64, taxable: f64) -> Self {
        self.contributions = Contributions {
            tax_deferred,
            tax_free,
            taxable,
        };
        self
    }

    // =========================================================================
    // Market
    // =========================================================================

    #[must_use]
    pub fn market(mut self, market: MarketAssumptions) -> Self {
        self.market = market;
        self
    }

    /// Single risky portfolio with the given arithmetic mean and volatility
    #[must_use]
    pub fn single_portfolio(mut self, expected_return: f64, volatility: f64) -> Self {
        self.market = MarketAssumptions::single_portfolio(expected_return, volatility);
        self
    }

    #[must_use]
    pub fn regimes(mut self, regimes: RegimeModel) -> Self {
        self.market.regimes = Some(regimes);
        self
    }

    #[must_use]
    pub fn inflation(mut self, rate: f64) -> Self {
        self.inflation_rate = rate;
        self
    }

    // =========================================================================
    // Spending
    // =========================================================================

    #[must_use]
    pub fn living_expenses(mut self, annual: f64) -> Self {
        self.expenses.living = annual;
        self
    }

    #[must_use]
    pub fn healthcare(mut self, pre_medicare: f64, medicare: f64) -> Self {
        self.expenses.healthcare_pre_medicare = pre_medicare;
        self.expenses.healthcare_medicare = medicare;
        self
    }

    #[must_use]
    pub fn housing(mut self, annual: f64, end_age: Option<u8>) -> Self {
        self.expenses.housing = annual;
        self.expenses.housing_end_age = end_age;
        self
    }

    #[must_use]
    pub fn one_time_expense(mut self, age: u8, amount: f64) -> Self {
        self.expenses.one_time.push(OneTimeExpense { age, amount });
        self
    }

    #[must_use]
    pub fn expenses(mut self, expenses: ExpenseSchedule) -> Self {
        self.expenses = expenses;
        self
    }

    #[must_use]
    pub fn guardrails(mut self, enabled: bool) -> Self {
        self.use_guardrails = enabled;
        self
    }

    #[must_use]
    pub fn guardrail_config(mut self, config: GuardrailConfig) -> Self {
        self.guardrails = config;
        self
    }

    #[must_use]
    pub fn withdrawal_timing(mut self, timing: WithdrawalTiming) -> Self {
        self.withdrawal_timing = timing;
        self
    }

    // =========================================================================
    // Risks & run settings
    // =========================================================================

    #[must_use]
    pub fn ltc(mut self, assumptions: LtcAssumptions) -> Self {
        self.ltc = assumptions;
        self
    }

    #[must_use]
    pub fn prior_magi(mut self, history: Vec<f64>) -> Self {
        self.prior_magi = history;
        self
    }

    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Assemble and validate
    pub fn build(self) -> Result<SimulationParams, ConfigError> {
        let primary = self.primary.ok_or(ConfigError::InvalidValue {
            field: "primary",
            value: 0.0,
            reason: "a primary household member is required",
        })?;
        let filing_status = self.filing_status.unwrap_or(if self.spouse.is_some() {
            FilingStatus::MarriedFilingJointly
        } else {
            FilingStatus::Single
        });

        let params = SimulationParams {
            as_of: self.as_of,
            policy_year: self.policy_year,
            primary,
            spouse: self.spouse,
            filing_status,
            state: self.state,
            assets: AssetBuckets::try_from(self.assets)?,
            contributions: self.contributions,
            market: self.market,
            expenses: self.expenses,
            inflation_rate: self.inflation_rate,
            use_guardrails: self.use_guardrails,
            guardrails: self.guardrails,
            withdrawal_timing: self.withdrawal_timing,
            ltc: self.ltc,
            prior_magi: self.prior_magi,
            seed: self.seed,
        };
        params.validate()?;
        Ok(params)
    }
}
