//! Scenario simulator
//!
//! One trial walks every year from `as_of` to the end of the plan. Per
//! year: returns are drawn, guaranteed income and expenses (including care
//! costs) are computed, guardrails adjust the living budget, the sequencer
//! covers the need at the configured timing point, taxes are reconciled and
//! the record is appended.

use crate::benefits::{MemberYear, household_income};
use crate::error::{ConfigError, TrialError};
use crate::guardrails::{GuardrailEngine, GuardrailInput};
use crate::ltc::{LtcModeler, LtcYear, MemberContext};
use crate::model::{
    BucketKind, PersonId, Phase, PolicyTables, ScenarioResult, SimulationParams, StateTax,
    TaxBreakdown, TaxPolicy, WithdrawalTiming, YearlyCashFlow,
};
use crate::returns::ReturnGenerator;
use crate::simulation_state::ScenarioState;
use crate::taxes::{AnnualIncome, annual_tax, irmaa_surcharge, rmd_divisor};
use crate::withdrawal::{WithdrawalOutcome, WithdrawalRequest, sequence_withdrawal};

const MAX_AGE: usize = 120;

/// Everything a trial needs that does not change between trials: validated
/// params, the resolved tax policy and the factored return model.
#[derive(Debug, Clone)]
pub struct SimulationContext<'a> {
    pub params: &'a SimulationParams,
    pub policy: &'a TaxPolicy,
    pub state_tax: StateTax,
    pub returns: ReturnGenerator,
    pub horizon: usize,
    primary_age: u8,
    spouse_age: Option<u8>,
    /// RMD divisor by age, resolved once
    rmd_divisors: Vec<f64>,
}

impl<'a> SimulationContext<'a> {
    /// Validate inputs and resolve everything that can fail up front
    pub fn new(params: &'a SimulationParams, tables: &'a PolicyTables) -> Result<Self, ConfigError> {
        params.validate()?;
        let policy = tables.get(params.policy_year)?;
        policy.validate()?;
        let state_tax = *policy.state(&params.state)?;
        let returns = ReturnGenerator::new(&params.market)?;
        let horizon = params.horizon_years()?;

        let mut rmd_divisors = vec![0.0; MAX_AGE + 1];
        for (age, slot) in rmd_divisors.iter_mut().enumerate() {
            // Ages are at most 120, so the cast is lossless
            *slot = rmd_divisor(age as u8, &policy.rmd_table)?;
        }

        Ok(Self {
            params,
            policy,
            state_tax,
            returns,
            horizon,
            primary_age: params.primary.age_as_of(params.as_of),
            spouse_age: params.spouse.as_ref().map(|s| s.age_as_of(params.as_of)),
            rmd_divisors,
        })
    }

    fn members(&self, year: usize) -> Vec<MemberYear<'a>> {
        let offset = u8::try_from(year).unwrap_or(u8::MAX);
        let mut members = vec![member_year(&self.params.primary, self.primary_age, offset)];
        if let (Some(spouse), Some(age)) = (&self.params.spouse, self.spouse_age) {
            members.push(member_year(spouse, age, offset));
        }
        members
    }

    fn required_distribution(&self, owner_age: u8, balance: f64) -> f64 {
        if owner_age < self.policy.rmd_start_age || balance <= 0.0 {
            return 0.0;
        }
        let idx = usize::from(owner_age).min(MAX_AGE);
        balance / self.rmd_divisors[idx]
    }
}

fn member_year(person: &crate::model::Person, start_age: u8, offset: u8) -> MemberYear<'_> {
    let age = start_age.saturating_add(offset);
    MemberYear {
        person,
        age,
        alive: age < person.life_expectancy,
    }
}

fn check_finite(year: usize, field: &'static str, value: f64) -> Result<(), TrialError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(TrialError::NonFinite { year, field })
    }
}

/// Run one trial with its own seed
pub fn simulate(ctx: &SimulationContext<'_>, seed: u64) -> Result<ScenarioResult, TrialError> {
    let mut state = ScenarioState::new(ctx.params, ctx.horizon, seed);
    while !state.timeline.is_finished() {
        if state.phase == Phase::Depleted {
            record_depleted_year(ctx, &mut state);
        } else {
            simulate_year(ctx, &mut state)?;
        }
    }
    Ok(state.finish())
}

fn record_depleted_year(ctx: &SimulationContext<'_>, state: &mut ScenarioState) {
    let members = ctx.members(state.timeline.year);
    state.push_record(YearlyCashFlow {
        year: state.timeline.year,
        primary_age: members[0].age,
        spouse_age: members.get(1).map(|m| m.age),
        phase: Phase::Depleted,
        ..YearlyCashFlow::default()
    });
}

/// Spending lines for one year
#[derive(Debug, Clone, Copy, Default)]
struct Expenses {
    healthcare: f64,
    medicare: f64,
    irmaa: f64,
    housing: f64,
    one_time: f64,
    ltc: LtcYear,
}

impl Expenses {
    /// Everything except living expenses and income taxes
    fn non_living(&self) -> f64 {
        self.healthcare
            + self.medicare
            + self.irmaa
            + self.housing
            + self.one_time
            + self.ltc.out_of_pocket
    }
}

fn simulate_year(ctx: &SimulationContext<'_>, state: &mut ScenarioState) -> Result<(), TrialError> {
    let params = ctx.params;
    let policy = ctx.policy;
    let year = state.timeline.year;
    let t = i32::try_from(year).unwrap_or(i32::MAX);
    let inflation_factor = (1.0 + params.inflation_rate).powi(t);
    let healthcare_inflation = params.expenses.healthcare_inflation.unwrap_or(params.inflation_rate);
    let healthcare_factor = (1.0 + healthcare_inflation).powi(t);

    let members = ctx.members(year);
    let returns = ctx.returns.next_year(&mut state.rng, &mut state.portfolio.regime);

    // Phase for this year
    let working = members
        .iter()
        .any(|m| m.alive && m.age < m.person.retirement_age);
    let rmd_owner_age = members.iter().find(|m| m.alive).map_or(0, |m| m.age);
    state.phase = if working {
        Phase::Accumulation
    } else if rmd_owner_age >= policy.rmd_start_age {
        Phase::RetiredPostRmd
    } else {
        Phase::RetiredPreRmd
    };

    let start_balance = state.portfolio.buckets.total_assets();
    let rmd = ctx.required_distribution(rmd_owner_age, state.portfolio.buckets.tax_deferred());
    let income = household_income(&members, policy.full_retirement_age, inflation_factor);

    // Expenses
    let expenses = year_expenses(ctx, state, &members, healthcare_factor, inflation_factor);

    // Living budget, guarded once retired
    let scheduled_living = params.expenses.living * inflation_factor;
    let mut record = YearlyCashFlow {
        year,
        primary_age: members[0].age,
        spouse_age: members.get(1).map(|m| m.age),
        phase: state.phase,
        ..YearlyCashFlow::default()
    };
    let living = if params.use_guardrails && state.phase.is_retired() {
        let engine = GuardrailEngine::new(&params.guardrails);
        let decision = engine.evaluate(
            &mut state.spending,
            &GuardrailInput {
                scheduled_living,
                other_expenses: expenses.non_living(),
                portfolio: start_balance,
                inflation: params.inflation_rate,
                prior_return: state.portfolio.prior_return,
                years_remaining: state.timeline.years_remaining(),
            },
        );
        if let Some(rule) = decision.rule {
            state.history.guardrails.record(rule);
        }
        if decision.inflation_skipped {
            state.history.guardrails.inflation_skips += 1;
        }
        record.guardrail = decision.rule;
        record.inflation_skipped = decision.inflation_skipped;
        decision.living
    } else {
        scheduled_living
    };

    // Tax on guaranteed income is part of the need
    let seniors = members
        .iter()
        .filter(|m| m.alive && m.age >= policy.medicare_age)
        .count();
    let base_tax = annual_tax(
        &AnnualIncome {
            ordinary: income.ordinary(),
            social_security: income.social_security,
            capital_gains: 0.0,
            seniors,
        },
        params.filing_status,
        &ctx.state_tax,
        policy,
    );

    // Working households fund regular spending (and its tax) from wages;
    // only shocks and last year's tax true-up hit the portfolio.
    let need = if state.phase == Phase::Accumulation {
        expenses.one_time + expenses.ltc.out_of_pocket + state.taxes.true_up
    } else {
        living + expenses.non_living() + base_tax.total() + state.taxes.true_up - income.total()
    };
    check_finite(year, "need", need)?;
    let surplus = (-need).max(0.0);
    let need = need.max(0.0);

    let request = WithdrawalRequest {
        need,
        rmd,
        taxable_income: base_tax.ordinary_taxable,
        brackets: policy.brackets.get(params.filing_status),
        state_rate: ctx.state_tax.rate,
        capital_gains_rate: policy.capital_gains_rate,
    };
    let contribute = state.phase == Phase::Accumulation;
    let outcome = apply_timing(ctx, state, &request, surplus, contribute, &returns)?;

    // Reconcile the full-year bill against what was paid
    let full_tax = annual_tax(
        &AnnualIncome {
            ordinary: income.ordinary() + outcome.gross.tax_deferred,
            social_security: income.social_security,
            capital_gains: outcome.realized_gains,
            seniors,
        },
        params.filing_status,
        &ctx.state_tax,
        policy,
    );
    check_finite(year, "tax", full_tax.total())?;
    let true_up = full_tax.total() - base_tax.total() - outcome.withheld;
    state.taxes.true_up = true_up;
    state.taxes.magi_history.push(full_tax.magi / inflation_factor);
    state.portfolio.prior_return = Some(returns.portfolio);

    let buckets = state.portfolio.buckets;
    if !buckets.is_finite() {
        return Err(TrialError::NonFinite {
            year,
            field: "buckets",
        });
    }

    record.wages = income.wages;
    record.part_time = income.part_time;
    record.pension = income.pension;
    record.social_security_gross = income.social_security;
    record.social_security_taxable = full_tax.social_security_taxable;
    record.rmd = outcome.rmd;
    record.unplanned_rmd_inflow = outcome.unplanned_rmd_inflow;
    record.withdrawals = outcome.gross;
    if contribute {
        record.contributions = contributions(ctx, inflation_factor);
    }
    record.living = if state.phase == Phase::Accumulation {
        scheduled_living
    } else {
        living
    };
    record.healthcare = expenses.healthcare;
    record.housing = expenses.housing;
    record.one_time = expenses.one_time;
    record.ltc_cost = expenses.ltc.cost;
    record.ltc_insurance_paid = expenses.ltc.insurance_paid;
    record.ltc_out_of_pocket = expenses.ltc.out_of_pocket;
    record.taxes = TaxBreakdown {
        federal: full_tax.federal,
        state: full_tax.state,
        capital_gains: full_tax.capital_gains,
        niit: full_tax.niit,
        medicare: expenses.medicare + expenses.irmaa,
        irmaa: expenses.irmaa,
    };
    record.tax_true_up = true_up;
    record.portfolio_return = returns.portfolio;
    record.shortfall = outcome.shortfall;
    record.ending_balance = buckets.total_assets();
    record.buckets = buckets;

    let depleted = outcome.shortfall > 0.0;
    state.push_record(record);
    if depleted {
        state.deplete(year);
    }
    Ok(())
}

fn year_expenses(
    ctx: &SimulationContext<'_>,
    state: &mut ScenarioState,
    members: &[MemberYear<'_>],
    healthcare_factor: f64,
    inflation_factor: f64,
) -> Expenses {
    let params = ctx.params;
    let policy = ctx.policy;
    let schedule = &params.expenses;
    let primary_age = members[0].age;

    let mut expenses = Expenses::default();
    let mut on_medicare = 0usize;
    for m in members.iter().filter(|m| m.alive) {
        if m.age < policy.medicare_age {
            expenses.healthcare += schedule.healthcare_pre_medicare * healthcare_factor;
        } else {
            expenses.healthcare += schedule.healthcare_medicare * healthcare_factor;
            on_medicare += 1;
        }
    }
    if on_medicare > 0 {
        let per_member = irmaa_surcharge(
            state.taxes.magi_two_years_prior(),
            params.filing_status,
            policy,
        );
        expenses.medicare = policy.medicare_base_premium * healthcare_factor * on_medicare as f64;
        expenses.irmaa = per_member * healthcare_factor * on_medicare as f64;
    }

    if schedule.housing_end_age.is_none_or(|end| primary_age < end) {
        expenses.housing = schedule.housing;
    }
    expenses.one_time = schedule
        .one_time
        .iter()
        .filter(|e| e.age == primary_age)
        .map(|e| e.amount * inflation_factor)
        .sum();

    let modeler = LtcModeler::new(&params.ltc);
    let mut countable_assets = state.portfolio.buckets.total_assets();
    for (i, m) in members.iter().enumerate() {
        let id = if i == 0 {
            PersonId::Primary
        } else {
            PersonId::Spouse
        };
        let care = modeler.step(
            &mut state.ltc,
            &MemberContext {
                id,
                person: m.person,
                age: m.age,
                alive: m.alive,
                year: state.timeline.year,
                countable_assets,
            },
            &mut state.rng,
        );
        countable_assets -= care.out_of_pocket;
        expenses.ltc += care;
    }
    expenses
}

fn contributions(ctx: &SimulationContext<'_>, inflation_factor: f64) -> crate::model::BucketAmounts {
    let c = &ctx.params.contributions;
    crate::model::BucketAmounts {
        cash_equivalents: 0.0,
        capital_gains: c.taxable * inflation_factor,
        tax_deferred: c.tax_deferred * inflation_factor,
        tax_free: c.tax_free * inflation_factor,
    }
}

/// Run the sequencer at the configured point in the year and apply growth
fn apply_timing(
    ctx: &SimulationContext<'_>,
    state: &mut ScenarioState,
    request: &WithdrawalRequest<'_>,
    surplus: f64,
    contribute: bool,
    returns: &crate::returns::YearReturns,
) -> Result<WithdrawalOutcome, TrialError> {
    let invested = 1.0 + returns.portfolio;
    let cash = 1.0 + returns.cash;
    let inflation_factor = (1.0 + ctx.params.inflation_rate)
        .powi(i32::try_from(state.timeline.year).unwrap_or(i32::MAX));
    check_finite(state.timeline.year, "return", invested * cash)?;

    let buckets = &mut state.portfolio.buckets;
    let flows = |buckets: &mut crate::model::AssetBuckets| {
        let outcome = sequence_withdrawal(buckets, request);
        if contribute {
            let c = contributions(ctx, inflation_factor);
            buckets.deposit(BucketKind::TaxDeferred, c.tax_deferred);
            buckets.deposit(BucketKind::TaxFree, c.tax_free);
            buckets.deposit(BucketKind::CapitalGains, c.capital_gains);
        }
        buckets.deposit(BucketKind::CashEquivalents, surplus);
        outcome
    };

    let outcome = match ctx.params.withdrawal_timing {
        WithdrawalTiming::Start => {
            let outcome = flows(buckets);
            buckets.grow(invested, cash);
            outcome
        }
        WithdrawalTiming::Mid => {
            let (half_invested, half_cash) = (invested.sqrt(), cash.sqrt());
            buckets.grow(half_invested, half_cash);
            let outcome = flows(buckets);
            buckets.grow(half_invested, half_cash);
            outcome
        }
        WithdrawalTiming::End => {
            buckets.grow(invested, cash);
            flows(buckets)
        }
    };
    Ok(outcome)
}
