//! Guyton-Klinger guardrails
//!
//! The guarded amount is the household's living-expense budget. Each retired
//! year the budget is first inflation-adjusted (unless last year's return
//! was negative), then at most one of capital preservation, prosperity or
//! portfolio management fires, in that order.
//!
//! Rates are planned spending over the start-of-year portfolio, gross of
//! guaranteed income.

use crate::model::{GuardrailConfig, GuardrailRule};

/// Per-trial guardrail memory
#[derive(Debug, Clone, Default)]
pub struct GuardrailState {
    budget: Option<f64>,
    initial_rate: Option<f64>,
    prior_rate: Option<f64>,
}

#[derive(Debug, Clone, Copy)]
pub struct GuardrailInput {
    /// Inflation-adjusted living expenses for this year, used to seed the
    /// budget in the first retired year
    pub scheduled_living: f64,
    /// Non-living spending funded this year (healthcare, housing, care)
    pub other_expenses: f64,
    /// Start-of-year portfolio value
    pub portfolio: f64,
    pub inflation: f64,
    /// Last year's nominal portfolio return
    pub prior_return: Option<f64>,
    /// Years left in the plan including this one
    pub years_remaining: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GuardrailDecision {
    /// Living budget to fund this year
    pub living: f64,
    /// Withdrawal rate before any adjustment
    pub rate: f64,
    pub rule: Option<GuardrailRule>,
    pub inflation_skipped: bool,
}

pub struct GuardrailEngine<'a> {
    config: &'a GuardrailConfig,
}

impl<'a> GuardrailEngine<'a> {
    #[must_use]
    pub fn new(config: &'a GuardrailConfig) -> Self {
        Self { config }
    }

    fn withdrawal_rate(living: f64, input: &GuardrailInput) -> f64 {
        (living + input.other_expenses).max(0.0) / input.portfolio
    }

    /// Evaluate this year's rules and update the stored budget
    pub fn evaluate(&self, state: &mut GuardrailState, input: &GuardrailInput) -> GuardrailDecision {
        let Some(previous) = state.budget else {
            // First retired year fixes the initial rate
            let living = input.scheduled_living;
            let rate = if input.portfolio > 0.0 {
                Self::withdrawal_rate(living, input)
            } else {
                0.0
            };
            state.budget = Some(living);
            state.initial_rate = (rate > 0.0).then_some(rate);
            state.prior_rate = Some(rate);
            return GuardrailDecision {
                living,
                rate,
                rule: None,
                inflation_skipped: false,
            };
        };

        let negative_year = input.prior_return.is_some_and(|r| r < 0.0);
        let mut living = if negative_year {
            previous
        } else {
            previous * (1.0 + input.inflation)
        };

        if input.portfolio <= 0.0 {
            state.budget = Some(living);
            return GuardrailDecision {
                living,
                rate: 0.0,
                rule: None,
                inflation_skipped: negative_year,
            };
        }

        let rate = Self::withdrawal_rate(living, input);
        let Some(initial) = state.initial_rate else {
            // Nothing to compare against until spending is positive
            state.initial_rate = (rate > 0.0).then_some(rate);
            state.budget = Some(living);
            state.prior_rate = Some(rate);
            return GuardrailDecision {
                living,
                rate,
                rule: None,
                inflation_skipped: negative_year,
            };
        };
        let c = self.config;

        let preservation_active = input.years_remaining > usize::from(c.preservation_sunset_years);
        let real_return = input
            .prior_return
            .map(|r| (1.0 + r) / (1.0 + input.inflation) - 1.0);
        let rate_rose = state.prior_rate.is_some_and(|prior| rate > prior);

        let rule = if preservation_active && rate > initial * (1.0 + c.upper_band) {
            living *= 1.0 - c.cut;
            Some(GuardrailRule::CapitalPreservation)
        } else if rate < initial * (1.0 - c.lower_band) {
            living *= 1.0 + c.raise;
            Some(GuardrailRule::Prosperity)
        } else if real_return.is_some_and(|r| r < 0.0) && rate_rose {
            living *= 1.0 - c.portfolio_management_cut;
            Some(GuardrailRule::PortfolioManagement)
        } else {
            None
        };

        state.budget = Some(living);
        state.prior_rate = Some(Self::withdrawal_rate(living, input));

        GuardrailDecision {
            living,
            rate,
            rule,
            inflation_skipped: negative_year,
        }
    }
}
