//! Input validation for `SimulationParams`
//!
//! Decoding already rejects wrong types; this pass rejects numbers that
//! decode fine but cannot be simulated (NaN, infinities, negative money,
//! impossible ages).

use crate::error::ConfigError;
use crate::model::{BucketBalances, GuardrailConfig, Person, SimulationParams};

fn finite(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            field,
            value,
            reason: "must be finite",
        })
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    finite(field, value)?;
    if value < 0.0 {
        return Err(ConfigError::InvalidValue {
            field,
            value,
            reason: "must not be negative",
        });
    }
    Ok(())
}

fn fraction(field: &'static str, value: f64) -> Result<(), ConfigError> {
    finite(field, value)?;
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::InvalidValue {
            field,
            value,
            reason: "must be between 0 and 1",
        });
    }
    Ok(())
}

fn rate(field: &'static str, value: f64) -> Result<(), ConfigError> {
    finite(field, value)?;
    if value <= -1.0 {
        return Err(ConfigError::InvalidValue {
            field,
            value,
            reason: "must be greater than -100%",
        });
    }
    Ok(())
}

fn validate_person(person: &Person) -> Result<(), ConfigError> {
    non_negative("wages", person.wages)?;
    if person.life_expectancy > 120 {
        return Err(ConfigError::InvalidValue {
            field: "life_expectancy",
            value: f64::from(person.life_expectancy),
            reason: "must be at most 120",
        });
    }
    if let Some(ss) = &person.social_security {
        non_negative("social_security.benefit_at_full_retirement_age", ss.benefit_at_full_retirement_age)?;
        if !(62..=70).contains(&ss.claim_age) {
            return Err(ConfigError::InvalidValue {
                field: "social_security.claim_age",
                value: f64::from(ss.claim_age),
                reason: "claiming is possible from 62 through 70",
            });
        }
    }
    if let Some(pension) = &person.pension {
        non_negative("pension.annual_amount", pension.annual_amount)?;
        rate("pension.cola", pension.cola)?;
        fraction("pension.survivor_fraction", pension.survivor_fraction)?;
    }
    if let Some(part_time) = &person.part_time {
        non_negative("part_time.annual_amount", part_time.annual_amount)?;
        if part_time.end_age < part_time.start_age {
            return Err(ConfigError::InvalidValue {
                field: "part_time.end_age",
                value: f64::from(part_time.end_age),
                reason: "must not precede start_age",
            });
        }
    }
    if let Some(policy) = &person.ltc_insurance {
        non_negative("ltc_insurance.daily_benefit", policy.daily_benefit)?;
        non_negative("ltc_insurance.benefit_period_years", policy.benefit_period_years)?;
        rate("ltc_insurance.inflation_rider", policy.inflation_rider)?;
    }
    Ok(())
}

fn validate_guardrails(g: &GuardrailConfig) -> Result<(), ConfigError> {
    for (field, value) in [
        ("guardrails.upper_band", g.upper_band),
        ("guardrails.lower_band", g.lower_band),
        ("guardrails.cut", g.cut),
        ("guardrails.raise", g.raise),
        ("guardrails.portfolio_management_cut", g.portfolio_management_cut),
    ] {
        fraction(field, value)?;
    }
    Ok(())
}

impl SimulationParams {
    /// Reject inputs that cannot be simulated. Policy-year and state lookups
    /// are checked later against the tax tables in use.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (_, person) in self.members() {
            validate_person(person)?;
        }
        self.horizon_years()?;

        BucketBalances::from(self.assets).validate()?;
        non_negative("contributions.tax_deferred", self.contributions.tax_deferred)?;
        non_negative("contributions.tax_free", self.contributions.tax_free)?;
        non_negative("contributions.taxable", self.contributions.taxable)?;

        let e = &self.expenses;
        non_negative("expenses.living", e.living)?;
        non_negative("expenses.healthcare_pre_medicare", e.healthcare_pre_medicare)?;
        non_negative("expenses.healthcare_medicare", e.healthcare_medicare)?;
        non_negative("expenses.housing", e.housing)?;
        if let Some(h) = e.healthcare_inflation {
            rate("expenses.healthcare_inflation", h)?;
        }
        for one_time in &e.one_time {
            non_negative("expenses.one_time.amount", one_time.amount)?;
        }

        rate("inflation_rate", self.inflation_rate)?;
        for magi in &self.prior_magi {
            non_negative("prior_magi", *magi)?;
        }
        if self.state.trim().is_empty() {
            return Err(ConfigError::UnknownState(self.state.clone()));
        }

        validate_guardrails(&self.guardrails)?;
        self.market.validate()?;
        self.ltc.validate()?;
        Ok(())
    }
}
