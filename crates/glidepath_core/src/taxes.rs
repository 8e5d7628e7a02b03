//! Tax calculators
//!
//! Stateless functions over a `TaxPolicy`. The simulator calls these every
//! year: once up front for the tax on guaranteed income, inside the
//! withdrawal sequencer for marginal gross-ups, and once at year end to
//! reconcile the full-year bill.

use crate::error::ConfigError;
use crate::model::{FilingStatus, RmdTable, StateTax, TaxBracket, TaxPolicy};

/// Federal income tax on `taxable_income` using progressive brackets
pub fn income_tax(taxable_income: f64, brackets: &[TaxBracket]) -> f64 {
    if taxable_income <= 0.0 || brackets.is_empty() {
        return 0.0;
    }

    let mut tax = 0.0;
    for (i, bracket) in brackets.iter().enumerate() {
        if taxable_income <= bracket.threshold {
            break;
        }
        let next_threshold = brackets
            .get(i + 1)
            .map_or(f64::INFINITY, |b| b.threshold);
        tax += (taxable_income.min(next_threshold) - bracket.threshold) * bracket.rate;
    }
    tax
}

/// Tax on `additional` income stacked on top of `taxable_so_far`. A negative
/// `taxable_so_far` is unused deduction and shelters the first dollars.
pub fn marginal_tax(additional: f64, taxable_so_far: f64, brackets: &[TaxBracket]) -> f64 {
    income_tax(taxable_so_far + additional, brackets) - income_tax(taxable_so_far, brackets)
}

/// Gross ordinary income needed to net `net` after federal marginal tax and
/// a flat state rate.
///
/// Walks the brackets from `taxable_so_far` upward. Any unused deduction
/// (negative `taxable_so_far`) is consumed first at a zero federal rate.
pub fn gross_from_net(
    net: f64,
    taxable_so_far: f64,
    brackets: &[TaxBracket],
    state_rate: f64,
) -> f64 {
    if net <= 0.0 {
        return 0.0;
    }

    let mut remaining = net;
    let mut gross = 0.0;
    let mut cursor = taxable_so_far;

    if cursor < 0.0 {
        let room = -cursor;
        let net_per_gross = 1.0 - state_rate;
        if remaining <= room * net_per_gross {
            return remaining / net_per_gross;
        }
        gross += room;
        remaining -= room * net_per_gross;
        cursor = 0.0;
    }

    let start = brackets
        .iter()
        .rposition(|b| cursor >= b.threshold)
        .unwrap_or(0);

    for i in start..brackets.len() {
        let next_threshold = brackets.get(i + 1).map_or(f64::MAX, |b| b.threshold);
        let room = next_threshold - cursor;
        let net_per_gross = 1.0 - brackets[i].rate - state_rate;
        if net_per_gross <= 0.0 {
            // Confiscatory rate: no amount of gross income helps
            return f64::INFINITY;
        }

        let max_net = room * net_per_gross;
        if remaining <= max_net {
            gross += remaining / net_per_gross;
            return gross;
        }
        gross += room;
        remaining -= max_net;
        cursor = next_threshold;
    }
    gross
}

/// Taxable portion of Social Security under the provisional-income test.
///
/// Provisional income is `other_income` plus half the benefit. Up to 50% of
/// the benefit is taxable above the base threshold, up to 85% above the
/// adjusted base.
pub fn taxable_social_security(
    gross_benefit: f64,
    other_income: f64,
    filing_status: FilingStatus,
    policy: &TaxPolicy,
) -> f64 {
    if gross_benefit <= 0.0 {
        return 0.0;
    }
    let thresholds = policy.social_security.get(filing_status);
    let provisional = other_income.max(0.0) + 0.5 * gross_benefit;

    if provisional <= thresholds.base {
        return 0.0;
    }
    let tier1_cap = 0.5 * (thresholds.adjusted_base - thresholds.base);
    if provisional <= thresholds.adjusted_base {
        return (0.5 * (provisional - thresholds.base)).min(0.5 * gross_benefit);
    }
    let taxable = 0.85 * (provisional - thresholds.adjusted_base)
        + tier1_cap.min(0.5 * gross_benefit);
    taxable.min(0.85 * gross_benefit)
}

/// RMD divisor for an age, with nearest-age fallback
pub fn rmd_divisor(age: u8, table: &RmdTable) -> Result<f64, ConfigError> {
    table.divisor_or_nearest(age)
}

/// Required distribution for the year given the start-of-year balance
pub fn required_distribution(
    age: u8,
    start_of_year_balance: f64,
    policy: &TaxPolicy,
) -> Result<f64, ConfigError> {
    if age < policy.rmd_start_age || start_of_year_balance <= 0.0 {
        return Ok(0.0);
    }
    Ok(start_of_year_balance / rmd_divisor(age, &policy.rmd_table)?)
}

/// Annual IRMAA surcharge per Medicare beneficiary. `magi_two_years_prior`
/// must be the MAGI from exactly two tax years before.
pub fn irmaa_surcharge(
    magi_two_years_prior: f64,
    filing_status: FilingStatus,
    policy: &TaxPolicy,
) -> f64 {
    policy
        .irmaa
        .get(filing_status)
        .iter()
        .rev()
        .find(|tier| magi_two_years_prior > tier.magi_threshold)
        .map_or(0.0, |tier| tier.monthly_surcharge * 12.0)
}

/// Net investment income tax: the rate applied to the lesser of investment
/// income and MAGI above the threshold
pub fn niit(magi: f64, investment_income: f64, filing_status: FilingStatus, policy: &TaxPolicy) -> f64 {
    let excess = (magi - policy.niit_threshold.get(filing_status)).max(0.0);
    policy.niit_rate * excess.min(investment_income.max(0.0))
}

/// Flat state tax. `social_security_taxable` is removed from the base for
/// states that exempt benefits.
pub fn state_income_tax(taxable: f64, social_security_taxable: f64, state: &StateTax) -> f64 {
    let base = if state.exempts_social_security {
        taxable - social_security_taxable
    } else {
        taxable
    };
    base.max(0.0) * state.rate
}

/// Long-term capital gains at the preferential flat rate
pub fn capital_gains_tax(gains: f64, policy: &TaxPolicy) -> f64 {
    gains.max(0.0) * policy.capital_gains_rate
}

/// Standard deduction plus the additional amount for each member 65+
pub fn deductions(filing_status: FilingStatus, seniors: usize, policy: &TaxPolicy) -> f64 {
    policy.standard_deduction.get(filing_status)
        + seniors as f64 * policy.senior_deduction.get(filing_status)
}

/// One year's income by tax character
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AnnualIncome {
    /// Wages, pension, part-time income, tax-deferred withdrawals and RMDs
    pub ordinary: f64,
    /// Gross Social Security benefits
    pub social_security: f64,
    /// Realized long-term gains
    pub capital_gains: f64,
    /// Members aged 65 or older
    pub seniors: usize,
}

/// Full-year tax bill
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AnnualTax {
    pub federal: f64,
    pub capital_gains: f64,
    pub state: f64,
    pub niit: f64,
    pub social_security_taxable: f64,
    /// Modified AGI, recorded for the IRMAA lookback
    pub magi: f64,
    /// Ordinary taxable income after deductions (negative when deductions
    /// are not fully used)
    pub ordinary_taxable: f64,
}

impl AnnualTax {
    #[must_use]
    pub fn total(&self) -> f64 {
        self.federal + self.capital_gains + self.state + self.niit
    }
}

/// Compute the full-year bill. Deductions offset ordinary income first and
/// any remainder shelters gains.
pub fn annual_tax(
    income: &AnnualIncome,
    filing_status: FilingStatus,
    state: &StateTax,
    policy: &TaxPolicy,
) -> AnnualTax {
    let ss_taxable = taxable_social_security(
        income.social_security,
        income.ordinary + income.capital_gains,
        filing_status,
        policy,
    );
    let deduction = deductions(filing_status, income.seniors, policy);
    let ordinary_gross = income.ordinary + ss_taxable;
    let ordinary_taxable = ordinary_gross - deduction;
    let gains_sheltered = (-ordinary_taxable).max(0.0);
    let taxable_gains = (income.capital_gains - gains_sheltered).max(0.0);

    let brackets = policy.brackets.get(filing_status);
    let magi = ordinary_gross + income.capital_gains;

    AnnualTax {
        federal: income_tax(ordinary_taxable, brackets),
        capital_gains: capital_gains_tax(taxable_gains, policy),
        state: state_income_tax(ordinary_gross + income.capital_gains, ss_taxable, state),
        niit: niit(magi, income.capital_gains, filing_status, policy),
        social_security_taxable: ss_taxable,
        magi,
        ordinary_taxable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> TaxPolicy {
        TaxPolicy::us_2024()
    }

    #[test]
    fn test_income_tax_single_brackets() {
        let p = policy();
        let brackets = p.brackets.get(FilingStatus::Single);
        assert_eq!(income_tax(0.0, brackets), 0.0);
        assert!((income_tax(10_000.0, brackets) - 1_000.0).abs() < 1e-9);
        // 11,600 at 10% + 8,400 at 12%
        assert!((income_tax(20_000.0, brackets) - 2_168.0).abs() < 1e-9);
    }

    #[test]
    fn test_marginal_tax_uses_unused_deduction() {
        let p = policy();
        let brackets = p.brackets.get(FilingStatus::Single);
        assert_eq!(marginal_tax(5_000.0, -10_000.0, brackets), 0.0);
        assert!((marginal_tax(15_000.0, -10_000.0, brackets) - 500.0).abs() < 1e-9);
    }

    #[test]
    fn test_gross_from_net_inverts_marginal_tax() {
        let p = policy();
        let brackets = p.brackets.get(FilingStatus::MarriedFilingJointly);
        for (net, so_far, state) in [
            (10_000.0, 50_000.0, 0.0),
            (80_000.0, 90_000.0, 0.05),
            (40_000.0, -20_000.0, 0.0495),
            (250_000.0, 0.0, 0.0),
        ] {
            let gross = gross_from_net(net, so_far, brackets, state);
            let tax = marginal_tax(gross, so_far, brackets) + gross * state;
            assert!(
                (gross - tax - net).abs() < 1e-6,
                "net {net} so_far {so_far}: gross {gross}, tax {tax}"
            );
        }
    }

    #[test]
    fn test_social_security_taxability_tiers() {
        let p = policy();
        // Provisional income 20k + 10k = 30k < 32k MFJ base
        assert_eq!(
            taxable_social_security(20_000.0, 20_000.0, FilingStatus::MarriedFilingJointly, &p),
            0.0
        );
        // Single: provisional 30k, between 25k and 34k -> 50% of excess
        let t = taxable_social_security(20_000.0, 20_000.0, FilingStatus::Single, &p);
        assert!((t - 2_500.0).abs() < 1e-9);
        // High income caps at 85%
        let t = taxable_social_security(40_000.0, 500_000.0, FilingStatus::Single, &p);
        assert!((t - 34_000.0).abs() < 1e-9);
    }

    #[test]
    fn test_rmd_amounts() {
        let p = policy();
        assert_eq!(required_distribution(72, 500_000.0, &p), Ok(0.0));
        let rmd = required_distribution(73, 530_000.0, &p).unwrap();
        assert!((rmd - 20_000.0).abs() < 1e-9);
    }

    #[test]
    fn test_irmaa_tiers() {
        let p = policy();
        assert_eq!(irmaa_surcharge(100_000.0, FilingStatus::Single, &p), 0.0);
        assert!((irmaa_surcharge(110_000.0, FilingStatus::Single, &p) - 82.80 * 12.0).abs() < 1e-9);
        assert!(
            (irmaa_surcharge(1_000_000.0, FilingStatus::MarriedFilingJointly, &p) - 500.30 * 12.0)
                .abs()
                < 1e-9
        );
    }

    #[test]
    fn test_niit_lesser_of_rule() {
        let p = policy();
        // 20k over threshold, 50k investment income -> 3.8% of 20k
        let tax = niit(220_000.0, 50_000.0, FilingStatus::Single, &p);
        assert!((tax - 760.0).abs() < 1e-9);
        // 100k over threshold, 10k investment income -> 3.8% of 10k
        let tax = niit(300_000.0, 10_000.0, FilingStatus::Single, &p);
        assert!((tax - 380.0).abs() < 1e-9);
        assert_eq!(niit(150_000.0, 50_000.0, FilingStatus::Single, &p), 0.0);
    }

    #[test]
    fn test_state_exempts_social_security() {
        let exempt = StateTax {
            rate: 0.05,
            exempts_social_security: true,
        };
        let taxed = StateTax {
            exempts_social_security: false,
            ..exempt
        };
        assert!((state_income_tax(100_000.0, 20_000.0, &exempt) - 4_000.0).abs() < 1e-9);
        assert!((state_income_tax(100_000.0, 20_000.0, &taxed) - 5_000.0).abs() < 1e-9);
    }

    #[test]
    fn test_annual_tax_deduction_shelters_gains() {
        let p = policy();
        let state = StateTax::default();
        let bill = annual_tax(
            &AnnualIncome {
                ordinary: 10_000.0,
                social_security: 0.0,
                capital_gains: 10_000.0,
                seniors: 0,
            },
            FilingStatus::Single,
            &state,
            &p,
        );
        // 14,600 deduction covers the 10k ordinary and 4.6k of gains
        assert_eq!(bill.federal, 0.0);
        assert!((bill.capital_gains - 5_400.0 * 0.15).abs() < 1e-9);
        assert!((bill.magi - 20_000.0).abs() < 1e-9);
    }
}
