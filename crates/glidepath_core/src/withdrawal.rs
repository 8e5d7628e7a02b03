//! Withdrawal sequencer
//!
//! Covers a net cash need from the buckets in a fixed order: required
//! distribution first, then cash, capital gains, tax-deferred and finally
//! tax-free. Each tier takes only what it can and taxes are withheld at the
//! marginal rate of the tier.

use crate::model::{AssetBuckets, BucketAmounts, BucketKind, TaxBracket};
use crate::taxes::{gross_from_net, marginal_tax};

/// Residual needs below this are rounding, not a shortfall
const NEED_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Copy)]
pub struct WithdrawalRequest<'a> {
    /// Net cash the portfolio must supply after other income
    pub need: f64,
    /// Required distribution from the tax-deferred bucket (gross)
    pub rmd: f64,
    /// Ordinary taxable income already committed this year (negative when
    /// deductions are unused)
    pub taxable_income: f64,
    pub brackets: &'a [TaxBracket],
    pub state_rate: f64,
    pub capital_gains_rate: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WithdrawalOutcome {
    /// Gross amount taken from each bucket, RMD included in `tax_deferred`
    pub gross: BucketAmounts,
    /// RMD actually distributed
    pub rmd: f64,
    /// Net RMD beyond the need; paid out of the portfolio, not reinvested
    pub unplanned_rmd_inflow: f64,
    pub realized_gains: f64,
    /// Tax withheld across all tiers
    pub withheld: f64,
    /// Net cash delivered toward the need
    pub net: f64,
    pub shortfall: f64,
}

/// Draw `request.need` from `buckets`. Never overdraws: when the buckets
/// run dry the unmet part is returned as `shortfall`.
pub fn sequence_withdrawal(buckets: &mut AssetBuckets, request: &WithdrawalRequest<'_>) -> WithdrawalOutcome {
    let mut out = WithdrawalOutcome::default();
    let mut need = request.need.max(0.0);
    let mut taxable_income = request.taxable_income;
    let state_rate = request.state_rate;

    // 1. Required distribution, unconditionally
    if request.rmd > 0.0 {
        let rmd = buckets.withdraw(BucketKind::TaxDeferred, request.rmd);
        let tax = marginal_tax(rmd, taxable_income, request.brackets) + rmd * state_rate;
        taxable_income += rmd;
        let net = rmd - tax;
        let applied = net.min(need);

        out.rmd = rmd;
        out.gross.tax_deferred += rmd;
        out.withheld += tax;
        out.net += applied;
        out.unplanned_rmd_inflow = net - applied;
        need -= applied;
    }

    // 2. Cash equivalents
    if need > NEED_EPSILON {
        let taken = buckets.withdraw(BucketKind::CashEquivalents, need);
        out.gross.cash_equivalents += taken;
        out.net += taken;
        need -= taken;
    }

    // 3. Capital gains: only the gains fraction is taxed
    if need > NEED_EPSILON && buckets.capital_gains() > 0.0 {
        let gains_fraction = buckets.gains_fraction();
        let tax_rate = gains_fraction * (request.capital_gains_rate + state_rate);
        let gross_needed = need / (1.0 - tax_rate);
        let taken = buckets.withdraw(BucketKind::CapitalGains, gross_needed);
        let tax = taken * tax_rate;
        let net = (taken - tax).min(need);

        out.gross.capital_gains += taken;
        out.realized_gains += taken * gains_fraction;
        out.withheld += tax;
        out.net += net;
        need -= net;
    }

    // 4. Tax-deferred, grossed up for ordinary income tax
    if need > NEED_EPSILON && buckets.tax_deferred() > 0.0 {
        let gross_needed = gross_from_net(need, taxable_income, request.brackets, state_rate);
        let taken = buckets.withdraw(BucketKind::TaxDeferred, gross_needed);
        let tax = marginal_tax(taken, taxable_income, request.brackets) + taken * state_rate;
        let net = (taken - tax).min(need);

        out.gross.tax_deferred += taken;
        out.withheld += tax;
        out.net += net;
        need -= net;
    }

    // 5. Tax-free, last resort
    if need > NEED_EPSILON {
        let taken = buckets.withdraw(BucketKind::TaxFree, need);
        out.gross.tax_free += taken;
        out.net += taken;
        need -= taken;
    }

    out.shortfall = if need > NEED_EPSILON { need } else { 0.0 };
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FilingStatus, TaxPolicy};

    fn request(need: f64, rmd: f64, policy: &TaxPolicy) -> WithdrawalRequest<'_> {
        WithdrawalRequest {
            need,
            rmd,
            taxable_income: 0.0,
            brackets: policy.brackets.get(FilingStatus::Single),
            state_rate: 0.0,
            capital_gains_rate: policy.capital_gains_rate,
        }
    }

    #[test]
    fn test_cash_first() {
        let policy = TaxPolicy::us_2024();
        let mut b = AssetBuckets::new(100_000.0, 100_000.0, 100_000.0, 50_000.0, 20_000.0);
        let out = sequence_withdrawal(&mut b, &request(15_000.0, 0.0, &policy));
        assert_eq!(out.gross.cash_equivalents, 15_000.0);
        assert_eq!(out.gross.capital_gains, 0.0);
        assert_eq!(out.withheld, 0.0);
        assert_eq!(b.cash_equivalents(), 5_000.0);
    }

    #[test]
    fn test_order_taxable_then_deferred_then_free() {
        let policy = TaxPolicy::us_2024();
        let mut b = AssetBuckets::new(30_000.0, 100_000.0, 20_000.0, 20_000.0, 0.0);
        let out = sequence_withdrawal(&mut b, &request(60_000.0, 0.0, &policy));

        // Full-basis taxable bucket is drained tax-free first
        assert_eq!(out.gross.capital_gains, 20_000.0);
        assert_eq!(b.capital_gains(), 0.0);
        // Tax-deferred is drained before any tax-free money is touched
        assert_eq!(b.tax_deferred(), 0.0);
        assert!(out.gross.tax_free > 0.0);
        assert!((out.net - 60_000.0).abs() < 1e-6);
        assert_eq!(out.shortfall, 0.0);
    }

    #[test]
    fn test_capital_gains_taxes_gains_fraction_only() {
        let policy = TaxPolicy::us_2024();
        let mut b = AssetBuckets::new(0.0, 0.0, 100_000.0, 50_000.0, 0.0);
        let out = sequence_withdrawal(&mut b, &request(10_000.0, 0.0, &policy));
        // 50% gains at 15% -> 7.5% effective
        assert!((out.gross.capital_gains - 10_000.0 / 0.925).abs() < 1e-6);
        assert!((out.realized_gains - out.gross.capital_gains * 0.5).abs() < 1e-6);
        assert!((out.net - 10_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_tax_deferred_gross_up_nets_the_need() {
        let policy = TaxPolicy::us_2024();
        let mut b = AssetBuckets::new(500_000.0, 0.0, 0.0, 0.0, 0.0);
        let mut req = request(40_000.0, 0.0, &policy);
        req.taxable_income = 30_000.0;
        let out = sequence_withdrawal(&mut b, &req);
        assert!(out.gross.tax_deferred > 40_000.0);
        assert!((out.gross.tax_deferred - out.withheld - 40_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_rmd_excess_is_unplanned_inflow() {
        let policy = TaxPolicy::us_2024();
        let mut b = AssetBuckets::new(500_000.0, 0.0, 0.0, 0.0, 10_000.0);
        let out = sequence_withdrawal(&mut b, &request(5_000.0, 20_000.0, &policy));
        assert_eq!(out.rmd, 20_000.0);
        assert_eq!(out.gross.cash_equivalents, 0.0);
        assert!(out.unplanned_rmd_inflow > 0.0);
        assert!((out.net + out.unplanned_rmd_inflow + out.withheld - 20_000.0).abs() < 1e-6);
        assert_eq!(b.tax_deferred(), 480_000.0);
        assert_eq!(b.cash_equivalents(), 10_000.0);
    }

    #[test]
    fn test_rmd_capped_at_balance() {
        let policy = TaxPolicy::us_2024();
        let mut b = AssetBuckets::new(1_000.0, 0.0, 0.0, 0.0, 0.0);
        let out = sequence_withdrawal(&mut b, &request(0.0, 5_000.0, &policy));
        assert_eq!(out.rmd, 1_000.0);
        assert_eq!(b.total_assets(), 0.0);
    }

    #[test]
    fn test_shortfall_when_exhausted() {
        let policy = TaxPolicy::us_2024();
        let mut b = AssetBuckets::new(0.0, 5_000.0, 0.0, 0.0, 5_000.0);
        let out = sequence_withdrawal(&mut b, &request(25_000.0, 0.0, &policy));
        assert!((out.shortfall - 15_000.0).abs() < 1e-9);
        assert_eq!(b.total_assets(), 0.0);
        assert!(b.is_consistent());
    }
}
