//! Guaranteed income: wages, part-time work, pensions and Social Security
//!
//! Amounts are computed per member per simulated year. A member is alive in
//! year `t` while `current_age + t < life_expectancy`.

use crate::model::{Pension, Person, SocialSecurity};

/// Benefit multiplier for claiming at `claim_age` relative to full
/// retirement age.
///
/// Early claims lose 5/9 of 1% per month for the first 36 months and 5/12 of
/// 1% per month beyond that; delayed claims earn 8% per year up to age 70.
pub fn social_security_claim_factor(claim_age: u8, full_retirement_age: u8) -> f64 {
    if claim_age < full_retirement_age {
        let months_early = f64::from(full_retirement_age - claim_age) * 12.0;
        let first = months_early.min(36.0);
        let beyond = (months_early - 36.0).max(0.0);
        1.0 - first * (5.0 / 9.0) / 100.0 - beyond * (5.0 / 12.0) / 100.0
    } else {
        let years_late = f64::from(claim_age.min(70).saturating_sub(full_retirement_age));
        1.0 + 0.08 * years_late
    }
}

/// Annual benefit once claimed, grown by cost-of-living adjustments
/// (`cola_factor` is cumulative inflation since `as_of`)
fn claimed_benefit(ss: &SocialSecurity, full_retirement_age: u8, cola_factor: f64) -> f64 {
    ss.benefit_at_full_retirement_age
        * social_security_claim_factor(ss.claim_age, full_retirement_age)
        * cola_factor
}

/// Own retirement benefit at `age`
pub fn social_security_benefit(
    ss: &SocialSecurity,
    age: u8,
    full_retirement_age: u8,
    cola_factor: f64,
) -> f64 {
    if age < ss.claim_age {
        return 0.0;
    }
    claimed_benefit(ss, full_retirement_age, cola_factor)
}

/// Survivor benefit: the larger of the survivor's own benefit and the
/// deceased spouse's benefit, available from age 60
pub fn survivor_social_security(
    own: f64,
    deceased: Option<&SocialSecurity>,
    survivor_age: u8,
    full_retirement_age: u8,
    cola_factor: f64,
) -> f64 {
    let inherited = match deceased {
        Some(ss) if survivor_age >= 60 => claimed_benefit(ss, full_retirement_age, cola_factor),
        _ => 0.0,
    };
    own.max(inherited)
}

/// Pension payment at `age`, with COLA compounding from the start age
pub fn pension_income(pension: &Pension, age: u8) -> f64 {
    if age < pension.start_age {
        return 0.0;
    }
    let years_paid = i32::from(age - pension.start_age);
    pension.annual_amount * (1.0 + pension.cola).powi(years_paid)
}

/// Pension continuing to a survivor after the member's death. `age_if_alive`
/// is the age the deceased would have reached this year.
pub fn survivor_pension(pension: &Pension, age_if_alive: u8) -> f64 {
    pension_income(pension, age_if_alive) * pension.survivor_fraction
}

/// Wages while still working (`inflation_factor` is cumulative since
/// `as_of`)
pub fn wages(person: &Person, age: u8, inflation_factor: f64) -> f64 {
    if age < person.retirement_age {
        person.wages * inflation_factor
    } else {
        0.0
    }
}

pub fn part_time_income(person: &Person, age: u8, inflation_factor: f64) -> f64 {
    match &person.part_time {
        Some(pt) if (pt.start_age..=pt.end_age).contains(&age) => pt.annual_amount * inflation_factor,
        _ => 0.0,
    }
}

/// Income streams received by the household in one year
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IncomeStreams {
    pub wages: f64,
    pub part_time: f64,
    pub pension: f64,
    pub social_security: f64,
}

impl IncomeStreams {
    #[must_use]
    pub fn total(&self) -> f64 {
        self.wages + self.part_time + self.pension + self.social_security
    }

    /// Ordinary (non-Social-Security) income
    #[must_use]
    pub fn ordinary(&self) -> f64 {
        self.wages + self.part_time + self.pension
    }
}

/// A household member as seen in one simulated year
#[derive(Debug, Clone, Copy)]
pub struct MemberYear<'a> {
    pub person: &'a Person,
    pub age: u8,
    pub alive: bool,
}

/// Household income for one year. With a spouse, a survivor keeps the larger
/// Social Security benefit and the deceased's pension survivor share.
pub fn household_income(
    members: &[MemberYear<'_>],
    full_retirement_age: u8,
    inflation_factor: f64,
) -> IncomeStreams {
    let mut income = IncomeStreams::default();

    for (i, member) in members.iter().enumerate() {
        let partner = members.iter().enumerate().find(|(j, _)| *j != i).map(|(_, m)| m);

        if !member.alive {
            // Survivor share of this member's pension goes to a living partner
            if let (Some(pension), Some(partner)) = (&member.person.pension, partner)
                && partner.alive
            {
                income.pension += survivor_pension(pension, member.age);
            }
            continue;
        }

        let p = member.person;
        income.wages += wages(p, member.age, inflation_factor);
        income.part_time += part_time_income(p, member.age, inflation_factor);
        if let Some(pension) = &p.pension {
            income.pension += pension_income(pension, member.age);
        }

        let own = p.social_security.as_ref().map_or(0.0, |ss| {
            social_security_benefit(ss, member.age, full_retirement_age, inflation_factor)
        });

        income.social_security += match partner {
            Some(partner) if !partner.alive => survivor_social_security(
                own,
                partner.person.social_security.as_ref(),
                member.age,
                full_retirement_age,
                inflation_factor,
            ),
            _ => own,
        };
    }
    income
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PersonBuilder;

    #[test]
    fn test_claim_factor_schedule() {
        assert!((social_security_claim_factor(67, 67) - 1.0).abs() < 1e-12);
        // 36 months early
        assert!((social_security_claim_factor(64, 67) - 0.80).abs() < 1e-12);
        // 60 months early: 20% + 24 × 5/12%
        assert!((social_security_claim_factor(62, 67) - 0.70).abs() < 1e-12);
        assert!((social_security_claim_factor(70, 67) - 1.24).abs() < 1e-12);
        // Credits stop at 70
        assert!((social_security_claim_factor(70, 67) - social_security_claim_factor(72, 67)).abs() < 1e-12);
    }

    #[test]
    fn test_benefit_starts_at_claim_age() {
        let ss = SocialSecurity {
            benefit_at_full_retirement_age: 30_000.0,
            claim_age: 70,
        };
        assert_eq!(social_security_benefit(&ss, 69, 67, 1.0), 0.0);
        assert!((social_security_benefit(&ss, 70, 67, 1.1) - 30_000.0 * 1.24 * 1.1).abs() < 1e-9);
    }

    #[test]
    fn test_pension_cola_and_survivor() {
        let pension = Pension {
            annual_amount: 20_000.0,
            start_age: 65,
            cola: 0.02,
            survivor_fraction: 0.5,
        };
        assert_eq!(pension_income(&pension, 64), 0.0);
        assert!((pension_income(&pension, 67) - 20_000.0 * 1.02f64.powi(2)).abs() < 1e-9);
        assert!((survivor_pension(&pension, 65) - 10_000.0).abs() < 1e-9);
    }

    #[test]
    fn test_survivor_keeps_larger_benefit() {
        let primary = PersonBuilder::new(80)
            .life_expectancy(80)
            .social_security(36_000.0, 67)
            .pension(10_000.0, 65)
            .build();
        let mut primary_with_survivor = primary.clone();
        if let Some(p) = primary_with_survivor.pension.as_mut() {
            p.survivor_fraction = 0.5;
        }
        let spouse = PersonBuilder::new(78)
            .life_expectancy(95)
            .social_security(12_000.0, 67)
            .build();

        let members = [
            MemberYear {
                person: &primary_with_survivor,
                age: 80,
                alive: false,
            },
            MemberYear {
                person: &spouse,
                age: 78,
                alive: true,
            },
        ];
        let income = household_income(&members, 67, 1.0);
        assert!((income.social_security - 36_000.0).abs() < 1e-9);
        assert!((income.pension - 5_000.0).abs() < 1e-9);
    }

    #[test]
    fn test_wages_stop_at_retirement() {
        let p = PersonBuilder::new(50).retire_at(55).wages(100_000.0).build();
        assert!((wages(&p, 54, 1.1) - 110_000.0).abs() < 1e-9);
        assert_eq!(wages(&p, 55, 1.1), 0.0);
    }
}
