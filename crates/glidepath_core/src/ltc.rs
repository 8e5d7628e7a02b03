//! Long-term-care event modeler
//!
//! Every member draws one onset uniform per year whether or not an episode
//! can start, so the random stream never depends on portfolio balances.
//! Duration, setting and cost are sampled only at onset.

use rand::Rng;
use rand_distr::{Distribution, Exp, LogNormal};

use crate::model::{
    CareSettingProfile, Gender, HealthStatus, LtcAssumptions, LtcEvent, LtcInsurance, Person,
    PersonId,
};

/// Cost split for one member-year
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LtcYear {
    pub cost: f64,
    pub insurance_paid: f64,
    pub out_of_pocket: f64,
}

impl std::ops::AddAssign for LtcYear {
    fn add_assign(&mut self, rhs: Self) {
        self.cost += rhs.cost;
        self.insurance_paid += rhs.insurance_paid;
        self.out_of_pocket += rhs.out_of_pocket;
    }
}

#[derive(Debug, Clone)]
struct ActiveEpisode {
    /// Index into `LtcState::events`
    event: usize,
    years_elapsed: u8,
    /// Remaining insurance benefit pool
    pool: f64,
}

#[derive(Debug, Clone, Default)]
struct MemberLtc {
    active: Option<ActiveEpisode>,
    episodes: u8,
}

/// Per-trial LTC state
#[derive(Debug, Clone, Default)]
pub struct LtcState {
    members: [MemberLtc; 2],
    events: Vec<LtcEvent>,
}

impl LtcState {
    #[must_use]
    pub fn events(&self) -> &[LtcEvent] {
        &self.events
    }

    #[must_use]
    pub fn into_events(self) -> Vec<LtcEvent> {
        self.events
    }

    #[must_use]
    pub fn in_care(&self, person: PersonId) -> bool {
        self.members[person.index()].active.is_some()
    }
}

/// Inputs for one member-year
#[derive(Debug, Clone, Copy)]
pub struct MemberContext<'a> {
    pub id: PersonId,
    pub person: &'a Person,
    pub age: u8,
    pub alive: bool,
    /// Years since `as_of`
    pub year: usize,
    /// Household assets available before this member's care costs
    pub countable_assets: f64,
}

pub struct LtcModeler<'a> {
    assumptions: &'a LtcAssumptions,
}

impl<'a> LtcModeler<'a> {
    #[must_use]
    pub fn new(assumptions: &'a LtcAssumptions) -> Self {
        Self { assumptions }
    }

    /// Annual onset probability, capped at 1
    #[must_use]
    pub fn hazard(&self, age: u8, gender: Gender, health: HealthStatus) -> f64 {
        let a = self.assumptions;
        let base = a
            .incidence
            .iter()
            .filter(|band| age >= band.min_age)
            .max_by_key(|band| band.min_age)
            .map_or(0.0, |band| band.annual_rate);
        let gender_multiplier = match gender {
            Gender::Female => a.female_multiplier,
            Gender::Male => a.male_multiplier,
        };
        (base * gender_multiplier * a.health_multiplier(health)).clamp(0.0, 1.0)
    }

    /// Advance one member by one year and return that year's costs
    pub fn step<R: Rng + ?Sized>(
        &self,
        state: &mut LtcState,
        ctx: &MemberContext<'_>,
        rng: &mut R,
    ) -> LtcYear {
        if !self.assumptions.enabled {
            return LtcYear::default();
        }
        let onset_draw: f64 = rng.random();
        let slot = ctx.id.index();

        if !ctx.alive {
            state.members[slot].active = None;
            return LtcYear::default();
        }

        if state.members[slot].active.is_none()
            && state.members[slot].episodes < self.assumptions.max_episodes_per_person
            && onset_draw < self.hazard(ctx.age, ctx.person.gender, ctx.person.health)
        {
            let event = self.start_episode(ctx, rng);
            let pool = ctx
                .person
                .ltc_insurance
                .as_ref()
                .map_or(0.0, |policy| benefit_pool(policy, ctx.year));
            state.events.push(event);
            state.members[slot].active = Some(ActiveEpisode {
                event: state.events.len() - 1,
                years_elapsed: 0,
                pool,
            });
            state.members[slot].episodes += 1;
        }

        let Some(mut episode) = state.members[slot].active.take() else {
            return LtcYear::default();
        };
        let event = &mut state.events[episode.event];

        let cost = event.annual_cost
            * (1.0 + self.assumptions.cost_inflation).powi(i32::from(episode.years_elapsed));

        let insurance_paid = match &ctx.person.ltc_insurance {
            Some(policy) => {
                let covered_days = if episode.years_elapsed == 0 {
                    365.0 - f64::from(policy.elimination_days.min(365))
                } else {
                    365.0
                };
                let daily = daily_benefit(policy, ctx.year);
                cost.min(daily * covered_days).min(episode.pool).max(0.0)
            }
            None => 0.0,
        };
        episode.pool -= insurance_paid;

        let mut out_of_pocket = cost - insurance_paid;
        if event.medicaid_required {
            out_of_pocket = 0.0;
        } else if ctx.countable_assets - out_of_pocket < self.assumptions.medicaid_asset_threshold {
            // Spend down to the threshold; Medicaid carries the rest of the episode
            out_of_pocket = (ctx.countable_assets - self.assumptions.medicaid_asset_threshold)
                .clamp(0.0, out_of_pocket);
            event.medicaid_required = true;
        }

        if episode.years_elapsed == 0 {
            event.insurance_offset = insurance_paid;
        }
        event.insurance_paid_total += insurance_paid;
        event.out_of_pocket_total += out_of_pocket;

        episode.years_elapsed += 1;
        if episode.years_elapsed < event.duration_years {
            state.members[slot].active = Some(episode);
        }

        LtcYear {
            cost,
            insurance_paid,
            out_of_pocket,
        }
    }

    fn start_episode<R: Rng + ?Sized>(&self, ctx: &MemberContext<'_>, rng: &mut R) -> LtcEvent {
        let a = self.assumptions;
        let profile = choose_setting(&a.settings, rng.random::<f64>());

        let max_years = a.max_duration_years.max(1);
        let duration_years = match Exp::new(1.0 / profile.mean_duration_years) {
            Ok(exp) => {
                let years: f64 = exp.sample(rng);
                (years.ceil() as u8).clamp(1, max_years)
            }
            Err(_) => 1,
        };

        let dispersion = profile.cost_dispersion;
        let cost_factor = if dispersion > 0.0 {
            // Mean-one log-normal
            LogNormal::new(-0.5 * dispersion * dispersion, dispersion)
                .map_or(1.0, |d| d.sample(rng))
        } else {
            1.0
        };
        let year = i32::try_from(ctx.year).unwrap_or(i32::MAX);
        let annual_cost = profile.annual_cost * cost_factor * (1.0 + a.cost_inflation).powi(year);

        LtcEvent {
            person: ctx.id,
            start_age: ctx.age,
            duration_years,
            setting: profile.setting,
            annual_cost,
            insurance_offset: 0.0,
            insurance_paid_total: 0.0,
            out_of_pocket_total: 0.0,
            medicaid_required: false,
        }
    }
}

fn choose_setting(settings: &[CareSettingProfile], u: f64) -> CareSettingProfile {
    let mut cumulative = 0.0;
    for profile in settings {
        cumulative += profile.probability;
        if u < cumulative {
            return *profile;
        }
    }
    // Validation guarantees at least one setting when enabled
    settings[settings.len() - 1]
}

fn rider_factor(policy: &LtcInsurance, year: usize) -> f64 {
    (1.0 + policy.inflation_rider).powi(i32::try_from(year).unwrap_or(i32::MAX))
}

fn daily_benefit(policy: &LtcInsurance, year: usize) -> f64 {
    policy.daily_benefit * rider_factor(policy, year)
}

/// Total benefit available for an episode starting in `year`
fn benefit_pool(policy: &LtcInsurance, year: usize) -> f64 {
    daily_benefit(policy, year) * 365.0 * policy.benefit_period_years
}
