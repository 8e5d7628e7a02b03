mod buckets;
mod ids;
mod ltc;
mod market;
mod params;
mod results;
mod rmd;
mod tax_config;

pub use buckets::{AssetBuckets, BucketBalances, BucketKind};
pub use ids::PersonId;
pub use ltc::{
    CareSetting, CareSettingProfile, Gender, HealthStatus, IncidenceBand, LtcAssumptions,
    LtcEvent, LtcInsurance,
};
pub use market::{
    Allocation, AssetClass, ClassAssumption, MarketAssumptions, NUM_ASSET_CLASSES, Regime,
    RegimeEffect, RegimeModel,
};
pub use params::{
    Contributions, ExpenseSchedule, GuardrailConfig, OneTimeExpense, PartTimeIncome, Pension,
    Person, SimulationParams, SocialSecurity, WithdrawalTiming,
};
pub use results::{
    AggregateResult, BucketAmounts, DroppedTrials, GuardrailRule, GuardrailStats, Phase, RunMode,
    ScenarioResult, TaxBreakdown, YearBand, YearlyCashFlow,
};
pub use rmd::{RmdTable, RmdTableEntry};
pub use tax_config::{
    FilingStatus, FilingTable, IrmaaTier, PolicyTables, SocialSecurityThresholds, StateTax,
    TaxBracket, TaxPolicy,
};
