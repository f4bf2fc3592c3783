mod distribution;
mod engine;
mod error;
mod insurance;
mod redistribution;
mod solver;
mod tax;
mod types;

pub use distribution::IncomeDistribution;
pub use engine::{
    BreakevenParams, DEFAULT_MAX_ITERATIONS, ScenarioConfig, required_capital, run_scenarios,
    years_to_breakeven,
};
pub use error::{DistributionIntegrityWarning, ModelError};
pub use insurance::{InsuranceEstimate, InsurancePopulation, effective_contribution};
pub use redistribution::{SupportParams, compute_support};
pub use solver::{GrossSolveConfig, GrossSolveIteration, GrossSolveResult, gross_for_net};
pub use tax::{
    LinearZone, QuadraticZone, SocialSecurityBandSchedule, TaxBracketSchedule, TaxCalculator,
};
pub use types::{
    BracketSupport, BreakevenOutcome, IncomeBracket, ScenarioPoint, ScenarioReport,
    ScenarioSeries, SupportAllocation, TaxBreakdown,
};
