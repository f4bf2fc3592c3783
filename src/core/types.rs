use serde::{Deserialize, Serialize, Serializer};

use super::error::DistributionIntegrityWarning;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomeBracket {
    #[serde(alias = "annual_income")]
    pub annual_income: f64,
    #[serde(alias = "probability_mass")]
    pub probability_mass: f64,
}

impl IncomeBracket {
    pub fn new(annual_income: f64, probability_mass: f64) -> Self {
        Self {
            annual_income,
            probability_mass,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxBreakdown {
    pub gross_income: f64,
    pub income_tax: f64,
    pub social_security: f64,
    pub net_income: f64,
    pub monthly_net_income: f64,
    pub average_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakevenOutcome {
    pub years: u32,
    pub required_capital: f64,
    pub accumulated_capital: f64,
    /// False when the iteration bound was hit first; `years` is then a lower bound.
    pub converged: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BracketSupport {
    pub annual_income: f64,
    pub support_amount: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportAllocation {
    pub brackets: Vec<BracketSupport>,
    /// Surplus under the cap minus the excess tax collected above it.
    pub net_support_balance: f64,
    pub surplus_under_cap: f64,
    pub deficit_over_cap: f64,
    pub mass_below_cap: f64,
}

impl SupportAllocation {
    pub fn total_support(&self) -> f64 {
        self.brackets.iter().map(|b| b.support_amount).sum()
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioPoint {
    pub annual_income: f64,
    pub income_support: f64,
    pub years_to_breakeven: u32,
    pub required_capital: f64,
    pub converged: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioSeries {
    pub growth_rate: f64,
    pub with_support: bool,
    pub points: Vec<ScenarioPoint>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioReport {
    pub income_cap: f64,
    pub passive_rate: f64,
    pub allocation: SupportAllocation,
    pub series: Vec<ScenarioSeries>,
    /// Set when the bracket masses do not sum to one; the run still used them.
    #[serde(serialize_with = "warning_message")]
    pub integrity_warning: Option<DistributionIntegrityWarning>,
}

fn warning_message<S: Serializer>(
    warning: &Option<DistributionIntegrityWarning>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match warning {
        Some(w) => serializer.collect_str(w),
        None => serializer.serialize_none(),
    }
}
