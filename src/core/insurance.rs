use serde::Serialize;

use super::error::ModelError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InsurancePopulation {
    pub monthly_cost_per_payer: f64,
    pub payers: f64,
    pub non_payers: f64,
}

impl Default for InsurancePopulation {
    fn default() -> Self {
        Self {
            monthly_cost_per_payer: 350.0,
            payers: 58e6,
            non_payers: 74e6 - 58e6,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsuranceEstimate {
    pub total_monthly_payments: f64,
    pub effective_monthly_payment: f64,
    pub cross_subsidy_per_payer: f64,
}

/// Monthly contribution each payer carries once non-paying insured members
/// are covered from the same pool.
pub fn effective_contribution(
    population: InsurancePopulation,
) -> Result<InsuranceEstimate, ModelError> {
    if !population.monthly_cost_per_payer.is_finite() || population.monthly_cost_per_payer < 0.0 {
        return Err(ModelError::invalid("monthly cost must be >= 0"));
    }
    if !population.payers.is_finite() || population.payers <= 0.0 {
        return Err(ModelError::invalid("payers must be > 0"));
    }
    if !population.non_payers.is_finite() || population.non_payers < 0.0 {
        return Err(ModelError::invalid("non_payers must be >= 0"));
    }

    let insured = population.payers + population.non_payers;
    let effective = insured / population.payers * population.monthly_cost_per_payer;
    Ok(InsuranceEstimate {
        total_monthly_payments: population.monthly_cost_per_payer * population.payers,
        effective_monthly_payment: effective,
        cross_subsidy_per_payer: effective - population.monthly_cost_per_payer,
    })
}
