use log::debug;

use super::distribution::IncomeDistribution;
use super::error::{ModelError, ensure_income};
use super::tax::TaxCalculator;
use super::types::{BracketSupport, SupportAllocation};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SupportParams {
    pub income_cap: f64,
    pub citizen_count: f64,
    pub economy_subsidy: f64,
}

impl SupportParams {
    pub fn new(income_cap: f64) -> Self {
        Self {
            income_cap,
            citizen_count: 1.0,
            economy_subsidy: 0.0,
        }
    }

    fn validate(&self) -> Result<(), ModelError> {
        ensure_income("income_cap", self.income_cap)?;
        if !self.citizen_count.is_finite() || self.citizen_count <= 0.0 {
            return Err(ModelError::invalid("citizen_count must be > 0"));
        }
        if !self.economy_subsidy.is_finite() || self.economy_subsidy < 0.0 {
            return Err(ModelError::invalid("economy_subsidy must be >= 0"));
        }
        Ok(())
    }
}

/// Splits the excess tax of earners at or above the cap, plus the subsidy,
/// across the brackets below the cap in proportion to their mass.
pub fn compute_support(
    calc: &TaxCalculator,
    distribution: &IncomeDistribution,
    params: SupportParams,
) -> Result<SupportAllocation, ModelError> {
    params.validate()?;
    let Some((_, max_income)) = distribution.income_range() else {
        return Err(ModelError::invalid("income distribution is empty"));
    };
    if params.income_cap > max_income {
        return Err(ModelError::invalid(format!(
            "income_cap {} lies above the highest bracket income {max_income}",
            params.income_cap
        )));
    }

    let tax_at_cap = calc.income_tax(params.income_cap);
    let mut surplus_under_cap = 0.0;
    let mut deficit_over_cap = 0.0;
    let mut mass_below_cap = 0.0;

    for bracket in distribution.brackets() {
        let deviation = tax_at_cap - calc.income_tax(bracket.annual_income);
        let weighted = deviation * bracket.probability_mass;
        if bracket.annual_income < params.income_cap {
            surplus_under_cap += weighted;
            mass_below_cap += bracket.probability_mass;
        } else {
            deficit_over_cap += weighted;
        }
    }

    if mass_below_cap <= 0.0 {
        return Err(ModelError::invalid(format!(
            "income_cap {} leaves no probability mass below the cap",
            params.income_cap
        )));
    }

    let net_support_balance = surplus_under_cap - deficit_over_cap.abs();
    let subsidy_share = params.economy_subsidy / (params.citizen_count * mass_below_cap);
    let pool = deficit_over_cap.abs() + subsidy_share;

    let brackets = distribution
        .brackets()
        .iter()
        .map(|bracket| {
            let support_amount = if bracket.annual_income < params.income_cap {
                pool * (bracket.probability_mass / mass_below_cap)
            } else {
                0.0
            };
            BracketSupport {
                annual_income: bracket.annual_income,
                support_amount,
            }
        })
        .collect();

    debug!(
        "support at cap {}: surplus {surplus_under_cap:.2}, deficit {deficit_over_cap:.2}, balance {net_support_balance:.2}",
        params.income_cap
    );

    Ok(SupportAllocation {
        brackets,
        net_support_balance,
        surplus_under_cap,
        deficit_over_cap,
        mass_below_cap,
    })
}
