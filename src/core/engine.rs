use log::{debug, warn};

use super::distribution::IncomeDistribution;
use super::error::{ModelError, ensure_income};
use super::redistribution::{SupportParams, compute_support};
use super::tax::TaxCalculator;
use super::types::{BreakevenOutcome, ScenarioPoint, ScenarioReport, ScenarioSeries};

pub const DEFAULT_MAX_ITERATIONS: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BreakevenParams {
    pub growth_rate: f64,
    pub passive_rate: f64,
    pub annual_income: f64,
    pub income_cap: f64,
    pub income_support: f64,
}

impl BreakevenParams {
    fn validate(&self) -> Result<(), ModelError> {
        if !self.growth_rate.is_finite() || self.growth_rate <= -1.0 {
            return Err(ModelError::invalid(format!(
                "growth_rate must be > -1, got {}",
                self.growth_rate
            )));
        }
        if !self.passive_rate.is_finite() || self.passive_rate <= 0.0 {
            return Err(ModelError::invalid(format!(
                "passive_rate must be > 0, got {}",
                self.passive_rate
            )));
        }
        ensure_income("annual_income", self.annual_income)?;
        ensure_income("income_cap", self.income_cap)?;
        ensure_income("income_support", self.income_support)?;
        Ok(())
    }
}

#[derive(Debug, Default)]
struct SimulationState {
    accumulated_capital: f64,
    elapsed_years: u32,
}

impl SimulationState {
    fn step(&mut self, growth_rate: f64, contribution: f64) {
        self.accumulated_capital = self.accumulated_capital * (1.0 + growth_rate) + contribution;
        self.elapsed_years += 1;
    }
}

/// Capital whose passive yield replaces the net income, capped at the net
/// income of `income_cap`.
pub fn required_capital(calc: &TaxCalculator, params: &BreakevenParams) -> f64 {
    let reference_income = if params.annual_income >= params.income_cap {
        params.income_cap
    } else {
        params.annual_income
    };
    (calc.net_income(reference_income) / params.passive_rate).max(0.0)
}

/// Years of compounding until the capital fed by the tax currently paid,
/// plus any support, reaches the required capital.
///
/// The loop stops after `max_iterations` steps; the outcome is then flagged
/// as not converged and `years` is only a lower bound.
pub fn years_to_breakeven(
    calc: &TaxCalculator,
    params: BreakevenParams,
    max_iterations: u32,
) -> Result<BreakevenOutcome, ModelError> {
    params.validate()?;
    if max_iterations == 0 {
        return Err(ModelError::invalid("max_iterations must be > 0"));
    }

    let required_capital = required_capital(calc, &params);
    let contribution = calc.income_tax(params.annual_income) + params.income_support;

    let mut state = SimulationState::default();
    let mut converged = false;
    while state.elapsed_years < max_iterations {
        state.step(params.growth_rate, contribution);
        if state.accumulated_capital >= required_capital {
            converged = true;
            break;
        }
    }

    if converged {
        debug!(
            "income {} reaches {required_capital:.2} after {} years",
            params.annual_income, state.elapsed_years
        );
    } else {
        warn!(
            "income {} did not reach {required_capital:.2} within {max_iterations} years (growth {}, support {})",
            params.annual_income, params.growth_rate, params.income_support
        );
    }

    Ok(BreakevenOutcome {
        years: state.elapsed_years,
        required_capital,
        accumulated_capital: state.accumulated_capital,
        converged,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioConfig {
    pub growth_rates: Vec<f64>,
    pub passive_rate: f64,
    pub support: SupportParams,
    pub max_iterations: u32,
}

/// Years to break even for every bracket and growth rate, once without and
/// once with the support the redistribution scheme would pay.
pub fn run_scenarios(
    calc: &TaxCalculator,
    distribution: &IncomeDistribution,
    config: &ScenarioConfig,
) -> Result<ScenarioReport, ModelError> {
    if config.growth_rates.is_empty() {
        return Err(ModelError::invalid("at least one growth rate is required"));
    }
    // The run continues on the raw masses.
    let integrity_warning = distribution.validate_probabilities().err();

    let allocation = compute_support(calc, distribution, config.support)?;
    let mut series = Vec::with_capacity(config.growth_rates.len() * 2);

    for &growth_rate in &config.growth_rates {
        for with_support in [false, true] {
            let mut points = Vec::with_capacity(allocation.brackets.len());
            for bracket in &allocation.brackets {
                let income_support = if with_support {
                    bracket.support_amount
                } else {
                    0.0
                };
                let outcome = years_to_breakeven(
                    calc,
                    BreakevenParams {
                        growth_rate,
                        passive_rate: config.passive_rate,
                        annual_income: bracket.annual_income,
                        income_cap: config.support.income_cap,
                        income_support,
                    },
                    config.max_iterations,
                )?;
                points.push(ScenarioPoint {
                    annual_income: bracket.annual_income,
                    income_support,
                    years_to_breakeven: outcome.years,
                    required_capital: outcome.required_capital,
                    converged: outcome.converged,
                });
            }
            series.push(ScenarioSeries {
                growth_rate,
                with_support,
                points,
            });
        }
    }

    Ok(ScenarioReport {
        income_cap: config.support.income_cap,
        passive_rate: config.passive_rate,
        allocation,
        series,
        integrity_warning,
    })
}
