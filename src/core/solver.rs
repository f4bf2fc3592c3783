use super::error::ModelError;
use super::tax::TaxCalculator;

#[derive(Debug, Clone, Copy)]
pub struct GrossSolveConfig {
    pub target_net_income: f64,
    pub search_min: f64,
    pub search_max: f64,
    pub tolerance: f64,
    pub max_iterations: u32,
}

impl GrossSolveConfig {
    pub fn for_target(target_net_income: f64) -> Self {
        Self {
            target_net_income,
            search_min: 0.0,
            search_max: 1_000_000.0,
            tolerance: 0.01,
            max_iterations: 64,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct GrossSolveIteration {
    pub iteration: u32,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub candidate_gross: f64,
    pub candidate_net: f64,
}

#[derive(Debug, Clone)]
pub struct GrossSolveResult {
    pub target_net_income: f64,
    pub solved_gross: Option<f64>,
    pub achieved_net_income: Option<f64>,
    pub iterations: Vec<GrossSolveIteration>,
    pub converged: bool,
    pub feasible: bool,
    pub message: String,
}

/// Gross income whose net income reaches the target, found by bisection
/// over the search range.
///
/// Net income drops where social security starts, so targets just below the
/// contribution threshold resolve to a gross income under that threshold.
pub fn gross_for_net(
    calc: &TaxCalculator,
    config: GrossSolveConfig,
) -> Result<GrossSolveResult, ModelError> {
    validate_config(config)?;

    let target = config.target_net_income;
    let mut iterations = Vec::with_capacity(config.max_iterations as usize);
    let mut solved_gross = None;
    let mut converged = false;
    let feasible;
    let message;

    if calc.net_income(config.search_min) >= target {
        solved_gross = Some(config.search_min);
        converged = true;
        feasible = true;
        message = "Target already met at the lower search bound.".to_string();
    } else if calc.net_income(config.search_max) < target {
        feasible = false;
        message = "No gross income within the search bounds reaches the target.".to_string();
    } else {
        let mut lo = config.search_min;
        let mut hi = config.search_max;
        let mut it = 0;
        while it < config.max_iterations {
            it += 1;
            let mid = (lo + hi) * 0.5;
            let net = calc.net_income(mid);
            iterations.push(GrossSolveIteration {
                iteration: it,
                lower_bound: lo,
                upper_bound: hi,
                candidate_gross: mid,
                candidate_net: net,
            });

            if net >= target {
                hi = mid;
            } else {
                lo = mid;
            }

            if (hi - lo).abs() <= config.tolerance {
                converged = true;
                break;
            }
        }
        solved_gross = Some(hi);
        feasible = true;
        message = if converged {
            "Solved gross income for target net income.".to_string()
        } else {
            "Reached max iterations before tolerance was met; returning best estimate."
                .to_string()
        };
    }

    Ok(GrossSolveResult {
        target_net_income: target,
        solved_gross,
        achieved_net_income: solved_gross.map(|gross| calc.net_income(gross)),
        iterations,
        converged,
        feasible,
        message,
    })
}

fn validate_config(config: GrossSolveConfig) -> Result<(), ModelError> {
    if !config.target_net_income.is_finite() || config.target_net_income < 0.0 {
        return Err(ModelError::invalid("target_net_income must be >= 0"));
    }
    if !config.search_min.is_finite() || !config.search_max.is_finite() {
        return Err(ModelError::invalid("search bounds must be finite"));
    }
    if config.search_min < 0.0 {
        return Err(ModelError::invalid("search_min must be >= 0"));
    }
    if config.search_max <= config.search_min {
        return Err(ModelError::invalid(
            "search_max must be greater than search_min",
        ));
    }
    if !config.tolerance.is_finite() || config.tolerance <= 0.0 {
        return Err(ModelError::invalid("tolerance must be > 0"));
    }
    if config.max_iterations == 0 {
        return Err(ModelError::invalid("max_iterations must be > 0"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() <= tol,
            "expected {expected}, got {actual}, tolerance {tol}"
        );
    }

    #[test]
    fn solves_gross_for_known_net_income() {
        let calc = TaxCalculator::default();
        let target = calc.net_income(60_000.0);
        let result = gross_for_net(&calc, GrossSolveConfig::for_target(target)).expect("must solve");

        assert!(result.feasible);
        assert!(result.converged);
        assert_close(result.solved_gross.expect("gross expected"), 60_000.0, 0.05);
        assert!(result.achieved_net_income.expect("net expected") >= target);
    }

    #[test]
    fn zero_target_is_met_at_lower_bound() {
        let calc = TaxCalculator::default();
        let result = gross_for_net(&calc, GrossSolveConfig::for_target(0.0)).expect("must solve");
        assert_eq!(result.solved_gross, Some(0.0));
        assert!(result.iterations.is_empty());
    }

    #[test]
    fn reports_infeasible_when_bounds_too_low() {
        let calc = TaxCalculator::default();
        let mut config = GrossSolveConfig::for_target(80_000.0);
        config.search_max = 50_000.0;
        let result = gross_for_net(&calc, config).expect("must return result");
        assert!(!result.feasible);
        assert!(result.solved_gross.is_none());
    }

    #[test]
    fn returns_best_estimate_when_iterations_run_out() {
        let calc = TaxCalculator::default();
        let mut config = GrossSolveConfig::for_target(30_000.0);
        config.max_iterations = 3;
        let result = gross_for_net(&calc, config).expect("must return result");
        assert!(result.feasible);
        assert!(!result.converged);
        assert_eq!(result.iterations.len(), 3);
        assert!(result.achieved_net_income.expect("net expected") >= 30_000.0);
    }

    #[test]
    fn rejects_invalid_config() {
        let calc = TaxCalculator::default();
        let mut config = GrossSolveConfig::for_target(10_000.0);
        config.tolerance = 0.0;
        assert!(gross_for_net(&calc, config).is_err());

        let mut config = GrossSolveConfig::for_target(10_000.0);
        config.search_max = config.search_min;
        assert!(gross_for_net(&calc, config).is_err());

        assert!(gross_for_net(&calc, GrossSolveConfig::for_target(-1.0)).is_err());
    }
}
