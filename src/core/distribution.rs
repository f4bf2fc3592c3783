use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::error::{DistributionIntegrityWarning, ModelError, ensure_income};
use super::types::IncomeBracket;

/// Masses are checked after rounding their sum to one decimal.
const MASS_TOLERANCE: f64 = 1e-6;
/// Removed mass above which a cutoff is reported as skewing the histogram.
const NOTABLE_REMOVED_MASS: f64 = 1e-3;

#[derive(Debug, Deserialize)]
struct DistributionFile {
    brackets: Vec<IncomeBracket>,
}

impl TryFrom<DistributionFile> for IncomeDistribution {
    type Error = ModelError;

    fn try_from(value: DistributionFile) -> Result<Self, Self::Error> {
        IncomeDistribution::new(value.brackets)
    }
}

/// Discretized income histogram, in insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DistributionFile")]
pub struct IncomeDistribution {
    brackets: Vec<IncomeBracket>,
}

impl IncomeDistribution {
    pub fn new(brackets: Vec<IncomeBracket>) -> Result<Self, ModelError> {
        for (idx, bracket) in brackets.iter().enumerate() {
            ensure_income(&format!("brackets[{idx}].annual_income"), bracket.annual_income)?;
            if !(0.0..=1.0).contains(&bracket.probability_mass) {
                return Err(ModelError::invalid(format!(
                    "brackets[{idx}].probability_mass must be between 0 and 1, got {}",
                    bracket.probability_mass
                )));
            }
        }
        Ok(Self { brackets })
    }

    pub fn from_pairs(pairs: &[(f64, f64)]) -> Result<Self, ModelError> {
        Self::new(
            pairs
                .iter()
                .map(|&(income, mass)| IncomeBracket::new(income, mass))
                .collect(),
        )
    }

    pub fn brackets(&self) -> &[IncomeBracket] {
        &self.brackets
    }

    pub fn len(&self) -> usize {
        self.brackets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.brackets.is_empty()
    }

    pub fn total_mass(&self) -> f64 {
        self.brackets.iter().map(|b| b.probability_mass).sum()
    }

    pub fn income_range(&self) -> Option<(f64, f64)> {
        let mut incomes = self.brackets.iter().map(|b| b.annual_income);
        let first = incomes.next()?;
        Some(incomes.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v))))
    }

    /// Detection only: the masses are never normalized here.
    pub fn validate_probabilities(&self) -> Result<(), DistributionIntegrityWarning> {
        let total_mass = self.total_mass();
        let rounded = (total_mass * 10.0).round() / 10.0;
        if (rounded - 1.0).abs() > MASS_TOLERANCE {
            let warning = DistributionIntegrityWarning { total_mass };
            warn!("{warning}");
            return Err(warning);
        }
        Ok(())
    }

    /// Keeps brackets with `annual_income >= threshold`.
    ///
    /// Masses are not renormalized, so the result no longer sums to one when
    /// brackets were dropped.
    pub fn cutoff(&self, threshold: f64) -> IncomeDistribution {
        let brackets: Vec<IncomeBracket> = self
            .brackets
            .iter()
            .filter(|b| b.annual_income >= threshold)
            .copied()
            .collect();
        let kept = Self { brackets };

        let removed_mass = self.total_mass() - kept.total_mass();
        if removed_mass > NOTABLE_REMOVED_MASS {
            warn!(
                "cutoff at {threshold} removed probability mass {removed_mass:.4}; remaining masses are not renormalized"
            );
        } else {
            debug!("cutoff at {threshold} kept {} of {} brackets", kept.len(), self.len());
        }
        kept
    }
}
