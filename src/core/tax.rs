use serde::{Deserialize, Serialize};

use super::error::ModelError;
use super::types::TaxBreakdown;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuadraticZone {
    pub slope: f64,
    pub curvature: f64,
}

impl QuadraticZone {
    fn tax_over(self, excess: f64) -> f64 {
        self.slope * excess + self.curvature * excess * excess
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearZone {
    pub rate: f64,
    pub offset: f64,
}

impl LinearZone {
    fn tax_at(self, income: f64) -> f64 {
        self.rate * income - self.offset.abs()
    }
}

/// Progressive income-tax tariff for one tax year.
///
/// Zones: tax free up to `e0`, two quadratic progression zones up to `e1`
/// and `e2`, then two linear zones split at `e3`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TaxBracketSchedule {
    pub e0: f64,
    pub e1: f64,
    pub e2: f64,
    pub e3: f64,
    pub first_progression: QuadraticZone,
    pub second_progression: QuadraticZone,
    pub proportional: LinearZone,
    pub top: LinearZone,
}

impl TaxBracketSchedule {
    /// 2025 tariff. `e3` is where the 42% and 45% lines meet.
    pub fn german_2025() -> Self {
        Self {
            e0: 12_097.0,
            e1: 17_444.0,
            e2: 68_481.0,
            e3: 277_825.0,
            first_progression: QuadraticZone {
                slope: 0.14,
                curvature: 932.30e-8,
            },
            second_progression: QuadraticZone {
                slope: 0.2397,
                curvature: 176.64e-8,
            },
            proportional: LinearZone {
                rate: 0.42,
                offset: 10_911.92,
            },
            top: LinearZone {
                rate: 0.45,
                offset: 19_246.67,
            },
        }
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        let bounds = [self.e0, self.e1, self.e2, self.e3];
        if bounds.iter().any(|b| !b.is_finite() || *b < 0.0) {
            return Err(ModelError::Config(
                "tax boundaries must be finite and >= 0".to_string(),
            ));
        }
        if !(self.e0 < self.e1 && self.e1 < self.e2 && self.e2 < self.e3) {
            return Err(ModelError::Config(
                "tax boundaries must satisfy e0 < e1 < e2 < e3".to_string(),
            ));
        }
        for (name, value) in [
            ("first_progression.slope", self.first_progression.slope),
            ("first_progression.curvature", self.first_progression.curvature),
            ("second_progression.slope", self.second_progression.slope),
            (
                "second_progression.curvature",
                self.second_progression.curvature,
            ),
            ("proportional.rate", self.proportional.rate),
            ("top.rate", self.top.rate),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ModelError::Config(format!("{name} must be >= 0")));
            }
        }
        Ok(())
    }

    /// Tax accrued through the whole first progression zone.
    fn first_zone_total(&self) -> f64 {
        self.first_progression.tax_over(self.e1 - self.e0)
    }

    /// Unrounded zone formula, exposed for boundary checks.
    pub(crate) fn raw_tax(&self, income: f64) -> f64 {
        if income <= self.e0 {
            0.0
        } else if income <= self.e1 {
            self.first_progression.tax_over(income - self.e0)
        } else if income <= self.e2 {
            self.first_zone_total() + self.second_progression.tax_over(income - self.e1)
        } else if income <= self.e3 {
            self.proportional.tax_at(income)
        } else {
            self.top.tax_at(income)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SocialSecurityBandSchedule {
    pub lower_limit: f64,
    pub upper_limit: f64,
    /// Medical, pension and unemployment employee-side rates combined.
    pub combined_rate: f64,
}

impl SocialSecurityBandSchedule {
    pub fn german_2025() -> Self {
        Self {
            lower_limit: 12_097.0,
            upper_limit: 68_481.0,
            combined_rate: 0.197,
        }
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if !self.lower_limit.is_finite() || !self.upper_limit.is_finite() {
            return Err(ModelError::Config(
                "social security limits must be finite".to_string(),
            ));
        }
        if self.lower_limit < 0.0 || self.upper_limit < self.lower_limit {
            return Err(ModelError::Config(
                "social security limits must satisfy 0 <= lower_limit <= upper_limit".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.combined_rate) {
            return Err(ModelError::Config(
                "social security combined_rate must be between 0 and 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Income tax and social security for a fixed pair of schedules.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaxCalculator {
    pub schedule: TaxBracketSchedule,
    pub social_security: SocialSecurityBandSchedule,
}

impl Default for TaxCalculator {
    fn default() -> Self {
        Self::new(
            TaxBracketSchedule::german_2025(),
            SocialSecurityBandSchedule::german_2025(),
        )
    }
}

impl TaxCalculator {
    pub fn new(schedule: TaxBracketSchedule, social_security: SocialSecurityBandSchedule) -> Self {
        Self {
            schedule,
            social_security,
        }
    }

    /// Income tax rounded to the cent. `income` must be finite and non-negative.
    pub fn income_tax(&self, income: f64) -> f64 {
        debug_assert!(income.is_finite() && income >= 0.0);
        round_cents(self.schedule.raw_tax(income))
    }

    /// Contributions are capped at the upper limit; income above it is not charged.
    pub fn social_security_tax(&self, income: f64) -> f64 {
        let bands = &self.social_security;
        if income <= 0.0 || income <= bands.lower_limit {
            0.0
        } else if income <= bands.upper_limit {
            income * bands.combined_rate
        } else {
            bands.upper_limit * bands.combined_rate
        }
    }

    pub fn net_income(&self, income: f64) -> f64 {
        income - self.income_tax(income) - self.social_security_tax(income)
    }

    pub fn breakdown(&self, income: f64) -> TaxBreakdown {
        let income_tax = self.income_tax(income);
        let social_security = self.social_security_tax(income);
        let net_income = income - income_tax - social_security;
        let average_rate = if income > 0.0 {
            (income_tax + social_security) / income
        } else {
            0.0
        };
        TaxBreakdown {
            gross_income: income,
            income_tax,
            social_security,
            net_income,
            monthly_net_income: net_income / 12.0,
            average_rate,
        }
    }
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
