//! Model configuration
//!
//! Everything here is plain numbers read once at startup: the tariff, the
//! social-security bands and the scenario parameters.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::{
    DEFAULT_MAX_ITERATIONS, IncomeDistribution, ModelError, ScenarioConfig,
    SocialSecurityBandSchedule, SupportParams, TaxBracketSchedule, TaxCalculator,
};

pub const CONFIG_ENV_VAR: &str = "TAX_AUTONOMY_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub tax_schedule: TaxBracketSchedule,
    pub social_security: SocialSecurityBandSchedule,
    /// Annual capital growth rates, one scenario each
    pub growth_rates: Vec<f64>,
    /// Yield on the accumulated capital once it replaces income
    pub passive_rate: f64,
    pub income_cap: f64,
    pub citizen_count: f64,
    pub economy_subsidy: f64,
    pub max_iterations: u32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            tax_schedule: TaxBracketSchedule::german_2025(),
            social_security: SocialSecurityBandSchedule::german_2025(),
            growth_rates: vec![0.05, 0.07, 0.10],
            passive_rate: 0.05,
            income_cap: 100_000.0,
            citizen_count: 1.0,
            economy_subsidy: 0.0,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

impl ModelConfig {
    /// Load from `path`, or from the file named by `TAX_AUTONOMY_CONFIG`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => std::env::var(CONFIG_ENV_VAR)
                .map(PathBuf::from)
                .with_context(|| format!("{CONFIG_ENV_VAR} is not set"))?,
        };

        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = Self::from_toml_str(&raw)?;
        log::info!("Loaded model config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: ModelConfig = toml::from_str(raw).context("Failed to parse config TOML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        self.tax_schedule.validate()?;
        self.social_security.validate()?;
        if self.growth_rates.is_empty() {
            return Err(ModelError::Config("growth_rates must not be empty".to_string()));
        }
        if self
            .growth_rates
            .iter()
            .any(|r| !r.is_finite() || *r <= -1.0)
        {
            return Err(ModelError::Config("growth_rates must be > -1".to_string()));
        }
        if !self.passive_rate.is_finite() || self.passive_rate <= 0.0 {
            return Err(ModelError::Config("passive_rate must be > 0".to_string()));
        }
        if !self.income_cap.is_finite() || self.income_cap < 0.0 {
            return Err(ModelError::Config("income_cap must be >= 0".to_string()));
        }
        if !self.citizen_count.is_finite() || self.citizen_count <= 0.0 {
            return Err(ModelError::Config("citizen_count must be > 0".to_string()));
        }
        if !self.economy_subsidy.is_finite() || self.economy_subsidy < 0.0 {
            return Err(ModelError::Config("economy_subsidy must be >= 0".to_string()));
        }
        if self.max_iterations == 0 {
            return Err(ModelError::Config("max_iterations must be > 0".to_string()));
        }
        Ok(())
    }

    pub fn calculator(&self) -> TaxCalculator {
        TaxCalculator::new(self.tax_schedule, self.social_security)
    }

    pub fn support_params(&self) -> SupportParams {
        SupportParams {
            income_cap: self.income_cap,
            citizen_count: self.citizen_count,
            economy_subsidy: self.economy_subsidy,
        }
    }

    pub fn scenario_config(&self) -> ScenarioConfig {
        ScenarioConfig {
            growth_rates: self.growth_rates.clone(),
            passive_rate: self.passive_rate,
            support: self.support_params(),
            max_iterations: self.max_iterations,
        }
    }
}

/// Reads an income table; `.json` files are parsed as JSON, anything else as TOML.
pub fn load_distribution(path: &Path) -> Result<IncomeDistribution> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read distribution file: {}", path.display()))?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let distribution = if is_json {
        serde_json::from_str(&raw).context("Failed to parse distribution JSON")?
    } else {
        toml::from_str(&raw).context("Failed to parse distribution TOML")?
    };
    Ok(distribution)
}
