use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router,
    extract::{Json, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

use crate::config::{CONFIG_ENV_VAR, ModelConfig, load_distribution};
use crate::core::{
    BreakevenOutcome, BreakevenParams, GrossSolveConfig, IncomeBracket, IncomeDistribution,
    InsuranceEstimate, InsurancePopulation, ScenarioConfig, ScenarioReport, SupportAllocation,
    SupportParams, TaxBreakdown, compute_support, effective_contribution, gross_for_net,
    run_scenarios, years_to_breakeven,
};

#[derive(Parser, Debug)]
#[command(
    name = "tax-autonomy",
    about = "German net income, years until capital replaces income, and capped-income redistribution"
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        help = "Model config TOML; defaults to $TAX_AUTONOMY_CONFIG or built-in 2025 values"
    )]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Income tax, social security and net income for one gross income
    Tax(TaxArgs),
    /// Gross income needed for a target net income
    Gross(GrossArgs),
    /// Years until invested tax payments replace net income
    Breakeven(BreakevenArgs),
    /// Per-bracket support under an income cap
    Support(DistributionArgs),
    /// Breakeven years per bracket and growth rate, with and without support
    Scenarios(ScenarioArgs),
    /// Effective health-insurance contribution once non-payers are covered
    Insurance(InsuranceArgs),
    /// Serve the JSON API over HTTP
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
}

#[derive(Args, Debug, Clone, Default)]
struct TaxArgs {
    #[arg(long, help = "Annual gross income")]
    income: f64,
}

#[derive(Args, Debug, Clone, Default)]
struct GrossArgs {
    #[arg(long, help = "Target annual net income")]
    net_income: f64,
    #[arg(long, default_value_t = 1_000_000.0, help = "Upper bound of the gross search")]
    search_max: f64,
    #[arg(long, default_value_t = 0.01, help = "Search tolerance in currency units")]
    tolerance: f64,
}

#[derive(Args, Debug, Clone, Default)]
struct BreakevenArgs {
    #[arg(long, help = "Annual gross income")]
    income: f64,
    #[arg(
        long,
        help = "Annual capital growth in percent, defaults to the first configured rate"
    )]
    growth_rate: Option<f64>,
    #[arg(long, help = "Passive yield on the capital in percent")]
    passive_rate: Option<f64>,
    #[arg(long, help = "Income above which only the capped net income is replaced")]
    income_cap: Option<f64>,
    #[arg(long, default_value_t = 0.0, help = "Extra annual contribution on top of the tax paid")]
    income_support: f64,
    #[arg(long, help = "Upper bound on simulated years")]
    max_iterations: Option<u32>,
}

#[derive(Args, Debug, Clone, Default)]
struct RedistributionArgs {
    #[arg(long)]
    income_cap: Option<f64>,
    #[arg(long, help = "Population size the subsidy is spread over")]
    citizen_count: Option<f64>,
    #[arg(long, help = "Flat subsidy added to the support pool")]
    economy_subsidy: Option<f64>,
}

#[derive(Args, Debug, Clone)]
struct DistributionArgs {
    #[arg(long, help = "Income distribution file (.toml or .json)")]
    distribution: PathBuf,
    #[command(flatten)]
    redistribution: RedistributionArgs,
}

#[derive(Args, Debug, Clone)]
struct ScenarioArgs {
    #[command(flatten)]
    source: DistributionArgs,
    #[command(flatten)]
    growth: ScenarioGrowthArgs,
}

#[derive(Args, Debug, Clone, Default)]
struct ScenarioGrowthArgs {
    #[arg(
        long = "growth-rate",
        help = "Growth rate in percent; repeat for several scenarios"
    )]
    growth_rates: Vec<f64>,
    #[arg(long, help = "Passive yield on the capital in percent")]
    passive_rate: Option<f64>,
    #[arg(long)]
    max_iterations: Option<u32>,
}

#[derive(Args, Debug, Clone, Default)]
struct InsuranceArgs {
    #[arg(long, help = "Average monthly contribution per payer")]
    monthly_cost: Option<f64>,
    #[arg(long)]
    payers: Option<f64>,
    #[arg(long)]
    non_payers: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct TaxPayload {
    income: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct GrossPayload {
    net_income: Option<f64>,
    search_max: Option<f64>,
    tolerance: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct BreakevenPayload {
    income: Option<f64>,
    /// Percent, `7` is 7% a year
    growth_rate: Option<f64>,
    /// Percent
    passive_rate: Option<f64>,
    income_cap: Option<f64>,
    income_support: Option<f64>,
    max_iterations: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SupportPayload {
    distribution: Option<Vec<IncomeBracket>>,
    income_cap: Option<f64>,
    citizen_count: Option<f64>,
    economy_subsidy: Option<f64>,
    /// Percent, unlike the fractions in the config file
    growth_rates: Option<Vec<f64>>,
    /// Percent
    passive_rate: Option<f64>,
    max_iterations: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GrossResponse {
    target_net_income: f64,
    solved_gross: Option<f64>,
    achieved_net_income: Option<f64>,
    iterations: usize,
    converged: bool,
    feasible: bool,
    message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SupportResponse {
    #[serde(flatten)]
    allocation: SupportAllocation,
    integrity_warning: Option<String>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn percent_to_rate(flag: &str, value: f64) -> Result<f64, String> {
    if !value.is_finite() {
        return Err(format!("{flag} must be a finite percentage"));
    }
    Ok(value / 100.0)
}

fn ensure_non_negative(flag: &str, value: f64) -> Result<(), String> {
    if !value.is_finite() || value < 0.0 {
        return Err(format!("{flag} must be >= 0"));
    }
    Ok(())
}

fn build_breakeven(
    config: &ModelConfig,
    args: &BreakevenArgs,
) -> Result<(BreakevenParams, u32), String> {
    ensure_non_negative("--income", args.income)?;
    ensure_non_negative("--income-support", args.income_support)?;

    let growth_rate = match args.growth_rate {
        Some(v) => percent_to_rate("--growth-rate", v)?,
        None => config
            .growth_rates
            .first()
            .copied()
            .ok_or_else(|| "--growth-rate is required when no growth rates are configured".to_string())?,
    };
    if growth_rate <= -1.0 {
        return Err("--growth-rate must be > -100 (percent)".to_string());
    }

    let passive_rate = match args.passive_rate {
        Some(v) => percent_to_rate("--passive-rate", v)?,
        None => config.passive_rate,
    };
    if passive_rate <= 0.0 {
        return Err("--passive-rate must be > 0 (percent)".to_string());
    }

    let income_cap = args.income_cap.unwrap_or(config.income_cap);
    ensure_non_negative("--income-cap", income_cap)?;

    let max_iterations = args.max_iterations.unwrap_or(config.max_iterations);
    if max_iterations == 0 {
        return Err("--max-iterations must be > 0".to_string());
    }

    Ok((
        BreakevenParams {
            growth_rate,
            passive_rate,
            annual_income: args.income,
            income_cap,
            income_support: args.income_support,
        },
        max_iterations,
    ))
}

fn build_support_params(
    config: &ModelConfig,
    args: &RedistributionArgs,
) -> Result<SupportParams, String> {
    let income_cap = args.income_cap.unwrap_or(config.income_cap);
    ensure_non_negative("--income-cap", income_cap)?;

    let citizen_count = args.citizen_count.unwrap_or(config.citizen_count);
    if !citizen_count.is_finite() || citizen_count <= 0.0 {
        return Err("--citizen-count must be > 0".to_string());
    }

    let economy_subsidy = args.economy_subsidy.unwrap_or(config.economy_subsidy);
    ensure_non_negative("--economy-subsidy", economy_subsidy)?;

    Ok(SupportParams {
        income_cap,
        citizen_count,
        economy_subsidy,
    })
}

fn build_scenario_config(
    config: &ModelConfig,
    redistribution: &RedistributionArgs,
    growth: &ScenarioGrowthArgs,
) -> Result<ScenarioConfig, String> {
    let growth_rates = if growth.growth_rates.is_empty() {
        config.growth_rates.clone()
    } else {
        growth
            .growth_rates
            .iter()
            .map(|&v| percent_to_rate("--growth-rate", v))
            .collect::<Result<Vec<_>, _>>()?
    };
    if growth_rates.iter().any(|r| *r <= -1.0) {
        return Err("--growth-rate must be > -100 (percent)".to_string());
    }

    let passive_rate = match growth.passive_rate {
        Some(v) => percent_to_rate("--passive-rate", v)?,
        None => config.passive_rate,
    };
    if passive_rate <= 0.0 {
        return Err("--passive-rate must be > 0 (percent)".to_string());
    }

    let max_iterations = growth.max_iterations.unwrap_or(config.max_iterations);
    if max_iterations == 0 {
        return Err("--max-iterations must be > 0".to_string());
    }

    Ok(ScenarioConfig {
        growth_rates,
        passive_rate,
        support: build_support_params(config, redistribution)?,
        max_iterations,
    })
}

fn build_gross_config(args: &GrossArgs) -> Result<GrossSolveConfig, String> {
    ensure_non_negative("--net-income", args.net_income)?;
    if !args.search_max.is_finite() || args.search_max <= 0.0 {
        return Err("--search-max must be > 0".to_string());
    }
    if !args.tolerance.is_finite() || args.tolerance <= 0.0 {
        return Err("--tolerance must be > 0".to_string());
    }
    Ok(GrossSolveConfig {
        search_max: args.search_max,
        tolerance: args.tolerance,
        ..GrossSolveConfig::for_target(args.net_income)
    })
}

fn build_insurance(args: &InsuranceArgs) -> InsurancePopulation {
    let defaults = InsurancePopulation::default();
    InsurancePopulation {
        monthly_cost_per_payer: args.monthly_cost.unwrap_or(defaults.monthly_cost_per_payer),
        payers: args.payers.unwrap_or(defaults.payers),
        non_payers: args.non_payers.unwrap_or(defaults.non_payers),
    }
}

fn tax_response(config: &ModelConfig, args: &TaxArgs) -> Result<TaxBreakdown, String> {
    ensure_non_negative("--income", args.income)?;
    Ok(config.calculator().breakdown(args.income))
}

fn gross_response(config: &ModelConfig, args: &GrossArgs) -> Result<GrossResponse, String> {
    let solve = build_gross_config(args)?;
    let result = gross_for_net(&config.calculator(), solve).map_err(|e| e.to_string())?;
    Ok(GrossResponse {
        target_net_income: result.target_net_income,
        solved_gross: result.solved_gross,
        achieved_net_income: result.achieved_net_income,
        iterations: result.iterations.len(),
        converged: result.converged,
        feasible: result.feasible,
        message: result.message,
    })
}

fn breakeven_response(
    config: &ModelConfig,
    args: &BreakevenArgs,
) -> Result<BreakevenOutcome, String> {
    let (params, max_iterations) = build_breakeven(config, args)?;
    years_to_breakeven(&config.calculator(), params, max_iterations).map_err(|e| e.to_string())
}

fn support_response(
    config: &ModelConfig,
    distribution: &IncomeDistribution,
    args: &RedistributionArgs,
) -> Result<SupportResponse, String> {
    let params = build_support_params(config, args)?;
    let integrity_warning = distribution
        .validate_probabilities()
        .err()
        .map(|w| w.to_string());
    let allocation =
        compute_support(&config.calculator(), distribution, params).map_err(|e| e.to_string())?;
    Ok(SupportResponse {
        allocation,
        integrity_warning,
    })
}

fn scenarios_response(
    config: &ModelConfig,
    distribution: &IncomeDistribution,
    redistribution: &RedistributionArgs,
    growth: &ScenarioGrowthArgs,
) -> Result<ScenarioReport, String> {
    let scenario = build_scenario_config(config, redistribution, growth)?;
    run_scenarios(&config.calculator(), distribution, &scenario).map_err(|e| e.to_string())
}

fn insurance_response(args: &InsuranceArgs) -> Result<InsuranceEstimate, String> {
    effective_contribution(build_insurance(args)).map_err(|e| e.to_string())
}

fn resolve_config(path: Option<&Path>) -> anyhow::Result<ModelConfig> {
    let from_env = std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from);
    resolve_config_from(path, from_env.as_deref())
}

/// An explicit path must load. The environment path may name a file that
/// does not exist yet; any other failure is an error.
fn resolve_config_from(
    explicit: Option<&Path>,
    from_env: Option<&Path>,
) -> anyhow::Result<ModelConfig> {
    if explicit.is_some() {
        return ModelConfig::load(explicit);
    }
    match from_env {
        None => {
            log::debug!("No model config given, using built-in 2025 values");
            Ok(ModelConfig::default())
        }
        Some(path) if !path.exists() => {
            log::warn!(
                "{CONFIG_ENV_VAR} names missing file {}, using built-in 2025 values",
                path.display()
            );
            Ok(ModelConfig::default())
        }
        Some(path) => ModelConfig::load(Some(path)),
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub async fn run_cli(cli: Cli) -> anyhow::Result<()> {
    let config = resolve_config(cli.config.as_deref())?;

    match cli.command {
        Command::Tax(args) => print_json(&tax_response(&config, &args).map_err(anyhow::Error::msg)?),
        Command::Gross(args) => {
            print_json(&gross_response(&config, &args).map_err(anyhow::Error::msg)?)
        }
        Command::Breakeven(args) => {
            print_json(&breakeven_response(&config, &args).map_err(anyhow::Error::msg)?)
        }
        Command::Support(args) => {
            let distribution = load_distribution(&args.distribution)?;
            let response = support_response(&config, &distribution, &args.redistribution)
                .map_err(anyhow::Error::msg)?;
            print_json(&response)
        }
        Command::Scenarios(args) => {
            let distribution = load_distribution(&args.source.distribution)?;
            let response = scenarios_response(
                &config,
                &distribution,
                &args.source.redistribution,
                &args.growth,
            )
            .map_err(anyhow::Error::msg)?;
            print_json(&response)
        }
        Command::Insurance(args) => {
            print_json(&insurance_response(&args).map_err(anyhow::Error::msg)?)
        }
        Command::Serve { port } => run_http_server(port, config)
            .await
            .context("HTTP server failed"),
    }
}

type SharedConfig = Arc<ModelConfig>;

fn router(config: ModelConfig) -> Router {
    Router::new()
        .route("/api/tax", get(tax_get_handler).post(tax_post_handler))
        .route("/api/gross", get(gross_get_handler).post(gross_post_handler))
        .route(
            "/api/breakeven",
            get(breakeven_get_handler).post(breakeven_post_handler),
        )
        .route("/api/support", post(support_handler))
        .route("/api/scenarios", post(scenarios_handler))
        .fallback(not_found_handler)
        .with_state(Arc::new(config))
}

pub async fn run_http_server(port: u16, config: ModelConfig) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = router(config);

    let listener = TcpListener::bind(addr).await?;
    log::info!("tax-autonomy HTTP API listening on http://{addr}");

    axum::serve(listener, app).await
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn tax_get_handler(
    State(config): State<SharedConfig>,
    Query(payload): Query<TaxPayload>,
) -> Response {
    respond(tax_args_from_payload(payload).and_then(|args| tax_response(&config, &args)))
}

async fn tax_post_handler(
    State(config): State<SharedConfig>,
    Json(payload): Json<TaxPayload>,
) -> Response {
    respond(tax_args_from_payload(payload).and_then(|args| tax_response(&config, &args)))
}

async fn gross_get_handler(
    State(config): State<SharedConfig>,
    Query(payload): Query<GrossPayload>,
) -> Response {
    respond(gross_args_from_payload(payload).and_then(|args| gross_response(&config, &args)))
}

async fn gross_post_handler(
    State(config): State<SharedConfig>,
    Json(payload): Json<GrossPayload>,
) -> Response {
    respond(gross_args_from_payload(payload).and_then(|args| gross_response(&config, &args)))
}

async fn breakeven_get_handler(
    State(config): State<SharedConfig>,
    Query(payload): Query<BreakevenPayload>,
) -> Response {
    respond(
        breakeven_args_from_payload(payload).and_then(|args| breakeven_response(&config, &args)),
    )
}

async fn breakeven_post_handler(
    State(config): State<SharedConfig>,
    Json(payload): Json<BreakevenPayload>,
) -> Response {
    respond(
        breakeven_args_from_payload(payload).and_then(|args| breakeven_response(&config, &args)),
    )
}

async fn support_handler(
    State(config): State<SharedConfig>,
    Json(payload): Json<SupportPayload>,
) -> Response {
    respond(support_payload_response(&config, payload))
}

async fn scenarios_handler(
    State(config): State<SharedConfig>,
    Json(payload): Json<SupportPayload>,
) -> Response {
    respond(scenarios_payload_response(&config, payload))
}

fn respond<T: Serialize>(result: Result<T, String>) -> Response {
    match result {
        Ok(body) => json_response(StatusCode::OK, body),
        Err(msg) => error_response(StatusCode::BAD_REQUEST, &msg),
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

fn tax_args_from_payload(payload: TaxPayload) -> Result<TaxArgs, String> {
    let income = payload.income.ok_or("income is required")?;
    Ok(TaxArgs { income })
}

fn gross_args_from_payload(payload: GrossPayload) -> Result<GrossArgs, String> {
    let defaults = GrossSolveConfig::for_target(0.0);
    Ok(GrossArgs {
        net_income: payload.net_income.ok_or("netIncome is required")?,
        search_max: payload.search_max.unwrap_or(defaults.search_max),
        tolerance: payload.tolerance.unwrap_or(defaults.tolerance),
    })
}

fn breakeven_args_from_payload(payload: BreakevenPayload) -> Result<BreakevenArgs, String> {
    Ok(BreakevenArgs {
        income: payload.income.ok_or("income is required")?,
        growth_rate: payload.growth_rate,
        passive_rate: payload.passive_rate,
        income_cap: payload.income_cap,
        income_support: payload.income_support.unwrap_or(0.0),
        max_iterations: payload.max_iterations,
    })
}

fn split_support_payload(
    payload: SupportPayload,
) -> Result<(IncomeDistribution, RedistributionArgs, ScenarioGrowthArgs), String> {
    let brackets = payload.distribution.ok_or("distribution is required")?;
    let distribution = IncomeDistribution::new(brackets).map_err(|e| e.to_string())?;
    let redistribution = RedistributionArgs {
        income_cap: payload.income_cap,
        citizen_count: payload.citizen_count,
        economy_subsidy: payload.economy_subsidy,
    };
    let growth = ScenarioGrowthArgs {
        growth_rates: payload.growth_rates.unwrap_or_default(),
        passive_rate: payload.passive_rate,
        max_iterations: payload.max_iterations,
    };
    Ok((distribution, redistribution, growth))
}

fn support_payload_response(
    config: &ModelConfig,
    payload: SupportPayload,
) -> Result<SupportResponse, String> {
    let (distribution, redistribution, _) = split_support_payload(payload)?;
    support_response(config, &distribution, &redistribution)
}

fn scenarios_payload_response(
    config: &ModelConfig,
    payload: SupportPayload,
) -> Result<ScenarioReport, String> {
    let (distribution, redistribution, growth) = split_support_payload(payload)?;
    scenarios_response(config, &distribution, &redistribution, &growth)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn sample_breakeven_args() -> BreakevenArgs {
        BreakevenArgs {
            income: 100_000.0,
            growth_rate: Some(7.0),
            passive_rate: Some(5.0),
            income_cap: Some(500_000.0),
            income_support: 0.0,
            max_iterations: None,
        }
    }

    fn support_payload_from_json(json: &str) -> SupportPayload {
        serde_json::from_str(json).expect("payload should parse")
    }

    #[test]
    fn build_breakeven_converts_percentages() {
        let config = ModelConfig::default();
        let (params, max_iterations) =
            build_breakeven(&config, &sample_breakeven_args()).expect("valid args");
        assert_approx(params.growth_rate, 0.07);
        assert_approx(params.passive_rate, 0.05);
        assert_approx(params.income_cap, 500_000.0);
        assert_eq!(max_iterations, 100);
    }

    #[test]
    fn build_breakeven_falls_back_to_config() {
        let config = ModelConfig::default();
        let args = BreakevenArgs {
            income: 40_000.0,
            ..BreakevenArgs::default()
        };
        let (params, _) = build_breakeven(&config, &args).expect("valid args");
        assert_approx(params.growth_rate, config.growth_rates[0]);
        assert_approx(params.passive_rate, config.passive_rate);
        assert_approx(params.income_cap, config.income_cap);
    }

    #[test]
    fn build_breakeven_rejects_zero_passive_rate() {
        let mut args = sample_breakeven_args();
        args.passive_rate = Some(0.0);
        let err = build_breakeven(&ModelConfig::default(), &args).expect_err("must reject");
        assert!(err.contains("--passive-rate"));
        assert!(err.contains("percent"));
    }

    #[test]
    fn scenario_config_errors_name_percent_unit() {
        let growth = ScenarioGrowthArgs {
            growth_rates: vec![-150.0],
            ..Default::default()
        };
        let err = build_scenario_config(
            &ModelConfig::default(),
            &RedistributionArgs::default(),
            &growth,
        )
        .expect_err("must reject");
        assert!(err.contains("--growth-rate"));
        assert!(err.contains("percent"));
    }

    fn write_temp_config(name: &str, body: &str) -> PathBuf {
        let path = std::env::temp_dir().join(name);
        std::fs::write(&path, body).expect("write config");
        path
    }

    #[test]
    fn env_config_that_fails_validation_is_an_error() {
        let path = write_temp_config("tax_autonomy_env_invalid.toml", "passive_rate = 0.0\n");
        let err = resolve_config_from(None, Some(&path)).expect_err("must not fall back");
        assert!(format!("{err:#}").contains("passive_rate"));
    }

    #[test]
    fn env_config_that_does_not_parse_is_an_error() {
        let path = write_temp_config("tax_autonomy_env_garbled.toml", "passive_rate = [\n");
        assert!(resolve_config_from(None, Some(&path)).is_err());
    }

    #[test]
    fn missing_env_config_falls_back_to_defaults() {
        let path = std::env::temp_dir().join("tax_autonomy_env_absent.toml");
        let _ = std::fs::remove_file(&path);
        let config = resolve_config_from(None, Some(&path)).expect("falls back");
        assert_eq!(config, ModelConfig::default());
        assert_eq!(
            resolve_config_from(None, None).expect("defaults"),
            ModelConfig::default()
        );
    }

    #[test]
    fn explicit_config_must_exist() {
        let path = std::env::temp_dir().join("tax_autonomy_explicit_absent.toml");
        let _ = std::fs::remove_file(&path);
        assert!(resolve_config_from(Some(&path), None).is_err());
    }

    #[test]
    fn build_breakeven_rejects_total_loss_growth() {
        let mut args = sample_breakeven_args();
        args.growth_rate = Some(-100.0);
        let err = build_breakeven(&ModelConfig::default(), &args).expect_err("must reject");
        assert!(err.contains("--growth-rate"));
    }

    #[test]
    fn build_breakeven_rejects_negative_income() {
        let mut args = sample_breakeven_args();
        args.income = -1.0;
        let err = build_breakeven(&ModelConfig::default(), &args).expect_err("must reject");
        assert!(err.contains("--income"));
    }

    #[test]
    fn build_support_params_rejects_zero_citizens() {
        let args = RedistributionArgs {
            citizen_count: Some(0.0),
            ..RedistributionArgs::default()
        };
        let err = build_support_params(&ModelConfig::default(), &args).expect_err("must reject");
        assert!(err.contains("--citizen-count"));
    }

    #[test]
    fn build_scenario_config_uses_configured_rates_when_none_given() {
        let config = ModelConfig::default();
        let scenario = build_scenario_config(
            &config,
            &RedistributionArgs::default(),
            &ScenarioGrowthArgs::default(),
        )
        .expect("valid args");
        assert_eq!(scenario.growth_rates, config.growth_rates);

        let growth = ScenarioGrowthArgs {
            growth_rates: vec![4.0, 8.0],
            ..ScenarioGrowthArgs::default()
        };
        let scenario = build_scenario_config(&config, &RedistributionArgs::default(), &growth)
            .expect("valid args");
        assert_eq!(scenario.growth_rates.len(), 2);
        assert_approx(scenario.growth_rates[1], 0.08);
    }

    #[test]
    fn breakeven_payload_requires_income() {
        let payload: BreakevenPayload =
            serde_json::from_str(r#"{"growthRate": 7}"#).expect("payload should parse");
        let err = breakeven_args_from_payload(payload).expect_err("must require income");
        assert!(err.contains("income"));
    }

    #[test]
    fn breakeven_response_serializes_camel_case() {
        let payload: BreakevenPayload = serde_json::from_str(
            r#"{"income": 100000, "growthRate": 7, "passiveRate": 5, "incomeCap": 500000}"#,
        )
        .expect("payload should parse");
        let args = breakeven_args_from_payload(payload).expect("valid payload");
        let outcome = breakeven_response(&ModelConfig::default(), &args).expect("must run");
        assert_eq!(outcome.years, 19);

        let json = serde_json::to_string(&outcome).expect("outcome should serialize");
        assert!(json.contains("\"requiredCapital\""));
        assert!(json.contains("\"converged\":true"));
    }

    #[test]
    fn tax_response_reports_breakdown() {
        let breakdown =
            tax_response(&ModelConfig::default(), &TaxArgs { income: 20_000.0 }).expect("valid");
        assert_approx(breakdown.income_tax, 1_639.34);
        assert_approx(breakdown.social_security, 3_940.0);
        let json = serde_json::to_string(&breakdown).expect("breakdown should serialize");
        assert!(json.contains("\"monthlyNetIncome\""));
    }

    #[test]
    fn support_payload_round_trips_through_allocator() {
        let payload = support_payload_from_json(
            r#"{
              "distribution": [
                {"annualIncome": 20000, "probabilityMass": 0.5},
                {"annualIncome": 100000, "probabilityMass": 0.5}
              ],
              "incomeCap": 50000
            }"#,
        );
        let response =
            support_payload_response(&ModelConfig::default(), payload).expect("must allocate");
        assert!(response.integrity_warning.is_none());
        assert!(response.allocation.brackets[0].support_amount > 0.0);

        let json = serde_json::to_string(&response).expect("response should serialize");
        assert!(json.contains("\"netSupportBalance\""));
        assert!(json.contains("\"integrityWarning\":null"));
    }

    #[test]
    fn support_payload_reports_integrity_warning() {
        let payload = support_payload_from_json(
            r#"{
              "distribution": [
                {"annualIncome": 20000, "probabilityMass": 0.3},
                {"annualIncome": 100000, "probabilityMass": 0.3}
              ],
              "incomeCap": 50000
            }"#,
        );
        let response =
            support_payload_response(&ModelConfig::default(), payload).expect("must allocate");
        assert!(response.integrity_warning.is_some());
    }

    #[test]
    fn support_payload_requires_distribution() {
        let payload = support_payload_from_json(r#"{"incomeCap": 50000}"#);
        let err = support_payload_response(&ModelConfig::default(), payload)
            .expect_err("must require distribution");
        assert!(err.contains("distribution"));
    }

    #[test]
    fn scenarios_payload_produces_series_per_growth_rate() {
        let payload = support_payload_from_json(
            r#"{
              "distribution": [
                {"annualIncome": 20000, "probabilityMass": 0.5},
                {"annualIncome": 100000, "probabilityMass": 0.5}
              ],
              "incomeCap": 50000,
              "growthRates": [5, 7]
            }"#,
        );
        let response =
            scenarios_payload_response(&ModelConfig::default(), payload).expect("must run");
        assert_eq!(response.series.len(), 4);
        assert!(response.integrity_warning.is_none());

        let json = serde_json::to_string(&response).expect("response should serialize");
        assert!(json.contains("\"series\""));
        assert!(json.contains("\"withSupport\""));
        assert!(json.contains("\"yearsToBreakeven\""));
    }

    #[test]
    fn gross_payload_solves_for_net_income() {
        let config = ModelConfig::default();
        let target = config.calculator().net_income(45_000.0);
        let args = gross_args_from_payload(GrossPayload {
            net_income: Some(target),
            ..GrossPayload::default()
        })
        .expect("valid payload");
        let response = gross_response(&config, &args).expect("must solve");
        assert!(response.feasible);
        let gross = response.solved_gross.expect("gross expected");
        assert!((gross - 45_000.0).abs() < 0.05, "gross {gross}");
    }

    #[test]
    fn insurance_defaults_match_population_estimate() {
        let estimate = insurance_response(&InsuranceArgs::default()).expect("valid");
        assert_approx(estimate.effective_monthly_payment, 74.0 / 58.0 * 350.0);
    }

    #[test]
    fn cli_parses_repeated_growth_rates() {
        let cli = Cli::try_parse_from([
            "tax-autonomy",
            "scenarios",
            "--distribution",
            "dist.toml",
            "--growth-rate",
            "5",
            "--growth-rate",
            "7",
            "--income-cap",
            "60000",
        ])
        .expect("cli should parse");
        match cli.command {
            Command::Scenarios(args) => {
                assert_eq!(args.growth.growth_rates, vec![5.0, 7.0]);
                assert_eq!(args.source.redistribution.income_cap, Some(60_000.0));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
