use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::ml::{FallbackStrategy, ModelKind, ModelOrder};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const CONFIG_DIR: &str = "config";
const DEFAULT_DATABASE_URL: &str = "sqlite://dairy_forecast.db?mode=rwc";
const DEFAULT_MAX_HORIZON_DAYS: u32 = 90;
const DEFAULT_HORIZON_DAYS: u32 = 30;
const DEFAULT_TRAINING_WINDOW_DAYS: u32 = 365;
const DEFAULT_CONFIDENCE_LEVEL: f64 = 0.95;
const DEFAULT_FALLBACK_WINDOW_DAYS: usize = 7;

/// Confidence levels with a tabulated two-sided normal quantile.
pub const SUPPORTED_CONFIDENCE_LEVELS: [(f64, f64); 4] = [
    (0.80, 1.281_551_565_545),
    (0.90, 1.644_853_626_951),
    (0.95, 1.959_963_984_540),
    (0.99, 2.575_829_303_549),
];

/// Forecasting configuration consumed by the engine and service.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ForecastSettings {
    /// Model family: "arima" or "additive"
    #[serde(default)]
    pub model: ModelKind,

    /// ARIMA order as `[p, d, q]`
    #[serde(default)]
    #[validate(custom = "validate_model_order")]
    pub model_order: ModelOrder,

    /// Largest horizon a caller may request
    #[serde(default = "default_max_horizon_days")]
    #[validate(range(min = 1, max = 366))]
    pub max_horizon_days: u32,

    /// Horizon used when the request does not name one
    #[serde(default = "default_horizon_days")]
    #[validate(range(min = 1))]
    pub default_horizon_days: u32,

    /// Days of history (ending at the as-of date) used for training
    #[serde(default = "default_training_window_days")]
    #[validate(range(min = 1))]
    pub training_window_days: u32,

    /// Two-sided confidence level for prediction bounds
    #[serde(default = "default_confidence_level")]
    #[validate(custom = "validate_confidence_level")]
    pub confidence_level: f64,

    /// Naive strategy used when the model fit fails
    #[serde(default)]
    pub fallback: FallbackStrategy,

    /// Window for the moving-average fallback
    #[serde(default = "default_fallback_window_days")]
    #[validate(range(min = 1))]
    pub fallback_window_days: usize,

    /// Per-SKU quantity above which a predicted day raises an alert
    #[serde(default)]
    pub alert_thresholds: HashMap<String, f64>,

    /// Wall-clock bound on a single model fit, enforced by the service
    #[serde(default)]
    pub fit_timeout_secs: Option<u64>,
}

impl Default for ForecastSettings {
    fn default() -> Self {
        Self {
            model: ModelKind::default(),
            model_order: ModelOrder::default(),
            max_horizon_days: default_max_horizon_days(),
            default_horizon_days: default_horizon_days(),
            training_window_days: default_training_window_days(),
            confidence_level: default_confidence_level(),
            fallback: FallbackStrategy::default(),
            fallback_window_days: default_fallback_window_days(),
            alert_thresholds: HashMap::new(),
            fit_timeout_secs: None,
        }
    }
}

impl ForecastSettings {
    /// Minimum series length for the configured model.
    pub fn min_observations(&self) -> usize {
        match self.model {
            ModelKind::Arima => self.model_order.min_observations(),
            ModelKind::Additive => crate::ml::additive::MIN_OBSERVATIONS,
        }
    }

    /// Normal quantile matching `confidence_level`.
    pub fn z_score(&self) -> f64 {
        SUPPORTED_CONFIDENCE_LEVELS
            .iter()
            .find(|(level, _)| (level - self.confidence_level).abs() < 1e-9)
            .map(|(_, z)| *z)
            .unwrap_or(SUPPORTED_CONFIDENCE_LEVELS[2].1)
    }

    /// Threshold for a SKU. Matching ignores case since file and
    /// environment sources lowercase their keys.
    pub fn alert_threshold(&self, product_id: &str) -> Option<f64> {
        self.alert_thresholds.get(product_id).copied().or_else(|| {
            self.alert_thresholds
                .iter()
                .find(|(sku, _)| sku.eq_ignore_ascii_case(product_id))
                .map(|(_, threshold)| *threshold)
        })
    }

    fn validate_additional_constraints(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.default_horizon_days > self.max_horizon_days {
            let mut err = ValidationError::new("default_horizon_days");
            err.message = Some("default_horizon_days must not exceed max_horizon_days".into());
            errors.add("default_horizon_days", err);
        }

        if self
            .alert_thresholds
            .values()
            .any(|threshold| !threshold.is_finite() || *threshold < 0.0)
        {
            let mut err = ValidationError::new("alert_thresholds");
            err.message = Some("alert thresholds must be finite and non-negative".into());
            errors.add("alert_thresholds", err);
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Full validation: field rules plus cross-field constraints.
    pub fn validate_all(&self) -> Result<(), ValidationErrors> {
        self.validate()?;
        self.validate_additional_constraints()
    }
}

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database connection URL
    #[validate(length(min = 1))]
    pub database_url: String,

    /// Application environment
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Whether to run database migrations on startup
    #[serde(default = "default_true_bool")]
    pub auto_migrate: bool,

    /// DB pool: max connections
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    /// DB pool: min connections
    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    /// DB timeouts (seconds)
    #[serde(default = "default_db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,
    #[serde(default = "default_db_idle_timeout_secs")]
    pub db_idle_timeout_secs: u64,
    #[serde(default = "default_db_acquire_timeout_secs")]
    pub db_acquire_timeout_secs: u64,

    /// Forecasting configuration
    #[serde(default)]
    #[validate]
    pub forecast: ForecastSettings,
}

impl AppConfig {
    /// Creates a new configuration with defaults for everything but the essentials
    pub fn new(database_url: String, environment: String) -> Self {
        Self {
            database_url,
            environment,
            log_level: default_log_level(),
            log_json: false,
            auto_migrate: default_true_bool(),
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            db_connect_timeout_secs: default_db_connect_timeout_secs(),
            db_idle_timeout_secs: default_db_idle_timeout_secs(),
            db_acquire_timeout_secs: default_db_acquire_timeout_secs(),
            forecast: ForecastSettings::default(),
        }
    }

    /// Gets database URL reference
    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    /// Gets log level reference
    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    /// Checks if running in production environment
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    /// Checks if running in development environment
    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    /// Field validation plus the forecast cross-field checks.
    pub fn validate_all(&self) -> Result<(), ValidationErrors> {
        self.validate()?;
        self.forecast.validate_additional_constraints()
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Default value functions
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_true_bool() -> bool {
    true
}

fn default_db_max_connections() -> u32 {
    5
}
fn default_db_min_connections() -> u32 {
    1
}
fn default_db_connect_timeout_secs() -> u64 {
    30
}
fn default_db_idle_timeout_secs() -> u64 {
    600
}
fn default_db_acquire_timeout_secs() -> u64 {
    8
}

fn default_max_horizon_days() -> u32 {
    DEFAULT_MAX_HORIZON_DAYS
}

fn default_horizon_days() -> u32 {
    DEFAULT_HORIZON_DAYS
}

fn default_training_window_days() -> u32 {
    DEFAULT_TRAINING_WINDOW_DAYS
}

fn default_confidence_level() -> f64 {
    DEFAULT_CONFIDENCE_LEVEL
}

fn default_fallback_window_days() -> usize {
    DEFAULT_FALLBACK_WINDOW_DAYS
}

/// Validates log level values
fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if valid_levels.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("log_level");
        err.message = Some("Must be one of: trace, debug, info, warn, error".into());
        Err(err)
    }
}

fn validate_confidence_level(level: f64) -> Result<(), ValidationError> {
    if SUPPORTED_CONFIDENCE_LEVELS
        .iter()
        .any(|(supported, _)| (supported - level).abs() < 1e-9)
    {
        Ok(())
    } else {
        let mut err = ValidationError::new("confidence_level");
        err.message = Some("Must be one of: 0.80, 0.90, 0.95, 0.99".into());
        Err(err)
    }
}

fn validate_model_order(order: &ModelOrder) -> Result<(), ValidationError> {
    if order.p > 5 || order.q > 5 || order.d > 2 {
        let mut err = ValidationError::new("model_order");
        err.message = Some("ARIMA order is limited to p <= 5, d <= 2, q <= 5".into());
        return Err(err);
    }
    Ok(())
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter_directive = log_filter(level, env::var("RUST_LOG").ok());

    // Logs go to stderr so command output on stdout stays machine-readable.
    if json {
        let _ = fmt()
            .with_env_filter(EnvFilter::new(filter_directive))
            .with_writer(std::io::stderr)
            .json()
            .try_init();
    } else {
        let _ = fmt()
            .with_env_filter(EnvFilter::new(filter_directive))
            .with_writer(std::io::stderr)
            .try_init();
    }
}

/// `RUST_LOG` when set, otherwise `level` for every target (the library and
/// both binaries) with the database drivers held at `warn`.
fn log_filter(level: &str, rust_log: Option<String>) -> String {
    rust_log
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| format!("{},sea_orm=warn,sqlx=warn", level))
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults
/// 2. Default config (config/default.toml)
/// 3. Environment-specific config (config/{env}.toml)
/// 4. Environment variables (APP__*, nested keys separated by `__`)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    // Support both RUN_ENV and APP_ENV for selecting config profile
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !Path::new(CONFIG_DIR).exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            CONFIG_DIR
        );
    }

    let config = Config::builder()
        .set_default("database_url", DEFAULT_DATABASE_URL)?
        .set_default("environment", run_env.as_str())?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate_all().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let settings = ForecastSettings::default();
        assert_eq!(settings.model, ModelKind::Arima);
        assert_eq!(settings.model_order, ModelOrder::new(1, 1, 1));
        assert_eq!(settings.max_horizon_days, 90);
        assert_eq!(settings.default_horizon_days, 30);
        assert_eq!(settings.training_window_days, 365);
        assert_eq!(settings.min_observations(), 4);
        assert!(settings.validate_all().is_ok());
    }

    #[test]
    fn z_score_follows_confidence_level() {
        let mut settings = ForecastSettings::default();
        assert!((settings.z_score() - 1.96).abs() < 1e-3);
        settings.confidence_level = 0.80;
        assert!((settings.z_score() - 1.2816).abs() < 1e-3);
    }

    #[test]
    fn unsupported_confidence_level_is_rejected() {
        let settings = ForecastSettings {
            confidence_level: 0.42,
            ..Default::default()
        };
        let errors = settings.validate_all().unwrap_err();
        assert!(errors.field_errors().contains_key("confidence_level"));
    }

    #[test]
    fn every_supported_confidence_level_validates() {
        for (level, _) in SUPPORTED_CONFIDENCE_LEVELS {
            let settings = ForecastSettings {
                confidence_level: level,
                ..Default::default()
            };
            assert!(settings.validate().is_ok(), "level {}", level);
        }
    }

    #[test]
    fn default_horizon_cannot_exceed_max() {
        let settings = ForecastSettings {
            max_horizon_days: 14,
            default_horizon_days: 30,
            ..Default::default()
        };
        let errors = settings.validate_all().unwrap_err();
        assert!(errors.field_errors().contains_key("default_horizon_days"));
    }

    #[test]
    fn oversized_order_is_rejected() {
        let settings = ForecastSettings {
            model_order: ModelOrder::new(7, 1, 1),
            ..Default::default()
        };
        assert!(settings.validate_all().is_err());
    }

    #[test]
    fn log_filter_covers_binaries_unless_overridden() {
        assert_eq!(log_filter("debug", None), "debug,sea_orm=warn,sqlx=warn");
        assert_eq!(log_filter("info", Some("  ".into())), "info,sea_orm=warn,sqlx=warn");
        assert_eq!(
            log_filter("info", Some("seed_data=trace".into())),
            "seed_data=trace"
        );
    }

    #[test]
    fn bad_log_level_is_rejected() {
        let mut cfg = AppConfig::new("sqlite::memory:".into(), "test".into());
        cfg.log_level = "loud".into();
        assert!(cfg.validate_all().is_err());
    }
}
