use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};
use validator::Validate;

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEFAULT_AI_TIMEOUT_SECS: u64 = 30;
const DEFAULT_AI_MAX_RETRIES: u32 = 2;
const DEFAULT_AI_RETRY_BASE_MS: u64 = 1_000;
const DEFAULT_AI_RETRY_CAP_MS: u64 = 5_000;
const DEFAULT_MARKETPLACE_TIMEOUT_SECS: u64 = 5;
const DEFAULT_MAX_CONCURRENCY: usize = 8;
const DEFAULT_RUN_DEADLINE_SECS: u64 = 120;
const DEFAULT_PURCHASE_COST_FRACTION: &str = "0.33";

/// AI backend configuration (OpenAI-compatible chat completions).
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AiConfig {
    /// Base URL of the chat-completions endpoint
    #[serde(default = "default_ai_base_url")]
    pub base_url: String,

    /// API key; when absent the AI path is disabled and every item takes
    /// the deterministic fallback
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model identifier sent with each request
    #[serde(default = "default_ai_model")]
    pub model: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_ai_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum retries after the initial attempt
    #[serde(default = "default_ai_max_retries")]
    pub max_retries: u32,

    /// Base backoff delay in milliseconds (doubles per retry)
    #[serde(default = "default_ai_retry_base_ms")]
    pub retry_base_ms: u64,

    /// Backoff cap in milliseconds
    #[serde(default = "default_ai_retry_cap_ms")]
    pub retry_cap_ms: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            base_url: default_ai_base_url(),
            api_key: None,
            model: default_ai_model(),
            timeout_secs: DEFAULT_AI_TIMEOUT_SECS,
            max_retries: DEFAULT_AI_MAX_RETRIES,
            retry_base_ms: DEFAULT_AI_RETRY_BASE_MS,
            retry_cap_ms: DEFAULT_AI_RETRY_CAP_MS,
        }
    }
}

impl AiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_base(&self) -> Duration {
        Duration::from_millis(self.retry_base_ms)
    }

    pub fn retry_cap(&self) -> Duration {
        Duration::from_millis(self.retry_cap_ms)
    }
}

/// Marketplace lookup configuration. Each marketplace shares the same
/// per-call timeout; it is deliberately shorter than the AI budget since
/// lookups run in parallel with analysis.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct MarketplaceConfig {
    /// eBay Browse API base URL
    #[serde(default = "default_ebay_base_url")]
    pub ebay_base_url: String,

    /// eBay OAuth access token; lookup disabled when absent
    #[serde(default)]
    pub ebay_access_token: Option<String>,

    /// Amazon product lookup base URL
    #[serde(default = "default_amazon_base_url")]
    pub amazon_base_url: String,

    /// Amazon API key; lookup disabled when absent
    #[serde(default)]
    pub amazon_api_key: Option<String>,

    /// Per-lookup timeout in seconds
    #[serde(default = "default_marketplace_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for MarketplaceConfig {
    fn default() -> Self {
        Self {
            ebay_base_url: default_ebay_base_url(),
            ebay_access_token: None,
            amazon_base_url: default_amazon_base_url(),
            amazon_api_key: None,
            timeout_secs: DEFAULT_MARKETPLACE_TIMEOUT_SECS,
        }
    }
}

impl MarketplaceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Pipeline resource budget.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Maximum per-item workers in flight at once
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Overall deadline for one manifest run, in seconds. When exceeded the
    /// run completes with whatever items finished, flagged partial.
    #[serde(default = "default_run_deadline_secs")]
    pub run_deadline_secs: u64,

    /// Purchase cost as a fraction of projected revenue. This is the only
    /// purchase-cost formula; deriving it from MSRP is a regression.
    #[serde(default = "default_purchase_cost_fraction")]
    pub purchase_cost_fraction: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            run_deadline_secs: DEFAULT_RUN_DEADLINE_SECS,
            purchase_cost_fraction: DEFAULT_PURCHASE_COST_FRACTION.to_string(),
        }
    }
}

impl PipelineConfig {
    pub fn run_deadline(&self) -> Duration {
        Duration::from_secs(self.run_deadline_secs)
    }

    pub fn purchase_cost_fraction(&self) -> rust_decimal::Decimal {
        self.purchase_cost_fraction
            .parse()
            .unwrap_or_else(|_| DEFAULT_PURCHASE_COST_FRACTION.parse().unwrap())
    }
}

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database connection URL
    pub database_url: String,

    /// Server host address
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Whether to run database migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    /// AI backend configuration
    #[serde(default)]
    pub ai: AiConfig,

    /// Marketplace lookup configuration
    #[serde(default)]
    pub marketplace: MarketplaceConfig,

    /// Pipeline resource budget
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

impl AppConfig {
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://arbitrage.db?mode=rwc".to_string(),
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            environment: DEFAULT_ENV.to_string(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            log_json: false,
            auto_migrate: false,
            ai: AiConfig::default(),
            marketplace: MarketplaceConfig::default(),
            pipeline: PipelineConfig::default(),
        }
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

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_ai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_ai_model() -> String {
    "gpt-4".to_string()
}

fn default_ai_timeout_secs() -> u64 {
    DEFAULT_AI_TIMEOUT_SECS
}

fn default_ai_max_retries() -> u32 {
    DEFAULT_AI_MAX_RETRIES
}

fn default_ai_retry_base_ms() -> u64 {
    DEFAULT_AI_RETRY_BASE_MS
}

fn default_ai_retry_cap_ms() -> u64 {
    DEFAULT_AI_RETRY_CAP_MS
}

fn default_ebay_base_url() -> String {
    "https://api.ebay.com/buy/browse/v1".to_string()
}

fn default_amazon_base_url() -> String {
    "https://webservices.amazon.com/paapi5".to_string()
}

fn default_marketplace_timeout_secs() -> u64 {
    DEFAULT_MARKETPLACE_TIMEOUT_SECS
}

fn default_max_concurrency() -> usize {
    DEFAULT_MAX_CONCURRENCY
}

fn default_run_deadline_secs() -> u64 {
    DEFAULT_RUN_DEADLINE_SECS
}

fn default_purchase_cost_fraction() -> String {
    DEFAULT_PURCHASE_COST_FRACTION.to_string()
}

/// Initializes the tracing subscriber from the configured level.
/// `RUST_LOG` overrides the config-derived directive when set.
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::fmt;

    let default_directive = format!("arbitrage_api={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt().with_env_filter(filter_directive).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter_directive).try_init();
    }
}

/// Loads configuration from config files and environment variables.
///
/// Precedence (lowest to highest): built-in defaults, `config/default`,
/// `config/{RUN_ENV}`, `APP__*` environment variables.
pub fn load_config() -> Result<AppConfig, AppConfigError> {
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
        .set_default("database_url", "sqlite://arbitrage.db?mode=rwc")?
        .set_default("host", "0.0.0.0")?
        .set_default("port", DEFAULT_PORT as i64)?
        .set_default("environment", DEFAULT_ENV)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}
