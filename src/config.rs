use anyhow::{bail, Context};
use config::{builder::DefaultState, Config, ConfigBuilder, ConfigError, Environment, File};
use dotenv::dotenv;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Loads configuration from built-in defaults, an optional config file and
/// `WITHDRAWALS__*` environment variables, in that order of precedence.
pub fn load_config(config_file_path: Option<&Path>) -> anyhow::Result<AppConfig> {
    // Load .env file if it exists, ignore if not present
    dotenv().ok();

    let app_config = file_settings(config_file_path)?
        .add_source(Environment::with_prefix("WITHDRAWALS").separator("__"))
        .build()?
        .try_deserialize::<AppConfig>()?;

    Ok(app_config)
}

/// Defaults plus the optional file, without any environment sources.
fn file_settings(config_file_path: Option<&Path>) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let mut settings = Config::builder()
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 4000)?
        .set_default("database.max_connections", 10)?
        .set_default("paypal.mode", "sandbox")?
        .set_default("paypal.timeout_ms", 15_000)?
        .set_default("paypal.email_subject", "You have a payout!")?
        .set_default("paypal.email_message", "You received a payout from match3online.")?
        .set_default("withdrawals.min_payout", "1.00")?
        .set_default("withdrawals.list_limit", 200)?
        .set_default("withdrawals.default_currency", "USD")?
        .set_default("withdrawals.payout_timeout_ms", 30_000)?
        .set_default("withdrawals.default_reject_reason", "rejected by admin")?
        .set_default("logging.level", "info")?
        .set_default("logging.format", "pretty")?;

    if let Some(path) = config_file_path {
        settings = settings.add_source(File::from(path).required(true));
    }

    Ok(settings)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub paypal: PayPalConfig,
    pub withdrawals: WithdrawalsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub max_connections: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayPalMode {
    Sandbox,
    Live,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayPalConfig {
    pub mode: PayPalMode,
    /// Overrides the mode's API host, e.g. for a local stub.
    #[serde(default)]
    pub base_url: Option<String>,
    pub timeout_ms: u64,
    pub email_subject: String,
    pub email_message: String,
}

impl PayPalConfig {
    pub fn api_base(&self) -> String {
        match (&self.base_url, self.mode) {
            (Some(url), _) if !url.trim().is_empty() => url.trim_end_matches('/').to_string(),
            (_, PayPalMode::Live) => "https://api-m.paypal.com".to_string(),
            (_, PayPalMode::Sandbox) => "https://api-m.sandbox.paypal.com".to_string(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Client credentials, or `None` when either half is missing.
    pub fn get_credentials(&self) -> Option<(String, String)> {
        let id = std::env::var("PAYPAL_CLIENT_ID").ok().filter(|v| !v.is_empty())?;
        let secret = std::env::var("PAYPAL_SECRET").ok().filter(|v| !v.is_empty())?;
        Some((id, secret))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithdrawalsConfig {
    pub min_payout: Decimal,
    pub list_limit: u32,
    pub default_currency: String,
    pub payout_timeout_ms: u64,
    pub default_reject_reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,  // "debug" | "info" | "warn" | "error"
    pub format: String, // "pretty" | "json"
}

/// Secrets that must be present before the server starts.
#[derive(Clone)]
pub struct Secrets {
    pub database_url: String,
    pub jwt_secret: String,
    pub admin_api_key: String,
}

impl Secrets {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: required_env("DATABASE_URL")?,
            jwt_secret: required_env("JWT_SECRET")?,
            admin_api_key: required_env("ADMIN_API_KEY")?,
        })
    }
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets").finish_non_exhaustive()
    }
}

fn required_env(key: &str) -> anyhow::Result<String> {
    let value = std::env::var(key).with_context(|| format!("{} is not set in environment or .env file", key))?;
    if value.trim().is_empty() {
        bail!("{} is set but empty", key);
    }
    Ok(value)
}
