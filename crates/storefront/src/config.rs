//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `BBQ_API_BASE_URL` - Base URL of the storefront REST backend
//!
//! ## Optional
//! - `BBQ_STATE_DIR` - Directory holding the local store file (default: .bbqstyle)
//! - `BBQ_HTTP_TIMEOUT_SECS` - Request timeout in seconds (default: 30)
//! - `BBQ_OTP_RESEND_SECS` - Resend-OTP cooldown in seconds (default: 60)
//! - `BBQ_PRODUCT_CACHE_TTL_SECS` - Product lookup cache TTL (default: 300)
//! - `BBQ_PAYMENT_ENV` - `production` or `sandbox` (default: production for https backends)
//! - `BBQ_PINCODE_API_URL` - Pincode lookup service (default: <https://api.postalpincode.in>)
//! - `BBQ_LOG_FORMAT` - `pretty` or `json` (default: pretty)

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use url::Url;

/// File name of the local store inside the state directory.
pub const STORE_FILE_NAME: &str = "storage.json";

const DEFAULT_PINCODE_API_URL: &str = "https://api.postalpincode.in";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront client configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Backend base URL (e.g., `https://bbqstyle.in`)
    pub api_base_url: Url,
    /// Directory holding the local store
    pub state_dir: PathBuf,
    /// Per-request timeout
    pub http_timeout: Duration,
    /// Cooldown before an OTP can be resent
    pub otp_resend_cooldown: Duration,
    /// How long product lookups stay cached
    pub product_cache_ttl: Duration,
    /// Environment handed to the hosted payment page
    pub payment_env: PaymentEnvironment,
    /// Pincode lookup service base URL
    pub pincode_api_url: Url,
    /// Log output format
    pub log_format: LogFormat,
}

/// Hosted payment page environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentEnvironment {
    Production,
    Sandbox,
}

impl PaymentEnvironment {
    /// Mode string understood by the payment SDK.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Production => "production",
            Self::Sandbox => "sandbox",
        }
    }

    /// Production for TLS backends, sandbox otherwise.
    #[must_use]
    pub fn for_base_url(url: &Url) -> Self {
        if url.scheme() == "https" {
            Self::Production
        } else {
            Self::Sandbox
        }
    }
}

impl FromStr for PaymentEnvironment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Ok(Self::Production),
            "sandbox" => Ok(Self::Sandbox),
            other => Err(format!("expected production or sandbox, got {other}")),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!("expected pretty or json, got {other}")),
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_base_url = parse_url("BBQ_API_BASE_URL", &get_required_env(&lookup, "BBQ_API_BASE_URL")?)?;
        let state_dir = PathBuf::from(get_env_or_default(&lookup, "BBQ_STATE_DIR", ".bbqstyle"));
        let http_timeout = Duration::from_secs(parse_env_or_default(&lookup, "BBQ_HTTP_TIMEOUT_SECS", 30)?);
        let otp_resend_cooldown =
            Duration::from_secs(parse_env_or_default(&lookup, "BBQ_OTP_RESEND_SECS", 60)?);
        let product_cache_ttl =
            Duration::from_secs(parse_env_or_default(&lookup, "BBQ_PRODUCT_CACHE_TTL_SECS", 300)?);

        let payment_env = match get_optional_env(&lookup, "BBQ_PAYMENT_ENV") {
            Some(value) => value
                .parse()
                .map_err(|e| ConfigError::InvalidEnvVar("BBQ_PAYMENT_ENV".to_string(), e))?,
            None => PaymentEnvironment::for_base_url(&api_base_url),
        };

        let pincode_api_url = parse_url(
            "BBQ_PINCODE_API_URL",
            &get_env_or_default(&lookup, "BBQ_PINCODE_API_URL", DEFAULT_PINCODE_API_URL),
        )?;

        let log_format = match get_optional_env(&lookup, "BBQ_LOG_FORMAT") {
            Some(value) => value
                .parse()
                .map_err(|e| ConfigError::InvalidEnvVar("BBQ_LOG_FORMAT".to_string(), e))?,
            None => LogFormat::default(),
        };

        Ok(Self {
            api_base_url,
            state_dir,
            http_timeout,
            otp_resend_cooldown,
            product_cache_ttl,
            payment_env,
            pincode_api_url,
            log_format,
        })
    }

    /// Configuration for a backend at `api_base_url` with every optional
    /// value at its default.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if the URL is not http(s).
    pub fn with_base_url(api_base_url: &Url) -> Result<Self, ConfigError> {
        let base = api_base_url.to_string();
        Self::from_lookup(|key| (key == "BBQ_API_BASE_URL").then(|| base.clone()))
    }

    /// Path of the local store file.
    #[must_use]
    pub fn store_path(&self) -> PathBuf {
        self.state_dir.join(STORE_FILE_NAME)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env<F>(lookup: &F, key: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    get_optional_env(lookup, key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable, treating blank values as unset.
fn get_optional_env<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default<F>(lookup: &F, key: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    get_optional_env(lookup, key).unwrap_or_else(|| default.to_string())
}

/// Parse a numeric environment variable with a default value.
fn parse_env_or_default<F>(lookup: &F, key: &str, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    get_optional_env(lookup, key).map_or(Ok(default), |value| {
        value
            .trim()
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

fn parse_url(key: &str, value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value.trim())
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("unsupported scheme {}", url.scheme()),
        ));
    }
    Ok(url)
}
