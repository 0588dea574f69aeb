//! Bot configuration structs
//!
//! Loads configuration from environment variables (and a `.env` file if present).

use chord_core::Intents;
use serde::Deserialize;
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Main bot configuration
#[derive(Clone)]
pub struct BotConfig {
    pub env: Environment,
    /// Bot token, sent in Identify/Resume and the REST `Authorization` header
    pub token: String,
    pub shard_id: u32,
    pub shard_count: u32,
    pub intents: Intents,
    /// Member count above which the gateway stops sending offline members
    pub large_threshold: u32,
    /// Maximum number of user handlers running at the same time
    pub handler_concurrency: usize,
    pub gateway: GatewaySettings,
    pub rest: RestSettings,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "production" => Some(Self::Production),
            "staging" => Some(Self::Staging),
            "development" => Some(Self::Development),
            _ => None,
        }
    }
}

/// Gateway connection settings
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    /// Fixed gateway URL; fetched from `GET /gateway` when absent
    pub url: Option<String>,
    pub version: u8,
    pub max_resume_attempts: u32,
    pub resume_delay_ms: u64,
    /// Bound on opening a transport and on each frame of the resume handshake
    pub handshake_timeout_ms: u64,
}

impl GatewaySettings {
    #[must_use]
    pub fn resume_delay(&self) -> Duration {
        Duration::from_millis(self.resume_delay_ms)
    }

    #[must_use]
    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }

    /// Append the version and encoding query to a gateway base URL
    #[must_use]
    pub fn connect_url(&self, base: &str) -> String {
        let base = base.trim_end_matches('/');
        format!("{base}/?v={}&encoding=json", self.version)
    }
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            url: None,
            version: default_gateway_version(),
            max_resume_attempts: default_max_resume_attempts(),
            resume_delay_ms: default_resume_delay_ms(),
            handshake_timeout_ms: default_handshake_timeout_ms(),
        }
    }
}

/// REST client settings
#[derive(Debug, Clone)]
pub struct RestSettings {
    pub api_url: String,
    /// Pause after every REST call
    pub api_sleep_ms: u64,
    /// How many times a 429 is retried before `RateLimited` is surfaced (0 = never retry)
    pub rate_limit_retries: u32,
}

impl RestSettings {
    #[must_use]
    pub fn api_sleep(&self) -> Duration {
        Duration::from_millis(self.api_sleep_ms)
    }
}

impl Default for RestSettings {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            api_sleep_ms: default_api_sleep_ms(),
            rate_limit_retries: default_rate_limit_retries(),
        }
    }
}

// Default value functions
fn default_api_url() -> String {
    "https://discord.com/api/v10".to_string()
}

fn default_gateway_version() -> u8 {
    10
}

fn default_large_threshold() -> u32 {
    250
}

fn default_api_sleep_ms() -> u64 {
    50
}

fn default_rate_limit_retries() -> u32 {
    3
}

fn default_max_resume_attempts() -> u32 {
    5
}

fn default_resume_delay_ms() -> u64 {
    1000
}

fn default_handshake_timeout_ms() -> u64 {
    10_000
}

fn default_handler_concurrency() -> usize {
    64
}

impl BotConfig {
    /// Create a single-shard configuration with defaults for everything but the token
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            env: Environment::default(),
            token: token.into(),
            shard_id: 0,
            shard_count: 1,
            intents: Intents::default(),
            large_threshold: default_large_threshold(),
            handler_concurrency: default_handler_concurrency(),
            gateway: GatewaySettings::default(),
            rest: RestSettings::default(),
        }
    }

    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if `CHORD_TOKEN` is missing or a numeric variable does not parse
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = lookup("CHORD_TOKEN")
            .filter(|t| !t.trim().is_empty())
            .ok_or(ConfigError::MissingVar("CHORD_TOKEN"))?;

        let config = Self {
            env: lookup("CHORD_ENV")
                .and_then(|s| Environment::parse(&s))
                .unwrap_or_default(),
            token,
            shard_id: parse_var(&lookup, "CHORD_SHARD_ID", 0)?,
            shard_count: parse_var(&lookup, "CHORD_SHARD_COUNT", 1)?,
            intents: Intents::from_bits_truncate(parse_var(
                &lookup,
                "CHORD_INTENTS",
                Intents::default().bits(),
            )?),
            large_threshold: parse_var(&lookup, "CHORD_LARGE_THRESHOLD", default_large_threshold())?,
            handler_concurrency: parse_var(
                &lookup,
                "CHORD_HANDLER_CONCURRENCY",
                default_handler_concurrency(),
            )?,
            gateway: GatewaySettings {
                url: lookup("CHORD_GATEWAY_URL"),
                version: parse_var(&lookup, "CHORD_GATEWAY_VERSION", default_gateway_version())?,
                max_resume_attempts: parse_var(
                    &lookup,
                    "CHORD_MAX_RESUME_ATTEMPTS",
                    default_max_resume_attempts(),
                )?,
                resume_delay_ms: parse_var(&lookup, "CHORD_RESUME_DELAY_MS", default_resume_delay_ms())?,
                handshake_timeout_ms: parse_var(
                    &lookup,
                    "CHORD_HANDSHAKE_TIMEOUT_MS",
                    default_handshake_timeout_ms(),
                )?,
            },
            rest: RestSettings {
                api_url: lookup("CHORD_API_URL").unwrap_or_else(default_api_url),
                api_sleep_ms: parse_var(&lookup, "CHORD_API_SLEEP_MS", default_api_sleep_ms())?,
                rate_limit_retries: parse_var(
                    &lookup,
                    "CHORD_RATE_LIMIT_RETRIES",
                    default_rate_limit_retries(),
                )?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.shard_count == 0 {
            return Err(ConfigError::InvalidValue("CHORD_SHARD_COUNT", "0".to_string()));
        }
        if self.shard_id >= self.shard_count {
            return Err(ConfigError::InvalidValue(
                "CHORD_SHARD_ID",
                format!("{} is not below shard count {}", self.shard_id, self.shard_count),
            ));
        }
        if self.handler_concurrency == 0 {
            return Err(ConfigError::InvalidValue("CHORD_HANDLER_CONCURRENCY", "0".to_string()));
        }
        Ok(())
    }

    /// Shard pair as sent in Identify
    #[must_use]
    pub fn shard(&self) -> [u32; 2] {
        [self.shard_id, self.shard_count]
    }
}

impl fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotConfig")
            .field("env", &self.env)
            .field("token", &"<redacted>")
            .field("shard", &self.shard())
            .field("intents", &self.intents)
            .field("large_threshold", &self.large_threshold)
            .field("handler_concurrency", &self.handler_concurrency)
            .field("gateway", &self.gateway)
            .field("rest", &self.rest)
            .finish()
    }
}

fn parse_var<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key, raw)),
        None => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
