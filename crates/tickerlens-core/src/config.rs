//! Runtime configuration read from the environment.
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `TICKERLENS_ALPHAVANTAGE_API_KEY` (or `ALPHAVANTAGE_API_KEY`) | unset | Enables the Alpha Vantage source |
//! | `TICKERLENS_TIMEOUT_MS` | `10000` | Per-call provider timeout |
//! | `TICKERLENS_MAX_RETRIES` | `2` | Retries after a retryable provider failure |
//! | `TICKERLENS_SOURCE` | `auto` | `auto`, `yahoo` or `alphavantage` |
//! | `TICKERLENS_OFFLINE` | `false` | Serve deterministic offline data |

use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::retry::RetryConfig;
use crate::routing::{CallPolicy, SourceStrategy};

pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_MAX_RETRIES: u32 = 2;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub alphavantage_api_key: Option<String>,
    pub timeout: Duration,
    pub max_retries: u32,
    pub source: SourceStrategy,
    pub offline: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            alphavantage_api_key: None,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            max_retries: DEFAULT_MAX_RETRIES,
            source: SourceStrategy::Auto,
            offline: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a config from an arbitrary variable lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let mut config = Self {
            alphavantage_api_key: get("TICKERLENS_ALPHAVANTAGE_API_KEY")
                .or_else(|| get("ALPHAVANTAGE_API_KEY"))
                .map(|key| key.trim().to_owned()),
            ..Self::default()
        };

        if let Some(value) = get("TICKERLENS_TIMEOUT_MS") {
            let timeout_ms = parse_number::<u64>("TICKERLENS_TIMEOUT_MS", &value)?;
            config = config.with_timeout_ms(timeout_ms)?;
        }

        if let Some(value) = get("TICKERLENS_MAX_RETRIES") {
            config.max_retries = parse_number::<u32>("TICKERLENS_MAX_RETRIES", &value)?;
        }

        if let Some(value) = get("TICKERLENS_SOURCE") {
            config.source =
                SourceStrategy::from_str(&value).map_err(|error| ConfigError::InvalidValue {
                    name: "TICKERLENS_SOURCE",
                    value: value.clone(),
                    reason: error.to_string(),
                })?;
        }

        if let Some(value) = get("TICKERLENS_OFFLINE") {
            config.offline = parse_flag("TICKERLENS_OFFLINE", &value)?;
        }

        Ok(config)
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Result<Self, ConfigError> {
        if timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        self.timeout = Duration::from_millis(timeout_ms);
        Ok(self)
    }

    pub fn with_source(mut self, source: SourceStrategy) -> Self {
        self.source = source;
        self
    }

    pub fn with_offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::exponential(self.max_retries)
    }

    pub fn call_policy(&self) -> CallPolicy {
        CallPolicy {
            timeout: self.timeout,
            retry: self.retry_config(),
        }
    }
}

fn parse_number<T: FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|error| ConfigError::InvalidValue {
            name,
            value: value.to_owned(),
            reason: error.to_string(),
        })
}

fn parse_flag(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            name,
            value: value.to_owned(),
            reason: String::from("expected true or false"),
        }),
    }
}
