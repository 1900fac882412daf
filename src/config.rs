use dotenv::dotenv;
use std::env;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_POOL_SIZE: u32 = 5;
const DEFAULT_REQUEST_TIMEOUT_IN_SECONDS: u64 = 30;
const DEFAULT_POLL_INTERVAL: &str = "1m";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} environment variable is not set")]
    Missing(&'static str),
    #[error("{name} should be a positive integer, got {value:?}")]
    InvalidNumber { name: &'static str, value: String },
    #[error("invalid duration {0:?}")]
    InvalidDuration(String),
    #[error("poll interval must be greater than zero")]
    ZeroInterval,
}

#[derive(Debug, Clone)]
pub struct Config {
    database_url: String,
    database_pool_size: u32,
    request_timeout: Duration,
    poll_interval: Duration,
    user_agent: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();

        let database_url =
            env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;

        let database_pool_size =
            parse_number("DATABASE_POOL_SIZE", env::var("DATABASE_POOL_SIZE").ok())?
                .unwrap_or(DEFAULT_POOL_SIZE);

        let request_timeout_in_seconds = parse_number(
            "REQUEST_TIMEOUT_IN_SECONDS",
            env::var("REQUEST_TIMEOUT_IN_SECONDS").ok(),
        )?
        .unwrap_or(DEFAULT_REQUEST_TIMEOUT_IN_SECONDS);

        let poll_interval =
            env::var("POLL_INTERVAL").unwrap_or_else(|_| DEFAULT_POLL_INTERVAL.to_string());
        let poll_interval = parse_interval(&poll_interval)?;

        let user_agent = env::var("USER_AGENT").unwrap_or_else(|_| default_user_agent());

        Ok(Self {
            database_url,
            database_pool_size,
            request_timeout: Duration::from_secs(request_timeout_in_seconds),
            poll_interval,
            user_agent,
        })
    }

    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    pub fn database_pool_size(&self) -> u32 {
        self.database_pool_size
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }
}

pub fn default_user_agent() -> String {
    format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

/// Parses a poll interval and rejects zero.
pub fn parse_interval(value: &str) -> Result<Duration, ConfigError> {
    let interval = parse_duration(value)?;

    if interval.is_zero() {
        return Err(ConfigError::ZeroInterval);
    }

    Ok(interval)
}

/// Parses durations written as a sequence of `<number><unit>` pairs,
/// e.g. `30s`, `1m30s`, `1h`, `250ms`. Supported units: `ms`, `s`, `m`, `h`.
pub fn parse_duration(value: &str) -> Result<Duration, ConfigError> {
    let invalid = || ConfigError::InvalidDuration(value.to_string());
    let mut rest = value.trim();

    if rest.is_empty() {
        return Err(invalid());
    }

    let mut total = Duration::ZERO;

    while !rest.is_empty() {
        let digits_end = rest
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(invalid)?;

        if digits_end == 0 {
            return Err(invalid());
        }

        let amount: u64 = rest[..digits_end].parse().map_err(|_| invalid())?;
        rest = &rest[digits_end..];

        let unit_end = rest
            .find(|c: char| c.is_ascii_digit())
            .unwrap_or(rest.len());

        let part = match &rest[..unit_end] {
            "ms" => Duration::from_millis(amount),
            "s" => Duration::from_secs(amount),
            "m" => Duration::from_secs(amount.saturating_mul(60)),
            "h" => Duration::from_secs(amount.saturating_mul(60 * 60)),
            _ => return Err(invalid()),
        };

        total += part;
        rest = &rest[unit_end..];
    }

    Ok(total)
}

fn parse_number<T: std::str::FromStr>(
    name: &'static str,
    value: Option<String>,
) -> Result<Option<T>, ConfigError> {
    match value {
        None => Ok(None),
        Some(value) => match value.trim().parse::<T>() {
            Ok(number) => Ok(Some(number)),
            Err(_) => Err(ConfigError::InvalidNumber { name, value }),
        },
    }
}
