use std::{env, str::FromStr, time::Duration};

use thiserror::Error;

use crate::{
    models::feed_source::FeedCategory,
    tasks::types::{
        DEFAULT_FETCH_INTERVAL, DEFAULT_FETCH_TIMEOUT, DEFAULT_PRIORITY_INTERVAL,
        DEFAULT_STALE_AFTER,
    },
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {var}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
    #[error("could not determine current directory: {0}")]
    CurrentDir(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: String,
    pub bind_address: String,
    pub port: u16,
    pub admin_token: Option<String>,
    pub cors_origin: Option<String>,
    pub jobs: JobsConfig,
}

/// Timers and fetch behaviour of the news ingestion job.
#[derive(Debug, Clone, PartialEq)]
pub struct JobsConfig {
    pub fetch_interval: Duration,
    pub stale_after: Duration,
    /// None disables the secondary timer
    pub priority_interval: Option<Duration>,
    pub priority_categories: Vec<FeedCategory>,
    pub fetch_timeout: Duration,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            fetch_interval: DEFAULT_FETCH_INTERVAL,
            stale_after: DEFAULT_STALE_AFTER,
            priority_interval: Some(DEFAULT_PRIORITY_INTERVAL),
            priority_categories: vec![FeedCategory::Sports, FeedCategory::Regional],
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let db_path = match env::var("AG_DATABASE_URL") {
            Ok(path) => {
                log::info!("Using database path from AG_DATABASE_URL: {}", path);
                path
            }
            Err(_) => {
                let mut path = env::current_dir()?;
                path.push("amafor-news.db");
                let res = path.to_string_lossy().to_string();
                log::info!("Using default database path: {}", res);
                res
            }
        };
        let bind_address = env::var("AG_BIND_ADDRESS").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = parse_var("AG_PORT", 8080u16)?;
        let admin_token = env::var("AG_ADMIN_TOKEN").ok().filter(|t| !t.trim().is_empty());
        if admin_token.is_none() {
            log::warn!("AG_ADMIN_TOKEN is not set, admin endpoints will reject every request");
        }
        let cors_origin = env::var("AG_CORS_ORIGIN").ok().filter(|o| !o.is_empty());

        Ok(AppConfig {
            db_path,
            bind_address,
            port,
            admin_token,
            cors_origin,
            jobs: JobsConfig::from_env()?,
        })
    }
}

impl JobsConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = JobsConfig::default();
        let fetch_interval = minutes(parse_var("AG_FETCH_INTERVAL_MINS", mins(defaults.fetch_interval))?);
        let stale_after = minutes(parse_var("AG_STALE_AFTER_MINS", mins(defaults.stale_after))?);
        let priority_mins = parse_var("AG_PRIORITY_INTERVAL_MINS", mins(DEFAULT_PRIORITY_INTERVAL))?;
        let fetch_timeout = Duration::from_secs(parse_var(
            "AG_FETCH_TIMEOUT_SECS",
            defaults.fetch_timeout.as_secs(),
        )?);

        if fetch_interval.is_zero() {
            return Err(invalid("AG_FETCH_INTERVAL_MINS", "0", "interval must be positive"));
        }
        if fetch_timeout.is_zero() {
            return Err(invalid("AG_FETCH_TIMEOUT_SECS", "0", "timeout must be positive"));
        }

        let priority_categories = match env::var("AG_PRIORITY_CATEGORIES") {
            Ok(raw) => parse_categories(&raw)?,
            Err(_) => defaults.priority_categories,
        };

        let config = JobsConfig {
            fetch_interval,
            stale_after,
            priority_interval: (priority_mins > 0).then(|| minutes(priority_mins)),
            priority_categories,
            fetch_timeout,
        };
        log::info!("Using jobs config: {:?}", config);
        Ok(config)
    }
}

fn parse_var<T>(var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| invalid(var, &raw, &e.to_string())),
        Err(_) => Ok(default),
    }
}

/// Comma separated list; an empty string means no priority categories.
pub fn parse_categories(raw: &str) -> Result<Vec<FeedCategory>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<FeedCategory>()
                .map_err(|e| invalid("AG_PRIORITY_CATEGORIES", raw, &e.to_string()))
        })
        .collect()
}

fn invalid(var: &'static str, value: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        var,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn minutes(m: u64) -> Duration {
    Duration::from_secs(m * 60)
}

fn mins(d: Duration) -> u64 {
    d.as_secs() / 60
}
