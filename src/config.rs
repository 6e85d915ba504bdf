use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::AppError;
use crate::task::subscription_watcher::WatcherOptions;

#[derive(Clone, Debug)]
pub struct Config {
    pub discord_token: String,
    pub api_url: String,
    pub poll_interval: Duration,
    pub search_concurrency: usize,
    pub search_timeout: Duration,
    pub search_rate_per_minute: u32,
    pub failure_threshold: u32,
    pub operator_channel_id: Option<u64>,
    pub db_path: String,
    pub db_url: String,
    pub logs_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            discord_token: String::new(),
            api_url: "https://faexport.spangle.org.uk".to_string(),
            poll_interval: Duration::from_secs(30),
            search_concurrency: 4,
            search_timeout: Duration::from_secs(20),
            search_rate_per_minute: 60,
            failure_threshold: 5,
            operator_channel_id: None,
            db_path: "data/data.db".to_string(),
            db_url: "sqlite://data/data.db".to_string(),
            logs_path: PathBuf::from("logs"),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the defaults with environment variables.
    pub fn load(&mut self) -> Result<(), AppError> {
        self.discord_token = std::env::var("DISCORD_TOKEN")
            .ok()
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| AppError::MissingConfig {
                key: "DISCORD_TOKEN".to_string(),
            })?;

        if let Ok(url) = std::env::var("API_URL") {
            self.api_url = url;
        }
        self.poll_interval = Duration::from_secs(parse_var(
            "POLL_INTERVAL",
            self.poll_interval.as_secs(),
        )?);
        self.search_concurrency = parse_var("SEARCH_CONCURRENCY", self.search_concurrency)?;
        self.search_timeout = Duration::from_secs(parse_var(
            "SEARCH_TIMEOUT",
            self.search_timeout.as_secs(),
        )?);
        self.search_rate_per_minute =
            parse_var("SEARCH_RATE_PER_MINUTE", self.search_rate_per_minute)?;
        self.failure_threshold = parse_var("FAILURE_THRESHOLD", self.failure_threshold)?;
        self.operator_channel_id = match std::env::var("OPERATOR_CHANNEL_ID") {
            Ok(value) if !value.trim().is_empty() => Some(parse_value("OPERATOR_CHANNEL_ID", &value)?),
            _ => None,
        };

        if let Ok(path) = std::env::var("DB_PATH") {
            self.db_path = path;
        }
        self.db_url =
            std::env::var("DB_URL").unwrap_or_else(|_| format!("sqlite://{}", self.db_path));
        if let Ok(path) = std::env::var("LOGS_PATH") {
            self.logs_path = PathBuf::from(path);
        }

        for (key, value) in [
            ("POLL_INTERVAL", self.poll_interval.as_secs()),
            ("SEARCH_CONCURRENCY", self.search_concurrency as u64),
            ("SEARCH_TIMEOUT", self.search_timeout.as_secs()),
            ("SEARCH_RATE_PER_MINUTE", self.search_rate_per_minute as u64),
            ("FAILURE_THRESHOLD", self.failure_threshold as u64),
        ] {
            if value == 0 {
                return Err(AppError::InvalidConfig {
                    key: key.to_string(),
                    value: "0".to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn watcher_options(&self) -> WatcherOptions {
        WatcherOptions {
            poll_interval: self.poll_interval,
            search_concurrency: self.search_concurrency,
            search_timeout: self.search_timeout,
            failure_threshold: self.failure_threshold,
            operator_destination: self.operator_channel_id,
        }
    }
}

fn parse_var<T: FromStr>(key: &str, default: T) -> Result<T, AppError> {
    match std::env::var(key) {
        Ok(value) => parse_value(key, &value),
        Err(_) => Ok(default),
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T, AppError> {
    value.trim().parse().map_err(|_| AppError::InvalidConfig {
        key: key.to_string(),
        value: value.to_string(),
    })
}
