use std::time::Duration;

use fa_search_bot::config::Config;
use fa_search_bot::error::AppError;
use serial_test::serial;

const KEYS: [&str; 11] = [
    "DISCORD_TOKEN",
    "API_URL",
    "POLL_INTERVAL",
    "SEARCH_CONCURRENCY",
    "SEARCH_TIMEOUT",
    "SEARCH_RATE_PER_MINUTE",
    "FAILURE_THRESHOLD",
    "OPERATOR_CHANNEL_ID",
    "DB_PATH",
    "DB_URL",
    "LOGS_PATH",
];

fn clear_env() {
    for key in KEYS {
        unsafe { std::env::remove_var(key) };
    }
}

fn set_env(key: &str, value: &str) {
    unsafe { std::env::set_var(key, value) };
}

#[test]
#[serial]
fn test_defaults_with_token_only() {
    clear_env();
    set_env("DISCORD_TOKEN", "token");

    let mut config = Config::new();
    config.load().unwrap();

    assert_eq!(config.discord_token, "token");
    assert_eq!(config.api_url, "https://faexport.spangle.org.uk");
    assert_eq!(config.poll_interval, Duration::from_secs(30));
    assert_eq!(config.search_concurrency, 4);
    assert_eq!(config.search_timeout, Duration::from_secs(20));
    assert_eq!(config.search_rate_per_minute, 60);
    assert_eq!(config.failure_threshold, 5);
    assert_eq!(config.operator_channel_id, None);
    assert_eq!(config.db_path, "data/data.db");
    assert_eq!(config.db_url, "sqlite://data/data.db");

    let options = config.watcher_options();
    assert_eq!(options.poll_interval, Duration::from_secs(30));
    assert_eq!(options.operator_destination, None);
    clear_env();
}

#[test]
#[serial]
fn test_missing_token() {
    clear_env();

    let err = Config::new().load().unwrap_err();

    assert!(matches!(err, AppError::MissingConfig { ref key } if key == "DISCORD_TOKEN"));
}

#[test]
#[serial]
fn test_overrides() {
    clear_env();
    set_env("DISCORD_TOKEN", "token");
    set_env("POLL_INTERVAL", "90");
    set_env("OPERATOR_CHANNEL_ID", "1234");
    set_env("DB_PATH", "/tmp/fa.db");

    let mut config = Config::new();
    config.load().unwrap();

    assert_eq!(config.poll_interval, Duration::from_secs(90));
    assert_eq!(config.operator_channel_id, Some(1234));
    assert_eq!(config.db_url, "sqlite:///tmp/fa.db");
    assert_eq!(config.watcher_options().operator_destination, Some(1234));
    clear_env();
}

#[test]
#[serial]
fn test_invalid_numbers_are_rejected() {
    clear_env();
    set_env("DISCORD_TOKEN", "token");
    set_env("SEARCH_CONCURRENCY", "many");

    let err = Config::new().load().unwrap_err();
    assert!(matches!(err, AppError::InvalidConfig { ref key, .. } if key == "SEARCH_CONCURRENCY"));

    set_env("SEARCH_CONCURRENCY", "4");
    set_env("FAILURE_THRESHOLD", "0");
    let err = Config::new().load().unwrap_err();
    assert!(matches!(err, AppError::InvalidConfig { ref key, .. } if key == "FAILURE_THRESHOLD"));
    clear_env();
}
