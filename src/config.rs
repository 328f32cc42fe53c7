//! Startup configuration read from the environment
//!
//! `main` loads `.env` first, then calls [`Config::from_env`]. Parsing goes
//! through a lookup function so tests can feed a plain map instead of
//! touching the process environment.

use std::{env, fmt::Display, net::SocketAddr, path::PathBuf, str::FromStr};

use thiserror::Error;
use tracing::info;

const ENV_DATABASE_URL: &str = "DATABASE_URL";
const ENV_CHANNEL_ID: &str = "THINGSPEAK_CHANNEL_ID";
const ENV_READ_API_KEY: &str = "THINGSPEAK_READ_API_KEY";
const ENV_WRITE_API_KEY: &str = "THINGSPEAK_WRITE_API_KEY";
const ENV_BASE_URL: &str = "THINGSPEAK_BASE_URL";
const ENV_FETCH_INTERVAL: &str = "FETCH_INTERVAL_SECONDS";
const ENV_RECONCILE_INTERVAL: &str = "RECONCILE_INTERVAL_SECONDS";
const ENV_AGGREGATION_INTERVAL: &str = "AGGREGATION_INTERVAL_SECONDS";
const ENV_FIELD_ID: &str = "FIELD_ID";
const ENV_JWT_SECRET: &str = "JWT_SECRET";
const ENV_BIND_ADDR: &str = "BIND_ADDR";
const ENV_ANALYTICS_COMMAND: &str = "ANALYTICS_COMMAND";
const ENV_ANALYTICS_ARGS: &str = "ANALYTICS_ARGS";
const ENV_ANALYTICS_WORKDIR: &str = "ANALYTICS_WORKDIR";

pub const DEFAULT_BASE_URL: &str = "https://api.thingspeak.com";
pub const DEFAULT_FIELD_ID: &str = "maize_field_1";
const DEFAULT_FETCH_INTERVAL_SECS: u64 = 15;
const DEFAULT_RECONCILE_INTERVAL_SECS: u64 = 300;
const DEFAULT_AGGREGATION_INTERVAL_SECS: u64 = 3600;
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_ANALYTICS_ARGS: &str = "main.py";
const DEFAULT_ANALYTICS_WORKDIR: &str = "analytics";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("Invalid {key} value '{value}': {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Telemetry channel coordinates
#[derive(Debug, Clone)]
pub struct ThingSpeakConfig {
    pub base_url: String,
    pub channel_id: String,
    pub read_api_key: String,
    pub write_api_key: Option<String>,
}

/// External analytics command; absent means the analytics endpoints are disabled
#[derive(Debug, Clone)]
pub struct AnalyticsConfig {
    pub command: String,
    pub args: Vec<String>,
    pub workdir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub thingspeak: ThingSpeakConfig,
    pub fetch_interval_secs: u64,
    pub reconcile_interval_secs: u64,
    pub aggregation_interval_secs: u64,
    pub field_id: String,
    pub jwt_secret: String,
    pub bind_addr: SocketAddr,
    pub analytics: Option<AnalyticsConfig>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &'static str| var(key).ok_or(ConfigError::Missing(key));

        let database_url = required(ENV_DATABASE_URL)?;

        let thingspeak = ThingSpeakConfig {
            base_url: var(ENV_BASE_URL)
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            channel_id: required(ENV_CHANNEL_ID)?,
            read_api_key: required(ENV_READ_API_KEY)?,
            write_api_key: var(ENV_WRITE_API_KEY),
        };

        let fetch_interval_secs =
            parse_interval(ENV_FETCH_INTERVAL, var(ENV_FETCH_INTERVAL), DEFAULT_FETCH_INTERVAL_SECS)?;
        let reconcile_interval_secs = parse_interval(
            ENV_RECONCILE_INTERVAL,
            var(ENV_RECONCILE_INTERVAL),
            DEFAULT_RECONCILE_INTERVAL_SECS,
        )?;
        let aggregation_interval_secs = parse_interval(
            ENV_AGGREGATION_INTERVAL,
            var(ENV_AGGREGATION_INTERVAL),
            DEFAULT_AGGREGATION_INTERVAL_SECS,
        )?;

        let bind_addr = parse_or(ENV_BIND_ADDR, var(ENV_BIND_ADDR), DEFAULT_BIND_ADDR)?;

        let analytics = var(ENV_ANALYTICS_COMMAND).map(|command| AnalyticsConfig {
            command,
            args: var(ENV_ANALYTICS_ARGS)
                .unwrap_or_else(|| DEFAULT_ANALYTICS_ARGS.to_string())
                .split_whitespace()
                .map(str::to_string)
                .collect(),
            workdir: PathBuf::from(
                var(ENV_ANALYTICS_WORKDIR).unwrap_or_else(|| DEFAULT_ANALYTICS_WORKDIR.to_string()),
            ),
        });

        Ok(Self {
            database_url,
            thingspeak,
            fetch_interval_secs,
            reconcile_interval_secs,
            aggregation_interval_secs,
            field_id: var(ENV_FIELD_ID).unwrap_or_else(|| DEFAULT_FIELD_ID.to_string()),
            jwt_secret: required(ENV_JWT_SECRET)?,
            bind_addr,
            analytics,
        })
    }
}

fn parse_or<T>(key: &'static str, value: Option<String>, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    let raw = value.unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        value: raw.clone(),
        reason: e.to_string(),
    })
}

fn parse_interval(key: &'static str, value: Option<String>, default: u64) -> Result<u64, ConfigError> {
    let secs: u64 = parse_or(key, value, &default.to_string())?;
    if secs == 0 {
        return Err(ConfigError::Invalid {
            key,
            value: "0".to_string(),
            reason: "interval must be at least one second".to_string(),
        });
    }
    Ok(secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("DATABASE_URL", "postgres://maize@localhost/maizewatch"),
            ("THINGSPEAK_CHANNEL_ID", "2965485"),
            ("THINGSPEAK_READ_API_KEY", "read-key"),
            ("JWT_SECRET", "secret"),
        ])
    }

    fn load(env: &HashMap<&'static str, &'static str>) -> Result<Config, ConfigError> {
        Config::from_lookup(|key| env.get(key).map(|v| v.to_string()))
    }

    #[test]
    fn test_defaults_applied() {
        let config = load(&base_env()).unwrap();
        assert_eq!(config.fetch_interval_secs, 15);
        assert_eq!(config.reconcile_interval_secs, 300);
        assert_eq!(config.aggregation_interval_secs, 3600);
        assert_eq!(config.field_id, "maize_field_1");
        assert_eq!(config.thingspeak.base_url, DEFAULT_BASE_URL);
        assert!(config.thingspeak.write_api_key.is_none());
        assert!(config.analytics.is_none());
        assert_eq!(config.bind_addr.port(), 3000);
    }

    #[test]
    fn test_missing_database_url_is_fatal() {
        let mut env = base_env();
        env.remove("DATABASE_URL");
        assert_eq!(load(&env).unwrap_err(), ConfigError::Missing("DATABASE_URL"));
    }

    #[test]
    fn test_blank_value_counts_as_missing() {
        let mut env = base_env();
        env.insert("THINGSPEAK_READ_API_KEY", "  ");
        assert_eq!(
            load(&env).unwrap_err(),
            ConfigError::Missing("THINGSPEAK_READ_API_KEY")
        );
    }

    #[test]
    fn test_invalid_interval_rejected() {
        let mut env = base_env();
        env.insert("FETCH_INTERVAL_SECONDS", "fast");
        assert!(matches!(
            load(&env).unwrap_err(),
            ConfigError::Invalid { key: "FETCH_INTERVAL_SECONDS", .. }
        ));

        env.insert("FETCH_INTERVAL_SECONDS", "0");
        assert!(load(&env).is_err());
    }

    #[test]
    fn test_analytics_args_split() {
        let mut env = base_env();
        env.insert("ANALYTICS_COMMAND", "python3");
        env.insert("ANALYTICS_ARGS", "main.py --quiet");
        env.insert("THINGSPEAK_BASE_URL", "http://localhost:8080/");

        let config = load(&env).unwrap();
        let analytics = config.analytics.unwrap();
        assert_eq!(analytics.command, "python3");
        assert_eq!(analytics.args, vec!["main.py", "--quiet"]);
        assert_eq!(analytics.workdir, PathBuf::from("analytics"));
        assert_eq!(config.thingspeak.base_url, "http://localhost:8080");
    }
}
