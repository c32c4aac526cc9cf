use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use chrono::Duration;

use crate::error::{PlannerError, Result};

pub const DEFAULT_DATA_DIR: &str = "./data";
pub const DEFAULT_CLIENT_SECRET_FILE: &str = "./client_secret.json";
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_FAILED_AFTER_SECS: i64 = 60;
/// One year.
pub const MAX_FAILED_AFTER_SECS: i64 = 365 * 24 * 60 * 60;
pub const DEFAULT_OAUTH_REDIRECT_PORT: u16 = 8085;

#[derive(Debug, Default, Clone)]
pub struct AppConfig {
    values: HashMap<String, String>,
}

impl AppConfig {
    pub fn from_file(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| PlannerError::Config(format!("cannot read {}: {}", path, e)))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let mut values = HashMap::new();
        for (idx, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed);
            let Some((key, value)) = trimmed.split_once('=') else {
                return Err(PlannerError::Config(format!(
                    "Invalid config line {}: {}",
                    idx + 1,
                    line
                )));
            };
            let key = key.trim();
            let mut value = value.trim().to_string();
            if value.len() >= 2
                && ((value.starts_with('"') && value.ends_with('"'))
                    || (value.starts_with('\'') && value.ends_with('\'')))
            {
                value = value[1..value.len() - 1].to_string();
            }
            values.insert(key.to_string(), value);
        }
        Ok(Self { values })
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

/// Typed runtime settings. Every key is looked up in the config file first
/// and then in the process environment.
#[derive(Debug, Clone)]
pub struct Settings {
    pub events_file: PathBuf,
    pub credentials_file: PathBuf,
    pub client_secret_file: PathBuf,
    pub poll_interval: std::time::Duration,
    /// How long past `notify_date` an unsent notification still counts as pending.
    pub failed_after: Duration,
    pub oauth_redirect_port: u16,
}

impl Settings {
    pub fn resolve(config: &AppConfig) -> Result<Self> {
        Self::from_lookup(|key| config.get(key).or_else(|| std::env::var(key).ok()))
    }

    pub fn from_lookup<F>(get_prop: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let data_dir = PathBuf::from(
            get_prop("DATA_DIR").unwrap_or_else(|| DEFAULT_DATA_DIR.to_string()),
        );
        let events_file = get_prop("EVENTS_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("events.json"));
        let credentials_file = get_prop("CREDENTIALS_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("credentials.json"));
        let client_secret_file = PathBuf::from(
            get_prop("CLIENT_SECRET_FILE")
                .unwrap_or_else(|| DEFAULT_CLIENT_SECRET_FILE.to_string()),
        );

        let poll_secs: u64 = parse_number(&get_prop, "POLL_INTERVAL_SECS", DEFAULT_POLL_INTERVAL_SECS)?;
        if poll_secs == 0 {
            return Err(PlannerError::Config(
                "POLL_INTERVAL_SECS must be greater than zero".to_string(),
            ));
        }
        let failed_after_secs: i64 = parse_number(&get_prop, "FAILED_AFTER_SECS", DEFAULT_FAILED_AFTER_SECS)?;
        let failed_after = Some(failed_after_secs)
            .filter(|secs| (0..=MAX_FAILED_AFTER_SECS).contains(secs))
            .and_then(Duration::try_seconds)
            .ok_or_else(|| {
                PlannerError::Config(format!(
                    "FAILED_AFTER_SECS must be between 0 and {}, got {}",
                    MAX_FAILED_AFTER_SECS, failed_after_secs
                ))
            })?;
        let oauth_redirect_port: u16 =
            parse_number(&get_prop, "OAUTH_REDIRECT_PORT", DEFAULT_OAUTH_REDIRECT_PORT)?;

        Ok(Self {
            events_file,
            credentials_file,
            client_secret_file,
            poll_interval: std::time::Duration::from_secs(poll_secs),
            failed_after,
            oauth_redirect_port,
        })
    }
}

fn parse_number<F, T>(get_prop: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match get_prop(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| PlannerError::Config(format!("{} must be a number, got {:?}", key, raw))),
        None => Ok(default),
    }
}
