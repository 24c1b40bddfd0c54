use std::time::Duration;

use crate::error::{Error, Result};
use crate::storage::repository;
use crate::storage::Database;

pub const KEY_API_BASE_URL: &str = "api_base_url";
pub const KEY_API_TOKEN: &str = "api_token";
pub const KEY_REQUEST_TIMEOUT_SECS: &str = "request_timeout_secs";
pub const KEY_EVENT_LIMIT: &str = "event_limit";
pub const KEY_RATE_LIMIT_RETRIES: &str = "rate_limit_retries";

pub const ENV_API_URL: &str = "FELLOWSHIP_API_URL";
pub const ENV_API_TOKEN: &str = "FELLOWSHIP_API_TOKEN";

/// Cap on the completed-event listing pulled into a report.
pub const DEFAULT_EVENT_LIMIT: u32 = 1000;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_RATE_LIMIT_RETRIES: u32 = 2;

/// Settings for talking to the reporting API.
///
/// Layered lowest to highest: built-in defaults, the `app_config` table,
/// environment variables. The CLI applies its own flags on top.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_base_url: Option<String>,
    pub api_token: Option<String>,
    pub request_timeout: Duration,
    pub event_limit: u32,
    pub rate_limit_retries: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: None,
            api_token: None,
            request_timeout: DEFAULT_TIMEOUT,
            event_limit: DEFAULT_EVENT_LIMIT,
            rate_limit_retries: DEFAULT_RATE_LIMIT_RETRIES,
        }
    }
}

impl ClientConfig {
    /// Load defaults, then stored config, then the process environment.
    pub async fn load(db: &Database) -> Result<Self> {
        let stored = db
            .reader()
            .call(|conn| repository::list_config(conn))
            .await?;
        let mut config = Self::default();
        config.apply_stored(&stored)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Overlay key/value pairs from the `app_config` table. Unknown keys
    /// are ignored so other settings can share the table.
    pub fn apply_stored(&mut self, stored: &[(String, String)]) -> Result<()> {
        for (key, value) in stored {
            match key.as_str() {
                KEY_API_BASE_URL => self.api_base_url = non_empty(value),
                KEY_API_TOKEN => self.api_token = non_empty(value),
                KEY_REQUEST_TIMEOUT_SECS => {
                    self.request_timeout = Duration::from_secs(parse_number(key, value)?)
                }
                KEY_EVENT_LIMIT => {
                    let limit: u32 = parse_number(key, value)?;
                    if limit == 0 {
                        return Err(Error::Config(format!("{key} must be at least 1")));
                    }
                    self.event_limit = limit;
                }
                KEY_RATE_LIMIT_RETRIES => self.rate_limit_retries = parse_number(key, value)?,
                _ => {}
            }
        }
        Ok(())
    }

    /// Overlay environment variables, read through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_API_URL).as_deref().and_then(non_empty) {
            self.api_base_url = Some(url);
        }
        if let Some(token) = lookup(ENV_API_TOKEN).as_deref().and_then(non_empty) {
            self.api_token = Some(token);
        }
    }

    /// The configured base URL, or a hint on how to set one.
    pub fn base_url(&self) -> Result<&str> {
        self.api_base_url.as_deref().ok_or_else(|| {
            Error::Config(format!(
                "no API URL configured. Set {ENV_API_URL} or run: fellowship-reports config set {KEY_API_BASE_URL} <URL>"
            ))
        })
    }
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("{key} must be a non-negative integer, got '{value}'")))
}
