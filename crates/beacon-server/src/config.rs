use std::collections::HashMap;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use chrono::FixedOffset;
use reqwest::Url;
use tracing::info;

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub public_dir: PathBuf,
    /// `None` means SMS is only logged.
    pub fast2sms_api_key: Option<String>,
    pub fast2sms_endpoint: Url,
    pub overpass_endpoint: Url,
    pub sms_interval: Duration,
    pub sms_timeout: Duration,
    pub dispatch_budget: Duration,
    pub places_timeout: Duration,
    pub alert_offset: FixedOffset,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_vars(std::env::vars().collect())
    }

    fn from_vars(vars: HashMap<String, String>) -> Result<Self> {
        let get = |key: &str| lookup(&vars, key);

        let jwt_secret = get("BEACON_JWT_SECRET").unwrap_or_default().to_string();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("BEACON_JWT_SECRET is unset or still a placeholder");
        }

        let offset_minutes: i32 = parse_or(get("BEACON_ALERT_UTC_OFFSET_MINUTES"), "BEACON_ALERT_UTC_OFFSET_MINUTES", 0)?;
        let alert_offset = FixedOffset::east_opt(offset_minutes * 60)
            .ok_or_else(|| anyhow!("BEACON_ALERT_UTC_OFFSET_MINUTES out of range: {}", offset_minutes))?;

        let fast2sms_api_key = get("FAST2SMS_API_KEY").map(str::to_string);
        if fast2sms_api_key.is_none() {
            info!("FAST2SMS_API_KEY not set, SOS messages will only be logged");
        }

        Ok(Self {
            host: get("BEACON_HOST").unwrap_or("0.0.0.0").to_string(),
            port: parse_or(get("BEACON_PORT"), "BEACON_PORT", 5000)?,
            db_path: get("BEACON_DB_PATH").unwrap_or("beacon.db").into(),
            jwt_secret,
            public_dir: get("BEACON_PUBLIC_DIR").unwrap_or("public").into(),
            fast2sms_api_key,
            fast2sms_endpoint: parse_url(get("FAST2SMS_ENDPOINT"), beacon_sms::fast2sms::DEFAULT_ENDPOINT)?,
            overpass_endpoint: parse_url(get("OVERPASS_ENDPOINT"), beacon_geo::overpass::DEFAULT_ENDPOINT)?,
            sms_interval: Duration::from_millis(parse_or(get("BEACON_SMS_INTERVAL_MS"), "BEACON_SMS_INTERVAL_MS", 1000)?),
            sms_timeout: Duration::from_secs(parse_or(get("BEACON_SMS_TIMEOUT_SECS"), "BEACON_SMS_TIMEOUT_SECS", 10)?),
            dispatch_budget: Duration::from_secs(parse_or(
                get("BEACON_DISPATCH_BUDGET_SECS"),
                "BEACON_DISPATCH_BUDGET_SECS",
                30,
            )?),
            places_timeout: Duration::from_secs(parse_or(get("BEACON_PLACES_TIMEOUT_SECS"), "BEACON_PLACES_TIMEOUT_SECS", 30)?),
            alert_offset,
        })
    }
}

/// Set and non-blank, trimmed.
fn lookup<'a>(vars: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    vars.get(key).map(|v| v.trim()).filter(|v| !v.is_empty())
}

fn parse_or<T>(raw: Option<&str>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match raw {
        Some(value) => value
            .parse()
            .map_err(|e| anyhow!("invalid {} value '{}': {}", key, value, e)),
        None => Ok(default),
    }
}

fn parse_url(raw: Option<&str>, default: &str) -> Result<Url> {
    let value = raw.unwrap_or(default);
    Url::parse(value).with_context(|| format!("invalid URL '{}'", value))
}
