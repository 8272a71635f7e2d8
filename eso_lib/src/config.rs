//! Runtime configuration: TOML file plus `ESO_*` environment overrides.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use chrono_tz::Tz;
use serde::Deserialize;

use crate::error::EsoError;
use crate::normalize::NormalizeOptions;

pub const DEFAULT_NAME: &str = "ESO";
pub const DEFAULT_BASE_URL: &str = "https://mano.eso.lt";
pub const DEFAULT_TIME_ZONE: &str = "Europe/Vilnius";
pub const DEFAULT_SCAN_INTERVAL_MINUTES: u64 = 60;
/// One week.
pub const MAX_SCAN_INTERVAL_MINUTES: u64 = 7 * 24 * 60;

/// Config as read from a file: every key optional so the environment can
/// fill the gaps.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PartialConfig {
    pub username: Option<String>,
    pub password: Option<String>,
    pub selector: Option<String>,
    pub name: Option<String>,
    pub scan_interval_minutes: Option<u64>,
    pub time_zone: Option<String>,
    pub base_url: Option<String>,
    pub strict_labels: Option<bool>,
}

impl PartialConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, EsoError> {
        toml::from_str(content).map_err(|e| EsoError::Config(format!("invalid config file: {}", e)))
    }

    /// Overrides keys with `ESO_*` variables returned by `lookup`.
    pub fn apply_env<F>(mut self, lookup: F) -> Result<Self, EsoError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let set = |slot: &mut Option<String>, key: &str| {
            if let Some(value) = lookup(key) {
                *slot = Some(value);
            }
        };
        set(&mut self.username, "ESO_USERNAME");
        set(&mut self.password, "ESO_PASSWORD");
        set(&mut self.selector, "ESO_SELECTOR");
        set(&mut self.name, "ESO_NAME");
        set(&mut self.time_zone, "ESO_TIME_ZONE");
        set(&mut self.base_url, "ESO_BASE_URL");

        if let Some(raw) = lookup("ESO_SCAN_INTERVAL_MINUTES") {
            let minutes = raw.trim().parse().map_err(|_| {
                EsoError::Config(format!("ESO_SCAN_INTERVAL_MINUTES is not a number: {}", raw))
            })?;
            self.scan_interval_minutes = Some(minutes);
        }
        if let Some(raw) = lookup("ESO_STRICT_LABELS") {
            let strict = match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                _ => {
                    return Err(EsoError::Config(format!(
                        "ESO_STRICT_LABELS is not a boolean: {}",
                        raw
                    )))
                }
            };
            self.strict_labels = Some(strict);
        }
        Ok(self)
    }

    /// Validates and fills defaults.
    pub fn build(self) -> Result<EsoConfig, EsoError> {
        fn required(value: Option<String>, key: &str) -> Result<String, EsoError> {
            match value {
                Some(v) if !v.trim().is_empty() => Ok(v),
                _ => Err(EsoError::Config(format!("`{}` is required", key))),
            }
        }

        let time_zone_name = self
            .time_zone
            .unwrap_or_else(|| DEFAULT_TIME_ZONE.to_string());
        let time_zone: Tz = time_zone_name.parse().map_err(|e| {
            EsoError::Config(format!("unknown time zone `{}`: {}", time_zone_name, e))
        })?;

        let scan_interval_minutes = self
            .scan_interval_minutes
            .unwrap_or(DEFAULT_SCAN_INTERVAL_MINUTES);
        if !(1..=MAX_SCAN_INTERVAL_MINUTES).contains(&scan_interval_minutes) {
            return Err(EsoError::Config(format!(
                "`scan_interval_minutes` must be between 1 and {}, got {}",
                MAX_SCAN_INTERVAL_MINUTES, scan_interval_minutes
            )));
        }

        Ok(EsoConfig {
            username: required(self.username, "username")?,
            password: required(self.password, "password")?,
            selector: required(self.selector, "selector")?.trim().to_string(),
            name: self.name.unwrap_or_else(|| DEFAULT_NAME.to_string()),
            scan_interval_minutes,
            time_zone,
            base_url: self
                .base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            strict_labels: self.strict_labels.unwrap_or(false),
        })
    }
}

/// Validated configuration of the integration.
#[derive(Clone)]
pub struct EsoConfig {
    pub username: String,
    pub password: String,
    /// Display name (or part of it) of the meter/object to track.
    pub selector: String,
    /// Display label of the tracked entity.
    pub name: String,
    pub scan_interval_minutes: u64,
    pub time_zone: Tz,
    pub base_url: String,
    pub strict_labels: bool,
}

impl EsoConfig {
    /// Loads the optional TOML file at `path`, then applies the process
    /// environment.
    pub fn load(path: Option<&Path>) -> Result<Self, EsoError> {
        let partial = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path).map_err(|e| {
                    EsoError::Config(format!("cannot read {}: {}", path.display(), e))
                })?;
                PartialConfig::from_toml_str(&content)?
            }
            None => PartialConfig::default(),
        };
        partial.apply_env(|key| std::env::var(key).ok())?.build()
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_minutes.saturating_mul(60))
    }

    pub fn normalize_options(&self) -> NormalizeOptions {
        NormalizeOptions {
            time_zone: self.time_zone,
            strict_labels: self.strict_labels,
        }
    }
}

impl fmt::Debug for EsoConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EsoConfig")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("selector", &self.selector)
            .field("name", &self.name)
            .field("scan_interval_minutes", &self.scan_interval_minutes)
            .field("time_zone", &self.time_zone)
            .field("base_url", &self.base_url)
            .field("strict_labels", &self.strict_labels)
            .finish()
    }
}
