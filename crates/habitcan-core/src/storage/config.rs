//! TOML-based application configuration.
//!
//! Stores the tunables of the habit engine:
//! - Realtime monitor cadence
//! - Daily settlement run time
//! - Sleep-day boundary hour
//! - Trend palette and window
//! - Monthly report thresholds
//!
//! Configuration is stored at `~/.config/habitcan/config.toml`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::analytics::{Palette, ReportSettings, MAX_TREND_DAYS};
use crate::error::ConfigError;
use crate::sleep_day::{DayBoundary, DEFAULT_BOUNDARY_HOUR};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Seconds between realtime polls.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementConfig {
    #[serde(default)]
    pub hour: u32,
    #[serde(default = "default_settlement_minute")]
    pub minute: u32,
    #[serde(default = "default_period_hours")]
    pub period_hours: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleepDayConfig {
    /// Hours `[0, boundary_hour)` belong to the previous sleep-day.
    #[serde(default = "default_boundary_hour")]
    pub boundary_hour: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    #[serde(default = "default_palette")]
    pub palette: Vec<String>,
    #[serde(default = "default_fallback_color")]
    pub fallback_color: String,
    #[serde(default = "default_trend_days")]
    pub trend_days: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub settlement: SettlementConfig,
    #[serde(default)]
    pub sleep_day: SleepDayConfig,
    #[serde(default)]
    pub analytics: AnalyticsConfig,
    #[serde(default)]
    pub report: ReportSettings,
}

// Default functions
fn default_interval_secs() -> u64 {
    60
}
fn default_settlement_minute() -> u32 {
    1
}
fn default_period_hours() -> u64 {
    24
}
fn default_boundary_hour() -> u32 {
    DEFAULT_BOUNDARY_HOUR
}
fn default_palette() -> Vec<String> {
    Palette::default().colors
}
fn default_fallback_color() -> String {
    Palette::default().fallback
}
fn default_trend_days() -> u32 {
    30
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
        }
    }
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            hour: 0,
            minute: default_settlement_minute(),
            period_hours: default_period_hours(),
        }
    }
}

impl Default for SleepDayConfig {
    fn default() -> Self {
        Self {
            boundary_hour: default_boundary_hour(),
        }
    }
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            palette: default_palette(),
            fallback_color: default_fallback_color(),
            trend_days: default_trend_days(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_some() {
                current = current.get_mut(part).ok_or_else(unknown)?;
                continue;
            }

            let obj = current.as_object_mut().ok_or_else(unknown)?;
            let existing = obj.get(part).ok_or_else(unknown)?;
            let new_value = match existing {
                serde_json::Value::Bool(_) => serde_json::Value::Bool(
                    value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                ),
                serde_json::Value::Number(_) => {
                    if let Ok(n) = value.parse::<i64>() {
                        serde_json::Value::Number(n.into())
                    } else if let Ok(n) = value.parse::<f64>() {
                        serde_json::Number::from_f64(n)
                            .map(serde_json::Value::Number)
                            .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?
                    } else {
                        return Err(invalid(format!("cannot parse '{value}' as number")));
                    }
                }
                serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                    serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                }
                _ => serde_json::Value::String(value.into()),
            };
            obj.insert(part.to_string(), new_value);
            return Ok(());
        }

        Err(unknown())
    }

    /// `<data_dir>/config.toml`
    pub fn path() -> Result<PathBuf, ConfigError> {
        data_dir()
            .map(|dir| dir.join("config.toml"))
            .map_err(|e| ConfigError::LoadFailed {
                path: PathBuf::from("config.toml"),
                message: e.to_string(),
            })
    }

    /// Load from the default location, writing defaults on first run.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be parsed, or if the
    /// default config cannot be written.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                toml::from_str(&content).map_err(|e| ConfigError::ParseFailed(e.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a value by dot-separated key without saving.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value does not fit.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json =
            serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config =
            serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Set a value by key and save to the default location.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.apply(key, value)?;
        self.save()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &str, message: &str| ConfigError::InvalidValue {
            key: key.to_string(),
            message: message.to_string(),
        };
        if self.monitor.interval_secs == 0 {
            return Err(invalid("monitor.interval_secs", "must be at least 1"));
        }
        if self.settlement_time().is_none() {
            return Err(invalid("settlement", "hour/minute is not a valid clock time"));
        }
        if self.settlement.period_hours == 0 {
            return Err(invalid("settlement.period_hours", "must be at least 1"));
        }
        if self.sleep_day.boundary_hour > 23 {
            return Err(invalid("sleep_day.boundary_hour", "must be between 0 and 23"));
        }
        if !(1..=MAX_TREND_DAYS).contains(&self.analytics.trend_days) {
            return Err(invalid("analytics.trend_days", "must be between 1 and 366"));
        }
        Ok(())
    }

    pub fn monitor_interval(&self) -> Duration {
        Duration::from_secs(self.monitor.interval_secs.max(1))
    }

    pub fn settlement_time(&self) -> Option<NaiveTime> {
        NaiveTime::from_hms_opt(self.settlement.hour, self.settlement.minute, 0)
    }

    pub fn settlement_period(&self) -> Duration {
        Duration::from_secs(self.settlement.period_hours.max(1) * 3600)
    }

    pub fn boundary(&self) -> DayBoundary {
        DayBoundary::new(self.sleep_day.boundary_hour.min(23))
    }

    pub fn palette(&self) -> Palette {
        Palette {
            colors: self.analytics.palette.clone(),
            fallback: self.analytics.fallback_color.clone(),
        }
    }
}
