use core::{fmt::Display, str::FromStr};
use std::time::Duration;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::{
    AnalyticsError, AnalyticsResult,
    correlation::CorrelationMethod,
    time_series::{Aggregation, Frequency},
};

/// Name fragments that mark a column as a likely date column
pub const DEFAULT_DATE_HINTS: &[&str] = &["date", "created", "updated", "dt", "timestamp", "time", "ym", "dob"];

/// Tunable defaults of the analytics engine.
///
/// Every field maps to an environment variable read by [`from_env`]:
///
/// | field | variable | default |
/// |---|---|---|
/// | `corr_method` | `ANALYTICS_CORR_METHOD` | `pearson` |
/// | `rolling_window` | `ROLLING_DEFAULT_WINDOW` | `6` |
/// | `ema_span` | `EMA_DEFAULT_SPAN` | `6` |
/// | `z_threshold` | `OUTLIER_Z_THRESHOLD` | `3.0` |
/// | `iqr_k` | `OUTLIER_IQR_K` | `1.5` |
/// | `frequency` | `TIME_GROUPING_FREQ` | `M` |
/// | `aggregation` | `TIME_GROUPING_AGG` | `sum` |
/// | `max_rows` | `ANALYTICS_MAX_ROWS` | `500000` |
/// | `cache_ttl_secs` | `CACHE_TTL_SECONDS` | `60` |
/// | `date_hints` | `DATE_HINTS` | `date,created,updated,dt,timestamp,time,ym,dob` |
///
/// [`from_env`]: AnalyticsConfig::from_env
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Correlation method used when none is given
    pub corr_method: CorrelationMethod,
    /// Simple moving average window, in periods
    pub rolling_window: usize,
    /// Exponential moving average span, in periods
    pub ema_span: usize,
    /// Absolute z-score above which a value is an outlier
    pub z_threshold: f64,
    /// Tukey fence multiplier
    pub iqr_k: f64,
    /// Grouping frequency of time series
    pub frequency: Frequency,
    /// How values within a period are combined
    pub aggregation: Aggregation,
    /// Row ceiling for quadratic computations such as Kendall correlation
    pub max_rows: usize,
    /// Lifetime of cached column views, in seconds
    pub cache_ttl_secs: u64,
    /// Name fragments used to guess the date column
    pub date_hints: Vec<String>,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            corr_method: CorrelationMethod::Pearson,
            rolling_window: 6,
            ema_span: 6,
            z_threshold: 3.0,
            iqr_k: 1.5,
            frequency: Frequency::Monthly,
            aggregation: Aggregation::Sum,
            max_rows: 500_000,
            cache_ttl_secs: 60,
            date_hints: DEFAULT_DATE_HINTS.iter().map(|h| (*h).to_owned()).collect(),
        }
    }
}

impl AnalyticsConfig {
    /// Reads the configuration from the process environment.
    ///
    /// Unset variables keep their default; unparseable ones are logged and
    /// also keep their default.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through an arbitrary key lookup
    ///
    /// # Examples
    ///
    /// ```
    /// use tabular_stats::{AnalyticsConfig, Frequency};
    ///
    /// let config = AnalyticsConfig::from_lookup(|key| match key {
    ///     "TIME_GROUPING_FREQ" => Some("W".to_owned()),
    ///     "ROLLING_DEFAULT_WINDOW" => Some("twelve".to_owned()),
    ///     _ => None,
    /// });
    /// assert_eq!(config.frequency, Frequency::Weekly);
    /// assert_eq!(config.rolling_window, 6);
    /// ```
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let date_hints = match lookup("DATE_HINTS") {
            Some(raw) => raw
                .split(',')
                .map(|h| h.trim().to_lowercase())
                .filter(|h| !h.is_empty())
                .collect(),
            None => defaults.date_hints,
        };
        Self {
            corr_method: read(&lookup, "ANALYTICS_CORR_METHOD", defaults.corr_method),
            rolling_window: read(&lookup, "ROLLING_DEFAULT_WINDOW", defaults.rolling_window),
            ema_span: read(&lookup, "EMA_DEFAULT_SPAN", defaults.ema_span),
            z_threshold: read(&lookup, "OUTLIER_Z_THRESHOLD", defaults.z_threshold),
            iqr_k: read(&lookup, "OUTLIER_IQR_K", defaults.iqr_k),
            frequency: read(&lookup, "TIME_GROUPING_FREQ", defaults.frequency),
            aggregation: read(&lookup, "TIME_GROUPING_AGG", defaults.aggregation),
            max_rows: read(&lookup, "ANALYTICS_MAX_ROWS", defaults.max_rows),
            cache_ttl_secs: read(&lookup, "CACHE_TTL_SECONDS", defaults.cache_ttl_secs),
            date_hints,
        }
    }

    /// Lifetime of cached column views
    pub const fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Checks that every numeric setting lies in its domain.
    ///
    /// # Errors
    ///
    /// [`AnalyticsError::InvalidConfig`] naming the first offending setting.
    pub fn validate(&self) -> AnalyticsResult<()> {
        let invalid = |key: &'static str, value: &dyn Display| AnalyticsError::InvalidConfig {
            key,
            value: value.to_string(),
        };
        if self.rolling_window == 0 {
            return Err(invalid("rolling_window", &self.rolling_window));
        }
        if self.ema_span == 0 {
            return Err(invalid("ema_span", &self.ema_span));
        }
        if !(self.z_threshold.is_finite() && self.z_threshold > 0.0) {
            return Err(invalid("z_threshold", &self.z_threshold));
        }
        if !(self.iqr_k.is_finite() && self.iqr_k >= 0.0) {
            return Err(invalid("iqr_k", &self.iqr_k));
        }
        if self.max_rows == 0 {
            return Err(invalid("max_rows", &self.max_rows));
        }
        Ok(())
    }
}

fn read<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + Display,
{
    let Some(raw) = lookup(key) else {
        return default;
    };
    match raw.trim().parse() {
        Ok(value) => value,
        Err(_) => {
            warn!("ignoring {key}={raw:?}: cannot be parsed, using default {default}");
            default
        }
    }
}
