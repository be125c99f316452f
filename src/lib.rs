#![doc = include_str!("../README.md")]
#![deny(
    unsafe_code,
    unused_imports,
    unused_variables,
    unused_must_use,
    missing_docs,
    clippy::all,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::dbg_macro,
    clippy::todo,
    clippy::unimplemented
)]
#![allow(clippy::just_underscores_and_digits, clippy::len_without_is_empty)]

pub(crate) type Kbn<T> = compensated_summation::KahanBabuskaNeumaier<T>;

mod utils;
pub(crate) use utils::{RingBuffer, helper};

mod error;
pub use error::{AnalyticsError, AnalyticsResult};

mod dataset;
pub use dataset::{Dataset, DatasetId, Value, normalize_column_name};

pub mod coerce;

mod descriptive;
pub use descriptive::{Percentiles, Summary, describe, percentiles_iqr};

mod outliers;
pub use outliers::{Mask, flag_outliers_iqr, flag_outliers_z};

mod correlation;
pub use correlation::{CorrelationMatrix, CorrelationMethod, correlation_matrix, kendall, pair_correlation, pearson, spearman};

mod time_series;
pub use time_series::{AggregatedSeries, Aggregation, Frequency, SeriesPoint, aggregate};

mod rolling;
pub use rolling::{ExponentialMean, RollingMean, SmoothedPoint, ema, rolling_ema, rolling_sma, sma};

mod growth;
pub use growth::{GrowthPoint, cagr, compound_growth_rate, growth, monthly_growth};

mod trend;
pub use trend::{LinearTrend, fit_linear, linear_trend, trend};

mod filter;
pub use filter::{between_dates, between_numeric, contains_ci};

mod cache;
pub use cache::{Clock, CoercionCache, SystemClock};

mod config;
pub use config::{AnalyticsConfig, DEFAULT_DATE_HINTS};

mod analytics;
pub use analytics::Analytics;
