mod sma;
pub use sma::{RollingMean, rolling_sma, sma};

mod ema;
pub use ema::{ExponentialMean, ema, rolling_ema};

use chrono::NaiveDate;
use serde::Serialize;

/// A period of an aggregated series next to its smoothed value
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SmoothedPoint {
    /// First day of the period
    pub period: NaiveDate,
    /// Aggregated value of the period
    pub value: Option<f64>,
    /// Moving average ending at this period
    pub smoothed: Option<f64>,
}
