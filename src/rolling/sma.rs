use crate::{
    AggregatedSeries, AnalyticsResult, Dataset, Kbn, RingBuffer,
    error::ensure_positive,
    rolling::SmoothedPoint,
    time_series::{Aggregation, Frequency, aggregate},
};

/// Mean of the present values among the last `period` observations.
///
/// Unlike a strict moving average it is defined from the first observation
/// on: while the window is filling, the mean covers whatever has arrived.
/// Missing observations occupy a slot in the window but do not count towards
/// the mean.
#[derive(Debug, Clone)]
pub struct RollingMean {
    /// Most recent observations, oldest first
    buf: RingBuffer<Option<f64>>,
    /// Sum of the present values in the window
    sum: Kbn<f64>,
    /// Number of present values in the window
    count: usize,
}

impl RollingMean {
    /// Creates a new `RollingMean` over `period` observations.
    ///
    /// # Errors
    ///
    /// [`crate::AnalyticsError::InvalidParameter`] if `period` is zero.
    pub fn new(period: usize) -> AnalyticsResult<Self> {
        ensure_positive("window", period)?;
        Ok(Self {
            buf: RingBuffer::new(period),
            sum: Kbn::default(),
            count: 0,
        })
    }

    /// Returns the window length
    pub fn period(&self) -> usize {
        self.buf.capacity()
    }

    /// Pushes the next observation, evicting the oldest once the window is full
    ///
    /// # Returns
    ///
    /// * `&mut Self` - The rolling mean object
    pub fn next(&mut self, value: Option<f64>) -> &mut Self {
        if let Some(Some(popped)) = self.buf.push(value) {
            self.sum -= popped;
            self.count -= 1;
        }
        if let Some(v) = value {
            self.sum += v;
            self.count += 1;
        }
        if self.count == 0 {
            self.sum = Kbn::default();
        }
        self
    }

    /// Returns the mean of the window, `None` if it holds no present value
    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum.total() / self.count as f64)
    }
}

/// Simple moving average of an aggregated series
///
/// # Errors
///
/// [`crate::AnalyticsError::InvalidParameter`] if `window` is zero.
pub fn sma(series: &AggregatedSeries, window: usize) -> AnalyticsResult<Vec<SmoothedPoint>> {
    let mut rolling = RollingMean::new(window)?;
    Ok(series
        .points()
        .iter()
        .map(|p| SmoothedPoint {
            period: p.period,
            value: p.value,
            smoothed: rolling.next(p.value).mean(),
        })
        .collect())
}

/// Aggregates `(date, value)` columns and smooths them with a simple moving
/// average over `window` periods.
///
/// # Arguments
///
/// * `dataset` - The rows to resample
/// * `date_column` - Column read as timestamps
/// * `value_column` - Column read as numbers
/// * `window` - Number of periods averaged
/// * `frequency` - Period length
/// * `aggregation` - How the values of a period are combined
///
/// # Returns
///
/// * `Vec<SmoothedPoint>` - The aggregated series with its moving average
///
/// # Errors
///
/// [`crate::AnalyticsError::InvalidParameter`] if `window` is zero.
///
/// # Examples
///
/// ```
/// use tabular_stats::{Aggregation, Dataset, Frequency, rolling_sma};
///
/// let ds = Dataset::from_columns([
///     ("date", vec!["2024-01-01".into(), "2024-02-01".into(), "2024-03-01".into()]),
///     ("amount", vec![10.0.into(), 20.0.into(), 60.0.into()]),
/// ]);
/// let out = rolling_sma(&ds, "date", "amount", 2, Frequency::Monthly, Aggregation::Sum)?;
/// let smoothed: Vec<_> = out.iter().map(|p| p.smoothed).collect();
/// assert_eq!(smoothed, [Some(10.0), Some(15.0), Some(40.0)]);
/// # Ok::<(), tabular_stats::AnalyticsError>(())
/// ```
pub fn rolling_sma(
    dataset: &Dataset,
    date_column: &str,
    value_column: &str,
    window: usize,
    frequency: Frequency,
    aggregation: Aggregation,
) -> AnalyticsResult<Vec<SmoothedPoint>> {
    ensure_positive("window", window)?;
    let series = aggregate(dataset, date_column, value_column, frequency, aggregation);
    sma(&series, window)
}
