use crate::{
    AggregatedSeries, AnalyticsConfig, AnalyticsError, AnalyticsResult, Dataset,
    cache::{Clock, CoercionCache, SystemClock},
    coerce::guess_date_column,
    correlation::{CorrelationMatrix, CorrelationMethod, correlation_matrix},
    descriptive::{Percentiles, Summary, percentiles_sorted, summarize_sorted},
    growth::{GrowthPoint, compound_growth_rate, growth},
    helper::sorted_present,
    outliers::{Mask, iqr_mask, zscore_mask},
    rolling::{SmoothedPoint, ema, sma},
    time_series::{Frequency, aggregate_views},
    trend::{LinearTrend, trend},
};

/// Entry point bundling a validated configuration with a coercion cache.
///
/// Every operation takes its tunables from [`AnalyticsConfig`], and repeated
/// calls over the same dataset reuse the coerced column views until they
/// expire.
///
/// # Examples
///
/// ```
/// use tabular_stats::{Analytics, AnalyticsConfig, Dataset};
///
/// let mut analytics = Analytics::new(AnalyticsConfig::default())?;
/// let ds = Dataset::from_columns([
///     ("created", vec!["2024-01-03".into(), "2024-02-11".into(), "2024-03-08".into()]),
///     ("amount", vec![100.0.into(), 110.0.into(), 121.0.into()]),
/// ]);
///
/// let date = analytics.guess_date_column(&ds).unwrap_or_default();
/// assert_eq!(date, "created");
/// assert_eq!(analytics.describe(&ds, "amount").max, Some(121.0));
/// let growth = analytics.growth(&ds, &date, "amount");
/// assert_eq!(growth.len(), 3);
/// # Ok::<(), tabular_stats::AnalyticsError>(())
/// ```
#[derive(Debug)]
pub struct Analytics<C: Clock = SystemClock> {
    config: AnalyticsConfig,
    cache: CoercionCache<C>,
}

impl Analytics<SystemClock> {
    /// Creates a facade over a configuration.
    ///
    /// # Errors
    ///
    /// [`AnalyticsError::InvalidConfig`] if the configuration does not validate.
    pub fn new(config: AnalyticsConfig) -> AnalyticsResult<Self> {
        Self::with_clock(config, SystemClock)
    }

    /// Creates a facade configured from environment variables.
    ///
    /// # Errors
    ///
    /// [`AnalyticsError::InvalidConfig`] if a parsed value is out of range.
    pub fn from_env() -> AnalyticsResult<Self> {
        Self::new(AnalyticsConfig::from_env())
    }
}

impl<C: Clock> Analytics<C> {
    /// Creates a facade whose cache reads time from `clock`.
    ///
    /// # Errors
    ///
    /// [`AnalyticsError::InvalidConfig`] if the configuration does not validate.
    pub fn with_clock(config: AnalyticsConfig, clock: C) -> AnalyticsResult<Self> {
        config.validate()?;
        let cache = CoercionCache::with_clock(config.cache_ttl(), clock);
        Ok(Self { config, cache })
    }

    /// Returns the active configuration
    pub const fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    /// Returns the coercion cache
    pub const fn cache(&self) -> &CoercionCache<C> {
        &self.cache
    }

    /// Returns the coercion cache for purging or invalidation
    pub fn cache_mut(&mut self) -> &mut CoercionCache<C> {
        &mut self.cache
    }

    /// Summary statistics of a column
    pub fn describe(&mut self, dataset: &Dataset, column: &str) -> Summary {
        summarize_sorted(&sorted_present(&self.cache.numeric(dataset, column)))
    }

    /// Quartiles and IQR of a column
    pub fn percentiles(&mut self, dataset: &Dataset, column: &str) -> Percentiles {
        percentiles_sorted(&sorted_present(&self.cache.numeric(dataset, column)))
    }

    /// Z-score outlier flags at the configured threshold
    pub fn outliers_z(&mut self, dataset: &Dataset, column: &str) -> Mask {
        zscore_mask(&self.cache.numeric(dataset, column), dataset.len(), self.config.z_threshold)
    }

    /// Tukey fence outlier flags at the configured multiplier
    pub fn outliers_iqr(&mut self, dataset: &Dataset, column: &str) -> Mask {
        iqr_mask(&self.cache.numeric(dataset, column), dataset.len(), self.config.iqr_k)
    }

    /// Correlation matrix with the configured method
    ///
    /// # Errors
    ///
    /// See [`Analytics::correlation_with`].
    pub fn correlation(&self, dataset: &Dataset) -> AnalyticsResult<CorrelationMatrix> {
        self.correlation_with(dataset, self.config.corr_method)
    }

    /// Correlation matrix with an explicit method.
    ///
    /// # Errors
    ///
    /// [`AnalyticsError::TooManyRows`] for Kendall correlation over more rows
    /// than `max_rows`.
    pub fn correlation_with(&self, dataset: &Dataset, method: CorrelationMethod) -> AnalyticsResult<CorrelationMatrix> {
        if method == CorrelationMethod::Kendall && dataset.len() > self.config.max_rows {
            return Err(AnalyticsError::TooManyRows {
                rows: dataset.len(),
                limit: self.config.max_rows,
            });
        }
        Ok(correlation_matrix(dataset, method))
    }

    /// Series at the configured frequency and aggregation
    pub fn series(&mut self, dataset: &Dataset, date_column: &str, value_column: &str) -> AggregatedSeries {
        self.series_at(dataset, date_column, value_column, self.config.frequency)
    }

    fn series_at(
        &mut self,
        dataset: &Dataset,
        date_column: &str,
        value_column: &str,
        frequency: Frequency,
    ) -> AggregatedSeries {
        let dates = self.cache.temporal(dataset, date_column);
        let values = self.cache.numeric(dataset, value_column);
        aggregate_views(&dates, &values, frequency, self.config.aggregation)
    }

    /// Simple moving average over the configured window
    ///
    /// # Errors
    ///
    /// [`AnalyticsError::InvalidParameter`] only if the window was zeroed
    /// after validation.
    pub fn sma(&mut self, dataset: &Dataset, date_column: &str, value_column: &str) -> AnalyticsResult<Vec<SmoothedPoint>> {
        sma(&self.series(dataset, date_column, value_column), self.config.rolling_window)
    }

    /// Exponential moving average over the configured span
    ///
    /// # Errors
    ///
    /// [`AnalyticsError::InvalidParameter`] only if the span was zeroed after
    /// validation.
    pub fn ema(&mut self, dataset: &Dataset, date_column: &str, value_column: &str) -> AnalyticsResult<Vec<SmoothedPoint>> {
        ema(&self.series(dataset, date_column, value_column), self.config.ema_span)
    }

    /// Month-over-month growth
    pub fn growth(&mut self, dataset: &Dataset, date_column: &str, value_column: &str) -> Vec<GrowthPoint> {
        growth(&self.series_at(dataset, date_column, value_column, Frequency::Monthly))
    }

    /// Compound annual growth rate in percent
    pub fn cagr(&mut self, dataset: &Dataset, date_column: &str, value_column: &str) -> Option<f64> {
        compound_growth_rate(&self.series_at(dataset, date_column, value_column, Frequency::Monthly))
    }

    /// Linear trend at the configured frequency
    pub fn trend(&mut self, dataset: &Dataset, date_column: &str, value_column: &str) -> LinearTrend {
        trend(&self.series(dataset, date_column, value_column))
    }

    /// Guesses the date column using the configured name hints
    pub fn guess_date_column(&self, dataset: &Dataset) -> Option<String> {
        guess_date_column(dataset, &self.config.date_hints)
    }
}
