use crate::{
    AggregatedSeries, AnalyticsResult, Dataset,
    error::ensure_positive,
    rolling::SmoothedPoint,
    time_series::{Aggregation, Frequency, aggregate},
};

/// Recursive exponential moving average with `alpha = 2 / (span + 1)`.
///
/// Seeded by the first present observation; no bias adjustment is applied.
/// A missing observation leaves the average unchanged but ages it, so the
/// next present value is weighed against `(1 - alpha)^(gap + 1)` instead of
/// `1 - alpha`.
#[derive(Debug, Clone)]
pub struct ExponentialMean {
    /// Smoothing factor
    alpha: f64,
    /// Current average
    value: Option<f64>,
    /// Weight carried by the current average
    old_weight: f64,
}

impl ExponentialMean {
    /// Creates a new `ExponentialMean` for the given span.
    ///
    /// # Errors
    ///
    /// [`crate::AnalyticsError::InvalidParameter`] if `span` is zero.
    pub fn new(span: usize) -> AnalyticsResult<Self> {
        ensure_positive("span", span)?;
        Ok(Self {
            alpha: 2.0 / (span as f64 + 1.0),
            value: None,
            old_weight: 1.0,
        })
    }

    /// Returns the smoothing factor
    pub const fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Folds the next observation into the average
    ///
    /// # Returns
    ///
    /// * `&mut Self` - The exponential mean object
    pub fn next(&mut self, value: Option<f64>) -> &mut Self {
        match (self.value, value) {
            (None, Some(v)) => {
                self.value = Some(v);
                self.old_weight = 1.0;
            }
            (None, None) => {}
            (Some(current), observed) => {
                self.old_weight *= 1.0 - self.alpha;
                if let Some(v) = observed {
                    let blended = (self.old_weight * current + self.alpha * v) / (self.old_weight + self.alpha);
                    self.value = Some(blended);
                    self.old_weight = 1.0;
                }
            }
        }
        self
    }

    /// Returns the current average, `None` before the first observation
    pub const fn mean(&self) -> Option<f64> {
        self.value
    }
}

/// Exponential moving average of an aggregated series
///
/// # Errors
///
/// [`crate::AnalyticsError::InvalidParameter`] if `span` is zero.
pub fn ema(series: &AggregatedSeries, span: usize) -> AnalyticsResult<Vec<SmoothedPoint>> {
    let mut rolling = ExponentialMean::new(span)?;
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

/// Aggregates `(date, value)` columns and smooths them with an exponential
/// moving average of the given span.
///
/// # Errors
///
/// [`crate::AnalyticsError::InvalidParameter`] if `span` is zero.
pub fn rolling_ema(
    dataset: &Dataset,
    date_column: &str,
    value_column: &str,
    span: usize,
    frequency: Frequency,
    aggregation: Aggregation,
) -> AnalyticsResult<Vec<SmoothedPoint>> {
    ensure_positive("span", span)?;
    let series = aggregate(dataset, date_column, value_column, frequency, aggregation);
    ema(&series, span)
}

#[cfg(test)]
mod tests {
    use assert_approx_eq::assert_approx_eq;

    use super::*;
    use crate::{AnalyticsError, Value};

    #[test]
    fn ema_works() {
        let mut stats = ExponentialMean::new(3).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(stats.alpha(), 0.5);
        let inputs = [10.0, 20.0, 30.0, 10.0];
        let mut results = vec![];
        inputs.iter().for_each(|i| {
            if let Some(v) = stats.next(Some(*i)).mean() {
                results.push(v)
            }
        });
        let expected: [f64; 4] = [10.0, 15.0, 22.5, 16.25];
        for (i, e) in expected.iter().enumerate() {
            assert_approx_eq!(e, results[i], 1e-12);
        }
    }

    #[test]
    fn gaps_age_the_average() {
        let mut stats = ExponentialMean::new(3).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(stats.next(None).mean(), None);
        assert_eq!(stats.next(Some(10.0)).mean(), Some(10.0));
        assert_eq!(stats.next(None).mean(), Some(10.0));
        // old weight 0.25 against alpha 0.5
        let v = stats.next(Some(40.0)).mean().unwrap_or_default();
        assert_approx_eq!(v, (0.25 * 10.0 + 0.5 * 40.0) / 0.75, 1e-12);
    }

    #[test]
    fn span_of_one_tracks_the_series() {
        let mut stats = ExponentialMean::new(1).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(stats.next(Some(3.0)).mean(), Some(3.0));
        assert_eq!(stats.next(Some(7.0)).mean(), Some(7.0));
    }

    #[test]
    fn zero_span_is_rejected() {
        let ds = Dataset::from_columns([("d", vec![Value::Missing])]);
        assert!(matches!(
            rolling_ema(&ds, "d", "v", 0, Frequency::Monthly, Aggregation::Sum),
            Err(AnalyticsError::InvalidParameter { name: "span", .. })
        ));
    }

    #[test]
    fn rolling_ema_over_months() {
        let ds = Dataset::from_columns([
            ("date", vec!["2024-01-15".into(), "2024-02-15".into(), "2024-02-20".into()]),
            ("amount", vec![100.0.into(), 50.0.into(), 50.0.into()]),
        ]);
        let out = rolling_ema(&ds, "date", "amount", 3, Frequency::Monthly, Aggregation::Sum)
            .unwrap_or_default();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].smoothed, Some(100.0));
        assert_eq!(out[1].value, Some(100.0));
        assert_eq!(out[1].smoothed, Some(100.0));
    }
}
