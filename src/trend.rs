use serde::Serialize;

use crate::{
    AggregatedSeries, Dataset,
    helper::kbn_sum,
    time_series::{Aggregation, Frequency, aggregate},
};

/// Ordinary least squares fit `value = intercept + slope * index`.
///
/// The index counts the valid periods from zero, which keeps the regression
/// well scaled regardless of the calendar dates involved.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct LinearTrend {
    /// Change in value per period
    pub slope: Option<f64>,
    /// Fitted value at index zero
    pub intercept: Option<f64>,
    /// Coefficient of determination, undefined for a flat series
    pub r2: Option<f64>,
    /// Number of periods the fit used
    pub points: usize,
}

/// Fits a straight line through `values` against their 0-based positions.
///
/// Fewer than two values leave every coefficient undefined.
///
/// # Arguments
///
/// * `values` - Observations in period order
///
/// # Returns
///
/// * `LinearTrend` - Slope, intercept and r²
///
/// # Examples
///
/// ```
/// use tabular_stats::fit_linear;
///
/// let t = fit_linear(&[10.0, 20.0]);
/// assert_eq!(t.slope, Some(10.0));
/// assert_eq!(t.r2, Some(1.0));
/// ```
pub fn fit_linear(values: &[f64]) -> LinearTrend {
    let n = values.len();
    if n < 2 {
        return LinearTrend {
            points: n,
            ..LinearTrend::default()
        };
    }

    let nf = n as f64;
    let mean_x = (nf - 1.0) / 2.0;
    let mean_y = kbn_sum(values.iter().copied()) / nf;

    let sxx = kbn_sum((0..n).map(|i| (i as f64 - mean_x).powi(2)));
    let sxy = kbn_sum(values.iter().enumerate().map(|(i, y)| (i as f64 - mean_x) * (y - mean_y)));
    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;

    let ss_res = kbn_sum(
        values
            .iter()
            .enumerate()
            .map(|(i, y)| (y - (intercept + slope * i as f64)).powi(2)),
    );
    let ss_tot = kbn_sum(values.iter().map(|y| (y - mean_y).powi(2)));
    let r2 = (ss_tot != 0.0).then(|| 1.0 - ss_res / ss_tot);

    LinearTrend {
        slope: Some(slope),
        intercept: Some(intercept),
        r2,
        points: n,
    }
}

/// Linear trend of the valid periods of an aggregated series
pub fn trend(series: &AggregatedSeries) -> LinearTrend {
    let values: Vec<f64> = series.valid().map(|(_, v)| v).collect();
    fit_linear(&values)
}

/// Aggregates a `(date, value)` column pair and fits a linear trend to it.
///
/// Periods without a value are skipped before indexing.
pub fn linear_trend(
    dataset: &Dataset,
    date_column: &str,
    value_column: &str,
    frequency: Frequency,
    aggregation: Aggregation,
) -> LinearTrend {
    trend(&aggregate(dataset, date_column, value_column, frequency, aggregation))
}
