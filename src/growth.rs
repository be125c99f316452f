use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::{
    AggregatedSeries, Dataset,
    time_series::{Aggregation, Frequency, aggregate},
};

/// Change of one period against the previous one
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GrowthPoint {
    /// First day of the period
    pub period: NaiveDate,
    /// Aggregated value of the period
    pub value: Option<f64>,
    /// `value - previous`, undefined if either side is missing
    pub abs_change: Option<f64>,
    /// `(value / previous - 1) * 100`, undefined unless the previous value is positive
    pub pct_change: Option<f64>,
}

/// Period-over-period change of an aggregated series
pub fn growth(series: &AggregatedSeries) -> Vec<GrowthPoint> {
    let mut previous: Option<f64> = None;
    series
        .points()
        .iter()
        .map(|p| {
            let abs_change = p.value.zip(previous).map(|(cur, prev)| cur - prev);
            let pct_change = p
                .value
                .zip(previous.filter(|prev| *prev > 0.0))
                .map(|(cur, prev)| (cur / prev - 1.0) * 100.0);
            previous = p.value;
            GrowthPoint {
                period: p.period,
                value: p.value,
                abs_change,
                pct_change,
            }
        })
        .collect()
}

/// Month-over-month growth of a `(date, value)` column pair.
///
/// The series is always aggregated monthly, whatever frequency other
/// indicators use. The first month has no change.
///
/// # Examples
///
/// ```
/// use assert_approx_eq::assert_approx_eq;
/// use tabular_stats::{Aggregation, Dataset, monthly_growth};
///
/// let ds = Dataset::from_columns([
///     ("date", vec!["2024-01-05".into(), "2024-02-10".into(), "2024-03-01".into()]),
///     ("amount", vec![100.0.into(), 150.0.into(), 200.0.into()]),
/// ]);
/// let g = monthly_growth(&ds, "date", "amount", Aggregation::Sum);
/// assert_eq!(g[0].pct_change, None);
/// assert_approx_eq!(g[1].pct_change.unwrap_or_default(), 50.0);
/// assert_approx_eq!(g[2].pct_change.unwrap_or_default(), 33.3333, 0.0001);
/// ```
pub fn monthly_growth(
    dataset: &Dataset,
    date_column: &str,
    value_column: &str,
    aggregation: Aggregation,
) -> Vec<GrowthPoint> {
    growth(&aggregate(dataset, date_column, value_column, Frequency::Monthly, aggregation))
}

/// Compound annual growth rate of a series, in percent.
///
/// Uses the first and last periods that carry a value, so leading and
/// trailing gaps are tolerated. The span is measured in whole calendar
/// months with a floor of one month. Undefined with fewer than two valid
/// periods or a non-positive endpoint.
pub fn compound_growth_rate(series: &AggregatedSeries) -> Option<f64> {
    let mut valid = series.valid();
    let (first_period, start) = valid.next()?;
    let (last_period, end) = valid.last()?;
    if start <= 0.0 || end <= 0.0 {
        return None;
    }

    let months = months_between(first_period, last_period).max(1);
    let years = months as f64 / 12.0;
    let rate = (end / start).powf(1.0 / years) - 1.0;
    rate.is_finite().then_some(rate * 100.0)
}

/// Compound annual growth rate of a `(date, value)` column pair, aggregated
/// monthly.
///
/// # Examples
///
/// ```
/// use assert_approx_eq::assert_approx_eq;
/// use tabular_stats::{Aggregation, Dataset, cagr};
///
/// let ds = Dataset::from_columns([
///     ("date", vec!["2023-01-10".into(), "2024-01-10".into()]),
///     ("amount", vec![100.0.into(), 121.0.into()]),
/// ]);
/// assert_approx_eq!(cagr(&ds, "date", "amount", Aggregation::Sum).unwrap_or_default(), 21.0);
/// ```
pub fn cagr(dataset: &Dataset, date_column: &str, value_column: &str, aggregation: Aggregation) -> Option<f64> {
    compound_growth_rate(&aggregate(dataset, date_column, value_column, Frequency::Monthly, aggregation))
}

fn months_between(from: NaiveDate, to: NaiveDate) -> i64 {
    let months = |d: NaiveDate| i64::from(d.year()) * 12 + i64::from(d.month0());
    months(to) - months(from)
}
