//! Resampling of `(date, value)` column pairs into evenly spaced periods.

use core::{fmt, str::FromStr};
use std::collections::BTreeMap;

use chrono::{Datelike, Days, Months, NaiveDate};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    AnalyticsError, Dataset, Kbn,
    coerce::{NumericView, TemporalView, numeric_column, temporal_column},
};

/// Calendar bucket size of an aggregated series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Frequency {
    /// One period per calendar day
    #[serde(rename = "D")]
    Daily,
    /// One period per ISO week, starting Monday
    #[serde(rename = "W")]
    Weekly,
    /// One period per calendar month, starting on the 1st
    #[default]
    #[serde(rename = "M")]
    Monthly,
}

impl Frequency {
    /// Single-letter code: `D`, `W` or `M`
    pub const fn code(&self) -> &'static str {
        match self {
            Frequency::Daily => "D",
            Frequency::Weekly => "W",
            Frequency::Monthly => "M",
        }
    }

    /// Returns the first day of the period containing `date`
    pub fn period_start(&self, date: NaiveDate) -> NaiveDate {
        match self {
            Frequency::Daily => date,
            Frequency::Weekly => date - Days::new(date.weekday().num_days_from_monday().into()),
            Frequency::Monthly => date.with_day(1).unwrap_or(date),
        }
    }

    /// Returns the start of the period following the one starting at `start`
    pub fn next_period(&self, start: NaiveDate) -> Option<NaiveDate> {
        match self {
            Frequency::Daily => start.succ_opt(),
            Frequency::Weekly => start.checked_add_days(Days::new(7)),
            Frequency::Monthly => start.checked_add_months(Months::new(1)),
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Frequency {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "d" | "daily" => Ok(Frequency::Daily),
            "w" | "weekly" => Ok(Frequency::Weekly),
            "m" | "monthly" => Ok(Frequency::Monthly),
            _ => Err(AnalyticsError::UnknownFrequency(s.to_owned())),
        }
    }
}

/// How the values falling into one period are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    /// Total of the values; missing values add nothing
    #[default]
    Sum,
    /// Mean of the non-missing values
    Mean,
    /// Number of non-missing values
    Count,
}

impl Aggregation {
    /// Lower-case name of the aggregation
    pub const fn as_str(&self) -> &'static str {
        match self {
            Aggregation::Sum => "sum",
            Aggregation::Mean => "mean",
            Aggregation::Count => "count",
        }
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Aggregation {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sum" => Ok(Aggregation::Sum),
            "mean" => Ok(Aggregation::Mean),
            "count" => Ok(Aggregation::Count),
            _ => Err(AnalyticsError::UnknownAggregation(s.to_owned())),
        }
    }
}

/// One period of an aggregated series
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesPoint {
    /// First day of the period
    pub period: NaiveDate,
    /// Aggregated value, `None` when the period has nothing to aggregate
    pub value: Option<f64>,
}

/// An evenly spaced, strictly increasing series of periods.
///
/// Periods without source rows between the first and the last one are kept
/// (with a missing value for sum and mean, zero for count) so that rolling
/// and growth indicators see a regular series.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct AggregatedSeries {
    frequency: Frequency,
    points: Vec<SeriesPoint>,
}

impl AggregatedSeries {
    /// Builds a series from already-aggregated points.
    ///
    /// Points are sorted by period and duplicate periods keep their last
    /// value; no gap filling happens here.
    pub fn from_points(frequency: Frequency, mut points: Vec<SeriesPoint>) -> Self {
        points.sort_by_key(|p| p.period);
        let mut deduped: Vec<SeriesPoint> = Vec::with_capacity(points.len());
        for p in points {
            match deduped.last_mut() {
                Some(last) if last.period == p.period => *last = p,
                _ => deduped.push(p),
            }
        }
        Self {
            frequency,
            points: deduped,
        }
    }

    /// Returns the bucket size
    pub const fn frequency(&self) -> Frequency {
        self.frequency
    }

    /// Returns the number of periods
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns true if the series has no periods
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Returns the periods in order
    pub fn points(&self) -> &[SeriesPoint] {
        &self.points
    }

    /// Returns the value of every period, in order
    pub fn values(&self) -> Vec<Option<f64>> {
        self.points.iter().map(|p| p.value).collect()
    }

    /// Returns the value of the period starting at `period`
    pub fn get(&self, period: NaiveDate) -> Option<f64> {
        self.points
            .binary_search_by_key(&period, |p| p.period)
            .ok()
            .and_then(|i| self.points[i].value)
    }

    /// Iterates the periods that carry a value
    pub fn valid(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.points.iter().filter_map(|p| p.value.map(|v| (p.period, v)))
    }
}

#[derive(Default)]
struct Bucket {
    sum: Kbn<f64>,
    values: usize,
}

/// Resamples a date column and a value column into an evenly spaced series.
///
/// Rows whose date cannot be read are dropped; rows with a date but no
/// numeric value still open their period. No readable date at all (or an
/// absent date column) gives an empty series.
///
/// # Arguments
///
/// * `dataset` - The rows to resample
/// * `date_column` - Column read as timestamps
/// * `value_column` - Column read as numbers
/// * `frequency` - Period length
/// * `aggregation` - How the values of a period are combined
///
/// # Returns
///
/// * `AggregatedSeries` - One point per period from the first to the last, gaps included
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use tabular_stats::{Aggregation, Dataset, Frequency, aggregate};
///
/// let ds = Dataset::from_columns([
///     ("date", vec!["2024-01-05".into(), "2024-01-20".into(), "2024-03-01".into()]),
///     ("amount", vec![100.0.into(), 50.0.into(), 200.0.into()]),
/// ]);
/// let s = aggregate(&ds, "date", "amount", Frequency::Monthly, Aggregation::Sum);
/// assert_eq!(s.values(), [Some(150.0), None, Some(200.0)]);
/// assert_eq!(s.points()[1].period, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap_or_default());
/// ```
pub fn aggregate(
    dataset: &Dataset,
    date_column: &str,
    value_column: &str,
    frequency: Frequency,
    aggregation: Aggregation,
) -> AggregatedSeries {
    let dates = temporal_column(dataset, date_column);
    let values = numeric_column(dataset, value_column);
    aggregate_views(&dates, &values, frequency, aggregation)
}

/// Buckets already coerced, row-aligned date and value views
pub(crate) fn aggregate_views(
    dates: &TemporalView,
    values: &NumericView,
    frequency: Frequency,
    aggregation: Aggregation,
) -> AggregatedSeries {
    let mut buckets: BTreeMap<NaiveDate, Bucket> = BTreeMap::new();
    let mut dropped = 0;
    for (i, date) in dates.iter().enumerate() {
        let Some(date) = date else {
            dropped += 1;
            continue;
        };
        let bucket = buckets.entry(frequency.period_start(date.date())).or_default();
        if let Some(v) = values.get(i).copied().flatten() {
            bucket.sum += v;
            bucket.values += 1;
        }
    }
    if dropped > 0 {
        debug!("aggregate: dropped {dropped} rows without a readable date");
    }

    let (Some(&first), Some(&last)) = (buckets.keys().next(), buckets.keys().next_back()) else {
        return AggregatedSeries {
            frequency,
            points: Vec::new(),
        };
    };

    let mut points = Vec::with_capacity(buckets.len());
    let mut period = Some(first);
    while let Some(p) = period.filter(|p| *p <= last) {
        let value = match (buckets.get(&p), aggregation) {
            (Some(b), Aggregation::Sum) => Some(b.sum.total()),
            (Some(b), Aggregation::Mean) => (b.values > 0).then(|| b.sum.total() / b.values as f64),
            (Some(b), Aggregation::Count) => Some(b.values as f64),
            (None, Aggregation::Count) => Some(0.0),
            (None, _) => None,
        };
        points.push(SeriesPoint { period: p, value });
        period = frequency.next_period(p);
    }

    AggregatedSeries { frequency, points }
}
