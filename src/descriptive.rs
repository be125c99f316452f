use serde::Serialize;

use crate::{
    Dataset,
    coerce::numeric_column,
    helper::{kbn_sum, median_from_sorted_slice, quantile_from_sorted_slice, sample_variance, sorted_present},
};

/// Key statistics of a numeric column.
///
/// Every field is `None` when the column has no numeric values, which keeps
/// "no data" apart from a genuine zero.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Summary {
    /// Number of non-missing values
    pub count: Option<usize>,
    /// Arithmetic mean
    pub mean: Option<f64>,
    /// Median (average of the two middle values for even counts)
    pub median: Option<f64>,
    /// Sample standard deviation (n - 1), zero for a single value
    pub std: Option<f64>,
    /// Smallest value
    pub min: Option<f64>,
    /// Largest value
    pub max: Option<f64>,
    /// Sum of the values
    pub sum: Option<f64>,
}

/// Quartiles and interquartile range of a numeric column
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Percentiles {
    /// First quartile
    pub p25: Option<f64>,
    /// Median
    pub p50: Option<f64>,
    /// Third quartile
    pub p75: Option<f64>,
    /// `p75 - p25`
    pub iqr: Option<f64>,
}

/// Summarises the numeric values of a column.
///
/// Missing and unparseable cells are skipped. A missing column or one with no
/// numeric values gives a summary whose fields are all `None`.
///
/// # Arguments
///
/// * `dataset` - The rows to read
/// * `column` - Column coerced to numbers
///
/// # Returns
///
/// * `Summary` - Count, mean, median, sample std, min, max and sum
///
/// # Examples
///
/// ```
/// use tabular_stats::{Dataset, describe};
///
/// let ds = Dataset::from_columns([("balance", vec![10.0.into(), 20.0.into(), "n/a".into(), 60.0.into()])]);
/// let s = describe(&ds, "balance");
/// assert_eq!(s.count, Some(3));
/// assert_eq!(s.mean, Some(30.0));
/// assert_eq!(s.median, Some(20.0));
/// assert_eq!(s.sum, Some(90.0));
///
/// assert_eq!(describe(&ds, "nope").mean, None);
/// ```
pub fn describe(dataset: &Dataset, column: &str) -> Summary {
    let sorted = sorted_present(&numeric_column(dataset, column));
    summarize_sorted(&sorted)
}

/// Summary of values already sorted ascending
pub(crate) fn summarize_sorted(sorted: &[f64]) -> Summary {
    if sorted.is_empty() {
        return Summary::default();
    }
    let n = sorted.len();
    let sum = kbn_sum(sorted.iter().copied());
    let mean = sum / n as f64;
    let std = if n > 1 {
        sample_variance(sorted, mean).map(f64::sqrt)
    } else {
        Some(0.0)
    };

    Summary {
        count: Some(n),
        mean: Some(mean),
        median: median_from_sorted_slice(sorted),
        std,
        min: sorted.first().copied(),
        max: sorted.last().copied(),
        sum: Some(sum),
    }
}

/// Computes the 25th, 50th and 75th percentiles and the IQR of a column.
///
/// Percentiles interpolate linearly between the closest ranks, so the Tukey
/// fences built from them match the common spreadsheet / dataframe default.
pub fn percentiles_iqr(dataset: &Dataset, column: &str) -> Percentiles {
    let sorted = sorted_present(&numeric_column(dataset, column));
    percentiles_sorted(&sorted)
}

pub(crate) fn percentiles_sorted(sorted: &[f64]) -> Percentiles {
    let p25 = quantile_from_sorted_slice(sorted, 0.25);
    let p50 = quantile_from_sorted_slice(sorted, 0.50);
    let p75 = quantile_from_sorted_slice(sorted, 0.75);
    Percentiles {
        p25,
        p50,
        p75,
        iqr: p25.zip(p75).map(|(q1, q3)| q3 - q1),
    }
}
