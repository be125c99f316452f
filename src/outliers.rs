use crate::{
    AnalyticsResult, Dataset,
    coerce::{NumericView, numeric_column},
    error::ensure_finite_at_least,
    helper::{mean, quantile_from_sorted_slice, sample_variance, sorted_present},
};

/// One flag per dataset row
pub type Mask = Vec<bool>;

/// Flags rows whose absolute Z-score exceeds `threshold`.
///
/// The mean and sample standard deviation come from the non-missing values.
/// The mask always has one entry per row of `dataset`; missing or unparseable
/// cells are never flagged. When the spread is zero or undefined (fewer than
/// two values, a constant column, an absent column) every flag is false.
///
/// # Errors
///
/// [`crate::AnalyticsError::InvalidParameter`] if `threshold` is not a
/// finite positive number.
///
/// # Examples
///
/// ```
/// use tabular_stats::{Dataset, flag_outliers_z};
///
/// let ds = Dataset::from_columns([("balance", vec![10.0.into(), 20.0.into(), 30.0.into(), 40.0.into(), 1000.0.into()])]);
/// let mask = flag_outliers_z(&ds, "balance", 1.5)?;
/// assert_eq!(mask, [false, false, false, false, true]);
/// # Ok::<(), tabular_stats::AnalyticsError>(())
/// ```
pub fn flag_outliers_z(dataset: &Dataset, column: &str, threshold: f64) -> AnalyticsResult<Mask> {
    ensure_finite_at_least("threshold", threshold, 0.0, true)?;
    Ok(zscore_mask(&numeric_column(dataset, column), dataset.len(), threshold))
}

pub(crate) fn zscore_mask(view: &NumericView, rows: usize, threshold: f64) -> Mask {
    let present: Vec<f64> = view.iter().flatten().copied().collect();
    let Some(mu) = mean(&present) else {
        return vec![false; rows];
    };
    let sigma = sample_variance(&present, mu).map(f64::sqrt);
    let Some(sigma) = sigma.filter(|s| s.is_finite() && *s > 0.0 && mu.is_finite()) else {
        return vec![false; rows];
    };

    aligned(view, rows, |x| ((x - mu) / sigma).abs() > threshold)
}

/// Flags rows outside the Tukey fences `[Q1 - k·IQR, Q3 + k·IQR]`.
///
/// Quartiles use linear interpolation over the non-missing values. Missing
/// cells are never flagged, and a zero or undefined IQR flags nothing.
///
/// # Errors
///
/// [`crate::AnalyticsError::InvalidParameter`] if `k` is negative or not
/// finite.
pub fn flag_outliers_iqr(dataset: &Dataset, column: &str, k: f64) -> AnalyticsResult<Mask> {
    ensure_finite_at_least("k", k, 0.0, false)?;
    Ok(iqr_mask(&numeric_column(dataset, column), dataset.len(), k))
}

pub(crate) fn iqr_mask(view: &NumericView, rows: usize, k: f64) -> Mask {
    let sorted = sorted_present(view);
    let q1 = quantile_from_sorted_slice(&sorted, 0.25);
    let q3 = quantile_from_sorted_slice(&sorted, 0.75);
    let Some((q1, q3)) = q1.zip(q3) else {
        return vec![false; rows];
    };
    let iqr = q3 - q1;
    if !iqr.is_finite() || iqr == 0.0 {
        return vec![false; rows];
    }

    let low = q1 - k * iqr;
    let high = q3 + k * iqr;
    aligned(view, rows, |x| x < low || x > high)
}

// A view shorter than the dataset (absent column) leaves the tail unflagged.
fn aligned(view: &NumericView, rows: usize, flag: impl Fn(f64) -> bool) -> Mask {
    (0..rows)
        .map(|i| view.get(i).copied().flatten().is_some_and(&flag))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AnalyticsError, Value};

    fn dataset(values: Vec<Value>) -> Dataset {
        Dataset::from_columns([("balance", values)])
    }

    fn floats(values: &[f64]) -> Dataset {
        dataset(values.iter().map(|v| Value::from(*v)).collect())
    }

    #[test]
    fn zscore_mask_is_full_length() {
        let ds = dataset(vec![1_i64.into(), Value::Missing, "x".into(), 4_i64.into()]);
        assert_eq!(flag_outliers_z(&ds, "balance", 3.0).map(|m| m.len()), Ok(4));
        assert_eq!(flag_outliers_z(&ds, "absent", 3.0), Ok(vec![false; 4]));
    }

    #[test]
    fn zscore_flags_extreme_value() {
        let ds = floats(&[10.0, 20.0, 30.0, 40.0, 1000.0, 10.0, 20.0, 30.0, 40.0, 20.0, 30.0, 10.0]);
        let mask = flag_outliers_z(&ds, "balance", 3.0).unwrap_or_default();
        let flagged: Vec<usize> = mask.iter().enumerate().filter_map(|(i, f)| f.then_some(i)).collect();
        assert_eq!(flagged, vec![4]);
    }

    #[test]
    fn zscore_with_five_rows_keeps_large_value_below_three_sigma() {
        // with n = 5 the sample z-score of a single extreme value is bounded by (n-1)/sqrt(n) ≈ 1.79
        let ds = floats(&[10.0, 20.0, 30.0, 40.0, 1000.0]);
        assert_eq!(flag_outliers_z(&ds, "balance", 3.0), Ok(vec![false; 5]));
        assert_eq!(
            flag_outliers_z(&ds, "balance", 1.7),
            Ok(vec![false, false, false, false, true])
        );
    }

    #[test]
    fn zscore_zero_spread_flags_nothing() {
        assert_eq!(flag_outliers_z(&floats(&[5.0, 5.0, 5.0]), "balance", 0.5), Ok(vec![false; 3]));
        assert_eq!(flag_outliers_z(&floats(&[5.0]), "balance", 0.5), Ok(vec![false]));
        let empty = dataset(vec![Value::Missing, Value::Missing]);
        assert_eq!(flag_outliers_z(&empty, "balance", 3.0), Ok(vec![false, false]));
    }

    #[test]
    fn zscore_missing_rows_never_flagged() {
        let ds = dataset(vec![1.0.into(), Value::Missing, 1.0.into(), 1.0.into(), 50.0.into(), Value::Missing]);
        let mask = flag_outliers_z(&ds, "balance", 1.0).unwrap_or_default();
        assert_eq!(mask, vec![false, false, false, false, true, false]);
    }

    #[test]
    fn zscore_rejects_bad_threshold() {
        let ds = floats(&[1.0, 2.0]);
        assert!(matches!(
            flag_outliers_z(&ds, "balance", 0.0),
            Err(AnalyticsError::InvalidParameter { name: "threshold", .. })
        ));
        assert!(flag_outliers_z(&ds, "balance", f64::NAN).is_err());
    }

    #[test]
    fn iqr_no_outliers_in_tight_column() {
        let ds = floats(&[10.0, 12.0, 11.0, 13.0, 12.0]);
        assert_eq!(flag_outliers_iqr(&ds, "balance", 1.5), Ok(vec![false; 5]));
    }

    #[test]
    fn iqr_flags_both_fences() {
        // Q1 = 11, Q3 = 13, IQR = 2, fences [8, 16]
        let ds = floats(&[11.0, 12.0, 13.0, 11.0, 13.0, 12.0, 2.0, 30.0, 12.0]);
        let mask = flag_outliers_iqr(&ds, "balance", 1.5).unwrap_or_default();
        assert_eq!(mask, vec![false, false, false, false, false, false, true, true, false]);
    }

    #[test]
    fn iqr_zero_spread_flags_nothing() {
        let ds = floats(&[4.0, 4.0, 4.0, 4.0, 100.0]);
        // Q1 = Q3 = 4
        assert_eq!(flag_outliers_iqr(&ds, "balance", 1.5), Ok(vec![false; 5]));
        let empty = dataset(vec!["a".into()]);
        assert_eq!(flag_outliers_iqr(&empty, "balance", 1.5), Ok(vec![false]));
    }

    #[test]
    fn iqr_rejects_negative_k() {
        let ds = floats(&[1.0, 2.0]);
        assert!(flag_outliers_iqr(&ds, "balance", -1.0).is_err());
        assert!(flag_outliers_iqr(&ds, "balance", 0.0).is_ok());
    }
}
