use thiserror::Error;

/// Errors raised at the call boundary for invalid parameters.
///
/// Data-quality problems (missing columns, unparseable cells, degenerate
/// spread) are never errors; they surface as `None`, empty results or
/// all-false masks.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalyticsError {
    /// Correlation method name not recognised
    #[error("Unknown correlation method: {0:?} (expected pearson, spearman or kendall)")]
    UnknownMethod(String),

    /// Grouping frequency code not recognised
    #[error("Unknown frequency: {0:?} (expected D, W or M)")]
    UnknownFrequency(String),

    /// Aggregation name not recognised
    #[error("Unknown aggregation: {0:?} (expected sum, mean or count)")]
    UnknownAggregation(String),

    /// A numeric parameter outside its domain
    #[error("Invalid {name}: {value} ({reason})")]
    InvalidParameter {
        /// Parameter name
        name: &'static str,
        /// Rejected value
        value: String,
        /// Constraint the value breaks
        reason: &'static str,
    },

    /// A row mask that does not line up with the dataset
    #[error("Mask length mismatch: dataset has {expected} rows, mask has {actual}")]
    MaskLength {
        /// Rows in the dataset
        expected: usize,
        /// Entries in the mask
        actual: usize,
    },

    /// Dataset too large for a quadratic computation
    #[error("Too many rows for this computation: {rows} rows (limit {limit})")]
    TooManyRows {
        /// Rows in the dataset
        rows: usize,
        /// Configured ceiling
        limit: usize,
    },

    /// Configuration value that fails validation
    #[error("Invalid configuration value for {key}: {value:?}")]
    InvalidConfig {
        /// Configuration key
        key: &'static str,
        /// Offending value
        value: String,
    },
}

/// Result type for analytics operations
pub type AnalyticsResult<T> = Result<T, AnalyticsError>;

/// Fails unless a period count is at least one
pub(crate) fn ensure_positive(name: &'static str, value: usize) -> AnalyticsResult<()> {
    if value == 0 {
        return Err(AnalyticsError::InvalidParameter {
            name,
            value: value.to_string(),
            reason: "must be at least 1",
        });
    }
    Ok(())
}

/// Fails unless `value` is finite and not below `min` (strictly above when `strict`)
pub(crate) fn ensure_finite_at_least(
    name: &'static str,
    value: f64,
    min: f64,
    strict: bool,
) -> AnalyticsResult<()> {
    let ok = value.is_finite() && if strict { value > min } else { value >= min };
    if !ok {
        return Err(AnalyticsError::InvalidParameter {
            name,
            value: value.to_string(),
            reason: if strict {
                "must be finite and positive"
            } else {
                "must be finite and non-negative"
            },
        });
    }
    Ok(())
}
