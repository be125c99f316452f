use core::{fmt, str::FromStr};

use ahash::RandomState;
use hashbrown::HashSet;
use log::debug;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::{
    AnalyticsError, Dataset,
    coerce::{NumericView, numeric_columns},
    helper::{average_ranks, kbn_sum},
};

/// Correlation coefficient to compute between column pairs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorrelationMethod {
    /// Linear (product-moment) correlation
    #[default]
    Pearson,
    /// Pearson correlation of average ranks
    Spearman,
    /// Kendall's tau-b, quadratic in the number of rows
    Kendall,
}

impl CorrelationMethod {
    /// Lower-case name of the method
    pub const fn as_str(&self) -> &'static str {
        match self {
            CorrelationMethod::Pearson => "pearson",
            CorrelationMethod::Spearman => "spearman",
            CorrelationMethod::Kendall => "kendall",
        }
    }
}

impl fmt::Display for CorrelationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CorrelationMethod {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pearson" => Ok(CorrelationMethod::Pearson),
            "spearman" => Ok(CorrelationMethod::Spearman),
            "kendall" => Ok(CorrelationMethod::Kendall),
            _ => Err(AnalyticsError::UnknownMethod(s.to_owned())),
        }
    }
}

/// Square, symmetric matrix of pairwise correlations.
///
/// Rows and columns share the same labels, in dataset order. The diagonal is
/// always 1; an off-diagonal entry is `None` when its pair has fewer than two
/// complete observations or no variance within them.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CorrelationMatrix {
    columns: Vec<String>,
    values: Vec<Option<f64>>,
}

impl CorrelationMatrix {
    /// Returns the column labels
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns the number of rows (and columns)
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns true for a matrix without columns
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Returns the coefficient at a position
    pub fn at(&self, row: usize, col: usize) -> Option<f64> {
        let n = self.len();
        if row >= n || col >= n {
            return None;
        }
        self.values[row * n + col]
    }

    /// Returns the coefficient between two named columns
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.position(a)?;
        let j = self.position(b)?;
        self.at(i, j)
    }

    /// Iterates the matrix row by row
    pub fn rows(&self) -> impl Iterator<Item = (&str, &[Option<f64>])> + '_ {
        let n = self.len().max(1);
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.chunks(n))
    }

    fn position(&self, name: &str) -> Option<usize> {
        let name = crate::dataset::normalize_column_name(name);
        self.columns.iter().position(|c| *c == name)
    }
}

/// Builds the correlation matrix of every numeric-coercible column.
///
/// A column takes part only if it has at least two numeric values and at
/// least two distinct ones; constant and sparse columns are left out rather
/// than filling the matrix with undefined entries. With no qualifying column
/// the matrix is empty.
///
/// [`CorrelationMethod::Kendall`] is O(n²) per column pair; callers working
/// with large datasets should cap the row count first (the
/// [`crate::Analytics`] facade does).
///
/// # Examples
///
/// ```
/// use tabular_stats::{CorrelationMethod, Dataset, correlation_matrix};
///
/// let ds = Dataset::from_columns([
///     ("x", vec![1.0.into(), 2.0.into(), 3.0.into()]),
///     ("y", vec![2.0.into(), 4.0.into(), 6.5.into()]),
///     ("flat", vec![7.0.into(), 7.0.into(), 7.0.into()]),
/// ]);
/// let m = correlation_matrix(&ds, CorrelationMethod::Spearman);
/// assert_eq!(m.columns(), ["x", "y"]);
/// assert_eq!(m.get("x", "y"), Some(1.0));
/// ```
pub fn correlation_matrix(dataset: &Dataset, method: CorrelationMethod) -> CorrelationMatrix {
    let candidates = numeric_columns(dataset);
    let (included, excluded): (Vec<_>, Vec<_>) = candidates.into_iter().partition(|(_, view)| qualifies(view));
    if !excluded.is_empty() {
        debug!(
            "correlation: excluding columns without spread {:?}",
            excluded.iter().map(|(name, _)| name.as_str()).collect::<Vec<_>>()
        );
    }

    let n = included.len();
    let mut values = vec![None; n * n];
    for i in 0..n {
        values[i * n + i] = Some(1.0);
        for j in (i + 1)..n {
            let r = pair_correlation(&included[i].1, &included[j].1, method);
            values[i * n + j] = r;
            values[j * n + i] = r;
        }
    }

    CorrelationMatrix {
        columns: included.into_iter().map(|(name, _)| name).collect(),
        values,
    }
}

fn qualifies(view: &NumericView) -> bool {
    let mut distinct: HashSet<OrderedFloat<f64>, RandomState> = HashSet::with_hasher(RandomState::default());
    let mut count = 0;
    for v in view.iter().flatten() {
        count += 1;
        distinct.insert(OrderedFloat(*v));
    }
    count >= 2 && distinct.len() >= 2
}

/// Correlates two aligned views over the rows where both are present
pub fn pair_correlation(x: &[Option<f64>], y: &[Option<f64>], method: CorrelationMethod) -> Option<f64> {
    let (xs, ys): (Vec<f64>, Vec<f64>) = x
        .iter()
        .zip(y.iter())
        .filter_map(|(a, b)| a.zip(*b))
        .unzip();
    match method {
        CorrelationMethod::Pearson => pearson(&xs, &ys),
        CorrelationMethod::Spearman => spearman(&xs, &ys),
        CorrelationMethod::Kendall => kendall(&xs, &ys),
    }
}

/// Pearson's r, `None` below two pairs or without variance on either side
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    let n = x.len().min(y.len());
    if n < 2 {
        return None;
    }
    let (x, y) = (&x[..n], &y[..n]);
    let mean_x = kbn_sum(x.iter().copied()) / n as f64;
    let mean_y = kbn_sum(y.iter().copied()) / n as f64;

    let cov = kbn_sum(x.iter().zip(y).map(|(a, b)| (a - mean_x) * (b - mean_y)));
    let ss_x = kbn_sum(x.iter().map(|a| (a - mean_x) * (a - mean_x)));
    let ss_y = kbn_sum(y.iter().map(|b| (b - mean_y) * (b - mean_y)));
    if ss_x <= 0.0 || ss_y <= 0.0 {
        return None;
    }
    let r = cov / (ss_x * ss_y).sqrt();
    r.is_finite().then_some(r.clamp(-1.0, 1.0))
}

/// Spearman's rho: Pearson's r over average ranks
pub fn spearman(x: &[f64], y: &[f64]) -> Option<f64> {
    let n = x.len().min(y.len());
    pearson(&average_ranks(&x[..n]), &average_ranks(&y[..n]))
}

/// Kendall's tau-b, corrected for ties on either side
pub fn kendall(x: &[f64], y: &[f64]) -> Option<f64> {
    let n = x.len().min(y.len());
    if n < 2 {
        return None;
    }
    let (mut concordant, mut discordant) = (0_u64, 0_u64);
    let (mut tied_x, mut tied_y) = (0_u64, 0_u64);
    for i in 0..n {
        for j in (i + 1)..n {
            let dx = x[i] - x[j];
            let dy = y[i] - y[j];
            match (dx == 0.0, dy == 0.0) {
                (true, true) => {}
                (true, false) => tied_x += 1,
                (false, true) => tied_y += 1,
                (false, false) if (dx > 0.0) == (dy > 0.0) => concordant += 1,
                (false, false) => discordant += 1,
            }
        }
    }
    let untied = (concordant + discordant) as f64;
    let denom = ((untied + tied_x as f64) * (untied + tied_y as f64)).sqrt();
    if denom == 0.0 {
        return None;
    }
    Some((concordant as f64 - discordant as f64) / denom)
}
