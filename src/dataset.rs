use core::sync::atomic::{AtomicU64, Ordering};

use ahash::RandomState;
use chrono::{NaiveDate, NaiveDateTime};
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::{AnalyticsError, AnalyticsResult};

static NEXT_DATASET_ID: AtomicU64 = AtomicU64::new(1);

/// A single cell of a dataset.
///
/// Columns are not typed: a provider reading CSV or documents hands over
/// whatever it found, and the coercion layer decides what each cell means.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Value {
    /// Empty cell
    #[default]
    Missing,
    /// Free text, possibly a number or date in disguise
    Text(String),
    /// Whole number
    Integer(i64),
    /// Floating-point number
    Float(f64),
    /// Boolean flag
    Boolean(bool),
    /// Date and time without zone
    Timestamp(NaiveDateTime),
}

impl Value {
    /// Returns true for an explicit absence of value
    pub const fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v.into())
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::Timestamp(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Timestamp(v.and_time(chrono::NaiveTime::MIN))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Missing, Into::into)
    }
}

/// Process-unique identity of a dataset, used to key cached column views.
///
/// Every construction (including [`Dataset::filter`]) and every
/// [`Dataset::push_row`] draws a fresh id, while clones share theirs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DatasetId(u64);

impl DatasetId {
    fn next() -> Self {
        Self(NEXT_DATASET_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Trims and lower-cases a column name
pub fn normalize_column_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// An append-only, row-ordered table of loosely typed cells.
///
/// Rows are stored aligned to the column list; a row's ordinal position is its
/// identity, so masks computed over a dataset line up with its rows.
#[derive(Debug, Clone)]
pub struct Dataset {
    id: DatasetId,
    columns: Vec<String>,
    index: HashMap<String, usize, RandomState>,
    /// Column receiving each positional header cell, `None` for a duplicate header
    slots: Vec<Option<usize>>,
    rows: Vec<Vec<Value>>,
}

impl Dataset {
    /// Creates an empty dataset with the given header.
    ///
    /// Duplicate column names (after normalisation) collapse onto the first
    /// occurrence; cells pushed under a later duplicate are dropped.
    ///
    /// # Examples
    ///
    /// ```
    /// use tabular_stats::{Dataset, Value};
    ///
    /// let mut ds = Dataset::new(["id", "Balance"]);
    /// ds.push_row(vec![1_i64.into(), 10.5.into()]);
    /// ds.push_row(vec![2_i64.into()]);
    /// assert_eq!(ds.len(), 2);
    /// assert_eq!(ds.value(1, "balance"), Some(&Value::Missing));
    /// ```
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut dataset = Self {
            id: DatasetId::next(),
            columns: Vec::new(),
            index: HashMap::with_hasher(RandomState::default()),
            slots: Vec::new(),
            rows: Vec::new(),
        };
        for name in columns {
            let before = dataset.columns.len();
            let i = dataset.intern(name.as_ref());
            dataset.slots.push((i == before).then_some(i));
        }
        dataset
    }

    /// Returns the position of a column, registering it if unseen
    fn intern(&mut self, name: &str) -> usize {
        let name = normalize_column_name(name);
        if let Some(&i) = self.index.get(&name) {
            return i;
        }
        let i = self.columns.len();
        self.index.insert(name.clone(), i);
        self.columns.push(name);
        i
    }

    /// Appends a row of cells given in header order.
    ///
    /// Short rows are padded with [`Value::Missing`]; surplus cells are
    /// dropped. The dataset takes a fresh [`DatasetId`], so views cached for
    /// its previous contents are never reused.
    pub fn push_row(&mut self, cells: Vec<Value>) {
        let mut row = vec![Value::Missing; self.columns.len()];
        for (slot, cell) in self.slots.iter().zip(cells) {
            if let Some(i) = *slot {
                row[i] = cell;
            }
        }
        self.rows.push(row);
        self.id = DatasetId::next();
    }

    /// Builds a dataset from a header and positional rows, as
    /// [`Dataset::new`] followed by [`Dataset::push_row`] for every row.
    pub fn from_rows<I, S>(columns: I, rows: Vec<Vec<Value>>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut dataset = Self::new(columns);
        dataset.rows.reserve(rows.len());
        for cells in rows {
            dataset.push_row(cells);
        }
        dataset
    }

    /// Builds a dataset from records of `(column, value)` pairs.
    ///
    /// The column set is the union of all record keys in first-seen order;
    /// cells a record does not mention are missing. A key repeated within one
    /// record keeps its first value.
    ///
    /// # Examples
    ///
    /// ```
    /// use tabular_stats::{Dataset, Value};
    ///
    /// let ds = Dataset::from_records([
    ///     vec![("Name", Value::from("ana")), ("Balance", Value::from(10.5))],
    ///     vec![("name", Value::from("luis"))],
    /// ]);
    /// assert_eq!(ds.columns(), ["name", "balance"]);
    /// assert_eq!(ds.value(1, "balance"), Some(&Value::Missing));
    /// ```
    pub fn from_records<R, K>(records: impl IntoIterator<Item = R>) -> Self
    where
        R: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        let mut dataset = Self::new(core::iter::empty::<&str>());
        let mut rows: Vec<Vec<(usize, Value)>> = Vec::new();
        for record in records {
            let cells = record
                .into_iter()
                .map(|(k, v)| (dataset.intern(k.as_ref()), v))
                .collect();
            rows.push(cells);
        }

        let width = dataset.columns.len();
        dataset.slots = (0..width).map(Some).collect();
        dataset.rows = rows
            .into_iter()
            .map(|cells| {
                let mut row = vec![Value::Missing; width];
                let mut seen = vec![false; width];
                for (i, v) in cells {
                    if !seen[i] {
                        seen[i] = true;
                        row[i] = v;
                    }
                }
                row
            })
            .collect();
        dataset
    }

    /// Builds a dataset from named columns.
    ///
    /// Shorter columns are padded with missing cells up to the longest one.
    /// Like [`Dataset::new`], a duplicate column name keeps its first column.
    pub fn from_columns<I, K>(columns: I) -> Self
    where
        I: IntoIterator<Item = (K, Vec<Value>)>,
        K: AsRef<str>,
    {
        let columns: Vec<(K, Vec<Value>)> = columns.into_iter().collect();
        let mut dataset = Self::new(columns.iter().map(|(k, _)| k.as_ref()));
        let height = columns.iter().map(|(_, c)| c.len()).max().unwrap_or(0);
        let width = dataset.columns.len();
        let mut rows = vec![vec![Value::Missing; width]; height];
        for (slot, (_, cells)) in dataset.slots.iter().zip(columns) {
            let Some(col) = *slot else {
                continue;
            };
            for (row, cell) in rows.iter_mut().zip(cells) {
                row[col] = cell;
            }
        }
        dataset.rows = rows;
        dataset
    }

    /// Returns the identity of this dataset
    pub const fn id(&self) -> DatasetId {
        self.id
    }

    /// Returns the number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true when the dataset holds no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the normalised column names in order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns the position of a column
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.index.get(&normalize_column_name(name)).copied()
    }

    /// Returns true if the dataset has the named column
    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Iterates the cells of a column in row order, `None` if the column is absent
    pub fn column(&self, name: &str) -> Option<impl Iterator<Item = &Value> + '_> {
        let col = self.column_index(name)?;
        Some(self.rows.iter().map(move |row| &row[col]))
    }

    /// Returns a single cell
    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let col = self.column_index(column)?;
        self.rows.get(row).map(|r| &r[col])
    }

    /// Iterates `(column, value)` pairs of a row
    pub fn row(&self, row: usize) -> Option<impl Iterator<Item = (&str, &Value)> + '_> {
        let cells = self.rows.get(row)?;
        Some(self.columns.iter().map(String::as_str).zip(cells.iter()))
    }

    /// Returns a new dataset keeping the rows where `mask` is true.
    ///
    /// # Errors
    ///
    /// [`AnalyticsError::MaskLength`] if the mask is not one entry per row.
    pub fn filter(&self, mask: &[bool]) -> AnalyticsResult<Dataset> {
        let rows = self.selected_rows(mask)?;
        Ok(Self {
            id: DatasetId::next(),
            columns: self.columns.clone(),
            index: self.index.clone(),
            slots: self.slots.clone(),
            rows: rows.into_iter().map(|i| self.rows[i].clone()).collect(),
        })
    }

    /// Returns the ordinals of the rows where `mask` is true, so a filtered
    /// view can be mapped back onto this dataset.
    pub fn selected_rows(&self, mask: &[bool]) -> AnalyticsResult<Vec<usize>> {
        if mask.len() != self.len() {
            return Err(AnalyticsError::MaskLength {
                expected: self.len(),
                actual: mask.len(),
            });
        }
        Ok(mask
            .iter()
            .enumerate()
            .filter_map(|(i, &keep)| keep.then_some(i))
            .collect())
    }
}
