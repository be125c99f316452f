//! Best-effort conversion of loosely typed columns into numeric and temporal
//! views.
//!
//! Coercion never fails: a cell that cannot be read as the target type
//! becomes `None` and keeps its row position, so every view is aligned with
//! the dataset it came from. Asking for a column the dataset does not have
//! yields an empty view.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use log::debug;

use crate::{Dataset, Value};

/// Column coerced to numbers, one entry per row
pub type NumericView = Vec<Option<f64>>;

/// Column coerced to naive timestamps, one entry per row
pub type TemporalView = Vec<Option<NaiveDateTime>>;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%d-%m-%Y %H:%M:%S",
    "%d.%m.%Y %H:%M:%S",
];

const OFFSET_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%z"];

// Month-first wins over day-first for ambiguous slash dates.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%d %b %Y",
    "%d %B %Y",
];

/// Parses a dot-decimal number, `None` for empty, unparseable or NaN text
///
/// # Examples
///
/// ```
/// use tabular_stats::coerce::parse_number;
///
/// assert_eq!(parse_number(" 12.5 "), Some(12.5));
/// assert_eq!(parse_number("1e3"), Some(1000.0));
/// assert_eq!(parse_number("12,5"), None);
/// assert_eq!(parse_number(""), None);
/// ```
pub fn parse_number(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    text.parse::<f64>().ok().filter(|v| !v.is_nan())
}

/// Parses a date or date-time written in ISO-8601 or a common locale layout.
///
/// Offsets are dropped, keeping the wall-clock time as written. Date-only
/// inputs land on midnight.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use tabular_stats::coerce::parse_datetime;
///
/// let jan5 = NaiveDate::from_ymd_opt(2024, 1, 5).and_then(|d| d.and_hms_opt(0, 0, 0));
/// assert_eq!(parse_datetime("2024-01-05"), jan5);
/// assert_eq!(parse_datetime("Jan 05, 2024"), jan5);
/// assert_eq!(parse_datetime("not a date"), None);
/// ```
pub fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_local());
    }
    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(text, format) {
            return Some(dt.naive_local());
        }
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt);
        }
    }
    for format in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(text, format) {
            return Some(d.and_time(NaiveTime::MIN));
        }
    }

    // YYYY-MM and compact YYYYMMDD
    let bytes = text.as_bytes();
    if bytes.len() == 7 && bytes[4] == b'-' {
        if let Ok(d) = NaiveDate::parse_from_str(&format!("{text}-01"), "%Y-%m-%d") {
            return Some(d.and_time(NaiveTime::MIN));
        }
    }
    if bytes.len() == 8 && bytes.iter().all(u8::is_ascii_digit) {
        if let Ok(d) = NaiveDate::parse_from_str(text, "%Y%m%d") {
            return Some(d.and_time(NaiveTime::MIN));
        }
    }
    None
}

/// Reads a single cell as a number.
///
/// Integers and floats pass through, booleans count as 1 / 0 and text is
/// parsed with [`parse_number`]. Timestamps and NaN are not numbers.
pub fn to_numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Float(v) if !v.is_nan() => Some(*v),
        Value::Integer(v) => Some(*v as f64),
        Value::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Text(s) => parse_number(s),
        _ => None,
    }
}

/// Reads a single cell as a timestamp
pub fn to_datetime(value: &Value) -> Option<NaiveDateTime> {
    match value {
        Value::Timestamp(ts) => Some(*ts),
        Value::Text(s) => parse_datetime(s),
        _ => None,
    }
}

/// Coerces a named column to numbers; empty if the column is absent
pub fn numeric_column(dataset: &Dataset, column: &str) -> NumericView {
    match dataset.column(column) {
        Some(cells) => cells.map(to_numeric).collect(),
        None => {
            debug!("numeric coercion: column {column:?} not found, using empty view");
            Vec::new()
        }
    }
}

/// Coerces a named column to timestamps; empty if the column is absent
pub fn temporal_column(dataset: &Dataset, column: &str) -> TemporalView {
    match dataset.column(column) {
        Some(cells) => cells.map(to_datetime).collect(),
        None => {
            debug!("temporal coercion: column {column:?} not found, using empty view");
            Vec::new()
        }
    }
}

/// Coerces every column to numbers, keeping those with at least one value
pub fn numeric_columns(dataset: &Dataset) -> Vec<(String, NumericView)> {
    dataset
        .columns()
        .iter()
        .map(|name| (name.clone(), numeric_column(dataset, name)))
        .filter(|(_, view)| view.iter().any(Option::is_some))
        .collect()
}

/// Coerces every column to timestamps, keeping those with at least one value
pub fn temporal_columns(dataset: &Dataset) -> Vec<(String, TemporalView)> {
    dataset
        .columns()
        .iter()
        .map(|name| (name.clone(), temporal_column(dataset, name)))
        .filter(|(_, view)| view.iter().any(Option::is_some))
        .collect()
}

/// Picks the column most likely to hold dates.
///
/// Columns whose name contains one of `hints` are tried first; failing that,
/// the first column with any parseable date wins.
pub fn guess_date_column<S: AsRef<str>>(dataset: &Dataset, hints: &[S]) -> Option<String> {
    let has_dates = |name: &str| {
        dataset
            .column(name)
            .is_some_and(|mut cells| cells.any(|v| to_datetime(v).is_some()))
    };

    let hinted = dataset.columns().iter().filter(|name| {
        hints
            .iter()
            .map(|h| h.as_ref().trim().to_lowercase())
            .any(|h| !h.is_empty() && name.contains(&h))
    });
    hinted
        .chain(dataset.columns().iter())
        .find(|name| has_dates(name))
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(y, m, d).and_then(|date| date.and_hms_opt(h, min, s))
    }

    #[test]
    fn numbers_tolerate_messy_text() {
        assert_eq!(parse_number("42"), Some(42.0));
        assert_eq!(parse_number("-0.5"), Some(-0.5));
        assert_eq!(parse_number("  7 "), Some(7.0));
        assert_eq!(parse_number("nan"), None);
        assert_eq!(parse_number("abc"), None);
        assert_eq!(parse_number("1.000,5"), None);
        assert_eq!(parse_number("inf"), Some(f64::INFINITY));
    }

    #[test]
    fn cell_to_numeric() {
        assert_eq!(to_numeric(&Value::Integer(3)), Some(3.0));
        assert_eq!(to_numeric(&Value::Float(f64::NAN)), None);
        assert_eq!(to_numeric(&Value::Boolean(true)), Some(1.0));
        assert_eq!(to_numeric(&Value::Missing), None);
        assert_eq!(to_numeric(&Value::from("2.5")), Some(2.5));
        let stamp = ts(2024, 1, 1, 0, 0, 0).map(Value::Timestamp).unwrap_or_default();
        assert_eq!(to_numeric(&stamp), None);
    }

    #[test]
    fn datetimes_in_common_layouts() {
        assert_eq!(parse_datetime("2024-03-01T10:20:30"), ts(2024, 3, 1, 10, 20, 30));
        assert_eq!(parse_datetime("2024-03-01 10:20:30.250").map(|d| d.date()), ts(2024, 3, 1, 0, 0, 0).map(|d| d.date()));
        assert_eq!(parse_datetime("2024-03-01T10:20:30Z"), ts(2024, 3, 1, 10, 20, 30));
        assert_eq!(parse_datetime("2024-03-01T10:20:30+02:00"), ts(2024, 3, 1, 10, 20, 30));
        assert_eq!(parse_datetime("2024-03-01 10:20"), ts(2024, 3, 1, 10, 20, 0));
        assert_eq!(parse_datetime("2024/03/01"), ts(2024, 3, 1, 0, 0, 0));
        assert_eq!(parse_datetime("03/01/2024"), ts(2024, 3, 1, 0, 0, 0));
        assert_eq!(parse_datetime("25/12/2024"), ts(2024, 12, 25, 0, 0, 0));
        assert_eq!(parse_datetime("25.12.2024"), ts(2024, 12, 25, 0, 0, 0));
        assert_eq!(parse_datetime("5 March 2024"), ts(2024, 3, 5, 0, 0, 0));
        assert_eq!(parse_datetime("2024-03"), ts(2024, 3, 1, 0, 0, 0));
        assert_eq!(parse_datetime("20240301"), ts(2024, 3, 1, 0, 0, 0));
        assert_eq!(parse_datetime(""), None);
        assert_eq!(parse_datetime("2024-13-45"), None);
    }

    #[test]
    fn views_stay_row_aligned() {
        let ds = Dataset::from_columns([
            ("amount", vec!["10".into(), Value::Missing, "x".into(), 4_i64.into()]),
            ("when", vec!["2024-01-05".into(), "garbage".into(), Value::Missing, "2024-02-01".into()]),
        ]);
        assert_eq!(numeric_column(&ds, "amount"), vec![Some(10.0), None, None, Some(4.0)]);

        let when = temporal_column(&ds, "WHEN");
        assert_eq!(when.len(), 4);
        assert_eq!(when[0], ts(2024, 1, 5, 0, 0, 0));
        assert!(when[1].is_none() && when[2].is_none());
    }

    #[test]
    fn missing_column_gives_empty_view() {
        let ds = Dataset::from_columns([("a", vec![1_i64.into()])]);
        assert!(numeric_column(&ds, "b").is_empty());
        assert!(temporal_column(&ds, "b").is_empty());
    }

    #[test]
    fn column_discovery() {
        let ds = Dataset::from_columns([
            ("name", vec!["ana".into(), "luis".into()]),
            ("balance", vec!["1".into(), "2".into()]),
            ("fecha", vec!["2024-01-01".into(), Value::Missing]),
            ("created_at", vec!["soon".into(), "2024-05-01".into()]),
        ]);
        let numeric: Vec<_> = numeric_columns(&ds).into_iter().map(|(n, _)| n).collect();
        assert_eq!(numeric, vec!["balance"]);

        let temporal: Vec<_> = temporal_columns(&ds).into_iter().map(|(n, _)| n).collect();
        assert_eq!(temporal, vec!["fecha", "created_at"]);

        assert_eq!(guess_date_column(&ds, &["created", "date"]), Some("created_at".to_owned()));
        assert_eq!(guess_date_column(&ds, &["updated"]), Some("fecha".to_owned()));
        assert_eq!(guess_date_column::<&str>(&ds.filter(&[false, false]).unwrap_or_else(|e| panic!("{e}")), &[]), None);
    }
}
