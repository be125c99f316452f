use chrono::NaiveDate;
use log::debug;

use crate::{
    Dataset, Value,
    coerce::{numeric_column, temporal_column},
    outliers::Mask,
};

fn absent(dataset: &Dataset, column: &str) -> Mask {
    debug!("row filter: column {column:?} not found, selecting nothing");
    vec![false; dataset.len()]
}

/// Selects the rows whose numeric value lies within `[min, max]`.
///
/// Only the bounds that are set are checked: a row without a numeric value
/// fails a present bound but passes when both bounds are open. An absent
/// column selects nothing.
///
/// # Arguments
///
/// * `dataset` - The rows to filter
/// * `column` - Column read as numbers
/// * `min` - Inclusive lower bound, if any
/// * `max` - Inclusive upper bound, if any
///
/// # Returns
///
/// * `Mask` - One flag per row of `dataset`
///
/// # Examples
///
/// ```
/// use tabular_stats::{Dataset, between_numeric};
///
/// let ds = Dataset::from_columns([("price", vec![5.0.into(), "12".into(), "n/a".into(), 30.0.into()])]);
/// assert_eq!(between_numeric(&ds, "price", Some(10.0), None), [false, true, false, true]);
/// assert_eq!(between_numeric(&ds, "price", None, None), [true; 4]);
/// ```
pub fn between_numeric(dataset: &Dataset, column: &str, min: Option<f64>, max: Option<f64>) -> Mask {
    if !dataset.has_column(column) {
        return absent(dataset, column);
    }
    numeric_column(dataset, column)
        .into_iter()
        .map(|v| within(v, min, max))
        .collect()
}

/// Selects the rows whose timestamp falls on a day within `[min, max]`.
///
/// The upper bound covers the whole of its day, so an evening timestamp on
/// `max` still matches. As with [`between_numeric`], unreadable dates only
/// fail the bounds that are set.
pub fn between_dates(dataset: &Dataset, column: &str, min: Option<NaiveDate>, max: Option<NaiveDate>) -> Mask {
    if !dataset.has_column(column) {
        return absent(dataset, column);
    }
    temporal_column(dataset, column)
        .into_iter()
        .map(|ts| within(ts.map(|ts| ts.date()), min, max))
        .collect()
}

// A missing value only fails the bounds that are set.
fn within<T: PartialOrd>(value: Option<T>, min: Option<T>, max: Option<T>) -> bool {
    let above = min.is_none_or(|lo| value.as_ref().is_some_and(|v| *v >= lo));
    let below = max.is_none_or(|hi| value.as_ref().is_some_and(|v| *v <= hi));
    above && below
}

/// Selects the rows whose cell contains `query`, ignoring case.
///
/// Cells of any type are compared through their text form and missing cells
/// never match. A blank query keeps every row; any other query is matched
/// as given, surrounding spaces included.
pub fn contains_ci(dataset: &Dataset, column: &str, query: &str) -> Mask {
    let Some(cells) = dataset.column(column) else {
        return absent(dataset, column);
    };
    if query.trim().is_empty() {
        return vec![true; dataset.len()];
    }
    let needle = query.to_lowercase();
    cells
        .map(|cell| cell_text(cell).is_some_and(|text| text.to_lowercase().contains(&needle)))
        .collect()
}

fn cell_text(value: &Value) -> Option<String> {
    match value {
        Value::Missing => None,
        Value::Text(s) => Some(s.clone()),
        Value::Integer(v) => Some(v.to_string()),
        Value::Float(v) => Some(v.to_string()),
        Value::Boolean(b) => Some(b.to_string()),
        Value::Timestamp(ts) => Some(ts.format("%Y-%m-%d %H:%M:%S").to_string()),
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDateTime;

    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
    }

    #[test]
    fn numeric_bounds_are_inclusive() {
        let ds = Dataset::from_columns([(
            "v",
            vec![1.0.into(), 2.0.into(), 3.0.into(), Value::Missing, 4.0.into()],
        )]);
        assert_eq!(between_numeric(&ds, "v", Some(2.0), Some(3.0)), [false, true, true, false, false]);
        assert_eq!(between_numeric(&ds, "v", Some(5.0), Some(1.0)), [false; 5]);
    }

    #[test]
    fn open_bounds_keep_missing_cells() {
        let ds = Dataset::from_columns([("id", vec![1.0.into(), Value::Missing, "x".into()])]);
        assert_eq!(between_numeric(&ds, "id", None, None), [true; 3]);
        assert_eq!(between_numeric(&ds, "id", Some(0.0), None), [true, false, false]);
        assert_eq!(between_numeric(&ds, "id", None, Some(5.0)), [true, false, false]);

        let ds = Dataset::from_columns([("dob", vec!["1990-05-01".into(), Value::Missing, "soon".into()])]);
        assert_eq!(between_dates(&ds, "dob", None, None), [true; 3]);
        assert_eq!(between_dates(&ds, "dob", Some(day(1980, 1, 1)), None), [true, false, false]);
    }

    #[test]
    fn absent_column_selects_nothing() {
        let ds = Dataset::from_columns([("v", vec![1.0.into(), 2.0.into()])]);
        assert_eq!(between_numeric(&ds, "w", None, None), [false, false]);
        assert_eq!(between_dates(&ds, "w", None, None), [false, false]);
        assert_eq!(contains_ci(&ds, "w", ""), [false, false]);
    }

    #[test]
    fn date_upper_bound_covers_the_day() {
        let evening = NaiveDateTime::parse_from_str("2024-03-31 23:59:00", "%Y-%m-%d %H:%M:%S")
            .unwrap_or_default();
        let ds = Dataset::from_columns([(
            "created",
            vec![
                "2024-02-29".into(),
                "2024-03-01T08:00:00".into(),
                evening.into(),
                "2024-04-01".into(),
                "garbage".into(),
            ],
        )]);
        let mask = between_dates(&ds, "created", Some(day(2024, 3, 1)), Some(day(2024, 3, 31)));
        assert_eq!(mask, [false, true, true, false, false]);
        let open = between_dates(&ds, "created", None, Some(day(2024, 2, 29)));
        assert_eq!(open, [true, false, false, false, false]);
    }

    #[test]
    fn contains_ignores_case_and_stringifies() {
        let ds = Dataset::from_columns([(
            "name",
            vec!["Alpha".into(), "beta".into(), 1234_i64.into(), Value::Missing, true.into()],
        )]);
        assert_eq!(contains_ci(&ds, "name", "ALP"), [true, false, false, false, false]);
        assert_eq!(contains_ci(&ds, "name", "23"), [false, false, true, false, false]);
        assert_eq!(contains_ci(&ds, "name", "TRUE"), [false, false, false, false, true]);
        assert_eq!(contains_ci(&ds, "name", "  "), [true; 5]);
        assert_eq!(contains_ci(&ds, "name", " beta"), [false; 5]);
        assert_eq!(contains_ci(&ds, "name", "eta"), [false, true, false, false, false]);
    }

    #[test]
    fn masks_feed_dataset_filter() {
        let ds = Dataset::from_columns([
            ("city", vec!["Paris".into(), "Lyon".into(), "paris".into()]),
            ("sales", vec![1.0.into(), 2.0.into(), 3.0.into()]),
        ]);
        let view = ds.filter(&contains_ci(&ds, "city", "paris")).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(view.len(), 2);
        assert_eq!(view.value(1, "sales"), Some(&Value::Float(3.0)));
    }
}
