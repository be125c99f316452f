use num_traits::Float;
use ordered_float::OrderedFloat;

use crate::Kbn;

/// Returns the median from a sorted slice
///
/// # Arguments
///
/// * `ss` - The sorted slice
///
/// # Returns
///
/// * `Option<T>` - The median, or `None` if the slice is empty
#[inline]
pub fn median_from_sorted_slice<T: Float>(ss: &[T]) -> Option<T> {
    let len = ss.len();
    if len == 0 {
        return None;
    }
    let mid = len / 2;
    let _2 = T::one() + T::one();
    if len % 2 == 0 {
        Some((ss[mid - 1] + ss[mid]) / _2)
    } else {
        Some(ss[mid])
    }
}

/// Returns the quantile from a sorted slice using linear interpolation
/// between the two closest ranks.
///
/// # Arguments
///
/// * `ss` - The sorted slice
/// * `q` - The quantile to calculate, in `[0, 1]`
///
/// # Returns
///
/// * `Option<T>` - The quantile, or `None` if the slice is empty
#[inline]
pub fn quantile_from_sorted_slice<T: Float>(ss: &[T], q: f64) -> Option<T> {
    if ss.is_empty() {
        return None;
    }
    let q = q.clamp(0.0, 1.0);
    let pos = q * (ss.len() as f64 - 1.0);
    let lower_index = pos.floor() as usize;
    let upper_index = pos.ceil() as usize;

    if lower_index == upper_index {
        Some(ss[lower_index])
    } else {
        let lower_value = ss[lower_index];
        let upper_value = ss[upper_index];
        let weight = T::from(pos - lower_index as f64)?;

        Some(lower_value + weight * (upper_value - lower_value))
    }
}

/// Collects the present values of a column view and sorts them ascending
pub fn sorted_present(view: &[Option<f64>]) -> Vec<f64> {
    let mut values: Vec<OrderedFloat<f64>> = view.iter().flatten().copied().map(OrderedFloat).collect();
    values.sort_unstable();
    values.into_iter().map(|v| v.0).collect()
}

/// Compensated sum of a sequence of values
pub fn kbn_sum<I: IntoIterator<Item = f64>>(values: I) -> f64 {
    let mut sum = Kbn::default();
    for v in values {
        sum += v;
    }
    sum.total()
}

/// Arithmetic mean, `None` for an empty slice
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(kbn_sum(values.iter().copied()) / values.len() as f64)
}

/// Sample (n - 1) variance around a known mean, `None` below two values
pub fn sample_variance(values: &[f64], mean: f64) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let ss = kbn_sum(values.iter().map(|v| (v - mean) * (v - mean)));
    Some(ss / (values.len() - 1) as f64)
}

/// Ranks values from 1 to n, ties share the average of the ranks they span
pub fn average_ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by_key(|&i| OrderedFloat(values[i]));

    let mut ranks = vec![0.0; values.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && values[order[end]] == values[order[start]] {
            end += 1;
        }
        // positions start..end share ranks start+1..=end
        let rank = (start + end + 1) as f64 / 2.0;
        for &i in &order[start..end] {
            ranks[i] = rank;
        }
        start = end;
    }
    ranks
}

#[cfg(test)]
mod tests {
    use assert_approx_eq::assert_approx_eq;

    use super::*;

    #[test]
    fn median_works() {
        assert_eq!(median_from_sorted_slice::<f64>(&[]), None);
        assert_eq!(median_from_sorted_slice(&[1.0, 2.0, 9.0]), Some(2.0));
        assert_eq!(median_from_sorted_slice(&[1.0, 2.0, 4.0, 9.0]), Some(3.0));
    }

    #[test]
    fn quantile_interpolates_linearly() {
        let ss = [10.0, 11.0, 12.0, 12.0, 13.0];
        assert_eq!(quantile_from_sorted_slice(&ss, 0.25), Some(11.0));
        assert_eq!(quantile_from_sorted_slice(&ss, 0.5), Some(12.0));
        assert_eq!(quantile_from_sorted_slice(&ss, 0.75), Some(12.0));

        let ss = [1.0, 2.0, 3.0, 4.0];
        assert_approx_eq!(quantile_from_sorted_slice(&ss, 0.25).unwrap_or_default(), 1.75);
        assert_approx_eq!(quantile_from_sorted_slice(&ss, 0.75).unwrap_or_default(), 3.25);
        assert_eq!(quantile_from_sorted_slice::<f64>(&[], 0.5), None);
    }

    #[test]
    fn sorted_present_skips_missing() {
        let view = [Some(3.0), None, Some(-1.0), Some(2.0)];
        assert_eq!(sorted_present(&view), vec![-1.0, 2.0, 3.0]);
    }

    #[test]
    fn variance_needs_two_values() {
        assert_eq!(sample_variance(&[4.0], 4.0), None);
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let m = mean(&values).unwrap_or_default();
        assert_approx_eq!(m, 5.0);
        assert_approx_eq!(sample_variance(&values, m).unwrap_or_default(), 32.0 / 7.0);
    }

    #[test]
    fn kbn_sum_is_compensated() {
        let values = [1.0, 1e100, 1.0, -1e100];
        assert_eq!(kbn_sum(values), 2.0);
    }

    #[test]
    fn average_ranks_share_ties() {
        assert_eq!(average_ranks(&[10.0, 30.0, 20.0]), vec![1.0, 3.0, 2.0]);
        assert_eq!(average_ranks(&[5.0, 1.0, 5.0, 2.0]), vec![3.5, 1.0, 3.5, 2.0]);
    }
}
