//! Deterministic numeric helpers shared by the engines.
//!
//! Every helper is total: zero ranges and empty inputs resolve to a
//! definitional fallback instead of dividing by zero.

/// Round a floating point value to `decimals` decimal places.
#[must_use]
pub fn round_f64(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Exponential recency weight `2^(-age / half_life)`.
///
/// A non-positive half-life disables decay.
///
/// ```
/// use vitals_core::math::recency_weight;
///
/// assert_eq!(recency_weight(0.0, 30.0), 1.0);
/// assert!((recency_weight(30.0, 30.0) - 0.5).abs() < 1e-12);
/// ```
#[must_use]
pub fn recency_weight(age_days: f64, half_life_days: f64) -> f64 {
    if half_life_days <= 0.0 {
        return 1.0;
    }
    2f64.powf(-age_days / half_life_days)
}

/// `value / max`, or 0.0 when `max` is not positive.
#[must_use]
pub fn max_ratio(value: f64, max: f64) -> f64 {
    if max > 0.0 {
        value / max
    } else {
        0.0
    }
}

/// Largest value in `values`, or 0.0 when empty.
#[must_use]
pub fn max_of(values: impl IntoIterator<Item = f64>) -> f64 {
    values.into_iter().fold(0.0f64, f64::max)
}

/// Min-max scale `values` into `[0, 1]`; a constant slice maps to all zeros.
///
/// ```
/// use vitals_core::math::min_max_normalize;
///
/// assert_eq!(min_max_normalize(&[2.0, 4.0, 6.0]), vec![0.0, 0.5, 1.0]);
/// assert_eq!(min_max_normalize(&[3.0, 3.0]), vec![0.0, 0.0]);
/// ```
#[must_use]
pub fn min_max_normalize(values: &[f64]) -> Vec<f64> {
    let Some((min, max)) = min_max(values) else {
        return Vec::new();
    };
    let range = max - min;
    values
        .iter()
        .map(|v| if range > 0.0 { (v - min) / range } else { 0.0 })
        .collect()
}

/// Smallest and largest value, or `None` when empty.
#[must_use]
pub fn min_max(values: &[f64]) -> Option<(f64, f64)> {
    let first = *values.first()?;
    Some(
        values
            .iter()
            .fold((first, first), |(lo, hi), v| (lo.min(*v), hi.max(*v))),
    )
}

/// Arithmetic mean, or 0.0 when empty.
#[must_use]
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Median of `values`, or `None` when empty.
#[must_use]
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Euclidean distance between two equal-length points.
#[must_use]
pub fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    squared_distance(a, b).sqrt()
}

/// Squared Euclidean distance between two equal-length points.
#[must_use]
pub fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_f64_rounds_expected_precision() {
        let value = 12.34567;
        assert_eq!(round_f64(value, 2), 12.35);
        assert_eq!(round_f64(value, 4), 12.3457);
    }

    #[test]
    fn recency_weight_halves_per_half_life() {
        assert!((recency_weight(60.0, 30.0) - 0.25).abs() < 1e-12);
        assert_eq!(recency_weight(100.0, 0.0), 1.0);
    }

    #[test]
    fn max_ratio_guards_zero_max() {
        assert_eq!(max_ratio(5.0, 0.0), 0.0);
        assert_eq!(max_ratio(1.0, 4.0), 0.25);
    }

    #[test]
    fn min_max_normalize_handles_empty_and_constant() {
        assert!(min_max_normalize(&[]).is_empty());
        assert_eq!(min_max_normalize(&[7.0]), vec![0.0]);
    }

    #[test]
    fn median_even_and_odd() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 2.0, 3.0]), Some(2.5));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn mean_of_empty_is_zero() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(mean(&[1.0, 2.0, 3.0]), 2.0);
    }

    #[test]
    fn euclidean_distance() {
        assert_eq!(euclidean(&[0.0, 0.0], &[3.0, 4.0]), 5.0);
    }
}
