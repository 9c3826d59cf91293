//! Distribution statistics over household wealth.
//!
//! Empty inputs produce zeroed summaries instead of errors. The Gini
//! coefficient is the one undefined case: it has no meaning when total wealth
//! is not positive, and [`gini`] reports that as `None`.

use serde::{Deserialize, Serialize};
use tsify_next::Tsify;

/// Summary of a set of wealth values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, Tsify)]
pub struct WealthDistribution {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    pub total: f64,
}

impl WealthDistribution {
    pub fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let n = sorted.len();
        let total: f64 = sorted.iter().sum();
        let median = if n % 2 == 1 {
            sorted[n / 2]
        } else {
            0.5 * (sorted[n / 2 - 1] + sorted[n / 2])
        };

        Self {
            count: n,
            min: sorted[0],
            max: sorted[n - 1],
            mean: total / n as f64,
            median,
            total,
        }
    }
}

/// Gini coefficient of `values`, negative values included as-is.
///
/// Sorting ascending as w1..wn:
/// `G = (2 * sum(i * wi) - (n + 1) * sum(wi)) / (n * sum(wi))`.
///
/// Returns `None` for an empty slice or when `sum(wi) <= 0`, which covers
/// every all-non-positive distribution.
pub fn gini(values: &[f64]) -> Option<f64> {
    let n = values.len();
    if n == 0 {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let total: f64 = sorted.iter().sum();
    if total <= 0.0 {
        return None;
    }

    let weighted: f64 = sorted
        .iter()
        .enumerate()
        .map(|(i, w)| (i + 1) as f64 * w)
        .sum();
    let n = n as f64;
    Some((2.0 * weighted - (n + 1.0) * total) / (n * total))
}

/// Aggregate over every household in every town.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, Tsify)]
pub struct GlobalStatistics {
    pub total_households: usize,
    pub total_towns: usize,
    pub current_month: u32,
    pub average_wealth: f64,
    pub total_wealth: f64,
    pub min_wealth: f64,
    pub max_wealth: f64,
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn test_distribution_of_empty_is_zeroed() {
        assert_eq!(WealthDistribution::from_values(&[]), WealthDistribution::default());
    }

    #[test]
    fn test_distribution_basic() {
        let dist = WealthDistribution::from_values(&[300.0, -100.0, 200.0, 0.0]);
        assert_eq!(dist.count, 4);
        assert_eq!(dist.min, -100.0);
        assert_eq!(dist.max, 300.0);
        assert_relative_eq!(dist.mean, 100.0);
        assert_relative_eq!(dist.median, 100.0);
        assert_relative_eq!(dist.total, 400.0);

        let odd = WealthDistribution::from_values(&[5.0, 1.0, 3.0]);
        assert_eq!(odd.median, 3.0);
    }

    #[test]
    fn test_gini_single_value_is_zero() {
        assert_eq!(gini(&[1234.5]), Some(0.0));
    }

    #[test]
    fn test_gini_one_holder_of_four() {
        let g = gini(&[0.0, 0.0, 0.0, 100.0]).unwrap();
        assert!((g - 0.75).abs() < 1e-9, "gini = {g}");
    }

    #[test]
    fn test_gini_order_independent_and_equal_is_zero() {
        let a = gini(&[100.0, 0.0, 0.0, 0.0]).unwrap();
        let b = gini(&[0.0, 100.0, 0.0, 0.0]).unwrap();
        assert_relative_eq!(a, b);
        assert_relative_eq!(gini(&[50.0, 50.0, 50.0]).unwrap(), 0.0);
    }

    #[test]
    fn test_gini_keeps_negative_values() {
        // Debt deepens inequality beyond what clamping at zero would report
        let with_debt = gini(&[-100.0, 0.0, 200.0]).unwrap();
        let clamped = gini(&[0.0, 0.0, 200.0]).unwrap();
        assert!(with_debt > clamped, "{with_debt} <= {clamped}");
        assert!(with_debt > 1.0, "negative wealth can push gini past 1: {with_debt}");
    }

    #[test]
    fn test_gini_undefined_when_total_not_positive() {
        assert_eq!(gini(&[]), None);
        assert_eq!(gini(&[0.0, 0.0]), None);
        assert_eq!(gini(&[-5.0, -10.0]), None);
        assert_eq!(gini(&[-300.0, 100.0]), None);
    }
}
