//! Descriptive statistics over numeric series.

use serde::Serialize;
use std::time::Duration;

/// Number of cut points reported as deciles (10th through 90th percentile).
pub const DECILE_COUNT: usize = 9;

/// Summary of one numeric series.
///
/// Every field is zero for an empty series.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Stats {
    pub count: usize,
    pub mean: f64,
    pub stddev: f64,
    pub stderr: f64,
    pub min: f64,
    /// First index at which `min` occurs.
    pub min_index: usize,
    pub max: f64,
    /// First index at which `max` occurs.
    pub max_index: usize,
    pub deciles: [f64; DECILE_COUNT],
}

impl Stats {
    /// Summarise a series of values.
    pub fn from_series(series: &[f64]) -> Self {
        if series.is_empty() {
            return Self::default();
        }

        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut min_index = 0;
        let mut max_index = 0;

        for (index, &value) in series.iter().enumerate() {
            if value < min {
                min = value;
                min_index = index;
            }
            if value > max {
                max = value;
                max_index = index;
            }
        }

        let count = series.len();
        let mean = mean(series);
        let stddev = stddev_with_mean(series, mean);

        Self {
            count,
            mean,
            stddev,
            stderr: stddev / (count as f64).sqrt(),
            min,
            min_index,
            max,
            max_index,
            deciles: deciles(series),
        }
    }

    /// Summarise a series of durations, expressed in milliseconds.
    pub fn from_durations_ms(durations: &[Duration]) -> Self {
        let millis: Vec<f64> =
            durations.iter().map(|d| d.as_secs_f64() * 1000.0).collect();

        Self::from_series(&millis)
    }
}

/// Mean accumulated as `value / n` per element.
pub fn mean(series: &[f64]) -> f64 {
    let n = series.len() as f64;

    series.iter().fold(0.0, |acc, &value| acc + value / n)
}

fn square_mean(series: &[f64]) -> f64 {
    let n = series.len() as f64;

    series.iter().fold(0.0, |acc, &value| acc + value * value / n)
}

/// Population standard deviation via `E[x²] - mean²`.
fn stddev_with_mean(series: &[f64], mean: f64) -> f64 {
    (square_mean(series) - mean * mean).max(0.0).sqrt()
}

/// The 10th..90th percentile cut points of `series`.
///
/// Cut `k` is taken from the sorted series at `round((n - 1) / 10 * k)`.
pub fn deciles(series: &[f64]) -> [f64; DECILE_COUNT] {
    let mut cuts = [0.0; DECILE_COUNT];

    if series.is_empty() {
        return cuts;
    }

    let mut sorted = series.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let step = (sorted.len() - 1) as f64 / 10.0;

    for (k, cut) in cuts.iter_mut().enumerate() {
        let index = (step * (k + 1) as f64).round() as usize;
        *cut = sorted[index.min(sorted.len() - 1)];
    }

    cuts
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {}, got {}",
            expected,
            actual
        );
    }

    #[test]
    fn test_stats_eleven_samples() {
        let series =
            [0.0, -0.5, 0.5, -1.0, 1.0, -1.5, 1.5, -2.0, 2.0, -2.5, 2.5];

        let stats = Stats::from_series(&series);

        assert_eq!(stats.count, 11);
        assert_close(stats.mean, 0.0);
        assert_close(stats.stddev, 1.5811388300841898);
        assert_close(stats.stderr, 0.4767312946227962);
        assert_eq!(stats.min, -2.5);
        assert_eq!(stats.min_index, 9);
        assert_eq!(stats.max, 2.5);
        assert_eq!(stats.max_index, 10);
        assert_eq!(
            stats.deciles,
            [-2.0, -1.5, -1.0, -0.5, 0.0, 0.5, 1.0, 1.5, 2.0]
        );
    }

    #[test]
    fn test_stats_six_samples() {
        let series = [-2.0, -3.0, 0.0, 2.0, -1.0, 1.0];

        let stats = Stats::from_series(&series);

        assert_eq!(stats.count, 6);
        assert_close(stats.mean, -0.5);
        assert_close(stats.stddev, 1.707825127659933);
        assert_close(stats.stderr, 0.6972166887783964);
        assert_eq!(stats.min, -3.0);
        assert_eq!(stats.min_index, 1);
        assert_eq!(stats.max, 2.0);
        assert_eq!(stats.max_index, 3);
        assert_eq!(
            stats.deciles,
            [-2.0, -2.0, -1.0, -1.0, 0.0, 0.0, 1.0, 1.0, 2.0]
        );
    }

    #[test]
    fn test_stats_durations_in_millis() {
        let millis = [
            127u64, 19, 139, 34, 134, 236, 221, 61, 146, 151, 157, 45, 137,
            231, 46, 61, 215, 29, 189, 42, 108, 174, 235, 79, 167,
        ];
        let durations: Vec<Duration> =
            millis.iter().map(|&ms| Duration::from_millis(ms)).collect();

        let stats = Stats::from_durations_ms(&durations);

        assert_eq!(stats.count, 25);
        assert!((stats.mean - 127.32).abs() < 1e-9);
        assert!((stats.stddev - 70.00726819409546).abs() < 1e-9);
        assert!((stats.stderr - 14.001453638819092).abs() < 1e-9);
        assert_eq!(stats.min, 19.0);
        assert_eq!(stats.min_index, 1);
        assert_eq!(stats.max, 236.0);
        assert_eq!(stats.max_index, 5);
        assert_eq!(
            stats.deciles,
            [34.0, 46.0, 61.0, 127.0, 137.0, 146.0, 167.0, 189.0, 231.0]
        );
    }

    #[test]
    fn test_stats_empty_series() {
        let stats = Stats::from_series(&[]);

        assert_eq!(stats.count, 0);
        assert_eq!(stats.mean, 0.0);
        assert_eq!(stats.stddev, 0.0);
        assert_eq!(stats.stderr, 0.0);
        assert_eq!(stats.min, 0.0);
        assert_eq!(stats.max, 0.0);
        assert!(stats.deciles.iter().all(|d| *d == 0.0));
    }

    #[test]
    fn test_stats_first_extremum_index_wins() {
        let stats = Stats::from_series(&[3.0, 1.0, 3.0, 1.0]);

        assert_eq!(stats.min_index, 1);
        assert_eq!(stats.max_index, 0);
    }

    #[test]
    fn test_stats_constant_series_has_zero_spread() {
        let stats = Stats::from_series(&[0.1; 7]);

        assert!(stats.stddev.is_finite());
        assert!(stats.stddev < 1e-6);
        assert!(stats.stderr < 1e-6);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Property: count matches input, min <= mean <= max and
        /// stderr = stddev / sqrt(count).
        #[test]
        fn stats_invariants_hold(
            series in prop::collection::vec(-1.0e6f64..1.0e6f64, 1..200)
        ) {
            let stats = Stats::from_series(&series);

            prop_assert_eq!(stats.count, series.len());
            prop_assert!(stats.min <= stats.mean + 1e-6);
            prop_assert!(stats.mean <= stats.max + 1e-6);
            prop_assert!(stats.stddev >= 0.0);

            let expected_stderr = stats.stddev / (series.len() as f64).sqrt();
            let tolerance = 1e-9 * expected_stderr.max(1.0);
            prop_assert!((stats.stderr - expected_stderr).abs() <= tolerance);

            for pair in stats.deciles.windows(2) {
                prop_assert!(pair[0] <= pair[1]);
            }
        }
    }
}
