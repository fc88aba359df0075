//! Run-length streak extraction over a threshold series.
//!
//! A series is classified point by point (`value >= threshold` is ABOVE),
//! then consecutive equal classifications are merged into streaks. The
//! last streak is the in-progress one and never counts as history.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{GameLog, Metric};

/// Fewer clean points than this yields `StreakReport::InsufficientData`.
pub const MIN_CLEAN_OBSERVATIONS: usize = 3;

/// Side of the threshold a single observation falls on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Classification {
    Above,
    Below,
}

impl Classification {
    /// Inclusive boundary: a value equal to the threshold is ABOVE.
    pub fn of(value: f64, threshold: f64) -> Self {
        if value >= threshold {
            Classification::Above
        } else {
            Classification::Below
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            Classification::Above => Classification::Below,
            Classification::Below => Classification::Above,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Above => "ABOVE",
            Classification::Below => "BELOW",
        }
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A maximal run of equally classified observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Streak {
    pub classification: Classification,
    pub length: usize,
    /// Ordinal index of the run in the parent sequence, 0-based.
    pub position: usize,
}

/// Streak statistics for one (series, threshold) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreakAnalysis {
    pub threshold: f64,
    /// Per-observation classifications joined with `-`.
    pub pattern: String,
    pub total: usize,
    pub total_above: usize,
    pub total_below: usize,
    /// Non-finite or missing values removed before classification.
    pub dropped: usize,
    pub streaks: Vec<Streak>,
    pub current: Streak,
}

impl StreakAnalysis {
    /// Completed streaks, i.e. everything except the current one.
    pub fn historical(&self) -> &[Streak] {
        self.streaks.split_last().map_or(&[][..], |(_, h)| h)
    }

    /// The completed streak right before the current one.
    pub fn previous(&self) -> Option<&Streak> {
        self.historical().last()
    }

    pub fn historical_lengths(
        &self,
        classification: Classification,
    ) -> impl Iterator<Item = usize> + '_ {
        self.historical()
            .iter()
            .filter(move |s| s.classification == classification)
            .map(|s| s.length)
    }

    /// Mean length of completed streaks of one type, 0.0 when there are none.
    pub fn mean_length(&self, classification: Classification) -> f64 {
        mean_len(self.historical_lengths(classification))
    }
}

/// Result of `extract_streaks`: either the analysis or a terminal sentinel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StreakReport {
    InsufficientData { clean: usize, dropped: usize },
    Complete(StreakAnalysis),
}

impl StreakReport {
    pub fn analysis(&self) -> Option<&StreakAnalysis> {
        match self {
            StreakReport::Complete(a) => Some(a),
            StreakReport::InsufficientData { .. } => None,
        }
    }

    pub fn is_insufficient(&self) -> bool {
        matches!(self, StreakReport::InsufficientData { .. })
    }
}

/// Merge consecutive equal items into `(item, run_length)` pairs.
pub fn run_lengths<T: PartialEq + Copy>(items: &[T]) -> Vec<(T, usize)> {
    let mut runs: Vec<(T, usize)> = Vec::new();
    for &item in items {
        match runs.last_mut() {
            Some((last, len)) if *last == item => *len += 1,
            _ => runs.push((item, 1)),
        }
    }
    runs
}

pub(crate) fn mean_len<I: Iterator<Item = usize>>(lengths: I) -> f64 {
    let (sum, count) = lengths.fold((0usize, 0usize), |(s, c), l| (s + l, c + 1));
    if count == 0 {
        0.0
    } else {
        sum as f64 / count as f64
    }
}

/// Build streaks from a raw value series.
///
/// Non-finite values are dropped first; fewer than three remaining points
/// returns the insufficient-data sentinel.
pub fn extract_from_values(values: &[f64], threshold: f64) -> StreakReport {
    let clean: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    let dropped = values.len() - clean.len();

    if clean.len() < MIN_CLEAN_OBSERVATIONS {
        debug!(clean = clean.len(), dropped, "streak series too short");
        return StreakReport::InsufficientData {
            clean: clean.len(),
            dropped,
        };
    }

    let classes: Vec<Classification> = clean
        .iter()
        .map(|&v| Classification::of(v, threshold))
        .collect();

    let pattern = classes
        .iter()
        .map(Classification::as_str)
        .collect::<Vec<_>>()
        .join("-");
    let total_above = classes
        .iter()
        .filter(|c| **c == Classification::Above)
        .count();

    let streaks: Vec<Streak> = run_lengths(&classes)
        .into_iter()
        .enumerate()
        .map(|(position, (classification, length))| Streak {
            classification,
            length,
            position,
        })
        .collect();

    // At least three clean points, so there is at least one streak.
    let current = streaks[streaks.len() - 1];

    StreakReport::Complete(StreakAnalysis {
        threshold,
        pattern,
        total: clean.len(),
        total_above,
        total_below: clean.len() - total_above,
        dropped,
        streaks,
        current,
    })
}

/// Build streaks for one metric of a time-ordered game log.
pub fn extract_streaks(logs: &[GameLog], metric: Metric, threshold: f64) -> StreakReport {
    let values: Vec<f64> = logs
        .iter()
        .map(|l| l.metric(metric).unwrap_or(f64::NAN))
        .collect();
    extract_from_values(&values, threshold)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn complete(values: &[f64], threshold: f64) -> StreakAnalysis {
        match extract_from_values(values, threshold) {
            StreakReport::Complete(a) => a,
            other => panic!("expected analysis, got {:?}", other),
        }
    }

    #[test]
    fn worked_example_groups_runs() {
        let a = complete(&[10.0, 10.0, 10.0, 5.0, 5.0, 20.0], 9.0);
        assert_eq!(a.pattern, "ABOVE-ABOVE-ABOVE-BELOW-BELOW-ABOVE");
        let runs: Vec<(Classification, usize)> = a
            .streaks
            .iter()
            .map(|s| (s.classification, s.length))
            .collect();
        assert_eq!(
            runs,
            vec![
                (Classification::Above, 3),
                (Classification::Below, 2),
                (Classification::Above, 1)
            ]
        );
        assert_eq!(a.current.length, 1);
        assert_eq!(a.current.position, 2);
        assert_eq!(a.total_above, 4);
        assert_eq!(a.total_below, 2);
        assert!((a.mean_length(Classification::Above) - 3.0).abs() < 1e-12);
        assert!((a.mean_length(Classification::Below) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn threshold_boundary_counts_as_above() {
        let a = complete(&[9.0, 9.0, 8.9], 9.0);
        assert_eq!(a.pattern, "ABOVE-ABOVE-BELOW");
    }

    #[test]
    fn fewer_than_three_points_is_sentinel() {
        assert_eq!(
            extract_from_values(&[], 1.0),
            StreakReport::InsufficientData { clean: 0, dropped: 0 }
        );
        assert!(extract_from_values(&[1.0, 2.0], 1.0).is_insufficient());
    }

    #[test]
    fn non_finite_values_are_dropped_before_counting() {
        let report = extract_from_values(&[1.0, f64::NAN, 2.0, f64::INFINITY], 1.5);
        assert_eq!(
            report,
            StreakReport::InsufficientData { clean: 2, dropped: 2 }
        );

        let a = complete(&[1.0, f64::NAN, 2.0, 3.0], 1.5);
        assert_eq!(a.total, 3);
        assert_eq!(a.dropped, 1);
        assert_eq!(a.pattern, "BELOW-ABOVE-ABOVE");
    }

    #[test]
    fn current_streak_excluded_from_history() {
        let a = complete(&[1.0, 1.0, 5.0, 5.0, 5.0, 5.0], 3.0);
        assert_eq!(a.historical().len(), 1);
        assert_eq!(a.historical_lengths(Classification::Above).count(), 0);
        assert_eq!(a.mean_length(Classification::Above), 0.0);
        assert_eq!(a.previous().map(|s| s.length), Some(2));
    }

    #[test]
    fn stored_analysis_without_streaks_has_no_history() {
        let json = r#"{
            "threshold": 10.0,
            "pattern": "",
            "total": 0,
            "total_above": 0,
            "total_below": 0,
            "dropped": 0,
            "streaks": [],
            "current": {"classification": "ABOVE", "length": 0, "position": 0}
        }"#;
        let a: StreakAnalysis = serde_json::from_str(json).unwrap();
        assert!(a.historical().is_empty());
        assert!(a.previous().is_none());
        assert_eq!(a.mean_length(Classification::Below), 0.0);
    }

    #[test]
    fn streaks_partition_the_series() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let len = rng.gen_range(3..40);
            let values: Vec<f64> = (0..len).map(|_| rng.gen_range(0.0..30.0)).collect();
            let a = complete(&values, 15.0);

            let total: usize = a.streaks.iter().map(|s| s.length).sum();
            assert_eq!(total, values.len());
            for pair in a.streaks.windows(2) {
                assert_ne!(pair[0].classification, pair[1].classification);
                assert_eq!(pair[1].position, pair[0].position + 1);
            }
            assert_eq!(a.streaks[0].position, 0);
            assert_eq!(a.current, *a.streaks.last().unwrap());
        }
    }

    #[test]
    fn run_lengths_handles_generic_items() {
        assert_eq!(
            run_lengths(&['W', 'W', 'L', 'W']),
            vec![('W', 2), ('L', 1), ('W', 1)]
        );
        assert!(run_lengths::<bool>(&[]).is_empty());
    }
}
