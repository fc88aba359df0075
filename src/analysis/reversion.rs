//! Historical reversion estimate for the current streak.
//!
//! Among completed streaks of the current streak's type, `reached` counts
//! those at least as long as the current one and `continued` those strictly
//! longer. The break probability is `(reached - continued) / reached`.
//! A current streak with no precedent falls back to a fixed 1%, unless the
//! streak before it was an outlier run of the opposite type, which signals a
//! snap-back at a fixed 75%.

use serde::{Deserialize, Serialize};

use super::streaks::{Classification, Streak, StreakAnalysis};
use crate::domain::Direction;

/// Break probability assigned to a record-length streak.
pub const UNPRECEDENTED_BREAK_PCT: f64 = 1.0;

/// Break probability assigned when the mean-reversion trigger fires.
pub const MEAN_REVERSION_BREAK_PCT: f64 = 75.0;

/// Previous streak must be at least this multiple of its type's mean.
pub const REVERSION_MULTIPLIER: f64 = 2.0;

/// Which way the series moves if the current streak breaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakDirection {
    /// Current streak is BELOW; a break means crossing the threshold.
    Upward,
    /// Current streak is ABOVE; a break means falling under it.
    Downward,
}

impl BreakDirection {
    pub fn from_current(classification: Classification) -> Self {
        match classification {
            Classification::Below => BreakDirection::Upward,
            Classification::Above => BreakDirection::Downward,
        }
    }

    /// Candidate direction that bets on the break.
    pub fn candidate_direction(&self) -> Direction {
        match self {
            BreakDirection::Upward => Direction::Over,
            BreakDirection::Downward => Direction::Under,
        }
    }
}

/// How the break probability was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReversionSignal {
    Historical { reached: usize, continued: usize },
    MeanReversion { previous_length: usize, previous_mean: f64 },
    Unprecedented,
}

/// Output of the reversion estimator for one streak analysis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reversion {
    /// 0..=100
    pub break_probability: f64,
    pub signal: ReversionSignal,
    pub expected_break: BreakDirection,
    pub current: Streak,
    /// Mean length of completed streaks of the current type.
    pub type_mean: f64,
}

impl Reversion {
    pub fn direction(&self) -> Direction {
        self.expected_break.candidate_direction()
    }

    /// True when the probability came from history or the reversion trigger,
    /// not from the no-precedent fallback.
    pub fn is_informative(&self) -> bool {
        self.break_probability > UNPRECEDENTED_BREAK_PCT
    }

    /// Explanation text for reports.
    pub fn describe(&self) -> String {
        let kind = self.current.classification;
        let mut text = format!(
            "Current run: {} game(s) {}.",
            self.current.length, kind
        );
        if self.type_mean > 0.0 {
            let relation = if self.current.length as f64 > self.type_mean {
                "longer than"
            } else {
                "not yet at"
            };
            text.push_str(&format!(
                " Completed {} runs average {:.2}; current run is {} that.",
                kind, self.type_mean, relation
            ));
        } else {
            text.push_str(" No completed runs of this type to compare.");
        }
        match self.signal {
            ReversionSignal::Historical { reached, continued } => text.push_str(&format!(
                " {} run(s) reached length {}, {} went further: break chance {:.1}%.",
                reached, self.current.length, continued, self.break_probability
            )),
            ReversionSignal::MeanReversion {
                previous_length,
                previous_mean,
            } => text.push_str(&format!(
                " Mean-reversion signal: prior {} run of {} vs mean {:.1}: break chance {:.1}%.",
                kind.opposite(),
                previous_length,
                previous_mean,
                self.break_probability
            )),
            ReversionSignal::Unprecedented => text.push_str(&format!(
                " No completed run this long; record streak, break chance set to {:.1}%.",
                self.break_probability
            )),
        }
        text
    }
}

/// Empirical break probability from completed lengths of the current type.
///
/// Returns `None` when no completed streak reached `current_length`.
pub fn historical_break_probability<I>(lengths: I, current_length: usize) -> Option<(f64, usize, usize)>
where
    I: IntoIterator<Item = usize>,
{
    let (reached, continued) = lengths
        .into_iter()
        .fold((0usize, 0usize), |(r, c), len| {
            (
                r + usize::from(len >= current_length),
                c + usize::from(len > current_length),
            )
        });
    if reached == 0 {
        return None;
    }
    let pct = (reached - continued) as f64 / reached as f64 * 100.0;
    Some((pct, reached, continued))
}

/// Mean-reversion trigger: the streak before the current one is of the
/// opposite type and at least twice its type's historical mean.
fn mean_reversion_trigger(analysis: &StreakAnalysis) -> Option<ReversionSignal> {
    let current = analysis.current;
    let previous = analysis.previous()?;
    if previous.classification == current.classification {
        return None;
    }
    let previous_mean = analysis.mean_length(previous.classification);
    if previous_mean <= 0.0 {
        return None;
    }
    if previous.length as f64 >= previous_mean * REVERSION_MULTIPLIER {
        Some(ReversionSignal::MeanReversion {
            previous_length: previous.length,
            previous_mean,
        })
    } else {
        None
    }
}

/// Estimate the probability that the current streak breaks next game.
pub fn estimate_reversion(analysis: &StreakAnalysis) -> Reversion {
    let current = analysis.current;
    let kind = current.classification;
    let type_mean = analysis.mean_length(kind);

    let (break_probability, signal) =
        match historical_break_probability(analysis.historical_lengths(kind), current.length) {
            Some((pct, reached, continued)) => {
                (pct, ReversionSignal::Historical { reached, continued })
            }
            None => match mean_reversion_trigger(analysis) {
                Some(signal) => (MEAN_REVERSION_BREAK_PCT, signal),
                None => (UNPRECEDENTED_BREAK_PCT, ReversionSignal::Unprecedented),
            },
        };

    Reversion {
        break_probability,
        signal,
        expected_break: BreakDirection::from_current(kind),
        current,
        type_mean,
    }
}
