//! Replay stored candidates against realized results.
//!
//! Flow:
//! 1. Split the stored (already ranked) list into the diverse top-K and the rest
//! 2. Look up each candidate's realized value by (entity, game)
//! 3. Settle: over is `>=`, under is `<`; missing rows are unknown
//! 4. Tally top-K and all-candidate success separately

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::info;

use super::ranking::meets_probability;
use crate::domain::{Candidate, EntityId, GameId, GameLog, Metric};

/// Per-candidate settlement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Success { actual: f64 },
    Failure { actual: f64 },
    /// No realized row for the candidate's game.
    Unknown,
}

impl Outcome {
    pub fn settle(candidate: &Candidate, actual: Option<f64>) -> Self {
        match actual {
            Some(actual) if candidate.direction.settles(actual, candidate.threshold) => {
                Outcome::Success { actual }
            }
            Some(actual) => Outcome::Failure { actual },
            None => Outcome::Unknown,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Outcome::Unknown)
    }

    pub fn actual(&self) -> Option<f64> {
        match self {
            Outcome::Success { actual } | Outcome::Failure { actual } => Some(*actual),
            Outcome::Unknown => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Success { .. } => "SUCCESS",
            Outcome::Failure { .. } => "FAILURE",
            Outcome::Unknown => "UNKNOWN",
        }
    }

    fn describe(&self) -> String {
        match self {
            Outcome::Success { actual } => format!("SUCCESS (actual {actual:.0})"),
            Outcome::Failure { actual } => format!("FAILURE (actual {actual:.0})"),
            Outcome::Unknown => "UNKNOWN (no result row)".to_string(),
        }
    }
}

/// Realized metric values keyed by (entity id, game id).
#[derive(Debug, Clone, Default)]
pub struct RealizedOutcomes {
    values: HashMap<(EntityId, GameId), f64>,
}

impl RealizedOutcomes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index finite values of `metric`; rows without one are left out.
    pub fn from_logs<'a, I>(logs: I, metric: Metric) -> Self
    where
        I: IntoIterator<Item = &'a GameLog>,
    {
        let mut out = Self::new();
        for log in logs {
            if let Some(v) = log.metric(metric).filter(|v| v.is_finite()) {
                out.insert(log.entity_id, log.game_id.clone(), v);
            }
        }
        out
    }

    pub fn insert(&mut self, entity_id: EntityId, game_id: GameId, value: f64) {
        self.values.insert((entity_id, game_id), value);
    }

    pub fn lookup(&self, candidate: &Candidate) -> Option<f64> {
        let game_id = candidate.group_key.as_ref()?;
        self.values
            .get(&(candidate.entity_id, game_id.clone()))
            .copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Success / attempt counter. Unknown outcomes are never attempts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub successes: usize,
    pub attempts: usize,
}

impl Tally {
    pub fn record(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Success { .. } => {
                self.successes += 1;
                self.attempts += 1;
            }
            Outcome::Failure { .. } => self.attempts += 1,
            Outcome::Unknown => {}
        }
    }

    pub fn merge(&mut self, other: Tally) {
        self.successes += other.successes;
        self.attempts += other.attempts;
    }

    /// Percentage, 0.0 when nothing was attempted.
    pub fn rate(&self) -> f64 {
        if self.attempts == 0 {
            0.0
        } else {
            self.successes as f64 / self.attempts as f64 * 100.0
        }
    }

    pub fn line(&self, label: &str) -> String {
        format!(
            "{label} success: {:.1}% ({}/{})",
            self.rate(),
            self.successes,
            self.attempts
        )
    }
}

/// Aggregate counts for one date or many.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BacktestSummary {
    pub k: usize,
    pub top_k: Tally,
    pub all: Tally,
}

impl BacktestSummary {
    pub fn merge(&mut self, other: BacktestSummary) {
        self.top_k.merge(other.top_k);
        self.all.merge(other.all);
    }

    pub fn lines(&self) -> Vec<String> {
        vec![
            self.top_k.line(&format!("Top {}", self.k)),
            self.all.line("All candidates"),
        ]
    }

    /// `(top_k_success, top_k_attempts, total_success, total_attempts)`
    pub fn counts(&self) -> (usize, usize, usize, usize) {
        (
            self.top_k.successes,
            self.top_k.attempts,
            self.all.successes,
            self.all.attempts,
        )
    }
}

/// One settled candidate in a backtest listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestEntry {
    /// 1-based, continuing from the top list into the other list.
    pub rank: usize,
    pub candidate: Candidate,
    pub outcome: Outcome,
    /// Excluded from the top list by the probability floor.
    pub filtered: bool,
}

impl BacktestEntry {
    pub fn line(&self) -> String {
        let c = &self.candidate;
        let filter = if self.filtered { " (FILTERED)" } else { "" };
        format!(
            "#{}: {} ({:.1} {}) [P: {:.0}% | C: {}%]{} -> {}",
            self.rank,
            c.entity_name,
            c.threshold,
            c.direction,
            c.break_probability,
            c.confidence,
            filter,
            self.outcome.describe()
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestReport {
    pub top: Vec<BacktestEntry>,
    pub others: Vec<BacktestEntry>,
    pub summary: BacktestSummary,
}

impl BacktestReport {
    pub fn summary_lines(&self) -> Vec<String> {
        self.summary.lines()
    }
}

/// Split a ranked list into the diverse top-K and everything else, both in
/// stored order.
pub fn partition_top_k(
    stored: &[Candidate],
    k: usize,
    min_probability: f64,
) -> (Vec<&Candidate>, Vec<&Candidate>) {
    let mut top = Vec::with_capacity(k);
    let mut other = Vec::new();
    let mut seen: HashSet<Option<&GameId>> = HashSet::new();
    for candidate in stored {
        let eligible = meets_probability(candidate, min_probability)
            && top.len() < k
            && !seen.contains(&candidate.group_key.as_ref());
        if eligible {
            seen.insert(candidate.group_key.as_ref());
            top.push(candidate);
        } else {
            other.push(candidate);
        }
    }
    (top, other)
}

/// Evaluate one stored analysis against realized results.
pub fn evaluate_backtest(
    stored: &[Candidate],
    outcomes: &RealizedOutcomes,
    min_probability: f64,
    k: usize,
) -> BacktestReport {
    let (top, other) = partition_top_k(stored, k, min_probability);
    let mut summary = BacktestSummary {
        k,
        ..BacktestSummary::default()
    };

    let top_entries: Vec<BacktestEntry> = top
        .into_iter()
        .enumerate()
        .map(|(i, c)| {
            let outcome = Outcome::settle(c, outcomes.lookup(c));
            summary.top_k.record(&outcome);
            summary.all.record(&outcome);
            BacktestEntry {
                rank: i + 1,
                candidate: c.clone(),
                outcome,
                filtered: false,
            }
        })
        .collect();

    let offset = top_entries.len();
    let other_entries: Vec<BacktestEntry> = other
        .into_iter()
        .enumerate()
        .map(|(i, c)| {
            let outcome = Outcome::settle(c, outcomes.lookup(c));
            summary.all.record(&outcome);
            BacktestEntry {
                rank: offset + i + 1,
                candidate: c.clone(),
                outcome,
                filtered: !meets_probability(c, min_probability),
            }
        })
        .collect();

    BacktestReport {
        top: top_entries,
        others: other_entries,
        summary,
    }
}

/// Sum counts across many stored dates; rates come from the totals.
///
/// Each day carries the probability floor it was recorded with.
pub fn evaluate_all<'a, I>(days: I, outcomes: &RealizedOutcomes, k: usize) -> BacktestSummary
where
    I: IntoIterator<Item = (&'a [Candidate], f64)>,
{
    let mut total = BacktestSummary {
        k,
        ..BacktestSummary::default()
    };
    let mut dates = 0usize;
    for (day, min_probability) in days {
        total.merge(evaluate_backtest(day, outcomes, min_probability, k).summary);
        dates += 1;
    }
    info!(
        dates,
        top_k_success = total.top_k.successes,
        top_k_attempts = total.top_k.attempts,
        all_success = total.all.successes,
        all_attempts = total.all.attempts,
        "aggregate backtest finished"
    );
    total
}
