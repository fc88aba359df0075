use serde::{Deserialize, Serialize};

use super::observation::{EntityId, GameId};

/// Predicted side of the threshold for the next observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Over,
    Under,
}

impl Direction {
    pub fn opposite(&self) -> Self {
        match self {
            Direction::Over => Direction::Under,
            Direction::Under => Direction::Over,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Over => "OVER",
            Direction::Under => "UNDER",
        }
    }

    /// Whether a realized value settles this direction as a success.
    ///
    /// Over is inclusive (`>=`), under is exclusive (`<`), matching the
    /// `value >= threshold` classification used for streaks.
    pub fn settles(&self, realized: f64, threshold: f64) -> bool {
        match self {
            Direction::Over => realized >= threshold,
            Direction::Under => realized < threshold,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Roster availability shift relative to the baseline absentee set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RosterTag {
    /// A key teammate is newly unavailable: usage likely rises.
    UsageUp,
    /// A long-term absentee is back: usage likely drops.
    UsageDown,
    #[default]
    Unchanged,
}

/// Human-readable explanation for each scoring factor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FactorNotes {
    pub pattern: String,
    pub volume: String,
    pub efficiency: String,
    #[serde(default)]
    pub fatigue: Option<String>,
    #[serde(default)]
    pub roster: Option<String>,
}

/// One scored (entity, threshold, direction) prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub entity_id: EntityId,
    pub entity_name: String,
    pub threshold: f64,
    pub direction: Direction,
    /// Pattern break probability, 0..=100.
    pub break_probability: f64,
    /// Clamped integer confidence, 5..=99 with default weights.
    pub confidence: i64,
    /// `break_probability/100 * confidence/100`, ranking only.
    pub synergy: f64,
    /// Diversity key (game id); `None` outside slate mode.
    #[serde(default)]
    pub group_key: Option<GameId>,
    pub streak_length: usize,
    pub season_average: f64,
    pub efficiency_ratio: f64,
    #[serde(default)]
    pub roster_tag: RosterTag,
    pub notes: FactorNotes,
}

impl Candidate {
    /// Three-key ranking tuple: synergy, break probability, confidence.
    pub fn score_key(&self) -> (f64, f64, i64) {
        (self.synergy, self.break_probability, self.confidence)
    }

    /// One-line summary used in report text.
    pub fn headline(&self) -> String {
        format!(
            "{} ({:.1} {}) [P: {:.1}% | C: {}%] synergy {:.3}",
            self.entity_name,
            self.threshold,
            self.direction,
            self.break_probability,
            self.confidence,
            self.synergy
        )
    }
}

/// Synergy score from a break probability (0..=100) and confidence.
pub fn synergy_score(break_probability: f64, confidence: i64) -> f64 {
    (break_probability / 100.0) * (confidence as f64 / 100.0)
}
