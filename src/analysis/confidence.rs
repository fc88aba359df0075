//! Multi-factor confidence scoring.
//!
//! Confidence starts at a base value and is adjusted by an ordered list of
//! named rules. Each rule takes the accumulator by value and returns it, so
//! a rule can be exercised on its own. Only the roster rule reads state left
//! by an earlier rule (the volume verdict).

use serde::{Deserialize, Serialize};

use crate::analysis::reversion::UNPRECEDENTED_BREAK_PCT;
use crate::domain::{Direction, FactorNotes, RosterTag};

/// Weights and bounds for the confidence rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub base_confidence: f64,
    pub volume_positive: f64, // added when season volume supports the candidate
    pub volume_negative: f64, // added (negative) when it contradicts
    pub volume_tolerance: f64,
    pub efficiency_weight: f64,
    pub fatigue_weight: f64,
    pub usage_delta_weight: f64,
    pub min_confidence: i64,
    pub max_confidence: i64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            base_confidence: 50.0,
            volume_positive: 30.0,
            volume_negative: -35.0,
            volume_tolerance: 2.0,
            efficiency_weight: 15.0,
            fatigue_weight: 15.0,
            usage_delta_weight: 25.0,
            min_confidence: 5,
            max_confidence: 99,
        }
    }
}

/// Verdict of a single factor relative to the candidate direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorSign {
    Supports,
    Contradicts,
    #[default]
    Neutral,
}

/// Secondary FG% streak result used by the efficiency rule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EfficiencySignal {
    pub break_probability: f64,
    pub direction: Direction,
}

/// Whether each side played the previous day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RestStatus {
    pub entity_played_yesterday: bool,
    pub opponent_played_yesterday: bool,
}

/// Change in key-teammate availability versus the baseline absentee set.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RosterDelta {
    pub tag: RosterTag,
    /// Teammate named in the explanation.
    pub teammate: Option<String>,
}

impl RosterDelta {
    pub fn unchanged() -> Self {
        Self::default()
    }

    /// +1 usage up, -1 usage down, 0 unchanged.
    pub fn effect(&self) -> i8 {
        match self.tag {
            RosterTag::UsageUp => 1,
            RosterTag::UsageDown => -1,
            RosterTag::Unchanged => 0,
        }
    }
}

/// Everything the rules may read for one candidate.
#[derive(Debug, Clone)]
pub struct ScoringInputs<'a> {
    pub direction: Direction,
    pub threshold: f64,
    pub season_average: f64,
    /// `None` when the FG% series had too little data.
    pub efficiency: Option<EfficiencySignal>,
    /// `None` outside slate mode.
    pub rest: Option<RestStatus>,
    /// `None` outside slate mode.
    pub roster: Option<&'a RosterDelta>,
}

/// Running state threaded through the rule list.
#[derive(Debug, Clone, PartialEq)]
pub struct Accumulator {
    pub confidence: f64,
    pub volume: FactorSign,
    pub notes: FactorNotes,
}

impl Accumulator {
    pub fn new(base: f64) -> Self {
        Self {
            confidence: base,
            volume: FactorSign::Neutral,
            notes: FactorNotes {
                volume: "NEUTRAL (season average near threshold)".to_string(),
                efficiency: "NEUTRAL (no usable FG% streak)".to_string(),
                ..FactorNotes::default()
            },
        }
    }
}

pub type RuleFn = fn(Accumulator, &ScoringInputs<'_>, &ScoringWeights) -> Accumulator;

/// A named confidence adjustment.
#[derive(Clone, Copy)]
pub struct Rule {
    pub name: &'static str,
    pub apply: RuleFn,
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule").field("name", &self.name).finish()
    }
}

pub const EFFICIENCY: Rule = Rule {
    name: "efficiency",
    apply: efficiency_rule,
};
pub const VOLUME: Rule = Rule {
    name: "volume",
    apply: volume_rule,
};
pub const FATIGUE: Rule = Rule {
    name: "fatigue",
    apply: fatigue_rule,
};
pub const ROSTER_DELTA: Rule = Rule {
    name: "roster_delta",
    apply: roster_delta_rule,
};

/// Rules for slate mode, in application order.
pub const SLATE_RULES: &[Rule] = &[EFFICIENCY, VOLUME, FATIGUE, ROSTER_DELTA];

/// Rules for single-entity queries (no schedule or roster data).
pub const SINGLE_ENTITY_RULES: &[Rule] = &[EFFICIENCY, VOLUME];

/// FG% streak agreeing with the candidate adds the weight, disagreeing
/// subtracts it. A fallback-level probability (<= 1%) is ignored.
pub fn efficiency_rule(
    mut acc: Accumulator,
    inputs: &ScoringInputs<'_>,
    weights: &ScoringWeights,
) -> Accumulator {
    let Some(signal) = inputs.efficiency else {
        return acc;
    };
    if signal.break_probability <= UNPRECEDENTED_BREAK_PCT {
        return acc;
    }
    if signal.direction == inputs.direction {
        acc.confidence += weights.efficiency_weight;
        acc.notes.efficiency = format!("POSITIVE (FG% streak also points {})", signal.direction);
    } else {
        acc.confidence -= weights.efficiency_weight;
        acc.notes.efficiency = format!("NEGATIVE (FG% streak points {})", signal.direction);
    }
    acc
}

/// Season average against the threshold, outside a symmetric tolerance band.
pub fn volume_rule(
    mut acc: Accumulator,
    inputs: &ScoringInputs<'_>,
    weights: &ScoringWeights,
) -> Accumulator {
    let diff = inputs.season_average - inputs.threshold;
    let tol = weights.volume_tolerance;
    let above_band = diff > tol;
    let below_band = diff < -tol;

    acc.volume = match inputs.direction {
        Direction::Over if above_band => FactorSign::Supports,
        Direction::Over if below_band => FactorSign::Contradicts,
        Direction::Under if below_band => FactorSign::Supports,
        Direction::Under if above_band => FactorSign::Contradicts,
        _ => FactorSign::Neutral,
    };

    let ctx = format!(
        "avg {:.1} / threshold {:.1}",
        inputs.season_average, inputs.threshold
    );
    match acc.volume {
        FactorSign::Supports => {
            acc.confidence += weights.volume_positive;
            acc.notes.volume = match inputs.direction {
                Direction::Over => format!("POSITIVE ({ctx})"),
                Direction::Under => format!("POSITIVE ({ctx}) volume already low"),
            };
        }
        FactorSign::Contradicts => {
            acc.confidence += weights.volume_negative;
            acc.notes.volume = match inputs.direction {
                Direction::Over => format!("NEGATIVE ({ctx}) volume too low"),
                Direction::Under => format!("NEGATIVE ({ctx}) volume too high"),
            };
        }
        FactorSign::Neutral => {}
    }
    acc
}

/// Back-to-back against a rested opponent costs the weight; the reverse
/// adds it. Applies the same way for both directions.
pub fn fatigue_rule(
    mut acc: Accumulator,
    inputs: &ScoringInputs<'_>,
    weights: &ScoringWeights,
) -> Accumulator {
    let Some(rest) = inputs.rest else {
        return acc;
    };
    acc.notes.fatigue = Some(
        match (rest.entity_played_yesterday, rest.opponent_played_yesterday) {
            (true, false) => {
                acc.confidence -= weights.fatigue_weight;
                "NEGATIVE (back-to-back, opponent rested)".to_string()
            }
            (false, true) => {
                acc.confidence += weights.fatigue_weight;
                "POSITIVE (rested, opponent on back-to-back)".to_string()
            }
            _ => "NEUTRAL (equal rest)".to_string(),
        },
    );
    acc
}

/// Usage shift from roster changes.
///
/// Over with usage up first cancels a negative volume verdict, Over with
/// usage down first cancels a positive one. Under only takes the signed
/// weight.
pub fn roster_delta_rule(
    mut acc: Accumulator,
    inputs: &ScoringInputs<'_>,
    weights: &ScoringWeights,
) -> Accumulator {
    let Some(delta) = inputs.roster else {
        return acc;
    };
    let who = delta.teammate.as_deref().unwrap_or("teammate");
    let w = weights.usage_delta_weight;

    let note = match (inputs.direction, delta.tag) {
        (_, RosterTag::Unchanged) => "NEUTRAL (no roster delta)".to_string(),
        (Direction::Over, RosterTag::UsageUp) => {
            if acc.volume == FactorSign::Contradicts {
                acc.confidence -= weights.volume_negative;
            }
            acc.confidence += w;
            format!("POSITIVE (usage up, {who} out)")
        }
        (Direction::Over, RosterTag::UsageDown) => {
            if acc.volume == FactorSign::Supports {
                acc.confidence -= weights.volume_positive;
            }
            acc.confidence -= w;
            format!("NEGATIVE (usage down, {who} returning)")
        }
        (Direction::Under, RosterTag::UsageUp) => {
            acc.confidence -= w;
            format!("NEGATIVE (usage up, {who} out)")
        }
        (Direction::Under, RosterTag::UsageDown) => {
            acc.confidence += w;
            format!("POSITIVE (usage down, {who} returning)")
        }
    };
    acc.notes.roster = Some(note);
    acc
}

/// Truncate toward zero, then clamp.
pub fn clamp_confidence(raw: f64, min: i64, max: i64) -> i64 {
    if raw.is_nan() {
        return min;
    }
    (raw.trunc() as i64).clamp(min, max)
}

/// Scored confidence plus the per-rule trace.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfidenceScore {
    pub confidence: i64,
    pub raw: f64,
    pub volume: FactorSign,
    pub notes: FactorNotes,
    /// Rule name and the amount it moved the raw score.
    pub applied: Vec<(&'static str, f64)>,
}

/// Runs an ordered rule list with a fixed set of weights.
#[derive(Debug, Clone)]
pub struct ConfidenceScorer {
    weights: ScoringWeights,
    rules: &'static [Rule],
}

impl ConfidenceScorer {
    pub fn new(weights: ScoringWeights, rules: &'static [Rule]) -> Self {
        Self { weights, rules }
    }

    pub fn slate(weights: ScoringWeights) -> Self {
        Self::new(weights, SLATE_RULES)
    }

    pub fn single_entity(weights: ScoringWeights) -> Self {
        Self::new(weights, SINGLE_ENTITY_RULES)
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name).collect()
    }

    pub fn score(&self, inputs: &ScoringInputs<'_>) -> ConfidenceScore {
        let mut acc = Accumulator::new(self.weights.base_confidence);
        let mut applied = Vec::with_capacity(self.rules.len());
        for rule in self.rules {
            let before = acc.confidence;
            acc = (rule.apply)(acc, inputs, &self.weights);
            applied.push((rule.name, acc.confidence - before));
        }
        ConfidenceScore {
            confidence: clamp_confidence(
                acc.confidence,
                self.weights.min_confidence,
                self.weights.max_confidence,
            ),
            raw: acc.confidence,
            volume: acc.volume,
            notes: acc.notes,
            applied,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs<'a>(direction: Direction, threshold: f64, avg: f64) -> ScoringInputs<'a> {
        ScoringInputs {
            direction,
            threshold,
            season_average: avg,
            efficiency: None,
            rest: None,
            roster: None,
        }
    }

    fn run(rule: Rule, acc: Accumulator, i: &ScoringInputs<'_>) -> Accumulator {
        (rule.apply)(acc, i, &ScoringWeights::default())
    }

    #[test]
    fn volume_band_is_exclusive_and_asymmetric() {
        let base = Accumulator::new(50.0);
        let over_support = run(VOLUME, base.clone(), &inputs(Direction::Over, 20.0, 22.5));
        assert_eq!(over_support.confidence, 80.0);
        assert_eq!(over_support.volume, FactorSign::Supports);

        let over_against = run(VOLUME, base.clone(), &inputs(Direction::Over, 20.0, 17.5));
        assert_eq!(over_against.confidence, 15.0);

        let under_support = run(VOLUME, base.clone(), &inputs(Direction::Under, 20.0, 17.5));
        assert_eq!(under_support.confidence, 80.0);

        let under_against = run(VOLUME, base.clone(), &inputs(Direction::Under, 20.0, 22.5));
        assert_eq!(under_against.volume, FactorSign::Contradicts);
        assert_eq!(under_against.confidence, 15.0);

        // exactly on the band edge stays neutral
        let edge = run(VOLUME, base, &inputs(Direction::Over, 20.0, 22.0));
        assert_eq!(edge.volume, FactorSign::Neutral);
        assert_eq!(edge.confidence, 50.0);
    }

    #[test]
    fn efficiency_ignores_fallback_probability() {
        let mut i = inputs(Direction::Over, 20.0, 20.0);
        i.efficiency = Some(EfficiencySignal {
            break_probability: UNPRECEDENTED_BREAK_PCT,
            direction: Direction::Under,
        });
        assert_eq!(run(EFFICIENCY, Accumulator::new(50.0), &i).confidence, 50.0);

        i.efficiency = Some(EfficiencySignal {
            break_probability: UNPRECEDENTED_BREAK_PCT + 0.5,
            direction: Direction::Under,
        });
        assert_eq!(run(EFFICIENCY, Accumulator::new(50.0), &i).confidence, 35.0);

        i.efficiency = Some(EfficiencySignal {
            break_probability: 40.0,
            direction: Direction::Under,
        });
        assert_eq!(run(EFFICIENCY, Accumulator::new(50.0), &i).confidence, 35.0);

        i.efficiency = Some(EfficiencySignal {
            break_probability: 40.0,
            direction: Direction::Over,
        });
        assert_eq!(run(EFFICIENCY, Accumulator::new(50.0), &i).confidence, 65.0);
    }

    #[test]
    fn fatigue_is_direction_independent() {
        for direction in [Direction::Over, Direction::Under] {
            let mut i = inputs(direction, 20.0, 20.0);
            i.rest = Some(RestStatus {
                entity_played_yesterday: true,
                opponent_played_yesterday: false,
            });
            assert_eq!(run(FATIGUE, Accumulator::new(50.0), &i).confidence, 35.0);
            i.rest = Some(RestStatus {
                entity_played_yesterday: false,
                opponent_played_yesterday: true,
            });
            assert_eq!(run(FATIGUE, Accumulator::new(50.0), &i).confidence, 65.0);
            i.rest = Some(RestStatus {
                entity_played_yesterday: true,
                opponent_played_yesterday: true,
            });
            let acc = run(FATIGUE, Accumulator::new(50.0), &i);
            assert_eq!(acc.confidence, 50.0);
            assert!(acc.notes.fatigue.unwrap().starts_with("NEUTRAL"));
        }
    }

    #[test]
    fn roster_delta_cancels_opposing_volume_for_over() {
        let up = RosterDelta {
            tag: RosterTag::UsageUp,
            teammate: Some("A. Guard".to_string()),
        };
        let down = RosterDelta {
            tag: RosterTag::UsageDown,
            teammate: Some("B. Wing".to_string()),
        };

        // Over + usage up after a contradicting volume: 50 - 35 + 35 + 25
        let mut i = inputs(Direction::Over, 20.0, 15.0);
        i.roster = Some(&up);
        let acc = run(VOLUME, Accumulator::new(50.0), &i);
        let acc = run(ROSTER_DELTA, acc, &i);
        assert_eq!(acc.confidence, 75.0);
        assert!(acc.notes.roster.unwrap().contains("A. Guard"));

        // Over + usage down after a supporting volume: 50 + 30 - 30 - 25
        let mut i = inputs(Direction::Over, 20.0, 25.0);
        i.roster = Some(&down);
        let acc = run(VOLUME, Accumulator::new(50.0), &i);
        assert_eq!(run(ROSTER_DELTA, acc, &i).confidence, 25.0);

        // Over + usage up with neutral volume: plain +25
        let mut i = inputs(Direction::Over, 20.0, 20.0);
        i.roster = Some(&up);
        let acc = run(VOLUME, Accumulator::new(50.0), &i);
        assert_eq!(run(ROSTER_DELTA, acc, &i).confidence, 75.0);
    }

    #[test]
    fn roster_delta_for_under_has_no_volume_correction() {
        let up = RosterDelta {
            tag: RosterTag::UsageUp,
            teammate: None,
        };
        let down = RosterDelta {
            tag: RosterTag::UsageDown,
            teammate: None,
        };
        let mut i = inputs(Direction::Under, 20.0, 25.0);
        i.roster = Some(&up);
        let acc = run(VOLUME, Accumulator::new(50.0), &i);
        // 50 - 35 - 25
        assert_eq!(run(ROSTER_DELTA, acc, &i).confidence, -10.0);

        i.roster = Some(&down);
        let acc = run(VOLUME, Accumulator::new(50.0), &i);
        assert_eq!(run(ROSTER_DELTA, acc, &i).confidence, 40.0);

        let unchanged = RosterDelta::unchanged();
        i.roster = Some(&unchanged);
        assert_eq!(
            run(ROSTER_DELTA, Accumulator::new(50.0), &i).confidence,
            50.0
        );
    }

    #[test]
    fn confidence_is_clamped_for_extreme_adjustments() {
        let high = ScoringWeights {
            base_confidence: 1000.0,
            ..ScoringWeights::default()
        };
        let low = ScoringWeights {
            base_confidence: -1000.0,
            ..ScoringWeights::default()
        };
        let i = inputs(Direction::Over, 20.0, 20.0);
        assert_eq!(ConfidenceScorer::slate(high).score(&i).confidence, 99);
        assert_eq!(ConfidenceScorer::slate(low).score(&i).confidence, 5);
        assert_eq!(clamp_confidence(f64::NAN, 5, 99), 5);
    }

    #[test]
    fn clamp_truncates_before_bounding() {
        assert_eq!(clamp_confidence(64.9, 5, 99), 64);
        assert_eq!(clamp_confidence(99.9, 5, 99), 99);
        assert_eq!(clamp_confidence(5.5, 5, 99), 5);
    }

    #[test]
    fn scorer_records_rule_trace_in_order() {
        let delta = RosterDelta {
            tag: RosterTag::UsageUp,
            teammate: Some("C. Center".to_string()),
        };
        let i = ScoringInputs {
            direction: Direction::Over,
            threshold: 20.0,
            season_average: 24.0,
            efficiency: Some(EfficiencySignal {
                break_probability: 50.0,
                direction: Direction::Over,
            }),
            rest: Some(RestStatus {
                entity_played_yesterday: true,
                opponent_played_yesterday: false,
            }),
            roster: Some(&delta),
        };
        let score = ConfidenceScorer::slate(ScoringWeights::default()).score(&i);
        let names: Vec<_> = score.applied.iter().map(|(n, _)| *n).collect();
        assert_eq!(names, vec!["efficiency", "volume", "fatigue", "roster_delta"]);
        // 50 + 15 + 30 - 15 + 25
        assert_eq!(score.raw, 105.0);
        assert_eq!(score.confidence, 99);
    }

    #[test]
    fn single_entity_scorer_skips_slate_rules() {
        let scorer = ConfidenceScorer::single_entity(ScoringWeights::default());
        assert_eq!(scorer.rule_names(), vec!["efficiency", "volume"]);
        let score = scorer.score(&inputs(Direction::Under, 20.0, 10.0));
        assert_eq!(score.confidence, 80);
        assert!(score.notes.fatigue.is_none());
        assert!(score.notes.roster.is_none());
    }
}
