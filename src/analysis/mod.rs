//! Streak analysis and candidate scoring
//!
//! Pipeline, leaf first:
//! - `streaks`: run-length streaks over a threshold series
//! - `reversion`: break probability of the current streak
//! - `confidence`: rule-list confidence scoring
//! - `ranking`: three-key sort, top-tie shuffle, diverse top-K
//! - `backtest`: settle stored candidates against realized results
//!
//! `slate` and `team` assemble these into the batch and report entry points.

pub mod backtest;
pub mod confidence;
pub mod ranking;
pub mod reversion;
pub mod slate;
pub mod streaks;
pub mod team;

pub use backtest::{
    evaluate_all, evaluate_backtest, BacktestEntry, BacktestReport, BacktestSummary, Outcome,
    RealizedOutcomes, Tally,
};
pub use confidence::{ConfidenceScore, ConfidenceScorer, RosterDelta, ScoringWeights};
pub use ranking::{rank_candidates, select_diverse, tie_break_rng, Ranking};
pub use reversion::{estimate_reversion, BreakDirection, Reversion, ReversionSignal};
pub use slate::{
    analyze_entity_range, build_slate, effective_slate_date, score_full_slate,
    score_single_threshold, CandidateSpec, RangeAnalysis, SkipNotice, Slate, SlateEntry,
    SlateInputs, SlateOutcome,
};
pub use streaks::{extract_streaks, Classification, Streak, StreakAnalysis, StreakReport};
pub use team::{analyze_team, win_loss_streaks, TeamReport, WinLossSummary};
