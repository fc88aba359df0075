pub mod analysis;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;

pub use analysis::{
    analyze_entity_range, analyze_team, build_slate, estimate_reversion, evaluate_backtest,
    extract_streaks, score_full_slate, score_single_threshold, ScoringWeights,
};
pub use config::AppConfig;
pub use domain::{Candidate, Direction, GameLog, Metric, Schedule, SeasonLine};
pub use error::{Result, SkipReason, StreakError};
pub use persistence::{AnalysisLogStore, Dataset, SharedDataset, ThresholdCache};
