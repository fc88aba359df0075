//! Persistence for the surrounding application
//!
//! The analysis core never touches these stores directly:
//! - Analysis log: ranked candidates per slate date, for later backtests
//! - Threshold cache: last middle threshold per entity
//! - Dataset: JSON inputs behind a read-write lock

pub mod analysis_log;
pub mod dataset;
pub mod threshold_cache;

pub use analysis_log::{AnalysisLogEntry, AnalysisLogStore};
pub use dataset::{parse_candidate_specs, read_candidate_specs, Dataset, SharedDataset};
pub use threshold_cache::ThresholdCache;
