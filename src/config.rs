use chrono::NaiveDate;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::analysis::confidence::ScoringWeights;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub scoring: ScoringWeights,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Batch analysis settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Half-width of the threshold band around each middle threshold
    pub analysis_range: f64,
    /// Break probability floor for diversity selection
    pub minimum_pattern_probability: f64,
    /// Slate entries kept per team, ranked by minutes per game
    pub top_n_per_group: usize,
    /// Teammates per team (by field goal attempts) watched for roster changes
    pub key_teammates_per_team: usize,
    /// Diverse picks surfaced for a slate
    pub top_picks: usize,
    /// Diverse picks scored as the top list in backtests
    pub backtest_top_k: usize,
    /// Games since season start required to count as active
    pub min_games_active: usize,
    pub season_start: Option<NaiveDate>,
    /// Local hour before which the slate belongs to the previous day
    pub rollover_hour: u32,
    /// Fixed seed for the tie-break shuffle
    pub tie_break_seed: Option<u64>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            analysis_range: 4.0,
            minimum_pattern_probability: 75.0,
            top_n_per_group: 5,
            key_teammates_per_team: 3,
            top_picks: 2,
            backtest_top_k: 4,
            min_games_active: 3,
            season_start: None,
            rollover_hour: 7,
            tie_break_seed: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub log_file: String,
    pub cache_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            log_file: "analysis_log.json".to_string(),
            cache_file: "threshold_cache.json".to_string(),
        }
    }
}

impl StorageConfig {
    pub fn log_path(&self) -> PathBuf {
        self.data_dir.join(&self.log_file)
    }

    pub fn cache_path(&self) -> PathBuf {
        self.data_dir.join(&self.cache_file)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable JSON formatted logs
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Environment-specific file, e.g. config/backtest.toml
            .add_source(
                File::from(config_dir.join(
                    std::env::var("STREAKLINE_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // STREAKLINE__ANALYSIS__ANALYSIS_RANGE=3 etc.
            .add_source(
                Environment::with_prefix("STREAKLINE")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        let a = &self.analysis;

        if a.analysis_range.is_nan() || a.analysis_range < 0.0 {
            errors.push("analysis_range must be non-negative".to_string());
        }

        if !(0.0..=100.0).contains(&a.minimum_pattern_probability) {
            errors.push("minimum_pattern_probability must be between 0 and 100".to_string());
        }

        if a.top_picks == 0 || a.backtest_top_k == 0 {
            errors.push("top_picks and backtest_top_k must be at least 1".to_string());
        }

        if a.top_n_per_group == 0 {
            errors.push("top_n_per_group must be at least 1".to_string());
        }

        if a.rollover_hour > 23 {
            errors.push(format!("rollover_hour {} is not an hour of the day", a.rollover_hour));
        }

        let s = &self.scoring;
        if s.min_confidence > s.max_confidence {
            errors.push(format!(
                "min_confidence {} exceeds max_confidence {}",
                s.min_confidence, s.max_confidence
            ));
        }

        if s.volume_tolerance < 0.0 {
            errors.push("volume_tolerance must be non-negative".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = AppConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.analysis.analysis_range, 4.0);
        assert_eq!(cfg.analysis.minimum_pattern_probability, 75.0);
        assert_eq!(cfg.scoring.base_confidence, 50.0);
        assert_eq!(cfg.storage.log_path(), PathBuf::from("data/analysis_log.json"));
    }

    #[test]
    fn file_overrides_only_named_keys() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("default.toml"),
            r#"
[analysis]
analysis_range = 3.0
season_start = "2025-09-01"

[scoring]
usage_delta_weight = 20.0
"#,
        )
        .unwrap();

        let cfg = AppConfig::load_from(dir.path()).unwrap();
        assert_eq!(cfg.analysis.analysis_range, 3.0);
        assert_eq!(cfg.analysis.top_n_per_group, 5);
        assert_eq!(
            cfg.analysis.season_start,
            NaiveDate::from_ymd_opt(2025, 9, 1)
        );
        assert_eq!(cfg.scoring.usage_delta_weight, 20.0);
        assert_eq!(cfg.scoring.volume_negative, -35.0);
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn validate_collects_every_violation() {
        let mut cfg = AppConfig::default();
        cfg.analysis.analysis_range = -1.0;
        cfg.analysis.minimum_pattern_probability = 120.0;
        cfg.analysis.backtest_top_k = 0;
        cfg.scoring.min_confidence = 100;

        let errors = cfg.validate().unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors[0].contains("analysis_range"));
    }
}
