//! Input dataset snapshot
//!
//! The data directory holds JSON exports produced by an external fetcher:
//! - `player_logs.json`: per-player game rows
//! - `team_logs.json`: per-team game rows
//! - `season_lines.json`: season aggregate rows
//! - `schedule.json`: the slate's fixture list (optional)
//! - `injuries.json`: names listed as unavailable (optional)
//!
//! `SharedDataset` guards the snapshot with a read-write lock so analyses
//! never observe a half-applied refresh.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{RwLock, RwLockReadGuard};
use tracing::{debug, info};

use crate::analysis::backtest::RealizedOutcomes;
use crate::analysis::slate::CandidateSpec;
use crate::domain::{GameLog, Metric, RestCalendar, Schedule, SeasonLine};
use crate::error::{Result, StreakError};

pub const PLAYER_LOGS_FILE: &str = "player_logs.json";
pub const TEAM_LOGS_FILE: &str = "team_logs.json";
pub const SEASON_LINES_FILE: &str = "season_lines.json";
pub const SCHEDULE_FILE: &str = "schedule.json";
pub const INJURIES_FILE: &str = "injuries.json";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub player_logs: Vec<GameLog>,
    pub team_logs: Vec<GameLog>,
    pub season_lines: Vec<SeasonLine>,
    #[serde(default)]
    pub schedule: Schedule,
    #[serde(default)]
    pub injured: Vec<String>,
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        StreakError::InvalidInput(format!("cannot read {}: {e}", path.display()))
    })?;
    Ok(serde_json::from_str(&content)?)
}

async fn read_json_or_default<T: DeserializeOwned + Default>(path: &Path) -> Result<T> {
    if !path.exists() {
        debug!(path = %path.display(), "optional data file missing");
        return Ok(T::default());
    }
    read_json(path).await
}

impl Dataset {
    /// Load every data file from `dir`. Schedule and injuries are optional.
    pub async fn load_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let dataset = Self {
            player_logs: read_json(&dir.join(PLAYER_LOGS_FILE)).await?,
            team_logs: read_json(&dir.join(TEAM_LOGS_FILE)).await?,
            season_lines: read_json(&dir.join(SEASON_LINES_FILE)).await?,
            schedule: read_json_or_default(&dir.join(SCHEDULE_FILE)).await?,
            injured: read_json_or_default(&dir.join(INJURIES_FILE)).await?,
        };
        info!(
            player_rows = dataset.player_logs.len(),
            team_rows = dataset.team_logs.len(),
            season_lines = dataset.season_lines.len(),
            games = dataset.schedule.games.len(),
            injured = dataset.injured.len(),
            "dataset loaded"
        );
        Ok(dataset)
    }

    pub fn injured_set(&self) -> HashSet<String> {
        self.injured.iter().cloned().collect()
    }

    pub fn rest_calendar(&self) -> RestCalendar {
        RestCalendar::from_team_logs(&self.team_logs)
    }

    /// One team's rows by name (case-insensitive), in date order.
    pub fn team_series(&self, team_name: &str) -> Vec<GameLog> {
        let wanted = team_name.trim();
        let mut rows: Vec<GameLog> = self
            .team_logs
            .iter()
            .filter(|l| l.entity_name.eq_ignore_ascii_case(wanted))
            .cloned()
            .collect();
        rows.sort_by_key(|l| l.game_date);
        rows
    }

    pub fn realized_points(&self) -> RealizedOutcomes {
        RealizedOutcomes::from_logs(&self.player_logs, Metric::Points)
    }
}

/// Dataset behind a read-write lock, cheap to clone across tasks
#[derive(Clone, Default)]
pub struct SharedDataset {
    inner: Arc<RwLock<Dataset>>,
}

impl SharedDataset {
    pub fn new(dataset: Dataset) -> Self {
        Self {
            inner: Arc::new(RwLock::new(dataset)),
        }
    }

    /// Hold the returned guard for the whole analysis.
    pub async fn read(&self) -> RwLockReadGuard<'_, Dataset> {
        self.inner.read().await
    }

    /// Swap in a new snapshot once in-flight readers finish.
    pub async fn replace(&self, dataset: Dataset) {
        *self.inner.write().await = dataset;
        debug!("dataset snapshot replaced");
    }

    /// Load `dir` outside the lock, then swap it in.
    pub async fn refresh_from<P: AsRef<Path>>(&self, dir: P) -> Result<()> {
        let dataset = Dataset::load_dir(dir).await?;
        self.replace(dataset).await;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct SpecFile {
    thresholds: BTreeMap<String, f64>,
}

/// Parse a TOML file of `[thresholds]` entity name -> middle threshold.
pub async fn read_candidate_specs<P: AsRef<Path>>(path: P) -> Result<Vec<CandidateSpec>> {
    let content = tokio::fs::read_to_string(path.as_ref()).await?;
    parse_candidate_specs(&content)
}

pub fn parse_candidate_specs(content: &str) -> Result<Vec<CandidateSpec>> {
    let file: SpecFile = toml::from_str(content)?;
    file.thresholds
        .into_iter()
        .map(|(entity_name, middle_threshold)| {
            if !middle_threshold.is_finite() || middle_threshold <= 0.0 {
                return Err(StreakError::InvalidInput(format!(
                    "threshold for {entity_name} must be positive, got {middle_threshold}"
                )));
            }
            Ok(CandidateSpec {
                entity_name,
                middle_threshold,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn team_row(name: &str, team: u64, d: u32) -> GameLog {
        GameLog {
            entity_id: team,
            entity_name: name.to_string(),
            team_id: team,
            game_id: format!("G{team}{d}"),
            game_date: NaiveDate::from_ymd_opt(2025, 11, d).unwrap(),
            opponent_team_id: None,
            points: Some(110.0),
            field_goal_pct: Some(0.47),
            result: None,
        }
    }

    #[tokio::test]
    async fn load_dir_requires_core_files_only() {
        let dir = tempfile::tempdir().unwrap();
        let rows = vec![team_row("Boston Celtics", 1, 4), team_row("Boston Celtics", 1, 2)];
        std::fs::write(dir.path().join(PLAYER_LOGS_FILE), "[]").unwrap();
        std::fs::write(
            dir.path().join(TEAM_LOGS_FILE),
            serde_json::to_string(&rows).unwrap(),
        )
        .unwrap();
        std::fs::write(dir.path().join(SEASON_LINES_FILE), "[]").unwrap();

        let ds = Dataset::load_dir(dir.path()).await.unwrap();
        assert!(ds.schedule.is_empty());
        assert!(ds.injured.is_empty());

        let series = ds.team_series("boston celtics");
        assert_eq!(series.len(), 2);
        assert!(series[0].game_date < series[1].game_date);
        let yesterday = NaiveDate::from_ymd_opt(2025, 11, 4).unwrap();
        assert!(ds.rest_calendar().played_on(1, yesterday));
    }

    #[tokio::test]
    async fn missing_core_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Dataset::load_dir(dir.path()).await.unwrap_err();
        assert!(matches!(err, StreakError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn replace_waits_for_readers() {
        let shared = SharedDataset::new(Dataset::default());
        let guard = shared.read().await;

        let writer = shared.clone();
        let handle = tokio::spawn(async move {
            writer
                .replace(Dataset {
                    injured: vec!["A".to_string()],
                    ..Dataset::default()
                })
                .await;
        });

        tokio::task::yield_now().await;
        assert!(guard.injured.is_empty());
        drop(guard);

        handle.await.unwrap();
        assert_eq!(shared.read().await.injured, vec!["A".to_string()]);
    }

    #[test]
    fn specs_parse_and_reject_bad_thresholds() {
        let specs = parse_candidate_specs(
            r#"
[thresholds]
"Jayson Tatum" = 27.5
"Derrick White" = 15.5
"#,
        )
        .unwrap();
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].entity_name, "Derrick White");

        assert!(parse_candidate_specs("[thresholds]\nX = -2.0\n").is_err());
        assert!(parse_candidate_specs("thresholds = 3").is_err());
    }
}
