//! Date-keyed log of ranked analysis runs
//!
//! One JSON file maps each slate date to the ranked candidate list produced
//! that day and the probability floor in force, so a later backtest can
//! re-derive the same top list.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::domain::Candidate;
use crate::error::Result;

/// One stored analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisLogEntry {
    pub recorded_at: DateTime<Utc>,
    pub min_probability: f64,
    /// Ranked, as produced by the slate run
    pub candidates: Vec<Candidate>,
}

/// JSON-file store of analysis runs keyed by slate date
pub struct AnalysisLogStore {
    path: PathBuf,
    entries: RwLock<BTreeMap<NaiveDate, AnalysisLogEntry>>,
}

impl AnalysisLogStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Load existing entries from file
    pub async fn load(&self) -> Result<()> {
        if !self.path.exists() {
            debug!(path = ?self.path, "no analysis log yet, starting fresh");
            return Ok(());
        }

        let content = tokio::fs::read_to_string(&self.path).await?;
        let entries: BTreeMap<NaiveDate, AnalysisLogEntry> = serde_json::from_str(&content)?;
        info!(dates = entries.len(), "loaded analysis log");

        *self.entries.write().await = entries;
        Ok(())
    }

    /// Save entries to file
    pub async fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let entries = self.entries.read().await;
        let content = serde_json::to_string_pretty(&*entries)?;
        tokio::fs::write(&self.path, content).await?;

        debug!(dates = entries.len(), path = ?self.path, "saved analysis log");
        Ok(())
    }

    /// Store a run, replacing any earlier run for the same date
    pub async fn record(&self, date: NaiveDate, min_probability: f64, candidates: Vec<Candidate>) {
        let entry = AnalysisLogEntry {
            recorded_at: Utc::now(),
            min_probability,
            candidates,
        };
        let replaced = self.entries.write().await.insert(date, entry).is_some();
        debug!(%date, replaced, "recorded analysis run");
    }

    pub async fn get(&self, date: NaiveDate) -> Option<AnalysisLogEntry> {
        self.entries.read().await.get(&date).cloned()
    }

    /// Stored dates, newest first
    pub async fn dates(&self) -> Vec<NaiveDate> {
        self.entries.read().await.keys().rev().copied().collect()
    }

    pub async fn entries(&self) -> BTreeMap<NaiveDate, AnalysisLogEntry> {
        self.entries.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Direction, FactorNotes, RosterTag};

    fn candidate(id: u64) -> Candidate {
        Candidate {
            entity_id: id,
            entity_name: format!("P{id}"),
            threshold: 18.5,
            direction: Direction::Under,
            break_probability: 80.0,
            confidence: 65,
            synergy: 0.52,
            group_key: Some("0022500101".to_string()),
            streak_length: 3,
            season_average: 16.0,
            efficiency_ratio: 0.44,
            roster_tag: RosterTag::UsageDown,
            notes: FactorNotes::default(),
        }
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 11, d).unwrap()
    }

    #[tokio::test]
    async fn entries_survive_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("analysis_log.json");

        let store = AnalysisLogStore::new(path.clone());
        store.record(date(3), 75.0, vec![candidate(1), candidate(2)]).await;
        store.record(date(5), 70.0, vec![candidate(3)]).await;
        store.save().await.unwrap();

        let reloaded = AnalysisLogStore::new(path);
        reloaded.load().await.unwrap();
        assert_eq!(reloaded.dates().await, vec![date(5), date(3)]);
        let entry = reloaded.get(date(3)).await.unwrap();
        assert_eq!(entry.candidates.len(), 2);
        assert_eq!(entry.min_probability, 75.0);
        assert_eq!(entry.candidates[0].roster_tag, RosterTag::UsageDown);
    }

    #[tokio::test]
    async fn recording_same_date_replaces_run() {
        let dir = tempfile::tempdir().unwrap();
        let store = AnalysisLogStore::new(dir.path().join("log.json"));
        store.record(date(3), 75.0, vec![candidate(1)]).await;
        store.record(date(3), 75.0, vec![candidate(7), candidate(8)]).await;
        assert_eq!(store.len().await, 1);
        assert_eq!(store.get(date(3)).await.unwrap().candidates[0].entity_id, 7);
    }

    #[tokio::test]
    async fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = AnalysisLogStore::new(dir.path().join("absent.json"));
        store.load().await.unwrap();
        assert!(store.is_empty().await);
    }
}
