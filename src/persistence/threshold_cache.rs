//! Last-used middle thresholds per entity
//!
//! The cache is tied to the slate's entity-list key: when the slate changes
//! to a different set of entities the stored thresholds are dropped.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::analysis::slate::CandidateSpec;
use crate::error::Result;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct CacheState {
    #[serde(default)]
    entity_key: String,
    #[serde(default)]
    thresholds: BTreeMap<String, f64>,
}

/// JSON-file cache of entity name -> middle threshold
pub struct ThresholdCache {
    path: PathBuf,
    state: RwLock<CacheState>,
}

impl ThresholdCache {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            state: RwLock::new(CacheState::default()),
        }
    }

    pub async fn load(&self) -> Result<()> {
        if !self.path.exists() {
            debug!(path = ?self.path, "no threshold cache yet");
            return Ok(());
        }
        let content = tokio::fs::read_to_string(&self.path).await?;
        let state: CacheState = serde_json::from_str(&content)?;
        info!(entries = state.thresholds.len(), "loaded threshold cache");
        *self.state.write().await = state;
        Ok(())
    }

    pub async fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let state = self.state.read().await;
        tokio::fs::write(&self.path, serde_json::to_string_pretty(&*state)?).await?;
        debug!(entries = state.thresholds.len(), "saved threshold cache");
        Ok(())
    }

    /// Adopt `entity_key`; returns true when it differed and the cache was reset.
    pub async fn sync_key(&self, entity_key: &str) -> bool {
        let mut state = self.state.write().await;
        if state.entity_key == entity_key {
            return false;
        }
        info!(
            dropped = state.thresholds.len(),
            "entity list changed, resetting threshold cache"
        );
        state.entity_key = entity_key.to_string();
        state.thresholds.clear();
        true
    }

    /// Remember the middle threshold of every requested entity.
    pub async fn remember(&self, specs: &[CandidateSpec]) {
        let mut state = self.state.write().await;
        for spec in specs {
            state
                .thresholds
                .insert(spec.entity_name.clone(), spec.middle_threshold);
        }
    }

    pub async fn specs(&self) -> Vec<CandidateSpec> {
        self.state
            .read()
            .await
            .thresholds
            .iter()
            .map(|(name, t)| CandidateSpec {
                entity_name: name.clone(),
                middle_threshold: *t,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn key_change_resets_thresholds() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ThresholdCache::new(dir.path().join("cache.json"));

        assert!(cache.sync_key("A|B").await);
        cache
            .remember(&[CandidateSpec {
                entity_name: "A".to_string(),
                middle_threshold: 21.5,
            }])
            .await;
        assert!(!cache.sync_key("A|B").await);
        assert_eq!(cache.specs().await[0].middle_threshold, 21.5);

        assert!(cache.sync_key("A|C").await);
        assert!(cache.specs().await.is_empty());
    }

    #[tokio::test]
    async fn cache_round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");

        let cache = ThresholdCache::new(path.clone());
        cache.sync_key("A|B").await;
        cache
            .remember(&[
                CandidateSpec {
                    entity_name: "B".to_string(),
                    middle_threshold: 12.5,
                },
                CandidateSpec {
                    entity_name: "A".to_string(),
                    middle_threshold: 20.5,
                },
            ])
            .await;
        cache.save().await.unwrap();

        let reloaded = ThresholdCache::new(path);
        reloaded.load().await.unwrap();
        assert!(!reloaded.sync_key("A|B").await);
        let names: Vec<String> = reloaded
            .specs()
            .await
            .into_iter()
            .map(|s| s.entity_name)
            .collect();
        assert_eq!(names, vec!["A".to_string(), "B".to_string()]);
    }
}
