use crate::collection::{Collection, CollectionConfig, ConfigStore};
use crate::error::{PackripError, Result};
use crate::storage::Storage;
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use std::sync::Arc;

/// Per-channel collection configs, stored as the JSON the dashboard syncs.
pub struct CollectionStore {
    storage: Arc<Storage>,
}

impl CollectionStore {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl ConfigStore for CollectionStore {
    async fn active_collection(&self, channel_id: &str) -> Result<Collection> {
        let config = self.load_config(channel_id).await?.ok_or_else(|| {
            PackripError::collection(format!("No config synced for channel '{}'", channel_id))
        })?;

        Ok(config.active()?.clone())
    }

    async fn save_config(&self, channel_id: &str, config: &CollectionConfig) -> Result<()> {
        config.validate()?;
        let raw = serde_json::to_string(config)?;

        let conn = self.storage.get_connection().await;
        conn.execute(
            "INSERT OR REPLACE INTO collection_configs (channel_id, config, updated_at)
             VALUES (?1, ?2, ?3)",
            params![channel_id, raw, Utc::now().timestamp()],
        )?;

        tracing::info!(
            "Synced {} collection(s) for channel {}",
            config.collections.len(),
            channel_id
        );
        Ok(())
    }

    async fn load_config(&self, channel_id: &str) -> Result<Option<CollectionConfig>> {
        let conn = self.storage.get_connection().await;

        let raw: Option<String> = conn
            .query_row(
                "SELECT config FROM collection_configs WHERE channel_id = ?1",
                params![channel_id],
                |row| row.get(0),
            )
            .optional()?;

        match raw {
            Some(raw) => Ok(Some(CollectionConfig::from_json(&raw)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Item, RarityTier};
    use tempfile::tempdir;

    async fn store(dir: &tempfile::TempDir) -> CollectionStore {
        let storage = Storage::new(&dir.path().join("packrip.db")).await.unwrap();
        CollectionStore::new(Arc::new(storage))
    }

    fn config(default_id: &str, card: &str) -> CollectionConfig {
        CollectionConfig::new(
            vec![Collection::new(
                "base",
                vec![RarityTier::new("Common", 1)],
                vec![Item::new(card, "Common", 1.0)],
            )],
            default_id,
        )
    }

    #[tokio::test]
    async fn test_missing_config_is_configuration_error() {
        let dir = tempdir().unwrap();
        let store = store(&dir).await;

        let err = store.active_collection("chan").await.unwrap_err();
        assert!(err.is_configuration());
    }

    #[tokio::test]
    async fn test_resync_replaces_config() {
        let dir = tempdir().unwrap();
        let store = store(&dir).await;

        store.save_config("chan", &config("base", "Slime")).await.unwrap();
        assert_eq!(store.active_collection("chan").await.unwrap().items[0].name, "Slime");

        store.save_config("chan", &config("base", "Goblin")).await.unwrap();
        assert_eq!(store.active_collection("chan").await.unwrap().items[0].name, "Goblin");
    }

    #[tokio::test]
    async fn test_invalid_config_rejected_on_sync() {
        let dir = tempdir().unwrap();
        let store = store(&dir).await;

        let err = store.save_config("chan", &config("missing", "Slime")).await.unwrap_err();
        assert!(err.is_configuration());
        assert!(store.load_config("chan").await.unwrap().is_none());
    }
}
