use crate::collection::ConfigStore;
use crate::draw::draw_from_collection;
use crate::error::{PackripError, Result};
use crate::ledger::CollectionLedger;
use crate::types::{DrawResult, ViewerRecord};
use serde::{Deserialize, Serialize};

/// A card drawn for a viewer and the record it was appended to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Award {
    pub result: DrawResult,
    pub record: ViewerRecord,
}

/// Draw a card from the channel's active collection and persist it
/// immediately, outside of any window.
pub async fn rip_card(
    config_store: &dyn ConfigStore,
    ledger: &dyn CollectionLedger,
    channel_id: &str,
    viewer_id: &str,
) -> Result<Award> {
    let collection = config_store.active_collection(channel_id).await?;

    // keep the thread rng out of the await points below
    let result = {
        let mut rng = rand::thread_rng();
        draw_from_collection(&collection, viewer_id, &mut rng)?
    };

    let record = ledger
        .append(channel_id, viewer_id, &result.item)
        .await
        .map_err(|e| match e {
            PackripError::Persist(_) => e,
            other => PackripError::persist(other.to_string()),
        })?;

    tracing::info!(
        "Ripped {} card '{}' for {} in {}",
        result.rarity,
        result.item.name,
        viewer_id,
        channel_id
    );

    Ok(Award { result, record })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::{Collection, CollectionConfig};
    use crate::storage::{CollectionStore, LedgerStore, Storage};
    use crate::types::{Item, RarityTier};
    use std::sync::Arc;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_rip_card_appends_to_ledger() {
        let dir = tempdir().unwrap();
        let storage = Arc::new(Storage::new(&dir.path().join("packrip.db")).await.unwrap());
        let configs = CollectionStore::new(storage.clone());
        let ledger = LedgerStore::new(storage);

        configs
            .save_config(
                "chan",
                &CollectionConfig::new(
                    vec![Collection::new(
                        "base",
                        vec![RarityTier::new("Common", 1)],
                        vec![Item::new("Slime", "Common", 2.0)],
                    )],
                    "base",
                ),
            )
            .await
            .unwrap();

        let award = rip_card(&configs, &ledger, "chan", "alice").await.unwrap();
        assert_eq!(award.result.item.name, "Slime");
        assert_eq!(award.record.total_value, 2.0);
        assert_eq!(ledger.get("chan", "alice").await.unwrap().card_count(), 1);
    }

    #[tokio::test]
    async fn test_rip_card_without_cards_is_empty_pool() {
        let dir = tempdir().unwrap();
        let storage = Arc::new(Storage::new(&dir.path().join("packrip.db")).await.unwrap());
        let configs = CollectionStore::new(storage.clone());
        let ledger = LedgerStore::new(storage);

        configs
            .save_config(
                "chan",
                &CollectionConfig::new(
                    vec![Collection::new("base", vec![RarityTier::new("Common", 1)], Vec::new())],
                    "base",
                ),
            )
            .await
            .unwrap();

        let err = rip_card(&configs, &ledger, "chan", "alice").await.unwrap_err();
        assert!(matches!(err, PackripError::EmptyPool));
        assert_eq!(ledger.get("chan", "alice").await.unwrap().card_count(), 0);
    }
}
