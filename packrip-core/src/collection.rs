use crate::error::{PackripError, Result};
use crate::types::{Item, RarityTier};
use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Source of the collection configuration for a channel.
///
/// Implementations must read the current configuration on every call; the
/// streamer may re-sync it between windows.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// The collection selected by the channel's `defaultCollectionId`.
    async fn active_collection(&self, channel_id: &str) -> Result<Collection>;

    /// Validate and store a new configuration for the channel.
    async fn save_config(&self, channel_id: &str, config: &CollectionConfig) -> Result<()>;

    async fn load_config(&self, channel_id: &str) -> Result<Option<CollectionConfig>>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionConfig {
    #[serde(default)]
    pub collections: Vec<Collection>,
    #[serde(default, deserialize_with = "optional_id")]
    pub default_collection_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    #[serde(deserialize_with = "required_id")]
    pub id: String,
    #[serde(default)]
    pub rarities: Vec<RarityTier>,
    #[serde(default, alias = "cards")]
    pub items: Vec<Item>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CollectionConfig {
    pub fn new(collections: Vec<Collection>, default_collection_id: impl Into<String>) -> Self {
        Self {
            collections,
            default_collection_id: Some(default_collection_id.into()),
            extra: Map::new(),
        }
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Resolve the active collection, failing on any channel-wide problem.
    pub fn active(&self) -> Result<&Collection> {
        if self.collections.is_empty() {
            return Err(PackripError::collection("No collections found in config"));
        }

        let default_id = self
            .default_collection_id
            .as_deref()
            .ok_or_else(|| PackripError::collection("No default collection selected"))?;

        let collection = self
            .collections
            .iter()
            .find(|c| c.id == default_id)
            .ok_or_else(|| PackripError::collection("Default collection not found in config"))?;

        if collection.rarities.is_empty() {
            return Err(PackripError::collection(format!(
                "No rarities defined for collection '{}'",
                collection.id
            )));
        }

        Ok(collection)
    }

    pub fn validate(&self) -> Result<()> {
        let active = self.active()?;

        let unreachable = active.unreachable_items().count();
        if unreachable > 0 {
            tracing::debug!(
                "Collection '{}' has {} card(s) with an undefined rarity; they will never drop",
                active.id,
                unreachable
            );
        }

        Ok(())
    }
}

impl Collection {
    pub fn new(id: impl Into<String>, rarities: Vec<RarityTier>, items: Vec<Item>) -> Self {
        Self {
            id: id.into(),
            rarities,
            items,
            extra: Map::new(),
        }
    }

    /// Rarities ordered from most common to rarest.
    ///
    /// Tiers are ordered by `ordinalRank`; a tier without one takes its
    /// 1-based position in the configured list. Ties keep configured order.
    pub fn ladder(&self) -> Vec<RarityTier> {
        let mut ranked: Vec<(u32, usize, &RarityTier)> = self
            .rarities
            .iter()
            .enumerate()
            .map(|(idx, tier)| (tier.ordinal_rank.unwrap_or(idx as u32 + 1), idx, tier))
            .collect();
        ranked.sort_by_key(|(rank, idx, _)| (*rank, *idx));
        ranked.into_iter().map(|(_, _, tier)| tier.clone()).collect()
    }

    /// Cards grouped by rarity name. Cards naming an unknown rarity are left out.
    pub fn pools(&self) -> HashMap<String, Vec<Item>> {
        let mut pools: HashMap<String, Vec<Item>> = HashMap::new();
        for item in &self.items {
            if self.has_rarity(&item.rarity) {
                pools.entry(item.rarity.clone()).or_default().push(item.clone());
            }
        }
        pools
    }

    pub fn has_rarity(&self, name: &str) -> bool {
        self.rarities.iter().any(|r| r.name == name)
    }

    fn unreachable_items(&self) -> impl Iterator<Item = &Item> {
        self.items.iter().filter(|item| !self.has_rarity(&item.rarity))
    }
}

// Collection ids come from a JS dashboard and may be strings or numbers.
fn id_from_value(value: Value) -> std::result::Result<Option<String>, String> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        other => Err(format!("expected string or number id, got {}", other)),
    }
}

fn required_id<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    id_from_value(value)
        .map_err(serde::de::Error::custom)?
        .ok_or_else(|| serde::de::Error::custom("collection id cannot be null"))
}

fn optional_id<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    id_from_value(value).map_err(serde::de::Error::custom)
}
