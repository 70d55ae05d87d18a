use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A named rarity category. Lower ranks are more common.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RarityTier {
    pub name: String,
    #[serde(default, alias = "rank", skip_serializing_if = "Option::is_none")]
    pub ordinal_rank: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RarityTier {
    pub fn new(name: impl Into<String>, ordinal_rank: u32) -> Self {
        Self {
            name: name.into(),
            ordinal_rank: Some(ordinal_rank),
            extra: Map::new(),
        }
    }
}

/// A collectible card as configured by the streamer.
///
/// The price is kept exactly as it was configured so that records written
/// from hand-edited configs survive a round trip. Use [`Item::price_value`]
/// for arithmetic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub name: String,
    pub rarity: String,
    #[serde(default)]
    pub price: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Item {
    pub fn new(name: impl Into<String>, rarity: impl Into<String>, price: f64) -> Self {
        Self {
            name: name.into(),
            rarity: rarity.into(),
            price: Value::from(price),
            extra: Map::new(),
        }
    }

    /// Numeric contribution of this card to a viewer's total value.
    ///
    /// Numbers and numeric strings count when finite and non-negative.
    /// Anything else contributes 0.
    pub fn price_value(&self) -> f64 {
        let parsed = match &self.price {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };

        match parsed {
            Some(price) if price.is_finite() && price >= 0.0 => price,
            _ => 0.0,
        }
    }
}

/// Sum of card prices, recomputed from scratch.
pub fn total_value<'a>(items: impl IntoIterator<Item = &'a Item>) -> f64 {
    items.into_iter().map(Item::price_value).sum()
}

/// A viewer's collection within one channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewerRecord {
    pub viewer_id: String,
    pub items: Vec<Item>,
    pub total_value: f64,
}

impl ViewerRecord {
    pub fn empty(viewer_id: impl Into<String>) -> Self {
        Self {
            viewer_id: viewer_id.into(),
            items: Vec::new(),
            total_value: 0.0,
        }
    }

    pub fn from_items(viewer_id: impl Into<String>, items: Vec<Item>) -> Self {
        let total_value = total_value(&items);
        Self {
            viewer_id: viewer_id.into(),
            items,
            total_value,
        }
    }

    pub fn card_count(&self) -> usize {
        self.items.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub viewer_id: String,
    pub card_count: u64,
    pub total_value: f64,
}

/// Outcome of one draw for one viewer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawResult {
    pub viewer_id: String,
    pub rarity: String,
    pub item: Item,
}
