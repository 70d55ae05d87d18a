//! packrip core - collections, weighted rarity draws and the viewer ledger
//!
//! This crate holds everything a pack opening needs that is not tied to a
//! participation window: the collection model synced from the streamer's
//! dashboard, the rarity draw, and durable per-viewer collections.

pub mod award;
pub mod collection;
pub mod config;
pub mod draw;
pub mod error;
pub mod ledger;
pub mod storage;
pub mod types;

pub use award::{rip_card, Award};
pub use collection::{Collection, CollectionConfig, ConfigStore};
pub use config::{BroadcastSettings, ServiceConfig, WindowSettings};
pub use draw::{draw, draw_from_collection, tier_weights};
pub use error::{PackripError, Result};
pub use ledger::CollectionLedger;
pub use storage::{CollectionStore, LedgerStore, Storage};
pub use types::{DrawResult, Item, LeaderboardEntry, RarityTier, ViewerRecord};
