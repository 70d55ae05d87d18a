use crate::error::{PackripError, Result};
use crate::ledger::CollectionLedger;
use crate::storage::Storage;
use crate::types::{total_value, Item, LeaderboardEntry, ViewerRecord};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection};
use std::sync::Arc;

pub struct LedgerStore {
    storage: Arc<Storage>,
}

impl LedgerStore {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }
}

fn load_cards(conn: &Connection, channel_id: &str, viewer_id: &str) -> Result<Vec<Item>> {
    let mut stmt = conn.prepare(
        "SELECT card FROM viewer_cards
         WHERE channel_id = ?1 AND viewer_id = ?2
         ORDER BY id ASC",
    )?;

    let rows = stmt.query_map(params![channel_id, viewer_id], |row| row.get::<_, String>(0))?;

    let mut items = Vec::new();
    for raw in rows {
        items.push(serde_json::from_str(&raw?)?);
    }

    Ok(items)
}

#[async_trait]
impl CollectionLedger for LedgerStore {
    async fn append(&self, channel_id: &str, viewer_id: &str, item: &Item) -> Result<ViewerRecord> {
        let card = serde_json::to_string(item)?;
        let now = Utc::now().timestamp();

        let mut conn = self.storage.get_connection().await;
        let tx = conn
            .transaction()
            .map_err(|e| PackripError::persist(format!("Failed to begin transaction: {}", e)))?;

        tx.execute(
            "INSERT OR IGNORE INTO viewers (channel_id, viewer_id, created_at)
             VALUES (?1, ?2, ?3)",
            params![channel_id, viewer_id, now],
        )?;

        tx.execute(
            "INSERT INTO viewer_cards (channel_id, viewer_id, card, acquired_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![channel_id, viewer_id, card, now],
        )?;

        // Recompute from scratch so the stored total never drifts
        let items = load_cards(&tx, channel_id, viewer_id)?;
        let total = total_value(&items);

        tx.execute(
            "UPDATE viewers SET card_count = ?3, total_value = ?4
             WHERE channel_id = ?1 AND viewer_id = ?2",
            params![channel_id, viewer_id, items.len() as i64, total],
        )?;

        tx.commit()
            .map_err(|e| PackripError::persist(format!("Failed to commit card: {}", e)))?;

        tracing::debug!(
            "Appended '{}' to {}/{} ({} cards, total {:.2})",
            item.name,
            channel_id,
            viewer_id,
            items.len(),
            total
        );

        Ok(ViewerRecord {
            viewer_id: viewer_id.to_string(),
            items,
            total_value: total,
        })
    }

    async fn get(&self, channel_id: &str, viewer_id: &str) -> Result<ViewerRecord> {
        let conn = self.storage.get_connection().await;
        let items = load_cards(&conn, channel_id, viewer_id)?;
        Ok(ViewerRecord::from_items(viewer_id, items))
    }

    async fn top_n(&self, channel_id: &str, n: usize) -> Result<Vec<LeaderboardEntry>> {
        let conn = self.storage.get_connection().await;

        let mut stmt = conn.prepare(
            "SELECT viewer_id, card_count, total_value FROM viewers
             WHERE channel_id = ?1
             ORDER BY total_value DESC, seq ASC
             LIMIT ?2",
        )?;

        let entries = stmt.query_map(params![channel_id, n as i64], |row| {
            Ok(LeaderboardEntry {
                viewer_id: row.get(0)?,
                card_count: row.get::<_, i64>(1)? as u64,
                total_value: row.get(2)?,
            })
        })?;

        let mut leaderboard = Vec::new();
        for entry in entries {
            leaderboard.push(entry?);
        }

        Ok(leaderboard)
    }
}
