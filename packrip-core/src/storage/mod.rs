pub mod collection_store;
pub mod ledger_store;

pub use collection_store::CollectionStore;
pub use ledger_store::LedgerStore;

use crate::error::{PackripError, Result};
use rusqlite::Connection;
use std::path::Path;
use tokio::sync::Mutex;

/// SQLite database shared by the ledger and the collection store.
///
/// All access goes through one connection behind an async mutex, which also
/// serializes concurrent writers to the same viewer.
pub struct Storage {
    conn: Mutex<Connection>,
}

impl Storage {
    pub async fn new(db_path: &Path) -> Result<Self> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                PackripError::internal(format!("Failed to create directory: {}", e))
            })?;
        }

        let conn = Connection::open(db_path)?;
        let storage = Self {
            conn: Mutex::new(conn),
        };

        storage.init_schema().await?;
        Ok(storage)
    }

    async fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock().await;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS collection_configs (
                channel_id TEXT PRIMARY KEY,
                config TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            )",
            [],
        )?;

        // seq doubles as first-seen order for leaderboard ties
        conn.execute(
            "CREATE TABLE IF NOT EXISTS viewers (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                channel_id TEXT NOT NULL,
                viewer_id TEXT NOT NULL,
                card_count INTEGER NOT NULL DEFAULT 0,
                total_value REAL NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL,
                UNIQUE (channel_id, viewer_id)
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS viewer_cards (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                channel_id TEXT NOT NULL,
                viewer_id TEXT NOT NULL,
                card TEXT NOT NULL,
                acquired_at INTEGER NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_viewer_cards_owner
                ON viewer_cards (channel_id, viewer_id, id)",
            [],
        )?;

        Ok(())
    }

    pub async fn get_connection(&self) -> tokio::sync::MutexGuard<'_, Connection> {
        self.conn.lock().await
    }
}
