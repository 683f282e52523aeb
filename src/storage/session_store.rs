use rusqlite::{OptionalExtension, Result as SqlResult, params};
use std::path::Path;

use super::database::Database;
use crate::common::{ChatMessage, User};
use crate::error::ClientResult;

pub const TOKEN_KEY: &str = "token";
pub const CURRENT_USER_KEY: &str = "currentUser";

pub fn messages_key(chat_id: i64) -> String {
    format!("messages_{chat_id}")
}

/// Persistent key/value store for the bearer token, the cached current user
/// and per-chat message snapshots. Values are stored as text (JSON for records).
pub struct SessionStore {
    db: Database,
}

impl SessionStore {
    pub fn with_path<P: AsRef<Path>>(path: P) -> SqlResult<Self> {
        Self::with_database(Database::new(path)?)
    }

    pub fn in_memory() -> SqlResult<Self> {
        Self::with_database(Database::in_memory()?)
    }

    fn with_database(db: Database) -> SqlResult<Self> {
        let store = Self { db };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> SqlResult<()> {
        self.db.connection().execute(
            "CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
            )",
            [],
        )?;
        Ok(())
    }

    // ========== Raw keys ==========

    pub fn get(&self, key: &str) -> SqlResult<Option<String>> {
        self.db
            .connection()
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()
    }

    pub fn set(&self, key: &str, value: &str) -> SqlResult<()> {
        self.db.connection().execute(
            "INSERT OR REPLACE INTO kv (key, value, updated_at)
             VALUES (?1, ?2, strftime('%s', 'now'))",
            params![key, value],
        )?;
        Ok(())
    }

    /// Drop every key: token, cached user and all message snapshots.
    pub fn clear(&self) -> SqlResult<()> {
        self.db.connection().execute("DELETE FROM kv", [])?;
        Ok(())
    }

    // ========== Session ==========

    pub fn token(&self) -> SqlResult<Option<String>> {
        self.get(TOKEN_KEY)
    }

    pub fn set_token(&self, token: &str) -> SqlResult<()> {
        self.set(TOKEN_KEY, token)
    }

    pub fn current_user(&self) -> ClientResult<Option<User>> {
        match self.get(CURRENT_USER_KEY)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn set_current_user(&self, user: &User) -> ClientResult<()> {
        let json = serde_json::to_string(user)?;
        self.set(CURRENT_USER_KEY, &json)?;
        Ok(())
    }

    // ========== Message snapshots ==========

    /// Replace the snapshot for `chat_id`. The last successful history load wins.
    pub fn save_messages(&self, chat_id: i64, messages: &[ChatMessage]) -> ClientResult<()> {
        let json = serde_json::to_string(messages)?;
        self.set(&messages_key(chat_id), &json)?;
        Ok(())
    }

    pub fn load_messages(&self, chat_id: i64) -> ClientResult<Vec<ChatMessage>> {
        match self.get(&messages_key(chat_id))? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }
}
