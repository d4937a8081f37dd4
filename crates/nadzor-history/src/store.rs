// SPDX-FileCopyrightText: 2026 StroiNadzor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the conversation context store.
//!
//! All writes go through the single tokio-rusqlite background thread, which
//! serializes appends for the same user without any locking in the caller.

use std::str::FromStr;

use async_trait::async_trait;
use nadzor_config::model::StorageConfig;
use nadzor_core::traits::{ContextStore, PluginAdapter};
use nadzor_core::{AdapterType, ConversationMessage, HealthStatus, NadzorError, Role};
use tokio_rusqlite::Connection;
use tracing::debug;

/// Convert tokio-rusqlite errors into NadzorError::Storage.
fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> NadzorError {
    NadzorError::Storage {
        source: Box::new(e),
    }
}

/// SQLite-backed append-only conversation log.
pub struct SqliteContextStore {
    conn: Connection,
}

impl SqliteContextStore {
    /// Open the store at the configured path, applying pragmas and schema.
    pub async fn open(config: &StorageConfig) -> Result<Self, NadzorError> {
        let conn = Connection::open(&config.database_path)
            .await
            .map_err(|e| NadzorError::Storage {
                source: Box::new(e),
            })?;
        let store = Self { conn };
        store.init(config.wal_mode).await?;
        debug!(path = %config.database_path, "context store opened");
        Ok(store)
    }

    /// Wrap an existing connection, applying schema.
    pub async fn with_connection(conn: Connection) -> Result<Self, NadzorError> {
        let store = Self { conn };
        store.init(false).await?;
        Ok(store)
    }

    async fn init(&self, wal_mode: bool) -> Result<(), NadzorError> {
        self.conn
            .call(move |conn| -> Result<(), rusqlite::Error> {
                if wal_mode {
                    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
                }
                conn.execute_batch(
                    "CREATE TABLE IF NOT EXISTS conversation_log (
                        id TEXT PRIMARY KEY NOT NULL,
                        user_id INTEGER NOT NULL,
                        role TEXT NOT NULL,
                        content TEXT NOT NULL,
                        created_at TEXT NOT NULL
                    );
                    CREATE INDEX IF NOT EXISTS idx_conversation_log_user
                        ON conversation_log(user_id);",
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }
}

#[async_trait]
impl PluginAdapter for SqliteContextStore {
    fn name(&self) -> &str {
        "sqlite-context"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, NadzorError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), NadzorError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!("context store shutdown: WAL checkpoint complete");
        Ok(())
    }
}

#[async_trait]
impl ContextStore for SqliteContextStore {
    async fn append(&self, user_id: i64, role: Role, content: &str) -> Result<(), NadzorError> {
        let id = uuid::Uuid::new_v4().to_string();
        let role = role.to_string();
        let content = content.to_string();
        let created_at = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "INSERT INTO conversation_log (id, user_id, role, content, created_at) \
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    rusqlite::params![id, user_id, role, content, created_at],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    async fn recent(
        &self,
        user_id: i64,
        limit: usize,
    ) -> Result<Vec<ConversationMessage>, NadzorError> {
        let mut messages: Vec<ConversationMessage> = self
            .conn
            .call(move |conn| -> Result<Vec<(i64, String, String, String)>, rusqlite::Error> {
                // rowid order is append order; created_at alone is not
                // precise enough to break same-millisecond ties.
                let mut stmt = conn.prepare(
                    "SELECT user_id, role, content, created_at FROM conversation_log \
                     WHERE user_id = ?1 ORDER BY rowid DESC LIMIT ?2",
                )?;
                let rows = stmt
                    .query_map(rusqlite::params![user_id, limit as i64], |row| {
                        let role_str: String = row.get(1)?;
                        Ok((
                            row.get::<_, i64>(0)?,
                            role_str,
                            row.get::<_, String>(2)?,
                            row.get::<_, String>(3)?,
                        ))
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(map_tr_err)?
            .into_iter()
            .map(|(user_id, role, content, created_at)| ConversationMessage {
                user_id,
                role: Role::from_str(&role).unwrap_or(Role::User),
                content,
                created_at,
            })
            .collect();

        // Query returned newest-first; callers consume oldest-first.
        messages.reverse();
        Ok(messages)
    }
}
