// SPDX-FileCopyrightText: 2026 StroiNadzor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Routing ledger persisting routing-decision records to SQLite.
//!
//! Every routing decision is recorded with the classified category, the
//! chosen provider, and the pre-call cost estimate. The ledger supports
//! daily and per-provider totals for operator reporting.

use async_trait::async_trait;
use nadzor_core::traits::{PluginAdapter, RoutingSink};
use nadzor_core::{AdapterType, HealthStatus, NadzorError, RoutingRecord};
use tracing::debug;

/// Convert a tokio-rusqlite error into NadzorError::Storage.
fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> NadzorError {
    NadzorError::Storage {
        source: Box::new(e),
    }
}

/// Persistent routing ledger backed by SQLite.
///
/// All operations go through the single tokio-rusqlite background thread.
pub struct RoutingLedger {
    conn: tokio_rusqlite::Connection,
}

impl RoutingLedger {
    /// Open a routing ledger at the given database path, creating the
    /// schema if needed.
    pub async fn open(path: &str) -> Result<Self, NadzorError> {
        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| NadzorError::Storage {
                source: Box::new(e),
            })?;
        let ledger = Self { conn };
        ledger.init_schema().await?;
        Ok(ledger)
    }

    /// Create a ledger over an existing connection, creating the schema if
    /// needed.
    pub async fn with_connection(conn: tokio_rusqlite::Connection) -> Result<Self, NadzorError> {
        let ledger = Self { conn };
        ledger.init_schema().await?;
        Ok(ledger)
    }

    async fn init_schema(&self) -> Result<(), NadzorError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch(
                    "CREATE TABLE IF NOT EXISTS routing_ledger (
                        id TEXT PRIMARY KEY NOT NULL,
                        user_id INTEGER NOT NULL,
                        category TEXT NOT NULL,
                        provider TEXT NOT NULL,
                        reason TEXT NOT NULL,
                        estimated_cost_usd REAL NOT NULL DEFAULT 0.0,
                        created_at TEXT NOT NULL
                    );
                    CREATE INDEX IF NOT EXISTS idx_routing_ledger_created
                        ON routing_ledger(created_at);
                    CREATE INDEX IF NOT EXISTS idx_routing_ledger_provider
                        ON routing_ledger(provider);",
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    /// Sum of estimated costs for a given date (ISO 8601 date, e.g. "2026-08-01").
    pub async fn daily_total(&self, date: &str) -> Result<f64, NadzorError> {
        let date = date.to_string();
        self.conn
            .call(move |conn| -> Result<f64, rusqlite::Error> {
                let total: f64 = conn.query_row(
                    "SELECT COALESCE(SUM(estimated_cost_usd), 0.0) FROM routing_ledger \
                     WHERE created_at >= ?1 AND created_at < date(?1, '+1 day')",
                    rusqlite::params![date],
                    |row| row.get(0),
                )?;
                Ok(total)
            })
            .await
            .map_err(map_tr_err)
    }

    /// Number of decisions routed to a given provider.
    pub async fn provider_count(&self, provider: &str) -> Result<u64, NadzorError> {
        let provider = provider.to_string();
        self.conn
            .call(move |conn| -> Result<u64, rusqlite::Error> {
                let count: u64 = conn.query_row(
                    "SELECT COUNT(*) FROM routing_ledger WHERE provider = ?1",
                    rusqlite::params![provider],
                    |row| row.get(0),
                )?;
                Ok(count)
            })
            .await
            .map_err(map_tr_err)
    }

    /// Sum of estimated costs for a given provider.
    pub async fn provider_total(&self, provider: &str) -> Result<f64, NadzorError> {
        let provider = provider.to_string();
        self.conn
            .call(move |conn| -> Result<f64, rusqlite::Error> {
                let total: f64 = conn.query_row(
                    "SELECT COALESCE(SUM(estimated_cost_usd), 0.0) FROM routing_ledger \
                     WHERE provider = ?1",
                    rusqlite::params![provider],
                    |row| row.get(0),
                )?;
                Ok(total)
            })
            .await
            .map_err(map_tr_err)
    }
}

#[async_trait]
impl PluginAdapter for RoutingLedger {
    fn name(&self) -> &str {
        "routing-ledger"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Observability
    }

    async fn health_check(&self) -> Result<HealthStatus, NadzorError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.query_row("SELECT 1", [], |_| Ok(()))?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), NadzorError> {
        Ok(())
    }
}

#[async_trait]
impl RoutingSink for RoutingLedger {
    async fn record(&self, record: RoutingRecord) -> Result<(), NadzorError> {
        let id = uuid::Uuid::new_v4().to_string();
        let rec = record.clone();
        self.conn
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "INSERT INTO routing_ledger \
                     (id, user_id, category, provider, reason, estimated_cost_usd, created_at) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    rusqlite::params![
                        id,
                        rec.user_id,
                        rec.category,
                        rec.provider,
                        rec.reason,
                        rec.estimated_cost_usd,
                        rec.created_at,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;

        debug!(
            user_id = record.user_id,
            category = %record.category,
            provider = %record.provider,
            estimated_cost_usd = record.estimated_cost_usd,
            "routing decision recorded"
        );

        Ok(())
    }
}
