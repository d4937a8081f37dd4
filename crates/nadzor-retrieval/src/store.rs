// SPDX-FileCopyrightText: 2026 StroiNadzor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite-backed fragment index with vector BLOB storage.
//!
//! The index is populated externally by the corpus ingestion tooling; this
//! store only reads it. Fragments keep their insertion rowid, which breaks
//! relevance ties deterministically.

use nadzor_core::NadzorError;
use tokio_rusqlite::Connection;

use crate::types::{RetrievedFragment, blob_to_vec};

/// Convert tokio-rusqlite errors into NadzorError::Retrieval.
///
/// Index failures are retrieval failures by definition: the executor absorbs
/// them and degrades to an ungrounded prompt.
fn index_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> NadzorError {
    NadzorError::Retrieval {
        message: e.to_string(),
    }
}

/// Read-only store over the normative fragment index.
pub struct FragmentStore {
    conn: Connection,
}

impl FragmentStore {
    /// Wrap an existing connection to a populated index.
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Open the fragment index at the given path.
    pub async fn open(path: &str) -> Result<Self, NadzorError> {
        let conn = Connection::open(path)
            .await
            .map_err(|e| NadzorError::Retrieval {
                message: e.to_string(),
            })?;
        Ok(Self::new(conn))
    }

    /// Load (rowid, embedding) pairs for the given collections.
    ///
    /// An empty collections list loads the whole index.
    pub async fn embeddings_for_collections(
        &self,
        collections: &[String],
    ) -> Result<Vec<(i64, Vec<f32>)>, NadzorError> {
        let collections = collections.to_vec();
        self.conn
            .call(move |conn| -> Result<Vec<(i64, Vec<f32>)>, rusqlite::Error> {
                let (sql, params): (String, Vec<&dyn rusqlite::types::ToSql>) =
                    if collections.is_empty() {
                        (
                            "SELECT rowid, embedding FROM fragments ORDER BY rowid".to_string(),
                            Vec::new(),
                        )
                    } else {
                        let placeholders: Vec<String> =
                            (1..=collections.len()).map(|i| format!("?{i}")).collect();
                        (
                            format!(
                                "SELECT rowid, embedding FROM fragments \
                                 WHERE collection IN ({}) ORDER BY rowid",
                                placeholders.join(", ")
                            ),
                            collections
                                .iter()
                                .map(|c| c as &dyn rusqlite::types::ToSql)
                                .collect(),
                        )
                    };
                let mut stmt = conn.prepare(&sql)?;
                let results = stmt
                    .query_map(params.as_slice(), |row| {
                        let rowid: i64 = row.get(0)?;
                        let blob: Vec<u8> = row.get(1)?;
                        Ok((rowid, blob_to_vec(&blob)))
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(results)
            })
            .await
            .map_err(index_err)
    }

    /// Fetch fragments by rowid, preserving the order of `rowids`.
    ///
    /// Scores are filled in by the caller; this returns them zeroed.
    pub async fn fragments_by_rowids(
        &self,
        rowids: &[i64],
    ) -> Result<Vec<RetrievedFragment>, NadzorError> {
        if rowids.is_empty() {
            return Ok(Vec::new());
        }

        let rowids = rowids.to_vec();
        self.conn
            .call(move |conn| -> Result<Vec<RetrievedFragment>, rusqlite::Error> {
                let placeholders: Vec<String> =
                    (1..=rowids.len()).map(|i| format!("?{i}")).collect();
                let sql = format!(
                    "SELECT rowid, document_id, section_label, content FROM fragments \
                     WHERE rowid IN ({})",
                    placeholders.join(", ")
                );
                let mut stmt = conn.prepare(&sql)?;
                let params: Vec<&dyn rusqlite::types::ToSql> = rowids
                    .iter()
                    .map(|id| id as &dyn rusqlite::types::ToSql)
                    .collect();
                let mut by_rowid = std::collections::HashMap::new();
                let rows = stmt.query_map(params.as_slice(), |row| {
                    let rowid: i64 = row.get(0)?;
                    Ok((
                        rowid,
                        RetrievedFragment {
                            document_id: row.get(1)?,
                            section_label: row.get(2)?,
                            text: row.get(3)?,
                            relevance_score: 0.0,
                        },
                    ))
                })?;
                for row in rows {
                    let (rowid, fragment) = row?;
                    by_rowid.insert(rowid, fragment);
                }
                // Preserve the caller's (relevance) ordering.
                let ordered = rowids
                    .iter()
                    .filter_map(|id| by_rowid.remove(id))
                    .collect::<Vec<_>>();
                Ok(ordered)
            })
            .await
            .map_err(index_err)
    }

    /// Cheap liveness probe against the index.
    pub async fn ping(&self) -> Result<(), NadzorError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.query_row("SELECT COUNT(*) FROM fragments", [], |row| {
                    row.get::<_, i64>(0)
                })?;
                Ok(())
            })
            .await
            .map_err(index_err)?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::types::vec_to_blob;

    /// Create an in-memory index with the fragments schema applied.
    pub async fn empty_index() -> Connection {
        let conn = Connection::open_in_memory().await.unwrap();
        conn.call(|conn| -> Result<(), rusqlite::Error> {
            conn.execute_batch(
                "CREATE TABLE fragments (
                    id TEXT PRIMARY KEY NOT NULL,
                    collection TEXT NOT NULL,
                    document_id TEXT NOT NULL,
                    section_label TEXT NOT NULL,
                    content TEXT NOT NULL,
                    embedding BLOB NOT NULL,
                    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
                );
                CREATE INDEX idx_fragments_collection ON fragments(collection);",
            )?;
            Ok(())
        })
        .await
        .unwrap();
        conn
    }

    /// Insert a fragment the way the ingestion tooling does.
    pub async fn insert_fragment(
        conn: &Connection,
        id: &str,
        collection: &str,
        document_id: &str,
        section_label: &str,
        content: &str,
        embedding: Vec<f32>,
    ) {
        let id = id.to_string();
        let collection = collection.to_string();
        let document_id = document_id.to_string();
        let section_label = section_label.to_string();
        let content = content.to_string();
        let blob = vec_to_blob(&embedding);
        conn.call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO fragments (id, collection, document_id, section_label, content, embedding) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![id, collection, document_id, section_label, content, blob],
            )?;
            Ok(())
        })
        .await
        .unwrap();
    }
}
