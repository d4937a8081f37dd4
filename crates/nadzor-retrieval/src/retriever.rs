// SPDX-FileCopyrightText: 2026 StroiNadzor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Vector similarity retrieval over the normative fragment index.
//!
//! Embeds the query, scores every fragment in the configured collections by
//! cosine similarity, filters by the relevance threshold, and returns the
//! top fragments sorted by descending relevance with insertion-order ties.

use std::sync::Arc;

use nadzor_config::model::RetrievalConfig;
use nadzor_core::NadzorError;
use nadzor_core::traits::EmbeddingAdapter;
use tracing::debug;

use crate::store::FragmentStore;
use crate::types::{RetrievedFragment, cosine_similarity};

/// Retriever over the normative fragment index.
pub struct NormRetriever {
    store: Arc<FragmentStore>,
    embedder: Arc<dyn EmbeddingAdapter>,
    config: RetrievalConfig,
}

impl NormRetriever {
    /// Create a retriever over the given store and embedder.
    pub fn new(
        store: Arc<FragmentStore>,
        embedder: Arc<dyn EmbeddingAdapter>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            store,
            embedder,
            config,
        }
    }

    /// Retrieve the most relevant fragments for a query.
    ///
    /// Returns at most `top_k` fragments with relevance at or above
    /// `min_relevance`, sorted by descending relevance; equal scores keep
    /// index insertion order. An empty result is a normal outcome, not an
    /// error. Index or embedding failures surface as
    /// [`NadzorError::Retrieval`].
    pub async fn search(&self, query: &str) -> Result<Vec<RetrievedFragment>, NadzorError> {
        let embeddings = self
            .embedder
            .embed(std::slice::from_ref(&query.to_string()))
            .await?;
        let query_embedding = embeddings
            .into_iter()
            .next()
            .ok_or_else(|| NadzorError::Retrieval {
                message: "embedding returned no vectors".to_string(),
            })?;

        let candidates = self
            .store
            .embeddings_for_collections(&self.config.collections)
            .await?;

        let min_relevance = self.config.min_relevance as f32;
        let mut scored: Vec<(i64, f32)> = candidates
            .into_iter()
            .filter_map(|(rowid, embedding)| {
                if embedding.len() != query_embedding.len() {
                    return None;
                }
                let score = cosine_similarity(&query_embedding, &embedding);
                (score >= min_relevance).then_some((rowid, score))
            })
            .collect();

        // Descending by score; candidates arrive rowid-ascending, so a
        // stable sort keeps insertion order for equal scores.
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(self.config.top_k);

        debug!(
            query_len = query.chars().count(),
            hits = scored.len(),
            "fragment search complete"
        );

        if scored.is_empty() {
            return Ok(Vec::new());
        }

        let rowids: Vec<i64> = scored.iter().map(|(id, _)| *id).collect();
        let mut fragments = self.store.fragments_by_rowids(&rowids).await?;
        for (fragment, (_, score)) in fragments.iter_mut().zip(scored.iter()) {
            fragment.relevance_score = *score;
        }

        Ok(fragments)
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use nadzor_core::traits::PluginAdapter;
    use nadzor_core::{AdapterType, HealthStatus};

    use super::*;
    use crate::store::test_support::{empty_index, insert_fragment};

    /// Embedder that returns a fixed vector for any input.
    struct FixedEmbedder {
        vector: Vec<f32>,
    }

    #[async_trait]
    impl PluginAdapter for FixedEmbedder {
        fn name(&self) -> &str {
            "fixed-embedder"
        }
        fn version(&self) -> semver::Version {
            semver::Version::new(0, 1, 0)
        }
        fn adapter_type(&self) -> AdapterType {
            AdapterType::Embedding
        }
        async fn health_check(&self) -> Result<HealthStatus, NadzorError> {
            Ok(HealthStatus::Healthy)
        }
        async fn shutdown(&self) -> Result<(), NadzorError> {
            Ok(())
        }
    }

    #[async_trait]
    impl EmbeddingAdapter for FixedEmbedder {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, NadzorError> {
            Ok(texts.iter().map(|_| self.vector.clone()).collect())
        }
        fn dimensions(&self) -> usize {
            self.vector.len()
        }
    }

    /// Embedder that always fails, simulating an unreachable endpoint.
    struct BrokenEmbedder;

    #[async_trait]
    impl PluginAdapter for BrokenEmbedder {
        fn name(&self) -> &str {
            "broken-embedder"
        }
        fn version(&self) -> semver::Version {
            semver::Version::new(0, 1, 0)
        }
        fn adapter_type(&self) -> AdapterType {
            AdapterType::Embedding
        }
        async fn health_check(&self) -> Result<HealthStatus, NadzorError> {
            Ok(HealthStatus::Unhealthy("down".to_string()))
        }
        async fn shutdown(&self) -> Result<(), NadzorError> {
            Ok(())
        }
    }

    #[async_trait]
    impl EmbeddingAdapter for BrokenEmbedder {
        async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, NadzorError> {
            Err(NadzorError::Retrieval {
                message: "endpoint unreachable".to_string(),
            })
        }
        fn dimensions(&self) -> usize {
            2
        }
    }

    fn test_config(top_k: usize, min_relevance: f64) -> RetrievalConfig {
        RetrievalConfig {
            top_k,
            min_relevance,
            collections: Vec::new(),
            ..RetrievalConfig::default()
        }
    }

    async fn populated_retriever(
        query_vector: Vec<f32>,
        config: RetrievalConfig,
    ) -> NormRetriever {
        let conn = empty_index().await;
        // f1 aligned with [1,0], f2 orthogonal, f3 partially aligned.
        insert_fragment(&conn, "f1", "sp", "СП 63", "п. 8.1", "защитный слой", vec![1.0, 0.0])
            .await;
        insert_fragment(&conn, "f2", "sp", "СП 20", "п. 4.2", "нагрузки", vec![0.0, 1.0]).await;
        insert_fragment(&conn, "f3", "gost", "ГОСТ 27751", "п. 5", "надёжность", vec![0.8, 0.6])
            .await;
        NormRetriever::new(
            Arc::new(FragmentStore::new(conn)),
            Arc::new(FixedEmbedder {
                vector: query_vector,
            }),
            config,
        )
    }

    #[tokio::test]
    async fn search_returns_descending_relevance() {
        let retriever = populated_retriever(vec![1.0, 0.0], test_config(5, 0.5)).await;
        let results = retriever.search("защитный слой бетона").await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].document_id, "СП 63");
        assert!((results[0].relevance_score - 1.0).abs() < 1e-6);
        assert_eq!(results[1].document_id, "ГОСТ 27751");
        assert!(results[0].relevance_score >= results[1].relevance_score);
    }

    #[tokio::test]
    async fn threshold_filters_weak_matches() {
        let retriever = populated_retriever(vec![1.0, 0.0], test_config(5, 0.9)).await;
        let results = retriever.search("запрос").await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].document_id, "СП 63");
    }

    #[tokio::test]
    async fn no_match_returns_empty_not_error() {
        let retriever = populated_retriever(vec![-1.0, 0.0], test_config(5, 0.7)).await;
        let results = retriever.search("несвязанный запрос").await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn top_k_truncates_results() {
        let retriever = populated_retriever(vec![1.0, 0.0], test_config(1, 0.1)).await;
        let results = retriever.search("запрос").await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].document_id, "СП 63");
    }

    #[tokio::test]
    async fn equal_scores_keep_insertion_order() {
        let conn = empty_index().await;
        insert_fragment(&conn, "f1", "sp", "СП A", "п. 1", "первый", vec![1.0, 0.0]).await;
        insert_fragment(&conn, "f2", "sp", "СП B", "п. 2", "второй", vec![1.0, 0.0]).await;
        let retriever = NormRetriever::new(
            Arc::new(FragmentStore::new(conn)),
            Arc::new(FixedEmbedder {
                vector: vec![1.0, 0.0],
            }),
            test_config(5, 0.5),
        );

        let results = retriever.search("запрос").await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].document_id, "СП A");
        assert_eq!(results[1].document_id, "СП B");
    }

    #[tokio::test]
    async fn collection_filter_restricts_search() {
        let conn = empty_index().await;
        insert_fragment(&conn, "f1", "sp", "СП 63", "п. 1", "текст", vec![1.0, 0.0]).await;
        insert_fragment(&conn, "f2", "gost", "ГОСТ 1", "п. 2", "текст", vec![1.0, 0.0]).await;
        let config = RetrievalConfig {
            top_k: 5,
            min_relevance: 0.5,
            collections: vec!["gost".to_string()],
            ..RetrievalConfig::default()
        };
        let retriever = NormRetriever::new(
            Arc::new(FragmentStore::new(conn)),
            Arc::new(FixedEmbedder {
                vector: vec![1.0, 0.0],
            }),
            config,
        );

        let results = retriever.search("запрос").await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].document_id, "ГОСТ 1");
    }

    #[tokio::test]
    async fn embedder_failure_surfaces_as_retrieval_error() {
        let conn = empty_index().await;
        let retriever = NormRetriever::new(
            Arc::new(FragmentStore::new(conn)),
            Arc::new(BrokenEmbedder),
            test_config(5, 0.7),
        );
        let err = retriever.search("запрос").await.unwrap_err();
        assert!(matches!(err, NadzorError::Retrieval { .. }));
    }

    #[tokio::test]
    async fn mismatched_dimensions_are_skipped() {
        let conn = empty_index().await;
        insert_fragment(&conn, "f1", "sp", "СП 63", "п. 1", "текст", vec![1.0, 0.0, 0.0]).await;
        insert_fragment(&conn, "f2", "sp", "СП 20", "п. 2", "текст", vec![1.0, 0.0]).await;
        let retriever = NormRetriever::new(
            Arc::new(FragmentStore::new(conn)),
            Arc::new(FixedEmbedder {
                vector: vec![1.0, 0.0],
            }),
            test_config(5, 0.5),
        );

        let results = retriever.search("запрос").await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].document_id, "СП 20");
    }
}
