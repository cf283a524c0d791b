//! In-memory vector index over a single document's chunks.
//!
//! Built once from the chunk sequence and never mutated afterwards. Search
//! is brute-force cosine similarity, which is exact and fast enough for one
//! document's worth of chunks.

use std::collections::HashMap;
use std::sync::Arc;

use crate::embedding::{cosine_similarity, embed_query, Embedder};
use crate::error::{EmbeddingError, IndexBuildError};
use crate::models::{Chunk, SearchHit};
use crate::progress::{NoProgress, SetupProgressEvent, SetupProgressReporter};

/// Observation returned when the index holds nothing to search.
pub const NO_RESULTS: &str = "No relevant information found in the document.";

struct Entry {
    chunk: Chunk,
    vector: Vec<f32>,
}

/// Immutable collection of (chunk, vector) pairs.
pub struct VectorIndex {
    entries: Vec<Entry>,
    dims: Option<usize>,
}

impl VectorIndex {
    /// Embed every chunk and assemble the index.
    pub async fn build(
        chunks: Vec<Chunk>,
        embedder: &dyn Embedder,
        batch_size: usize,
    ) -> Result<Self, IndexBuildError> {
        Self::build_with_progress(chunks, embedder, batch_size, &NoProgress).await
    }

    /// [`build`](Self::build), reporting per-batch progress.
    ///
    /// Chunks with identical text are embedded once.
    pub async fn build_with_progress(
        chunks: Vec<Chunk>,
        embedder: &dyn Embedder,
        batch_size: usize,
        progress: &dyn SetupProgressReporter,
    ) -> Result<Self, IndexBuildError> {
        let mut unique_texts: Vec<String> = Vec::new();
        let mut slots = Vec::with_capacity(chunks.len());
        {
            let mut slot_by_hash: HashMap<&str, usize> = HashMap::new();
            for chunk in &chunks {
                let slot = *slot_by_hash.entry(chunk.hash.as_str()).or_insert_with(|| {
                    unique_texts.push(chunk.text.clone());
                    unique_texts.len() - 1
                });
                slots.push(slot);
            }
        }

        let total = unique_texts.len() as u64;
        let mut vectors: Vec<Vec<f32>> = Vec::with_capacity(unique_texts.len());
        for batch in unique_texts.chunks(batch_size.max(1)) {
            let embedded = embedder.embed(batch).await?;
            if embedded.len() != batch.len() {
                return Err(IndexBuildError::CountMismatch {
                    expected: batch.len(),
                    got: embedded.len(),
                });
            }
            vectors.extend(embedded);
            progress.report(SetupProgressEvent::Embedding {
                n: vectors.len() as u64,
                total,
            });
        }

        let dims = vectors.first().map(Vec::len).or(embedder.dims());
        let mut entries = Vec::with_capacity(chunks.len());
        for (chunk, slot) in chunks.into_iter().zip(slots) {
            let vector = vectors[slot].clone();
            if let Some(expected) = dims {
                if vector.len() != expected {
                    return Err(IndexBuildError::DimensionMismatch {
                        chunk_index: chunk.index,
                        expected,
                        got: vector.len(),
                    });
                }
            }
            entries.push(Entry { chunk, vector });
        }

        tracing::debug!(
            chunks = entries.len(),
            embedded = vectors.len(),
            model = embedder.model_name(),
            "vector index built"
        );
        Ok(Self { entries, dims })
    }

    /// Top-`k` chunks by cosine similarity, best first.
    ///
    /// Equal scores keep original chunk order.
    pub fn search(&self, query_vec: &[f32], k: usize) -> Vec<SearchHit> {
        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| (i, cosine_similarity(query_vec, &e.vector)))
            .collect();
        // Stable sort: ties stay in chunk order.
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored
            .into_iter()
            .take(k)
            .map(|(i, score)| SearchHit {
                chunk: self.entries[i].chunk.clone(),
                score,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dims(&self) -> Option<usize> {
        self.dims
    }

    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.entries.iter().map(|e| &e.chunk)
    }

    /// Bind this index to an embedder as a text-in, text-out search function.
    pub fn as_retriever(self: &Arc<Self>, embedder: Arc<dyn Embedder>, k: usize) -> Retriever {
        Retriever {
            index: Arc::clone(self),
            embedder,
            k,
        }
    }
}

/// Embeds a query, searches the index, and joins the hits into one string.
#[derive(Clone)]
pub struct Retriever {
    index: Arc<VectorIndex>,
    embedder: Arc<dyn Embedder>,
    k: usize,
}

impl Retriever {
    /// True when the bound index holds no chunks.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub async fn retrieve(&self, query: &str) -> Result<String, EmbeddingError> {
        if self.index.is_empty() {
            return Ok(NO_RESULTS.to_string());
        }
        let query_vec = embed_query(self.embedder.as_ref(), query).await?;
        let hits = self.index.search(&query_vec, self.k);
        if hits.is_empty() {
            return Ok(NO_RESULTS.to_string());
        }
        Ok(hits
            .iter()
            .map(|h| h.chunk.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n"))
    }

    pub fn k(&self) -> usize {
        self.k
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::split;
    use crate::embedding::HashEmbedder;
    use async_trait::async_trait;

    fn chunks_of(texts: &[&str]) -> Vec<Chunk> {
        // Chunk size larger than every text: one chunk per page, overlap 0.
        texts
            .iter()
            .enumerate()
            .flat_map(|(i, t)| {
                split(&[t.to_string()], 10_000, 0)
                    .unwrap()
                    .into_iter()
                    .map(move |mut c| {
                        c.index = i;
                        c
                    })
            })
            .collect()
    }

    /// Returns the same vector for every text.
    struct ConstantEmbedder;

    #[async_trait]
    impl Embedder for ConstantEmbedder {
        fn model_name(&self) -> &str {
            "constant"
        }
        fn dims(&self) -> Option<usize> {
            Some(2)
        }
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }
    }

    /// Drops the last vector of every batch.
    struct ShortEmbedder;

    #[async_trait]
    impl Embedder for ShortEmbedder {
        fn model_name(&self) -> &str {
            "short"
        }
        fn dims(&self) -> Option<usize> {
            None
        }
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            Ok(texts.iter().skip(1).map(|_| vec![1.0]).collect())
        }
    }

    #[tokio::test]
    async fn empty_index_retrieves_no_results() {
        let embedder: Arc<dyn Embedder> = Arc::new(HashEmbedder::default());
        let index = Arc::new(
            VectorIndex::build(Vec::new(), embedder.as_ref(), 8)
                .await
                .unwrap(),
        );
        assert!(index.is_empty());
        let retriever = index.as_retriever(embedder, 4);
        assert_eq!(retriever.retrieve("anything at all").await.unwrap(), NO_RESULTS);
    }

    #[tokio::test]
    async fn salient_chunk_ranks_first() {
        let embedder: Arc<dyn Embedder> = Arc::new(HashEmbedder::default());
        let chunks = chunks_of(&[
            "Photosynthesis converts sunlight into chemical energy in plants.",
            "The capital of France is Paris.",
            "Rust ownership rules prevent data races at compile time.",
        ]);
        let index = Arc::new(VectorIndex::build(chunks, embedder.as_ref(), 2).await.unwrap());
        let retriever = index.as_retriever(embedder, 1);
        let observation = retriever
            .retrieve("What is the capital of France?")
            .await
            .unwrap();
        assert_eq!(observation, "The capital of France is Paris.");
    }

    #[tokio::test]
    async fn ties_keep_chunk_order() {
        let chunks = chunks_of(&["first", "second", "third"]);
        let index = VectorIndex::build(chunks, &ConstantEmbedder, 8).await.unwrap();
        let hits = index.search(&[1.0, 0.0], 3);
        let order: Vec<usize> = hits.iter().map(|h| h.chunk.index).collect();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn search_truncates_to_k() {
        let chunks = chunks_of(&["a", "b", "c", "d"]);
        let index = VectorIndex::build(chunks, &ConstantEmbedder, 3).await.unwrap();
        assert_eq!(index.search(&[1.0, 0.0], 2).len(), 2);
        assert_eq!(index.search(&[1.0, 0.0], 10).len(), 4);
    }

    #[tokio::test]
    async fn duplicate_chunks_embedded_once_but_indexed_twice() {
        let chunks = chunks_of(&["same text", "same text", "other"]);
        let index = VectorIndex::build(chunks, &HashEmbedder::default(), 8)
            .await
            .unwrap();
        assert_eq!(index.len(), 3);
        let order: Vec<usize> = index.chunks().map(|c| c.index).collect();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn vector_count_mismatch_is_build_error() {
        let chunks = chunks_of(&["one", "two"]);
        let err = VectorIndex::build(chunks, &ShortEmbedder, 8)
            .await
            .err()
            .unwrap();
        assert!(matches!(
            err,
            IndexBuildError::CountMismatch {
                expected: 2,
                got: 1
            }
        ));
    }

    #[tokio::test]
    async fn embedding_failure_is_build_error() {
        let chunks = chunks_of(&["one"]);
        let err = VectorIndex::build(chunks, &crate::embedding::DisabledEmbedder, 8)
            .await
            .err()
            .unwrap();
        assert!(matches!(
            err,
            IndexBuildError::Embedding(EmbeddingError::Disabled)
        ));
    }
}
