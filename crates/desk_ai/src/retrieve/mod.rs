use desk_core::error::AppError;
use tracing::debug;

use crate::embeddings::Embedder;

pub mod index;
pub mod similarity;

pub use index::{ArtifactStore, IndexManifest, VectorIndex, NO_NEIGHBOR};

/// Neighbors requested per query.
pub const RETRIEVAL_TOP_K: usize = 5;

/// Passages actually concatenated into the grounding context. Retrieving
/// more than we use leaves room for future re-ranking without re-querying.
pub const CONTEXT_PASSAGE_BUDGET: usize = 2;

/// Read-only retrieval over the offline-built artifact pair. Owns the
/// vector index and the positionally matched chunk texts.
#[derive(Debug, Clone)]
pub struct Retriever {
    index: VectorIndex,
    chunks: Vec<String>,
}

impl Retriever {
    pub fn new(index: VectorIndex, chunks: Vec<String>) -> Result<Self, AppError> {
        if index.len() != chunks.len() {
            return Err(AppError::new(
                "INDEX_PAIR_MISMATCH",
                "Vector index and chunk list disagree in length",
            )
            .with_details(format!("vectors={}; chunks={}", index.len(), chunks.len())));
        }
        Ok(Self { index, chunks })
    }

    /// Load from the artifact store, enforcing the pairing invariant.
    pub fn from_store(store: &ArtifactStore) -> Result<(Self, IndexManifest), AppError> {
        let (index, chunks, manifest) = store.load_pair()?;
        Ok((Self::new(index, chunks)?, manifest))
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Top-k chunk texts for the canonical query, nearest first. Sentinel
    /// positions are filtered out; an empty index yields an empty result,
    /// not an error.
    pub fn retrieve(
        &self,
        embedder: &dyn Embedder,
        model: &str,
        canonical_query: &str,
        k: usize,
    ) -> Result<Vec<String>, AppError> {
        if self.index.is_empty() {
            return Ok(Vec::new());
        }

        let query_vector = embedder.embed(model, canonical_query)?;
        let (_distances, positions) = self.index.search(&query_vector, k)?;

        let passages: Vec<String> = positions
            .into_iter()
            .filter(|p| *p != NO_NEIGHBOR)
            .map(|p| self.chunks[p as usize].clone())
            .collect();
        debug!(requested = k, returned = passages.len(), "retrieval done");
        Ok(passages)
    }
}

/// Space-join the first [`CONTEXT_PASSAGE_BUDGET`] passages into the
/// grounding context. `None` signals that no grounding is available and the
/// pipeline must fall back without synthesis.
pub fn grounding_context(passages: &[String]) -> Option<String> {
    let context = passages
        .iter()
        .take(CONTEXT_PASSAGE_BUDGET)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" ");
    if context.trim().is_empty() {
        None
    } else {
        Some(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_uses_at_most_the_first_two_passages() {
        let passages: Vec<String> = ["alpha", "beta", "gamma", "delta", "epsilon"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(grounding_context(&passages), Some("alpha beta".to_string()));
    }

    #[test]
    fn single_passage_context_has_no_separator() {
        let passages = vec!["alpha".to_string()];
        assert_eq!(grounding_context(&passages), Some("alpha".to_string()));
    }

    #[test]
    fn empty_passages_mean_no_grounding() {
        assert_eq!(grounding_context(&[]), None);
        assert_eq!(grounding_context(&["  ".to_string()]), None);
    }

    #[test]
    fn mismatched_pair_is_rejected() {
        let index = VectorIndex::new(2);
        let err = Retriever::new(index, vec!["chunk".to_string()]).expect_err("mismatch");
        assert_eq!(err.code, "INDEX_PAIR_MISMATCH");
    }
}
