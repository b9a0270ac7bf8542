use desk_core::error::AppError;
use tracing::debug;

use crate::embeddings::Embedder;
use crate::retrieve::similarity::{cosine_similarity, l2_norm};

mod loader;

pub use loader::FaqSet;

/// Minimum cosine similarity (strict) between a query and a stored question
/// for the FAQ answer to be served. Deliberately low: FAQ hits are preferred
/// over retrieval.
pub const FAQ_MATCH_THRESHOLD: f32 = 0.1;

#[derive(Debug, Clone)]
pub struct FaqEntry {
    pub question: String,
    pub answer: String,
    pub embedding: Vec<f32>,
    norm: f32,
}

/// Questions with their embeddings, built once at startup and immutable
/// afterwards.
#[derive(Debug, Clone, Default)]
pub struct FaqIndex {
    entries: Vec<FaqEntry>,
}

impl FaqIndex {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Embed every question in insertion order.
    pub fn build(set: &FaqSet, embedder: &dyn Embedder, model: &str) -> Result<Self, AppError> {
        let questions: Vec<String> = set.entries().iter().map(|(q, _)| q.clone()).collect();
        let vectors = embedder.embed_batch(model, &questions)?;
        if vectors.len() != questions.len() {
            return Err(AppError::new(
                "FAQ_INDEX_FAILED",
                "Embedder returned a different number of vectors than questions",
            )
            .with_details(format!(
                "questions={}; vectors={}",
                questions.len(),
                vectors.len()
            )));
        }

        let entries = set
            .entries()
            .iter()
            .zip(vectors)
            .map(|((question, answer), embedding)| FaqEntry {
                question: question.clone(),
                answer: answer.clone(),
                norm: l2_norm(&embedding),
                embedding,
            })
            .collect();
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Answer of the single most similar stored question, if its cosine
    /// similarity strictly exceeds [`FAQ_MATCH_THRESHOLD`]. Ties keep the
    /// first-encountered entry. Pure: no state is touched.
    pub fn best_match(&self, query_embedding: &[f32]) -> Option<&str> {
        let query_norm = l2_norm(query_embedding);
        if query_norm == 0.0 {
            return None;
        }

        let mut best: Option<(usize, f32)> = None;
        for (i, entry) in self.entries.iter().enumerate() {
            if entry.norm == 0.0 || entry.embedding.len() != query_embedding.len() {
                continue;
            }
            let score =
                cosine_similarity(query_embedding, &entry.embedding, query_norm, entry.norm);
            // Strictly-greater keeps the first maximal index on ties.
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((i, score));
            }
        }

        match best {
            Some((i, score)) if score > FAQ_MATCH_THRESHOLD => {
                debug!(
                    question = %self.entries[i].question,
                    score,
                    "faq match"
                );
                Some(&self.entries[i].answer)
            }
            _ => None,
        }
    }

    /// Encode the canonical query and match it. Empty FAQ sets always miss.
    pub fn match_canonical(
        &self,
        embedder: &dyn Embedder,
        model: &str,
        canonical_query: &str,
    ) -> Result<Option<String>, AppError> {
        if self.entries.is_empty() {
            return Ok(None);
        }
        let query_embedding = embedder.embed(model, canonical_query)?;
        Ok(self.best_match(&query_embedding).map(str::to_string))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_from(entries: &[(&str, &str, Vec<f32>)]) -> FaqIndex {
        FaqIndex {
            entries: entries
                .iter()
                .map(|(q, a, v)| FaqEntry {
                    question: q.to_string(),
                    answer: a.to_string(),
                    norm: l2_norm(v),
                    embedding: v.clone(),
                })
                .collect(),
        }
    }

    #[test]
    fn identical_embedding_is_a_hit() {
        let index = index_from(&[("what are your hours", "9am-5pm", vec![1.0, 0.0])]);
        // Similarity 1.0 > 0.1.
        assert_eq!(index.best_match(&[1.0, 0.0]), Some("9am-5pm"));
    }

    #[test]
    fn similarity_at_or_below_threshold_misses() {
        // Orthogonal: similarity 0.0.
        let index = index_from(&[("hours", "9am-5pm", vec![1.0, 0.0])]);
        assert_eq!(index.best_match(&[0.0, 1.0]), None);

        // Exactly at the threshold must miss (strict comparison).
        let v = vec![
            FAQ_MATCH_THRESHOLD,
            (1.0f32 - FAQ_MATCH_THRESHOLD * FAQ_MATCH_THRESHOLD).sqrt(),
        ];
        let score = cosine_similarity(&v, &[1.0, 0.0], l2_norm(&v), 1.0);
        assert!((score - FAQ_MATCH_THRESHOLD).abs() < 1e-6);
        assert_eq!(index.best_match(&v), None);
    }

    #[test]
    fn ties_keep_the_first_entry() {
        let index = index_from(&[
            ("first", "answer-one", vec![1.0, 0.0]),
            ("second", "answer-two", vec![1.0, 0.0]),
        ]);
        assert_eq!(index.best_match(&[1.0, 0.0]), Some("answer-one"));
    }

    #[test]
    fn empty_index_never_matches() {
        let index = FaqIndex::empty();
        assert_eq!(index.best_match(&[1.0, 0.0]), None);
    }

    #[test]
    fn zero_query_norm_never_matches() {
        let index = index_from(&[("hours", "9am-5pm", vec![1.0, 0.0])]);
        assert_eq!(index.best_match(&[0.0, 0.0]), None);
    }
}
