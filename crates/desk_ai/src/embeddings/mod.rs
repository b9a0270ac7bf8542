use desk_core::error::AppError;

/// Text-to-vector capability. Implementations must be safe to share across
/// concurrent pipeline invocations.
pub trait Embedder: Send + Sync {
    fn embed(&self, model: &str, input: &str) -> Result<Vec<f32>, AppError>;

    /// Encode several texts in input order. The default loops over `embed`.
    fn embed_batch(&self, model: &str, inputs: &[String]) -> Result<Vec<Vec<f32>>, AppError> {
        let mut out = Vec::with_capacity(inputs.len());
        for input in inputs {
            out.push(self.embed(model, input)?);
        }
        Ok(out)
    }
}

pub mod ollama_embed;

pub use ollama_embed::OllamaEmbedder;
