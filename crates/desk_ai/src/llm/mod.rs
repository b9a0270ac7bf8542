use desk_core::error::AppError;

/// Text-generation capability. Implementations must use deterministic
/// (non-sampling) decoding so that identical prompts yield identical
/// answers, and must bound output length by `max_tokens`.
pub trait Llm: Send + Sync {
    fn generate(&self, model: &str, prompt: &str, max_tokens: u32) -> Result<String, AppError>;
}

pub mod ollama_llm;

pub use ollama_llm::OllamaLlm;
