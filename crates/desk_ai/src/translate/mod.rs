use desk_core::error::AppError;

use crate::language::LanguageTag;

/// Bidirectional translation capability. The output is accepted as-is: no
/// retries, no validation. A bad translation degrades answer quality
/// silently rather than failing the request.
pub trait Translator: Send + Sync {
    fn translate(&self, text: &str, target: &LanguageTag) -> Result<String, AppError>;
}

pub mod llm_translate;

pub use llm_translate::LlmTranslator;
