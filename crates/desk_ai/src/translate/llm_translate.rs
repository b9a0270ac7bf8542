use desk_core::error::AppError;

use super::Translator;
use crate::language::LanguageTag;
use crate::llm::Llm;

/// Translations are short relative to answers but must fit the whole query
/// or answer being carried across the language edge.
const TRANSLATION_MAX_TOKENS: u32 = 512;

/// Translator built on the deterministic generation capability with a fixed
/// translation model.
#[derive(Debug, Clone)]
pub struct LlmTranslator<L> {
    llm: L,
    model: String,
}

impl<L: Llm> LlmTranslator<L> {
    pub fn new(llm: L, model: impl Into<String>) -> Self {
        Self {
            llm,
            model: model.into(),
        }
    }
}

fn translation_prompt(text: &str, target: &LanguageTag) -> String {
    let language = target.english_name();
    format!(
        r#"Translate the following text into {language}.
Return only the translated text, with no explanations, notes or quotes.

Text:
{text}

Translation:"#
    )
}

impl<L: Llm> Translator for LlmTranslator<L> {
    fn translate(&self, text: &str, target: &LanguageTag) -> Result<String, AppError> {
        let prompt = translation_prompt(text, target);
        let out = self.llm.generate(&self.model, &prompt, TRANSLATION_MAX_TOKENS)?;
        Ok(out.trim().to_string())
    }
}
