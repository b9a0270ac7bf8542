use std::fmt;

use serde::{Deserialize, Serialize};

/// ISO 639-3 code of the language used internally for matching, retrieval
/// and synthesis. Queries in any other language are translated in at the
/// edge and back out again.
pub const CANONICAL_LANGUAGE: &str = "eng";

/// Lowercase ISO 639-3 language code, e.g. `eng`, `spa`, `deu`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LanguageTag(String);

impl LanguageTag {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into().to_ascii_lowercase())
    }

    pub fn canonical() -> Self {
        Self(CANONICAL_LANGUAGE.to_string())
    }

    pub fn is_canonical(&self) -> bool {
        self.0 == CANONICAL_LANGUAGE
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// English name of the language, for translation prompts. Unknown codes
    /// fall back to the code itself.
    pub fn english_name(&self) -> String {
        match whatlang::Lang::from_code(&self.0) {
            Some(lang) => lang.eng_name().to_string(),
            None => self.0.clone(),
        }
    }
}

impl fmt::Display for LanguageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of best-effort language detection. `advisory` is set when the
/// detector failed or was unsure and the canonical language was assumed, so
/// callers can tell the fail-open path apart from a genuinely canonical
/// query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    pub language: LanguageTag,
    pub advisory: bool,
}

impl Detection {
    pub fn assumed_canonical() -> Self {
        Self {
            language: LanguageTag::canonical(),
            advisory: true,
        }
    }
}

/// Best-effort language identification. Never fails: undetectable input
/// reports the canonical language with the advisory flag set.
pub trait LanguageDetector: Send + Sync {
    fn detect(&self, text: &str) -> Detection;
}

/// Statistical detector backed by whatlang. Short or ambiguous inputs are
/// routinely unreliable; those fall open to the canonical language.
#[derive(Debug, Clone, Default)]
pub struct WhatlangDetector;

impl LanguageDetector for WhatlangDetector {
    fn detect(&self, text: &str) -> Detection {
        match whatlang::detect(text) {
            Some(info) if info.is_reliable() => Detection {
                language: LanguageTag::new(info.lang().code()),
                advisory: false,
            },
            _ => Detection::assumed_canonical(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_tag_roundtrip() {
        let tag = LanguageTag::canonical();
        assert!(tag.is_canonical());
        assert_eq!(tag.as_str(), "eng");
        assert_eq!(tag.english_name(), "English");
    }

    #[test]
    fn codes_are_case_folded() {
        assert_eq!(LanguageTag::new("SPA"), LanguageTag::new("spa"));
        assert_eq!(LanguageTag::new("spa").english_name(), "Spanish");
    }

    #[test]
    fn unknown_code_falls_back_to_itself() {
        assert_eq!(LanguageTag::new("zz").english_name(), "zz");
    }

    #[test]
    fn empty_input_is_assumed_canonical() {
        let det = WhatlangDetector.detect("");
        assert!(det.language.is_canonical());
        assert!(det.advisory);
    }
}
