use desk_core::error::AppError;
use serde::{Deserialize, Serialize};

use crate::language::{LanguageDetector, LanguageTag};
use crate::translate::Translator;

/// Per-request working state. Created at pipeline entry, consumed within one
/// invocation, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryContext {
    pub original_text: String,
    pub detected_language: LanguageTag,
    pub canonical_text: String,
    /// True when detection failed or was unreliable and the canonical
    /// language was assumed rather than observed.
    pub detection_advisory: bool,
}

/// Language edge of the pipeline: canonicalize inbound queries, restore the
/// user's language on the outbound answer.
pub struct Normalizer<'a> {
    detector: &'a dyn LanguageDetector,
    translator: &'a dyn Translator,
}

impl<'a> Normalizer<'a> {
    pub fn new(detector: &'a dyn LanguageDetector, translator: &'a dyn Translator) -> Self {
        Self {
            detector,
            translator,
        }
    }

    /// Detect the query language and produce its canonical form. Detection
    /// is fail-open; a translation failure propagates to the caller.
    pub fn normalize(&self, query: &str) -> Result<QueryContext, AppError> {
        let detection = self.detector.detect(query);

        let canonical_text = if detection.language.is_canonical() {
            query.to_string()
        } else {
            self.translator
                .translate(query, &LanguageTag::canonical())?
        };

        Ok(QueryContext {
            original_text: query.to_string(),
            detected_language: detection.language,
            canonical_text,
            detection_advisory: detection.advisory,
        })
    }

    /// Identity for canonical-language queries; otherwise translate the
    /// answer back into the detected language.
    pub fn denormalize(&self, text: &str, language: &LanguageTag) -> Result<String, AppError> {
        if language.is_canonical() {
            return Ok(text.to_string());
        }
        self.translator.translate(text, language)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::Detection;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedDetector(Detection);

    impl LanguageDetector for FixedDetector {
        fn detect(&self, _text: &str) -> Detection {
            self.0.clone()
        }
    }

    struct CountingTranslator {
        calls: AtomicUsize,
    }

    impl CountingTranslator {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl Translator for CountingTranslator {
        fn translate(&self, text: &str, target: &LanguageTag) -> Result<String, AppError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("{}:{}", target.as_str(), text))
        }
    }

    #[test]
    fn canonical_round_trip_never_translates() {
        let detector = FixedDetector(Detection {
            language: LanguageTag::canonical(),
            advisory: false,
        });
        let translator = CountingTranslator::new();
        let normalizer = Normalizer::new(&detector, &translator);

        let ctx = normalizer.normalize("what are your hours").expect("normalize");
        assert_eq!(ctx.canonical_text, "what are your hours");
        assert!(!ctx.detection_advisory);

        let out = normalizer
            .denormalize("9am-5pm", &ctx.detected_language)
            .expect("denormalize");
        assert_eq!(out, "9am-5pm");
        assert_eq!(translator.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn detection_failure_falls_open_with_advisory_flag() {
        let detector = FixedDetector(Detection::assumed_canonical());
        let translator = CountingTranslator::new();
        let normalizer = Normalizer::new(&detector, &translator);

        let ctx = normalizer.normalize("zzzz").expect("normalize");
        assert!(ctx.detected_language.is_canonical());
        assert!(ctx.detection_advisory);
        assert_eq!(translator.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn non_canonical_query_translates_both_ways() {
        let detector = FixedDetector(Detection {
            language: LanguageTag::new("spa"),
            advisory: false,
        });
        let translator = CountingTranslator::new();
        let normalizer = Normalizer::new(&detector, &translator);

        let ctx = normalizer.normalize("¿cuál es el horario?").expect("normalize");
        assert_eq!(ctx.canonical_text, "eng:¿cuál es el horario?");

        let out = normalizer
            .denormalize("9am-5pm", &ctx.detected_language)
            .expect("denormalize");
        assert_eq!(out, "spa:9am-5pm");
        assert_eq!(translator.calls.load(Ordering::SeqCst), 2);
    }
}
