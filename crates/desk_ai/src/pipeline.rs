use desk_core::error::AppError;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::embeddings::Embedder;
use crate::faq::FaqIndex;
use crate::language::{LanguageDetector, LanguageTag};
use crate::llm::Llm;
use crate::normalize::{Normalizer, QueryContext};
use crate::retrieve::{grounding_context, Retriever, RETRIEVAL_TOP_K};
use crate::synth;
use crate::translate::Translator;

/// Context-free answer served when neither the FAQ nor retrieval can ground
/// a response.
pub const FALLBACK_ANSWER: &str =
    "Sorry, I don't have that information. Contact support@company.com.";

/// Pipeline stages, in execution order. `FaqHit` and `Fallback` are the two
/// short-circuit exits; every completed query ends denormalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Start,
    Normalized,
    FaqHit,
    Retrieved,
    Synthesized,
    Fallback,
    Denormalized,
}

/// Result of one pipeline invocation, exposed for tests and diagnostics.
/// `answered_by` names the stage that produced the answer text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOutcome {
    pub answer: String,
    pub answered_by: Stage,
    pub context: QueryContext,
}

/// Best-effort chat-history recording. Failures must never affect the
/// user-facing answer.
pub trait HistorySink: Send + Sync {
    fn record(&self, user_id: i64, query: &str, response: &str) -> Result<(), AppError>;
}

/// Sink that drops every record; used when no persistence is configured.
#[derive(Debug, Clone, Default)]
pub struct NoopHistorySink;

impl HistorySink for NoopHistorySink {
    fn record(&self, _user_id: i64, _query: &str, _response: &str) -> Result<(), AppError> {
        Ok(())
    }
}

/// Model names the pipeline passes to its capabilities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    pub embed_model: String,
    pub generate_model: String,
}

/// Everything one query needs, constructed once at startup and immutable
/// afterwards. Safe to share across concurrent pipeline invocations; each
/// `respond` call is self-contained.
pub struct PipelineContext {
    settings: PipelineSettings,
    faq: FaqIndex,
    retriever: Retriever,
    detector: Box<dyn LanguageDetector>,
    translator: Box<dyn Translator>,
    embedder: Box<dyn Embedder>,
    llm: Box<dyn Llm>,
    history: Box<dyn HistorySink>,
}

impl PipelineContext {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        settings: PipelineSettings,
        faq: FaqIndex,
        retriever: Retriever,
        detector: Box<dyn LanguageDetector>,
        translator: Box<dyn Translator>,
        embedder: Box<dyn Embedder>,
        llm: Box<dyn Llm>,
        history: Box<dyn HistorySink>,
    ) -> Self {
        Self {
            settings,
            faq,
            retriever,
            detector,
            translator,
            embedder,
            llm,
            history,
        }
    }

    /// The pipeline entry point. Fails only by returning the user-facing
    /// fallback string, never by raising: every external-capability call is
    /// wrapped in a recoverable boundary.
    pub fn respond(&self, user_id: i64, raw_query: &str) -> String {
        self.respond_traced(user_id, raw_query).answer
    }

    /// `respond` with the per-query trace attached.
    pub fn respond_traced(&self, user_id: i64, raw_query: &str) -> QueryOutcome {
        let normalizer = Normalizer::new(self.detector.as_ref(), self.translator.as_ref());

        let context = match normalizer.normalize(raw_query) {
            Ok(context) => context,
            Err(e) => {
                warn!(code = %e.code, "query normalization failed; serving fallback");
                // Inbound translation is down, so the reverse direction is
                // not attempted either: fallback in canonical form.
                let context = QueryContext {
                    original_text: raw_query.to_string(),
                    detected_language: LanguageTag::canonical(),
                    canonical_text: raw_query.to_string(),
                    detection_advisory: true,
                };
                return self.finish(user_id, &normalizer, context, FALLBACK_ANSWER.to_string(), Stage::Fallback);
            }
        };
        debug!(
            language = %context.detected_language,
            advisory = context.detection_advisory,
            "query normalized"
        );

        match self.faq.match_canonical(
            self.embedder.as_ref(),
            &self.settings.embed_model,
            &context.canonical_text,
        ) {
            Ok(Some(answer)) => {
                return self.finish(user_id, &normalizer, context, answer, Stage::FaqHit);
            }
            Ok(None) => {}
            Err(e) => {
                warn!(code = %e.code, "faq matching failed; serving fallback");
                return self.finish(
                    user_id,
                    &normalizer,
                    context,
                    FALLBACK_ANSWER.to_string(),
                    Stage::Fallback,
                );
            }
        }

        let passages = match self.retriever.retrieve(
            self.embedder.as_ref(),
            &self.settings.embed_model,
            &context.canonical_text,
            RETRIEVAL_TOP_K,
        ) {
            Ok(passages) => passages,
            Err(e) => {
                warn!(code = %e.code, "retrieval failed; serving fallback");
                return self.finish(
                    user_id,
                    &normalizer,
                    context,
                    FALLBACK_ANSWER.to_string(),
                    Stage::Fallback,
                );
            }
        };

        let grounding = match grounding_context(&passages) {
            Some(grounding) => grounding,
            None => {
                debug!("no grounding context; serving fallback");
                return self.finish(
                    user_id,
                    &normalizer,
                    context,
                    FALLBACK_ANSWER.to_string(),
                    Stage::Fallback,
                );
            }
        };

        match synth::synthesize(
            self.llm.as_ref(),
            &self.settings.generate_model,
            &grounding,
            &context.canonical_text,
        ) {
            Ok(answer) => self.finish(user_id, &normalizer, context, answer, Stage::Synthesized),
            Err(e) => {
                warn!(code = %e.code, "answer synthesis failed; serving fallback");
                self.finish(
                    user_id,
                    &normalizer,
                    context,
                    FALLBACK_ANSWER.to_string(),
                    Stage::Fallback,
                )
            }
        }
    }

    /// Terminal transition: reverse-translate the answer, notify the history
    /// sink, return. The sink is fire-and-forget; a failed reverse
    /// translation degrades to the canonical-language answer rather than
    /// discarding it.
    fn finish(
        &self,
        user_id: i64,
        normalizer: &Normalizer<'_>,
        context: QueryContext,
        canonical_answer: String,
        answered_by: Stage,
    ) -> QueryOutcome {
        let answer = match normalizer.denormalize(&canonical_answer, &context.detected_language) {
            Ok(answer) => answer,
            Err(e) => {
                warn!(code = %e.code, "reverse translation failed; returning canonical answer");
                canonical_answer
            }
        };

        if let Err(e) = self.history.record(user_id, &context.original_text, &answer) {
            warn!(code = %e.code, "history write failed; response unaffected");
        }

        QueryOutcome {
            answer,
            answered_by,
            context,
        }
    }
}
