use desk_core::error::AppError;

use crate::llm::Llm;

mod prompts;

pub use prompts::support_answer_prompt;

/// Fixed phrase the generation prompt demands when the context cannot
/// answer the question.
pub const INSUFFICIENT_INFO: &str = "Sorry, I don't have that information.";

/// Output bound for answer generation.
pub const ANSWER_MAX_TOKENS: u32 = 256;

/// Produce a context-constrained answer for the canonical query. Generation
/// failures are not retried here; they propagate to the orchestrator's
/// recovery boundary.
pub fn synthesize(
    llm: &dyn Llm,
    model: &str,
    context: &str,
    canonical_query: &str,
) -> Result<String, AppError> {
    let prompt = support_answer_prompt(context, canonical_query);
    let answer = llm.generate(model, &prompt, ANSWER_MAX_TOKENS)?;
    Ok(answer.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CapturingLlm {
        reply: String,
    }

    impl Llm for CapturingLlm {
        fn generate(&self, _model: &str, prompt: &str, max_tokens: u32) -> Result<String, AppError> {
            assert_eq!(max_tokens, ANSWER_MAX_TOKENS);
            assert!(prompt.contains("Context:\nOrders ship in 2 days."));
            Ok(self.reply.clone())
        }
    }

    #[test]
    fn synthesize_trims_the_generated_answer() {
        let llm = CapturingLlm {
            reply: "  Within 2 days.\n".to_string(),
        };
        let out = synthesize(&llm, "mock", "Orders ship in 2 days.", "when does it ship")
            .expect("synthesize");
        assert_eq!(out, "Within 2 days.");
    }
}
