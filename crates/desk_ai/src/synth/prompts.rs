use super::INSUFFICIENT_INFO;

pub fn support_answer_prompt(context: &str, question: &str) -> String {
    // The contract is explicit:
    // - Answer from the supplied context ONLY.
    // - Emit the fixed phrase when the context does not contain the answer.
    format!(
        r#"You are a helpful customer-support agent.

Rules (non-negotiable):
1) Answer clearly and concisely using ONLY the context below.
2) Do not use any knowledge that is not in the context.
3) If the context does not contain the answer, reply exactly: {INSUFFICIENT_INFO}

Context:
{context}

Question: {question}
Answer:"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_carries_context_question_and_refusal_phrase() {
        let prompt = support_answer_prompt("Orders ship in 2 days.", "When does my order ship?");
        assert!(prompt.contains("ONLY the context"));
        assert!(prompt.contains("Orders ship in 2 days."));
        assert!(prompt.contains("Question: When does my order ship?"));
        assert!(prompt.contains(INSUFFICIENT_INFO));
    }
}
