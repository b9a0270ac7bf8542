pub mod embeddings;
pub mod faq;
pub mod indexing;
pub mod language;
pub mod llm;
pub mod normalize;
pub mod ollama;
pub mod pipeline;
pub mod retrieve;
pub mod synth;
pub mod translate;

#[cfg(test)]
mod tests {
    use super::ollama::OllamaClient;
    use super::retrieve::grounding_context;

    #[test]
    fn enforces_localhost_only_base_url() {
        assert!(OllamaClient::new("http://127.0.0.1:11434").is_ok());
        assert!(OllamaClient::new("http://127.0.0.1").is_ok());
        assert!(OllamaClient::new("http://127.0.0.1:11434/").is_ok()); // trailing slash is trimmed

        assert!(OllamaClient::new("http://localhost:11434").is_err());
        assert!(OllamaClient::new("http://0.0.0.0:11434").is_err());
        assert!(OllamaClient::new("https://example.com").is_err());
        assert!(OllamaClient::new("http://127.0.0.1.evil.com:11434").is_err());
        assert!(OllamaClient::new("http://127.0.0.1@evil.com:11434").is_err());
        assert!(OllamaClient::new("http://127.0.0.1:").is_err());
        assert!(OllamaClient::new("http://127.0.0.1:0").is_err());
        assert!(OllamaClient::new("http://127.0.0.1:99999").is_err());
        assert!(OllamaClient::new("http://127.0.0.1:11434/api").is_err());
    }

    #[test]
    fn context_budget_is_independent_of_k() {
        let five: Vec<String> = (0..5).map(|i| format!("passage-{i}")).collect();
        assert_eq!(
            grounding_context(&five),
            Some("passage-0 passage-1".to_string())
        );
    }
}
