use desk_core::error::AppError;

/// Default base URL for a locally running Ollama server.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:11434";

/// Client for the Ollama model server. All embedding, generation and
/// translation traffic goes through this one backend, strictly on
/// `127.0.0.1`.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: String,
}

impl OllamaClient {
    pub fn new(base_url: &str) -> Result<Self, AppError> {
        let base_url = base_url.trim_end_matches('/').to_string();

        // Binding constraint: local-only via 127.0.0.1.
        if !base_url.starts_with("http://127.0.0.1:") && base_url != "http://127.0.0.1" {
            return Err(AppError::new(
                "AI_REMOTE_NOT_ALLOWED",
                "Model backend base URL must be localhost (127.0.0.1)",
            )
            .with_details(format!("base_url={base_url}")));
        }
        if let Some(port) = base_url.strip_prefix("http://127.0.0.1:") {
            match port.parse::<u32>() {
                Ok(p) if (1..=65535).contains(&p) => {}
                _ => {
                    return Err(AppError::new(
                        "AI_REMOTE_NOT_ALLOWED",
                        "Model backend base URL has an invalid port",
                    )
                    .with_details(format!("base_url={base_url}")))
                }
            }
        }

        Ok(Self { base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn health_check(&self) -> Result<(), AppError> {
        let url = format!("{}/api/tags", self.base_url);
        let resp = ureq::get(&url)
            .timeout(std::time::Duration::from_millis(800))
            .call();

        match resp {
            Ok(r) if r.status() == 200 => Ok(()),
            Ok(r) => Err(
                AppError::new("AI_BACKEND_UNHEALTHY", "Model backend health check failed")
                    .with_details(format!("status={}", r.status())),
            ),
            Err(e) => Err(AppError::new(
                "AI_BACKEND_UNREACHABLE",
                "Failed to reach model backend on 127.0.0.1",
            )
            .with_details(e.to_string())
            .with_retryable(true)),
        }
    }
}
