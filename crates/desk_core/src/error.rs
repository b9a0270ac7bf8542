use serde::{Deserialize, Serialize};
use std::fmt;

/// Structured error carried through every layer of the service.
///
/// `code` is a stable machine-readable identifier (e.g. `DB_QUERY_FAILED`,
/// `AI_EMBEDDINGS_FAILED`); `message` is the operator-facing summary.
/// `retryable` marks transient conditions such as an unreachable model
/// backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppError {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
    pub retryable: bool,
}

impl AppError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
            retryable: false,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(details) = self.details.as_deref() {
            write!(f, " ({details})")?;
        }
        Ok(())
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::AppError;

    #[test]
    fn display_includes_code_and_details() {
        let err = AppError::new("DB_OPEN_FAILED", "cannot open database")
            .with_details("path=/tmp/x.db");
        assert_eq!(
            err.to_string(),
            "[DB_OPEN_FAILED] cannot open database (path=/tmp/x.db)"
        );
        assert!(!err.retryable);
    }
}
