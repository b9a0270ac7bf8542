use std::fs;
use std::path::{Path, PathBuf};

use desk_core::error::AppError;
use serde::Deserialize;

/// Greeting surfaced on chat start and seeded once per user into history.
pub const WELCOME_MESSAGE: &str =
    "Hi there! I'm your support assistant. How can I help you today?";

/// Model backend settings. All four capabilities run against the same
/// localhost Ollama server.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    pub base_url: String,
    pub embed_model: String,
    pub generate_model: String,
    pub translate_model: String,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            base_url: desk_ai::ollama::DEFAULT_BASE_URL.to_string(),
            embed_model: "nomic-embed-text".to_string(),
            generate_model: "llama3.2".to_string(),
            translate_model: "llama3.2".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Root for the index artifact pair.
    pub data_dir: PathBuf,
    /// Directory of `.txt` corpus files for the offline build.
    pub corpus_dir: PathBuf,
    /// FAQ files in precedence order (later overrides earlier).
    pub faq_files: Vec<PathBuf>,
    pub db_file: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            corpus_dir: PathBuf::from("customer_support_data"),
            faq_files: vec![
                PathBuf::from("customer_support_data/faq1.txt"),
                PathBuf::from("customer_support_data/faq2.txt"),
            ],
            db_file: PathBuf::from("data/desk.db"),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub models: ModelsConfig,
    pub paths: PathsConfig,
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let text = fs::read_to_string(path).map_err(|e| {
            AppError::new("CONFIG_READ_FAILED", "Failed to read config file")
                .with_details(format!("path={}; err={}", path.display(), e))
        })?;
        toml::from_str(&text).map_err(|e| {
            AppError::new("CONFIG_PARSE_FAILED", "Failed to parse config file")
                .with_details(format!("path={}; err={}", path.display(), e))
        })
    }

    /// Explicit path must exist; the default path (`deskbot.toml`) may be
    /// absent, in which case built-in defaults apply.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, AppError> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let default = Path::new("deskbot.toml");
                if default.exists() {
                    Self::load(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_for_missing_sections() {
        let config: AppConfig = toml::from_str(
            r#"
[models]
embed_model = "all-minilm"
"#,
        )
        .expect("parse");
        assert_eq!(config.models.embed_model, "all-minilm");
        assert_eq!(config.models.base_url, desk_ai::ollama::DEFAULT_BASE_URL);
        assert_eq!(config.paths.data_dir, PathBuf::from("data"));
    }

    #[test]
    fn explicit_missing_path_is_an_error() {
        let err = AppConfig::load(Path::new("/nonexistent/deskbot.toml")).expect_err("missing");
        assert_eq!(err.code, "CONFIG_READ_FAILED");
    }
}
