// code-explainer/src/config.rs

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::load_config::ConfigError;

pub const DEFAULT_ENDPOINT: &str = "https://openrouter.ai/api/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "qwen/qwen-2.5-72b-instruct";
pub const DEFAULT_OUTPUT_DIR: &str = "output";

/// Width of the per-file worker pool.
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Files at or above this size are skipped by the explanation pass.
pub const DEFAULT_MAX_FILE_BYTES: u64 = 50_000;

/// Upper bound on the number of characters of the explanations corpus that are
/// pasted into a single follow-up prompt (quiz, summary, recommendations).
pub const DEFAULT_PROMPT_CONTEXT_CHARS: usize = 12_000;

pub const API_KEY_ENV: &str = "OPENROUTER_API_KEY";

/// Extensions processed by the explanation pass.
pub const EXPLAIN_EXTENSIONS: &[&str] = &["py", "js", "html", "css", "ts", "jsx", "java", "cpp"];

/// Directories never descended into by the explanation pass.
pub const EXPLAIN_EXCLUDED_DIRS: &[&str] = &["node_modules", ".git", "dist", "build", "__pycache__"];

/// Extensions handed to the complexity analyzer.
pub const COMPLEXITY_EXTENSIONS: &[&str] = &["js", "py", "java", "cpp", "c", "ts"];

/// Directories never descended into by the complexity pass.
pub const COMPLEXITY_EXCLUDED_DIRS: &[&str] =
    &["node_modules", ".git", "__pycache__", "venv", ".idea", ".vscode"];

/// How per-file failures inside a batch are treated. Applies to the explanation
/// pass and to the complexity pass alike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// The first failing file aborts the whole batch.
    #[default]
    FailFast,
    /// Failing files are logged, recorded in the outcome and left out of the output.
    Collect,
}

/// Everything a run needs, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Only the flows that call the chat endpoint need it; see [`Config::require_api_key`].
    pub api_key: Option<String>,
    pub endpoint: String,
    pub model: String,
    pub output_dir: PathBuf,
    pub concurrency: usize,
    pub max_file_bytes: u64,
    pub prompt_context_chars: usize,
    pub failure_policy: FailurePolicy,
    pub pandoc: PathBuf,
    pub pdf_engine: String,
}

impl Config {
    /// A config with every tunable at its default and the given credential.
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            concurrency: DEFAULT_CONCURRENCY,
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            prompt_context_chars: DEFAULT_PROMPT_CONTEXT_CHARS,
            failure_policy: FailurePolicy::default(),
            pandoc: PathBuf::from("pandoc"),
            pdf_engine: "xelatex".to_string(),
        }
    }

    pub fn trace_loaded(&self) {
        info!(
            endpoint = %self.endpoint,
            model = %self.model,
            output_dir = %self.output_dir.display(),
            concurrency = self.concurrency,
            max_file_bytes = self.max_file_bytes,
            prompt_context_chars = self.prompt_context_chars,
            failure_policy = ?self.failure_policy,
            api_key_len = self.api_key.as_deref().map_or(0, str::len),
            "Loaded Config"
        );
        debug!(pandoc = %self.pandoc.display(), pdf_engine = %self.pdf_engine, "Renderer config");
    }

    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.api_key.as_deref().ok_or(ConfigError::MissingApiKey)
    }

    /// Creates the output directory if it is missing. Called once by the entrypoint.
    pub fn ensure_output_dir(&self) -> Result<&Path, ConfigError> {
        std::fs::create_dir_all(&self.output_dir).map_err(|source| {
            tracing::error!(error = ?source, path = %self.output_dir.display(), "Failed to create output directory");
            ConfigError::CreateOutputDir {
                path: self.output_dir.clone(),
                source,
            }
        })?;
        debug!(path = %self.output_dir.display(), "Output directory ready");
        Ok(&self.output_dir)
    }

    pub fn output_path(&self, file_name: &str) -> PathBuf {
        self.output_dir.join(file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_output_dir_creates_nested_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = Config::with_api_key("k");
        config.output_dir = tmp.path().join("a/b/output");

        let dir = config.ensure_output_dir().expect("should create");
        assert!(dir.is_dir());
        // second call is a no-op
        config.ensure_output_dir().expect("should be idempotent");
    }

    #[test]
    fn missing_api_key_is_a_typed_error() {
        let mut config = Config::with_api_key("k");
        assert_eq!(config.require_api_key().unwrap(), "k");
        config.api_key = None;
        assert!(matches!(config.require_api_key(), Err(ConfigError::MissingApiKey)));
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::with_api_key("k");
        assert_eq!(config.concurrency, 5);
        assert_eq!(config.max_file_bytes, 50_000);
        assert_eq!(config.failure_policy, FailurePolicy::FailFast);
        assert_eq!(config.output_path("quiz.pdf"), PathBuf::from("output/quiz.pdf"));
    }
}
