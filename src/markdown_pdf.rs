//! Markdown to PDF through pandoc and a Unicode-capable LaTeX engine.
//!
//! The markdown is written to a temporary file and pandoc is invoked on it,
//! the same way an external tool is driven elsewhere in this crate: spawn,
//! wait, check the exit status, keep stderr for the error.

use async_trait::async_trait;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::contract::MarkdownRenderer;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("I/O error while rendering: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to launch {}: {source}", program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("document toolchain exited with {status}: {stderr}")]
    Toolchain { status: String, stderr: String },
    #[error("refusing to render an empty document")]
    EmptyInput,
}

pub struct PandocRenderer {
    pandoc: PathBuf,
    pdf_engine: String,
}

impl PandocRenderer {
    pub fn new(pandoc: impl Into<PathBuf>, pdf_engine: impl Into<String>) -> Self {
        Self {
            pandoc: pandoc.into(),
            pdf_engine: pdf_engine.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.pandoc.clone(), config.pdf_engine.clone())
    }

    fn args(&self, input: &Path, output: &Path) -> Vec<std::ffi::OsString> {
        vec![
            input.as_os_str().to_owned(),
            "-f".into(),
            "markdown".into(),
            "-o".into(),
            output.as_os_str().to_owned(),
            format!("--pdf-engine={}", self.pdf_engine).into(),
            "--standalone".into(),
        ]
    }
}

#[async_trait]
impl MarkdownRenderer for PandocRenderer {
    async fn render<'a>(&self, markdown: &'a str, output: &'a Path) -> Result<(), RenderError> {
        if markdown.trim().is_empty() {
            error!(output = %output.display(), "[RENDER] Attempted PDF generation with empty input");
            return Err(RenderError::EmptyInput);
        }

        let mut input = tempfile::Builder::new().suffix(".md").tempfile()?;
        input.write_all(markdown.as_bytes())?;
        input.flush()?;
        debug!(tmp = %input.path().display(), bytes = markdown.len(), "[RENDER] Wrote markdown to temp file");

        let result = Command::new(&self.pandoc)
            .args(self.args(input.path(), output))
            .output()
            .await
            .map_err(|source| {
                error!(error = ?source, program = %self.pandoc.display(), "[RENDER] Failed to launch pandoc");
                RenderError::Spawn {
                    program: self.pandoc.clone(),
                    source,
                }
            })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr).into_owned();
            error!(status = %result.status, output = %output.display(), "[RENDER] pandoc exited with non-zero code: {stderr}");
            return Err(RenderError::Toolchain {
                status: result.status.to_string(),
                stderr,
            });
        }

        info!(output = %output.display(), "[RENDER] PDF written");
        Ok(())
    }
}
