//! Single source file to PDF.
//!
//! The file is wrapped in one fenced block and rendered through the markdown
//! path. The fence is always labeled [`FORCED_LANGUAGE`]; no language
//! detection is attempted.

use std::path::{Path, PathBuf};
use tracing::{error, info};

use crate::config::Config;
use crate::contract::MarkdownRenderer;
use crate::explain::ExplainError;
use crate::load_config::require_file;
use crate::sanitize::decode_lossy_dropping;

pub const FORCED_LANGUAGE: &str = "python";
pub const RESULT_PDF: &str = "result.pdf";

pub fn code_to_markdown(code: &str) -> String {
    format!("```{FORCED_LANGUAGE}\n{code}\n```")
}

/// Renders `input` to `<output_dir>/result.pdf` and returns that path.
pub async fn code_file_to_pdf<R>(input: &Path, config: &Config, renderer: &R) -> Result<PathBuf, ExplainError>
where
    R: MarkdownRenderer + ?Sized,
{
    require_file(input)?;
    let raw = tokio::fs::read(input).await.map_err(|source| {
        error!(error = ?source, path = %input.display(), "Failed to read code file");
        ExplainError::Io {
            path: input.to_path_buf(),
            source,
        }
    })?;
    let markdown = code_to_markdown(&decode_lossy_dropping(&raw));

    let output = config.output_path(RESULT_PDF);
    renderer.render(&markdown, &output).await?;
    info!(input = %input.display(), output = %output.display(), "PDF saved");
    Ok(output)
}
