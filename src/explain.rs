//! Per-file explanation task and the bounded fan-out/fan-in that drives it.
//!
//! # Flow
//! 1. [`discover_files`] lists candidate files; [`plan_tasks`] numbers them in
//!    discovery order.
//! 2. [`process_file`] runs for every task, at most `config.concurrency` at a
//!    time, each one issuing a single chat request.
//! 3. Results are consumed in completion order by the one awaiting task, then
//!    sorted by their discovery index before the documents are assembled, so
//!    the section order never depends on network timing.
//!
//! # Error Handling
//! Soft skips (extension, size) are never errors. Read and remote failures are
//! handled per [`FailurePolicy`]: fail-fast returns the first one and drops the
//! tasks still in flight, collect records them and carries on.

use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::{Config, FailurePolicy};
use crate::contract::{ChatClient, FileFailure, FileFragments, MarkdownRenderer, TaskDescriptor};
use crate::discover::{discover_files, extension_of, DiscoveredFile, DiscoveryRules};
use crate::llm::LlmError;
use crate::load_config::ConfigError;
use crate::markdown_pdf::RenderError;
use crate::quiz;
use crate::sanitize::{decode_lossy_dropping, escape_fs_path};

pub const CODE_DOC_HEADER: &str = "# Project Code\n\n";
pub const EXPLANATION_DOC_HEADER: &str = "# Project Code with Short Explanations\n\n";

pub const CODE_PDF: &str = "code_only.pdf";
pub const EXPLANATION_PDF: &str = "code_with_explanation.pdf";
pub const QUIZ_PDF: &str = "quiz.pdf";

pub const EXPLAIN_SYSTEM_PROMPT: &str = "You are a programming tutor. \
Summarize the given code in at most TWO short sentences. \
Avoid detailed breakdowns. Just say what it does.";

#[derive(Debug, Error)]
pub enum ExplainError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("explaining {} failed: {source}", path.display())]
    Llm {
        path: PathBuf,
        #[source]
        source: LlmError,
    },
    #[error("quiz generation failed: {0}")]
    Quiz(#[source] LlmError),
    #[error(transparent)]
    Render(#[from] RenderError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    DisallowedExtension,
    TooLarge { bytes: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Skipped(SkipReason),
    Explained(FileFragments),
}

/// Numbers discovered files from 1 in discovery order.
pub fn plan_tasks(files: Vec<DiscoveredFile>) -> Vec<TaskDescriptor> {
    files
        .into_iter()
        .enumerate()
        .map(|(i, file)| TaskDescriptor {
            path: file.path,
            rel_path: file.rel_path,
            index: i + 1,
        })
        .collect()
}

pub fn explain_prompt(code: &str) -> String {
    format!("Summarize this code:\n\n```{code}```")
}

pub fn code_fragment(index: usize, escaped_rel: &str, ext: &str, code: &str) -> String {
    format!("## {index}. {escaped_rel}\n```{ext}\n{code}\n```\n\n")
}

pub fn explanation_fragment(index: usize, escaped_rel: &str, explanation: &str) -> String {
    format!("## {index}. {escaped_rel}\n\n{explanation}\n\n")
}

/// Explains one file. Returns [`TaskOutcome::Skipped`] for files outside the
/// allow-list or at or above `max_file_bytes`; no request is sent for those.
pub async fn process_file<C>(
    client: &C,
    task: &TaskDescriptor,
    max_file_bytes: u64,
) -> Result<TaskOutcome, ExplainError>
where
    C: ChatClient + ?Sized,
{
    let ext = match extension_of(&task.path) {
        Some(ext) if DiscoveryRules::EXPLAIN.extensions.contains(&ext.as_str()) => ext,
        _ => {
            info!(path = %task.rel_path.display(), "[EXPLAIN] Skipping file with disallowed extension");
            return Ok(TaskOutcome::Skipped(SkipReason::DisallowedExtension));
        }
    };

    let io_err = |source| ExplainError::Io {
        path: task.path.clone(),
        source,
    };
    let bytes = tokio::fs::metadata(&task.path).await.map_err(io_err)?.len();
    if bytes >= max_file_bytes {
        info!(path = %task.rel_path.display(), bytes, limit = max_file_bytes, "[EXPLAIN] Skipping large file");
        return Ok(TaskOutcome::Skipped(SkipReason::TooLarge { bytes }));
    }

    let raw = tokio::fs::read(&task.path).await.map_err(io_err)?;
    let code = decode_lossy_dropping(&raw);
    let escaped_rel = escape_fs_path(&task.rel_path);

    info!(path = %task.rel_path.display(), index = task.index, bytes, "[EXPLAIN] Explaining file");
    let explanation = client
        .complete(EXPLAIN_SYSTEM_PROMPT, &explain_prompt(&code))
        .await
        .map_err(|source| ExplainError::Llm {
            path: task.path.clone(),
            source,
        })?;

    Ok(TaskOutcome::Explained(FileFragments {
        index: task.index,
        code_md: code_fragment(task.index, &escaped_rel, &ext, &code),
        explanation_md: explanation_fragment(task.index, &escaped_rel, &explanation),
    }))
}

/// Everything the explanation pass produced.
#[derive(Debug, Default)]
pub struct ExplainOutcome {
    pub code_markdown: String,
    pub explanation_markdown: String,
    /// Explanation fragments only, without the document header.
    pub corpus: String,
    pub explained: usize,
    pub skipped: usize,
    pub failures: Vec<FileFailure>,
}

/// Runs the explanation pass over `root` and assembles both markdown documents.
pub async fn explain_folder<C>(root: &Path, config: &Config, client: &C) -> Result<ExplainOutcome, ExplainError>
where
    C: ChatClient + ?Sized,
{
    let files = discover_files(root, &DiscoveryRules::EXPLAIN)?;
    let tasks = plan_tasks(files);
    info!(root = %root.display(), tasks = tasks.len(), concurrency = config.concurrency, "[EXPLAIN] Starting explanation pass");

    let max_file_bytes = config.max_file_bytes;
    let mut completions = stream::iter(tasks.iter())
        .map(|task| async move { (task, process_file(client, task, max_file_bytes).await) })
        .buffer_unordered(config.concurrency.max(1));

    let mut outcome = ExplainOutcome::default();
    let mut fragments: Vec<FileFragments> = Vec::new();
    while let Some((task, result)) = completions.next().await {
        match result {
            Ok(TaskOutcome::Explained(fragment)) => fragments.push(fragment),
            Ok(TaskOutcome::Skipped(_)) => outcome.skipped += 1,
            Err(e) => match config.failure_policy {
                FailurePolicy::FailFast => {
                    error!(path = %task.rel_path.display(), error = %e, "[EXPLAIN] Aborting batch on failed file");
                    return Err(e);
                }
                FailurePolicy::Collect => {
                    warn!(path = %task.rel_path.display(), error = %e, "[EXPLAIN] File failed, continuing");
                    outcome.failures.push(FileFailure {
                        path: task.rel_path.clone(),
                        message: e.to_string(),
                    });
                }
            },
        }
    }
    drop(completions);

    fragments.sort_by_key(|f| f.index);
    outcome.explained = fragments.len();
    outcome.code_markdown.push_str(CODE_DOC_HEADER);
    outcome.explanation_markdown.push_str(EXPLANATION_DOC_HEADER);
    for fragment in &fragments {
        outcome.code_markdown.push_str(&fragment.code_md);
        outcome.explanation_markdown.push_str(&fragment.explanation_md);
        outcome.corpus.push_str(&fragment.explanation_md);
    }

    info!(
        explained = outcome.explained,
        skipped = outcome.skipped,
        failed = outcome.failures.len(),
        "[EXPLAIN] Explanation pass complete"
    );
    Ok(outcome)
}

/// What an `explain` run wrote.
#[derive(Debug)]
pub struct ExplainReport {
    pub outputs: Vec<PathBuf>,
    pub explained: usize,
    pub skipped: usize,
    pub failures: Vec<FileFailure>,
}

/// Explanation pass, code and explanation PDFs, then optionally the quiz PDF.
///
/// Nothing is written if the explanation pass fails.
pub async fn generate_documents<C, R>(
    root: &Path,
    config: &Config,
    client: &C,
    renderer: &R,
    with_quiz: bool,
) -> Result<ExplainReport, ExplainError>
where
    C: ChatClient + ?Sized,
    R: MarkdownRenderer + ?Sized,
{
    let outcome = explain_folder(root, config, client).await?;

    let mut outputs = Vec::new();
    let code_pdf = config.output_path(CODE_PDF);
    renderer.render(&outcome.code_markdown, &code_pdf).await?;
    outputs.push(code_pdf);

    let explanation_pdf = config.output_path(EXPLANATION_PDF);
    renderer.render(&outcome.explanation_markdown, &explanation_pdf).await?;
    outputs.push(explanation_pdf);

    if with_quiz {
        if outcome.corpus.is_empty() {
            info!("[QUIZ] No explanations produced, skipping quiz");
        } else {
            let quiz = quiz::generate_quiz(client, &outcome.corpus, config.prompt_context_chars)
                .await
                .map_err(ExplainError::Quiz)?;
            let quiz_pdf = config.output_path(QUIZ_PDF);
            renderer.render(&quiz::quiz_document(&quiz), &quiz_pdf).await?;
            outputs.push(quiz_pdf);
        }
    }

    Ok(ExplainReport {
        outputs,
        explained: outcome.explained,
        skipped: outcome.skipped,
        failures: outcome.failures,
    })
}
