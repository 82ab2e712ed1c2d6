//! Project report: AI summary, AI recommendations and a complexity listing in
//! one directly-built PDF.
//!
//! The explanation pass runs first (no markdown PDFs are written), its corpus
//! feeds the summary and recommendation prompts, then the complexity pass runs.
//! All three bodies are reduced to ASCII before layout.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use crate::complexity::{analyze_project, format_complexity_report, ComplexityError};
use crate::config::Config;
use crate::contract::{ChatClient, FileFailure, MetricsExtractor};
use crate::explain::{explain_folder, ExplainError};
use crate::llm::LlmError;
use crate::markdown_pdf::RenderError;
use crate::report_pdf::{write_sections_pdf, TextSection};
use crate::sanitize::{strip_non_ascii, truncate_context};

pub const REPORT_PDF: &str = "project_report.pdf";
pub const REPORT_TITLE: &str = "Project Report";

pub const SUMMARY_TITLE: &str = "Project Summary";
pub const RECOMMENDATIONS_TITLE: &str = "AI Recommendations";
pub const COMPLEXITY_TITLE: &str = "Complexity Report";

pub const REVIEWER_SYSTEM_PROMPT: &str =
    "You are a senior software engineer reviewing a codebase. Answer in plain text without markdown.";

const NOTHING_EXPLAINED: &str = "No source files were explained.";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error(transparent)]
    Explain(#[from] ExplainError),
    #[error("project summary request failed: {0}")]
    Summary(#[source] LlmError),
    #[error("recommendations request failed: {0}")]
    Recommendations(#[source] LlmError),
    #[error(transparent)]
    Complexity(#[from] ComplexityError),
    #[error(transparent)]
    Render(#[from] RenderError),
}

pub fn summary_prompt(corpus: &str, context_chars: usize) -> String {
    format!(
        "Below are one-line summaries of every file in a project. \
Write a short overview of what the project does and how it is organised.\n\n{}",
        truncate_context(corpus, context_chars)
    )
}

pub fn recommendations_prompt(corpus: &str, context_chars: usize) -> String {
    format!(
        "Below are one-line summaries of every file in a project. \
Suggest concrete improvements to its structure, code quality and maintainability.\n\n{}",
        truncate_context(corpus, context_chars)
    )
}

/// The three report bodies, already ASCII-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectReport {
    pub summary: String,
    pub recommendations: String,
    pub complexity: String,
    /// Files left out of either pass under the collect policy.
    pub failures: Vec<FileFailure>,
}

impl ProjectReport {
    pub fn sections(&self) -> Vec<TextSection> {
        vec![
            TextSection::new(SUMMARY_TITLE, self.summary.clone()),
            TextSection::new(RECOMMENDATIONS_TITLE, self.recommendations.clone()),
            TextSection::new(COMPLEXITY_TITLE, self.complexity.clone()),
        ]
    }
}

pub async fn build_report<C, E>(
    root: &Path,
    config: &Config,
    client: &C,
    extractor: &E,
) -> Result<ProjectReport, ReportError>
where
    C: ChatClient + ?Sized,
    E: MetricsExtractor + ?Sized,
{
    info!(root = %root.display(), "[REPORT] Running AI analysis");
    let explained = explain_folder(root, config, client).await?;

    let (summary, recommendations) = if explained.corpus.is_empty() {
        info!("[REPORT] Nothing explained, skipping summary and recommendations");
        (NOTHING_EXPLAINED.to_string(), NOTHING_EXPLAINED.to_string())
    } else {
        let summary = client
            .complete(REVIEWER_SYSTEM_PROMPT, &summary_prompt(&explained.corpus, config.prompt_context_chars))
            .await
            .map_err(ReportError::Summary)?;
        let recommendations = client
            .complete(
                REVIEWER_SYSTEM_PROMPT,
                &recommendations_prompt(&explained.corpus, config.prompt_context_chars),
            )
            .await
            .map_err(ReportError::Recommendations)?;
        (summary, recommendations)
    };

    info!("[REPORT] Running complexity analysis");
    let complexity = analyze_project(root, extractor, config.failure_policy)?;
    info!(
        functions = complexity.functions.len(),
        files = complexity.files_analyzed,
        "[REPORT] Complexity analysis complete"
    );

    let mut failures = explained.failures;
    failures.extend(complexity.failures);

    Ok(ProjectReport {
        summary: strip_non_ascii(&summary),
        recommendations: strip_non_ascii(&recommendations),
        complexity: strip_non_ascii(&format_complexity_report(&complexity.functions)),
        failures,
    })
}

/// Builds the report and writes `<output_dir>/project_report.pdf`.
pub async fn generate_report<C, E>(
    root: &Path,
    config: &Config,
    client: &C,
    extractor: &E,
) -> Result<PathBuf, ReportError>
where
    C: ChatClient + ?Sized,
    E: MetricsExtractor + ?Sized,
{
    let report = build_report(root, config, client, extractor).await?;

    info!("[REPORT] Generating PDF report");
    let output = config.output_path(REPORT_PDF);
    write_sections_pdf(&output, REPORT_TITLE, &report.sections())?;
    info!(output = %output.display(), "[REPORT] Report generated");
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sections_are_in_fixed_order() {
        let report = ProjectReport {
            summary: "s".into(),
            recommendations: "r".into(),
            complexity: String::new(),
            failures: vec![],
        };
        let titles: Vec<_> = report.sections().into_iter().map(|s| s.title).collect();
        assert_eq!(titles, vec![SUMMARY_TITLE, RECOMMENDATIONS_TITLE, COMPLEXITY_TITLE]);
    }

    #[test]
    fn prompts_truncate_the_corpus() {
        let corpus = "y".repeat(100);
        assert!(summary_prompt(&corpus, 10).ends_with("[... truncated ...]"));
        assert!(recommendations_prompt(&corpus, 1000).ends_with(&corpus));
    }
}
