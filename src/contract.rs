//! # contract: the seams between the pipeline and the outside world
//!
//! The explanation pipeline talks to three things it does not control: a remote
//! chat-completion API, a function-level metrics extractor and a document
//! toolchain. Each one sits behind a trait defined here so the orchestration in
//! [`crate::explain`] and [`crate::report`] can be exercised with deterministic
//! mocks.
//!
//! ## Mocking & Testing
//! - Every trait is annotated for `mockall`; the generated `Mock*` types are
//!   exported under `cfg(test)` and under the default `test-export-mocks`
//!   feature so integration tests in `tests/` can use them.
//!
//! ## Plain data
//! - [`TaskDescriptor`], [`FileFragments`], [`FunctionMetrics`] and
//!   [`FileFailure`] carry no behaviour.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::complexity::AnalysisError;
use crate::llm::LlmError;
use crate::markdown_pdf::RenderError;

/// One discovered file waiting to be explained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDescriptor {
    /// Absolute (or root-joined) path used for reading.
    pub path: PathBuf,
    /// Path relative to the project root, used in headings.
    pub rel_path: PathBuf,
    /// 1-based position in discovery order.
    pub index: usize,
}

/// The two markdown fragments one file contributes to the output documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFragments {
    pub index: usize,
    pub code_md: String,
    pub explanation_md: String,
}

/// One function as reported by a [`MetricsExtractor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionMetrics {
    pub name: String,
    pub cyclomatic_complexity: u32,
    /// Number of source lines from header to end of body, inclusive.
    pub length: u32,
}

/// A file left out of the output under [`crate::config::FailurePolicy::Collect`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFailure {
    pub path: PathBuf,
    pub message: String,
}

/// Chat-completion style text generation.
///
/// Implementations return the assistant's text with non-ASCII characters
/// already removed, and surface every transport or API failure as an error;
/// there is no retry.
#[cfg_attr(any(test, feature = "test-export-mocks"), mockall::automock)]
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Send one request made of a system instruction and a user prompt.
    async fn complete<'a>(&self, system: &'a str, prompt: &'a str) -> Result<String, LlmError>;
}

/// Function-level metrics for one source file.
#[cfg_attr(any(test, feature = "test-export-mocks"), mockall::automock)]
pub trait MetricsExtractor: Send + Sync {
    fn analyze_file(&self, path: &Path) -> Result<Vec<FunctionMetrics>, AnalysisError>;
}

/// Turns a markdown document into a PDF file on disk.
#[cfg_attr(any(test, feature = "test-export-mocks"), mockall::automock)]
#[async_trait]
pub trait MarkdownRenderer: Send + Sync {
    async fn render<'a>(&self, markdown: &'a str, output: &'a Path) -> Result<(), RenderError>;
}
