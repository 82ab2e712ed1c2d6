//! Function-level cyclomatic complexity for the project report.
//!
//! [`HeuristicExtractor`] is a token-level extractor in the spirit of lizard:
//! it does not parse, it blanks comments and string literals, finds function
//! headers with a handful of patterns and counts decision points inside each
//! body. Good enough to rank functions, not a compiler front-end.

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::FailurePolicy;
use crate::contract::{FileFailure, FunctionMetrics, MetricsExtractor};
use crate::discover::{discover_files, extension_of, DiscoveryRules};
use crate::load_config::ConfigError;
use crate::sanitize::decode_lossy_dropping;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("no complexity analyzer for {}", .0.display())]
    UnsupportedExtension(PathBuf),
}

#[derive(Debug, Error)]
pub enum ComplexityError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Language {
    Python,
    /// C, C++, Java, JavaScript, TypeScript.
    Brace,
}

fn language_for(path: &Path) -> Option<Language> {
    match extension_of(path)?.as_str() {
        "py" => Some(Language::Python),
        "c" | "h" | "cc" | "cpp" | "hpp" | "java" | "js" | "jsx" | "ts" | "tsx" => Some(Language::Brace),
        _ => None,
    }
}

static ARROW_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([A-Za-z_$][\w$]*)\s*=\s*(?:async\s+)?(?:<[^()]*>\s*)?(?:\([^()]*\)|[A-Za-z_$][\w$]*)\s*(?::[^=]*)?=>\s*$")
        .expect("static regex is valid")
});

static FUNCTION_KEYWORD_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bfunction\b\s*\*?\s*([A-Za-z_$][\w$]*)?\s*(?:<[^()]*>)?\s*\([^()]*\)\s*(?::[^{]*)?$")
        .expect("static regex is valid")
});

static CALLABLE_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"([A-Za-z_$~][\w$~]*(?:::[A-Za-z_$~][\w$~]*)*)\s*(?:<[^()]*>)?\s*\([^()]*(?:\([^()]*\)[^()]*)*\)\s*(?:(?:const|noexcept|override|final)\b\s*|throws\s+[\w.,\s]+|:\s*[\w<>\[\]|.,\s?]+)*$",
    )
    .expect("static regex is valid")
});

/// Start of a C++ constructor initializer list: `) : member(`.
static INIT_LIST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\)\s*:\s*[A-Za-z_][\w:<>]*\s*\(").expect("static regex is valid"));

static BRACE_DECISIONS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:if|for|while|case|catch)\b|&&|\|\||\?[^.?]").expect("static regex is valid"));

static PY_DEF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\s*)(?:async\s+)?def\s+([A-Za-z_]\w*)\s*\(").expect("static regex is valid"));

static PY_DECISIONS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:if|elif|for|while|except|and|or)\b").expect("static regex is valid"));

const NOT_FUNCTIONS: &[&str] = &[
    "if", "for", "while", "switch", "catch", "return", "else", "do", "try", "sizeof", "new", "synchronized",
    "function", "with", "foreach",
];

/// The bundled extractor. Stateless.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeuristicExtractor;

impl MetricsExtractor for HeuristicExtractor {
    fn analyze_file(&self, path: &Path) -> Result<Vec<FunctionMetrics>, AnalysisError> {
        let language = language_for(path).ok_or_else(|| AnalysisError::UnsupportedExtension(path.to_path_buf()))?;
        let raw = std::fs::read(path).map_err(|source| AnalysisError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let source = decode_lossy_dropping(&raw);
        Ok(analyze_source(&source, language))
    }
}

fn analyze_source(source: &str, language: Language) -> Vec<FunctionMetrics> {
    let cleaned = blank_comments_and_strings(source, language);
    match language {
        Language::Python => analyze_python(&cleaned),
        Language::Brace => analyze_brace(&cleaned),
    }
}

fn blank(c: char) -> char {
    if c == '\n' {
        '\n'
    } else {
        ' '
    }
}

/// Replaces comment and string-literal contents with spaces, keeping newlines
/// so line numbers survive.
fn blank_comments_and_strings(source: &str, language: Language) -> String {
    let chars: Vec<char> = source.chars().collect();
    let n = chars.len();
    let at = |i: usize, pat: &str| pat.chars().enumerate().all(|(k, c)| chars.get(i + k) == Some(&c));
    let line_comment = match language {
        Language::Python => "#",
        Language::Brace => "//",
    };

    let mut out = String::with_capacity(source.len());
    let mut i = 0;
    while i < n {
        let c = chars[i];
        if at(i, line_comment) {
            while i < n && chars[i] != '\n' {
                out.push(' ');
                i += 1;
            }
            continue;
        }

        let block = match language {
            Language::Brace if at(i, "/*") => Some(("/*", "*/")),
            Language::Python if at(i, "\"\"\"") => Some(("\"\"\"", "\"\"\"")),
            Language::Python if at(i, "'''") => Some(("'''", "'''")),
            _ => None,
        };
        if let Some((open, close)) = block {
            out.extend(std::iter::repeat(' ').take(open.len()));
            i += open.len();
            while i < n && !at(i, close) {
                out.push(blank(chars[i]));
                i += 1;
            }
            if i < n {
                out.extend(std::iter::repeat(' ').take(close.len()));
                i += close.len();
            }
            continue;
        }

        if language == Language::Brace && c == '/' && regex_literal_may_start(&out) {
            if let Some(end) = regex_literal_end(&chars, i) {
                out.extend(std::iter::repeat(' ').take(end - i + 1));
                i = end + 1;
                continue;
            }
        }

        let is_quote = c == '"' || c == '\'' || (language == Language::Brace && c == '`');
        if is_quote {
            let multiline = c == '`';
            out.push(' ');
            i += 1;
            while i < n && chars[i] != c && (multiline || chars[i] != '\n') {
                if chars[i] == '\\' && i + 1 < n {
                    out.push(blank(chars[i]));
                    out.push(blank(chars[i + 1]));
                    i += 2;
                    continue;
                }
                out.push(blank(chars[i]));
                i += 1;
            }
            if i < n && chars[i] == c {
                out.push(' ');
                i += 1;
            }
            continue;
        }

        out.push(c);
        i += 1;
    }
    out
}

/// A `/` starts a regex literal only where an operand is expected.
fn regex_literal_may_start(out: &str) -> bool {
    let before = out.trim_end();
    match before.chars().last() {
        None => true,
        Some(c) if "(,=:[!&|?{};".contains(c) => true,
        Some(_) => before
            .strip_suffix("return")
            .is_some_and(|rest| !rest.ends_with(|c: char| c.is_alphanumeric() || c == '_' || c == '$')),
    }
}

/// Index of the closing `/` of a regex literal opened at `start`, if it closes
/// on the same line.
fn regex_literal_end(chars: &[char], start: usize) -> Option<usize> {
    let mut in_class = false;
    let mut i = start + 1;
    while i < chars.len() {
        match chars[i] {
            '\n' => return None,
            '\\' => {
                i += 2;
                continue;
            }
            '[' => in_class = true,
            ']' => in_class = false,
            '/' if !in_class => return Some(i),
            _ => {}
        }
        i += 1;
    }
    None
}

fn line_of(text: &str, byte_pos: usize) -> u32 {
    text[..byte_pos].bytes().filter(|&b| b == b'\n').count() as u32 + 1
}

/// Name of the function whose header is `segment`, if it is one.
fn function_header_name(segment: &str) -> Option<(usize, String)> {
    let segment = match INIT_LIST.find(segment) {
        Some(init) => &segment[..init.start() + 1],
        None => segment,
    };
    if let Some(caps) = ARROW_HEADER.captures(segment) {
        let name = caps.get(1)?;
        return Some((name.start(), name.as_str().to_string()));
    }
    if let Some(caps) = FUNCTION_KEYWORD_HEADER.captures(segment) {
        return Some(match caps.get(1) {
            Some(name) => (name.start(), name.as_str().to_string()),
            None => (caps.get(0)?.start(), "(anonymous)".to_string()),
        });
    }
    let caps = CALLABLE_HEADER.captures(segment)?;
    let name = caps.get(1)?;
    let last = name.as_str().rsplit("::").next().unwrap_or_default();
    if NOT_FUNCTIONS.contains(&last) {
        return None;
    }
    Some((name.start(), name.as_str().to_string()))
}

fn matching_brace(text: &str, open: usize) -> usize {
    let mut depth = 0usize;
    for (pos, b) in text.bytes().enumerate().skip(open) {
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return pos;
                }
            }
            _ => {}
        }
    }
    text.len().saturating_sub(1)
}

fn analyze_brace(text: &str) -> Vec<FunctionMetrics> {
    let mut functions = Vec::new();
    let mut segment_start = 0;
    for (pos, b) in text.bytes().enumerate() {
        match b {
            b'{' => {
                let segment = &text[segment_start..pos];
                if let Some((name_offset, name)) = function_header_name(segment) {
                    let end = matching_brace(text, pos);
                    let start_line = line_of(text, segment_start + name_offset);
                    let end_line = line_of(text, end);
                    let body = &text[pos..=end];
                    let decisions = BRACE_DECISIONS.find_iter(body).count() as u32;
                    functions.push(FunctionMetrics {
                        name,
                        cyclomatic_complexity: 1 + decisions,
                        length: end_line - start_line + 1,
                    });
                }
                segment_start = pos + 1;
            }
            b'}' | b';' => segment_start = pos + 1,
            _ => {}
        }
    }
    functions
}

fn indent_width(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

/// Decision points of one `def` block, leaving out nested `def` bodies, which
/// are reported as functions of their own.
fn python_decisions(block: &[&str]) -> usize {
    let mut decisions = 0;
    let mut nested_indent: Option<usize> = None;
    for (i, line) in block.iter().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let indent = indent_width(line);
        if let Some(nested) = nested_indent {
            if indent > nested {
                continue;
            }
            nested_indent = None;
        }
        if i > 0 && PY_DEF.is_match(line) {
            nested_indent = Some(indent);
            continue;
        }
        decisions += PY_DECISIONS.find_iter(line).count();
    }
    decisions
}

fn analyze_python(text: &str) -> Vec<FunctionMetrics> {
    let lines: Vec<&str> = text.lines().collect();
    let mut functions = Vec::new();
    for (start, line) in lines.iter().enumerate() {
        let Some(caps) = PY_DEF.captures(line) else {
            continue;
        };
        let def_indent = caps.get(1).map_or(0, |m| m.as_str().len());
        let mut end = start;
        for (offset, candidate) in lines.iter().enumerate().skip(start + 1) {
            if candidate.trim().is_empty() {
                continue;
            }
            if indent_width(candidate) <= def_indent {
                break;
            }
            end = offset;
        }
        let decisions = python_decisions(&lines[start..=end]);
        functions.push(FunctionMetrics {
            name: caps[2].to_string(),
            cyclomatic_complexity: 1 + decisions as u32,
            length: (end - start + 1) as u32,
        });
    }
    functions
}

/// Aggregated metrics for a project.
#[derive(Debug, Default)]
pub struct ComplexityOutcome {
    pub functions: Vec<FunctionMetrics>,
    pub files_analyzed: usize,
    pub failures: Vec<FileFailure>,
}

/// Runs `extractor` over every complexity-pass file under `root`, in discovery
/// order, and flattens the per-file results.
pub fn analyze_project<E>(
    root: &Path,
    extractor: &E,
    policy: FailurePolicy,
) -> Result<ComplexityOutcome, ComplexityError>
where
    E: MetricsExtractor + ?Sized,
{
    let files = discover_files(root, &DiscoveryRules::COMPLEXITY)?;
    info!(root = %root.display(), files = files.len(), "[COMPLEXITY] Running complexity analysis");

    let mut outcome = ComplexityOutcome::default();
    for file in files {
        match extractor.analyze_file(&file.path) {
            Ok(functions) => {
                debug!(path = %file.rel_path.display(), functions = functions.len(), "[COMPLEXITY] Analyzed file");
                outcome.files_analyzed += 1;
                outcome.functions.extend(functions);
            }
            Err(e) => match policy {
                FailurePolicy::FailFast => {
                    error!(path = %file.rel_path.display(), error = %e, "[COMPLEXITY] Aborting on failed file");
                    return Err(e.into());
                }
                FailurePolicy::Collect => {
                    warn!(path = %file.rel_path.display(), error = %e, "[COMPLEXITY] Error analyzing file, skipping");
                    outcome.failures.push(FileFailure {
                        path: file.rel_path,
                        message: e.to_string(),
                    });
                }
            },
        }
    }
    Ok(outcome)
}

/// One `name - CC: n - LOC: n` line per function.
pub fn format_complexity_report(functions: &[FunctionMetrics]) -> String {
    functions
        .iter()
        .map(|f| format!("{} - CC: {} - LOC: {}", f.name, f.cyclomatic_complexity, f.length))
        .collect::<Vec<_>>()
        .join("\n")
}
