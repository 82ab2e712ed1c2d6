//! Text clean-up for the two rendering paths.
//!
//! Paths end up inside markdown headings that pandoc hands to LaTeX, so the
//! characters LaTeX treats structurally get a backslash. Model output and
//! metrics text go through [`strip_non_ascii`] because neither xelatex with the
//! default font nor the builtin PDF fonts reliably typeset anything else.

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

/// Backslash comes first in the class so it is escaped in the same single pass
/// as everything else and never doubled.
static LATEX_SPECIALS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([\\_#{}$%&~^])").expect("static regex is valid"));

static NON_ASCII: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\x00-\x7F]+").expect("static regex is valid"));

/// Normalizes separators to `/` and escapes `\ _ # { } $ % & ~ ^`.
pub fn escape_path(rel_path: &str) -> String {
    let normalized = rel_path.replace('\\', "/");
    LATEX_SPECIALS.replace_all(&normalized, r"\$1").into_owned()
}

/// [`escape_path`] for a filesystem path.
pub fn escape_fs_path(rel_path: &Path) -> String {
    escape_path(&rel_path.to_string_lossy())
}

/// Removes every character with a code point of 128 or above.
pub fn strip_non_ascii(text: &str) -> String {
    NON_ASCII.replace_all(text, "").into_owned()
}

/// Decodes bytes as UTF-8, dropping invalid sequences instead of replacing them.
pub fn decode_lossy_dropping(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        out.push_str(chunk.valid());
    }
    out
}

/// Keeps at most `limit` characters. A marker is appended when anything was cut.
pub fn truncate_context(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        None => text.to_string(),
        Some((cut, _)) => {
            let mut out = text[..cut].to_string();
            out.push_str("\n\n[... truncated ...]");
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_underscore_and_hash() {
        assert_eq!(escape_path("a_b#c"), r"a\_b\#c");
    }

    #[test]
    fn plain_paths_are_unchanged() {
        assert_eq!(escape_path("src/main.py"), "src/main.py");
        assert_eq!(escape_path(""), "");
    }

    #[test]
    fn backslash_separators_become_forward_slashes() {
        assert_eq!(escape_path(r"src\lib\my_mod.py"), r"src/lib/my\_mod.py");
    }

    #[test]
    fn every_special_character_is_escaped_once() {
        assert_eq!(escape_path("{$%&~^}"), r"\{\$\%\&\~\^\}");
    }

    #[test]
    fn strip_removes_only_non_ascii() {
        assert_eq!(strip_non_ascii("caf\u{e9} \u{1F680} ok"), "caf  ok");
        assert_eq!(strip_non_ascii(""), "");
        let all_ascii: String = (0u8..128).map(char::from).collect();
        assert_eq!(strip_non_ascii(&all_ascii), all_ascii);
    }

    #[test]
    fn invalid_utf8_bytes_are_dropped() {
        let bytes = b"ab\xffc\xe2\x82d";
        assert_eq!(decode_lossy_dropping(bytes), "abcd");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_context("abc", 5), "abc");
        assert_eq!(truncate_context("abc", 3), "abc");
        assert_eq!(truncate_context("\u{e9}\u{e9}\u{e9}", 2), "\u{e9}\u{e9}\n\n[... truncated ...]");
    }
}
