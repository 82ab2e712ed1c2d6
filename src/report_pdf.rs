//! Direct PDF construction from titled plain-text sections.
//!
//! Uses the builtin Helvetica faces, so every string handed in must already be
//! ASCII. Layout is deliberately simple: A4, one column, greedy word wrap,
//! a new page whenever the cursor reaches the bottom margin.

use printpdf::{BuiltinFont, Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, Point, Pt, TextItem};
use std::path::Path;
use tracing::{debug, info};

use crate::markdown_pdf::RenderError;

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 15.0;

const TITLE_SIZE_PT: f32 = 14.0;
const TITLE_LINE_MM: f32 = 10.0;
const BODY_SIZE_PT: f32 = 11.0;
const BODY_LINE_MM: f32 = 5.5;
const SECTION_GAP_MM: f32 = 4.0;

const POINTS_PER_MM: f32 = 72.0 / 25.4;

/// Advance widths of Helvetica for ASCII 32..=126, in 1/1000 em. The bold face
/// is never narrower, so titles are measured with the regular widths scaled up.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 222, 333, 333, 389, 584, 278, 333, 278, 278, // space to /
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // 0 to 9
    278, 278, 584, 584, 584, 556, 1015, // : to @
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, 667, 778, 722, 667, 611, 722,
    667, 944, 667, 667, 611, // A to Z
    278, 278, 278, 469, 556, 333, // [ to `
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, 556, 556, 333, 500, 278, 556,
    500, 722, 500, 500, 500, // a to z
    334, 260, 334, 584, // { to ~
];

/// Anything outside the table is measured as a full em.
const FALLBACK_GLYPH_WIDTH: u32 = 1000;

/// Bold Helvetica glyphs are at most this much wider than regular ones, in percent.
const BOLD_WIDTH_PERCENT: u32 = 115;

fn glyph_width(c: char) -> u32 {
    match c {
        ' '..='~' => u32::from(HELVETICA_WIDTHS[c as usize - ' ' as usize]),
        _ => FALLBACK_GLYPH_WIDTH,
    }
}

/// Width of `text` set in regular Helvetica, in 1/1000 em.
pub fn helvetica_width(text: &str) -> u32 {
    text.chars().map(glyph_width).sum()
}

/// How many 1/1000 em units fit between the margins at `size_pt`.
pub fn line_budget(size_pt: f32) -> u32 {
    let usable_pt = (PAGE_WIDTH_MM - 2.0 * MARGIN_MM) * POINTS_PER_MM;
    (usable_pt / size_pt * 1000.0) as u32
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSection {
    pub title: String,
    pub body: String,
}

impl TextSection {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }
}

/// Byte offset where `word` stops fitting in `max_width`, if it does not fit.
/// At least one character is always kept.
fn overflow_cut(word: &str, max_width: u32) -> Option<usize> {
    let mut used = 0;
    for (pos, c) in word.char_indices() {
        used += glyph_width(c);
        if used > max_width {
            return Some(if pos == 0 { c.len_utf8() } else { pos }).filter(|&cut| cut < word.len());
        }
    }
    None
}

/// Greedy word wrap against a width in 1/1000 em, measured with Helvetica
/// metrics. Words wider than a line are split; blank lines are kept.
pub fn wrap_text(text: &str, max_width: u32) -> Vec<String> {
    let space = glyph_width(' ');
    let mut lines = Vec::new();
    for paragraph in text.replace('\t', "    ").split('\n') {
        let mut current = String::new();
        let mut current_width = 0;
        for word in paragraph.split_whitespace() {
            let mut word = word;
            while let Some(cut) = overflow_cut(word, max_width) {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                    current_width = 0;
                }
                let (head, tail) = word.split_at(cut);
                lines.push(head.to_string());
                word = tail;
            }
            if word.is_empty() {
                continue;
            }
            let word_width = helvetica_width(word);
            if current.is_empty() {
                current.push_str(word);
                current_width = word_width;
            } else if current_width + space + word_width <= max_width {
                current.push(' ');
                current.push_str(word);
                current_width += space + word_width;
            } else {
                lines.push(std::mem::replace(&mut current, word.to_string()));
                current_width = word_width;
            }
        }
        lines.push(current);
    }
    lines
}

struct PageWriter {
    pages: Vec<PdfPage>,
    ops: Vec<Op>,
    y_mm: f32,
}

impl PageWriter {
    fn new() -> Self {
        Self {
            pages: Vec::new(),
            ops: Vec::new(),
            y_mm: PAGE_HEIGHT_MM - MARGIN_MM,
        }
    }

    fn break_page(&mut self) {
        let ops = std::mem::take(&mut self.ops);
        self.pages.push(PdfPage::new(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), ops));
        self.y_mm = PAGE_HEIGHT_MM - MARGIN_MM;
    }

    fn line(&mut self, text: &str, font: BuiltinFont, size_pt: f32, advance_mm: f32) {
        if self.y_mm - advance_mm < MARGIN_MM {
            self.break_page();
        }
        self.y_mm -= advance_mm;
        if text.is_empty() {
            return;
        }
        self.ops.extend([
            Op::StartTextSection,
            Op::SetTextCursor {
                pos: Point::new(Mm(MARGIN_MM), Mm(self.y_mm)),
            },
            Op::SetFontSizeBuiltinFont {
                size: Pt(size_pt),
                font: font.clone(),
            },
            Op::WriteTextBuiltinFont {
                items: vec![TextItem::Text(text.to_string())],
                font,
            },
            Op::EndTextSection,
        ]);
    }

    fn gap(&mut self, mm: f32) {
        self.y_mm -= mm;
    }

    fn finish(mut self) -> Vec<PdfPage> {
        self.break_page();
        self.pages
    }
}

/// Lays the sections out and returns the serialized PDF.
pub fn sections_to_pdf_bytes(document_title: &str, sections: &[TextSection]) -> Vec<u8> {
    let mut writer = PageWriter::new();
    for section in sections {
        let title_budget = line_budget(TITLE_SIZE_PT) * 100 / BOLD_WIDTH_PERCENT;
        for line in wrap_text(&section.title, title_budget) {
            writer.line(&line, BuiltinFont::HelveticaBold, TITLE_SIZE_PT, TITLE_LINE_MM);
        }
        for line in wrap_text(&section.body, line_budget(BODY_SIZE_PT)) {
            writer.line(&line, BuiltinFont::Helvetica, BODY_SIZE_PT, BODY_LINE_MM);
        }
        writer.gap(SECTION_GAP_MM);
    }
    let pages = writer.finish();
    debug!(pages = pages.len(), sections = sections.len(), "[RENDER] Laid out text sections");

    let mut warnings = Vec::new();
    let bytes = PdfDocument::new(document_title)
        .with_pages(pages)
        .save(&PdfSaveOptions::default(), &mut warnings);
    if !warnings.is_empty() {
        debug!(warnings = warnings.len(), "[RENDER] PDF serializer reported warnings");
    }
    bytes
}

/// Writes the sections as a PDF at `output`.
pub fn write_sections_pdf(output: &Path, document_title: &str, sections: &[TextSection]) -> Result<(), RenderError> {
    if sections.is_empty() {
        return Err(RenderError::EmptyInput);
    }
    let bytes = sections_to_pdf_bytes(document_title, sections);
    std::fs::write(output, &bytes)?;
    info!(output = %output.display(), bytes = bytes.len(), "[RENDER] PDF written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widths_follow_helvetica_metrics() {
        assert_eq!(helvetica_width("aa bb"), 556 * 4 + 278);
        assert_eq!(helvetica_width("W"), 944);
        assert_eq!(helvetica_width("i"), 222);
        assert_eq!(helvetica_width("\u{e9}"), 1000);
    }

    #[test]
    fn wraps_on_word_boundaries() {
        assert_eq!(wrap_text("aa bb cc", helvetica_width("aa bb")), vec!["aa bb", "cc"]);
    }

    #[test]
    fn keeps_blank_lines_and_splits_long_words() {
        assert_eq!(wrap_text("abcdefg\n\nx", 1668), vec!["abc", "def", "g", "", "x"]);
    }

    #[test]
    fn glyph_wider_than_the_line_still_progresses() {
        assert_eq!(wrap_text("WW", 100), vec!["W", "W"]);
    }

    #[test]
    fn empty_text_is_one_empty_line() {
        assert_eq!(wrap_text("", 10), vec![String::new()]);
    }

    #[test]
    fn wide_glyphs_stay_inside_the_margins() {
        let budget = line_budget(BODY_SIZE_PT);
        let usable_pt = (PAGE_WIDTH_MM - 2.0 * MARGIN_MM) * POINTS_PER_MM;
        let text = ["WWWWWWWW"; 30].join(" ") + " " + &"M".repeat(200);
        let lines = wrap_text(&text, budget);
        assert!(lines.len() > 3);
        for line in &lines {
            let width_pt = helvetica_width(line) as f32 / 1000.0 * BODY_SIZE_PT;
            assert!(width_pt <= usable_pt, "{line:?} is {width_pt}pt wide");
        }
        // ordinary prose still fills more than 92 characters per line
        let prose = "the quick brown fox jumps over the lazy dog ".repeat(10);
        assert!(wrap_text(&prose, budget)[0].len() > 92);
    }

    #[test]
    fn long_bodies_spill_onto_more_pages() {
        let body = "line\n".repeat(200);
        let bytes = sections_to_pdf_bytes("t", &[TextSection::new("Complexity Report", body)]);
        assert_eq!(&bytes[0..4], b"%PDF");
    }
}
