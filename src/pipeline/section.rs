//! Section location: the core analysis window and heading paragraphs.

use std::ops::Range;

use crate::models::Document;
use crate::pipeline::patterns::{is_footer_line, CLOSING_HEADING, SECTION_HEADING};
use crate::utils::truncate_at_word;

/// Pages kept before a References heading, and the tail length otherwise
pub const WINDOW_PAGES: usize = 2;

/// Headings longer than this are treated as prose
const MAX_HEADING_CHARS: usize = 60;

/// Page range selected for positionality analysis, with its text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreWindow {
    pub pages: Range<usize>,
    pub text: String,
}

impl CoreWindow {
    pub fn page_indices(&self) -> Vec<usize> {
        self.pages.clone().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Index of the first page with a line reading exactly "References"
pub fn references_page(document: &Document) -> Option<usize> {
    document.pages().iter().position(|page| {
        page.lines()
            .any(|line| line.trim().eq_ignore_ascii_case("references"))
    })
}

/// Select the up to two pages before the References heading, or the last
/// two pages when there is none
pub fn locate(document: &Document) -> CoreWindow {
    let pages = match references_page(document) {
        Some(r) => r.saturating_sub(WINDOW_PAGES)..r,
        None => document.tail_range(WINDOW_PAGES),
    };

    tracing::debug!(
        "Core window for {}: pages {:?} of {}",
        document.filename(),
        pages,
        document.page_count()
    );

    CoreWindow {
        text: document.text_of(pages.clone()),
        pages,
    }
}

/// Limits applied when collecting a heading paragraph
#[derive(Debug, Clone, Copy)]
pub struct ParagraphLimits {
    pub max_lines: usize,
    pub max_chars: usize,
}

/// Find a positionality-style heading and collect the paragraph below it.
///
/// Blank lines before the paragraph are skipped. Collection stops at the
/// next blank line, a footer line, or after `max_lines` lines, and the
/// joined text is truncated to `max_chars` at a word boundary.
pub fn heading_paragraph(text: &str, limits: ParagraphLimits) -> Option<String> {
    let lines: Vec<&str> = text.lines().collect();

    let heading = lines.iter().position(|line| {
        let line = line.trim();
        line.chars().count() <= MAX_HEADING_CHARS && SECTION_HEADING.is_match(line)
    })?;

    let mut collected: Vec<&str> = Vec::new();
    for line in &lines[heading + 1..] {
        let line = line.trim();
        if line.is_empty() {
            if collected.is_empty() {
                continue;
            }
            break;
        }
        if is_footer_line(line) || collected.len() >= limits.max_lines {
            break;
        }
        collected.push(line);
    }

    if collected.is_empty() {
        return None;
    }

    Some(truncate_at_word(&collected.join(" "), limits.max_chars))
}

/// Text from the first Discussion/Implications/Conclusion heading onward
pub fn closing_section(text: &str) -> Option<&str> {
    CLOSING_HEADING.find(text).map(|m| &text[m.start()..])
}

/// Split text into chunks of `words_per_chunk` words, at most `max_chunks`
pub fn word_chunks(text: &str, words_per_chunk: usize, max_chunks: usize) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    words
        .chunks(words_per_chunk.max(1))
        .take(max_chunks)
        .map(|chunk| chunk.join(" "))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered_pages(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("Body text of page {}", i)).collect()
    }

    const LIMITS: ParagraphLimits = ParagraphLimits {
        max_lines: 12,
        max_chars: 500,
    };

    #[test]
    fn test_window_before_references() {
        let mut pages = numbered_pages(14);
        pages[10] = "Conclusion ends here.\nReferences\nAdams, A. (2019).".to_string();
        let doc = Document::new("a.pdf", pages);

        let window = locate(&doc);
        assert_eq!(window.pages, 8..10);
        assert_eq!(window.page_indices(), vec![8, 9]);
        assert_eq!(window.text, "Body text of page 8\nBody text of page 9");
    }

    #[test]
    fn test_window_without_references_is_tail() {
        let doc = Document::new("b.pdf", numbered_pages(8));
        assert_eq!(locate(&doc).pages, 6..8);

        let short = Document::new("c.pdf", numbered_pages(1));
        assert_eq!(locate(&short).pages, 0..1);

        let empty = Document::unreadable("d.pdf");
        let window = locate(&empty);
        assert_eq!(window.pages, 0..0);
        assert!(window.is_empty());
    }

    #[test]
    fn test_references_on_first_pages() {
        let mut pages = numbered_pages(5);
        pages[0] = "REFERENCES".to_string();
        assert_eq!(locate(&Document::new("e.pdf", pages.clone())).pages, 0..0);

        pages[0] = "Intro".to_string();
        pages[1] = "  References  ".to_string();
        assert_eq!(locate(&Document::new("f.pdf", pages)).pages, 0..1);
    }

    #[test]
    fn test_references_must_be_own_line() {
        let mut pages = numbered_pages(6);
        pages[2] = "See the references below for details.".to_string();
        assert_eq!(references_page(&Document::new("g.pdf", pages)), None);
    }

    #[test]
    fn test_heading_paragraph_verbatim() {
        let paragraph = "I am a white, first-generation scholar who taught in rural schools.";
        let text = format!("Findings\nPositionality\n\n{}\n", paragraph);
        assert_eq!(heading_paragraph(&text, LIMITS).as_deref(), Some(paragraph));
    }

    #[test]
    fn test_heading_paragraph_stops_at_blank_line() {
        let text = "Positionality\nI am a former teacher in rural schools.\n\nMethods\nWe surveyed 200 teachers in spring.";
        assert_eq!(
            heading_paragraph(text, LIMITS).as_deref(),
            Some("I am a former teacher in rural schools.")
        );
    }

    #[test]
    fn test_heading_paragraph_stops_at_footer() {
        let text = "3.1 Reflexivity\nI taught for ten years.\nMy views shaped coding.\n17\nNext page header";
        assert_eq!(
            heading_paragraph(text, LIMITS).as_deref(),
            Some("I taught for ten years. My views shaped coding.")
        );
    }

    #[test]
    fn test_heading_paragraph_truncates() {
        let long = "word ".repeat(150);
        let text = format!("Positionality\n{}", long.trim());
        let snippet = heading_paragraph(&text, LIMITS).unwrap();

        assert!(snippet.ends_with("..."));
        assert!(snippet.chars().count() <= 503);
        assert!(!snippet.trim_end_matches("...").ends_with(' '));
        assert!(snippet.trim_end_matches("...").split(' ').all(|w| w == "word"));
    }

    #[test]
    fn test_heading_paragraph_line_cap() {
        let body: Vec<String> = (0..20).map(|i| format!("line{}", i)).collect();
        let text = format!("Researcher Background\n{}", body.join("\n"));
        let limits = ParagraphLimits {
            max_lines: 3,
            max_chars: 500,
        };
        assert_eq!(
            heading_paragraph(&text, limits).as_deref(),
            Some("line0 line1 line2")
        );
    }

    #[test]
    fn test_no_heading() {
        assert!(heading_paragraph("Methods\nWe surveyed teachers.", LIMITS).is_none());
        assert!(heading_paragraph("Positionality\n\n", LIMITS).is_none());
    }

    #[test]
    fn test_word_chunks() {
        let text = "a b c d e f g";
        assert_eq!(word_chunks(text, 3, 10), vec!["a b c", "d e f", "g"]);
        assert_eq!(word_chunks(text, 3, 2), vec!["a b c", "d e f"]);
        assert!(word_chunks("", 3, 2).is_empty());
    }

    #[test]
    fn test_closing_section() {
        let text = "Intro\nResults\nDiscussion\nWe found";
        assert_eq!(closing_section(text), Some("Discussion\nWe found"));
        assert_eq!(closing_section("Intro only"), None);
    }
}
