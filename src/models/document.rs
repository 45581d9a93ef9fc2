//! In-memory view of a document's extracted text and metadata.

use std::ops::Range;
use std::path::{Path, PathBuf};

use super::EmbeddedMetadata;

/// Per-page plain text plus the embedded metadata of one document.
///
/// Built by a [`TextSource`](crate::utils::TextSource); pages without
/// extractable text are stored as empty strings.
#[derive(Debug, Clone, Default)]
pub struct Document {
    path: PathBuf,
    pages: Vec<String>,
    embedded: EmbeddedMetadata,
    secondary: Option<EmbeddedMetadata>,
}

impl Document {
    pub fn new(path: impl Into<PathBuf>, pages: Vec<String>) -> Self {
        Self {
            path: path.into(),
            pages,
            embedded: EmbeddedMetadata::default(),
            secondary: None,
        }
    }

    /// Build a document from literal page texts
    pub fn from_pages<S: Into<String>>(path: impl Into<PathBuf>, pages: Vec<S>) -> Self {
        Self::new(path, pages.into_iter().map(Into::into).collect())
    }

    /// A document whose text could not be read at all
    pub fn unreadable(path: impl Into<PathBuf>) -> Self {
        Self::new(path, Vec::new())
    }

    pub fn with_embedded(mut self, embedded: EmbeddedMetadata) -> Self {
        self.embedded = embedded;
        self
    }

    pub fn with_secondary(mut self, secondary: Option<EmbeddedMetadata>) -> Self {
        self.secondary = secondary;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name including extension, or the whole path if it has none
    pub fn filename(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// File name without extension
    pub fn stem(&self) -> Option<String> {
        self.path
            .file_stem()
            .map(|n| n.to_string_lossy().into_owned())
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Text of one page; empty for out-of-range indices
    pub fn page_text(&self, index: usize) -> &str {
        self.pages.get(index).map(String::as_str).unwrap_or("")
    }

    pub fn pages(&self) -> &[String] {
        &self.pages
    }

    /// Concatenated text of the pages in `range`, one page per line block
    pub fn text_of(&self, range: Range<usize>) -> String {
        let end = range.end.min(self.pages.len());
        let start = range.start.min(end);
        self.pages[start..end].join("\n")
    }

    pub fn full_text(&self) -> String {
        self.pages.join("\n")
    }

    /// Range covering the last `n` pages (fewer if the document is shorter)
    pub fn tail_range(&self, n: usize) -> Range<usize> {
        self.pages.len().saturating_sub(n)..self.pages.len()
    }

    pub fn embedded_metadata(&self) -> &EmbeddedMetadata {
        &self.embedded
    }

    pub fn secondary_metadata(&self) -> Option<&EmbeddedMetadata> {
        self.secondary.as_ref()
    }

    /// True when at least one page carries non-whitespace text
    pub fn is_readable(&self) -> bool {
        self.pages.iter().any(|p| !p.trim().is_empty())
    }
}
