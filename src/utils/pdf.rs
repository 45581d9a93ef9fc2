//! PDF text and metadata extraction.
//!
//! [`PdfTextSource`] reads per-page text and the Info dictionary with
//! `lopdf`. When lopdf recovers no text at all, `pdf-extract` is tried as a
//! second page reader. The XMP packet is parsed separately and offered as
//! secondary metadata.

use chrono::{NaiveDate, NaiveDateTime};
use lopdf::Object;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::models::{non_blank, Document, EmbeddedMetadata};

/// Errors that can occur during PDF extraction
#[derive(Debug, Error)]
pub enum PdfExtractError {
    #[error("Failed to extract text from PDF: {0}")]
    ExtractionFailed(String),

    #[error("File not found or not a valid PDF: {0}")]
    InvalidFile(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Supplies page text and embedded metadata for a document path.
///
/// Loading is blocking; async callers run it on a blocking thread.
pub trait TextSource: Send + Sync {
    fn load(&self, path: &Path) -> Result<Document, PdfExtractError>;
}

/// lopdf-backed text source with a pdf-extract fallback
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfTextSource;

impl PdfTextSource {
    pub fn new() -> Self {
        Self
    }
}

impl TextSource for PdfTextSource {
    fn load(&self, path: &Path) -> Result<Document, PdfExtractError> {
        if !path.is_file() {
            return Err(PdfExtractError::InvalidFile(format!(
                "Not a file: {}",
                path.display()
            )));
        }

        let doc = lopdf::Document::load(path)
            .map_err(|e| PdfExtractError::InvalidFile(format!("{}: {}", path.display(), e)))?;

        let mut pages: Vec<String> = doc
            .get_pages()
            .keys()
            .map(|&number| match doc.extract_text(&[number]) {
                Ok(text) => text,
                Err(e) => {
                    tracing::debug!("No text on page {} of {}: {}", number, path.display(), e);
                    String::new()
                }
            })
            .collect();

        if pages.iter().all(|p| p.trim().is_empty()) {
            match extract_pages_fallback(path) {
                Ok(fallback) if fallback.iter().any(|p| !p.trim().is_empty()) => {
                    tracing::debug!("Used pdf-extract fallback for {}", path.display());
                    pages = fallback;
                }
                Ok(_) => {}
                Err(e) => tracing::debug!("Fallback extraction failed: {}", e),
            }
        }

        Ok(Document::new(path, pages)
            .with_embedded(read_info(&doc))
            .with_secondary(read_xmp(&doc)))
    }
}

fn extract_pages_fallback(path: &Path) -> Result<Vec<String>, PdfExtractError> {
    // pdf-extract panics on some malformed fonts
    std::panic::catch_unwind(|| pdf_extract::extract_text_by_pages(path))
        .map_err(|_| PdfExtractError::ExtractionFailed("pdf-extract panicked".to_string()))?
        .map_err(|e| PdfExtractError::ExtractionFailed(e.to_string()))
}

/// In-memory text source keyed by file name, for tests and dry runs
#[derive(Debug, Clone, Default)]
pub struct MemoryTextSource {
    documents: HashMap<String, Document>,
}

impl MemoryTextSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(mut self, document: Document) -> Self {
        self.documents.insert(document.filename(), document);
        self
    }
}

impl TextSource for MemoryTextSource {
    fn load(&self, path: &Path) -> Result<Document, PdfExtractError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let doc = self
            .documents
            .get(&name)
            .ok_or_else(|| PdfExtractError::InvalidFile(format!("Unknown document: {}", name)))?;

        Ok(Document::new(PathBuf::from(path), doc.pages().to_vec())
            .with_embedded(doc.embedded_metadata().clone())
            .with_secondary(doc.secondary_metadata().cloned()))
    }
}

/// Follow an indirect reference once
fn resolve<'a>(doc: &'a lopdf::Document, object: &'a Object) -> Option<&'a Object> {
    match object {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

/// Read the document Info dictionary
fn read_info(doc: &lopdf::Document) -> EmbeddedMetadata {
    let Some(Object::Dictionary(info)) = doc
        .trailer
        .get(b"Info")
        .ok()
        .and_then(|obj| resolve(doc, obj))
    else {
        return EmbeddedMetadata::default();
    };

    let field = |key: &[u8]| -> Option<String> {
        match info.get(key).ok().and_then(|obj| resolve(doc, obj)) {
            Some(Object::String(bytes, _)) => non_blank(Some(decode_pdf_string(bytes))),
            Some(Object::Name(name)) => non_blank(Some(String::from_utf8_lossy(name).into_owned())),
            _ => None,
        }
    };

    EmbeddedMetadata {
        title: field(b"Title"),
        author: field(b"Author"),
        subject: field(b"Subject"),
        keywords: field(b"Keywords"),
        creation_date: field(b"CreationDate").map(|d| normalize_pdf_date(&d)),
        producer: field(b"Producer"),
    }
}

/// Read title and creators from the XMP packet linked from the catalog
fn read_xmp(doc: &lopdf::Document) -> Option<EmbeddedMetadata> {
    let catalog = doc.catalog().ok()?;
    let stream = match resolve(doc, catalog.get(b"Metadata").ok()?)? {
        Object::Stream(stream) => stream,
        _ => return None,
    };

    let bytes = stream
        .decompressed_content()
        .unwrap_or_else(|_| stream.content.clone());
    let metadata = parse_xmp(&String::from_utf8_lossy(&bytes));

    (!metadata.is_empty()).then_some(metadata)
}

/// Extract `dc:title` and `dc:creator` from an XMP packet.
///
/// Creators are joined with ", "; the first title alternative wins.
pub fn parse_xmp(xml: &str) -> EmbeddedMetadata {
    #[derive(PartialEq)]
    enum Field {
        None,
        Title,
        Creator,
    }

    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut field = Field::None;
    let mut in_item = false;
    let mut titles: Vec<String> = Vec::new();
    let mut creators: Vec<String> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"dc:title" => field = Field::Title,
                b"dc:creator" => field = Field::Creator,
                b"rdf:li" => in_item = true,
                _ => {}
            },
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"dc:title" | b"dc:creator" => field = Field::None,
                b"rdf:li" => in_item = false,
                _ => {}
            },
            Ok(Event::Text(t)) if in_item && field != Field::None => {
                let Ok(text) = t.unescape() else { continue };
                let text = text.trim().to_string();
                if text.is_empty() {
                    continue;
                }
                match field {
                    Field::Title => titles.push(text),
                    Field::Creator => creators.push(text),
                    Field::None => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                tracing::debug!("Malformed XMP packet: {}", e);
                break;
            }
            _ => {}
        }
    }

    EmbeddedMetadata {
        title: titles.into_iter().next(),
        author: (!creators.is_empty()).then(|| creators.join(", ")),
        ..EmbeddedMetadata::default()
    }
}

/// Decode a PDF text string: UTF-16BE with a BOM, UTF-8 with a BOM,
/// otherwise one byte per character
pub fn decode_pdf_string(bytes: &[u8]) -> String {
    let text = if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else if let Some(rest) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        String::from_utf8_lossy(rest).into_owned()
    } else {
        bytes.iter().map(|&b| b as char).collect()
    };

    text.replace('\0', "")
}

/// Normalise `D:YYYYMMDDHHmmSS[Z|+HH'mm']` to ISO-8601.
///
/// Values that do not parse are returned unchanged.
pub fn normalize_pdf_date(raw: &str) -> String {
    let value = raw.trim();
    let body = value.strip_prefix("D:").unwrap_or(value);
    let digits: String = body.chars().take_while(|c| c.is_ascii_digit()).collect();
    let zone = &body[digits.len()..];

    if digits.len() >= 14 {
        if let Ok(dt) = NaiveDateTime::parse_from_str(&digits[..14], "%Y%m%d%H%M%S") {
            return format!("{}{}", dt.format("%Y-%m-%dT%H:%M:%S"), format_zone(zone));
        }
    } else if digits.len() >= 8 {
        if let Ok(date) = NaiveDate::parse_from_str(&digits[..8], "%Y%m%d") {
            return date.format("%Y-%m-%d").to_string();
        }
    }

    value.to_string()
}

fn format_zone(zone: &str) -> String {
    let zone = zone.trim_end_matches('\'');
    if zone.starts_with('Z') {
        return "Z".to_string();
    }
    let Some(sign) = zone.chars().next().filter(|c| *c == '+' || *c == '-') else {
        return String::new();
    };
    let digits: String = zone[1..].chars().filter(|c| c.is_ascii_digit()).collect();
    match digits.len() {
        2 => format!("{}{}:00", sign, digits),
        4 => format!("{}{}:{}", sign, &digits[..2], &digits[2..]),
        _ => String::new(),
    }
}
