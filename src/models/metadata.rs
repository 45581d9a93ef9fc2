//! Bibliographic metadata gathered for a single document.

use serde::{Deserialize, Serialize};

/// Where the author field of a [`MetadataRecord`] came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorSource {
    /// Embedded document metadata (Info dictionary or XMP packet)
    Embedded,
    /// A labelled line in the first pages of the text
    InText,
    /// A bibliographic registry lookup
    Registry,
    /// Parsed from the filename stem
    Filename,
}

impl AuthorSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthorSource::Embedded => "embedded",
            AuthorSource::InText => "in_text",
            AuthorSource::Registry => "registry",
            AuthorSource::Filename => "filename",
        }
    }
}

impl std::fmt::Display for AuthorSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw metadata as reported by a document reader
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddedMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub keywords: Option<String>,
    pub creation_date: Option<String>,
    pub producer: Option<String>,
}

impl EmbeddedMetadata {
    /// True when no field carries a value
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.author.is_none()
            && self.subject.is_none()
            && self.keywords.is_none()
            && self.creation_date.is_none()
            && self.producer.is_none()
    }
}

/// Result of a single registry lookup.
///
/// Ephemeral: built per call and never cached across documents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryResult {
    pub journal: Option<String>,
    pub volume: Option<String>,
    pub issue: Option<String>,
    pub author: Option<String>,
    pub title: Option<String>,
}

impl RegistryResult {
    pub fn is_empty(&self) -> bool {
        self.journal.is_none()
            && self.volume.is_none()
            && self.issue.is_none()
            && self.author.is_none()
            && self.title.is_none()
    }

    /// Convert into a partial record suitable for [`MetadataRecord::fill_from`]
    pub fn into_record(self) -> MetadataRecord {
        MetadataRecord {
            title: non_blank(self.title),
            author: non_blank(self.author),
            journal: non_blank(self.journal),
            volume: non_blank(self.volume),
            issue: non_blank(self.issue),
            ..MetadataRecord::default()
        }
    }
}

/// Bibliographic record for one document.
///
/// Fields are filled by [`fill_from`](MetadataRecord::fill_from), which never
/// replaces a value that is already present. Callers apply sources from the
/// highest priority down, so the first source to provide a field wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataRecord {
    pub title: Option<String>,
    pub author: Option<String>,
    pub journal: Option<String>,
    pub volume: Option<String>,
    pub issue: Option<String>,
    pub creation_date: Option<String>,
    pub producer: Option<String>,
    pub doi: Option<String>,
    pub author_source: Option<AuthorSource>,
}

impl MetadataRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fill every empty field from `other`. Returns the number of fields filled.
    ///
    /// `provenance` is recorded as the author source only when this call
    /// supplies the author.
    pub fn fill_from(&mut self, other: MetadataRecord, provenance: AuthorSource) -> usize {
        let mut filled = 0;

        filled += fill(&mut self.title, other.title);
        filled += fill(&mut self.journal, other.journal);
        filled += fill(&mut self.volume, other.volume);
        filled += fill(&mut self.issue, other.issue);
        filled += fill(&mut self.creation_date, other.creation_date);
        filled += fill(&mut self.producer, other.producer);
        filled += fill(&mut self.doi, other.doi);

        if fill(&mut self.author, other.author) == 1 {
            self.author_source = Some(provenance);
            filled += 1;
        }

        filled
    }

    pub fn missing_title_or_author(&self) -> bool {
        self.title.is_none() || self.author.is_none()
    }

    /// True when any field a registry could supply is still empty
    pub fn missing_registry_fields(&self) -> bool {
        self.journal.is_none()
            || self.volume.is_none()
            || self.issue.is_none()
            || self.author.is_none()
    }
}

impl From<EmbeddedMetadata> for MetadataRecord {
    fn from(meta: EmbeddedMetadata) -> Self {
        Self {
            title: non_blank(meta.title),
            author: non_blank(meta.author),
            creation_date: non_blank(meta.creation_date),
            producer: non_blank(meta.producer),
            ..Self::default()
        }
    }
}

fn fill(slot: &mut Option<String>, value: Option<String>) -> usize {
    if slot.is_some() {
        return 0;
    }
    match non_blank(value) {
        Some(v) => {
            *slot = Some(v);
            1
        }
        None => 0,
    }
}

/// Trim a value and drop it when nothing is left
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
