//! Metadata resolution: an ordered fallback chain of enrichment sources.
//!
//! Each [`MetadataSource`] proposes a partial [`MetadataRecord`]; the
//! [`Resolver`] merges proposals with fill-if-empty semantics, so the first
//! source to supply a field keeps it. Sources never fail the chain: anything
//! that goes wrong inside one is logged and treated as "no contribution".

use async_trait::async_trait;
use std::sync::Arc;

use crate::models::{AuthorSource, Document, MetadataRecord};
use crate::pipeline::patterns::{AUTHOR_LABEL, CITATION_LINE, DOI, FILENAME_AUTHOR, TITLE_LABEL};
use crate::sources::BibliographicClient;

/// Pages scanned for labelled lines and DOIs
const IN_TEXT_PAGES: usize = 2;

/// One step of the metadata fallback chain
#[async_trait]
pub trait MetadataSource: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &'static str;

    /// Provenance recorded when this source supplies the author
    fn provenance(&self) -> AuthorSource;

    /// Whether the source has anything to offer for `record`
    fn applies(&self, _record: &MetadataRecord) -> bool {
        true
    }

    async fn contribute(&self, document: &Document, record: &MetadataRecord) -> Option<MetadataRecord>;
}

/// Ordered chain of metadata sources
#[derive(Debug)]
pub struct Resolver {
    sources: Vec<Box<dyn MetadataSource>>,
}

impl Resolver {
    /// The standard chain: embedded, XMP, in-text, DOI lookup, title lookup,
    /// filename
    pub fn new(client: Arc<BibliographicClient>) -> Self {
        Self::with_sources(default_sources(client))
    }

    pub fn with_sources(sources: Vec<Box<dyn MetadataSource>>) -> Self {
        Self { sources }
    }

    pub fn source_names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    pub async fn resolve(&self, document: &Document) -> MetadataRecord {
        self.resolve_into(document, MetadataRecord::new()).await
    }

    /// Run the chain on top of an existing record. Fields already present
    /// are never replaced.
    pub async fn resolve_into(&self, document: &Document, mut record: MetadataRecord) -> MetadataRecord {
        for source in &self.sources {
            if !source.applies(&record) {
                continue;
            }
            let Some(partial) = source.contribute(document, &record).await else {
                continue;
            };
            let filled = record.fill_from(partial, source.provenance());
            if filled > 0 {
                tracing::debug!(
                    "{}: {} filled {} field(s)",
                    document.filename(),
                    source.name(),
                    filled
                );
            }
        }
        record
    }
}

pub fn default_sources(client: Arc<BibliographicClient>) -> Vec<Box<dyn MetadataSource>> {
    vec![
        Box::new(EmbeddedSource),
        Box::new(SecondaryEmbeddedSource),
        Box::new(InTextSource),
        Box::new(DoiRegistrySource {
            client: Arc::clone(&client),
        }),
        Box::new(TitleRegistrySource { client }),
        Box::new(FilenameSource),
    ]
}

/// Info dictionary of the document
#[derive(Debug)]
pub struct EmbeddedSource;

#[async_trait]
impl MetadataSource for EmbeddedSource {
    fn name(&self) -> &'static str {
        "embedded"
    }

    fn provenance(&self) -> AuthorSource {
        AuthorSource::Embedded
    }

    async fn contribute(&self, document: &Document, _record: &MetadataRecord) -> Option<MetadataRecord> {
        Some(document.embedded_metadata().clone().into())
    }
}

/// XMP packet, consulted only while title or author is missing
#[derive(Debug)]
pub struct SecondaryEmbeddedSource;

#[async_trait]
impl MetadataSource for SecondaryEmbeddedSource {
    fn name(&self) -> &'static str {
        "xmp"
    }

    fn provenance(&self) -> AuthorSource {
        AuthorSource::Embedded
    }

    fn applies(&self, record: &MetadataRecord) -> bool {
        record.missing_title_or_author()
    }

    async fn contribute(&self, document: &Document, _record: &MetadataRecord) -> Option<MetadataRecord> {
        document.secondary_metadata().cloned().map(Into::into)
    }
}

/// Labelled lines, DOI and citation line in the opening pages
#[derive(Debug)]
pub struct InTextSource;

#[async_trait]
impl MetadataSource for InTextSource {
    fn name(&self) -> &'static str {
        "in-text"
    }

    fn provenance(&self) -> AuthorSource {
        AuthorSource::InText
    }

    async fn contribute(&self, document: &Document, _record: &MetadataRecord) -> Option<MetadataRecord> {
        let head = document.text_of(0..IN_TEXT_PAGES);
        if head.trim().is_empty() {
            return None;
        }

        let mut partial = MetadataRecord {
            title: TITLE_LABEL.captures(&head).map(|c| c[1].to_string()),
            author: AUTHOR_LABEL.captures(&head).map(|c| c[1].to_string()),
            doi: DOI.find(&head).and_then(|m| normalize_doi(m.as_str())),
            ..MetadataRecord::default()
        };

        // Running headers sometimes only appear on the last page
        let last_page = document.page_count().saturating_sub(1);
        let citation = citation_line(&head).or_else(|| {
            (last_page >= IN_TEXT_PAGES)
                .then(|| citation_line(document.page_text(last_page)))
                .flatten()
        });
        if let Some((journal, volume, issue)) = citation {
            partial.journal = Some(journal);
            partial.volume = Some(volume);
            partial.issue = Some(issue);
        }

        Some(partial)
    }
}

/// Registry lookup keyed by the DOI found so far
#[derive(Debug)]
pub struct DoiRegistrySource {
    client: Arc<BibliographicClient>,
}

impl DoiRegistrySource {
    pub fn new(client: Arc<BibliographicClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MetadataSource for DoiRegistrySource {
    fn name(&self) -> &'static str {
        "doi-registry"
    }

    fn provenance(&self) -> AuthorSource {
        AuthorSource::Registry
    }

    fn applies(&self, record: &MetadataRecord) -> bool {
        record.doi.is_some() && (record.missing_registry_fields() || record.title.is_none())
    }

    async fn contribute(&self, _document: &Document, record: &MetadataRecord) -> Option<MetadataRecord> {
        let doi = record.doi.as_deref()?;
        let result = self.client.lookup_by_doi(doi).await;
        (!result.is_empty()).then(|| result.into_record())
    }
}

/// Best-match registry search on the known title
#[derive(Debug)]
pub struct TitleRegistrySource {
    client: Arc<BibliographicClient>,
}

impl TitleRegistrySource {
    pub fn new(client: Arc<BibliographicClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MetadataSource for TitleRegistrySource {
    fn name(&self) -> &'static str {
        "title-registry"
    }

    fn provenance(&self) -> AuthorSource {
        AuthorSource::Registry
    }

    fn applies(&self, record: &MetadataRecord) -> bool {
        record.title.is_some() && record.missing_registry_fields()
    }

    async fn contribute(&self, _document: &Document, record: &MetadataRecord) -> Option<MetadataRecord> {
        let title = record.title.as_deref()?;
        let mut result = self.client.lookup_by_title(title).await;
        // The best match may be a different work; only take its descriptive fields
        result.title = None;
        (!result.is_empty()).then(|| result.into_record())
    }
}

/// `Lastname[-et-al][-year...]` file naming convention
#[derive(Debug)]
pub struct FilenameSource;

#[async_trait]
impl MetadataSource for FilenameSource {
    fn name(&self) -> &'static str {
        "filename"
    }

    fn provenance(&self) -> AuthorSource {
        AuthorSource::Filename
    }

    fn applies(&self, record: &MetadataRecord) -> bool {
        record.author.is_none()
    }

    async fn contribute(&self, document: &Document, _record: &MetadataRecord) -> Option<MetadataRecord> {
        let author = author_from_filename(&document.stem()?)?;
        Some(MetadataRecord {
            author: Some(author),
            ..MetadataRecord::default()
        })
    }
}

/// Strip resolver prefixes and trailing sentence punctuation from a DOI
pub fn normalize_doi(raw: &str) -> Option<String> {
    let mut doi = raw.trim();
    for prefix in ["https://doi.org/", "http://doi.org/", "https://dx.doi.org/", "http://dx.doi.org/", "doi:"] {
        if doi.len() >= prefix.len() && doi[..prefix.len()].eq_ignore_ascii_case(prefix) {
            doi = doi[prefix.len()..].trim_start();
            break;
        }
    }
    let mut doi = doi.trim_end_matches(['.', ',', ';']);
    while doi.ends_with(')') && doi.matches(')').count() > doi.matches('(').count() {
        doi = doi[..doi.len() - 1].trim_end_matches(['.', ',', ';']);
    }

    (doi.starts_with("10.") && doi.contains('/')).then(|| doi.to_string())
}

/// First `Journal, Vol. N, No. N` line in `text`
fn citation_line(text: &str) -> Option<(String, String, String)> {
    text.lines().find_map(|line| {
        let caps = CITATION_LINE.captures(line)?;
        let journal = caps["journal"].trim().trim_end_matches([',', '|']).trim();
        (journal.chars().count() >= 3).then(|| {
            (
                journal.to_string(),
                caps["volume"].to_string(),
                caps["issue"].to_string(),
            )
        })
    })
}

/// `"Lastname"` or `"Lastname et al."` from a file stem.
///
/// A bare word such as `scan` or `paper` is not a name; the stem needs an
/// `et al` or year suffix.
pub fn author_from_filename(stem: &str) -> Option<String> {
    let caps = FILENAME_AUTHOR.captures(stem.trim())?;
    if caps.name("etal").is_none() && caps.name("year").is_none() {
        return None;
    }
    let last = caps.name("last")?.as_str();
    if last.chars().count() < 2 {
        return None;
    }

    let mut chars = last.chars();
    let first = chars.next()?;
    let name = first.to_uppercase().chain(chars).collect::<String>();

    Some(if caps.name("etal").is_some() {
        format!("{} et al.", name)
    } else {
        name
    })
}
