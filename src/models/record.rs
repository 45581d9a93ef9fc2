//! One output row per processed document.

use serde::{Deserialize, Serialize};

use super::{AuthorSource, Confidence, MetadataRecord, PositionalityResult, Strategy};

const UNREADABLE_RATIONALE: &str =
    "No extractable text found; the document may be scanned or image-only (confidence: low).";

/// Combined metadata and positionality outcome for one document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OutputRecord {
    pub filename: String,
    pub title: String,
    pub author: String,
    pub journal: String,
    pub volume: String,
    pub issue: String,
    pub creation_date: String,
    pub producer: String,
    pub found: bool,
    pub statement: String,
    pub rationale: String,
    pub score: f64,
    #[serde(rename = "doi")]
    pub doi: Option<String>,
    #[serde(rename = "authorSource")]
    pub author_source: Option<AuthorSource>,
    #[serde(rename = "confidence")]
    pub confidence: Confidence,
    #[serde(rename = "strategies")]
    pub strategies: Vec<Strategy>,
}

impl OutputRecord {
    /// Column names in CSV order
    pub const CSV_HEADERS: [&'static str; 12] = [
        "Filename",
        "Title",
        "Author",
        "Journal",
        "Volume",
        "Issue",
        "CreationDate",
        "Producer",
        "Found",
        "Statement",
        "Rationale",
        "Score",
    ];

    pub fn new(
        filename: impl Into<String>,
        metadata: MetadataRecord,
        result: &PositionalityResult,
        readable: bool,
    ) -> Self {
        let rationale = if readable {
            result.rationale()
        } else {
            UNREADABLE_RATIONALE.to_string()
        };

        Self {
            filename: filename.into(),
            title: metadata.title.unwrap_or_default(),
            author: metadata.author.unwrap_or_default(),
            journal: metadata.journal.unwrap_or_default(),
            volume: metadata.volume.unwrap_or_default(),
            issue: metadata.issue.unwrap_or_default(),
            creation_date: metadata.creation_date.unwrap_or_default(),
            producer: metadata.producer.unwrap_or_default(),
            found: result.is_found(),
            statement: result.statement().unwrap_or_default().to_string(),
            rationale,
            score: result.score,
            doi: metadata.doi,
            author_source: metadata.author_source,
            confidence: result.confidence,
            strategies: result.matched_strategies.clone(),
        }
    }

    /// "Yes"/"No" rendering of [`found`](Self::found)
    pub fn found_label(&self) -> &'static str {
        if self.found {
            "Yes"
        } else {
            "No"
        }
    }

    /// Values in [`CSV_HEADERS`](Self::CSV_HEADERS) order
    pub fn csv_fields(&self) -> [String; 12] {
        [
            self.filename.clone(),
            self.title.clone(),
            self.author.clone(),
            self.journal.clone(),
            self.volume.clone(),
            self.issue.clone(),
            self.creation_date.clone(),
            self.producer.clone(),
            self.found_label().to_string(),
            self.statement.clone(),
            self.rationale.clone(),
            format!("{:.2}", self.score),
        ]
    }
}
