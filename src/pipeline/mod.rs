//! Per-document pipeline and the batch runner.
//!
//! A document flows through two independent branches: the metadata
//! [`Resolver`] and the section locator plus [`Detector`]. The two results
//! are combined into one [`OutputRecord`]. Documents share no mutable state,
//! so a folder is processed with a bounded number of concurrent workers.

mod detector;
mod metadata;
pub mod patterns;
mod section;

pub use detector::Detector;
pub use metadata::{
    author_from_filename, default_sources, normalize_doi, DoiRegistrySource, EmbeddedSource,
    FilenameSource, InTextSource, MetadataSource, Resolver, SecondaryEmbeddedSource,
    TitleRegistrySource,
};
pub use section::{
    closing_section, heading_paragraph, locate, references_page, word_chunks, CoreWindow,
    ParagraphLimits,
};

use futures_util::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::models::{Document, MetadataRecord, OutputRecord, PositionalityResult};
use crate::reasoning::build_reasoning_service;
use crate::sources::{BibliographicClient, SourceError};
use crate::utils::{PdfTextSource, TextSource};

/// Batch-level failures
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid input folder: {}", .0.display())]
    InvalidFolder(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to set up external service: {0}")]
    Service(#[from] SourceError),
}

/// Everything the pipeline learned about one document
#[derive(Debug, Clone)]
pub struct Analysis {
    pub document: Document,
    pub window: CoreWindow,
    pub metadata: MetadataRecord,
    pub positionality: PositionalityResult,
}

impl Analysis {
    pub fn to_record(&self) -> OutputRecord {
        OutputRecord::new(
            self.document.filename(),
            self.metadata.clone(),
            &self.positionality,
            self.document.is_readable(),
        )
    }
}

/// Outcome of a folder run
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    /// Completed records, sorted by filename
    pub records: Vec<OutputRecord>,
    /// Documents found in the folder
    pub total: usize,
    /// True when the run was cancelled before every document started
    pub cancelled: bool,
}

impl BatchReport {
    pub fn found_count(&self) -> usize {
        self.records.iter().filter(|r| r.found).count()
    }
}

/// Metadata resolution plus positionality detection for documents
#[derive(Clone)]
pub struct Pipeline {
    text_source: Arc<dyn TextSource>,
    resolver: Arc<Resolver>,
    detector: Arc<Detector>,
    workers: usize,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("resolver", &self.resolver.source_names())
            .field("detector", &self.detector)
            .field("workers", &self.workers)
            .finish()
    }
}

impl Pipeline {
    pub fn new(
        text_source: Arc<dyn TextSource>,
        resolver: Resolver,
        detector: Detector,
        workers: usize,
    ) -> Self {
        Self {
            text_source,
            resolver: Arc::new(resolver),
            detector: Arc::new(detector),
            workers: workers.max(1),
        }
    }

    /// PDF text source, CrossRef/DataCite and the configured reasoning service
    pub fn from_config(config: &Config) -> Result<Self, PipelineError> {
        let client = Arc::new(BibliographicClient::from_config(&config.registry)?);
        let reasoning = build_reasoning_service(&config.llm)?;

        Ok(Self::new(
            Arc::new(PdfTextSource::new()),
            Resolver::new(client),
            Detector::new(config.detection.clone(), reasoning)
                .with_prompt(config.llm.custom_prompt()),
            config.pipeline.workers,
        ))
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn uses_reasoning(&self) -> bool {
        self.detector.has_reasoning()
    }

    /// Load a document on a blocking thread. Documents that cannot be opened
    /// come back empty and unreadable.
    pub async fn load(&self, path: &Path) -> Document {
        let source = Arc::clone(&self.text_source);
        let owned = path.to_path_buf();

        match tokio::task::spawn_blocking(move || source.load(&owned)).await {
            Ok(Ok(document)) => document,
            Ok(Err(e)) => {
                tracing::warn!("Could not read {}: {}", path.display(), e);
                Document::unreadable(path)
            }
            Err(e) => {
                tracing::warn!("Reader task for {} failed: {}", path.display(), e);
                Document::unreadable(path)
            }
        }
    }

    pub async fn analyze(&self, document: Document) -> Analysis {
        if !document.is_readable() {
            tracing::warn!("{}: no extractable text", document.filename());
        }

        let window = locate(&document);
        let (metadata, positionality) = tokio::join!(
            self.resolver.resolve(&document),
            self.detector.detect(&document, &window)
        );

        Analysis {
            document,
            window,
            metadata,
            positionality,
        }
    }

    pub async fn process(&self, path: &Path) -> OutputRecord {
        let document = self.load(path).await;
        self.analyze(document).await.to_record()
    }

    /// `*.pdf` files directly inside `folder`, sorted by name
    pub fn list_documents(folder: &Path) -> Result<Vec<PathBuf>, PipelineError> {
        if !folder.is_dir() {
            return Err(PipelineError::InvalidFolder(folder.to_path_buf()));
        }

        let mut paths = Vec::new();
        for entry in std::fs::read_dir(folder)? {
            let path = entry?.path();
            let is_pdf = path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
            if is_pdf && path.is_file() {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }

    /// Process every PDF in `folder`. See [`Pipeline::run_paths`].
    pub async fn run_folder<F>(
        &self,
        folder: &Path,
        cancel: &CancellationToken,
        on_record: F,
    ) -> Result<BatchReport, PipelineError>
    where
        F: FnMut(&OutputRecord),
    {
        let paths = Self::list_documents(folder)?;
        tracing::info!("Found {} document(s) in {}", paths.len(), folder.display());
        Ok(self.run_paths(paths, cancel, on_record).await)
    }

    /// Process `paths` with at most `workers` documents in flight. The
    /// report's `total` is `paths.len()`.
    ///
    /// Once `cancel` fires no further document is started; documents already
    /// in progress finish and are kept. `on_record` sees each record as it
    /// completes, in completion order.
    pub async fn run_paths<F>(
        &self,
        paths: Vec<PathBuf>,
        cancel: &CancellationToken,
        mut on_record: F,
    ) -> BatchReport
    where
        F: FnMut(&OutputRecord),
    {
        let total = paths.len();
        tracing::info!(
            "Processing {} document(s) with {} worker(s)",
            total,
            self.workers
        );

        let mut outcomes = stream::iter(paths)
            .map(|path| async move {
                if cancel.is_cancelled() {
                    return None;
                }
                Some(self.process(&path).await)
            })
            .buffer_unordered(self.workers);

        let mut records = Vec::with_capacity(total);
        while let Some(outcome) = outcomes.next().await {
            if let Some(record) = outcome {
                on_record(&record);
                records.push(record);
            }
        }

        records.sort_by(|a, b| a.filename.cmp(&b.filename));
        let cancelled = cancel.is_cancelled() && records.len() < total;
        if cancelled {
            tracing::warn!(
                "Run cancelled after {} of {} document(s)",
                records.len(),
                total
            );
        } else {
            tracing::info!("Processed {} document(s)", records.len());
        }

        BatchReport {
            records,
            total,
            cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DetectionConfig;
    use crate::utils::MemoryTextSource;
    use tempfile::tempdir;

    fn offline_pipeline(source: MemoryTextSource, workers: usize) -> Pipeline {
        Pipeline::new(
            Arc::new(source),
            Resolver::new(Arc::new(BibliographicClient::offline())),
            Detector::new(DetectionConfig::default(), None),
            workers,
        )
    }

    fn touch(dir: &Path, name: &str) {
        std::fs::write(dir.join(name), b"%PDF-1.5").unwrap();
    }

    #[test]
    fn test_list_documents_filters_pdfs() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "b.pdf");
        touch(dir.path(), "A.PDF");
        touch(dir.path(), "notes.txt");
        std::fs::create_dir(dir.path().join("nested.pdf")).unwrap();

        let names: Vec<String> = Pipeline::list_documents(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["A.PDF", "b.pdf"]);
    }

    #[tokio::test]
    async fn test_invalid_folder() {
        let pipeline = offline_pipeline(MemoryTextSource::new(), 2);
        let mut seen = 0;
        let result = pipeline
            .run_folder(
                Path::new("/definitely/not/here"),
                &CancellationToken::new(),
                |_| seen += 1,
            )
            .await;

        assert!(matches!(result, Err(PipelineError::InvalidFolder(_))));
        assert_eq!(seen, 0);
    }

    #[tokio::test]
    async fn test_unknown_document_is_unreadable() {
        let pipeline = offline_pipeline(MemoryTextSource::new(), 1);
        let record = pipeline.process(Path::new("missing.pdf")).await;

        assert!(!record.found);
        assert!(record.rationale.contains("No extractable text"));
        assert_eq!(record.score, 0.0);
    }

    #[tokio::test]
    async fn test_run_folder_sorts_records() {
        let dir = tempdir().unwrap();
        let mut source = MemoryTextSource::new();
        for name in ["c.pdf", "a.pdf", "b.pdf"] {
            touch(dir.path(), name);
            source = source.with_document(Document::from_pages(
                name,
                vec!["Intro", "My positionality matters."],
            ));
        }

        let pipeline = offline_pipeline(source, 3);
        let mut seen = Vec::new();
        let report = pipeline
            .run_folder(dir.path(), &CancellationToken::new(), |r| {
                seen.push(r.filename.clone())
            })
            .await
            .unwrap();

        let names: Vec<&str> = report.records.iter().map(|r| r.filename.as_str()).collect();
        assert_eq!(names, vec!["a.pdf", "b.pdf", "c.pdf"]);
        assert_eq!(report.total, 3);
        assert_eq!(seen.len(), 3);
        assert_eq!(report.found_count(), 3);
        assert!(!report.cancelled);
    }

    #[tokio::test]
    async fn test_run_paths_uses_given_listing() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "a.pdf");
        let paths = Pipeline::list_documents(dir.path()).unwrap();
        touch(dir.path(), "b.pdf");

        let mut seen = 0;
        let report = offline_pipeline(MemoryTextSource::new(), 2)
            .run_paths(paths.clone(), &CancellationToken::new(), |_| seen += 1)
            .await;

        assert_eq!(report.total, paths.len());
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].filename, "a.pdf");
        assert_eq!(seen, 1);
    }

    #[tokio::test]
    async fn test_cancelled_run_starts_nothing() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "a.pdf");
        touch(dir.path(), "b.pdf");

        let cancel = CancellationToken::new();
        cancel.cancel();

        let report = offline_pipeline(MemoryTextSource::new(), 1)
            .run_folder(dir.path(), &cancel, |_| {})
            .await
            .unwrap();

        assert!(report.cancelled);
        assert!(report.records.is_empty());
        assert_eq!(report.total, 2);
    }
}
