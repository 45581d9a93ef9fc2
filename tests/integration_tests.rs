//! Integration tests for Search Buddy
//!
//! These tests drive the full pipeline with in-memory documents, mock
//! registries and a scripted reasoning service.

use search_buddy::config::DetectionConfig;
use search_buddy::models::{AuthorSource, Confidence, Document, EmbeddedMetadata, Strategy};
use search_buddy::pipeline::{locate, Detector, Pipeline, PipelineError, Resolver};
use search_buddy::reasoning::{MockReasoning, ReasoningService};
use search_buddy::sources::mock::make_result;
use search_buddy::sources::{BibliographicClient, MockRegistry, Registry};
use search_buddy::utils::MemoryTextSource;
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;
use tokio_util::sync::CancellationToken;

fn client(registries: Vec<Arc<dyn Registry>>) -> Arc<BibliographicClient> {
    Arc::new(BibliographicClient::new(registries))
}

fn pipeline(
    source: MemoryTextSource,
    registries: Vec<Arc<dyn Registry>>,
    reasoning: Option<Arc<dyn ReasoningService>>,
    workers: usize,
) -> Pipeline {
    Pipeline::new(
        Arc::new(source),
        Resolver::new(client(registries)),
        Detector::new(DetectionConfig::default(), reasoning),
        workers,
    )
}

/// Twelve pages of filler with a DOI on the first page
fn twelve_page_article(name: &str) -> Document {
    let mut pages: Vec<String> = (1..=12)
        .map(|n| format!("Body text of page {}.\n{}", n, n))
        .collect();
    pages[0] = "Teaching Stories in Rural Schools\nhttps://doi.org/10.1000/example.\n1".to_string();

    Document::from_pages(name, pages).with_embedded(EmbeddedMetadata {
        title: Some("Teaching Stories in Rural Schools".to_string()),
        producer: Some("LaTeX with hyperref".to_string()),
        creation_date: Some("2020-03-15T12:45:30+01:00".to_string()),
        ..EmbeddedMetadata::default()
    })
}

/// Article whose References heading sits on page 4, with `body` on page 3
fn article_with_references(name: &str, body: &str) -> Document {
    Document::from_pages(
        name,
        vec![
            "Introduction\nWe study classrooms.".to_string(),
            "Methods\nInterviews were transcribed.".to_string(),
            "Findings\nThemes emerged from coding.".to_string(),
            body.to_string(),
            "References\nAdams, A. (2019). A book.".to_string(),
            "Appendix A\nInterview guide.".to_string(),
        ],
    )
}

#[tokio::test]
async fn test_filename_author_when_registry_fails() {
    let registry = Arc::new(MockRegistry::failing());
    let source = MemoryTextSource::new().with_document(twelve_page_article("Smith-et-al-2020.pdf"));
    let pipeline = pipeline(source, vec![registry.clone() as Arc<dyn Registry>], None, 1);

    let record = pipeline.process(Path::new("Smith-et-al-2020.pdf")).await;

    assert_eq!(record.author, "Smith et al.");
    assert_eq!(record.author_source, Some(AuthorSource::Filename));
    assert_eq!(record.doi.as_deref(), Some("10.1000/example"));
    assert_eq!(record.title, "Teaching Stories in Rural Schools");
    assert_eq!(record.producer, "LaTeX with hyperref");
    assert!(record.journal.is_empty());
    assert!(registry.call_count() > 0);
}

#[tokio::test]
async fn test_registry_fills_missing_fields() {
    let registry = Arc::new(MockRegistry::new().with_doi(
        "10.1000/example",
        make_result("Journal of Rural Education", "12", "3", "Jane Smith, Omar Haddad"),
    ));
    let source = MemoryTextSource::new().with_document(twelve_page_article("Smith-et-al-2020.pdf"));
    let pipeline = pipeline(source, vec![registry as Arc<dyn Registry>], None, 1);

    let record = pipeline.process(Path::new("Smith-et-al-2020.pdf")).await;

    assert_eq!(record.journal, "Journal of Rural Education");
    assert_eq!(record.volume, "12");
    assert_eq!(record.issue, "3");
    assert_eq!(record.author, "Jane Smith, Omar Haddad");
    assert_eq!(record.author_source, Some(AuthorSource::Registry));
}

#[tokio::test]
async fn test_doi_falls_back_to_second_registry() {
    let primary = Arc::new(MockRegistry::new());
    let secondary = Arc::new(
        MockRegistry::new().with_doi("10.1000/example", make_result("Data Journal", "1", "", "")),
    );
    let source = MemoryTextSource::new().with_document(twelve_page_article("report.pdf"));
    let registries: Vec<Arc<dyn Registry>> = vec![
        primary.clone() as Arc<dyn Registry>,
        secondary.clone() as Arc<dyn Registry>,
    ];
    let pipeline = pipeline(source, registries, None, 1);

    let record = pipeline.process(Path::new("report.pdf")).await;

    assert_eq!(record.journal, "Data Journal");
    assert!(primary.call_count() >= 1);
    assert!(secondary.call_count() >= 1);
}

#[tokio::test]
async fn test_explicit_positionality_is_found() {
    let doc = article_with_references(
        "explicit.pdf",
        "Discussion\nMy positionality as a researcher shaped how I read these accounts.",
    );
    let pipeline = pipeline(MemoryTextSource::new().with_document(doc), vec![], None, 1);

    let record = pipeline.process(Path::new("explicit.pdf")).await;

    assert!(record.found);
    assert_eq!(record.found_label(), "Yes");
    assert!(record.strategies.contains(&Strategy::ExplicitPositionality));
    assert!(record.score > 0.0 && record.score < 1.0);
}

#[tokio::test]
async fn test_heading_paragraph_verbatim() {
    let paragraph = "I grew up in a farming town and taught in its only school for ten years.";
    let doc = Document::from_pages(
        "heading.pdf",
        vec![
            "Introduction\nRural schooling is understudied.".to_string(),
            "Methods\nWe interviewed teachers.".to_string(),
            format!("Positionality\n\n{}", paragraph),
        ],
    );
    let pipeline = pipeline(MemoryTextSource::new().with_document(doc), vec![], None, 1);

    let analysis = pipeline.analyze(pipeline.load(Path::new("heading.pdf")).await).await;

    assert_eq!(analysis.positionality.snippet(Strategy::Header), Some(paragraph));
    assert!(analysis.to_record().found);
}

#[tokio::test]
async fn test_heading_paragraph_truncated() {
    let long_paragraph = "Growing up bilingual shaped every interview I conducted. ".repeat(12);
    let doc = Document::from_pages(
        "long.pdf",
        vec![
            "Introduction".to_string(),
            format!("Reflexivity\n{}", long_paragraph.trim()),
        ],
    );
    let pipeline = pipeline(MemoryTextSource::new().with_document(doc), vec![], None, 1);

    let analysis = pipeline.analyze(pipeline.load(Path::new("long.pdf")).await).await;
    let snippet = analysis
        .positionality
        .snippet(Strategy::Header)
        .expect("header snippet");

    assert!(snippet.ends_with("..."));
    assert!(snippet.chars().count() <= 503);
    assert!(long_paragraph.starts_with(snippet.trim_end_matches("...")));
}

#[test]
fn test_core_window_before_references() {
    let mut pages: Vec<String> = (0..12).map(|n| format!("Page {}", n)).collect();
    pages[10] = "Acknowledgements\nThanks.\nREFERENCES\nAdams, A.".to_string();
    let doc = Document::from_pages("refs.pdf", pages);
    assert_eq!(locate(&doc).pages, 8..10);

    let pages: Vec<String> = (0..8).map(|n| format!("Page {}", n)).collect();
    let doc = Document::from_pages("norefs.pdf", pages);
    assert_eq!(locate(&doc).pages, 6..8);
}

#[tokio::test]
async fn test_detection_is_idempotent_without_reasoning() {
    let doc = article_with_references(
        "stable.pdf",
        "As a former teacher, I acknowledge my own positionality. Reflexivity guided coding.",
    );
    let detector = Detector::new(DetectionConfig::default(), None);
    let window = locate(&doc);

    let first = detector.detect(&doc, &window).await;
    let second = detector.detect(&doc, &window).await;

    assert_eq!(first.matched_strategies, second.matched_strategies);
    assert_eq!(first.snippets, second.snippets);
    assert_eq!(first.score, second.score);
}

#[tokio::test]
async fn test_full_text_pass_forces_certainty() {
    let doc = article_with_references(
        "llm.pdf",
        "Discussion\nOur positionality informed this work. I write as a former nurse.",
    );
    let reasoning = Arc::new(MockReasoning::replying(vec!["YES. I write as a former nurse."]));
    let pipeline = pipeline(
        MemoryTextSource::new().with_document(doc),
        vec![],
        Some(reasoning.clone() as Arc<dyn ReasoningService>),
        1,
    );

    let record = pipeline.process(Path::new("llm.pdf")).await;

    assert!(record.strategies.contains(&Strategy::GptFullText));
    assert_eq!(record.score, 1.0);
    assert_eq!(record.confidence, Confidence::High);
    assert_eq!(record.statement, "I write as a former nurse.");
    assert_eq!(reasoning.call_count(), 1);
}

#[tokio::test]
async fn test_reasoning_failure_keeps_regex_evidence() {
    let doc = article_with_references(
        "degraded.pdf",
        "Discussion\nOur positionality informed this work.",
    );
    let reasoning = Arc::new(MockReasoning::failing());
    let pipeline = pipeline(
        MemoryTextSource::new().with_document(doc),
        vec![],
        Some(reasoning.clone() as Arc<dyn ReasoningService>),
        1,
    );

    let record = pipeline.process(Path::new("degraded.pdf")).await;

    assert!(record.found);
    assert!(record.strategies.iter().all(|s| !s.is_llm()));
    assert!(record.score < 1.0);
    assert_eq!(reasoning.call_count(), 1);
}

#[tokio::test]
async fn test_no_llm_strategies_without_service() {
    let doc = article_with_references(
        "plain.pdf",
        "Discussion\nWe position ourselves as insiders. Our positionality matters.",
    );
    let pipeline = pipeline(MemoryTextSource::new().with_document(doc), vec![], None, 1);
    assert!(!pipeline.uses_reasoning());

    let record = pipeline.process(Path::new("plain.pdf")).await;

    assert!(record.found);
    assert!(record.strategies.iter().all(|s| !s.is_llm()));
}

#[tokio::test]
async fn test_batch_keeps_going_past_unreadable_documents() {
    let dir = tempdir().unwrap();
    for name in ["b.pdf", "a.pdf", "scan.pdf"] {
        std::fs::write(dir.path().join(name), b"%PDF-1.5").unwrap();
    }
    let source = MemoryTextSource::new()
        .with_document(article_with_references("a.pdf", "My positionality matters."))
        .with_document(article_with_references("b.pdf", "Nothing personal here."))
        .with_document(Document::from_pages("scan.pdf", vec!["", "  "]));

    let report = pipeline(source, vec![], None, 2)
        .run_folder(dir.path(), &CancellationToken::new(), |_| {})
        .await
        .unwrap();

    let names: Vec<&str> = report.records.iter().map(|r| r.filename.as_str()).collect();
    assert_eq!(names, vec!["a.pdf", "b.pdf", "scan.pdf"]);
    assert!(report.records[0].found);
    assert!(!report.records[1].found);
    assert!(report.records[2].rationale.contains("No extractable text"));
    assert_eq!(report.found_count(), 1);
    assert!(!report.cancelled);
}

#[tokio::test]
async fn test_cancel_mid_run_keeps_finished_records() {
    let dir = tempdir().unwrap();
    let mut source = MemoryTextSource::new();
    for name in ["a.pdf", "b.pdf", "c.pdf"] {
        std::fs::write(dir.path().join(name), b"%PDF-1.5").unwrap();
        source = source.with_document(article_with_references(name, "Plain text."));
    }

    let cancel = CancellationToken::new();
    let report = pipeline(source, vec![], None, 1)
        .run_folder(dir.path(), &cancel, |_| cancel.cancel())
        .await
        .unwrap();

    assert!(report.cancelled);
    assert_eq!(report.records.len(), 1);
    assert_eq!(report.records[0].filename, "a.pdf");
    assert_eq!(report.total, 3);
}

#[tokio::test]
async fn test_invalid_folder_is_reported() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("not-a-folder.pdf");
    std::fs::write(&file, b"%PDF-1.5").unwrap();

    let result = pipeline(MemoryTextSource::new(), vec![], None, 1)
        .run_folder(&file, &CancellationToken::new(), |_| {
            panic!("no document should be processed")
        })
        .await;

    assert!(matches!(result, Err(PipelineError::InvalidFolder(_))));
}
