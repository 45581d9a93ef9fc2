//! Mock registry for testing purposes.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::models::RegistryResult;
use crate::sources::{Registry, RegistryCapabilities, SourceError};

/// A mock registry that returns predefined responses.
///
/// Unknown DOIs and titles resolve to `NotFound`; a failing mock answers every
/// lookup with a network error.
#[derive(Debug, Default)]
pub struct MockRegistry {
    by_doi: HashMap<String, RegistryResult>,
    by_title: HashMap<String, RegistryResult>,
    failing: bool,
    calls: AtomicUsize,
}

impl MockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry whose every lookup fails
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn with_doi(mut self, doi: &str, result: RegistryResult) -> Self {
        self.by_doi.insert(doi.to_lowercase(), result);
        self
    }

    pub fn with_title(mut self, title: &str, result: RegistryResult) -> Self {
        self.by_title.insert(title.to_lowercase(), result);
        self
    }

    /// Number of lookups served so far
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn answer(
        &self,
        table: &HashMap<String, RegistryResult>,
        key: &str,
    ) -> Result<RegistryResult, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            return Err(SourceError::Network("mock registry unavailable".to_string()));
        }
        table
            .get(&key.to_lowercase())
            .cloned()
            .ok_or_else(|| SourceError::NotFound(key.to_string()))
    }
}

#[async_trait]
impl Registry for MockRegistry {
    fn id(&self) -> &str {
        "mock"
    }

    fn name(&self) -> &str {
        "Mock Registry"
    }

    fn capabilities(&self) -> RegistryCapabilities {
        RegistryCapabilities::DOI_LOOKUP | RegistryCapabilities::TITLE_LOOKUP
    }

    async fn lookup_by_doi(&self, doi: &str) -> Result<RegistryResult, SourceError> {
        self.answer(&self.by_doi, doi)
    }

    async fn lookup_by_title(&self, title: &str) -> Result<RegistryResult, SourceError> {
        self.answer(&self.by_title, title)
    }
}

/// Helper to build a registry result for tests
pub fn make_result(journal: &str, volume: &str, issue: &str, author: &str) -> RegistryResult {
    RegistryResult {
        journal: Some(journal.to_string()),
        volume: Some(volume.to_string()),
        issue: Some(issue.to_string()),
        author: Some(author.to_string()),
        title: None,
    }
}
