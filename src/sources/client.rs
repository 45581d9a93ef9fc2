//! Ordered registry lookups that never fail.

use std::sync::Arc;

use crate::config::RegistryConfig;
use crate::models::RegistryResult;
use crate::sources::{CrossRefRegistry, DataCiteRegistry, Registry, SourceError};

/// Bibliographic lookups across an ordered list of registries.
///
/// Each lookup asks the registries in order and returns the first non-empty
/// answer. Failures are logged and swallowed; an empty [`RegistryResult`]
/// means "nothing found", whatever the reason.
#[derive(Debug, Clone, Default)]
pub struct BibliographicClient {
    registries: Vec<Arc<dyn Registry>>,
}

impl BibliographicClient {
    pub fn new(registries: Vec<Arc<dyn Registry>>) -> Self {
        Self { registries }
    }

    /// CrossRef first, DataCite as the DOI fallback
    pub fn from_config(config: &RegistryConfig) -> Result<Self, SourceError> {
        let crossref: Arc<dyn Registry> = Arc::new(CrossRefRegistry::from_config(config)?);
        let datacite: Arc<dyn Registry> = Arc::new(DataCiteRegistry::from_config(config)?);
        Ok(Self::new(vec![crossref, datacite]))
    }

    /// A client with no registries; every lookup comes back empty
    pub fn offline() -> Self {
        Self::default()
    }

    pub fn registry_ids(&self) -> Vec<&str> {
        self.registries.iter().map(|r| r.id()).collect()
    }

    pub async fn lookup_by_doi(&self, doi: &str) -> RegistryResult {
        let doi = doi.trim();
        if doi.is_empty() {
            return RegistryResult::default();
        }

        for registry in self.registries.iter().filter(|r| r.supports_doi_lookup()) {
            match registry.lookup_by_doi(doi).await {
                Ok(result) if !result.is_empty() => {
                    tracing::debug!("{} resolved DOI {}", registry.name(), doi);
                    return result;
                }
                Ok(_) => {
                    tracing::debug!("{} returned nothing for DOI {}", registry.name(), doi);
                }
                Err(e) => {
                    tracing::debug!("{} DOI lookup failed for {}: {}", registry.name(), doi, e);
                }
            }
        }

        RegistryResult::default()
    }

    pub async fn lookup_by_title(&self, title: &str) -> RegistryResult {
        let title = title.trim();
        if title.is_empty() {
            return RegistryResult::default();
        }

        for registry in self.registries.iter().filter(|r| r.supports_title_lookup()) {
            match registry.lookup_by_title(title).await {
                Ok(result) if !result.is_empty() => return result,
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!("{} title lookup failed for '{}': {}", registry.name(), title, e);
                }
            }
        }

        RegistryResult::default()
    }
}
