//! Bibliographic registry plugins with a trait-based architecture.
//!
//! This module defines the [`Registry`] trait implemented by every scholarly
//! metadata registry. A registry resolves a DOI or a title to journal,
//! volume, issue, author and title fields. Failures surface as
//! [`SourceError`]; the [`BibliographicClient`] wrapper turns them into empty
//! results so callers never have to handle them.
//!
//! # Registries
//!
//! - [`CrossRefRegistry`] - DOI lookup and best-match title search
//! - [`DataCiteRegistry`] - DOI lookup, used as the fallback for DOIs
//!   CrossRef does not know
//! - [`MockRegistry`] - canned responses for tests

mod client;
mod crossref;
mod datacite;
pub mod mock;

pub use client::BibliographicClient;
pub use crossref::CrossRefRegistry;
pub use datacite::DataCiteRegistry;
pub use mock::MockRegistry;

use async_trait::async_trait;

use crate::models::RegistryResult;

bitflags::bitflags! {
    /// Lookups a registry can serve
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RegistryCapabilities: u32 {
        const DOI_LOOKUP = 1 << 0;
        const TITLE_LOOKUP = 1 << 1;
    }
}

/// The Registry trait defines the interface for bibliographic registries.
///
/// Implementations are stateless per call and safe to share between workers.
#[async_trait]
pub trait Registry: Send + Sync + std::fmt::Debug {
    /// Unique identifier for this registry (e.g. "crossref")
    fn id(&self) -> &str;

    /// Human-readable name
    fn name(&self) -> &str;

    fn capabilities(&self) -> RegistryCapabilities {
        RegistryCapabilities::DOI_LOOKUP
    }

    fn supports_doi_lookup(&self) -> bool {
        self.capabilities()
            .contains(RegistryCapabilities::DOI_LOOKUP)
    }

    fn supports_title_lookup(&self) -> bool {
        self.capabilities()
            .contains(RegistryCapabilities::TITLE_LOOKUP)
    }

    /// Resolve a DOI to a single work
    async fn lookup_by_doi(&self, _doi: &str) -> Result<RegistryResult, SourceError> {
        Err(SourceError::NotImplemented)
    }

    /// Resolve a title to the best-matching work
    async fn lookup_by_title(&self, _title: &str) -> Result<RegistryResult, SourceError> {
        Err(SourceError::NotImplemented)
    }
}

/// Errors that can occur when talking to an external service
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The requested operation is not implemented for this source
    #[error("Operation not implemented for this source")]
    NotImplemented,

    /// The service has no credentials or is switched off
    #[error("Service not configured: {0}")]
    NotConfigured(String),

    /// Network or HTTP transport error
    #[error("Network error: {0}")]
    Network(String),

    /// Parsing error (JSON, XML)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimit { retry_after: Option<u64> },

    /// Nothing matched the lookup
    #[error("Not found: {0}")]
    NotFound(String),

    /// Non-success status from the service
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Other error
    #[error("Error: {0}")]
    Other(String),
}

impl SourceError {
    /// Map a non-success HTTP response to an error
    pub fn from_status(response: &reqwest::Response, service: &str) -> Self {
        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            return SourceError::RateLimit { retry_after };
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            return SourceError::NotFound(format!("{} returned 404", service));
        }
        SourceError::Api {
            status: status.as_u16(),
            message: format!("{} returned status: {}", service, status),
        }
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            SourceError::Parse(err.to_string())
        } else if err.is_timeout() {
            SourceError::Network(format!("request timed out: {}", err))
        } else {
            SourceError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::Parse(format!("JSON: {}", err))
    }
}

/// Format author names as "Given Family", joined by ", "
pub(crate) fn format_authors<'a, I>(names: I) -> Option<String>
where
    I: IntoIterator<Item = (Option<&'a str>, Option<&'a str>)>,
{
    let joined = names
        .into_iter()
        .filter_map(|(given, family)| {
            let parts = [given, family]
                .into_iter()
                .flatten()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>();
            (!parts.is_empty()).then(|| parts.join(" "))
        })
        .collect::<Vec<_>>()
        .join(", ");

    (!joined.is_empty()).then_some(joined)
}
