//! CrossRef registry implementation.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use crate::config::RegistryConfig;
use crate::models::RegistryResult;
use crate::sources::{format_authors, Registry, RegistryCapabilities, SourceError};
use crate::utils::{default_user_agent, registry_retry_config, with_retry, HttpClient, RetryConfig};

/// CrossRef registry
///
/// Uses the CrossRef REST API: `/works/{doi}` for exact DOI lookups and
/// `/works?query.bibliographic=` for best-match title search.
#[derive(Debug, Clone)]
pub struct CrossRefRegistry {
    client: Arc<HttpClient>,
    base_url: String,
    retry: RetryConfig,
}

impl CrossRefRegistry {
    pub fn new(client: HttpClient, base_url: impl Into<String>, retry: RetryConfig) -> Self {
        Self {
            client: Arc::new(client),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            retry,
        }
    }

    pub fn from_config(config: &RegistryConfig) -> Result<Self, SourceError> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client =
            HttpClient::with_user_agent(&default_user_agent(config.mailto.as_deref()), timeout)?;
        Ok(Self::new(
            client,
            &config.crossref_base_url,
            registry_retry_config(timeout),
        ))
    }

    async fn fetch(&self, url: String) -> Result<reqwest::Response, SourceError> {
        let client = Arc::clone(&self.client);

        with_retry(self.retry, || {
            let client = Arc::clone(&client);
            let url = url.clone();
            async move {
                let response = client.get(&url).send().await.map_err(|e| {
                    SourceError::Network(format!("Failed to query CrossRef: {}", e))
                })?;

                if !response.status().is_success() {
                    return Err(SourceError::from_status(&response, "CrossRef"));
                }

                Ok(response)
            }
        })
        .await
    }
}

#[async_trait]
impl Registry for CrossRefRegistry {
    fn id(&self) -> &str {
        "crossref"
    }

    fn name(&self) -> &str {
        "CrossRef"
    }

    fn capabilities(&self) -> RegistryCapabilities {
        RegistryCapabilities::DOI_LOOKUP | RegistryCapabilities::TITLE_LOOKUP
    }

    async fn lookup_by_doi(&self, doi: &str) -> Result<RegistryResult, SourceError> {
        let url = format!("{}/works/{}", self.base_url, urlencoding::encode(doi));
        let response = self.fetch(url).await?;

        let data: CRWorkResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Parse(format!("Failed to parse CrossRef work: {}", e)))?;

        Ok(data.message.into_result())
    }

    async fn lookup_by_title(&self, title: &str) -> Result<RegistryResult, SourceError> {
        let url = format!(
            "{}/works?query.bibliographic={}&rows=1&select=title,container-title,volume,issue,author",
            self.base_url,
            urlencoding::encode(title)
        );
        let response = self.fetch(url).await?;

        let data: CRSearchResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Parse(format!("Failed to parse CrossRef search: {}", e)))?;

        data.message
            .items
            .into_iter()
            .next()
            .map(CRWork::into_result)
            .ok_or_else(|| SourceError::NotFound(format!("No CrossRef match for '{}'", title)))
    }
}

// ===== CrossRef API Types =====

#[derive(Debug, Deserialize)]
struct CRWorkResponse {
    message: CRWork,
}

#[derive(Debug, Deserialize)]
struct CRSearchResponse {
    message: CRMessage,
}

#[derive(Debug, Deserialize)]
struct CRMessage {
    #[serde(default)]
    items: Vec<CRWork>,
}

#[derive(Debug, Default, Deserialize)]
struct CRWork {
    #[serde(default)]
    title: Vec<String>,
    #[serde(default, rename = "container-title")]
    container_title: Vec<String>,
    volume: Option<String>,
    issue: Option<String>,
    #[serde(default)]
    author: Vec<CRAuthor>,
}

#[derive(Debug, Deserialize)]
struct CRAuthor {
    given: Option<String>,
    family: Option<String>,
    /// Organisational authors carry only a name
    name: Option<String>,
}

impl CRWork {
    fn into_result(self) -> RegistryResult {
        let author = format_authors(self.author.iter().map(|a| {
            (
                a.given.as_deref(),
                a.family.as_deref().or(a.name.as_deref()),
            )
        }));

        RegistryResult {
            journal: self.container_title.into_iter().next(),
            volume: self.volume,
            issue: self.issue,
            author,
            title: self.title.into_iter().next(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn registry_for(server: &mockito::ServerGuard) -> CrossRefRegistry {
        let client = HttpClient::with_user_agent("search-buddy-test", Duration::from_secs(5)).unwrap();
        CrossRefRegistry::new(
            client,
            server.url(),
            RetryConfig::single_attempt(Duration::from_secs(5)),
        )
    }

    #[tokio::test]
    async fn test_lookup_by_doi() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", Matcher::Regex(r"^/works/10\.1000.*example$".to_string()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "status": "ok",
                    "message": {
                        "title": ["Teaching While Queer"],
                        "container-title": ["Educational Researcher"],
                        "volume": "49",
                        "issue": "3",
                        "author": [
                            {"given": "Jane", "family": "Smith"},
                            {"given": "Omar", "family": "Haddad"}
                        ]
                    }
                }"#,
            )
            .create_async()
            .await;

        let result = registry_for(&server)
            .lookup_by_doi("10.1000/example")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(result.journal.as_deref(), Some("Educational Researcher"));
        assert_eq!(result.volume.as_deref(), Some("49"));
        assert_eq!(result.issue.as_deref(), Some("3"));
        assert_eq!(result.author.as_deref(), Some("Jane Smith, Omar Haddad"));
        assert_eq!(result.title.as_deref(), Some("Teaching While Queer"));
    }

    #[tokio::test]
    async fn test_lookup_by_doi_not_found() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", Matcher::Regex(r"^/works/".to_string()))
            .with_status(404)
            .with_body("Resource not found.")
            .create_async()
            .await;

        let result = registry_for(&server).lookup_by_doi("10.1000/missing").await;
        assert!(matches!(result, Err(SourceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_lookup_by_doi_malformed_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", Matcher::Regex(r"^/works/".to_string()))
            .with_status(200)
            .with_body("<html>not json</html>")
            .create_async()
            .await;

        let result = registry_for(&server).lookup_by_doi("10.1000/example").await;
        assert!(matches!(result, Err(SourceError::Parse(_))));
    }

    #[tokio::test]
    async fn test_lookup_by_title_uses_first_item() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", Matcher::Regex(r"^/works\?query\.bibliographic=".to_string()))
            .with_status(200)
            .with_body(
                r#"{
                    "message": {
                        "items": [
                            {
                                "title": ["Best Match"],
                                "container-title": ["Review of Research"],
                                "volume": "12",
                                "author": [{"name": "Research Collective"}]
                            },
                            {"title": ["Second Match"]}
                        ]
                    }
                }"#,
            )
            .create_async()
            .await;

        let result = registry_for(&server)
            .lookup_by_title("Best Match")
            .await
            .unwrap();

        assert_eq!(result.title.as_deref(), Some("Best Match"));
        assert_eq!(result.journal.as_deref(), Some("Review of Research"));
        assert_eq!(result.author.as_deref(), Some("Research Collective"));
        assert!(result.issue.is_none());
    }

    #[tokio::test]
    async fn test_lookup_by_title_empty_items() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", Matcher::Regex(r"^/works\?".to_string()))
            .with_status(200)
            .with_body(r#"{"message": {"items": []}}"#)
            .create_async()
            .await;

        let result = registry_for(&server).lookup_by_title("Nothing").await;
        assert!(matches!(result, Err(SourceError::NotFound(_))));
    }
}
