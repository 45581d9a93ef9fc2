//! DataCite registry implementation.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use crate::config::RegistryConfig;
use crate::models::RegistryResult;
use crate::sources::{format_authors, Registry, SourceError};
use crate::utils::{default_user_agent, registry_retry_config, with_retry, HttpClient, RetryConfig};

/// DataCite registry, DOI lookups only
#[derive(Debug, Clone)]
pub struct DataCiteRegistry {
    client: Arc<HttpClient>,
    base_url: String,
    retry: RetryConfig,
}

impl DataCiteRegistry {
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
            &config.datacite_base_url,
            registry_retry_config(timeout),
        ))
    }
}

#[async_trait]
impl Registry for DataCiteRegistry {
    fn id(&self) -> &str {
        "datacite"
    }

    fn name(&self) -> &str {
        "DataCite"
    }

    async fn lookup_by_doi(&self, doi: &str) -> Result<RegistryResult, SourceError> {
        let url = format!("{}/dois/{}", self.base_url, urlencoding::encode(doi));
        let client = Arc::clone(&self.client);

        let response = with_retry(self.retry, || {
            let client = Arc::clone(&client);
            let url = url.clone();
            async move {
                let response = client
                    .get(&url)
                    .header("Accept", "application/vnd.api+json")
                    .send()
                    .await
                    .map_err(|e| SourceError::Network(format!("Failed to query DataCite: {}", e)))?;

                if !response.status().is_success() {
                    return Err(SourceError::from_status(&response, "DataCite"));
                }

                Ok(response)
            }
        })
        .await?;

        let data: DCResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Parse(format!("Failed to parse DataCite response: {}", e)))?;

        Ok(data.data.attributes.into_result())
    }
}

// ===== DataCite API Types =====

#[derive(Debug, Deserialize)]
struct DCResponse {
    data: DCData,
}

#[derive(Debug, Deserialize)]
struct DCData {
    attributes: DCAttributes,
}

#[derive(Debug, Default, Deserialize)]
struct DCAttributes {
    #[serde(default)]
    titles: Vec<DCTitle>,
    #[serde(default)]
    creators: Vec<DCCreator>,
    #[serde(default)]
    container: Option<DCContainer>,
}

#[derive(Debug, Deserialize)]
struct DCTitle {
    title: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DCCreator {
    name: Option<String>,
    given_name: Option<String>,
    family_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct DCContainer {
    title: Option<String>,
    volume: Option<String>,
    issue: Option<String>,
}

impl DCAttributes {
    fn into_result(self) -> RegistryResult {
        // `name` is "Family, Given" when the split fields are absent
        let author = format_authors(self.creators.iter().map(|c| {
            if c.given_name.is_some() || c.family_name.is_some() {
                (c.given_name.as_deref(), c.family_name.as_deref())
            } else {
                (None, c.name.as_deref())
            }
        }));

        let container = self.container.unwrap_or_default();

        RegistryResult {
            journal: container.title,
            volume: container.volume,
            issue: container.issue,
            author,
            title: self.titles.into_iter().next().map(|t| t.title),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn registry_for(server: &mockito::ServerGuard) -> DataCiteRegistry {
        let client = HttpClient::with_user_agent("search-buddy-test", Duration::from_secs(5)).unwrap();
        DataCiteRegistry::new(
            client,
            server.url(),
            RetryConfig::single_attempt(Duration::from_secs(5)),
        )
    }

    #[tokio::test]
    async fn test_lookup_by_doi() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", Matcher::Regex(r"^/dois/10\.5281".to_string()))
            .with_status(200)
            .with_header("content-type", "application/vnd.api+json")
            .with_body(
                r#"{
                    "data": {
                        "id": "10.5281/zenodo.1234",
                        "attributes": {
                            "titles": [{"title": "Field Notes on Reflexive Practice"}],
                            "creators": [
                                {"name": "Nakamura, Aiko", "givenName": "Aiko", "familyName": "Nakamura"},
                                {"name": "Open Methods Lab"}
                            ],
                            "container": {
                                "type": "Journal",
                                "title": "Qualitative Inquiry",
                                "volume": "28",
                                "issue": "4"
                            }
                        }
                    }
                }"#,
            )
            .create_async()
            .await;

        let result = registry_for(&server)
            .lookup_by_doi("10.5281/zenodo.1234")
            .await
            .unwrap();

        assert_eq!(result.journal.as_deref(), Some("Qualitative Inquiry"));
        assert_eq!(result.volume.as_deref(), Some("28"));
        assert_eq!(result.issue.as_deref(), Some("4"));
        assert_eq!(
            result.author.as_deref(),
            Some("Aiko Nakamura, Open Methods Lab")
        );
        assert_eq!(
            result.title.as_deref(),
            Some("Field Notes on Reflexive Practice")
        );
    }

    #[tokio::test]
    async fn test_lookup_without_container() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", Matcher::Regex(r"^/dois/".to_string()))
            .with_status(200)
            .with_body(r#"{"data": {"attributes": {"titles": [{"title": "Dataset"}]}}}"#)
            .create_async()
            .await;

        let result = registry_for(&server)
            .lookup_by_doi("10.5281/zenodo.1")
            .await
            .unwrap();

        assert_eq!(result.title.as_deref(), Some("Dataset"));
        assert!(result.journal.is_none());
        assert!(result.author.is_none());
    }

    #[tokio::test]
    async fn test_server_error_is_reported() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", Matcher::Regex(r"^/dois/".to_string()))
            .with_status(400)
            .create_async()
            .await;

        let result = registry_for(&server).lookup_by_doi("bad").await;
        assert!(matches!(result, Err(SourceError::Api { status: 400, .. })));
    }

    #[test]
    fn test_capabilities() {
        let client = HttpClient::with_user_agent("t", Duration::from_secs(1)).unwrap();
        let registry = DataCiteRegistry::new(client, "http://localhost", RetryConfig::default());
        assert!(registry.supports_doi_lookup());
        assert!(!registry.supports_title_lookup());
    }
}
