//! OpenAI chat-completions client.

use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use nonzero_ext::nonzero;
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

use crate::config::LlmConfig;
use crate::reasoning::{ReasoningRequest, ReasoningService};
use crate::sources::SourceError;
use crate::utils::{default_user_agent, llm_retry_config, with_retry, HttpClient, RetryConfig};

type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Chat-completions client with deterministic decoding.
///
/// Requests are spaced by a per-minute quota shared by every clone, and at
/// most `max_concurrent` are in flight at once.
#[derive(Clone)]
pub struct OpenAiClient {
    client: Arc<HttpClient>,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    limiter: Arc<DirectLimiter>,
    permits: Arc<Semaphore>,
    retry: RetryConfig,
}

impl std::fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("permits", &self.permits.available_permits())
            .finish_non_exhaustive()
    }
}

impl OpenAiClient {
    pub fn new(client: HttpClient, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Arc::new(client),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: "gpt-4o".to_string(),
            max_tokens: 200,
            limiter: Arc::new(RateLimiter::direct(Quota::per_minute(nonzero!(60u32)))),
            permits: Arc::new(Semaphore::new(2)),
            retry: RetryConfig::default(),
        }
    }

    pub fn from_config(config: &LlmConfig, api_key: String) -> Result<Self, SourceError> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = HttpClient::with_user_agent(&default_user_agent(None), timeout)?;

        Ok(Self::new(client, &config.base_url, api_key)
            .with_model(&config.model)
            .with_max_tokens(config.max_tokens)
            .with_rate_limit(config.requests_per_minute)
            .with_max_concurrent(config.max_concurrent)
            .with_retry_config(llm_retry_config(config.max_retries, timeout)))
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_rate_limit(mut self, requests_per_minute: u32) -> Self {
        let rpm = NonZeroU32::new(requests_per_minute).unwrap_or(nonzero!(60u32));
        self.limiter = Arc::new(RateLimiter::direct(Quota::per_minute(rpm)));
        self
    }

    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.permits = Arc::new(Semaphore::new(max_concurrent.max(1)));
        self
    }

    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn send_once(&self, body: &ChatRequest<'_>) -> Result<String, SourceError> {
        self.limiter.until_ready().await;

        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let error = SourceError::from_status(&response, "OpenAI");
            if matches!(error, SourceError::RateLimit { .. }) {
                tracing::warn!("OpenAI rate limit hit for model {}", self.model);
            }
            return Err(error);
        }

        let data: ChatResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Parse(format!("Failed to parse OpenAI response: {}", e)))?;

        data.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|content| content.trim().to_string())
            .ok_or_else(|| SourceError::Parse("OpenAI response had no choices".to_string()))
    }
}

#[async_trait]
impl ReasoningService for OpenAiClient {
    fn name(&self) -> &str {
        "OpenAI"
    }

    async fn complete(&self, request: &ReasoningRequest) -> Result<String, SourceError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| SourceError::Other(format!("Reasoning permits closed: {}", e)))?;

        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user,
                },
            ],
            temperature: 0.0,
            max_tokens: self.max_tokens,
        };

        with_retry(self.retry, || self.send_once(&body)).await
    }
}

// ===== OpenAI API Types =====

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn client_for(server: &mockito::ServerGuard) -> OpenAiClient {
        let http = HttpClient::with_user_agent("search-buddy-test", Duration::from_secs(5)).unwrap();
        OpenAiClient::new(http, server.url(), "sk-test")
            .with_model("gpt-4o-mini")
            .with_rate_limit(6000)
            .with_retry_config(RetryConfig::single_attempt(Duration::from_secs(5)))
    }

    #[tokio::test]
    async fn test_complete_sends_deterministic_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "model": "gpt-4o-mini",
                "temperature": 0.0
            })))
            .with_status(200)
            .with_body(r#"{"choices": [{"message": {"role": "assistant", "content": " YES \n"}}]}"#)
            .create_async()
            .await;

        let reply = client_for(&server)
            .complete(&ReasoningRequest::new("system", "user"))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(reply, "YES");
    }

    #[tokio::test]
    async fn test_rate_limit_maps_to_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(429)
            .with_header("retry-after", "7")
            .create_async()
            .await;

        let result = client_for(&server)
            .complete(&ReasoningRequest::new("system", "user"))
            .await;

        assert!(matches!(
            result,
            Err(SourceError::RateLimit {
                retry_after: Some(7)
            })
        ));
    }

    #[tokio::test]
    async fn test_empty_choices_is_parse_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices": []}"#)
            .create_async()
            .await;

        let result = client_for(&server)
            .complete(&ReasoningRequest::new("system", "user"))
            .await;

        assert!(matches!(result, Err(SourceError::Parse(_))));
    }

    #[test]
    fn test_from_config() {
        let config = LlmConfig {
            model: "gpt-4o-mini".to_string(),
            ..LlmConfig::default()
        };
        let client = OpenAiClient::from_config(&config, "sk-test".to_string()).unwrap();
        assert_eq!(client.model(), "gpt-4o-mini");
    }
}
