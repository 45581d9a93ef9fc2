//! Hosted language-model client used by the fallback detection passes.
//!
//! The detector talks to a [`ReasoningService`] through short, bounded
//! requests and interprets the free-text reply as a [`Verdict`]. When no
//! service is configured the LLM strategies are skipped outright.

pub mod mock;
mod openai;

pub use mock::MockReasoning;
pub use openai::OpenAiClient;

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::LlmConfig;
use crate::sources::SourceError;

/// Reply token used by the extraction prompt when nothing qualifies
pub const NONE_TOKEN: &str = "NONE";

/// One bounded request to the reasoning service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReasoningRequest {
    pub system: String,
    pub user: String,
}

impl ReasoningRequest {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
        }
    }

    /// Ask for verbatim first-person positionality sentences, or [`NONE_TOKEN`].
    ///
    /// `prompt` replaces the default instruction; the reply format is always
    /// appended.
    pub fn extract_statement(text: &str, prompt: Option<&str>) -> Self {
        let instruction = prompt.unwrap_or(
            "Quote verbatim every sentence in the text below where the authors reflect on \
             their own positionality.",
        );
        Self::new(
            "You extract positionality statements from academic articles. A positionality \
             statement is a first-person passage (I, we) in which the authors reflect on their \
             identity, background, experiences, assumptions or biases in relation to the research.",
            format!(
                "{}\nIf there is none, reply with exactly {}.\n\n{}",
                instruction.trim(),
                NONE_TOKEN,
                text
            ),
        )
    }

    /// Ask a YES/NO question about one chunk of the document
    pub fn classify_chunk(chunk: &str, prompt: Option<&str>) -> Self {
        let instruction = prompt.unwrap_or(
            "Does this passage contain a first-person positionality statement by the authors?",
        );
        Self::new(
            "You are an academic assistant that detects positionality statements in research \
             articles.",
            format!(
                "{}\nAnswer YES or NO first, then quote the relevant sentence if the answer is \
                 YES.\n\n{}",
                instruction.trim(),
                chunk
            ),
        )
    }
}

/// A hosted model that turns a request into a short free-text reply
#[async_trait]
pub trait ReasoningService: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &str;

    async fn complete(&self, request: &ReasoningRequest) -> Result<String, SourceError>;
}

/// Interpretation of a reasoning-service reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The reply affirms a statement; carries the reply text
    Affirmative(String),
    Negative,
}

impl Verdict {
    /// Parse a YES/NO answer. Only a standalone `YES` word counts.
    pub fn from_yes_no(reply: &str) -> Self {
        let words = words(reply);
        if words.iter().any(|w| w.eq_ignore_ascii_case("yes")) {
            return Verdict::Affirmative(reply.trim().to_string());
        }
        if !words
            .iter()
            .any(|w| w.eq_ignore_ascii_case("no") || w.eq_ignore_ascii_case(NONE_TOKEN))
        {
            tracing::debug!("Unrecognised YES/NO reply, treating as negative: {}", reply);
        }
        Verdict::Negative
    }

    /// Parse an extraction reply: empty, `NONE` or a leading `NO` is negative,
    /// anything else is the extracted text
    pub fn from_extraction(reply: &str) -> Self {
        let trimmed = reply.trim();
        match words(trimmed).first() {
            None => Verdict::Negative,
            Some(first)
                if first.eq_ignore_ascii_case(NONE_TOKEN) || first.eq_ignore_ascii_case("no") =>
            {
                Verdict::Negative
            }
            Some(_) => Verdict::Affirmative(trimmed.to_string()),
        }
    }

    pub fn is_affirmative(&self) -> bool {
        matches!(self, Verdict::Affirmative(_))
    }
}

fn words(text: &str) -> Vec<&str> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect()
}

/// Build the configured service, or `None` when LLM passes are switched off
/// or no API key is available
pub fn build_reasoning_service(
    config: &LlmConfig,
) -> Result<Option<Arc<dyn ReasoningService>>, SourceError> {
    if !config.enabled {
        tracing::debug!("Reasoning service disabled by configuration");
        return Ok(None);
    }

    let Some(api_key) = config.resolved_api_key() else {
        tracing::info!("No OpenAI API key configured; LLM strategies will be skipped");
        return Ok(None);
    };

    let client = OpenAiClient::from_config(config, api_key)?;
    Ok(Some(Arc::new(client)))
}
