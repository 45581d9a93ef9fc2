//! Layered positionality detection.
//!
//! Strategies run cheapest first. The two LLM passes only run when the
//! earlier evidence leaves room for them, and never when no reasoning
//! service is configured.

use std::sync::Arc;

use crate::config::DetectionConfig;
use crate::models::{Document, PositionalityResult, Strategy};
use crate::pipeline::patterns::{default_score_normalization, positionality_tests};
use crate::pipeline::section::{
    closing_section, heading_paragraph, word_chunks, CoreWindow, ParagraphLimits, WINDOW_PAGES,
};
use crate::reasoning::{ReasoningRequest, ReasoningService, Verdict};
use crate::utils::{squash_whitespace, truncate_at_word};

/// Characters of context kept on each side of a tail hit
const TAIL_CONTEXT_CHARS: usize = 200;

/// Positionality detector
#[derive(Debug, Clone)]
pub struct Detector {
    config: DetectionConfig,
    reasoning: Option<Arc<dyn ReasoningService>>,
    prompt: Option<String>,
}

impl Detector {
    pub fn new(config: DetectionConfig, reasoning: Option<Arc<dyn ReasoningService>>) -> Self {
        Self {
            config,
            reasoning,
            prompt: None,
        }
    }

    /// Use `prompt` instead of the built-in instruction in both LLM passes
    pub fn with_prompt(mut self, prompt: Option<String>) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn has_reasoning(&self) -> bool {
        self.reasoning.is_some()
    }

    /// Divisor for the baseline score
    pub fn normalization(&self) -> f64 {
        self.config
            .score_normalization
            .filter(|n| n.is_finite() && *n > 0.0)
            .unwrap_or_else(default_score_normalization)
    }

    pub async fn detect(&self, document: &Document, window: &CoreWindow) -> PositionalityResult {
        let mut result = PositionalityResult::new();

        // 1. Regex corpus over the core window
        for (strategy, re) in positionality_tests() {
            if let Some(m) = re.find(&window.text) {
                result.record(*strategy, squash_whitespace(m.as_str()));
            }
        }

        // 2. Heading paragraph, searched across the whole document
        let full_text = document.full_text();
        let limits = ParagraphLimits {
            max_lines: self.config.header_line_cap,
            max_chars: self.config.header_char_cap,
        };
        if let Some(paragraph) = heading_paragraph(&full_text, limits) {
            result.record(Strategy::Header, paragraph);
        }

        // 3. Tail scan over the last pages of the whole document
        let tail_hit = self.scan_tail(document, &mut result);

        let mut score = result.matched_strategies.len() as f64 / self.normalization();
        if tail_hit {
            score = score.max(self.config.tail_score_floor);
        }
        let baseline = score;

        if let Some(service) = &self.reasoning {
            // 4. Header pass, only when nothing has matched
            if !result.is_found() && !window.is_empty() {
                if let Some(statement) = self.header_pass(service.as_ref(), &window.text).await {
                    result.record(Strategy::GptHeader, statement);
                    score = score.max(result.matched_strategies.len() as f64 / self.normalization());
                }
            }

            // 5. Full-text pass, only on some prior evidence
            if baseline >= self.config.full_text_min_score {
                if let Some(statement) = self.full_text_pass(service.as_ref(), &full_text).await {
                    result.record(Strategy::GptFullText, statement);
                    score = 1.0;
                }
            }
        }

        result.set_score(score);

        tracing::debug!(
            "{}: strategies [{}], score {:.2} ({})",
            document.filename(),
            result
                .matched_strategies
                .iter()
                .map(Strategy::as_str)
                .collect::<Vec<_>>()
                .join(", "),
            result.score,
            result.confidence
        );

        result
    }

    /// Re-run the corpus over the document tail. Returns true when it found
    /// a tag the core window did not.
    fn scan_tail(&self, document: &Document, result: &mut PositionalityResult) -> bool {
        let tail_text = document.text_of(document.tail_range(WINDOW_PAGES));
        let mut first_hit: Option<usize> = None;

        for (strategy, re) in positionality_tests() {
            if result.contains(*strategy) {
                continue;
            }
            if let Some(m) = re.find(&tail_text) {
                result.record(*strategy, squash_whitespace(m.as_str()));
                first_hit.get_or_insert(m.start());
            }
        }

        let Some(start) = first_hit else {
            return false;
        };

        result.record(Strategy::Tail, excerpt_around(&tail_text, start));
        true
    }

    async fn header_pass(&self, service: &dyn ReasoningService, text: &str) -> Option<String> {
        let excerpt: String = text.chars().take(self.config.header_llm_chars).collect();
        if excerpt.trim().is_empty() {
            return None;
        }

        match service
            .complete(&ReasoningRequest::extract_statement(&excerpt, self.prompt.as_deref()))
            .await
        {
            Ok(reply) => match Verdict::from_extraction(&reply) {
                Verdict::Affirmative(statement) => Some(statement),
                Verdict::Negative => None,
            },
            Err(e) => {
                tracing::debug!("Header LLM pass failed via {}: {}", service.name(), e);
                None
            }
        }
    }

    async fn full_text_pass(&self, service: &dyn ReasoningService, full_text: &str) -> Option<String> {
        let section = closing_section(full_text)?;
        let chunks = word_chunks(section, self.config.chunk_words, self.config.max_chunks);

        for (index, chunk) in chunks.iter().enumerate() {
            let reply = match service
                .complete(&ReasoningRequest::classify_chunk(chunk, self.prompt.as_deref()))
                .await
            {
                Ok(reply) => reply,
                Err(e) => {
                    tracing::debug!(
                        "Full-text LLM pass stopped at chunk {} of {}: {}",
                        index + 1,
                        chunks.len(),
                        e
                    );
                    return None;
                }
            };

            if let Verdict::Affirmative(reply) = Verdict::from_yes_no(&reply) {
                let quoted = strip_affirmative(&reply);
                return Some(if quoted.is_empty() {
                    truncate_at_word(chunk, self.config.header_char_cap)
                } else {
                    quoted
                });
            }
        }

        None
    }
}

/// Drop a leading "YES" and the punctuation after it
fn strip_affirmative(reply: &str) -> String {
    let trimmed = reply.trim();
    let word_end = trimmed
        .find(|c: char| !c.is_alphanumeric())
        .unwrap_or(trimmed.len());
    let rest = if trimmed[..word_end].eq_ignore_ascii_case("yes") {
        &trimmed[word_end..]
    } else {
        trimmed
    };
    rest.trim_start_matches(|c: char| c.is_whitespace() || matches!(c, '.' | ',' | ':' | '-' | '!'))
        .trim()
        .to_string()
}

/// Whitespace-normalised text around byte offset `start`
fn excerpt_around(text: &str, start: usize) -> String {
    let from = text[..start]
        .char_indices()
        .rev()
        .nth(TAIL_CONTEXT_CHARS.saturating_sub(1))
        .map(|(i, _)| i)
        .unwrap_or(0);
    let to = text[start..]
        .char_indices()
        .nth(TAIL_CONTEXT_CHARS)
        .map(|(i, _)| start + i)
        .unwrap_or(text.len());

    squash_whitespace(&text[from..to])
}
