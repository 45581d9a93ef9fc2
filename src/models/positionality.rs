//! Positionality detection results.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Tag naming the strategy that produced a piece of evidence
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Strategy {
    #[serde(rename = "explicit_positionality")]
    ExplicitPositionality,
    #[serde(rename = "first_person_reflexivity")]
    FirstPersonReflexivity,
    #[serde(rename = "researcher_self")]
    ResearcherSelf,
    #[serde(rename = "author_self")]
    AuthorSelf,
    #[serde(rename = "as_a_role")]
    AsARole,
    #[serde(rename = "I_position")]
    IPosition,
    #[serde(rename = "I_situated")]
    ISituated,
    #[serde(rename = "positionality")]
    Positionality,
    #[serde(rename = "self_reflexivity")]
    SelfReflexivity,
    #[serde(rename = "header")]
    Header,
    #[serde(rename = "tail")]
    Tail,
    #[serde(rename = "gpt_header")]
    GptHeader,
    #[serde(rename = "gpt_full_text")]
    GptFullText,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::ExplicitPositionality => "explicit_positionality",
            Strategy::FirstPersonReflexivity => "first_person_reflexivity",
            Strategy::ResearcherSelf => "researcher_self",
            Strategy::AuthorSelf => "author_self",
            Strategy::AsARole => "as_a_role",
            Strategy::IPosition => "I_position",
            Strategy::ISituated => "I_situated",
            Strategy::Positionality => "positionality",
            Strategy::SelfReflexivity => "self_reflexivity",
            Strategy::Header => "header",
            Strategy::Tail => "tail",
            Strategy::GptHeader => "gpt_header",
            Strategy::GptFullText => "gpt_full_text",
        }
    }

    /// Whether the tag comes from the reasoning service
    pub fn is_llm(&self) -> bool {
        matches!(self, Strategy::GptHeader | Strategy::GptFullText)
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse confidence bucket derived from the score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    pub const HIGH_THRESHOLD: f64 = 0.75;
    pub const MEDIUM_THRESHOLD: f64 = 0.2;

    pub fn from_score(score: f64) -> Self {
        if score >= Self::HIGH_THRESHOLD {
            Confidence::High
        } else if score >= Self::MEDIUM_THRESHOLD {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::Low => "low",
            Confidence::Medium => "medium",
            Confidence::High => "high",
        }
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snippet sources in the order they are preferred for the reported statement
const STATEMENT_PRIORITY: [Strategy; 4] = [
    Strategy::GptFullText,
    Strategy::GptHeader,
    Strategy::Header,
    Strategy::Tail,
];

/// Outcome of positionality detection for one document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionalityResult {
    /// Matched strategies in detection order, without duplicates
    pub matched_strategies: Vec<Strategy>,
    pub snippets: BTreeMap<Strategy, String>,
    pub score: f64,
    pub confidence: Confidence,
}

impl Default for PositionalityResult {
    fn default() -> Self {
        Self {
            matched_strategies: Vec::new(),
            snippets: BTreeMap::new(),
            score: 0.0,
            confidence: Confidence::Low,
        }
    }
}

impl PositionalityResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a match. Returns false if the strategy was already present,
    /// in which case the earlier snippet is kept.
    pub fn record(&mut self, strategy: Strategy, snippet: impl Into<String>) -> bool {
        if self.contains(strategy) {
            return false;
        }
        self.matched_strategies.push(strategy);
        self.snippets.insert(strategy, snippet.into());
        true
    }

    pub fn contains(&self, strategy: Strategy) -> bool {
        self.matched_strategies.contains(&strategy)
    }

    pub fn is_found(&self) -> bool {
        !self.matched_strategies.is_empty()
    }

    /// Set the score, clamped to `[0, 1]`, and derive the confidence bucket
    pub fn set_score(&mut self, score: f64) {
        let score = if score.is_nan() { 0.0 } else { score.clamp(0.0, 1.0) };
        self.score = score;
        self.confidence = Confidence::from_score(score);
    }

    pub fn snippet(&self, strategy: Strategy) -> Option<&str> {
        self.snippets.get(&strategy).map(String::as_str)
    }

    /// The best available statement text.
    ///
    /// Prefers the full-text LLM pass, then the header LLM pass, the heading
    /// paragraph and the tail scan. Falls back to the first regex snippet.
    pub fn statement(&self) -> Option<&str> {
        STATEMENT_PRIORITY
            .iter()
            .find_map(|s| self.snippet(*s).filter(|t| !t.is_empty()))
            .or_else(|| {
                self.matched_strategies
                    .iter()
                    .find_map(|s| self.snippet(*s).filter(|t| !t.is_empty()))
            })
    }

    /// Short human-readable explanation naming the confidence bucket
    pub fn rationale(&self) -> String {
        if self.is_found() {
            let tags = self
                .matched_strategies
                .iter()
                .map(Strategy::as_str)
                .collect::<Vec<_>>()
                .join(", ");
            format!(
                "Positionality statement detected via {} (confidence: {}).",
                tags, self.confidence
            )
        } else {
            format!(
                "No positionality statement found (confidence: {}).",
                self.confidence
            )
        }
    }
}
