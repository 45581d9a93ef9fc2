//! Compiled pattern corpus for detection and metadata scraping.

use regex::Regex;
use std::sync::LazyLock;

use crate::models::Strategy;

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("built-in pattern must compile")
}

/// Ordered regex corpus: each tag contributes at most once per scan
static POSITIONALITY_TESTS: LazyLock<Vec<(Strategy, Regex)>> = LazyLock::new(|| {
    [
        (
            Strategy::ExplicitPositionality,
            r"(?i)\b(?:my|our)\s+(?:own\s+)?positionalit(?:y|ies)\b",
        ),
        (
            Strategy::FirstPersonReflexivity,
            r"\bI\s+(?i:reflect(?:ed)?|acknowledge[ds]?|consider(?:ed)?|recogni[sz]e[ds]?)\b",
        ),
        (
            Strategy::ResearcherSelf,
            r"\bI,?\s+(?i:as\s+(?:a|an|the)\s+(?:\w+\s+)?researcher)\b",
        ),
        (
            Strategy::AuthorSelf,
            r"\bI,?\s+(?i:as\s+(?:a|an|the)\s+(?:\w+\s+)?author)\b",
        ),
        (
            Strategy::AsARole,
            r"\b[Aa]s\s+an?\s+(?:[A-Za-z-]+\s+){0,4}[A-Za-z-]+,\s+(?:I|we)\b",
        ),
        (
            Strategy::IPosition,
            r"\b(?:I|[Ww]e)\s+position\s+(?:myself|ourselves)\b",
        ),
        (
            Strategy::ISituated,
            r"\b(?:I|[Ww]e)\s+(?:situate\s+(?:myself|ourselves)|am\s+situated|are\s+situated)\b",
        ),
        (Strategy::Positionality, r"(?i)\bpositionality\b"),
        (
            Strategy::SelfReflexivity,
            r"(?i)\b(?:self-reflexiv\w*|reflexivity|reflexive(?:ly)?)\b",
        ),
    ]
    .into_iter()
    .map(|(strategy, pattern)| (strategy, compile(pattern)))
    .collect()
});

/// The regex corpus in scan order
pub fn positionality_tests() -> &'static [(Strategy, Regex)] {
    &POSITIONALITY_TESTS
}

/// Default score divisor: one more than the corpus for each of the
/// heading and tail strategies
pub fn default_score_normalization() -> f64 {
    (POSITIONALITY_TESTS.len() + 2) as f64
}

/// Headings that introduce a positionality paragraph, optionally numbered
pub static SECTION_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    compile(
        r"(?i)^(?:\d+(?:\.\d+)*\.?\s+)?(?:positionality(?:\s+statement)?|reflexivity|researcher\s+background)\b",
    )
});

/// Headings that open the closing part of an article
pub static CLOSING_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"(?im)^[ \t]*(?:\d+(?:\.\d+)*\.?[ \t]+)?(?:discussion|implications|conclusions?)\b")
});

/// Lines that belong to a running header or footer
static FOOTER_LINES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"^\d{1,4}$",
        r"(?i)^page\s+\d+(?:\s+of\s+\d+)?$",
        r"(?i)^downloaded\s+(?:from|by)\b",
        r"(?i)^(?:©|\(c\)\s*\d{4}\b|copyright\b)",
        r"(?i)\bvol(?:ume)?\.?\s*\d+\s*[,(]?\s*(?:no|iss(?:ue)?)\.?\s*\d+",
    ]
    .into_iter()
    .map(compile)
    .collect()
});

pub fn is_footer_line(line: &str) -> bool {
    let line = line.trim();
    FOOTER_LINES.iter().any(|re| re.is_match(line))
}

pub static DOI: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?i)\b10\.\d{4,9}/[-._;()/:A-Z0-9]+"));

pub static TITLE_LABEL: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?im)^[ \t]*title[ \t]*:[ \t]*(\S.*?)[ \t]*$"));

pub static AUTHOR_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"(?im)^[ \t]*author(?:s|\(s\))?[ \t]*:[ \t]*(\S.*?)[ \t]*$")
});

/// `Journal, Vol. 5, No. 2`, `Journal | Vol 5 Iss 2` and similar
pub static CITATION_LINE: LazyLock<Regex> = LazyLock::new(|| {
    compile(
        r"(?i)(?P<journal>[A-Za-z][A-Za-z &:'-]*?)\s*[,|]?\s*vol(?:ume)?\.?\s*(?P<volume>\d+)\s*[,(]?\s*(?:iss(?:ue)?|no)\.?\s*(?P<issue>\d+)",
    )
});

/// `<lastname>[-et-al][-<year>...]`
pub static FILENAME_AUTHOR: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"^(?P<last>[A-Za-z][A-Za-z'-]*?)(?P<etal>[-_ ](?i:et)[-_ ]?(?i:al)\.?)?(?P<year>[-_ ]+\d{4}.*)?$")
});
