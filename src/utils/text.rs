//! Small text helpers shared by detection and output.

/// Truncate `text` to at most `max_chars` characters, cutting at the last
/// word boundary and appending "...".
///
/// Text that already fits is returned unchanged. A single word longer than
/// the cap is cut mid-word.
///
/// ```
/// use search_buddy::utils::truncate_at_word;
///
/// assert_eq!(truncate_at_word("The quick brown fox", 12), "The quick...");
/// assert_eq!(truncate_at_word("short", 12), "short");
/// ```
pub fn truncate_at_word(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let end = text
        .char_indices()
        .nth(max_chars)
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    let prefix = &text[..end];

    // A boundary only counts if the next character starts a new word
    let cut = if text[end..].starts_with(char::is_whitespace) {
        prefix
    } else {
        match prefix.rfind(char::is_whitespace) {
            Some(pos) if pos > 0 => &prefix[..pos],
            _ => prefix,
        }
    };

    format!("{}...", cut.trim_end())
}

/// Quote a CSV field when it contains a delimiter, quote or line break
pub fn csv_escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Collapse runs of whitespace (including line breaks) to single spaces
pub fn squash_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
