//! Tag stripping and HTML-aware truncation for the title/author fallbacks.
//!
//! This is not a sanitizer. Display-grade sanitization is a separate
//! collaborator. These helpers only turn markup into short plain text so a
//! fallback chain can synthesize a title or compare an author name.

/// Removes markup from an HTML fragment and decodes entities.
///
/// Unclosed tags swallow the remainder of the input, which matches how a
/// truncated fragment should degrade (better an empty suffix than `<scr`).
pub fn strip_tags(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_tag = false;

    for c in input.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }

    html_escape::decode_html_entities(out.trim()).into_owned()
}

/// Strips markup and truncates to at most `max_chars` characters, appending
/// an ellipsis when anything was cut. Used to synthesize entry titles from
/// content when the feed omits them.
pub fn truncate_html(input: &str, max_chars: usize) -> String {
    let stripped = strip_tags(input);
    let text = stripped.split_whitespace().collect::<Vec<_>>().join(" ");

    if text.chars().count() <= max_chars {
        return text;
    }

    let truncated: String = text.chars().take(max_chars).collect();
    format!("{}…", truncated.trim_end())
}
