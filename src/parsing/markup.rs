//! Markup removal and inline reference extraction for rich message bodies.

use std::sync::LazyLock;

use regex::Regex;

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("tag pattern is valid"));
static LINK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"https?://[^\s]+").expect("link pattern is valid"));
static MENTION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"@(\w+)").expect("mention pattern is valid"));

/// Removes markup tags and decodes the basic XML entities.
///
/// ```
/// use chatarchive::parsing::markup::strip_markup;
///
/// assert_eq!(strip_markup("<b>Hi</b> &amp; bye"), "Hi & bye");
/// ```
pub fn strip_markup(input: &str) -> String {
    let stripped = TAG.replace_all(input, "");
    decode_entities(&stripped)
}

/// Extracts `http(s)://` links, in order of appearance.
pub fn extract_links(input: &str) -> Vec<String> {
    LINK.find_iter(input).map(|m| m.as_str().to_string()).collect()
}

/// Extracts `@handle` mentions without the `@`, in order of appearance.
pub fn extract_mentions(input: &str) -> Vec<String> {
    MENTION
        .captures_iter(input)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

fn decode_entities(input: &str) -> String {
    if !input.contains('&') {
        return input.to_string();
    }
    // &amp; last so "&amp;lt;" decodes to "&lt;", not "<".
    input
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}
