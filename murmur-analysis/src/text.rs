use regex::Regex;
use std::sync::LazyLock;

/// Mentions, any character that is not ASCII alphanumeric or a space/tab, and URLs.
static NOISE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(@[A-Za-z0-9]+)|([^0-9A-Za-z \t])|(\w+://\S+)").expect("static pattern")
});

/// Strip mentions, URLs and punctuation, then collapse whitespace to single spaces.
///
/// ```
/// assert_eq!(murmur_analysis::clean_text("Great win @team http://x.co"), "Great win");
/// ```
pub fn clean_text(raw: &str) -> String {
    NOISE
        .replace_all(raw, " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
