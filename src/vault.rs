//! Placeholder vault for untranslatable markup.
//!
//! Markup that must never reach a translation backend is swapped for a short
//! token such as `†3†` and swapped back after translation. The dagger keeps
//! tokens apart from prose and from entity syntax.

use regex::{Captures, Regex};
use std::collections::BTreeSet;
use std::sync::LazyLock;

/// Delimiter used on both sides of a token.
pub const TOKEN_MARK: char = '†';

/// Matches any token, known to the vault or not.
static TOKEN_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"†(\d+)†").expect("Invalid TOKEN_REGEX"));

/// Per-document store of placeholder tokens and the markup they stand for.
#[derive(Debug, Default)]
pub struct PlaceholderVault {
    /// Stored markup; token `†n†` maps to `entries[n - 1]`.
    entries: Vec<String>,
}

impl PlaceholderVault {
    /// Creates an empty vault.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `content` and returns the freshly minted token for it.
    pub fn create(&mut self, content: impl Into<String>) -> String {
        self.entries.push(content.into());
        format_token(self.entries.len())
    }

    /// Returns the stored content for a token, if the vault minted it.
    pub fn get(&self, token: &str) -> Option<&str> {
        let caps = TOKEN_REGEX.captures(token)?;
        if caps.get(0).map(|m| m.as_str()) != Some(token) {
            return None;
        }
        self.lookup(&caps[1])
    }

    /// Number of stored placeholders.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing has been stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Clears all entries and restarts numbering at 1.
    pub fn reset(&mut self) {
        self.entries.clear();
    }

    /// Replaces every known token in `text` with its stored content.
    ///
    /// Substitution repeats until the text stops changing, so tokens that
    /// surface inside restored content are resolved as well. Unknown tokens
    /// are reported and left in place.
    pub fn resolve(&self, text: &str) -> String {
        if !text.contains(TOKEN_MARK) {
            return text.to_string();
        }

        let mut unknown = BTreeSet::new();
        let mut current = text.to_string();

        // Each productive pass consumes at least one stored entry, so the
        // bound only matters for self-referencing content.
        for _ in 0..=self.entries.len() {
            let next = TOKEN_REGEX
                .replace_all(&current, |caps: &Captures<'_>| match self.lookup(&caps[1]) {
                    Some(content) => content.to_string(),
                    None => {
                        unknown.insert(caps[0].to_string());
                        caps[0].to_string()
                    }
                })
                .into_owned();

            if next == current {
                break;
            }
            current = next;
        }

        if !unknown.is_empty() {
            tracing::warn!(
                count = unknown.len(),
                tokens = ?unknown,
                "placeholder tokens without stored content left in output"
            );
        }

        current
    }

    /// Scans `text` for token syntax and returns every token found, in order
    /// of first appearance.
    ///
    /// Run on fully resolved output this lists the placeholders that could
    /// not be restored.
    pub fn find_unresolved(&self, text: &str) -> Vec<String> {
        let mut seen = BTreeSet::new();
        TOKEN_REGEX
            .find_iter(text)
            .map(|m| m.as_str().to_string())
            .filter(|token| seen.insert(token.clone()))
            .collect()
    }

    fn lookup(&self, digits: &str) -> Option<&str> {
        let index: usize = digits.parse().ok()?;
        index
            .checked_sub(1)
            .and_then(|i| self.entries.get(i))
            .map(String::as_str)
    }
}

/// Formats the token for placeholder number `n`.
pub fn format_token(n: usize) -> String {
    format!("{TOKEN_MARK}{n}{TOKEN_MARK}")
}

/// Returns true if `text` is exactly one token.
pub fn is_token(text: &str) -> bool {
    TOKEN_REGEX
        .find(text)
        .is_some_and(|m| m.start() == 0 && m.end() == text.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_are_numbered_from_one() {
        let mut vault = PlaceholderVault::new();
        assert_eq!(vault.create("<img src=\"a.png\">"), "†1†");
        assert_eq!(vault.create("<code>x</code>"), "†2†");
        assert_eq!(vault.len(), 2);
    }

    #[test]
    fn test_reset_restarts_numbering() {
        let mut vault = PlaceholderVault::new();
        vault.create("a");
        vault.create("b");
        vault.reset();
        assert!(vault.is_empty());
        assert_eq!(vault.create("c"), "†1†");
    }

    #[test]
    fn test_resolve_replaces_all_known_tokens() {
        let mut vault = PlaceholderVault::new();
        let img = vault.create("<img src=\"a.png\">");
        let code = vault.create("<code>let x = 1;</code>");
        let text = format!("<p>{img} and {code} and {img}</p>");
        assert_eq!(
            vault.resolve(&text),
            "<p><img src=\"a.png\"> and <code>let x = 1;</code> and <img src=\"a.png\"></p>"
        );
    }

    #[test]
    fn test_resolve_reaches_fixed_point_for_nested_tokens() {
        let mut vault = PlaceholderVault::new();
        let inner = vault.create("<b>inner</b>");
        let outer = vault.create(format!("<span>{inner}</span>"));
        let resolved = vault.resolve(&format!("<p>{outer}</p>"));
        assert_eq!(resolved, "<p><span><b>inner</b></span></p>");
        assert!(vault.find_unresolved(&resolved).is_empty());
    }

    #[test]
    fn test_unknown_token_is_left_in_place() {
        let mut vault = PlaceholderVault::new();
        vault.create("<br>");
        let resolved = vault.resolve("a †1† b †7† c");
        assert_eq!(resolved, "a <br> b †7† c");
        assert_eq!(vault.find_unresolved(&resolved), vec!["†7†".to_string()]);
    }

    #[test]
    fn test_token_zero_is_unknown() {
        let vault = PlaceholderVault::new();
        assert_eq!(vault.resolve("†0†"), "†0†");
        assert_eq!(vault.get("†0†"), None);
    }

    #[test]
    fn test_self_referencing_content_terminates() {
        let mut vault = PlaceholderVault::new();
        vault.create("loop †1†");
        let resolved = vault.resolve("†1†");
        assert!(resolved.starts_with("loop loop"));
    }

    #[test]
    fn test_text_without_marks_is_untouched() {
        let vault = PlaceholderVault::new();
        assert_eq!(vault.resolve("{1} &amp; [2]"), "{1} &amp; [2]");
    }

    #[test]
    fn test_get_and_is_token() {
        let mut vault = PlaceholderVault::new();
        let token = vault.create("<hr>");
        assert_eq!(vault.get(&token), Some("<hr>"));
        assert_eq!(vault.get("x†1†"), None);
        assert!(is_token("†12†"));
        assert!(!is_token(" †12†"));
        assert!(!is_token("†12"));
    }
}
