//! Removal of code-fence artifacts from backend responses.
//!
//! Chat models like to wrap returned markup in ```` ```html ```` fences.

/// Fence marker.
const FENCE: &str = "```";

/// Strips leading and trailing code fences from a translation.
///
/// A leading fence is dropped through the end of its line (language tag
/// included), or just the marker when the text has no line break. A trailing
/// fence is dropped. Stripping repeats until nothing changes, so
/// `clean_translation(clean_translation(x)) == clean_translation(x)`.
pub fn clean_translation(text: &str) -> String {
    let mut current = text.trim();
    loop {
        let next = strip_fences_once(current);
        if next.len() == current.len() {
            return current.to_string();
        }
        current = next;
    }
}

fn strip_fences_once(text: &str) -> &str {
    let mut text = text.trim();

    if text.starts_with(FENCE) {
        text = match text.find('\n') {
            Some(newline) => &text[newline + 1..],
            None => &text[FENCE.len()..],
        };
    }

    let trimmed = text.trim_end();
    if let Some(stripped) = trimmed.strip_suffix(FENCE) {
        text = stripped;
    }

    text.trim()
}
