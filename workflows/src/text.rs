//! Character-bounded string helpers.

/// The first `max_chars` characters of `text`.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Like [`truncate_chars`], but marks the cut with a trailing note.
pub fn truncate_marked(text: &str, max_chars: usize) -> String {
    let truncated = truncate_chars(text, max_chars);
    if truncated.len() == text.len() {
        text.to_string()
    } else {
        format!("{truncated}\n[... truncated]")
    }
}
