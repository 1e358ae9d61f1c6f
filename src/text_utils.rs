// src/text_utils.rs
// Utility functions for text formatting

/// First non-empty line of `text`, cut to `width` characters with an ellipsis.
pub fn excerpt(text: &str, width: usize) -> String {
    let line = text.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or("");
    if line.chars().count() <= width {
        return line.to_string();
    }
    let mut out: String = line.chars().take(width.saturating_sub(1)).collect();
    out.push('…');
    out
}

/// Pad `text` on the right to `width` characters.
pub fn pad_right(text: &str, width: usize) -> String {
    let len = text.chars().count();
    let mut content = String::with_capacity(width.max(len));
    content.push_str(text);
    for _ in len..width {
        content.push(' ');
    }
    content
}
