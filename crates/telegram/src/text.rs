//! Plain-text sizing helpers for Telegram messages.

/// Telegram's maximum message length.
pub const TELEGRAM_MAX_MESSAGE_LEN: usize = 4096;

/// Effective per-message limit for a requested `text_limit`.
#[must_use]
pub fn effective_limit(text_limit: usize) -> usize {
    text_limit.clamp(1, TELEGRAM_MAX_MESSAGE_LEN)
}

/// Byte offset just past the first `max_chars` characters of `text`.
fn char_offset(text: &str, max_chars: usize) -> usize {
    text.char_indices()
        .nth(max_chars)
        .map_or(text.len(), |(at, _)| at)
}

/// Keep at most `max_chars` characters of `text`.
#[must_use]
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    &text[..char_offset(text, max_chars)]
}

/// Split text into chunks of at most `max_chars` characters.
///
/// Splits at newlines, then spaces, to avoid breaking words. Whitespace at
/// a split point is dropped and blank chunks are never returned, since
/// Telegram rejects empty messages.
#[must_use]
pub fn chunk_message(text: &str, max_chars: usize) -> Vec<String> {
    if max_chars == 0 {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut push = |chunk: &str| {
        if !chunk.trim().is_empty() {
            chunks.push(chunk.to_string());
        }
    };
    let mut remaining = text;

    while !remaining.is_empty() {
        let window_end = char_offset(remaining, max_chars);
        if window_end == remaining.len() {
            push(remaining);
            break;
        }

        let slice = &remaining[..window_end];
        let split_at = match slice.rfind('\n').or_else(|| slice.rfind(' ')) {
            Some(0) | None => window_end,
            Some(at) => at,
        };

        push(&remaining[..split_at]);
        remaining = remaining[split_at..].trim_start();
    }

    chunks
}
