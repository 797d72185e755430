//! Splits the manual page into overlapping chunks for embedding.

/// Approximate characters per token (rough estimate for English text).
const CHARS_PER_TOKEN: usize = 4;

/// Estimate the number of tokens in text.
///
/// The hosted API counts tokens with its own tokenizer; this estimate only
/// backs the whole-document ceiling, so a rough ratio is good enough.
pub fn estimate_tokens(text: &str) -> usize {
    text.len() / CHARS_PER_TOKEN
}

/// Collapses the four-space indentation runs that `col -bx` leaves behind,
/// so chunks don't fill up with layout whitespace.
pub fn normalize_whitespace(text: &str) -> String {
    text.replace("    ", " ")
}

/// Split text into overlapping chunks using a sliding window.
///
/// Window boundaries prefer paragraph and sentence breaks over hard cuts.
/// Consecutive chunks share roughly `overlap` characters so no sentence is
/// lost at a boundary. Returns no chunks for blank input and a single chunk
/// when the text fits in one window.
pub fn split_into_chunks(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }

    if text.len() <= chunk_size {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < text.len() {
        let mut end = floor_char_boundary(text, (start + chunk_size).min(text.len()));
        // A window narrower than the current character would never advance;
        // widen it to the next char boundary instead
        if end <= start {
            end = ceil_char_boundary(text, start + 1);
        }

        let chunk_end = if end < text.len() {
            find_break_point(&text[start..end], chunk_size)
                .map(|offset| start + offset)
                .unwrap_or(end)
        } else {
            end
        };

        let chunk_text = text[start..chunk_end].trim();
        if !chunk_text.is_empty() {
            chunks.push(chunk_text.to_string());
        }

        if chunk_end >= text.len() {
            break;
        }

        // Move the window back by the overlap, guarding against a window
        // too small to make progress
        let step = chunk_end - start;
        if step <= overlap {
            start = chunk_end;
        } else {
            start = floor_char_boundary(text, chunk_end - overlap);
        }
    }

    chunks
}

/// Find a good break point in text (prefer paragraph/sentence boundaries).
fn find_break_point(text: &str, max_len: usize) -> Option<usize> {
    let limit = floor_char_boundary(text, max_len.min(text.len()));
    let search_text = &text[..limit];

    // Paragraph boundary
    if let Some(pos) = search_text.rfind("\n\n") {
        if pos > max_len / 3 {
            return Some(pos + 2);
        }
    }

    // Sentence boundary
    for pattern in &[". ", "! ", "? ", ".\n", "!\n", "?\n"] {
        if let Some(pos) = search_text.rfind(pattern) {
            if pos > max_len / 3 {
                return Some(pos + pattern.len());
            }
        }
    }

    // Any newline
    if let Some(pos) = search_text.rfind('\n') {
        if pos > max_len / 3 {
            return Some(pos + 1);
        }
    }

    // Comma or semicolon
    for pattern in &[", ", "; "] {
        if let Some(pos) = search_text.rfind(pattern) {
            if pos > max_len / 2 {
                return Some(pos + pattern.len());
            }
        }
    }

    // Word boundary
    if let Some(pos) = search_text.rfind(' ') {
        return Some(pos + 1);
    }

    None
}

// Byte index rounded down to the nearest char boundary. Man pages are
// almost always ASCII, but the window arithmetic must not panic on the
// occasional multi-byte character.
fn floor_char_boundary(text: &str, mut index: usize) -> usize {
    while index > 0 && !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

fn ceil_char_boundary(text: &str, mut index: usize) -> usize {
    while index < text.len() && !text.is_char_boundary(index) {
        index += 1;
    }
    index.min(text.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_text_is_single_chunk() {
        let chunks = split_into_chunks("Hello world", 1000, 100);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], "Hello world");
    }

    #[test]
    fn test_blank_text_yields_no_chunks() {
        assert!(split_into_chunks("", 500, 50).is_empty());
        assert!(split_into_chunks("   \n\n  ", 500, 50).is_empty());
    }

    #[test]
    fn test_large_text_chunks_overlap() {
        let text = "This is a test. ".repeat(100);
        let chunks = split_into_chunks(&text, 200, 50);
        assert!(chunks.len() > 1);

        // Every chunk respects the size ceiling
        for chunk in &chunks {
            assert!(chunk.len() <= 200);
        }

        // The start of each chunk repeats text from the end of the previous one
        for i in 1..chunks.len() {
            let prev_end = &chunks[i - 1];
            let curr_start = &chunks[i];
            let overlap_text = &prev_end[prev_end.len().saturating_sub(50)..];
            assert!(
                curr_start.starts_with(overlap_text.trim())
                    || curr_start.contains(&overlap_text[..overlap_text.len().min(20)])
            );
        }
    }

    #[test]
    fn test_prefers_paragraph_breaks() {
        let text = format!("{}\n\n{}", "alpha beta gamma. ".repeat(10), "x".repeat(300));
        let chunks = split_into_chunks(&text, 250, 20);
        // The first chunk should end at the paragraph boundary, not mid-word
        assert!(chunks[0].ends_with('.'));
    }

    #[test]
    fn test_multibyte_text_does_not_panic() {
        let text = "héllo wörld ü ".repeat(100);
        let chunks = split_into_chunks(&text, 100, 20);
        assert!(!chunks.is_empty());
    }

    #[test]
    fn test_chunk_size_smaller_than_a_char_still_terminates() {
        // A 1-byte window starting on a 2-byte character must widen rather
        // than stall in place
        let chunks = split_into_chunks("état du disque", 1, 0);
        assert!(!chunks.is_empty());
        assert!(chunks.concat().contains('é'));
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(
            normalize_whitespace("NAME    du - estimate file space usage"),
            "NAME du - estimate file space usage"
        );
        assert_eq!(normalize_whitespace("no runs here"), "no runs here");
    }

    #[test]
    fn test_estimate_tokens() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens(&"x".repeat(8000)), 2000);
    }
}
