//! Character-window chunking collaborator.
//!
//! Splits text into overlapping windows of roughly `chunk_size`
//! characters, preferring to cut at whitespace. Deterministic for a
//! given input and configuration.

/// Split `text` into chunks of up to `chunk_size` characters with
/// `overlap` characters carried between consecutive chunks.
///
/// Whitespace-only chunks are dropped. `overlap` must be smaller than
/// `chunk_size` (enforced by `Settings::validate`); values are treated
/// as character counts, not bytes, so multi-byte text splits cleanly.
pub fn split_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    if chunk_size == 0 || text.trim().is_empty() {
        return Vec::new();
    }
    let overlap = overlap.min(chunk_size - 1);

    // Byte offset of every char, so windows never cut a code point.
    let chars: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
    let total = chars.len();

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < total {
        let end = (start + chunk_size).min(total);

        // Prefer a whitespace boundary in the back half of the window.
        let mut cut = end;
        if end < total {
            let window = &text[chars[start]..chars[end]];
            if let Some(ws) = window
                .char_indices()
                .filter(|(_, c)| c.is_whitespace())
                .map(|(i, _)| i)
                .next_back()
            {
                let ws_chars = window[..ws].chars().count();
                if ws_chars > chunk_size / 2 {
                    cut = start + ws_chars + 1;
                }
            }
        }

        let byte_start = chars[start];
        let byte_end = if cut == total { text.len() } else { chars[cut] };
        let chunk = text[byte_start..byte_end].trim();
        if !chunk.is_empty() {
            chunks.push(chunk.to_string());
        }

        if cut == total {
            break;
        }
        start = cut.saturating_sub(overlap).max(start + 1);
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_one_chunk() {
        let chunks = split_text("just a short note", 100, 10);
        assert_eq!(chunks, vec!["just a short note"]);
    }

    #[test]
    fn test_empty_text_yields_no_chunks() {
        assert!(split_text("", 100, 10).is_empty());
        assert!(split_text("   \n\t  ", 100, 10).is_empty());
    }

    #[test]
    fn test_long_text_splits_with_overlap() {
        let word = "alpha ";
        let text = word.repeat(100);
        let chunks = split_text(&text, 60, 12);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 60);
            assert!(!chunk.trim().is_empty());
        }
        // Consecutive chunks share text because of the overlap.
        assert!(chunks[1].starts_with("alpha"));
    }

    #[test]
    fn test_prefers_whitespace_boundaries() {
        let text = "one two three four five six seven eight nine ten";
        let chunks = split_text(text, 20, 4);
        for chunk in &chunks {
            // No chunk starts or ends mid-word for this input.
            assert!(!chunk.starts_with(' '));
            assert!(!chunk.ends_with(' '));
        }
    }

    #[test]
    fn test_multibyte_text_splits_cleanly() {
        let text = "héllo wörld ".repeat(30);
        let chunks = split_text(&text, 25, 5);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.is_char_boundary(0));
        }
    }

    #[test]
    fn test_deterministic() {
        let text = "determinism matters for identifier assignment ".repeat(20);
        let a = split_text(&text, 64, 8);
        let b = split_text(&text, 64, 8);
        assert_eq!(a, b);
    }

    #[test]
    fn test_unbroken_text_still_makes_progress() {
        // No whitespace at all: hard cuts every chunk_size chars.
        let text = "x".repeat(500);
        let chunks = split_text(&text, 100, 10);
        assert!(chunks.len() >= 5);
    }
}
