//! Overlapping character-window chunking for embedding and retrieval.

/// Split text into overlapping windows of `size` characters.
///
/// Consecutive chunks share `overlap` characters so clause boundaries are
/// never lost between windows. Operates on character counts, so multi-byte
/// text never splits inside a scalar.
pub fn chunk_text(text: &str, size: usize, overlap: usize) -> Vec<String> {
    if size == 0 || text.is_empty() {
        return Vec::new();
    }

    let chars: Vec<char> = text.chars().collect();
    let step = size.saturating_sub(overlap).max(1);

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let end = (start + size).min(chars.len());
        chunks.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += step;
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_a_single_chunk() {
        let chunks = chunk_text("short agreement", 1000, 200);
        assert_eq!(chunks, vec!["short agreement"]);
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        assert!(chunk_text("", 1000, 200).is_empty());
        assert!(chunk_text("anything", 0, 0).is_empty());
    }

    #[test]
    fn consecutive_chunks_overlap() {
        let text: String = ('a'..='z').collect();
        let chunks = chunk_text(&text, 10, 3);

        assert_eq!(chunks[0], "abcdefghij");
        assert_eq!(chunks[1], "hijklmnopq");
        // Each chunk starts with the last 3 chars of its predecessor.
        for pair in chunks.windows(2) {
            let tail: String = pair[0].chars().rev().take(3).collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect();
            assert!(pair[1].starts_with(&tail));
        }
    }

    #[test]
    fn full_text_is_covered() {
        let text = "x".repeat(2500);
        let chunks = chunk_text(&text, 1000, 200);
        let covered: usize = chunks.iter().map(|c| c.chars().count()).sum();
        // 2500 chars at step 800: windows at 0, 800, and 1600 (which reaches
        // the end of the text).
        assert_eq!(chunks.len(), 3);
        assert!(covered >= 2500);
        assert!(chunks.last().unwrap().chars().count() <= 1000);
    }

    #[test]
    fn multibyte_text_splits_on_char_boundaries() {
        let text = "\u{20ac}".repeat(15); // euro sign, 3 bytes each
        let chunks = chunk_text(&text, 10, 2);
        assert_eq!(chunks[0].chars().count(), 10);
        for chunk in &chunks {
            assert!(chunk.chars().all(|c| c == '\u{20ac}'));
        }
    }

    #[test]
    fn overlap_larger_than_size_still_advances() {
        let chunks = chunk_text(&"y".repeat(30), 10, 50);
        // Degenerate config: step clamps to 1, but chunking terminates.
        assert!(!chunks.is_empty());
        assert!(chunks.len() <= 30);
    }
}
