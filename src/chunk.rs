//! Sliding-window text chunker.
//!
//! Pages are joined with a blank line and cut into windows of at most
//! `chunk_size` characters. Each window after the first starts
//! `chunk_overlap` characters before the previous one ended, so text that
//! straddles a cut point is present whole in at least one chunk.
//!
//! For `N` characters the result holds `ceil((N - O) / (C - O))` chunks
//! (at least one when `N > 0`). Sizes are counted in characters, never
//! bytes, so multi-byte text is never split mid-character.

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::SetupError;
use crate::models::Chunk;

const PAGE_SEPARATOR: &str = "\n\n";

/// Split page texts into overlapping chunks.
///
/// Blank input (no non-whitespace characters) yields no chunks.
pub fn split(
    pages: &[String],
    chunk_size: usize,
    chunk_overlap: usize,
) -> Result<Vec<Chunk>, SetupError> {
    if chunk_size == 0 {
        return Err(SetupError::Chunking("chunk_size must be > 0".to_string()));
    }
    if chunk_overlap >= chunk_size {
        return Err(SetupError::Chunking(format!(
            "chunk_overlap ({}) must be smaller than chunk_size ({})",
            chunk_overlap, chunk_size
        )));
    }

    let (chars, page_starts) = concatenate(pages);
    if chars.iter().all(|c| c.is_whitespace()) {
        return Ok(Vec::new());
    }

    let total = chars.len();
    let stride = chunk_size - chunk_overlap;
    let mut chunks = Vec::new();
    let mut start = 0;

    loop {
        let end = (start + chunk_size).min(total);
        let text: String = chars[start..end].iter().collect();
        chunks.push(make_chunk(
            chunks.len(),
            text,
            start,
            end,
            page_of(&page_starts, start),
        ));
        if end == total {
            break;
        }
        start += stride;
    }

    Ok(chunks)
}

/// Join pages into one character buffer, recording where each page starts.
fn concatenate(pages: &[String]) -> (Vec<char>, Vec<usize>) {
    let mut chars = Vec::new();
    let mut page_starts = Vec::with_capacity(pages.len());
    for (i, page) in pages.iter().enumerate() {
        if i > 0 {
            chars.extend(PAGE_SEPARATOR.chars());
        }
        page_starts.push(chars.len());
        chars.extend(page.chars());
    }
    (chars, page_starts)
}

/// 1-based page containing character offset `pos`.
fn page_of(page_starts: &[usize], pos: usize) -> usize {
    page_starts.partition_point(|&s| s <= pos).max(1)
}

fn make_chunk(index: usize, text: String, start: usize, end: usize, page: usize) -> Chunk {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let hash = format!("{:x}", hasher.finalize());

    Chunk {
        id: Uuid::new_v4().to_string(),
        index,
        text,
        start,
        end,
        page,
        hash,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pages(text: &str) -> Vec<String> {
        vec![text.to_string()]
    }

    fn expected_count(n: usize, c: usize, o: usize) -> usize {
        if n <= c {
            1
        } else {
            (n - o).div_ceil(c - o)
        }
    }

    #[test]
    fn small_text_single_chunk() {
        let chunks = split(&pages("Hello, world!"), 100, 10).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].index, 0);
        assert_eq!(chunks[0].text, "Hello, world!");
        assert_eq!((chunks[0].start, chunks[0].end), (0, 13));
    }

    #[test]
    fn empty_and_blank_text_yield_no_chunks() {
        assert!(split(&[], 100, 10).unwrap().is_empty());
        assert!(split(&pages(""), 100, 10).unwrap().is_empty());
        assert!(split(&pages("  \n\t "), 100, 10).unwrap().is_empty());
        assert!(split(&["".to_string(), " ".to_string()], 100, 10)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn chunk_count_matches_formula() {
        let text: String = (0..1000).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        for (c, o) in [(100, 0), (100, 20), (64, 63), (7, 3), (1000, 10), (999, 500)] {
            let chunks = split(&pages(&text), c, o).unwrap();
            assert_eq!(
                chunks.len(),
                expected_count(text.len(), c, o),
                "size={} overlap={}",
                c,
                o
            );
        }
    }

    #[test]
    fn consecutive_chunks_share_exact_overlap() {
        let text: String = (0..537).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        let chunks = split(&pages(&text), 50, 12).unwrap();
        for pair in chunks.windows(2) {
            let prev: Vec<char> = pair[0].text.chars().collect();
            let next: Vec<char> = pair[1].text.chars().collect();
            assert_eq!(&prev[prev.len() - 12..], &next[..12]);
            assert_eq!(pair[1].start, pair[0].end - 12);
        }
        for c in &chunks {
            assert!(c.text.chars().count() <= 50);
        }
        assert_eq!(chunks.last().unwrap().end, 537);
    }

    #[test]
    fn multibyte_text_is_split_on_characters() {
        let text = "é".repeat(30);
        let chunks = split(&pages(&text), 10, 2).unwrap();
        assert_eq!(chunks.len(), expected_count(30, 10, 2));
        assert!(chunks.iter().all(|c| c.text.chars().all(|ch| ch == 'é')));
    }

    #[test]
    fn pages_are_tracked() {
        let pages = vec!["a".repeat(10), "b".repeat(10)];
        let chunks = split(&pages, 8, 0).unwrap();
        assert_eq!(chunks[0].page, 1);
        // Page two starts at offset 12 (10 chars + separator).
        let second = chunks.iter().find(|c| c.start >= 12).unwrap();
        assert_eq!(second.page, 2);
        assert!(chunks.iter().any(|c| c.text.contains("a\n\nb")));
    }

    #[test]
    fn invalid_parameters_rejected() {
        assert!(matches!(
            split(&pages("abc"), 0, 0),
            Err(SetupError::Chunking(_))
        ));
        assert!(matches!(
            split(&pages("abc"), 10, 10),
            Err(SetupError::Chunking(_))
        ));
    }

    #[test]
    fn deterministic() {
        let text = "Alpha beta gamma delta epsilon zeta eta theta iota kappa";
        let c1 = split(&pages(text), 12, 4).unwrap();
        let c2 = split(&pages(text), 12, 4).unwrap();
        assert_eq!(c1.len(), c2.len());
        for (a, b) in c1.iter().zip(c2.iter()) {
            assert_eq!(a.text, b.text);
            assert_eq!(a.hash, b.hash);
            assert_eq!(a.index, b.index);
        }
    }
}
