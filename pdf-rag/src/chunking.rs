//! Passage chunking.
//!
//! [`RecursiveChunker`] cuts text into overlapping windows of at most
//! `chunk_size` characters. Inside each window it prefers, in order, a
//! paragraph break, a sentence end, a line break, any whitespace, and only
//! then a hard cut at the window edge.

use std::ops::Range;

use crate::error::{RagError, Result};

/// A strategy for splitting extracted text into passages.
pub trait Chunker: Send + Sync {
    /// Split `text` into passages.
    ///
    /// Returns an empty `Vec` if the text is empty or only whitespace.
    fn split(&self, text: &str) -> Vec<String>;
}

/// Splits text hierarchically with a fixed character overlap.
///
/// Sizes are counted in `char`s. Consecutive chunks share at least
/// `chunk_overlap` characters; a chunk may start a little earlier than strictly
/// required so that it begins on a word.
///
/// # Example
///
/// ```rust
/// use pdf_rag::{Chunker, RecursiveChunker};
///
/// let chunker = RecursiveChunker::new(500, 100)?;
/// let chunks = chunker.split("Refund policy: refunds within 30 days.");
/// assert_eq!(chunks, vec!["Refund policy: refunds within 30 days.".to_string()]);
/// # Ok::<(), pdf_rag::RagError>(())
/// ```
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl RecursiveChunker {
    /// Create a new `RecursiveChunker`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidChunkConfig`] unless `chunk_overlap < chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_overlap >= chunk_size {
            return Err(RagError::InvalidChunkConfig(format!(
                "chunk_overlap ({chunk_overlap}) must be less than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self { chunk_size, chunk_overlap })
    }

    /// Maximum characters per chunk.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Minimum characters shared by consecutive chunks.
    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split `text` and return the byte range of every chunk, in order.
    ///
    /// Whitespace-only windows are dropped.
    pub fn split_ranges(&self, text: &str) -> Vec<Range<usize>> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let chars: Vec<char> = text.chars().collect();
        // byte offset of every char boundary, including the end of the text
        let offsets: Vec<usize> =
            text.char_indices().map(|(i, _)| i).chain(std::iter::once(text.len())).collect();

        chunk_spans(&chars, self.chunk_size, self.chunk_overlap)
            .into_iter()
            .map(|span| offsets[span.start]..offsets[span.end])
            .filter(|range| !text[range.clone()].trim().is_empty())
            .collect()
    }
}

impl Chunker for RecursiveChunker {
    fn split(&self, text: &str) -> Vec<String> {
        self.split_ranges(text).into_iter().map(|range| text[range].to_string()).collect()
    }
}

/// Split `text` with a [`RecursiveChunker`] of the given dimensions.
///
/// # Errors
///
/// Returns [`RagError::InvalidChunkConfig`] unless `chunk_overlap < chunk_size`.
pub fn chunk_text(text: &str, chunk_size: usize, chunk_overlap: usize) -> Result<Vec<String>> {
    Ok(RecursiveChunker::new(chunk_size, chunk_overlap)?.split(text))
}

/// Compute chunk windows as char index ranges.
///
/// Every window ends strictly after the previous one and starts at most
/// `overlap` chars before the previous end, so the loop always terminates.
fn chunk_spans(chars: &[char], size: usize, overlap: usize) -> Vec<Range<usize>> {
    let len = chars.len();
    let mut spans: Vec<Range<usize>> = Vec::new();
    let mut start = 0;

    loop {
        if len - start <= size {
            spans.push(start..len);
            break;
        }

        let floor = spans.last().map_or(start + overlap, |prev| prev.end.max(start + overlap));
        let end = find_break(chars, floor, start + size);
        spans.push(start..end);
        start = next_start(chars, start, end, size, overlap);
    }

    spans
}

/// Pick a chunk end in `(floor, limit]`, preferring the most natural boundary.
fn find_break(chars: &[char], floor: usize, limit: usize) -> usize {
    let is_paragraph = |end: usize| end >= 2 && chars[end - 1] == '\n' && chars[end - 2] == '\n';
    let is_sentence = |end: usize| {
        end >= 2 && chars[end - 1].is_whitespace() && matches!(chars[end - 2], '.' | '!' | '?')
    };
    let is_line = |end: usize| chars[end - 1] == '\n';
    let is_word = |end: usize| chars[end - 1].is_whitespace();

    let levels: [&dyn Fn(usize) -> bool; 4] = [&is_paragraph, &is_sentence, &is_line, &is_word];
    for level in levels {
        if let Some(end) = (floor + 1..=limit).rev().find(|&end| level(end)) {
            return end;
        }
    }
    limit
}

/// Start of the chunk following `start..end`.
///
/// Begins `overlap` chars before `end`, moved back onto a word start when one is
/// close enough that the next window can still advance past `end`.
fn next_start(chars: &[char], start: usize, end: usize, size: usize, overlap: usize) -> usize {
    let target = end - overlap;
    if overlap == 0 {
        return target;
    }

    let lower =
        (start + 1).max((end + 1).saturating_sub(size)).max(end.saturating_sub(2 * overlap));
    (lower..=target)
        .rev()
        .find(|&p| chars[p - 1].is_whitespace() && !chars[p].is_whitespace())
        .unwrap_or(target)
}
