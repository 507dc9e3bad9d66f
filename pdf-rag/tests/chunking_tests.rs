//! Property tests for recursive chunking.

use pdf_rag::{Chunker, RagError, RecursiveChunker, chunk_text};
use proptest::prelude::*;

/// Prose-like text: short words followed by punctuation, spaces or newlines.
fn arb_text() -> impl Strategy<Value = String> {
    proptest::collection::vec("[a-z]{1,12}[ .!?\n]{0,2}", 0..80).prop_map(|words| words.concat())
}

/// A chunk size and an overlap strictly smaller than it.
fn arb_dimensions() -> impl Strategy<Value = (usize, usize)> {
    (10usize..120).prop_flat_map(|size| (Just(size), 0..size))
}

/// **Chunk bounds and overlap**
/// *For any* text and valid dimensions, every chunk SHALL be at most
/// `chunk_size` chars, consecutive chunks SHALL share at least
/// `chunk_overlap` chars, and together they SHALL cover all non-whitespace text.
mod prop_chunk_bounds {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn chunks_are_bounded_overlapping_and_covering(
            text in arb_text(),
            (size, overlap) in arb_dimensions(),
        ) {
            let chunker = RecursiveChunker::new(size, overlap).unwrap();
            let ranges = chunker.split_ranges(&text);

            for range in &ranges {
                prop_assert!(text[range.clone()].chars().count() <= size);
                prop_assert!(!text[range.clone()].trim().is_empty());
            }

            for pair in ranges.windows(2) {
                prop_assert!(pair[1].start > pair[0].start);
                prop_assert!(pair[1].end > pair[0].end);
                if pair[1].start < pair[0].end {
                    let shared = text[pair[1].start..pair[0].end].chars().count();
                    prop_assert!(shared >= overlap, "shared {} < overlap {}", shared, overlap);
                }
            }

            let mut covered = vec![false; text.len()];
            for range in &ranges {
                for flag in &mut covered[range.clone()] {
                    *flag = true;
                }
            }
            for (index, ch) in text.char_indices() {
                if !ch.is_whitespace() {
                    prop_assert!(covered[index], "char {:?} at {} not covered", ch, index);
                }
            }
        }

        #[test]
        fn split_matches_ranges(text in arb_text(), (size, overlap) in arb_dimensions()) {
            let chunker = RecursiveChunker::new(size, overlap).unwrap();
            let expected: Vec<String> =
                chunker.split_ranges(&text).into_iter().map(|r| text[r].to_string()).collect();
            prop_assert_eq!(chunker.split(&text), expected);
        }
    }
}

#[test]
fn empty_and_whitespace_input_yield_no_chunks() {
    assert!(chunk_text("", 500, 100).unwrap().is_empty());
    assert!(chunk_text("  \n\n\t ", 500, 100).unwrap().is_empty());
}

#[test]
fn overlap_must_be_smaller_than_size() {
    assert!(matches!(chunk_text("text", 100, 100), Err(RagError::InvalidChunkConfig(_))));
    assert!(matches!(RecursiveChunker::new(10, 50), Err(RagError::InvalidChunkConfig(_))));
}

#[test]
fn multibyte_text_is_measured_in_chars() {
    let text = "héllo wörld ünïcödé ".repeat(20);
    for chunk in chunk_text(&text, 30, 5).unwrap() {
        assert!(chunk.chars().count() <= 30);
    }
}

#[test]
fn long_document_splits_on_sentences() {
    let sentence = "Refunds are accepted within thirty days of purchase. ";
    let text = sentence.repeat(30);
    let chunks = chunk_text(&text, 500, 100).unwrap();
    assert!(chunks.len() > 1);
    for chunk in &chunks[..chunks.len() - 1] {
        assert!(chunk.trim_end().ends_with('.'), "chunk does not end on a sentence: {chunk:?}");
    }
}
