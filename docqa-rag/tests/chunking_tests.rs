//! Property tests for recursive chunking bounds and reconstruction.

use docqa_rag::chunking::{Chunker, RecursiveChunker};
use docqa_rag::document::{Chunk, Document};
use proptest::prelude::*;

/// Text mixing paragraphs, lines, sentences, words and multibyte characters.
fn arb_text() -> impl Strategy<Value = String> {
    proptest::collection::vec(
        prop_oneof![
            "[a-z]{1,12}",
            Just(" ".to_string()),
            Just(". ".to_string()),
            Just("\n".to_string()),
            Just("\n\n".to_string()),
            "[äöüéß€日本]{1,4}",
        ],
        0..200,
    )
    .prop_map(|parts| parts.concat())
}

/// Sizes with `overlap < size`.
fn arb_sizes() -> impl Strategy<Value = (usize, usize)> {
    (1usize..80).prop_flat_map(|size| (Just(size), 0..size))
}

/// Rebuild the document text from chunks, dropping each chunk's overlap with
/// what has already been reconstructed.
fn reconstruct(chunks: &[Chunk]) -> Option<String> {
    let mut out: Vec<char> = Vec::new();
    for chunk in chunks {
        let chars: Vec<char> = chunk.text.chars().collect();
        if chunk.start_offset > out.len() {
            return None;
        }
        let overlap = out.len() - chunk.start_offset;
        if overlap > chars.len() || out[chunk.start_offset..] != chars[..overlap] {
            return None;
        }
        out.extend_from_slice(&chars[overlap..]);
    }
    Some(out.into_iter().collect())
}

/// Every chunk fits in `chunk_size` characters, consecutive chunks share at
/// most `chunk_overlap` characters, and stripping the overlaps gives back the
/// input exactly.
mod prop_recursive_chunking {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn chunks_are_bounded_and_lossless(text in arb_text(), (size, overlap) in arb_sizes()) {
            let chunker = RecursiveChunker::new(size, overlap).unwrap();
            let chunks = chunker.chunk(&Document::new("doc.html", text.clone()));

            for chunk in &chunks {
                prop_assert!(chunk.text.chars().count() <= size);
                prop_assert!(!chunk.text.is_empty());
            }

            for pair in chunks.windows(2) {
                let previous_end = pair[0].start_offset + pair[0].text.chars().count();
                prop_assert!(pair[1].start_offset > pair[0].start_offset);
                prop_assert!(previous_end.saturating_sub(pair[1].start_offset) <= overlap);
            }

            for (i, chunk) in chunks.iter().enumerate() {
                prop_assert_eq!(chunk.sequence_index, i);
                prop_assert_eq!(chunk.source_id.as_str(), "doc.html");
            }

            prop_assert_eq!(reconstruct(&chunks), Some(text));
        }

        #[test]
        fn zero_overlap_concatenates_to_input(text in arb_text(), size in 1usize..80) {
            let chunker = RecursiveChunker::new(size, 0).unwrap();
            let joined: String = chunker.split(&text).concat();
            prop_assert_eq!(joined, text);
        }

        #[test]
        fn chunking_is_deterministic(text in arb_text(), (size, overlap) in arb_sizes()) {
            let chunker = RecursiveChunker::new(size, overlap).unwrap();
            prop_assert_eq!(chunker.split(&text), chunker.split(&text));
        }
    }
}

#[test]
fn long_document_yields_three_overlapping_chunks() {
    let text = "retrieval ".repeat(250);
    let text = text.as_str();
    let chunker = RecursiveChunker::new(1000, 200).unwrap();
    let chunks = chunker.chunk(&Document::new("long.html", text));

    assert_eq!(chunks.len(), 3);
    assert!(chunks[1].start_offset <= 800);
    assert!(chunks.iter().all(|c| c.text.chars().count() <= 1000));
    assert_eq!(reconstruct(&chunks).as_deref(), Some(text));
}
