//! Document chunking.
//!
//! This module provides the [`Chunker`] trait and [`RecursiveChunker`], which
//! splits text hierarchically (paragraphs → lines → sentences → words →
//! characters) and merges the pieces back into overlapping windows.
//!
//! Lengths are measured in characters, never bytes, and every piece keeps its
//! trailing separator so chunks are exact slices of the source text.

use std::collections::VecDeque;
use std::ops::Range;

use crate::document::{Chunk, Document};
use crate::error::{RagError, Result};

/// Separators tried in priority order. The empty separator means
/// character-level splitting and always applies.
pub const DEFAULT_SEPARATORS: &[&str] = &["\n\n", "\n", ". ", "! ", "? ", " ", ""];

/// A strategy for splitting documents into chunks.
///
/// Implementations produce [`Chunk`]s carrying the document's `source_id`.
/// Embeddings are attached later by the indexer.
pub trait Chunker: Send + Sync {
    /// Split a document into chunks.
    ///
    /// Returns an empty `Vec` if the document has empty text.
    fn chunk(&self, document: &Document) -> Vec<Chunk>;
}

/// Split `text` into chunks of at most `chunk_size` characters that overlap
/// by up to `chunk_overlap` characters, using [`DEFAULT_SEPARATORS`].
///
/// # Errors
///
/// Returns [`RagError::ConfigError`] if `chunk_size == 0` or
/// `chunk_overlap >= chunk_size`.
pub fn split_text(text: &str, chunk_size: usize, chunk_overlap: usize) -> Result<Vec<String>> {
    let chunker = RecursiveChunker::new(chunk_size, chunk_overlap)?;
    Ok(chunker.split(text).into_iter().map(str::to_string).collect())
}

/// Splits text hierarchically by a priority-ordered list of separators.
///
/// The coarsest separator present in the text is used first. Pieces that still
/// exceed `chunk_size` are split again with the next separator. Adjacent small
/// pieces are merged back up to `chunk_size`, and each new chunk starts with up
/// to `chunk_overlap` characters taken from the end of the previous one.
///
/// A piece longer than `chunk_size` that no remaining separator can split is
/// emitted as-is. With [`DEFAULT_SEPARATORS`] this never happens because the
/// last separator splits into characters.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::RecursiveChunker;
///
/// let chunker = RecursiveChunker::new(1000, 200)?;
/// let chunks = chunker.chunk(&document);
/// ```
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

/// A contiguous byte range of the source text and its length in characters.
#[derive(Debug, Clone, Copy)]
struct Piece {
    start: usize,
    end: usize,
    chars: usize,
}

impl RecursiveChunker {
    /// Create a new `RecursiveChunker` with [`DEFAULT_SEPARATORS`].
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if `chunk_size == 0` or
    /// `chunk_overlap >= chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(RagError::ConfigError("chunk_size must be greater than zero".to_string()));
        }
        if chunk_overlap >= chunk_size {
            return Err(RagError::ConfigError(format!(
                "chunk_overlap ({chunk_overlap}) must be less than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
            separators: DEFAULT_SEPARATORS.iter().map(|s| (*s).to_string()).collect(),
        })
    }

    /// Replace the separator list. Order is priority, coarsest first.
    pub fn with_separators<I, S>(mut self, separators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.separators = separators.into_iter().map(Into::into).collect();
        self
    }

    /// Maximum chunk length in characters.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Maximum overlap between consecutive chunks in characters.
    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split `text` into chunk slices borrowed from it.
    pub fn split<'a>(&self, text: &'a str) -> Vec<&'a str> {
        self.ranges(text).into_iter().map(|range| &text[range]).collect()
    }

    /// Byte ranges of every chunk, in order.
    fn ranges(&self, text: &str) -> Vec<Range<usize>> {
        if text.is_empty() {
            return Vec::new();
        }
        let mut chunks = Vec::new();
        self.split_recursive(text, 0..text.len(), &self.separators, &mut chunks);
        chunks.into_iter().map(|piece| piece.start..piece.end).collect()
    }

    fn split_recursive(
        &self,
        text: &str,
        range: Range<usize>,
        separators: &[String],
        out: &mut Vec<Piece>,
    ) {
        let slice = &text[range.clone()];
        let Some(position) =
            separators.iter().position(|sep| sep.is_empty() || slice.contains(sep.as_str()))
        else {
            out.push(Piece { start: range.start, end: range.end, chars: slice.chars().count() });
            return;
        };

        let separator = &separators[position];
        let remaining = &separators[position + 1..];

        let mut small = Vec::new();
        for piece in split_keeping_separator(text, range, separator) {
            if piece.chars <= self.chunk_size {
                small.push(piece);
                continue;
            }

            if !small.is_empty() {
                self.merge(&small, out);
                small.clear();
            }
            if remaining.is_empty() {
                out.push(piece);
            } else {
                self.split_recursive(text, piece.start..piece.end, remaining, out);
            }
        }

        if !small.is_empty() {
            self.merge(&small, out);
        }
    }

    /// Merge consecutive small pieces into windows of at most `chunk_size`
    /// characters, carrying up to `chunk_overlap` characters into the next one.
    fn merge(&self, pieces: &[Piece], out: &mut Vec<Piece>) {
        let mut window: VecDeque<Piece> = VecDeque::new();
        let mut total = 0;

        for piece in pieces {
            if total + piece.chars > self.chunk_size && !window.is_empty() {
                out.push(span(&window, total));
                while total > self.chunk_overlap
                    || (total + piece.chars > self.chunk_size && total > 0)
                {
                    let Some(front) = window.pop_front() else { break };
                    total -= front.chars;
                }
            }
            window.push_back(*piece);
            total += piece.chars;
        }

        if !window.is_empty() {
            out.push(span(&window, total));
        }
    }
}

impl Chunker for RecursiveChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        let text = &document.text;
        let mut offsets = CharOffsets::default();

        self.ranges(text)
            .into_iter()
            .enumerate()
            .map(|(sequence_index, range)| Chunk {
                source_id: document.source_id.clone(),
                sequence_index,
                start_offset: offsets.char_offset(text, range.start),
                text: text[range].to_string(),
            })
            .collect()
    }
}

fn span(window: &VecDeque<Piece>, chars: usize) -> Piece {
    let start = window.front().map_or(0, |p| p.start);
    let end = window.back().map_or(start, |p| p.end);
    Piece { start, end, chars }
}

/// Split `text[range]` at `separator`, keeping the separator attached to the
/// preceding piece. An empty separator yields one piece per character.
fn split_keeping_separator(text: &str, range: Range<usize>, separator: &str) -> Vec<Piece> {
    let base = range.start;
    let slice = &text[range];

    if separator.is_empty() {
        return slice
            .char_indices()
            .map(|(i, c)| Piece { start: base + i, end: base + i + c.len_utf8(), chars: 1 })
            .collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    while let Some(pos) = slice[start..].find(separator) {
        let end = start + pos + separator.len();
        pieces.push(Piece {
            start: base + start,
            end: base + end,
            chars: slice[start..end].chars().count(),
        });
        start = end;
    }
    if start < slice.len() {
        pieces.push(Piece {
            start: base + start,
            end: base + slice.len(),
            chars: slice[start..].chars().count(),
        });
    }
    pieces
}

/// Incremental byte → character offset conversion for monotonic positions.
#[derive(Default)]
struct CharOffsets {
    byte: usize,
    chars: usize,
}

impl CharOffsets {
    fn char_offset(&mut self, text: &str, byte: usize) -> usize {
        if byte < self.byte {
            self.byte = 0;
            self.chars = 0;
        }
        self.chars += text[self.byte..byte].chars().count();
        self.byte = byte;
        self.chars
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> usize {
        s.chars().count()
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        assert!(split_text("", 100, 10).unwrap().is_empty());
        let chunker = RecursiveChunker::new(100, 10).unwrap();
        assert!(chunker.chunk(&Document::new("empty.html", "")).is_empty());
    }

    #[test]
    fn rejects_invalid_sizes() {
        assert!(RecursiveChunker::new(0, 0).is_err());
        assert!(RecursiveChunker::new(10, 10).is_err());
        assert!(split_text("abc", 5, 7).is_err());
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        let chunks = split_text("apple banana", 1000, 200).unwrap();
        assert_eq!(chunks, vec!["apple banana"]);
    }

    #[test]
    fn twenty_five_hundred_chars_make_three_overlapping_chunks() {
        let text = "abcd ".repeat(500);
        assert_eq!(chars(&text), 2500);

        let chunker = RecursiveChunker::new(1000, 200).unwrap();
        let chunks = chunker.chunk(&Document::new("long.html", text));

        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| chars(&c.text) <= 1000));
        let first_end = chunks[0].start_offset + chars(&chunks[0].text);
        assert_eq!(first_end, 1000);
        assert!(chunks[1].start_offset <= 800);
        assert_eq!(chunks[2].start_offset + chars(&chunks[2].text), 2500);
    }

    #[test]
    fn prefers_paragraph_boundaries() {
        let text = "para one.\n\npara two.";
        let chunks = split_text(text, 15, 0).unwrap();
        assert_eq!(chunks, vec!["para one.\n\n", "para two."]);
    }

    #[test]
    fn zero_overlap_concatenates_to_input() {
        let text = "First paragraph here.\n\nSecond one is a bit longer. It has two sentences.\n\
                    A line.\n\nThird.";
        let chunks = split_text(text, 24, 0).unwrap();
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| chars(c) <= 24));
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn oversized_token_passes_through_without_character_fallback() {
        let chunker = RecursiveChunker::new(5, 0).unwrap().with_separators([" "]);
        let chunks = chunker.split("a bbbbbbbbbbbb c");
        assert_eq!(chunks, vec!["a ", "bbbbbbbbbbbb ", "c"]);
    }

    #[test]
    fn character_fallback_splits_long_tokens() {
        let chunks = split_text(&"x".repeat(25), 10, 2).unwrap();
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| chars(c) <= 10));
    }

    #[test]
    fn multibyte_text_is_split_on_char_boundaries() {
        let text = "héllo wörld ünïcode ".repeat(20);
        let chunker = RecursiveChunker::new(17, 4).unwrap();
        let chunks = chunker.chunk(&Document::new("u.txt", text.clone()));

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chars(&chunk.text) <= 17);
            let expected: String =
                text.chars().skip(chunk.start_offset).take(chars(&chunk.text)).collect();
            assert_eq!(expected, chunk.text);
        }
    }

    #[test]
    fn chunks_carry_source_and_sequence() {
        let chunker = RecursiveChunker::new(12, 3).unwrap();
        let chunks = chunker.chunk(&Document::new("a.html", "one two three four five six seven"));

        assert!(chunks.len() > 1);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.source_id, "a.html");
            assert_eq!(chunk.sequence_index, i);
        }
        assert_eq!(chunks[0].start_offset, 0);
    }
}
