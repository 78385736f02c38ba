//! Fixed-window text chunker.
//!
//! Splits text into windows of `chunk_size` characters, each starting
//! `chunk_size - overlap` characters after the previous one. Positions are
//! counted in Unicode scalar values, so a window never splits a character.
//! Splitting stops at the first window that reaches the end of the text.

use juno_types::index::{Chunk, ChunkError};

/// Split `text` into overlapping windows.
///
/// Empty text yields no chunks; text no longer than `chunk_size` yields one.
pub fn split(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<Chunk>, ChunkError> {
    if chunk_size == 0 {
        return Err(ChunkError::ZeroChunkSize);
    }
    if overlap >= chunk_size {
        return Err(ChunkError::OverlapTooLarge {
            chunk_size,
            overlap,
        });
    }
    let stride = chunk_size - overlap;

    // Byte offset of every character, plus the end of the text.
    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let char_count = boundaries.len() - 1;

    let mut chunks = Vec::with_capacity(expected_count(char_count, chunk_size, stride));
    let mut start = 0;
    while start < char_count {
        let end = (start + chunk_size).min(char_count);
        chunks.push(Chunk {
            text: text[boundaries[start]..boundaries[end]].to_string(),
            offset: start,
            index: chunks.len(),
        });
        if end == char_count {
            break;
        }
        start += stride;
    }
    Ok(chunks)
}

/// Number of windows `split` produces for a text of `len` characters.
pub fn expected_count(len: usize, chunk_size: usize, stride: usize) -> usize {
    if len == 0 {
        0
    } else if len <= chunk_size {
        1
    } else {
        (len - chunk_size).div_ceil(stride) + 1
    }
}
