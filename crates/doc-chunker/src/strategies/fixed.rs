//! Window-sliding strategies over flattened text: raw character windows
//! and whitespace-token windows.

use crate::config::ChunkConfig;
use crate::error::Result;
use crate::overlap::tail_units_within;
use crate::parser::DocumentAst;
use crate::strategies::{
    assign_effective_offsets, char_byte_offsets, window_spans, ChunkStrategy,
};
use crate::types::Chunk;

/// Fixed-size character windows with configurable overlap. Offsets are
/// real positions into the flattened, front-matter-stripped text.
pub struct FixedSizeChunker;

impl ChunkStrategy for FixedSizeChunker {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn chunk(&self, ast: &DocumentAst, config: &ChunkConfig) -> Result<Vec<Chunk>> {
        let text = ast.flattened_text();
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let offsets = char_byte_offsets(&text);
        let chunks = window_spans(
            &text,
            config.chunk_size,
            config.overlap,
            config.respect_boundaries,
        )
        .into_iter()
        .filter_map(|(start, end)| {
            let slice = &text[offsets[start]..offsets[end]];
            // A window landing inside a whitespace run carries no content.
            if slice.trim().is_empty() {
                None
            } else {
                Some(Chunk::new(slice, start, end))
            }
        })
        .collect();

        Ok(chunks)
    }
}

/// Whole-word windows sized by characters, with an optional estimated
/// token cap. Words are never split unless a single word exceeds the
/// whole budget.
pub struct TokenChunker;

/// Rough estimate mirroring embedding tokenizers: ~4 chars per token
pub(crate) fn estimate_tokens(chars: usize) -> usize {
    (chars / 4).max(1)
}

impl ChunkStrategy for TokenChunker {
    fn name(&self) -> &'static str {
        "token"
    }

    fn chunk(&self, ast: &DocumentAst, config: &ChunkConfig) -> Result<Vec<Chunk>> {
        let text = ast.flattened_text();
        let words: Vec<&str> = text.split_whitespace().collect();
        if words.is_empty() {
            return Ok(Vec::new());
        }

        let mut chunks: Vec<Chunk> = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        let mut current_chars = 0usize;

        let mut flush =
            |current: &mut Vec<&str>, current_chars: &mut usize, chunks: &mut Vec<Chunk>| {
                if current.is_empty() {
                    return;
                }
                chunks.push(Chunk::new(current.join(" "), 0, 0));
                let carried = tail_units_within(current, config.overlap);
                *current = carried;
                *current_chars = joined_len(current);
            };

        for word in words {
            let word_len = word.chars().count();

            if word_len > config.chunk_size {
                // A single word larger than the whole budget: hard-cut it.
                flush(&mut current, &mut current_chars, &mut chunks);
                current.clear();
                current_chars = 0;
                let offsets = char_byte_offsets(word);
                for (start, end) in window_spans(word, config.chunk_size, 0, false) {
                    chunks.push(Chunk::new(&word[offsets[start]..offsets[end]], 0, 0));
                }
                continue;
            }

            let candidate = if current.is_empty() {
                word_len
            } else {
                current_chars + 1 + word_len
            };
            let over_chars = !current.is_empty() && candidate > config.chunk_size;
            let over_tokens = config
                .max_tokens
                .is_some_and(|cap| !current.is_empty() && estimate_tokens(candidate) > cap);
            if over_chars || over_tokens {
                flush(&mut current, &mut current_chars, &mut chunks);
                // Carried overlap plus the new word must still fit.
                while !current.is_empty() && joined_len(&current) + 1 + word_len > config.chunk_size
                {
                    current.remove(0);
                }
                current_chars = joined_len(&current);
            }

            current.push(word);
            current_chars = if current.len() == 1 {
                word_len
            } else {
                current_chars + 1 + word_len
            };
        }

        if !current.is_empty() {
            chunks.push(Chunk::new(current.join(" "), 0, 0));
        }

        assign_effective_offsets(&mut chunks);
        Ok(chunks)
    }
}

fn joined_len(words: &[&str]) -> usize {
    let chars: usize = words.iter().map(|w| w.chars().count()).sum();
    chars + words.len().saturating_sub(1)
}
