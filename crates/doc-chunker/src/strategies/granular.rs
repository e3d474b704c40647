//! Unit-granularity window strategies: sentences, blank-line paragraphs,
//! and header-delimited sections. All three accumulate whole units and
//! carry unit-level overlap, the analogue of the character-tail rule.

use unicode_segmentation::UnicodeSegmentation;

use crate::config::ChunkConfig;
use crate::error::Result;
use crate::overlap::tail_units_within;
use crate::parser::{DocumentAst, ElementKind};
use crate::strategies::{assign_effective_offsets, split_oversized, ChunkStrategy};
use crate::types::{meta, Chunk};

/// Accumulate whole units into chunks of at most `chunk_size` chars,
/// carrying trailing units within the overlap budget into the next chunk
fn accumulate_units(
    units: &[String],
    chunk_size: usize,
    overlap: usize,
    joiner: &str,
    chunk_type: &str,
) -> Vec<Chunk> {
    let joiner_len = joiner.chars().count();
    let joined_len = |parts: &[&str]| -> usize {
        let chars: usize = parts.iter().map(|p| p.chars().count()).sum();
        chars + parts.len().saturating_sub(1) * joiner_len
    };

    let mut chunks: Vec<Chunk> = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for unit in units {
        let unit_len = unit.chars().count();
        if !current.is_empty() && joined_len(&current) + joiner_len + unit_len > chunk_size {
            chunks.push(
                Chunk::new(current.join(joiner), 0, 0).with_meta(meta::CHUNK_TYPE, chunk_type),
            );
            current = tail_units_within(&current, overlap);
            // Carried overlap plus the new unit must still fit.
            while !current.is_empty()
                && joined_len(&current) + joiner_len + unit_len > chunk_size
            {
                current.remove(0);
            }
        }
        current.push(unit);
    }

    if !current.is_empty() {
        chunks.push(
            Chunk::new(current.join(joiner), 0, 0).with_meta(meta::CHUNK_TYPE, chunk_type),
        );
    }

    assign_effective_offsets(&mut chunks);
    chunks
}

/// Sentence-granularity windows (UAX #29 sentence boundaries)
pub struct SentenceChunker;

impl ChunkStrategy for SentenceChunker {
    fn name(&self) -> &'static str {
        "sentence"
    }

    fn chunk(&self, ast: &DocumentAst, config: &ChunkConfig) -> Result<Vec<Chunk>> {
        let text = ast.flattened_text();
        let mut units: Vec<String> = Vec::new();
        for sentence in text.split_sentence_bounds() {
            let trimmed = sentence.trim();
            if trimmed.is_empty() {
                continue;
            }
            if trimmed.chars().count() > config.chunk_size {
                units.extend(split_oversized(trimmed, config.chunk_size));
            } else {
                units.push(trimmed.to_string());
            }
        }

        Ok(accumulate_units(
            &units,
            config.chunk_size,
            config.overlap,
            " ",
            "sentences",
        ))
    }
}

/// Blank-line paragraph windows
pub struct ParagraphChunker;

impl ChunkStrategy for ParagraphChunker {
    fn name(&self) -> &'static str {
        "paragraph"
    }

    fn chunk(&self, ast: &DocumentAst, config: &ChunkConfig) -> Result<Vec<Chunk>> {
        let text = ast.flattened_text();
        let mut units: Vec<String> = Vec::new();
        for paragraph in text.split("\n\n") {
            let trimmed = paragraph.trim();
            if trimmed.is_empty() {
                continue;
            }
            if trimmed.chars().count() > config.chunk_size {
                units.extend(split_oversized(trimmed, config.chunk_size));
            } else {
                units.push(trimmed.to_string());
            }
        }

        Ok(accumulate_units(
            &units,
            config.chunk_size,
            config.overlap,
            "\n\n",
            "paragraphs",
        ))
    }
}

/// Header-delimited section windows. Oversized sections re-split
/// recursively, preferring paragraph then line break points.
pub struct SectionChunker;

impl ChunkStrategy for SectionChunker {
    fn name(&self) -> &'static str {
        "section"
    }

    fn chunk(&self, ast: &DocumentAst, config: &ChunkConfig) -> Result<Vec<Chunk>> {
        let mut sections: Vec<String> = Vec::new();
        let mut current: Vec<String> = Vec::new();

        for element in &ast.elements {
            if element.kind == ElementKind::Header && !current.is_empty() {
                sections.push(current.join("\n\n"));
                current.clear();
            }
            current.push(element.markdown());
        }
        if !current.is_empty() {
            sections.push(current.join("\n\n"));
        }

        let mut units: Vec<String> = Vec::new();
        for section in sections {
            if section.chars().count() > config.chunk_size {
                units.extend(split_oversized(&section, config.chunk_size));
            } else if !section.trim().is_empty() {
                units.push(section);
            }
        }

        Ok(accumulate_units(
            &units,
            config.chunk_size,
            config.overlap,
            "\n\n",
            "section",
        ))
    }
}
