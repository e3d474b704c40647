//! Chunking strategies.
//!
//! One implementation per [`ChunkMethod`](crate::ChunkMethod) variant,
//! all behind the [`ChunkStrategy`] trait. The engine builds the
//! registry once per configuration and dispatches by wire name. Every
//! strategy is a pure function of `(ast, config)`; identical input must
//! always yield byte-identical chunk boundaries.

mod fixed;
mod granular;
mod semantic_advanced;
mod semantic_naive;
mod semantic_optimized;
mod structure;

use std::collections::HashMap;
use std::sync::Arc;

pub use fixed::{FixedSizeChunker, TokenChunker};
pub use granular::{ParagraphChunker, SectionChunker, SentenceChunker};
pub use semantic_advanced::{NlpBackend, SemanticAdvancedChunker};
pub use semantic_naive::SemanticNaiveChunker;
pub use semantic_optimized::SemanticOptimizedChunker;
pub use structure::StructureAwareChunker;

use crate::config::ChunkConfig;
use crate::error::Result;
use crate::parser::{DocumentAst, Element, ElementKind};
use crate::semantic::SemanticUnit;
use crate::types::Chunk;

/// A chunking strategy. Strategies produce chunk content and
/// strategy-specific metadata only; ids and index metadata are stamped
/// by the engine afterwards.
pub trait ChunkStrategy: Send + Sync {
    /// Wire name used for registry lookup and `chunk_method` metadata
    fn name(&self) -> &'static str;

    /// Produce chunks for a parsed document
    fn chunk(&self, ast: &DocumentAst, config: &ChunkConfig) -> Result<Vec<Chunk>>;
}

pub(crate) type StrategyMap = HashMap<&'static str, Box<dyn ChunkStrategy>>;

/// Build the name -> strategy table, one instance per strategy
pub(crate) fn build_registry(nlp: Option<Arc<dyn NlpBackend>>) -> StrategyMap {
    let strategies: Vec<Box<dyn ChunkStrategy>> = vec![
        Box::new(StructureAwareChunker),
        Box::new(FixedSizeChunker),
        Box::new(SentenceChunker),
        Box::new(ParagraphChunker),
        Box::new(SectionChunker),
        Box::new(TokenChunker),
        Box::new(SemanticNaiveChunker),
        Box::new(SemanticOptimizedChunker),
        Box::new(SemanticAdvancedChunker::new(nlp)),
    ];

    strategies
        .into_iter()
        .map(|strategy| (strategy.name(), strategy))
        .collect()
}

/// Stamp cumulative char offsets into the effective text formed by the
/// emitted chunk contents. Used by the accumulator strategies, whose
/// effective text duplicates overlap.
pub(crate) fn assign_effective_offsets(chunks: &mut [Chunk]) {
    let mut cursor = 0usize;
    for chunk in chunks {
        let len = chunk.char_len();
        chunk.start = cursor;
        chunk.end = cursor + len;
        cursor = chunk.end;
    }
}

/// Byte offset of every char boundary plus the terminal offset, for
/// char-indexed slicing
pub(crate) fn char_byte_offsets(text: &str) -> Vec<usize> {
    text.char_indices()
        .map(|(byte, _)| byte)
        .chain(std::iter::once(text.len()))
        .collect()
}

/// Sliding char windows over `text`. When `respect_boundaries` is set and
/// a window would end mid-unit, the cut is pulled back to the nearest
/// preceding boundary within the lower half of the window; without one
/// the hard cut stands. Successive windows re-cover `overlap` chars.
pub(crate) fn window_spans(
    text: &str,
    chunk_size: usize,
    overlap: usize,
    respect_boundaries: bool,
) -> Vec<(usize, usize)> {
    let chars: Vec<char> = text.chars().collect();
    let total = chars.len();
    let mut spans = Vec::new();
    let mut start = 0usize;

    while start < total {
        let mut end = (start + chunk_size).min(total);
        if respect_boundaries && end < total {
            let floor = start + chunk_size / 2;
            let mut p = end;
            while p > floor {
                if chars[p - 1].is_whitespace() {
                    end = p;
                    break;
                }
                p -= 1;
            }
        }
        spans.push((start, end));
        if end >= total {
            break;
        }
        // overlap < chunk_size is validated, but a pulled-back window can
        // still be shorter than the overlap; always make progress.
        start = end.saturating_sub(overlap).max(start + 1);
    }

    spans
}

/// Greedily pack pieces into groups no larger than `chunk_size`,
/// joining with `sep`
fn pack_pieces(pieces: Vec<String>, sep: &str, chunk_size: usize) -> Vec<String> {
    let sep_len = sep.chars().count();
    let mut out: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for piece in pieces {
        let len = piece.chars().count();
        if current_len > 0 && current_len + sep_len + len > chunk_size {
            out.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if current_len > 0 {
            current.push_str(sep);
            current_len += sep_len;
        }
        current.push_str(&piece);
        current_len += len;
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

/// Split text that exceeds `chunk_size` into bounded pieces, preferring
/// paragraph (`\n\n`) then line (`\n`) break points, then sentence-sized
/// windows with word pull-back as the last resort.
pub(crate) fn split_oversized(text: &str, chunk_size: usize) -> Vec<String> {
    if text.chars().count() <= chunk_size {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Vec::new();
        }
        return vec![text.to_string()];
    }

    for sep in ["\n\n", "\n"] {
        let parts: Vec<&str> = text.split(sep).filter(|p| !p.trim().is_empty()).collect();
        if parts.len() > 1 {
            let mut pieces = Vec::new();
            for part in parts {
                pieces.extend(split_oversized(part, chunk_size));
            }
            return pack_pieces(pieces, sep, chunk_size);
        }
    }

    let offsets = char_byte_offsets(text);
    window_spans(text, chunk_size, 0, true)
        .into_iter()
        .map(|(start, end)| text[offsets[start]..offsets[end]].to_string())
        .filter(|piece| !piece.trim().is_empty())
        .collect()
}

struct Section<'a> {
    header: Option<&'a Element>,
    body: Vec<&'a Element>,
}

fn sections(ast: &DocumentAst) -> Vec<Section<'_>> {
    let mut out: Vec<Section<'_>> = Vec::new();
    for element in &ast.elements {
        if element.kind == ElementKind::Header {
            out.push(Section {
                header: Some(element),
                body: Vec::new(),
            });
        } else if let Some(last) = out.last_mut() {
            last.body.push(element);
        } else {
            out.push(Section {
                header: None,
                body: vec![element],
            });
        }
    }
    out
}

/// Partition a document into semantic units along header boundaries.
///
/// With `paragraph_subsplit`, sections larger than `chunk_size / 2` break
/// into paragraph-grouped sub-units (consecutive lists merge, consecutive
/// prose merges, code fences stand alone); without it the same regrouping
/// only kicks in past `chunk_size`. Oversized prose units are split
/// further so that only atomic code can exceed the budget.
pub(crate) fn partition_units(
    ast: &DocumentAst,
    chunk_size: usize,
    paragraph_subsplit: bool,
) -> Vec<SemanticUnit> {
    let threshold = if paragraph_subsplit {
        (chunk_size / 2).max(1)
    } else {
        chunk_size
    };

    let mut units: Vec<SemanticUnit> = Vec::new();
    for section in sections(ast) {
        let title = section.header.map(|h| h.text.clone());
        let level = section.header.and_then(|h| h.level);

        let mut parts: Vec<&Element> = Vec::new();
        if let Some(header) = section.header {
            parts.push(header);
        }
        parts.extend(section.body.iter().copied());

        let section_size: usize = parts.iter().map(|e| e.char_len()).sum::<usize>()
            + parts.len().saturating_sub(1) * 2;

        if section_size <= threshold {
            let content = parts
                .iter()
                .map(|e| e.markdown())
                .collect::<Vec<_>>()
                .join("\n\n");
            if !content.trim().is_empty() {
                let kind = section
                    .header
                    .map_or_else(|| parts[0].kind, |h| h.kind);
                units.push(SemanticUnit::new(content, kind, level, title));
            }
            continue;
        }

        // Regroup the section's elements into runs: code never merges,
        // list runs merge, everything else is prose.
        for (kind, group) in element_runs(&parts) {
            let content = group.join("\n\n");
            if content.trim().is_empty() {
                continue;
            }
            if kind == ElementKind::CodeBlock {
                units.push(SemanticUnit::new(content, kind, level, title.clone()));
                continue;
            }
            if content.chars().count() > chunk_size {
                for piece in split_oversized(&content, chunk_size) {
                    units.push(SemanticUnit::new(piece, kind, level, title.clone()));
                }
            } else {
                units.push(SemanticUnit::new(content, kind, level, title.clone()));
            }
        }
    }

    units
}

/// Group elements into merge runs; returns `(run kind, rendered parts)`
fn element_runs(parts: &[&Element]) -> Vec<(ElementKind, Vec<String>)> {
    let class = |kind: ElementKind| match kind {
        ElementKind::CodeBlock => ElementKind::CodeBlock,
        ElementKind::List => ElementKind::List,
        // Headers ride along with the prose that follows them.
        ElementKind::Header | ElementKind::Paragraph => ElementKind::Paragraph,
    };

    let mut runs: Vec<(ElementKind, Vec<String>)> = Vec::new();
    for element in parts {
        let run_kind = class(element.kind);
        match runs.last_mut() {
            Some((kind, group)) if *kind == run_kind && run_kind != ElementKind::CodeBlock => {
                group.push(element.markdown());
            }
            _ => runs.push((run_kind, vec![element.markdown()])),
        }
    }
    runs
}
