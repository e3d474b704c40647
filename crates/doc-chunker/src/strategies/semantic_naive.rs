//! Baseline similarity chunking. Every flush scores the incoming unit
//! against each unit of the chunk just flushed, so a document that packs
//! many units per chunk pays a quadratic worst case. Kept as the
//! reference point the optimized variant is measured against.

use crate::config::ChunkConfig;
use crate::error::Result;
use crate::parser::DocumentAst;
use crate::semantic::{
    top_terms, wordset_cosine, DocumentFrequency, SemanticUnit, RELATEDNESS_THRESHOLD,
};
use crate::strategies::{assign_effective_offsets, partition_units, ChunkStrategy};
use crate::types::{meta, Chunk, CHUNK_TYPE_CODE};

const TOPIC_COUNT: usize = 5;

pub struct SemanticNaiveChunker;

impl ChunkStrategy for SemanticNaiveChunker {
    fn name(&self) -> &'static str {
        "semantic_naive"
    }

    fn chunk(&self, ast: &DocumentAst, config: &ChunkConfig) -> Result<Vec<Chunk>> {
        let units = partition_units(ast, config.chunk_size, false);
        if units.is_empty() {
            return Ok(Vec::new());
        }
        let df = DocumentFrequency::build(&units);

        let mut builder = ChunkBuilder::new(&units, &df, config);
        for (idx, unit) in units.iter().enumerate() {
            if unit.is_code() && unit.size > config.chunk_size {
                builder.emit_standalone_code(idx);
                continue;
            }
            builder.push(idx, |candidate, flushed| {
                // Score the incoming unit against every unit of the
                // flushed chunk, newest first.
                seed_indices(candidate, flushed, |a, b| {
                    wordset_cosine(a, b) > RELATEDNESS_THRESHOLD
                })
            });
        }
        let mut chunks = builder.finish("semantic_naive");
        assign_effective_offsets(&mut chunks);
        Ok(chunks)
    }
}

/// Walk the flushed chunk's units newest-first and keep the ones related
/// to `candidate`, returning them in document order
fn seed_indices(
    candidate: &SemanticUnit,
    flushed: &[&SemanticUnit],
    related: impl Fn(&SemanticUnit, &SemanticUnit) -> bool,
) -> Vec<usize> {
    let mut picked: Vec<usize> = (0..flushed.len())
        .rev()
        .filter(|&pos| {
            let unit = flushed[pos];
            !unit.is_code() && related(candidate, unit)
        })
        .collect();
    picked.reverse();
    picked
}

/// Greedy accumulator shared by the full-chunk scan above and the
/// windowed scan in the optimized strategy. Seeds count against the
/// chunk budget and are dropped front-first when the real content needs
/// the room.
pub(super) struct ChunkBuilder<'a> {
    units: &'a [SemanticUnit],
    df: &'a DocumentFrequency,
    config: &'a ChunkConfig,
    /// Indices of units in the current chunk (excluding seeds)
    current: Vec<usize>,
    /// Seed unit indices prepended to the current chunk
    seeds: Vec<usize>,
    /// Unit indices of the most recently flushed chunk; overlap
    /// candidates never reach further back than this
    flushed: Vec<usize>,
    chunks: Vec<(Vec<usize>, Vec<usize>, bool)>,
}

impl<'a> ChunkBuilder<'a> {
    pub(super) fn new(
        units: &'a [SemanticUnit],
        df: &'a DocumentFrequency,
        config: &'a ChunkConfig,
    ) -> Self {
        Self {
            units,
            df,
            config,
            current: Vec::new(),
            seeds: Vec::new(),
            flushed: Vec::new(),
            chunks: Vec::new(),
        }
    }

    fn joined_size(&self) -> usize {
        let ids = self.seeds.iter().chain(&self.current);
        let (count, chars) = ids.fold((0usize, 0usize), |(n, total), &id| {
            (n + 1, total + self.units[id].size)
        });
        chars + count.saturating_sub(1) * 2
    }

    /// Append a unit, flushing first when it would not fit. `select_seeds`
    /// maps the incoming unit and the just-flushed chunk's units to the
    /// overlap candidates for the fresh chunk.
    pub(super) fn push<F>(&mut self, idx: usize, select_seeds: F)
    where
        F: FnOnce(&SemanticUnit, &[&SemanticUnit]) -> Vec<usize>,
    {
        let unit = &self.units[idx];
        let fits = (self.current.is_empty() && self.seeds.is_empty())
            || self.joined_size() + 2 + unit.size <= self.config.chunk_size;

        if !fits && !self.current.is_empty() {
            self.flush();
            if self.config.overlap > 0 {
                let flushed: Vec<&SemanticUnit> =
                    self.flushed.iter().map(|&id| &self.units[id]).collect();
                let picked = select_seeds(unit, &flushed);
                self.seeds = bounded_seeds(
                    &picked,
                    &self.flushed,
                    self.units,
                    self.config.overlap,
                );
            }
        }

        self.current.push(idx);
        // A seeded chunk must still fit the budget once real content lands.
        while self.joined_size() > self.config.chunk_size && !self.seeds.is_empty() {
            self.seeds.remove(0);
        }
    }

    /// Flush accumulated prose, then emit an oversized code unit as its
    /// own chunk, exempt from the size limit
    pub(super) fn emit_standalone_code(&mut self, idx: usize) {
        if !self.current.is_empty() {
            self.flush();
        }
        self.seeds.clear();
        self.chunks.push((Vec::new(), vec![idx], true));
        self.flushed = vec![idx];
    }

    fn flush(&mut self) {
        if self.current.is_empty() {
            return;
        }
        let single_code =
            self.current.len() == 1 && self.units[self.current[0]].is_code();
        let current = std::mem::take(&mut self.current);
        let seeds = std::mem::take(&mut self.seeds);
        self.flushed = current.clone();
        self.chunks.push((seeds, current, single_code));
    }

    pub(super) fn finish(mut self, algorithm: &str) -> Vec<Chunk> {
        self.flush();

        let mut out = Vec::with_capacity(self.chunks.len());
        for (seeds, body, is_code) in &self.chunks {
            let content = seeds
                .iter()
                .chain(body)
                .map(|&id| self.units[id].content.as_str())
                .collect::<Vec<_>>()
                .join("\n\n");

            let mut chunk = Chunk::new(content, 0, 0);
            chunk.insert_meta(meta::ALGORITHM, algorithm);
            let body_units: Vec<&SemanticUnit> =
                body.iter().map(|&id| &self.units[id]).collect();
            let topics = top_terms(&body_units, self.df, TOPIC_COUNT);
            if !topics.is_empty() {
                chunk.insert_meta(
                    meta::TOPICS,
                    serde_json::Value::from(topics),
                );
            }
            if *is_code {
                chunk.insert_meta(meta::CHUNK_TYPE, CHUNK_TYPE_CODE);
            }
            out.push(chunk);
        }
        out
    }
}

/// Trim a seed candidate list to the overlap character budget, keeping
/// the most recent candidates and document order
fn bounded_seeds(
    picked: &[usize],
    flushed: &[usize],
    units: &[SemanticUnit],
    overlap: usize,
) -> Vec<usize> {
    let mut budget = overlap;
    let mut selected: Vec<usize> = Vec::new();
    for &pos in picked.iter().rev() {
        let unit_id = flushed[pos];
        let size = units[unit_id].size;
        if size > budget {
            continue;
        }
        budget -= size;
        selected.push(unit_id);
    }
    selected.reverse();
    selected
}
