//! Chunking engine: owns a validated configuration and the strategy
//! registry, runs the selected strategy, validates its output, and
//! stamps ids plus shared metadata.

use std::fmt;
use std::sync::Arc;

use crate::config::ChunkConfig;
use crate::error::{ChunkerError, Result};
use crate::parser::{self, DocumentAst};
use crate::strategies::{build_registry, NlpBackend, StrategyMap};
use crate::types::{meta, Chunk};

pub struct ChunkingEngine {
    config: ChunkConfig,
    registry: StrategyMap,
}

impl ChunkingEngine {
    /// Create an engine for a configuration. Configuration errors are
    /// reported here, before any document is touched.
    pub fn new(config: ChunkConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            registry: build_registry(None),
            config,
        })
    }

    /// Like [`ChunkingEngine::new`], with an NLP backend available to
    /// the strategies that can use one
    pub fn with_nlp(config: ChunkConfig, nlp: Arc<dyn NlpBackend>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            registry: build_registry(Some(nlp)),
            config,
        })
    }

    #[must_use]
    pub const fn config(&self) -> &ChunkConfig {
        &self.config
    }

    /// Parse and chunk a markdown document
    pub fn chunk_document(&self, text: &str) -> Result<Vec<Chunk>> {
        if text.trim().is_empty() {
            return Err(ChunkerError::EmptyContent);
        }
        let ast = parser::parse(text);
        self.chunk_ast(&ast)
    }

    /// Chunk an already-parsed document
    pub fn chunk_ast(&self, ast: &DocumentAst) -> Result<Vec<Chunk>> {
        let name = self.config.method.as_str();
        let strategy = self
            .registry
            .get(name)
            .ok_or_else(|| ChunkerError::unknown_strategy(name))?;

        let mut chunks = strategy.chunk(ast, &self.config)?;
        validate_chunks(&chunks, &self.config)?;
        annotate(&mut chunks, &self.config);

        log::debug!(
            "chunked document into {} chunks with method {}",
            chunks.len(),
            name
        );
        Ok(chunks)
    }

    /// Summarize a chunking result
    #[must_use]
    pub fn stats(&self, chunks: &[Chunk]) -> ChunkingStats {
        ChunkingStats::from_chunks(chunks)
    }
}

/// Reject empty chunks and chunks past the hard size limit. Atomic code
/// chunks are exempt from the limit; they are the one place a strategy
/// may trade size for integrity.
fn validate_chunks(chunks: &[Chunk], config: &ChunkConfig) -> Result<()> {
    let empty: Vec<usize> = chunks
        .iter()
        .enumerate()
        .filter(|(_, c)| c.content.trim().is_empty())
        .map(|(i, _)| i)
        .collect();
    if !empty.is_empty() {
        return Err(ChunkerError::EmptyChunk { indices: empty });
    }

    let limit = config.hard_limit();
    for (index, chunk) in chunks.iter().enumerate() {
        let len = chunk.char_len();
        if len > limit && !chunk.is_atomic_code() {
            return Err(ChunkerError::OversizedChunk { index, len, limit });
        }
    }
    Ok(())
}

/// Stamp deterministic ids and the shared metadata every chunk carries
fn annotate(chunks: &mut [Chunk], config: &ChunkConfig) {
    let total = chunks.len();
    for (index, chunk) in chunks.iter_mut().enumerate() {
        chunk.id = Some(format!("chunk_{index:04}"));
        chunk.insert_meta(meta::CHUNK_INDEX, index as u64);
        chunk.insert_meta(meta::TOTAL_CHUNKS, total as u64);
        chunk.insert_meta(meta::CHUNK_METHOD, config.method.as_str());
        chunk.insert_meta(meta::CHUNK_SIZE_CONFIG, config.chunk_size as u64);
        chunk.insert_meta(meta::OVERLAP_CONFIG, config.overlap as u64);
    }
}

/// Aggregate figures over a chunking result
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkingStats {
    pub total_chunks: usize,
    pub total_chars: usize,
    pub min_chars: usize,
    pub max_chars: usize,
    pub mean_chars: f64,
    pub code_chunks: usize,
}

impl ChunkingStats {
    #[must_use]
    pub fn from_chunks(chunks: &[Chunk]) -> Self {
        let sizes: Vec<usize> = chunks.iter().map(Chunk::char_len).collect();
        let total_chars: usize = sizes.iter().sum();
        let total_chunks = chunks.len();
        Self {
            total_chunks,
            total_chars,
            min_chars: sizes.iter().copied().min().unwrap_or(0),
            max_chars: sizes.iter().copied().max().unwrap_or(0),
            mean_chars: if total_chunks == 0 {
                0.0
            } else {
                total_chars as f64 / total_chunks as f64
            },
            code_chunks: chunks.iter().filter(|c| c.is_atomic_code()).count(),
        }
    }
}

impl fmt::Display for ChunkingStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} chunks, {} chars total (min {}, max {}, mean {:.1}), {} code",
            self.total_chunks,
            self.total_chars,
            self.min_chars,
            self.max_chars,
            self.mean_chars,
            self.code_chunks
        )
    }
}
