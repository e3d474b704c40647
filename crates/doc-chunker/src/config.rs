use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ChunkerError, Result};

/// Configuration for document chunking behavior
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkConfig {
    /// Target chunk size in characters (soft limit; hard limit is 1.5x)
    pub chunk_size: usize,

    /// Overlap carried from one chunk into the next, in characters
    /// (or in the strategy's own unit granularity). Must be < `chunk_size`.
    pub overlap: usize,

    /// Chunking method to dispatch to
    pub method: ChunkMethod,

    /// Pull window cuts back to word/sentence/paragraph boundaries
    pub respect_boundaries: bool,

    /// Optional token cap for the token strategy (estimated tokens)
    pub max_tokens: Option<usize>,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            overlap: 100,
            method: ChunkMethod::Structure,
            respect_boundaries: true,
            max_tokens: None,
        }
    }
}

impl ChunkConfig {
    /// Create config optimized for embeddings (smaller, focused chunks)
    pub fn for_embeddings() -> Self {
        Self {
            chunk_size: 600,
            overlap: 60,
            ..Default::default()
        }
    }

    /// Create config optimized for LLM context (larger, comprehensive chunks)
    pub fn for_llm_context() -> Self {
        Self {
            chunk_size: 2000,
            overlap: 200,
            ..Default::default()
        }
    }

    /// Create config optimized for speed (plain fixed-size windows)
    pub fn for_speed() -> Self {
        Self {
            method: ChunkMethod::Fixed,
            overlap: 0,
            respect_boundaries: false,
            ..Default::default()
        }
    }

    /// Validate configuration. Rejects eagerly, before any parsing work:
    /// an `overlap >= chunk_size` would make windows stall or walk backwards,
    /// so it is an error rather than a clamp.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(ChunkerError::invalid_config("chunk_size must be > 0"));
        }

        if self.overlap >= self.chunk_size {
            return Err(ChunkerError::invalid_config(format!(
                "overlap ({}) must be smaller than chunk_size ({})",
                self.overlap, self.chunk_size
            )));
        }

        if let Some(max_tokens) = self.max_tokens {
            if max_tokens == 0 {
                return Err(ChunkerError::invalid_config("max_tokens must be > 0"));
            }
        }

        Ok(())
    }

    /// Hard per-chunk character limit enforced by the engine
    #[must_use]
    pub const fn hard_limit(&self) -> usize {
        self.chunk_size + self.chunk_size / 2
    }
}

/// Chunking method, one variant per registered strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkMethod {
    /// Element-accumulating chunking with atomic code blocks (default)
    Structure,
    /// Fixed-size character windows
    Fixed,
    /// Sentence-granularity windows
    Sentence,
    /// Paragraph-granularity windows
    Paragraph,
    /// Header-delimited section windows
    Section,
    /// Token-granularity windows
    Token,
    /// Pairwise word-overlap semantic chunking, O(n^2)
    SemanticNaive,
    /// TF-IDF windowed semantic chunking, amortized O(n)
    SemanticOptimized,
    /// Dynamic-programming boundary search with optional NLP assists
    SemanticAdvanced,
}

impl ChunkMethod {
    /// All registered methods, in registry order
    pub const ALL: [Self; 9] = [
        Self::Structure,
        Self::Fixed,
        Self::Sentence,
        Self::Paragraph,
        Self::Section,
        Self::Token,
        Self::SemanticNaive,
        Self::SemanticOptimized,
        Self::SemanticAdvanced,
    ];

    /// Wire name used for registry lookup and chunk metadata
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Structure => "structure",
            Self::Fixed => "fixed",
            Self::Sentence => "sentence",
            Self::Paragraph => "paragraph",
            Self::Section => "section",
            Self::Token => "token",
            Self::SemanticNaive => "semantic_naive",
            Self::SemanticOptimized => "semantic_optimized",
            Self::SemanticAdvanced => "semantic_advanced",
        }
    }
}

impl fmt::Display for ChunkMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChunkMethod {
    type Err = ChunkerError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|method| method.as_str() == s)
            .ok_or_else(|| ChunkerError::unknown_strategy(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_valid() {
        assert!(ChunkConfig::default().validate().is_ok());
    }

    #[test]
    fn preset_configs_valid() {
        assert!(ChunkConfig::for_embeddings().validate().is_ok());
        assert!(ChunkConfig::for_llm_context().validate().is_ok());
        assert!(ChunkConfig::for_speed().validate().is_ok());
    }

    #[test]
    fn overlap_must_stay_below_chunk_size() {
        let config = ChunkConfig {
            chunk_size: 100,
            overlap: 100,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ChunkerError::InvalidConfig(_))
        ));

        let config = ChunkConfig {
            chunk_size: 100,
            overlap: 150,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ChunkConfig {
            chunk_size: 100,
            overlap: 99,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_chunk_size_rejected() {
        let config = ChunkConfig {
            chunk_size: 0,
            overlap: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn hard_limit_is_one_and_a_half_chunk_sizes() {
        let config = ChunkConfig {
            chunk_size: 20,
            overlap: 5,
            ..Default::default()
        };
        assert_eq!(config.hard_limit(), 30);
    }

    #[test]
    fn method_names_round_trip() {
        for method in ChunkMethod::ALL {
            assert_eq!(method.as_str().parse::<ChunkMethod>().unwrap(), method);
        }
        assert!(matches!(
            "no_such_method".parse::<ChunkMethod>(),
            Err(ChunkerError::UnknownStrategy(_))
        ));
    }

    #[test]
    fn method_serde_uses_wire_names() {
        let json = serde_json::to_string(&ChunkMethod::SemanticOptimized).unwrap();
        assert_eq!(json, "\"semantic_optimized\"");
        let back: ChunkMethod = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ChunkMethod::SemanticOptimized);
    }
}
