use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Metadata keys stamped onto chunks. Downstream stores treat these as
/// primitive-typed tags; anything non-primitive is the consumer's problem
/// to flatten.
pub mod meta {
    /// Wire name of the strategy that produced the chunk
    pub const CHUNK_METHOD: &str = "chunk_method";
    /// Configured chunk size at the time of chunking
    pub const CHUNK_SIZE_CONFIG: &str = "chunk_size_config";
    /// Configured overlap at the time of chunking
    pub const OVERLAP_CONFIG: &str = "overlap_config";
    /// Zero-based position of the chunk in the output
    pub const CHUNK_INDEX: &str = "chunk_index";
    /// Total number of chunks in the output
    pub const TOTAL_CHUNKS: &str = "total_chunks";
    /// Breadcrumb of enclosing header titles, joined with " > "
    pub const STRUCTURAL_CONTEXT: &str = "structural_context";
    /// Top TF-IDF terms for semantic chunks
    pub const TOPICS: &str = "topics";
    /// Kind tag ("code" marks atomic code-block chunks)
    pub const CHUNK_TYPE: &str = "chunk_type";
    /// Algorithm tag set by the semantic strategies
    pub const ALGORITHM: &str = "algorithm";
    /// Whether an NLP backend contributed to boundary scoring
    pub const NLP_ENABLED: &str = "nlp_enabled";
    /// Named entities reported by the NLP backend, if any
    pub const ENTITIES: &str = "entities";
}

/// Chunk type tag for atomic code-block chunks; these are exempt from the
/// engine's hard size limit.
pub const CHUNK_TYPE_CODE: &str = "code";

/// A bounded document fragment with metadata, the unit handed to
/// downstream indexing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Deterministic id assigned by the engine (`chunk_0000`, ...).
    /// Strategies leave this as `None`.
    pub id: Option<String>,

    /// The chunk text
    pub content: String,

    /// Open metadata map; see [`meta`] for the well-known keys
    #[serde(default)]
    pub metadata: Map<String, Value>,

    /// Start char offset into the effective text the strategy operated on
    pub start: usize,

    /// End char offset (exclusive) into the effective text
    pub end: usize,
}

impl Chunk {
    /// Create a chunk with empty metadata
    #[must_use]
    pub fn new(content: impl Into<String>, start: usize, end: usize) -> Self {
        Self {
            id: None,
            content: content.into(),
            metadata: Map::new(),
            start,
            end,
        }
    }

    /// Content length in characters
    #[must_use]
    pub fn char_len(&self) -> usize {
        self.content.chars().count()
    }

    /// Insert a metadata entry
    pub fn insert_meta(&mut self, key: &str, value: impl Into<Value>) {
        self.metadata.insert(key.to_string(), value.into());
    }

    /// Builder-style metadata insertion
    #[must_use]
    pub fn with_meta(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.insert_meta(key, value);
        self
    }

    /// Look up a string-valued metadata entry
    #[must_use]
    pub fn meta_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }

    /// Look up an integer-valued metadata entry
    #[must_use]
    pub fn meta_u64(&self, key: &str) -> Option<u64> {
        self.metadata.get(key).and_then(Value::as_u64)
    }

    /// Whether this chunk is a single atomic code block, exempt from the
    /// hard size limit
    #[must_use]
    pub fn is_atomic_code(&self) -> bool {
        self.meta_str(meta::CHUNK_TYPE) == Some(CHUNK_TYPE_CODE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn char_len_counts_chars_not_bytes() {
        let chunk = Chunk::new("héllo", 0, 5);
        assert_eq!(chunk.char_len(), 5);
        assert_eq!(chunk.content.len(), 6);
    }

    #[test]
    fn metadata_round_trip() {
        let mut chunk = Chunk::new("text", 0, 4);
        chunk.insert_meta(meta::CHUNK_INDEX, 3u64);
        chunk.insert_meta(meta::STRUCTURAL_CONTEXT, "Title > Sub");

        assert_eq!(chunk.meta_u64(meta::CHUNK_INDEX), Some(3));
        assert_eq!(
            chunk.meta_str(meta::STRUCTURAL_CONTEXT),
            Some("Title > Sub")
        );
        assert_eq!(chunk.meta_str("missing"), None);
    }

    #[test]
    fn atomic_code_detection() {
        let chunk = Chunk::new("```rust\nfn main() {}\n```", 0, 24)
            .with_meta(meta::CHUNK_TYPE, CHUNK_TYPE_CODE);
        assert!(chunk.is_atomic_code());
        assert!(!Chunk::new("prose", 0, 5).is_atomic_code());
    }
}
