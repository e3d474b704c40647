//! Markdown-aware document chunking for retrieval pipelines.
//!
//! Documents are parsed into a flat element AST, a chunking strategy
//! turns the AST into bounded chunks, and the engine validates the
//! result and stamps ids plus shared metadata:
//!
//! ```text
//!              +--------+        +------------+        +----------------+
//!  markdown -> | parser | -AST-> |  strategy  | -----> | validate/stamp | -> chunks
//!              +--------+        +------------+        +----------------+
//!                                  structure, fixed,
//!                                  sentence, paragraph,
//!                                  section, token,
//!                                  semantic_*
//! ```
//!
//! The default strategy is structure-aware: it respects element
//! boundaries, keeps code blocks atomic, and tags every chunk with a
//! breadcrumb of its enclosing headers.
//!
//! ```
//! use context_doc_chunker::{ChunkConfig, ChunkingEngine};
//!
//! # fn main() -> context_doc_chunker::Result<()> {
//! let engine = ChunkingEngine::new(ChunkConfig::default())?;
//! let chunks = engine.chunk_document("# Title\n\nSome document text.")?;
//!
//! assert_eq!(chunks.len(), 1);
//! assert_eq!(chunks[0].id.as_deref(), Some("chunk_0000"));
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod overlap;
pub mod parser;
pub mod semantic;
pub mod strategies;
pub mod types;

pub use config::{ChunkConfig, ChunkMethod};
pub use engine::{ChunkingEngine, ChunkingStats};
pub use error::{ChunkerError, Result};
pub use parser::{parse, DocumentAst, Element, ElementKind};
pub use semantic::{DocumentFrequency, SemanticUnit};
pub use strategies::{ChunkStrategy, NlpBackend};
pub use types::{meta, Chunk, CHUNK_TYPE_CODE};
