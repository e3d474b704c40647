//! End-to-end properties of the chunking engine that must hold for
//! every strategy: determinism, no empty chunks, the size bound with
//! its atomic-code exception, and shared metadata stamping.

use context_doc_chunker::{
    meta, ChunkConfig, ChunkMethod, ChunkerError, ChunkingEngine,
};
use pretty_assertions::assert_eq;

fn engine(method: ChunkMethod, chunk_size: usize, overlap: usize) -> ChunkingEngine {
    ChunkingEngine::new(ChunkConfig {
        chunk_size,
        overlap,
        method,
        ..Default::default()
    })
    .expect("valid config")
}

fn mixed_document() -> String {
    let code: String = (0..25).map(|i| format!("let value_{i} = compute({i});\n")).collect();
    format!(
        "---\ntitle: Mixed fixture\nauthor: tests\n---\n\
         # Overview\n\n\
         This document mixes prose, lists, and code so every strategy has\n\
         something to trip over. The overview paragraph runs long enough to\n\
         cross several chunk boundaries at small sizes.\n\n\
         ## Usage\n\n\
         Call the engine with a configuration and a document. The result is a\n\
         list of chunks with deterministic identifiers.\n\n\
         - first item in the list\n\
         - second item in the list\n\
         - third item in the list\n\n\
         ```rust\n{code}```\n\n\
         ## Notes\n\n\
         Closing remarks follow the code block and mention usage again so the\n\
         semantic strategies find related vocabulary across sections."
    )
}

/// A document whose words never repeat, so any shared text across a
/// chunk boundary is genuinely carried overlap.
fn distinct_word_document() -> String {
    let mut doc = String::new();
    let mut n = 0;
    for s in 0..4 {
        doc.push_str(&format!("# Heading{s:02}\n\n"));
        for _ in 0..3 {
            let words: Vec<String> = (0..8)
                .map(|_| {
                    n += 1;
                    format!("word{n:03}")
                })
                .collect();
            doc.push_str(&format!("{}.\n\n", words.join(" ")));
        }
    }
    doc.trim_end().to_string()
}

/// Longest prefix of `next` (in chars) that the previous chunk ends with
fn shared_boundary_chars(prev: &str, next: &str) -> usize {
    let next_chars: Vec<char> = next.chars().collect();
    (0..=next_chars.len())
        .rev()
        .map(|k| next_chars[..k].iter().collect::<String>())
        .find(|prefix| prev.ends_with(prefix.as_str()))
        .map(|prefix| prefix.chars().count())
        .unwrap_or(0)
}

#[test]
fn every_method_is_deterministic() {
    let doc = mixed_document();
    for method in ChunkMethod::ALL {
        let first = engine(method, 200, 30).chunk_document(&doc).unwrap();
        let second = engine(method, 200, 30).chunk_document(&doc).unwrap();
        assert_eq!(first, second, "nondeterministic output from {method}");
    }
}

#[test]
fn no_method_emits_empty_or_oversized_chunks() {
    let doc = mixed_document();
    for method in ChunkMethod::ALL {
        let chunks = engine(method, 200, 30).chunk_document(&doc).unwrap();
        assert!(!chunks.is_empty(), "{method} produced nothing");
        for chunk in &chunks {
            assert!(
                !chunk.content.trim().is_empty(),
                "{method} produced an empty chunk"
            );
            assert!(
                chunk.char_len() <= 300 || chunk.is_atomic_code(),
                "{method} chunk of {} chars breaks the limit",
                chunk.char_len()
            );
        }
    }
}

#[test]
fn shared_metadata_and_ids_are_stamped() {
    let doc = mixed_document();
    for method in ChunkMethod::ALL {
        let chunks = engine(method, 200, 30).chunk_document(&doc).unwrap();
        let total = chunks.len() as u64;
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.id.as_deref(), Some(format!("chunk_{i:04}").as_str()));
            assert_eq!(chunk.meta_u64(meta::CHUNK_INDEX), Some(i as u64));
            assert_eq!(chunk.meta_u64(meta::TOTAL_CHUNKS), Some(total));
            assert_eq!(chunk.meta_str(meta::CHUNK_METHOD), Some(method.as_str()));
        }
    }
}

#[test]
fn carried_overlap_stays_within_the_configured_budget() {
    let doc = distinct_word_document();
    let overlap = 30;
    // A handful of joiner characters may ride along with carried units;
    // the carried text itself never exceeds the overlap budget.
    let slack = 16;
    for method in ChunkMethod::ALL {
        let chunks = engine(method, 150, overlap).chunk_document(&doc).unwrap();
        for pair in chunks.windows(2) {
            let carried = shared_boundary_chars(&pair[0].content, &pair[1].content);
            assert!(
                carried <= overlap + slack,
                "{method} carried {carried} chars across a boundary"
            );
        }
    }
}

#[test]
fn no_chunk_repeats_its_predecessor_entirely() {
    let doc = mixed_document();
    for method in ChunkMethod::ALL {
        let chunks = engine(method, 200, 30).chunk_document(&doc).unwrap();
        for pair in chunks.windows(2) {
            assert!(
                !pair[0].content.contains(&pair[1].content),
                "{method} re-emitted a chunk already covered by its predecessor"
            );
        }
    }
}

#[test]
fn structure_breadcrumb_tracks_nested_headers() {
    let text = "# Title\n\nPara one.\n\nPara two.\n\n## Sub\n\nPara three.";
    let chunks = engine(ChunkMethod::Structure, 20, 5)
        .chunk_document(text)
        .unwrap();

    let last = chunks.last().unwrap();
    assert_eq!(last.meta_str(meta::STRUCTURAL_CONTEXT), Some("Title > Sub"));
    assert!(last.content.contains("Para three."));
    // The overlap seed alone never forms a chunk of its own.
    for pair in chunks.windows(2) {
        assert!(!pair[0].content.contains(&pair[1].content));
    }
}

#[test]
fn fixed_without_overlap_covers_the_flattened_text() {
    let text = "plain words repeated over and over ".repeat(12);
    let ast = context_doc_chunker::parse(text.trim_end());
    let chunks = ChunkingEngine::new(ChunkConfig {
        chunk_size: 64,
        overlap: 0,
        method: ChunkMethod::Fixed,
        respect_boundaries: false,
        ..Default::default()
    })
    .unwrap()
    .chunk_ast(&ast)
    .unwrap();

    let rebuilt: String = chunks.iter().map(|c| c.content.as_str()).collect();
    assert_eq!(rebuilt, ast.flattened_text());
}

#[test]
fn token_without_overlap_preserves_every_word() {
    let text = "alpha beta gamma delta epsilon zeta eta theta iota kappa";
    let chunks = engine(ChunkMethod::Token, 18, 0)
        .chunk_document(text)
        .unwrap();
    let rebuilt = chunks
        .iter()
        .map(|c| c.content.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    assert_eq!(rebuilt, text);
}

#[test]
fn disjoint_vocabulary_gets_no_semantic_overlap() {
    let text = "# Alpha\n\nalpha beta gamma delta epsilon words.\n\n\
                # Omega\n\ndifferent vocabulary here.";
    let chunks = engine(ChunkMethod::SemanticNaive, 50, 40)
        .chunk_document(text)
        .unwrap();

    assert_eq!(chunks.len(), 2);
    assert!(!chunks[1].content.contains("alpha"));
}

#[test]
fn front_matter_is_metadata_not_content() {
    let text = "---\ntitle: Hidden\n---\n# Visible\n\nBody text here.";
    let chunks = engine(ChunkMethod::Structure, 500, 50)
        .chunk_document(text)
        .unwrap();

    assert_eq!(chunks.len(), 1);
    assert!(!chunks[0].content.contains("Hidden"));
    assert!(chunks[0].content.contains("# Visible"));
}

#[test]
fn whitespace_only_documents_are_rejected() {
    let err = engine(ChunkMethod::Structure, 100, 10)
        .chunk_document(" \n\t \n")
        .unwrap_err();
    assert!(matches!(err, ChunkerError::EmptyContent));
}

#[test]
fn giant_code_block_survives_only_under_structure() {
    let code: String = (0..40).map(|i| format!("let big_{i} = {i};\n")).collect();
    let fenced = format!("```rust\n{code}```");
    let doc = format!("# Code heavy\n\nshort intro.\n\n{fenced}");

    let chunks = engine(ChunkMethod::Structure, 100, 10)
        .chunk_document(&doc)
        .unwrap();
    let code_chunk = chunks.iter().find(|c| c.is_atomic_code()).unwrap();
    assert_eq!(code_chunk.content, fenced);
    assert!(code_chunk.char_len() > 150);
}
