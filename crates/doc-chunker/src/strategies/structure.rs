//! Structure-aware chunking: accumulate elements in document order,
//! keep code blocks atomic, and tag every chunk with a breadcrumb of its
//! enclosing headers.

use crate::config::ChunkConfig;
use crate::error::Result;
use crate::overlap::overlap_tail;
use crate::parser::{DocumentAst, ElementKind};
use crate::strategies::{assign_effective_offsets, split_oversized, ChunkStrategy};
use crate::types::{meta, Chunk, CHUNK_TYPE_CODE};

/// The default strategy: the only one that guarantees element-level
/// atomicity. Code blocks are never split across chunks; the size limit
/// is soft for them.
pub struct StructureAwareChunker;

impl ChunkStrategy for StructureAwareChunker {
    fn name(&self) -> &'static str {
        "structure"
    }

    fn chunk(&self, ast: &DocumentAst, config: &ChunkConfig) -> Result<Vec<Chunk>> {
        let mut acc = Accumulator::default();
        let mut context: Vec<String> = Vec::new();

        for element in &ast.elements {
            match element.kind {
                ElementKind::Header => {
                    let level = usize::from(element.level.unwrap_or(1));
                    // Breadcrumb stack: drop deeper/equal levels, then set
                    // this header at its own depth.
                    context.truncate(level - 1);
                    context.push(element.text.clone());
                    acc.append(
                        config,
                        ElementKind::Header,
                        element.markdown(),
                        context.join(" > "),
                        true,
                    );
                }
                ElementKind::CodeBlock => {
                    let rendered = element.markdown();
                    if element.char_len() > config.chunk_size {
                        // Atomic element larger than the budget: it gets a
                        // chunk of its own, exempt from the hard limit.
                        acc.emit_standalone_code(rendered, context.join(" > "));
                    } else {
                        acc.append(
                            config,
                            ElementKind::CodeBlock,
                            rendered,
                            context.join(" > "),
                            false,
                        );
                    }
                }
                ElementKind::Paragraph | ElementKind::List => {
                    let breadcrumb = context.join(" > ");
                    if element.char_len() > config.chunk_size {
                        for piece in split_oversized(&element.markdown(), config.chunk_size) {
                            acc.append(config, element.kind, piece, breadcrumb.clone(), true);
                        }
                    } else {
                        acc.append(
                            config,
                            element.kind,
                            element.markdown(),
                            breadcrumb,
                            true,
                        );
                    }
                }
            }
        }

        let mut chunks = acc.finish();
        assign_effective_offsets(&mut chunks);
        Ok(chunks)
    }
}

struct Part {
    kind: ElementKind,
    text: String,
    len: usize,
    /// Breadcrumb at the time the part was appended
    context: String,
    /// Overlap seed carried from the previous chunk
    is_seed: bool,
}

#[derive(Default)]
struct Accumulator {
    parts: Vec<Part>,
    chunks: Vec<Chunk>,
}

impl Accumulator {
    fn joined_len(&self) -> usize {
        let text: usize = self.parts.iter().map(|p| p.len).sum();
        text + self.parts.len().saturating_sub(1) * 2
    }

    /// Append an element, flushing first when it would not fit. A header
    /// stranded at the tail of the flushed chunk is carried over so it
    /// stays with the content it introduces.
    fn append(
        &mut self,
        config: &ChunkConfig,
        kind: ElementKind,
        text: String,
        context: String,
        seed_overlap: bool,
    ) {
        let len = text.chars().count();

        if !self.parts.is_empty() && self.joined_len() + 2 + len > config.chunk_size {
            let carried = match self.parts.last() {
                Some(last)
                    if last.kind == ElementKind::Header
                        && self.parts.len() > 1
                        && last.len + 2 + len <= config.chunk_size =>
                {
                    self.parts.pop()
                }
                _ => None,
            };

            // A seed-only accumulator (possible after a header carry)
            // holds nothing but the previous chunk's tail; emitting it
            // would duplicate that tail as a chunk of its own.
            if self.parts.iter().all(|p| p.is_seed) {
                self.parts.clear();
            } else {
                self.flush(seed_overlap.then_some(config.overlap));
            }
            if let Some(header) = carried {
                self.parts.push(header);
            }
        }

        self.parts.push(Part {
            kind,
            text,
            len,
            context,
            is_seed: false,
        });

        // The overlap seed must never push the new chunk past its budget.
        while self.joined_len() > config.chunk_size
            && self.parts.len() > 1
            && self.parts[0].is_seed
        {
            self.parts.remove(0);
        }
    }

    /// Flush the accumulated parts into a chunk; with `Some(overlap)`,
    /// seed the next accumulation with overlap content from the flushed
    /// tail. A code-block tail never seeds: a partial fence carried into
    /// the next chunk would break atomicity.
    fn flush(&mut self, seed_overlap: Option<usize>) {
        if self.parts.is_empty() {
            return;
        }

        let context = self
            .parts
            .last()
            .map(|p| p.context.clone())
            .unwrap_or_default();
        let single_code =
            self.parts.len() == 1 && self.parts[0].kind == ElementKind::CodeBlock;
        let tail_is_code = self
            .parts
            .last()
            .is_some_and(|p| p.kind == ElementKind::CodeBlock);

        let content = self
            .parts
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        self.parts.clear();

        let seed = match seed_overlap {
            Some(overlap) if !tail_is_code => {
                overlap_tail(&content, overlap).trim().to_string()
            }
            _ => String::new(),
        };

        let mut chunk = Chunk::new(content, 0, 0);
        chunk.insert_meta(meta::STRUCTURAL_CONTEXT, context.clone());
        if single_code {
            chunk.insert_meta(meta::CHUNK_TYPE, CHUNK_TYPE_CODE);
        }
        self.chunks.push(chunk);

        if !seed.is_empty() {
            let len = seed.chars().count();
            self.parts.push(Part {
                kind: ElementKind::Paragraph,
                text: seed,
                len,
                context,
                is_seed: true,
            });
        }
    }

    /// Emit an oversized code block as its own chunk, flushing whatever
    /// was accumulated first (no overlap seeding into atomic code)
    fn emit_standalone_code(&mut self, rendered: String, context: String) {
        if !self.parts.is_empty() {
            // Drop a stale seed-only accumulator rather than emitting it
            // as a chunk of duplicated text.
            if self.parts.iter().all(|p| p.is_seed) {
                self.parts.clear();
            } else {
                self.flush(None);
            }
        }
        let mut chunk = Chunk::new(rendered, 0, 0);
        chunk.insert_meta(meta::STRUCTURAL_CONTEXT, context);
        chunk.insert_meta(meta::CHUNK_TYPE, CHUNK_TYPE_CODE);
        self.chunks.push(chunk);
    }

    fn finish(mut self) -> Vec<Chunk> {
        if !self.parts.is_empty() {
            // A trailing seed-only accumulator would duplicate content
            // already emitted.
            if self.parts.iter().all(|p| p.is_seed) {
                self.parts.clear();
            } else {
                self.flush(None);
            }
        }
        self.chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser;

    fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<Chunk> {
        let config = ChunkConfig {
            chunk_size,
            overlap,
            ..Default::default()
        };
        let ast = parser::parse(text);
        StructureAwareChunker.chunk(&ast, &config).unwrap()
    }

    #[test]
    fn breadcrumb_follows_header_nesting() {
        let text = "# Title\n\nPara one.\n\nPara two.\n\n## Sub\n\nPara three.";
        let chunks = chunk_text(text, 20, 5);

        assert!(!chunks.is_empty());
        for chunk in &chunks {
            assert!(!chunk.content.trim().is_empty());
            assert!(chunk.char_len() <= 30, "chunk too large: {:?}", chunk.content);
        }
        let last = chunks.last().unwrap();
        assert_eq!(last.meta_str(meta::STRUCTURAL_CONTEXT), Some("Title > Sub"));
        // The subsection header stays with its paragraph.
        assert!(last.content.contains("## Sub"));
        assert!(last.content.contains("Para three."));
    }

    #[test]
    fn overlap_seed_never_becomes_its_own_chunk() {
        let text = "# Title\n\nPara one.\n\nPara two.\n\n## Sub\n\nPara three.";
        let chunks = chunk_text(text, 20, 5);

        let contents: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(
            contents,
            vec!["# Title\n\nPara one.", "one.\n\nPara two.", "## Sub\n\nPara three."]
        );
        // No chunk is wholly contained in its predecessor.
        for pair in chunks.windows(2) {
            assert!(
                !pair[0].content.contains(&pair[1].content),
                "duplicated chunk {:?}",
                pair[1].content
            );
        }
    }

    #[test]
    fn code_fences_never_split() {
        let code = "```rust\nfn one() {}\nfn two() {}\n```";
        let text = format!("# Top\n\nIntro paragraph with some words.\n\n{code}\n\nAfter the code block.");
        let chunks = chunk_text(&text, 40, 8);

        for chunk in &chunks {
            let fences = chunk.content.matches("```").count();
            assert_eq!(fences % 2, 0, "split fence in {:?}", chunk.content);
        }
        assert!(chunks.iter().any(|c| c.content.contains(code)));
    }

    #[test]
    fn oversized_code_block_gets_own_tagged_chunk() {
        let body: String = (0..20).map(|i| format!("let x{i} = {i};\n")).collect();
        let code = format!("```rust\n{body}```");
        let text = format!("# Top\n\nshort intro\n\n{code}");
        let chunks = chunk_text(&text, 50, 10);

        let code_chunk = chunks
            .iter()
            .find(|c| c.is_atomic_code())
            .expect("code chunk present");
        assert_eq!(code_chunk.content, code);
        assert!(code_chunk.char_len() > 50);
        // Prose chunks stay within the soft budget.
        for chunk in chunks.iter().filter(|c| !c.is_atomic_code()) {
            assert!(chunk.char_len() <= 75);
        }
    }

    #[test]
    fn context_stack_truncates_on_level_changes() {
        let text = "# A\n\none one one.\n\n## B\n\ntwo two two.\n\n### C\n\nthree three three.\n\n## D\n\nfour four four.";
        let chunks = chunk_text(text, 30, 0);

        let contexts: Vec<&str> = chunks
            .iter()
            .filter_map(|c| c.meta_str(meta::STRUCTURAL_CONTEXT))
            .collect();
        assert!(contexts.contains(&"A"));
        assert!(contexts.contains(&"A > B"));
        assert!(contexts.contains(&"A > B > C"));
        // The second h2 replaces both B and C in the stack.
        assert_eq!(contexts.last(), Some(&"A > D"));
    }

    #[test]
    fn overlap_seeds_next_chunk() {
        let text = "First sentence here. Second sentence follows.\n\nAnother paragraph of text.";
        let chunks = chunk_text(text, 50, 20);
        assert!(chunks.len() >= 2);
        // The second chunk starts with tail content of the first.
        let first = &chunks[0].content;
        let second = &chunks[1].content;
        let seed = second.split("\n\n").next().unwrap();
        assert!(first.ends_with(seed), "no overlap between {first:?} and {second:?}");
    }

    #[test]
    fn deterministic_output() {
        let text = "# T\n\nalpha beta gamma delta.\n\n- one\n- two\n\n```\ncode\n```\n\nfinal words here.";
        let a = chunk_text(text, 25, 6);
        let b = chunk_text(text, 25, 6);
        assert_eq!(a, b);
    }

    #[test]
    fn offsets_are_cumulative_over_emitted_content() {
        let text = "# T\n\nsome words here to split across chunks for offsets.";
        let chunks = chunk_text(text, 20, 4);
        let mut cursor = 0;
        for chunk in &chunks {
            assert_eq!(chunk.start, cursor);
            assert_eq!(chunk.end, cursor + chunk.char_len());
            cursor = chunk.end;
        }
    }
}
