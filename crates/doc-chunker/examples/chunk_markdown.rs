//! Chunk a small markdown document with every strategy and print the
//! resulting boundaries.
//!
//! ```sh
//! cargo run --example chunk_markdown
//! ```

use context_doc_chunker::{meta, ChunkConfig, ChunkMethod, ChunkingEngine};

const DOCUMENT: &str = "\
# Error handling

Rust groups errors into two major categories: recoverable and
unrecoverable errors. For a recoverable error we most likely just want
to report the problem to the user and retry the operation.

## Recoverable errors with Result

Most errors aren't serious enough to require the program to stop
entirely. Sometimes when a function fails it is for a reason that we
can easily interpret and respond to.

```rust
use std::fs::File;

fn main() {
    let greeting_file = File::open(\"hello.txt\");
}
```

## Unrecoverable errors with panic!

Sometimes bad things happen in your code, and there is nothing you can
do about it. In these cases, Rust has the panic! macro.
";

fn main() -> anyhow::Result<()> {
    env_logger::init();

    for method in ChunkMethod::ALL {
        let engine = ChunkingEngine::new(ChunkConfig {
            chunk_size: 300,
            overlap: 40,
            method,
            ..Default::default()
        })?;

        let chunks = engine.chunk_document(DOCUMENT)?;
        println!("== {method}: {}", engine.stats(&chunks));
        for chunk in &chunks {
            let context = chunk
                .meta_str(meta::STRUCTURAL_CONTEXT)
                .unwrap_or_default();
            let preview: String = chunk.content.chars().take(48).collect();
            println!(
                "  {} [{:>4} chars] {context:<40} {preview:?}",
                chunk.id.as_deref().unwrap_or("?"),
                chunk.char_len(),
            );
        }
        println!();
    }

    Ok(())
}
