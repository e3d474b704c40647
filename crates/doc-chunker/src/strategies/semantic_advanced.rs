//! Boundary-optimizing similarity chunking. Instead of a greedy fill,
//! a dynamic program picks the chunk boundaries that minimize a cost
//! built from size deviation, header-level mixing, and lost coherence
//! between adjacent units. An optional NLP backend upgrades the
//! similarity signal from TF-IDF to dense embeddings.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::ChunkConfig;
use crate::error::Result;
use crate::parser::DocumentAst;
use crate::semantic::{tfidf_cosine, top_terms, DocumentFrequency, SemanticUnit};
use crate::strategies::{assign_effective_offsets, partition_units, ChunkStrategy};
use crate::types::{meta, Chunk, CHUNK_TYPE_CODE};

/// How far back the dynamic program searches for a boundary
const DP_LOOKBACK: usize = 20;

/// Coherence credit for keeping a continuity-marked unit attached to its
/// predecessor
const CONTINUITY_BONUS: f64 = 0.5;

const TOPIC_COUNT: usize = 5;

/// Discourse markers that tie a unit to the one before it
static CONTINUITY_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^\s*(?:however|therefore|moreover|furthermore|consequently|additionally|in addition|for example|for instance|as a result|on the other hand|this|these|that|those)\b",
    )
    .expect("continuity marker regex")
});

/// Leading pronouns whose antecedent is in the previous unit. Only
/// trusted when an NLP backend confirms the document carries referents.
static PRONOUN_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(?:it|its|they|their|them|he|him|his|she|her|hers)\b")
        .expect("pronoun marker regex")
});

/// External NLP capability the advanced strategy can lean on. Both
/// methods are best-effort; a backend that cannot embed a given span
/// returns `None` and the strategy falls back to TF-IDF for that pair.
pub trait NlpBackend: Send + Sync {
    /// Dense embedding for a text span, if the backend can produce one
    fn embed(&self, text: &str) -> Option<Vec<f32>>;

    /// Named entities mentioned in the text
    fn entities(&self, _text: &str) -> Vec<String> {
        Vec::new()
    }
}

pub struct SemanticAdvancedChunker {
    nlp: Option<Arc<dyn NlpBackend>>,
}

impl SemanticAdvancedChunker {
    #[must_use]
    pub fn new(nlp: Option<Arc<dyn NlpBackend>>) -> Self {
        Self { nlp }
    }
}

impl ChunkStrategy for SemanticAdvancedChunker {
    fn name(&self) -> &'static str {
        "semantic_advanced"
    }

    fn chunk(&self, ast: &DocumentAst, config: &ChunkConfig) -> Result<Vec<Chunk>> {
        let units = partition_units(ast, config.chunk_size, true);
        if units.is_empty() {
            return Ok(Vec::new());
        }
        let df = DocumentFrequency::build(&units);

        // Pronoun-led units link to their nearest antecedent, which after
        // partitioning is the previous unit; the link only counts when a
        // backend is present to ground the reference.
        let continuity: Vec<bool> = units
            .iter()
            .enumerate()
            .map(|(i, u)| {
                starts_with_marker(u, &CONTINUITY_MARKER)
                    || (self.nlp.is_some() && i > 0 && starts_with_marker(u, &PRONOUN_MARKER))
            })
            .collect();
        let adjacency = adjacency_scores(&units, &df, self.nlp.as_deref());
        let boundaries = optimal_boundaries(&units, &continuity, &adjacency, config);

        let mut chunks = Vec::with_capacity(boundaries.len());
        for window in boundaries.windows(2) {
            let (from, to) = (window[0], window[1]);
            let group: Vec<&SemanticUnit> = units[from..to].iter().collect();
            let content = group
                .iter()
                .map(|u| u.content.as_str())
                .collect::<Vec<_>>()
                .join("\n\n");

            let mut chunk = Chunk::new(content, 0, 0);
            chunk.insert_meta(meta::ALGORITHM, "semantic_advanced");
            chunk.insert_meta(meta::NLP_ENABLED, self.nlp.is_some());
            let topics = top_terms(&group, &df, TOPIC_COUNT);
            if !topics.is_empty() {
                chunk.insert_meta(meta::TOPICS, serde_json::Value::from(topics));
            }
            if group.len() == 1 && group[0].is_code() {
                chunk.insert_meta(meta::CHUNK_TYPE, CHUNK_TYPE_CODE);
            }
            if let Some(nlp) = &self.nlp {
                let entities = nlp.entities(&chunk.content);
                if !entities.is_empty() {
                    chunk.insert_meta(meta::ENTITIES, serde_json::Value::from(entities));
                }
            }
            chunks.push(chunk);
        }

        assign_effective_offsets(&mut chunks);
        Ok(chunks)
    }
}

/// Marker test, ignoring any leading header lines so a section unit is
/// judged by its first prose line
fn starts_with_marker(unit: &SemanticUnit, marker: &Regex) -> bool {
    if unit.is_code() {
        return false;
    }
    let prose = unit
        .content
        .lines()
        .find(|line| !line.trim_start().starts_with('#') && !line.trim().is_empty())
        .unwrap_or("");
    marker.is_match(prose)
}

/// Similarity between each adjacent unit pair: embedding cosine when the
/// backend produces vectors for both sides, TF-IDF otherwise
fn adjacency_scores(
    units: &[SemanticUnit],
    df: &DocumentFrequency,
    nlp: Option<&dyn NlpBackend>,
) -> Vec<f64> {
    let embeddings: Vec<Option<Vec<f32>>> = match nlp {
        Some(backend) => units.iter().map(|u| backend.embed(&u.content)).collect(),
        None => vec![None; units.len()],
    };

    units
        .windows(2)
        .enumerate()
        .map(|(i, pair)| match (&embeddings[i], &embeddings[i + 1]) {
            (Some(a), Some(b)) => embedding_cosine(a, b),
            _ => tfidf_cosine(&pair[0], &pair[1], df),
        })
        .collect()
}

fn embedding_cosine(a: &[f32], b: &[f32]) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| f64::from(*x) * f64::from(*y)).sum();
    let norm_a: f64 = a.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Minimum-cost chunk boundaries over the unit sequence, as a sorted
/// list of cut positions including 0 and `units.len()`.
///
/// A span may not exceed 1.2x the target size unless it is a single
/// unit, and a boundary is not placed before a continuity-marked unit
/// when any alternative exists.
fn optimal_boundaries(
    units: &[SemanticUnit],
    continuity: &[bool],
    adjacency: &[f64],
    config: &ChunkConfig,
) -> Vec<usize> {
    let n = units.len();
    let target = config.chunk_size as f64;
    let cap = config.chunk_size + config.chunk_size / 5;

    // Prefix sums for O(1) span size and coherence lookups.
    let mut size_prefix = vec![0usize; n + 1];
    for (i, unit) in units.iter().enumerate() {
        size_prefix[i + 1] = size_prefix[i] + unit.size;
    }
    let mut coherence_prefix = vec![0.0f64; n];
    for i in 1..n {
        let link = adjacency[i - 1] + if continuity[i] { CONTINUITY_BONUS } else { 0.0 };
        coherence_prefix[i] = coherence_prefix[i - 1] + link;
    }

    let span_size = |j: usize, i: usize| size_prefix[i] - size_prefix[j] + 2 * (i - j - 1);
    let span_cost = |j: usize, i: usize| {
        let size = span_size(j, i) as f64;
        let levels: std::collections::BTreeSet<Option<u8>> =
            units[j..i].iter().map(|u| u.level).collect();
        let coherence = coherence_prefix[i - 1] - coherence_prefix[j];
        (size - target).abs() / target + (levels.len() - 1) as f64 - coherence
    };

    let mut dp = vec![f64::INFINITY; n + 1];
    let mut parent = vec![0usize; n + 1];
    dp[0] = 0.0;

    for i in 1..=n {
        let lo = i.saturating_sub(DP_LOOKBACK);
        let relax = |skip_continuity: bool, dp_i: &mut f64, parent_i: &mut usize| {
            for j in lo..i {
                if dp[j].is_infinite() {
                    continue;
                }
                if skip_continuity && j > 0 && continuity[j] {
                    continue;
                }
                if i - j > 1 && span_size(j, i) > cap {
                    continue;
                }
                let cost = dp[j] + span_cost(j, i);
                if cost < *dp_i {
                    *dp_i = cost;
                    *parent_i = j;
                }
            }
        };

        let (mut best, mut from) = (f64::INFINITY, 0usize);
        relax(true, &mut best, &mut from);
        if best.is_infinite() {
            // Every candidate start was continuity-marked; the marker
            // preference yields rather than leaving the prefix unchunkable.
            relax(false, &mut best, &mut from);
        }
        dp[i] = best;
        parent[i] = from;
    }

    let mut cuts = vec![n];
    let mut at = n;
    while at > 0 {
        at = parent[at];
        cuts.push(at);
    }
    cuts.reverse();
    cuts
}
