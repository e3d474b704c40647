//! Semantic unit model for similarity-based chunking.
//!
//! Units are immutable once built, so the word set and word frequencies
//! are plain memoized fields computed in the constructor. The document
//! frequency index is scoped to a single chunking call and is never
//! shared across documents.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use unicode_segmentation::UnicodeSegmentation;

use crate::parser::ElementKind;

/// TF-IDF cosine similarity above this value marks two units as related
pub const RELATEDNESS_THRESHOLD: f64 = 0.3;

/// An internally-used fragment (header-delimited or paragraph-grouped),
/// the atom for similarity-based chunking
#[derive(Debug, Clone)]
pub struct SemanticUnit {
    pub content: String,
    pub kind: ElementKind,
    pub level: Option<u8>,
    /// Title of the enclosing header section, if any
    pub title: Option<String>,
    /// Content length in characters
    pub size: usize,
    word_set: BTreeSet<String>,
    word_freq: BTreeMap<String, usize>,
    word_count: usize,
}

impl SemanticUnit {
    #[must_use]
    pub fn new(
        content: String,
        kind: ElementKind,
        level: Option<u8>,
        title: Option<String>,
    ) -> Self {
        let mut word_freq: BTreeMap<String, usize> = BTreeMap::new();
        for word in content.unicode_words() {
            *word_freq.entry(word.to_lowercase()).or_insert(0) += 1;
        }
        let word_set: BTreeSet<String> = word_freq.keys().cloned().collect();
        let word_count = word_freq.values().sum();
        let size = content.chars().count();

        Self {
            content,
            kind,
            level,
            title,
            size,
            word_set,
            word_freq,
            word_count,
        }
    }

    /// Unique lowercased words of the content
    #[must_use]
    pub fn word_set(&self) -> &BTreeSet<String> {
        &self.word_set
    }

    /// Lowercased word frequencies of the content
    #[must_use]
    pub fn word_freq(&self) -> &BTreeMap<String, usize> {
        &self.word_freq
    }

    /// Total word occurrences in the content
    #[must_use]
    pub const fn word_count(&self) -> usize {
        self.word_count
    }

    /// Code units are atomic and never merge with prose
    #[must_use]
    pub fn is_code(&self) -> bool {
        self.kind == ElementKind::CodeBlock
    }
}

/// Per-document word document-frequency index: for every unit, each
/// unique word counts once. Built in one pass, discarded after the call.
#[derive(Debug, Default)]
pub struct DocumentFrequency {
    df: HashMap<String, usize>,
    total_units: usize,
}

impl DocumentFrequency {
    #[must_use]
    pub fn build(units: &[SemanticUnit]) -> Self {
        let mut df: HashMap<String, usize> = HashMap::new();
        for unit in units {
            for word in unit.word_set() {
                *df.entry(word.clone()).or_insert(0) += 1;
            }
        }
        Self {
            df,
            total_units: units.len(),
        }
    }

    #[must_use]
    pub const fn total_units(&self) -> usize {
        self.total_units
    }

    /// Number of units containing `word`
    #[must_use]
    pub fn frequency(&self, word: &str) -> usize {
        self.df.get(word).copied().unwrap_or(0)
    }

    /// `ln(total_units / (1 + df))`
    #[must_use]
    pub fn idf(&self, word: &str) -> f64 {
        if self.total_units == 0 {
            return 0.0;
        }
        (self.total_units as f64 / (1 + self.frequency(word)) as f64).ln()
    }
}

/// TF-IDF cosine similarity between two units' sparse vectors.
/// Units with disjoint vocabularies score exactly 0.0.
#[must_use]
pub fn tfidf_cosine(a: &SemanticUnit, b: &SemanticUnit, df: &DocumentFrequency) -> f64 {
    if a.word_count() == 0 || b.word_count() == 0 {
        return 0.0;
    }

    let weight = |count: usize, total: usize, word: &str| {
        let tf = count as f64 / total as f64;
        tf * df.idf(word)
    };

    let mut dot = 0.0;
    let mut norm_a = 0.0;
    for (word, &count) in a.word_freq() {
        let wa = weight(count, a.word_count(), word);
        norm_a += wa * wa;
        if let Some(&other) = b.word_freq().get(word) {
            dot += wa * weight(other, b.word_count(), word);
        }
    }
    if dot == 0.0 {
        return 0.0;
    }

    let mut norm_b = 0.0;
    for (word, &count) in b.word_freq() {
        let wb = weight(count, b.word_count(), word);
        norm_b += wb * wb;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        0.0
    } else {
        dot / denom
    }
}

/// Cosine similarity over binary word-set vectors, used by the naive
/// strategy which has no frequency index
#[must_use]
pub fn wordset_cosine(a: &SemanticUnit, b: &SemanticUnit) -> f64 {
    let (small, large) = if a.word_set().len() <= b.word_set().len() {
        (a.word_set(), b.word_set())
    } else {
        (b.word_set(), a.word_set())
    };
    if small.is_empty() {
        return 0.0;
    }
    let intersection = small.iter().filter(|w| large.contains(*w)).count();
    intersection as f64 / ((small.len() as f64).sqrt() * (large.len() as f64).sqrt())
}

/// Structural relatedness: same kind and level short-circuits to related
/// without computing similarity; otherwise TF-IDF similarity above the
/// threshold decides.
#[must_use]
pub fn related(a: &SemanticUnit, b: &SemanticUnit, df: &DocumentFrequency) -> bool {
    if a.kind == b.kind && a.level == b.level {
        return true;
    }
    tfidf_cosine(a, b, df) > RELATEDNESS_THRESHOLD
}

/// Top `k` TF-IDF terms across a group of units, weight-descending with
/// lexicographic tie-breaking. Deterministic by construction.
#[must_use]
pub fn top_terms(units: &[&SemanticUnit], df: &DocumentFrequency, k: usize) -> Vec<String> {
    let mut merged: BTreeMap<&str, usize> = BTreeMap::new();
    let mut total = 0usize;
    for unit in units {
        for (word, &count) in unit.word_freq() {
            *merged.entry(word.as_str()).or_insert(0) += count;
            total += count;
        }
    }
    if total == 0 {
        return Vec::new();
    }

    let mut scored: Vec<(f64, &str)> = merged
        .iter()
        .map(|(word, &count)| ((count as f64 / total as f64) * df.idf(word), *word))
        .filter(|(weight, _)| *weight > 0.0)
        .collect();
    scored.sort_by(|a, b| {
        b.0.partial_cmp(&a.0)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.1.cmp(b.1))
    });
    scored
        .into_iter()
        .take(k)
        .map(|(_, word)| word.to_string())
        .collect()
}
