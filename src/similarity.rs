use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::text::{collapse_whitespace, tokenize, tokens_with_min_len};

/// Scores how related two strings are, from 0.0 (unrelated) to 1.0 (identical
/// under the strategy's normalization).
pub trait SimilarityScorer: Send + Sync {
    fn name(&self) -> &'static str;

    fn score(&self, a: &str, b: &str) -> f32;

    /// Scores `query` against every candidate. Strategies that need a view of
    /// the whole candidate set (TF-IDF) override this.
    fn score_all(&self, query: &str, candidates: &[&str]) -> Vec<f32> {
        candidates
            .iter()
            .map(|candidate| self.score(query, candidate))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    TfIdf,
    Jaccard,
    NGram,
}

impl StrategyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StrategyKind::TfIdf => "tfidf",
            StrategyKind::Jaccard => "jaccard",
            StrategyKind::NGram => "ngram",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "tfidf" | "tf-idf" | "cosine" => Ok(StrategyKind::TfIdf),
            "jaccard" | "token" | "token-set" => Ok(StrategyKind::Jaccard),
            "ngram" | "n-gram" | "char" => Ok(StrategyKind::NGram),
            other => Err(anyhow::anyhow!("unknown similarity strategy: {other}")),
        }
    }
}

pub fn build_scorer(kind: StrategyKind, ngram_size: usize) -> Arc<dyn SimilarityScorer> {
    match kind {
        StrategyKind::TfIdf => Arc::new(TfIdfScorer),
        StrategyKind::Jaccard => Arc::new(JaccardScorer),
        StrategyKind::NGram => Arc::new(NGramScorer::new(ngram_size)),
    }
}

/// Token-set overlap: |A ∩ B| / |A ∪ B| over lower-cased word tokens.
#[derive(Debug, Clone, Copy, Default)]
pub struct JaccardScorer;

impl SimilarityScorer for JaccardScorer {
    fn name(&self) -> &'static str {
        "jaccard"
    }

    fn score(&self, a: &str, b: &str) -> f32 {
        let left: HashSet<String> = tokenize(a).into_iter().collect();
        let right: HashSet<String> = tokenize(b).into_iter().collect();
        jaccard(&left, &right)
    }
}

/// Overlap of contiguous character n-grams.
#[derive(Debug, Clone, Copy)]
pub struct NGramScorer {
    n: usize,
}

impl NGramScorer {
    pub fn new(n: usize) -> Self {
        Self { n: n.max(1) }
    }

    fn grams(&self, input: &str) -> HashSet<String> {
        let chars: Vec<char> = collapse_whitespace(input).chars().collect();
        if chars.is_empty() {
            return HashSet::new();
        }
        if chars.len() < self.n {
            return HashSet::from([chars.iter().collect()]);
        }
        chars
            .windows(self.n)
            .map(|window| window.iter().collect())
            .collect()
    }
}

impl Default for NGramScorer {
    fn default() -> Self {
        Self::new(3)
    }
}

impl SimilarityScorer for NGramScorer {
    fn name(&self) -> &'static str {
        "ngram"
    }

    fn score(&self, a: &str, b: &str) -> f32 {
        jaccard(&self.grams(a), &self.grams(b))
    }
}

/// Cosine similarity in a TF-IDF space fitted over the query and candidates of
/// a single call. Nothing is retained between calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct TfIdfScorer;

impl SimilarityScorer for TfIdfScorer {
    fn name(&self) -> &'static str {
        "tfidf"
    }

    fn score(&self, a: &str, b: &str) -> f32 {
        self.score_all(a, &[b]).first().copied().unwrap_or(0.0)
    }

    fn score_all(&self, query: &str, candidates: &[&str]) -> Vec<f32> {
        if candidates.is_empty() {
            return Vec::new();
        }

        let documents: Vec<Vec<String>> = std::iter::once(query)
            .chain(candidates.iter().copied())
            .map(|doc| tokens_with_min_len(doc, 2))
            .collect();

        let idf = inverse_document_frequency(&documents);
        let mut vectors = documents.iter().map(|tokens| weighted_vector(tokens, &idf));

        let Some(query_vector) = vectors.next() else {
            return vec![0.0; candidates.len()];
        };

        vectors
            .map(|candidate| cosine(&query_vector, &candidate))
            .collect()
    }
}

fn jaccard(left: &HashSet<String>, right: &HashSet<String>) -> f32 {
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }
    let intersection = left.intersection(right).count();
    let union = left.union(right).count();
    intersection as f32 / union as f32
}

/// Smoothed idf: ln((1 + n) / (1 + df)) + 1.
fn inverse_document_frequency(documents: &[Vec<String>]) -> HashMap<&str, f32> {
    let mut document_frequency: HashMap<&str, usize> = HashMap::new();
    for tokens in documents {
        let unique: HashSet<&str> = tokens.iter().map(String::as_str).collect();
        for term in unique {
            *document_frequency.entry(term).or_insert(0) += 1;
        }
    }

    let n = documents.len() as f32;
    document_frequency
        .into_iter()
        .map(|(term, df)| (term, ((1.0 + n) / (1.0 + df as f32)).ln() + 1.0))
        .collect()
}

/// L2-normalised tf-idf weights.
fn weighted_vector<'a>(tokens: &'a [String], idf: &HashMap<&str, f32>) -> HashMap<&'a str, f32> {
    let mut weights: HashMap<&str, f32> = HashMap::new();
    for token in tokens {
        *weights.entry(token.as_str()).or_insert(0.0) += 1.0;
    }
    for (term, weight) in weights.iter_mut() {
        *weight *= idf.get(term).copied().unwrap_or(1.0);
    }

    let norm = weights.values().map(|w| w * w).sum::<f32>().sqrt();
    if norm > 0.0 {
        for weight in weights.values_mut() {
            *weight /= norm;
        }
    }
    weights
}

fn cosine(left: &HashMap<&str, f32>, right: &HashMap<&str, f32>) -> f32 {
    let (small, large) = if left.len() <= right.len() {
        (left, right)
    } else {
        (right, left)
    };
    let dot: f32 = small
        .iter()
        .filter_map(|(term, weight)| large.get(term).map(|other| weight * other))
        .sum();
    dot.clamp(0.0, 1.0)
}
