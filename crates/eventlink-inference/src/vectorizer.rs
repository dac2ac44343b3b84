//! TF-IDF feature extraction shared by the intent classifier and the recommender
//!
//! Text is lowercased, every character that is not a letter or digit becomes
//! whitespace, and the remaining words are expanded into character n-grams
//! according to the [`AnalyzerConfig`]. Only n-grams present in the
//! [`Vocabulary`] are counted. The counts are weighted by idf and the result
//! is L2-normalized.

use eventlink_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// How words are expanded into features
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalyzerMode {
    /// Character n-grams inside the word boundary
    Word,
    /// Character n-grams of the word padded with one space on each side
    CharWb,
    /// Each word is a single feature
    Token,
}

impl AnalyzerMode {
    /// Parse an analyzer name from an artifact. Unknown names fall back to `char_wb`.
    pub fn from_name(name: &str) -> Self {
        if name.eq_ignore_ascii_case("word") {
            Self::Word
        } else if name.eq_ignore_ascii_case("token") {
            Self::Token
        } else {
            Self::CharWb
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Word => "word",
            Self::CharWb => "char_wb",
            Self::Token => "token",
        }
    }
}

/// Analyzer mode and n-gram length range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    pub mode: AnalyzerMode,
    pub ngram_min: usize,
    pub ngram_max: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            mode: AnalyzerMode::CharWb,
            ngram_min: 3,
            ngram_max: 5,
        }
    }
}

impl AnalyzerConfig {
    /// Create a validated analyzer configuration
    pub fn new(mode: AnalyzerMode, ngram_min: usize, ngram_max: usize) -> Result<Self> {
        if ngram_min == 0 || ngram_min > ngram_max {
            return Err(Error::shape(format!(
                "invalid ngram range ({}, {})",
                ngram_min, ngram_max
            )));
        }
        Ok(Self {
            mode,
            ngram_min,
            ngram_max,
        })
    }

    /// Call `emit` once for every feature string the analyzer derives from `text`
    pub fn analyze(&self, text: &str, mut emit: impl FnMut(&str)) {
        for word in tokenize_words(text) {
            match self.mode {
                AnalyzerMode::Token => emit(&word),
                AnalyzerMode::Word => {
                    char_ngrams(&word, self.ngram_min, self.ngram_max, &mut emit)
                }
                AnalyzerMode::CharWb => {
                    let padded = format!(" {} ", word);
                    char_ngrams(&padded, self.ngram_min, self.ngram_max, &mut emit)
                }
            }
        }
    }
}

/// Lowercase, replace non-alphanumerics with whitespace and split into words
pub fn tokenize_words(text: &str) -> Vec<String> {
    let cleaned: String = text
        .chars()
        .flat_map(char::to_lowercase)
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();

    cleaned.split_whitespace().map(str::to_string).collect()
}

/// Emit every contiguous substring of `n` chars for `n` in `[min_n, max_n]`
///
/// Lengths longer than `s` are skipped.
fn char_ngrams(s: &str, min_n: usize, max_n: usize, emit: &mut impl FnMut(&str)) {
    // Byte offset of every char boundary, including the end of the string.
    let bounds: Vec<usize> = s
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(s.len()))
        .collect();
    let len = bounds.len() - 1;

    for n in min_n..=max_n {
        if n > len {
            continue;
        }
        for start in 0..=(len - n) {
            emit(&s[bounds[start]..bounds[start + n]]);
        }
    }
}

/// One past the largest index in `index`, or 0 when it is empty
pub fn feature_count(index: &HashMap<String, usize>) -> Result<usize> {
    match index.values().max() {
        None => Ok(0),
        Some(&max) => max
            .checked_add(1)
            .ok_or_else(|| Error::shape(format!("vocabulary index {} overflows", max))),
    }
}

/// Mapping from feature string to feature index in `[0, n_features)`
#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    index: HashMap<String, usize>,
    n_features: usize,
}

impl Vocabulary {
    /// Build a dense vocabulary whose feature count is one past the largest index
    ///
    /// Indices must fit within the number of entries, so a stray huge index
    /// is rejected instead of sizing the feature space.
    pub fn from_map(index: HashMap<String, usize>) -> Result<Self> {
        let n_features = feature_count(&index)?;
        if n_features > index.len() {
            return Err(Error::shape(format!(
                "vocabulary index {} out of range for {} entries",
                n_features - 1,
                index.len()
            )));
        }
        Ok(Self { index, n_features })
    }

    /// Build a vocabulary with an explicit feature count
    pub fn with_features(index: HashMap<String, usize>, n_features: usize) -> Result<Self> {
        if let Some((token, idx)) = index.iter().find(|(_, idx)| **idx >= n_features) {
            return Err(Error::shape(format!(
                "vocabulary entry '{}' has index {} outside [0, {})",
                token, idx, n_features
            )));
        }
        Ok(Self { index, n_features })
    }

    pub fn get(&self, token: &str) -> Option<usize> {
        self.index.get(token).copied()
    }

    /// Number of feature dimensions
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Number of distinct tokens
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

/// Sparse feature vector, entries sorted by feature index
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseVector {
    entries: Vec<(usize, f64)>,
}

impl SparseVector {
    /// Build from `(index, weight)` pairs; duplicate indices are summed
    pub fn from_pairs(pairs: impl IntoIterator<Item = (usize, f64)>) -> Self {
        let mut merged: BTreeMap<usize, f64> = BTreeMap::new();
        for (idx, w) in pairs {
            *merged.entry(idx).or_insert(0.0) += w;
        }
        Self {
            entries: merged.into_iter().collect(),
        }
    }

    pub fn entries(&self) -> &[(usize, f64)] {
        &self.entries
    }

    /// Weight at `idx`, zero when absent
    pub fn get(&self, idx: usize) -> f64 {
        self.entries
            .binary_search_by_key(&idx, |&(i, _)| i)
            .map_or(0.0, |pos| self.entries[pos].1)
    }

    /// Number of stored entries
    pub fn nnz(&self) -> usize {
        self.entries.len()
    }

    /// True when every weight is zero
    pub fn is_zero(&self) -> bool {
        self.entries.iter().all(|&(_, w)| w == 0.0)
    }

    pub fn norm(&self) -> f64 {
        self.entries.iter().map(|&(_, w)| w * w).sum::<f64>().sqrt()
    }

    /// Divide every weight by the Euclidean norm. A zero vector is left unchanged.
    pub fn l2_normalize(&mut self) {
        let norm = self.norm();
        if norm > 0.0 {
            for (_, w) in &mut self.entries {
                *w /= norm;
            }
        }
    }

    /// Dot product over shared indices
    pub fn dot(&self, other: &SparseVector) -> f64 {
        let (mut i, mut j) = (0, 0);
        let mut sum = 0.0;
        while i < self.entries.len() && j < other.entries.len() {
            let (a_idx, a_w) = self.entries[i];
            let (b_idx, b_w) = other.entries[j];
            match a_idx.cmp(&b_idx) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    sum += a_w * b_w;
                    i += 1;
                    j += 1;
                }
            }
        }
        sum
    }

    /// Dot product with a dense row, ignoring indices past the row's end
    pub fn dot_dense(&self, row: &[f64]) -> f64 {
        self.entries
            .iter()
            .filter(|&&(idx, _)| idx < row.len())
            .map(|&(idx, w)| row[idx] * w)
            .sum()
    }

    /// Expand into a dense vector of length `n`, dropping indices `>= n`
    pub fn to_dense(&self, n: usize) -> Vec<f64> {
        let mut out = vec![0.0; n];
        for &(idx, w) in &self.entries {
            if idx < n {
                out[idx] = w;
            }
        }
        out
    }
}

/// TF-IDF vectorizer bound to one vocabulary and idf table
#[derive(Debug, Clone)]
pub struct Vectorizer {
    vocabulary: Vocabulary,
    idf: Vec<f64>,
    analyzer: AnalyzerConfig,
}

impl Vectorizer {
    /// Create a vectorizer. `idf` defaults to 1.0 for every feature when `None`.
    pub fn new(vocabulary: Vocabulary, idf: Option<Vec<f64>>, analyzer: AnalyzerConfig) -> Result<Self> {
        let n_features = vocabulary.n_features();
        let idf = match idf {
            Some(idf) if idf.len() != n_features => {
                return Err(Error::shape(format!(
                    "idf length {} != nFeatures {}",
                    idf.len(),
                    n_features
                )));
            }
            Some(idf) => idf,
            None => vec![1.0; n_features],
        };

        Ok(Self {
            vocabulary,
            idf,
            analyzer,
        })
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn idf(&self) -> &[f64] {
        &self.idf
    }

    pub fn analyzer(&self) -> &AnalyzerConfig {
        &self.analyzer
    }

    pub fn n_features(&self) -> usize {
        self.vocabulary.n_features()
    }

    /// Convert text into an L2-normalized TF-IDF vector
    pub fn vectorize(&self, text: &str) -> SparseVector {
        let mut counts: BTreeMap<usize, f64> = BTreeMap::new();
        self.analyzer.analyze(text, |gram| {
            if let Some(idx) = self.vocabulary.get(gram) {
                *counts.entry(idx).or_insert(0.0) += 1.0;
            }
        });

        let mut vector = SparseVector {
            entries: counts
                .into_iter()
                .map(|(idx, tf)| (idx, tf * self.idf[idx]))
                .collect(),
        };
        vector.l2_normalize();
        vector
    }
}
