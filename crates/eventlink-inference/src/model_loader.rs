//! Loading of intent and recommender model artifacts

use crate::linear::LinearClassifier;
use crate::schema::{IntentArtifact, RecommenderArtifact, VocabShape};
use crate::vectorizer::{AnalyzerConfig, AnalyzerMode, SparseVector, Vectorizer, Vocabulary};
use eventlink_core::{Error, ItemMetadata, Result};
use serde_json::Value;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Where a model artifact comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactSource {
    /// JSON file on the local file system
    LocalPath(PathBuf),

    /// JSON text already in memory (bundled assets, tests)
    Inline(String),
}

impl ArtifactSource {
    /// Read and parse the artifact
    pub fn read_json(&self) -> Result<Value> {
        match self {
            Self::LocalPath(path) => {
                let bytes = std::fs::read(path).map_err(|e| Error::read(path, e))?;
                Ok(serde_json::from_slice(&bytes)?)
            }
            Self::Inline(text) => Ok(serde_json::from_str(text)?),
        }
    }

    /// Short description for log lines
    pub fn describe(&self) -> String {
        match self {
            Self::LocalPath(path) => path.display().to_string(),
            Self::Inline(text) => format!("<inline {} bytes>", text.len()),
        }
    }
}

impl From<PathBuf> for ArtifactSource {
    fn from(path: PathBuf) -> Self {
        Self::LocalPath(path)
    }
}

impl From<&Path> for ArtifactSource {
    fn from(path: &Path) -> Self {
        Self::LocalPath(path.to_path_buf())
    }
}

fn read_to_value(mut reader: impl Read) -> Result<Value> {
    let mut buf = Vec::new();
    reader
        .read_to_end(&mut buf)
        .map_err(|e| Error::read("<reader>", e))?;
    Ok(serde_json::from_slice(&buf)?)
}

fn ngram_bound(value: Option<i64>, default: usize, key: &str) -> Result<usize> {
    match value {
        None => Ok(default),
        Some(n) => usize::try_from(n)
            .map_err(|_| Error::shape(format!("'{}' must be non-negative, got {}", key, n))),
    }
}

/// Allowed deviation from a unit norm before an item vector is reported
const NORM_TOLERANCE: f64 = 1e-3;

/// TF-IDF vectorizer plus linear classifier, loaded from one artifact
#[derive(Debug, Clone)]
pub struct IntentModel {
    vectorizer: Vectorizer,
    classifier: LinearClassifier,
    vocab_shape: VocabShape,
}

impl IntentModel {
    /// Build from a parsed artifact of any supported layout
    pub fn from_value(root: &Value) -> Result<Self> {
        let artifact = IntentArtifact::from_value(root)?;
        let vocab = artifact.vocabulary;
        info!(
            "Vocab loaded: size={} (shape={}, source={})",
            vocab.n_features, vocab.shape, vocab.source
        );

        let mode = AnalyzerMode::from_name(artifact.analyzer.as_deref().unwrap_or("char_wb"));
        let analyzer = AnalyzerConfig::new(
            mode,
            ngram_bound(artifact.ngram_min, 3, "ngram_min")?,
            ngram_bound(artifact.ngram_max, 5, "ngram_max")?,
        )?;

        // Coefficient rows bound the feature count before anything is sized by it.
        let n_features = vocab.n_features;
        let classifier =
            LinearClassifier::new(artifact.classes, artifact.coef, artifact.intercept, n_features)?;
        let vectorizer = Vectorizer::new(
            Vocabulary::with_features(vocab.index, n_features)?,
            artifact.idf,
            analyzer,
        )?;

        info!(
            "Loaded model: classes={}, features={}, analyzer={}, ngram=({},{})",
            classifier.n_classes(),
            n_features,
            analyzer.mode.as_str(),
            analyzer.ngram_min,
            analyzer.ngram_max
        );

        Ok(Self {
            vectorizer,
            classifier,
            vocab_shape: vocab.shape,
        })
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Self::from_value(&serde_json::from_str(json)?)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        Self::from_value(&serde_json::from_slice(bytes)?)
    }

    pub fn from_reader(reader: impl Read) -> Result<Self> {
        Self::from_value(&read_to_value(reader)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::load(&ArtifactSource::LocalPath(path.as_ref().to_path_buf()))
    }

    /// Load from any artifact source
    pub fn load(source: &ArtifactSource) -> Result<Self> {
        debug!("Loading intent model from {}", source.describe());
        Self::from_value(&source.read_json()?)
    }

    pub fn vectorizer(&self) -> &Vectorizer {
        &self.vectorizer
    }

    pub fn classifier(&self) -> &LinearClassifier {
        &self.classifier
    }

    pub fn classes(&self) -> &[String] {
        self.classifier.classes()
    }

    pub fn n_features(&self) -> usize {
        self.vectorizer.n_features()
    }

    /// Layout the vocabulary was stored in
    pub fn vocab_shape(&self) -> VocabShape {
        self.vocab_shape
    }
}

/// One recommendable item with its precomputed TF-IDF vector
#[derive(Debug, Clone)]
pub struct RecommenderItem {
    pub metadata: ItemMetadata,
    pub vector: SparseVector,
}

/// Vectorizer and item vectors for the event recommender
#[derive(Debug, Clone)]
pub struct RecommenderModel {
    vectorizer: Vectorizer,
    items: Vec<RecommenderItem>,
}

impl RecommenderModel {
    /// Build from a parsed recommender artifact
    ///
    /// Items are kept in ascending id order. Item tokens missing from the
    /// vocabulary are dropped; the remaining weights are used as supplied.
    pub fn from_value(root: Value) -> Result<Self> {
        let artifact = RecommenderArtifact::from_value(root)?;
        let spec = artifact.vectorizer;

        let vocabulary = Vocabulary::from_map(spec.vocab)?;
        let mut idf = vec![1.0; vocabulary.n_features()];
        for (token, &weight) in &spec.idf {
            if let Some(idx) = vocabulary.get(token) {
                idf[idx] = weight;
            }
        }

        let analyzer = AnalyzerConfig::new(
            AnalyzerMode::from_name(spec.analyzer.as_deref().unwrap_or("char_wb")),
            spec.ngram_min.unwrap_or(3),
            spec.ngram_max.unwrap_or(5),
        )?;
        let vectorizer = Vectorizer::new(vocabulary, Some(idf), analyzer)?;

        let mut events = artifact.events;
        let mut items = Vec::with_capacity(artifact.event_vectors.len());
        for (id, weights) in artifact.event_vectors {
            let Some(entry) = events.remove(&id) else {
                warn!("Item '{}' has a vector but no metadata, skipping", id);
                continue;
            };

            let total = weights.len();
            let vector = SparseVector::from_pairs(
                weights
                    .iter()
                    .filter_map(|(token, &w)| vectorizer.vocabulary().get(token).map(|idx| (idx, w))),
            );
            if vector.nnz() < total {
                debug!("Item '{}': dropped {} out-of-vocabulary tokens", id, total - vector.nnz());
            }
            let norm: f64 = weights.values().map(|w| w * w).sum::<f64>().sqrt();
            if (norm - 1.0).abs() > NORM_TOLERANCE {
                warn!("Item '{}' vector has L2 norm {:.3}, scores will not be cosines", id, norm);
            }

            items.push(RecommenderItem {
                metadata: ItemMetadata {
                    id,
                    name: entry.name,
                    category: entry.category,
                    image_url: entry.image_url,
                    date: entry.date,
                },
                vector,
            });
        }

        info!(
            "Loaded recommender: items={}, features={}, analyzer={}",
            items.len(),
            vectorizer.n_features(),
            analyzer.mode.as_str()
        );

        Ok(Self { vectorizer, items })
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Self::from_value(serde_json::from_str(json)?)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        Self::from_value(serde_json::from_slice(bytes)?)
    }

    pub fn from_reader(reader: impl Read) -> Result<Self> {
        Self::from_value(read_to_value(reader)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::load(&ArtifactSource::LocalPath(path.as_ref().to_path_buf()))
    }

    /// Load from any artifact source
    pub fn load(source: &ArtifactSource) -> Result<Self> {
        debug!("Loading recommender model from {}", source.describe());
        Self::from_value(source.read_json()?)
    }

    pub fn vectorizer(&self) -> &Vectorizer {
        &self.vectorizer
    }

    /// Items in ascending id order
    pub fn items(&self) -> &[RecommenderItem] {
        &self.items
    }
}
