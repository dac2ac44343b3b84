//! Normalization of loosely-shaped model artifacts
//!
//! Exported intent models do not agree on a JSON layout. Fields may sit under
//! a `vectorizer`/`classifier` wrapper or at the root, and the same concept
//! goes by several names. This module reads whatever shape arrives and
//! produces [`IntentArtifact`], a plain struct the loader validates. The
//! recommender artifact has a fixed layout and is deserialized directly.

use crate::vectorizer::feature_count;
use eventlink_core::{Error, Result};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

const VECTORIZER_KEYS: &[&str] = &["vectorizer", "tfidf", "vec"];
const CLASSIFIER_KEYS: &[&str] = &["classifier", "model", "clf"];
const VOCAB_KEYS: &[&str] = &["vocab", "vocabulary", "token2id"];
const NESTED_VOCAB_KEYS: &[&str] = &["vocabulary", "vocab", "token2id"];

/// Layout the vocabulary was found in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VocabShape {
    /// `{"token": index}`
    TokenToIndex,
    /// `{"index": "token"}`, inverted on load
    IndexToToken,
    /// `[["token", index], ...]`
    Pairs,
    /// `["token", ...]`, position is the index
    Tokens,
}

impl fmt::Display for VocabShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::TokenToIndex => "map(token->idx)",
            Self::IndexToToken => "map(idx->token,inverted)",
            Self::Pairs => "array-of-pairs",
            Self::Tokens => "array-of-tokens",
        };
        f.write_str(s)
    }
}

/// Vocabulary as read from an artifact
#[derive(Debug, Clone)]
pub struct RawVocabulary {
    pub index: HashMap<String, usize>,
    pub n_features: usize,
    pub shape: VocabShape,
    /// Path of the key the vocabulary was read from
    pub source: String,
}

/// Canonical fields of an intent model artifact, before dimension checks
#[derive(Debug, Clone)]
pub struct IntentArtifact {
    pub classes: Vec<String>,
    pub vocabulary: RawVocabulary,
    pub idf: Option<Vec<f64>>,
    pub analyzer: Option<String>,
    pub ngram_min: Option<i64>,
    pub ngram_max: Option<i64>,
    pub coef: Vec<Vec<f64>>,
    pub intercept: Option<Vec<f64>>,
}

impl IntentArtifact {
    /// Read the canonical fields out of a parsed artifact
    pub fn from_value(root: &Value) -> Result<Self> {
        let root = root
            .as_object()
            .ok_or_else(|| Error::schema("model artifact must be a JSON object"))?;

        let vec_node = first_object(root, VECTORIZER_KEYS).unwrap_or(root);
        let clf_node = first_object(root, CLASSIFIER_KEYS).unwrap_or(root);

        let classes = first_array(&[clf_node, root], &["classes"])
            .filter(|arr| !arr.is_empty())
            .ok_or_else(|| Error::schema("model JSON missing 'classes' array"))?;
        let classes = classes
            .iter()
            .enumerate()
            .map(|(i, v)| match v {
                Value::String(s) => Ok(s.clone()),
                Value::Number(n) => Ok(n.to_string()),
                _ => Err(Error::schema(format!("class label {} is not a string", i))),
            })
            .collect::<Result<Vec<_>>>()?;

        let vocabulary = find_vocabulary(vec_node, root)?;

        let idf = first_array(&[vec_node, root], &["idf"])
            .map(|arr| number_array(arr, "idf"))
            .transpose()?;

        let analyzer = [vec_node, root]
            .iter()
            .filter_map(|node| node.get("analyzer").and_then(Value::as_str))
            .find(|s| !s.is_empty())
            .map(str::to_string);

        let ngram_min = scoped_integer(vec_node, root, "ngram_min")?;
        let ngram_max = scoped_integer(vec_node, root, "ngram_max")?;

        let coef = first_array(&[clf_node, root], &["coef"])
            .or_else(|| first_array(&[clf_node, root], &["coefficients"]))
            .ok_or_else(|| Error::schema("model JSON missing 'coef' matrix"))?;
        let coef = coef
            .iter()
            .enumerate()
            .map(|(r, row)| {
                let row = row
                    .as_array()
                    .ok_or_else(|| Error::schema(format!("coef row {} is not an array", r)))?;
                number_array(row, &format!("coef row {}", r))
            })
            .collect::<Result<Vec<_>>>()?;

        let intercept = first_array(&[clf_node, root], &["intercept"])
            .or_else(|| first_array(&[clf_node, root], &["bias"]))
            .map(|arr| number_array(arr, "intercept"))
            .transpose()?;

        Ok(Self {
            classes,
            vocabulary,
            idf,
            analyzer,
            ngram_min,
            ngram_max,
            coef,
            intercept,
        })
    }
}

fn first_object<'a>(node: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Map<String, Value>> {
    keys.iter().find_map(|k| node.get(*k).and_then(Value::as_object))
}

/// First array found under any of `keys`, trying each node in order
fn first_array<'a>(nodes: &[&'a Map<String, Value>], keys: &[&str]) -> Option<&'a Vec<Value>> {
    nodes
        .iter()
        .find_map(|node| keys.iter().find_map(|k| node.get(*k).and_then(Value::as_array)))
}

/// Integer read from `scope` when the key is present there, otherwise from `root`
fn scoped_integer(
    scope: &Map<String, Value>,
    root: &Map<String, Value>,
    key: &str,
) -> Result<Option<i64>> {
    let value = if scope.contains_key(key) {
        scope.get(key)
    } else {
        root.get(key)
    };

    match value {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_i64()
            .or_else(|| v.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
            .map(Some)
            .ok_or_else(|| Error::schema(format!("'{}' must be an integer", key))),
    }
}

fn number_array(arr: &[Value], what: &str) -> Result<Vec<f64>> {
    arr.iter()
        .enumerate()
        .map(|(i, v)| {
            v.as_f64()
                .ok_or_else(|| Error::schema(format!("{}[{}] is not a number", what, i)))
        })
        .collect()
}

fn find_vocabulary(vec_node: &Map<String, Value>, root: &Map<String, Value>) -> Result<RawVocabulary> {
    let nested = vec_node.get("vectorizer").and_then(Value::as_object);

    let candidates = VOCAB_KEYS
        .iter()
        .map(|k| (vec_node.get(*k), format!("vectorizer.{}", k)))
        .chain(
            NESTED_VOCAB_KEYS
                .iter()
                .map(|k| (nested.and_then(|n| n.get(*k)), format!("vectorizer.vectorizer.{}", k))),
        )
        .chain(VOCAB_KEYS.iter().map(|k| (root.get(*k), (*k).to_string())));

    for (value, source) in candidates {
        match value {
            None | Some(Value::Null) => continue,
            Some(value) => {
                let (index, shape) = parse_vocabulary(value)?;
                let n_features = feature_count(&index)?;
                return Ok(RawVocabulary {
                    index,
                    n_features,
                    shape,
                    source,
                });
            }
        }
    }

    let mut vec_keys: Vec<_> = vec_node.keys().cloned().collect();
    let mut root_keys: Vec<_> = root.keys().cloned().collect();
    vec_keys.sort();
    root_keys.sort();
    tracing::warn!("Available keys in vectorizer: {:?}", vec_keys);
    tracing::warn!("Available keys in root: {:?}", root_keys);

    Err(Error::schema(
        "model JSON missing vocabulary (vocab/vocabulary/token2id)",
    ))
}

/// Interpret a vocabulary value in any of the supported layouts
pub fn parse_vocabulary(value: &Value) -> Result<(HashMap<String, usize>, VocabShape)> {
    match value {
        Value::Object(map) => {
            if is_inverted(map.keys().map(String::as_str)) {
                let mut index = HashMap::with_capacity(map.len());
                for (k, v) in map {
                    let idx = k
                        .parse::<usize>()
                        .map_err(|_| Error::schema(format!("vocabulary key '{}' is not an index", k)))?;
                    let token = v
                        .as_str()
                        .ok_or_else(|| Error::schema(format!("vocabulary entry {} is not a token", k)))?;
                    index.insert(token.to_string(), idx);
                }
                Ok((index, VocabShape::IndexToToken))
            } else {
                let mut index = HashMap::with_capacity(map.len());
                for (token, v) in map {
                    index.insert(token.clone(), index_value(v, token)?);
                }
                Ok((index, VocabShape::TokenToIndex))
            }
        }
        Value::Array(arr) => match arr.first() {
            Some(Value::Array(_)) => {
                let mut index = HashMap::with_capacity(arr.len());
                for (i, pair) in arr.iter().enumerate() {
                    let pair = pair.as_array().filter(|p| p.len() >= 2).ok_or_else(|| {
                        Error::schema(format!("vocabulary pair {} is not [token, index]", i))
                    })?;
                    let token = pair[0]
                        .as_str()
                        .ok_or_else(|| Error::schema(format!("vocabulary pair {} has no token", i)))?;
                    index.insert(token.to_string(), index_value(&pair[1], token)?);
                }
                Ok((index, VocabShape::Pairs))
            }
            Some(Value::String(_)) => {
                let mut index = HashMap::with_capacity(arr.len());
                for (i, token) in arr.iter().enumerate() {
                    let token = token
                        .as_str()
                        .ok_or_else(|| Error::schema(format!("vocabulary token {} is not a string", i)))?;
                    index.insert(token.to_string(), i);
                }
                Ok((index, VocabShape::Tokens))
            }
            _ => Err(Error::schema("vocabulary array shape not recognized")),
        },
        other => Err(Error::schema(format!(
            "vocabulary type not recognized: {}",
            json_type_name(other)
        ))),
    }
}

/// Whether an object vocabulary maps index -> token
///
/// True when strictly more than half (integer division) of the keys are
/// all-digit strings. A small token -> index vocabulary made mostly of digit
/// n-grams is misread as inverted.
pub fn is_inverted<'a>(keys: impl IntoIterator<Item = &'a str>) -> bool {
    let (mut int_like, mut total) = (0usize, 0usize);
    for key in keys {
        total += 1;
        if !key.is_empty() && key.bytes().all(|b| b.is_ascii_digit()) {
            int_like += 1;
        }
    }
    int_like > total / 2
}

fn index_value(v: &Value, token: &str) -> Result<usize> {
    v.as_u64()
        .or_else(|| v.as_f64().filter(|f| *f >= 0.0 && f.fract() == 0.0).map(|f| f as u64))
        .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
        .and_then(|i| usize::try_from(i).ok())
        .ok_or_else(|| Error::schema(format!("vocabulary index for '{}' is not a non-negative integer", token)))
}

fn json_type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Recommender artifact layout
#[derive(Debug, Clone, Deserialize)]
pub struct RecommenderArtifact {
    pub vectorizer: RecommenderVectorizer,
    pub event_vectors: BTreeMap<String, HashMap<String, f64>>,
    pub events: BTreeMap<String, EventEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecommenderVectorizer {
    pub vocab: HashMap<String, usize>,
    #[serde(default)]
    pub idf: HashMap<String, f64>,
    #[serde(default)]
    pub analyzer: Option<String>,
    #[serde(default)]
    pub ngram_min: Option<usize>,
    #[serde(default)]
    pub ngram_max: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EventEntry {
    pub name: String,
    pub category: String,
    pub image_url: String,
    pub date: String,
}

impl RecommenderArtifact {
    pub fn from_value(root: Value) -> Result<Self> {
        serde_json::from_value(root)
            .map_err(|e| Error::schema(format!("recommender artifact: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_inverted_heuristic() {
        assert!(is_inverted(["0", "1", "2"]));
        assert!(is_inverted(["0", "1", "ab"]));
        assert!(!is_inverted(["0", "ab"]));
        assert!(!is_inverted(["ab", "bc"]));
        assert!(!is_inverted(std::iter::empty::<&str>()));
        // Digit n-grams look like indices.
        assert!(is_inverted(["12", "23", "ab"]));
    }

    #[test]
    fn test_vocabulary_shapes() {
        let (v, shape) = parse_vocabulary(&json!({"ab": 0, "bc": 1})).unwrap();
        assert_eq!(shape, VocabShape::TokenToIndex);
        assert_eq!(v["bc"], 1);

        let (v, shape) = parse_vocabulary(&json!({"0": "ab", "1": "bc"})).unwrap();
        assert_eq!(shape, VocabShape::IndexToToken);
        assert_eq!(v["ab"], 0);

        let (v, shape) = parse_vocabulary(&json!([["ab", 1], ["bc", 0]])).unwrap();
        assert_eq!(shape, VocabShape::Pairs);
        assert_eq!(v["ab"], 1);

        let (v, shape) = parse_vocabulary(&json!(["ab", "bc", "cd"])).unwrap();
        assert_eq!(shape, VocabShape::Tokens);
        assert_eq!(v["cd"], 2);
    }

    #[test]
    fn test_vocabulary_rejected_shapes() {
        assert!(parse_vocabulary(&json!("ab")).is_err());
        assert!(parse_vocabulary(&json!([])).is_err());
        assert!(parse_vocabulary(&json!([1, 2])).is_err());
        assert!(parse_vocabulary(&json!({"ab": -1})).is_err());
    }

    #[test]
    fn test_nested_wrappers() {
        let artifact = json!({
            "tfidf": {
                "vectorizer": {"vocabulary": {"ab": 0, "bc": 1}},
                "analyzer": "word",
                "ngram_min": 2,
                "ngram_max": 2
            },
            "clf": {
                "classes": ["a", "b"],
                "coefficients": [[1.0, 0.0], [0.0, 1.0]],
                "bias": [0.5, -0.5]
            }
        });

        let parsed = IntentArtifact::from_value(&artifact).unwrap();
        assert_eq!(parsed.classes, vec!["a", "b"]);
        assert_eq!(parsed.vocabulary.source, "vectorizer.vectorizer.vocabulary");
        assert_eq!(parsed.vocabulary.n_features, 2);
        assert_eq!(parsed.analyzer.as_deref(), Some("word"));
        assert_eq!(parsed.ngram_min, Some(2));
        assert_eq!(parsed.intercept, Some(vec![0.5, -0.5]));
    }

    #[test]
    fn test_flat_layout() {
        let artifact = json!({
            "classes": ["a"],
            "token2id": ["ab"],
            "coef": [[2.0]]
        });
        let parsed = IntentArtifact::from_value(&artifact).unwrap();
        assert_eq!(parsed.vocabulary.shape, VocabShape::Tokens);
        assert_eq!(parsed.vocabulary.source, "token2id");
        assert!(parsed.idf.is_none());
        assert!(parsed.intercept.is_none());
        assert!(parsed.analyzer.is_none());
    }

    #[test]
    fn test_missing_required_fields() {
        let err = IntentArtifact::from_value(&json!({"vocab": {"a": 0}, "coef": [[1.0]]})).unwrap_err();
        assert!(err.to_string().contains("classes"));

        let err = IntentArtifact::from_value(&json!({"classes": ["a"], "coef": [[1.0]]})).unwrap_err();
        assert!(err.to_string().contains("vocabulary"));

        let err = IntentArtifact::from_value(&json!({"classes": ["a"], "vocab": {"a": 0}})).unwrap_err();
        assert!(err.to_string().contains("coef"));

        let err = IntentArtifact::from_value(&json!({"classes": [], "vocab": {"a": 0}, "coef": []})).unwrap_err();
        assert!(matches!(err, Error::Schema(_)));
    }

    #[test]
    fn test_recommender_artifact() {
        let artifact = json!({
            "vectorizer": {"vocab": {"ai": 0}},
            "event_vectors": {"e1": {"ai": 1.0}},
            "events": {"e1": {"name": "AI Summit", "category": "AI/ML"}}
        });
        let parsed = RecommenderArtifact::from_value(artifact).unwrap();
        assert!(parsed.vectorizer.idf.is_empty());
        assert_eq!(parsed.events["e1"].image_url, "");

        let err = RecommenderArtifact::from_value(json!({"events": {}})).unwrap_err();
        assert!(matches!(err, Error::Schema(_)));
    }
}
