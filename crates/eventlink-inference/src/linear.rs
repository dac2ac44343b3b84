//! Multinomial linear classifier with softmax output

use crate::vectorizer::SparseVector;
use eventlink_core::{Error, Prediction, Result};

/// Coefficient matrix, intercepts and class labels of a linear model
#[derive(Debug, Clone)]
pub struct LinearClassifier {
    classes: Vec<String>,
    coef: Vec<Vec<f64>>,
    intercept: Vec<f64>,
}

impl LinearClassifier {
    /// Create a classifier, checking that every dimension agrees
    ///
    /// `intercept` defaults to zeros when `None`.
    pub fn new(
        classes: Vec<String>,
        coef: Vec<Vec<f64>>,
        intercept: Option<Vec<f64>>,
        n_features: usize,
    ) -> Result<Self> {
        let n_classes = classes.len();
        if n_classes == 0 {
            return Err(Error::schema("model has no classes"));
        }

        {
            let mut seen = std::collections::HashSet::with_capacity(n_classes);
            if let Some(dup) = classes.iter().find(|c| !seen.insert(c.as_str())) {
                return Err(Error::schema(format!("duplicate class label '{}'", dup)));
            }
        }

        if coef.len() != n_classes {
            return Err(Error::shape(format!(
                "'coef' must be [nClasses][nFeatures]: {} rows for {} classes",
                coef.len(),
                n_classes
            )));
        }
        if let Some((r, row)) = coef.iter().enumerate().find(|(_, row)| row.len() != n_features) {
            return Err(Error::shape(format!(
                "coef row {} length {} != nFeatures {}",
                r,
                row.len(),
                n_features
            )));
        }

        let intercept = match intercept {
            Some(b) if b.len() != n_classes => {
                return Err(Error::shape(format!(
                    "intercept length {} != nClasses {}",
                    b.len(),
                    n_classes
                )));
            }
            Some(b) => b,
            None => vec![0.0; n_classes],
        };

        Ok(Self {
            classes,
            coef,
            intercept,
        })
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }

    pub fn intercept(&self) -> &[f64] {
        &self.intercept
    }

    /// `coef · x + intercept` for every class
    pub fn logits(&self, x: &SparseVector) -> Vec<f64> {
        self.coef
            .iter()
            .zip(&self.intercept)
            .map(|(row, b)| x.dot_dense(row) + b)
            .collect()
    }

    /// Score a feature vector and pick the two most probable classes
    pub fn classify(&self, x: &SparseVector) -> Prediction {
        let probs = softmax(&self.logits(x));
        let (i1, i2) = top_two(&probs);
        Prediction::new(
            self.classes[i1].clone(),
            probs[i1],
            self.classes[i2].clone(),
            probs[i2],
            probs,
        )
    }
}

/// Numerically stable softmax
///
/// The maximum logit is subtracted before exponentiating. If the exponentials
/// sum to zero (or are not finite) the result is uniform.
pub fn softmax(logits: &[f64]) -> Vec<f64> {
    if logits.is_empty() {
        return Vec::new();
    }

    let max = logits.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));
    let exp: Vec<f64> = logits.iter().map(|&z| (z - max).exp()).collect();
    let sum: f64 = exp.iter().sum();

    if sum == 0.0 || !sum.is_finite() {
        let uniform = 1.0 / logits.len() as f64;
        return vec![uniform; logits.len()];
    }
    exp.into_iter().map(|e| e / sum).collect()
}

/// Indices of the highest and second-highest entries
///
/// Single linear scan; ties keep the lower index. With one entry both
/// indices are 0.
pub fn top_two(probs: &[f64]) -> (usize, usize) {
    let mut i1 = 0;
    let mut i2 = if probs.len() > 1 { 1 } else { 0 };
    for i in 0..probs.len() {
        if probs[i] > probs[i1] {
            i2 = i1;
            i1 = i;
        } else if i != i1 && probs[i] > probs[i2] {
            i2 = i;
        }
    }
    (i1, i2)
}
