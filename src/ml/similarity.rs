//! Nearest-example similarity over the vectorized training corpus.
//!
//! A query can receive a confident calibrated probability while looking
//! nothing like any training example. The similarity index catches that case
//! by reporting how close the query is to its nearest example overall and to
//! its nearest example of the predicted class.

use serde::{Deserialize, Serialize};

use crate::error::{Result, RouterError};
use crate::ml::{dot, l2_norm};

/// Calculate cosine similarity between two vectors.
///
/// A zero vector (or mismatched lengths) has similarity 0 with anything.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() {
        return 0.0;
    }

    let magnitude_a = l2_norm(a);
    let magnitude_b = l2_norm(b);

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        0.0
    } else {
        dot(a, b) / (magnitude_a * magnitude_b)
    }
}

/// Maximum cosine similarities of a query against the corpus.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SimilarityScores {
    /// Best similarity against any training example.
    pub global: f64,
    /// Best similarity against examples of the predicted class.
    pub same_class: f64,
}

/// The vectorized training corpus with its index-aligned labels.
#[derive(Debug, Clone)]
pub struct SimilarityIndex {
    rows: Vec<Vec<f64>>,
    norms: Vec<f64>,
    labels: Vec<String>,
}

impl SimilarityIndex {
    /// Build an index; `rows[i]` is the vector of the example labelled `labels[i]`.
    pub fn new(rows: Vec<Vec<f64>>, labels: Vec<String>) -> Result<Self> {
        if rows.len() != labels.len() {
            return Err(RouterError::model(format!(
                "similarity corpus has {} rows but {} labels",
                rows.len(),
                labels.len()
            )));
        }
        let norms = rows.iter().map(|r| l2_norm(r)).collect();
        Ok(Self {
            rows,
            norms,
            labels,
        })
    }

    /// Highest cosine similarity of `query` overall and within `label`.
    pub fn max_cosine(&self, query: &[f64], label: &str) -> SimilarityScores {
        let query_norm = l2_norm(query);
        let mut scores = SimilarityScores::default();
        if query_norm == 0.0 {
            return scores;
        }

        for ((row, norm), row_label) in self
            .rows
            .iter()
            .zip(self.norms.iter())
            .zip(self.labels.iter())
        {
            if *norm == 0.0 || row.len() != query.len() {
                continue;
            }
            let cosine = (dot(row, query) / (norm * query_norm)).clamp(0.0, 1.0);
            scores.global = scores.global.max(cosine);
            if row_label == label {
                scores.same_class = scores.same_class.max(cosine);
            }
        }

        scores
    }

    /// Number of indexed examples.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Labels in corpus order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}
