//! Linear maximum-margin classifiers.
//!
//! [`BinarySvm`] is an L2-regularized linear SVM with squared hinge loss,
//! solved in the dual by coordinate descent. The intercept is learned as the
//! weight of an implicit constant feature of value 1, so it is regularized
//! like any other weight. [`OneVsRestSvm`] trains one binary model per class.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Result, RouterError};
use crate::ml::dot;

/// Hyper-parameters of the linear SVM.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SvmConfig {
    /// Inverse regularization strength.
    pub c: f64,
    /// Stop when every projected gradient is within this bound.
    pub tolerance: f64,
    /// Maximum number of passes over the training rows.
    pub max_iter: usize,
}

impl Default for SvmConfig {
    fn default() -> Self {
        Self {
            c: 1.0,
            tolerance: 1e-4,
            max_iter: 1000,
        }
    }
}

/// A fitted binary linear SVM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinarySvm {
    weights: Vec<f64>,
    bias: f64,
}

impl BinarySvm {
    /// Fit on `rows` where `targets[i]` marks row `i` as the positive class.
    pub fn fit(rows: &[&[f64]], targets: &[bool], config: &SvmConfig) -> Result<Self> {
        if rows.is_empty() || rows.len() != targets.len() {
            return Err(RouterError::model(format!(
                "cannot fit SVM on {} rows with {} targets",
                rows.len(),
                targets.len()
            )));
        }
        if config.c <= 0.0 {
            return Err(RouterError::invalid_config("SVM C must be positive"));
        }

        let dim = rows[0].len();
        let diag = 0.5 / config.c;
        let qd: Vec<f64> = rows.iter().map(|x| dot(x, x) + 1.0 + diag).collect();

        let mut alpha = vec![0.0; rows.len()];
        let mut weights = vec![0.0; dim];
        let mut bias = 0.0;

        for _ in 0..config.max_iter {
            let mut max_violation: f64 = 0.0;

            for (i, x) in rows.iter().enumerate() {
                let y = if targets[i] { 1.0 } else { -1.0 };
                let gradient = y * (dot(&weights, x) + bias) - 1.0 + diag * alpha[i];
                let projected = if alpha[i] == 0.0 {
                    gradient.min(0.0)
                } else {
                    gradient
                };
                max_violation = max_violation.max(projected.abs());

                if projected.abs() > 1e-12 {
                    let old = alpha[i];
                    alpha[i] = (old - gradient / qd[i]).max(0.0);
                    let step = (alpha[i] - old) * y;
                    for (w, xj) in weights.iter_mut().zip(x.iter()) {
                        *w += step * xj;
                    }
                    bias += step;
                }
            }

            if max_violation <= config.tolerance {
                break;
            }
        }

        Ok(Self { weights, bias })
    }

    /// Signed distance-like score of `x` relative to the separating hyperplane.
    pub fn decision(&self, x: &[f64]) -> f64 {
        dot(&self.weights, x) + self.bias
    }

    pub fn bias(&self) -> f64 {
        self.bias
    }

    pub fn dimension(&self) -> usize {
        self.weights.len()
    }
}

/// One binary SVM per class seen in the training labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneVsRestSvm {
    /// Global class indices this model was trained on, ascending.
    classes: Vec<usize>,
    models: Vec<BinarySvm>,
}

impl OneVsRestSvm {
    /// Fit one model per distinct label. Labels are global class indices.
    pub fn fit(rows: &[&[f64]], labels: &[usize], config: &SvmConfig) -> Result<Self> {
        let mut classes: Vec<usize> = labels.to_vec();
        classes.sort_unstable();
        classes.dedup();

        let models = classes
            .par_iter()
            .map(|&class| {
                let targets: Vec<bool> = labels.iter().map(|&l| l == class).collect();
                BinarySvm::fit(rows, &targets, config)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { classes, models })
    }

    /// Decision value for a global class index, if this model knows the class.
    pub fn decision_for(&self, class: usize, x: &[f64]) -> Option<f64> {
        self.classes
            .binary_search(&class)
            .ok()
            .map(|pos| self.models[pos].decision(x))
    }

    /// Decision values for every known class, paired with its global index.
    pub fn decision_function(&self, x: &[f64]) -> Vec<(usize, f64)> {
        self.classes
            .iter()
            .zip(self.models.iter())
            .map(|(&class, model)| (class, model.decision(x)))
            .collect()
    }

    pub fn classes(&self) -> &[usize] {
        &self.classes
    }
}
