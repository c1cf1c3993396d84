//! Probability calibration for the linear classifier.
//!
//! Raw SVM decision values are not probabilities. [`CalibratedClassifier`]
//! turns them into probabilities with Platt scaling fitted by stratified
//! k-fold cross-validation: each fold trains a one-vs-rest SVM on the other
//! folds and fits one sigmoid per class on the decisions it produces for the
//! held-out rows. The fitted classifier keeps every (SVM, sigmoids) pair and
//! averages their normalized probability distributions at prediction time.
//!
//! A fold is only usable when both its sides contain every class, so the
//! fold count is capped by the smallest class. With fewer than two usable
//! folds a single model is trained on all rows and calibrated in-sample.

use std::collections::BTreeSet;

use log::{debug, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Result, RouterError};
use crate::ml::svm::{OneVsRestSvm, SvmConfig};

/// Settings of the calibrated classifier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Number of cross-validation folds used for calibration.
    pub folds: usize,
    /// Base SVM hyper-parameters.
    pub svm: SvmConfig,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            folds: 3,
            svm: SvmConfig::default(),
        }
    }
}

/// A Platt sigmoid `P(y = 1 | f) = 1 / (1 + exp(a * f + b))`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlattSigmoid {
    a: f64,
    b: f64,
}

impl PlattSigmoid {
    const MAX_ITER: usize = 100;
    const MIN_STEP: f64 = 1e-10;
    const SIGMA: f64 = 1e-12;
    const EPS: f64 = 1e-5;

    /// Fit the sigmoid by Newton's method with backtracking line search.
    ///
    /// Targets are smoothed towards `(n+ + 1) / (n+ + 2)` and `1 / (n- + 2)`,
    /// which keeps the fit finite on separable or one-sided data.
    pub fn fit(decisions: &[f64], targets: &[bool]) -> Self {
        let prior1 = targets.iter().filter(|t| **t).count() as f64;
        let prior0 = targets.len() as f64 - prior1;
        let hi_target = (prior1 + 1.0) / (prior1 + 2.0);
        let lo_target = 1.0 / (prior0 + 2.0);
        let t: Vec<f64> = targets
            .iter()
            .map(|&y| if y { hi_target } else { lo_target })
            .collect();

        let mut a = 0.0;
        let mut b = ((prior0 + 1.0) / (prior1 + 1.0)).ln();
        let mut fval = Self::objective(decisions, &t, a, b);

        for _ in 0..Self::MAX_ITER {
            let (mut h11, mut h22, mut h21) = (Self::SIGMA, Self::SIGMA, 0.0);
            let (mut g1, mut g2) = (0.0, 0.0);

            for (f, ti) in decisions.iter().zip(t.iter()) {
                let f_apb = f * a + b;
                let (p, q) = if f_apb >= 0.0 {
                    let e = (-f_apb).exp();
                    (e / (1.0 + e), 1.0 / (1.0 + e))
                } else {
                    let e = f_apb.exp();
                    (1.0 / (1.0 + e), e / (1.0 + e))
                };
                let d2 = p * q;
                h11 += f * f * d2;
                h22 += d2;
                h21 += f * d2;
                let d1 = ti - p;
                g1 += f * d1;
                g2 += d1;
            }

            if g1.abs() < Self::EPS && g2.abs() < Self::EPS {
                break;
            }

            let det = h11 * h22 - h21 * h21;
            let da = -(h22 * g1 - h21 * g2) / det;
            let db = -(-h21 * g1 + h11 * g2) / det;
            let gd = g1 * da + g2 * db;

            let mut step = 1.0;
            while step >= Self::MIN_STEP {
                let new_a = a + step * da;
                let new_b = b + step * db;
                let new_f = Self::objective(decisions, &t, new_a, new_b);
                if new_f < fval + 0.0001 * step * gd {
                    a = new_a;
                    b = new_b;
                    fval = new_f;
                    break;
                }
                step /= 2.0;
            }

            if step < Self::MIN_STEP {
                debug!("platt line search stalled at a={a:.4} b={b:.4}");
                break;
            }
        }

        Self { a, b }
    }

    fn objective(decisions: &[f64], t: &[f64], a: f64, b: f64) -> f64 {
        decisions
            .iter()
            .zip(t.iter())
            .map(|(f, ti)| {
                let f_apb = f * a + b;
                if f_apb >= 0.0 {
                    ti * f_apb + (-f_apb).exp().ln_1p()
                } else {
                    (ti - 1.0) * f_apb + f_apb.exp().ln_1p()
                }
            })
            .sum()
    }

    /// Calibrated probability of the positive class for a decision value.
    pub fn probability(&self, decision: f64) -> f64 {
        let f_apb = decision * self.a + self.b;
        if f_apb >= 0.0 {
            let e = (-f_apb).exp();
            e / (1.0 + e)
        } else {
            1.0 / (1.0 + f_apb.exp())
        }
    }
}

/// One cross-validation fold: a base model and a sigmoid per known class.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CalibratedMember {
    svm: OneVsRestSvm,
    /// Aligned with `svm.classes()`.
    calibrators: Vec<PlattSigmoid>,
}

impl CalibratedMember {
    fn fit(
        rows: &[&[f64]],
        labels: &[usize],
        train: &[usize],
        held_out: &[usize],
        config: &SvmConfig,
    ) -> Result<Self> {
        let train_rows: Vec<&[f64]> = train.iter().map(|&i| rows[i]).collect();
        let train_labels: Vec<usize> = train.iter().map(|&i| labels[i]).collect();
        let svm = OneVsRestSvm::fit(&train_rows, &train_labels, config)?;

        let calibrators = svm
            .classes()
            .iter()
            .map(|&class| {
                let decisions: Vec<f64> = held_out
                    .iter()
                    .map(|&i| svm.decision_for(class, rows[i]).unwrap_or_default())
                    .collect();
                let targets: Vec<bool> = held_out.iter().map(|&i| labels[i] == class).collect();
                PlattSigmoid::fit(&decisions, &targets)
            })
            .collect();

        Ok(Self { svm, calibrators })
    }

    /// Normalized probability distribution over all `n_classes`.
    fn distribution(&self, x: &[f64], n_classes: usize) -> Vec<f64> {
        let mut probabilities = vec![0.0; n_classes];
        for ((class, decision), calibrator) in self
            .svm
            .decision_function(x)
            .into_iter()
            .zip(self.calibrators.iter())
        {
            probabilities[class] = calibrator.probability(decision);
        }

        let total: f64 = probabilities.iter().sum();
        if total > 0.0 {
            for p in &mut probabilities {
                *p /= total;
            }
        } else {
            probabilities.fill(1.0 / n_classes as f64);
        }
        probabilities
    }
}

/// Output of [`CalibratedClassifier::predict`].
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    /// Calibrated probability per class, aligned with the classifier's classes.
    pub probabilities: Vec<f64>,
    /// Index of the most probable class.
    pub top: usize,
    /// Probability of the most probable class.
    pub top_probability: f64,
    /// Mean raw decision value of the top class, when any fold model knows it.
    pub margin: Option<f64>,
}

/// A one-vs-rest linear SVM calibrated with cross-validated Platt scaling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibratedClassifier {
    /// Sorted class labels.
    classes: Vec<String>,
    dimension: usize,
    members: Vec<CalibratedMember>,
}

impl CalibratedClassifier {
    /// Fit on dense feature rows and their string labels.
    pub fn fit(rows: &[Vec<f64>], labels: &[String], config: &ClassifierConfig) -> Result<Self> {
        if rows.is_empty() {
            return Err(RouterError::NoTrainingExamples);
        }
        if rows.len() != labels.len() {
            return Err(RouterError::model(format!(
                "{} rows but {} labels",
                rows.len(),
                labels.len()
            )));
        }

        let classes: Vec<String> = labels
            .iter()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if classes.len() < 2 {
            return Err(RouterError::InsufficientClasses(classes.len()));
        }

        let y: Vec<usize> = labels
            .iter()
            .map(|label| classes.binary_search(label).unwrap_or_default())
            .collect();
        let row_refs: Vec<&[f64]> = rows.iter().map(|r| r.as_slice()).collect();
        let dimension = rows[0].len();

        let mut counts = vec![0usize; classes.len()];
        for &label in &y {
            counts[label] += 1;
        }
        let smallest = counts.iter().copied().min().unwrap_or(0);
        let folds = config.folds.min(smallest);

        let mut members = if folds < 2 {
            Vec::new()
        } else {
            let assignment = Self::stratified_folds(&y, classes.len(), folds);
            (0..folds)
                .into_par_iter()
                .filter_map(|fold| {
                    let (held_out, train): (Vec<usize>, Vec<usize>) =
                        (0..rows.len()).partition(|&i| assignment[i] == fold);
                    if !Self::covers_every_class(&train, &y, classes.len())
                        || !Self::covers_every_class(&held_out, &y, classes.len())
                    {
                        return None;
                    }
                    Some(CalibratedMember::fit(
                        &row_refs,
                        &y,
                        &train,
                        &held_out,
                        &config.svm,
                    ))
                })
                .collect::<Result<Vec<_>>>()?
        };

        if members.len() < 2 {
            warn!(
                "{}-fold calibration needs {} examples per intent, smallest has {smallest}; \
                 calibrating in-sample",
                config.folds, config.folds
            );
            let all: Vec<usize> = (0..rows.len()).collect();
            members = vec![CalibratedMember::fit(&row_refs, &y, &all, &all, &config.svm)?];
        }

        debug!(
            "calibrated classifier: {} classes, {} fold models, dimension {}",
            classes.len(),
            members.len(),
            dimension
        );

        Ok(Self {
            classes,
            dimension,
            members,
        })
    }

    /// Assign each row a fold, dealing each class's rows round-robin in
    /// insertion order and carrying the rotation over between classes.
    fn stratified_folds(y: &[usize], n_classes: usize, folds: usize) -> Vec<usize> {
        let mut assignment = vec![0; y.len()];
        let mut next = 0;
        for class in 0..n_classes {
            for (i, _) in y.iter().enumerate().filter(|(_, l)| **l == class) {
                assignment[i] = next % folds;
                next += 1;
            }
        }
        assignment
    }

    /// Whether `indices` contain at least one row of every class.
    fn covers_every_class(indices: &[usize], y: &[usize], n_classes: usize) -> bool {
        let mut seen = vec![false; n_classes];
        for &i in indices {
            seen[y[i]] = true;
        }
        seen.into_iter().all(|s| s)
    }

    /// Calibrated prediction for one feature vector.
    pub fn predict(&self, x: &[f64]) -> Result<Prediction> {
        if x.len() != self.dimension {
            return Err(RouterError::model(format!(
                "feature vector has dimension {}, classifier expects {}",
                x.len(),
                self.dimension
            )));
        }

        let n = self.classes.len();
        let mut probabilities = vec![0.0; n];
        for member in &self.members {
            for (total, p) in probabilities
                .iter_mut()
                .zip(member.distribution(x, n).into_iter())
            {
                *total += p;
            }
        }
        let k = self.members.len() as f64;
        for p in &mut probabilities {
            *p /= k;
        }

        let (top, top_probability) = probabilities
            .iter()
            .copied()
            .enumerate()
            .fold((0, f64::NEG_INFINITY), |best, (i, p)| {
                if p > best.1 { (i, p) } else { best }
            });

        let decisions: Vec<f64> = self
            .members
            .iter()
            .filter_map(|m| m.svm.decision_for(top, x))
            .collect();
        let margin = if decisions.is_empty() {
            None
        } else {
            Some(decisions.iter().sum::<f64>() / decisions.len() as f64)
        };

        Ok(Prediction {
            probabilities,
            top,
            top_probability,
            margin,
        })
    }

    /// Sorted class labels.
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Label of a class index.
    pub fn label(&self, class: usize) -> &str {
        &self.classes[class]
    }

    /// Number of cross-validation models in the ensemble.
    pub fn n_members(&self) -> usize {
        self.members.len()
    }

    /// Feature dimension the classifier was fitted on.
    pub fn dimension(&self) -> usize {
        self.dimension
    }
}
