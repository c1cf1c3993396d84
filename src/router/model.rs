//! The fitted statistical model and the immutable serving snapshot.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Result, RouterError};
use crate::ml::calibration::{CalibratedClassifier, ClassifierConfig, Prediction};
use crate::ml::similarity::SimilarityIndex;
use crate::ml::tfidf::{TfIdfVectorizer, VectorizerConfig};
use crate::router::rules::RuleSet;

/// One labelled training utterance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingExample {
    pub text: String,
    pub intent: String,
}

impl TrainingExample {
    pub fn new<T: Into<String>, I: Into<String>>(text: T, intent: I) -> Self {
        Self {
            text: text.into(),
            intent: intent.into(),
        }
    }
}

/// Fitted vectorizer plus the calibrated classifier trained on its output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FittedModel {
    vectorizer: TfIdfVectorizer,
    classifier: CalibratedClassifier,
}

impl FittedModel {
    /// Fit on `corpus`, returning the model and the similarity index built
    /// from the very rows the classifier was trained on.
    pub fn fit(
        corpus: &[TrainingExample],
        vectorizer_config: &VectorizerConfig,
        classifier_config: &ClassifierConfig,
    ) -> Result<(Self, SimilarityIndex)> {
        if corpus.is_empty() {
            return Err(RouterError::NoTrainingExamples);
        }

        let texts: Vec<String> = corpus.iter().map(|e| e.text.clone()).collect();
        let labels: Vec<String> = corpus.iter().map(|e| e.intent.clone()).collect();

        let mut vectorizer = TfIdfVectorizer::new(vectorizer_config.clone())?;
        vectorizer.fit(&texts)?;
        let rows = vectorizer.transform_batch(&texts)?;

        let classifier = CalibratedClassifier::fit(&rows, &labels, classifier_config)?;
        let similarity = SimilarityIndex::new(rows, labels)?;

        Ok((
            Self {
                vectorizer,
                classifier,
            },
            similarity,
        ))
    }

    /// Rebuild the similarity index for a restored corpus with this model's transform.
    pub fn similarity_index(&self, corpus: &[TrainingExample]) -> Result<SimilarityIndex> {
        let texts: Vec<String> = corpus.iter().map(|e| e.text.clone()).collect();
        let labels: Vec<String> = corpus.iter().map(|e| e.intent.clone()).collect();
        let rows = self.vectorizer.transform_batch(&texts)?;
        SimilarityIndex::new(rows, labels)
    }

    pub fn vectorize(&self, text: &str) -> Result<Vec<f64>> {
        self.vectorizer.transform(text)
    }

    pub fn predict(&self, vector: &[f64]) -> Result<Prediction> {
        self.classifier.predict(vector)
    }

    /// Label of a class index returned in a [`Prediction`].
    pub fn label(&self, class: usize) -> &str {
        self.classifier.label(class)
    }

    pub fn classes(&self) -> &[String] {
        self.classifier.classes()
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vectorizer.vocabulary_size()
    }

    pub fn vectorizer(&self) -> &TfIdfVectorizer {
        &self.vectorizer
    }

    pub fn classifier(&self) -> &CalibratedClassifier {
        &self.classifier
    }
}

/// Everything produced by one training run or one artifact load.
#[derive(Debug)]
pub struct TrainedState {
    pub model: FittedModel,
    /// The corpus in vectorizer fit order; aligned with `similarity`.
    pub corpus: Vec<TrainingExample>,
    pub similarity: SimilarityIndex,
}

/// What one `route` call works against. Never mutated once published.
#[derive(Debug, Default)]
pub struct Snapshot {
    pub rules: Arc<RuleSet>,
    pub trained: Option<Arc<TrainedState>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Vec<TrainingExample> {
        vec![
            TrainingExample::new("hello there", "greeting"),
            TrainingExample::new("hi friend", "greeting"),
            TrainingExample::new("good morning", "greeting"),
            TrainingExample::new("how much does it cost", "pricing"),
            TrainingExample::new("what is the price", "pricing"),
            TrainingExample::new("price of the plan", "pricing"),
        ]
    }

    #[test]
    fn test_fit_aligns_similarity_with_corpus() {
        let corpus = corpus();
        let (model, similarity) =
            FittedModel::fit(&corpus, &VectorizerConfig::default(), &ClassifierConfig::default())
                .unwrap();

        assert_eq!(model.classes(), &["greeting", "pricing"]);
        assert_eq!(similarity.len(), corpus.len());
        assert_eq!(similarity.labels()[3], "pricing");

        let query = model.vectorize("how much does it cost").unwrap();
        let scores = similarity.max_cosine(&query, "pricing");
        assert!((scores.global - 1.0).abs() < 1e-9);
        assert!((scores.same_class - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_rebuilt_index_matches_fitted_index() {
        let corpus = corpus();
        let (model, fitted) =
            FittedModel::fit(&corpus, &VectorizerConfig::default(), &ClassifierConfig::default())
                .unwrap();
        let rebuilt = model.similarity_index(&corpus).unwrap();

        let query = model.vectorize("hello friend").unwrap();
        assert_eq!(
            fitted.max_cosine(&query, "greeting"),
            rebuilt.max_cosine(&query, "greeting")
        );
    }

    #[test]
    fn test_empty_corpus() {
        let err = FittedModel::fit(&[], &VectorizerConfig::default(), &ClassifierConfig::default())
            .unwrap_err();
        assert!(matches!(err, RouterError::NoTrainingExamples));
    }
}
