//! TF-IDF vectorizer for text feature extraction.
//!
//! Terms are the word unigrams and bigrams produced by the router's analysis
//! pipeline. Weights use the smoothed inverse document frequency
//! `ln((1 + n) / (1 + df)) + 1` over raw term counts, and every vector is
//! L2-normalized so that a dot product between two rows is their cosine.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::analysis::analyzer::Analyzer;
use crate::analysis::analyzer::pipeline::PipelineAnalyzer;
use crate::analysis::char_filter::ascii_folding::AsciiFoldingCharFilter;
use crate::analysis::token_filter::shingle::ShingleFilter;
use crate::analysis::tokenizer::regex::{DEFAULT_TOKEN_PATTERN, RegexTokenizer};
use crate::error::{Result, RouterError};
use crate::ml::l2_norm;

/// Settings of the vector space model.
///
/// These are captured in the saved artifact, so a loaded vectorizer always
/// tokenizes exactly like the one that was fitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorizerConfig {
    /// Smallest word n-gram size.
    pub min_n: usize,
    /// Largest word n-gram size.
    pub max_n: usize,
    /// Minimum number of documents a term must appear in.
    pub min_df: usize,
    /// Token regex applied to normalized text.
    pub token_pattern: String,
}

impl Default for VectorizerConfig {
    fn default() -> Self {
        Self {
            min_n: 1,
            max_n: 2,
            min_df: 1,
            token_pattern: DEFAULT_TOKEN_PATTERN.to_string(),
        }
    }
}

/// TF-IDF vectorizer for text feature extraction.
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "VectorizerState", into = "VectorizerState")]
pub struct TfIdfVectorizer {
    config: VectorizerConfig,
    /// Vocabulary: term -> feature index, indices assigned in sorted term order.
    vocabulary: BTreeMap<String, usize>,
    /// Inverse document frequency for each feature index.
    idf: Vec<f64>,
    /// Total number of documents seen during fitting.
    n_documents: usize,
    analyzer: Arc<dyn Analyzer>,
}

/// Serialized form of a fitted vectorizer; the analyzer is rebuilt from `config`.
#[derive(Serialize, Deserialize)]
struct VectorizerState {
    config: VectorizerConfig,
    vocabulary: BTreeMap<String, usize>,
    idf: Vec<f64>,
    n_documents: usize,
}

impl std::fmt::Debug for TfIdfVectorizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TfIdfVectorizer")
            .field("vocabulary_size", &self.vocabulary.len())
            .field("n_documents", &self.n_documents)
            .field("analyzer", &self.analyzer.name())
            .finish()
    }
}

impl TfIdfVectorizer {
    /// Create an unfitted vectorizer.
    pub fn new(config: VectorizerConfig) -> Result<Self> {
        let analyzer = Self::build_analyzer(&config)?;
        Ok(Self {
            config,
            vocabulary: BTreeMap::new(),
            idf: Vec::new(),
            n_documents: 0,
            analyzer,
        })
    }

    fn build_analyzer(config: &VectorizerConfig) -> Result<Arc<dyn Analyzer>> {
        let tokenizer = Arc::new(RegexTokenizer::with_pattern(&config.token_pattern)?);
        let analyzer = PipelineAnalyzer::new(tokenizer)
            .add_char_filter(Arc::new(AsciiFoldingCharFilter::new()))
            .add_filter(Arc::new(ShingleFilter::new(config.min_n, config.max_n)?))
            .with_name("intent_tfidf");
        Ok(Arc::new(analyzer))
    }

    /// Fit the vectorizer on training documents.
    pub fn fit(&mut self, documents: &[String]) -> Result<()> {
        let mut document_frequency: HashMap<String, usize> = HashMap::new();

        for doc in documents {
            let unique_terms: HashSet<String> = self.terms(doc)?.into_iter().collect();
            for term in unique_terms {
                *document_frequency.entry(term).or_insert(0) += 1;
            }
        }

        let kept: BTreeMap<String, usize> = document_frequency
            .into_iter()
            .filter(|(_, df)| *df >= self.config.min_df)
            .collect();
        if kept.is_empty() {
            return Err(RouterError::model(
                "Empty vocabulary: training documents contain no usable terms",
            ));
        }

        let n = documents.len() as f64;
        let mut vocabulary = BTreeMap::new();
        let mut idf = Vec::with_capacity(kept.len());
        for (idx, (term, df)) in kept.into_iter().enumerate() {
            idf.push(((1.0 + n) / (1.0 + df as f64)).ln() + 1.0);
            vocabulary.insert(term, idx);
        }

        self.vocabulary = vocabulary;
        self.idf = idf;
        self.n_documents = documents.len();

        Ok(())
    }

    /// Transform a document into an L2-normalized TF-IDF feature vector.
    ///
    /// Terms outside the fitted vocabulary are ignored; a document without
    /// any known term maps to the zero vector.
    pub fn transform(&self, document: &str) -> Result<Vec<f64>> {
        let mut features = vec![0.0; self.vocabulary.len()];

        for term in self.terms(document)? {
            if let Some(&idx) = self.vocabulary.get(&term) {
                features[idx] += 1.0;
            }
        }

        for (idx, value) in features.iter_mut().enumerate() {
            *value *= self.idf[idx];
        }

        let norm = l2_norm(&features);
        if norm > 0.0 {
            for value in &mut features {
                *value /= norm;
            }
        }

        Ok(features)
    }

    /// Transform a batch of documents, preserving their order.
    pub fn transform_batch(&self, documents: &[String]) -> Result<Vec<Vec<f64>>> {
        documents.iter().map(|doc| self.transform(doc)).collect()
    }

    fn terms(&self, text: &str) -> Result<Vec<String>> {
        Ok(self.analyzer.analyze(text)?.map(|token| token.text).collect())
    }

    /// Whether `fit` has been called successfully.
    pub fn is_fitted(&self) -> bool {
        !self.vocabulary.is_empty()
    }

    /// Get the size of the vocabulary.
    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }

    /// Feature index of a term, if it is in the vocabulary.
    pub fn term_index(&self, term: &str) -> Option<usize> {
        self.vocabulary.get(term).copied()
    }

    /// Number of documents the vectorizer was fitted on.
    pub fn n_documents(&self) -> usize {
        self.n_documents
    }

    pub fn config(&self) -> &VectorizerConfig {
        &self.config
    }
}

impl TryFrom<VectorizerState> for TfIdfVectorizer {
    type Error = RouterError;

    fn try_from(state: VectorizerState) -> Result<Self> {
        if state.idf.len() != state.vocabulary.len() {
            return Err(RouterError::corrupt(format!(
                "vectorizer has {} terms but {} idf weights",
                state.vocabulary.len(),
                state.idf.len()
            )));
        }
        if state.vocabulary.values().any(|&idx| idx >= state.idf.len()) {
            return Err(RouterError::corrupt("vectorizer term index out of range"));
        }

        let analyzer = Self::build_analyzer(&state.config)?;
        Ok(Self {
            config: state.config,
            vocabulary: state.vocabulary,
            idf: state.idf,
            n_documents: state.n_documents,
            analyzer,
        })
    }
}

impl From<TfIdfVectorizer> for VectorizerState {
    fn from(vectorizer: TfIdfVectorizer) -> Self {
        Self {
            config: vectorizer.config,
            vocabulary: vectorizer.vocabulary,
            idf: vectorizer.idf,
            n_documents: vectorizer.n_documents,
        }
    }
}
