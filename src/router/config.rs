//! Router configuration.
//!
//! ```
//! use intent_router::router::RouterConfig;
//!
//! let config = RouterConfig::default();
//! assert_eq!(config.gate.proba_min, 0.55);
//! assert_eq!(config.classifier.folds, 3);
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, RouterError};
use crate::ml::calibration::ClassifierConfig;
use crate::ml::tfidf::VectorizerConfig;
use crate::router::dispatch::DEFAULT_FALLBACK_MESSAGE;
use crate::router::gate::GateConfig;

/// All tunables of a [`Router`](crate::router::Router).
///
/// `gate` and `fallback_message` apply at serving time. `vectorizer` and
/// `classifier` only matter for `train()`; a loaded artifact carries the
/// settings it was fitted with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    pub gate: GateConfig,
    pub vectorizer: VectorizerConfig,
    pub classifier: ClassifierConfig,
    /// Output of the built-in fallback handler.
    pub fallback_message: String,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            gate: GateConfig::default(),
            vectorizer: VectorizerConfig::default(),
            classifier: ClassifierConfig::default(),
            fallback_message: DEFAULT_FALLBACK_MESSAGE.to_string(),
        }
    }
}

impl RouterConfig {
    /// Load a JSON configuration file; missing fields take their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: RouterConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        let gate = &self.gate;
        for (name, value) in [("proba_min", gate.proba_min), ("sim_min", gate.sim_min)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(RouterError::invalid_config(format!(
                    "gate.{name} must be within [0, 1], got {value}"
                )));
            }
        }
        if !gate.margin_min.is_finite() {
            return Err(RouterError::invalid_config("gate.margin_min must be finite"));
        }

        let vectorizer = &self.vectorizer;
        if vectorizer.min_n == 0 || vectorizer.min_n > vectorizer.max_n {
            return Err(RouterError::invalid_config(format!(
                "vectorizer n-gram range {}..={} is invalid",
                vectorizer.min_n, vectorizer.max_n
            )));
        }
        if vectorizer.min_df == 0 {
            return Err(RouterError::invalid_config("vectorizer.min_df must be at least 1"));
        }

        let classifier = &self.classifier;
        if classifier.folds == 0 {
            return Err(RouterError::invalid_config("classifier.folds must be at least 1"));
        }
        if classifier.svm.c <= 0.0 || classifier.svm.tolerance <= 0.0 {
            return Err(RouterError::invalid_config(
                "classifier.svm.c and classifier.svm.tolerance must be positive",
            ));
        }
        if classifier.svm.max_iter == 0 {
            return Err(RouterError::invalid_config("classifier.svm.max_iter must be at least 1"));
        }

        Ok(())
    }
}
