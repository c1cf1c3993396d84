//! Accept/reject decision over the classifier's signals.
//!
//! Three checks run in a fixed order and the first failure decides the
//! reason:
//!
//! 1. calibrated probability below `proba_min` → `low_proba`
//! 2. decision margin below `margin_min` → `neg_margin`
//! 3. both global and same-class similarity below `sim_min` → `low_sim`
//!
//! Same-class similarity is an escape hatch for the third check: a query far
//! from the corpus as a whole is still accepted when it is close to the
//! examples of its own predicted class.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ml::similarity::SimilarityScores;

/// What to do when the classifier cannot provide a decision margin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarginFallback {
    /// Treat the margin as 0.0; passes the gate whenever `margin_min <= 0`.
    #[default]
    Permissive,
    /// Reject the route with a `neg_margin` reason.
    Strict,
}

/// Gate thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    pub proba_min: f64,
    pub margin_min: f64,
    pub sim_min: f64,
    pub margin_fallback: MarginFallback,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            proba_min: 0.55,
            margin_min: 0.0,
            sim_min: 0.15,
            margin_fallback: MarginFallback::Permissive,
        }
    }
}

impl GateConfig {
    /// These thresholds with any per-call overrides applied.
    pub fn with_overrides(&self, overrides: &GateOverrides) -> Self {
        Self {
            proba_min: overrides.proba_min.unwrap_or(self.proba_min),
            margin_min: overrides.margin_min.unwrap_or(self.margin_min),
            sim_min: overrides.sim_min.unwrap_or(self.sim_min),
            margin_fallback: self.margin_fallback,
        }
    }
}

/// Per-call threshold overrides for [`Router::route_with`](crate::router::Router::route_with).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GateOverrides {
    pub proba_min: Option<f64>,
    pub sim_min: Option<f64>,
    pub margin_min: Option<f64>,
}

impl GateOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn proba_min(mut self, value: f64) -> Self {
        self.proba_min = Some(value);
        self
    }

    pub fn sim_min(mut self, value: f64) -> Self {
        self.sim_min = Some(value);
        self
    }

    pub fn margin_min(mut self, value: f64) -> Self {
        self.margin_min = Some(value);
        self
    }
}

/// Everything the classifier and similarity index said about a query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RouteSignals {
    /// Calibrated probability of the top class.
    pub probability: f64,
    /// Raw decision margin of the top class, when available.
    pub margin: Option<f64>,
    pub similarity: SimilarityScores,
}

/// Why the gate sent a query to the fallback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RejectReason {
    LowProba(f64),
    /// `None` when the margin was unavailable under [`MarginFallback::Strict`].
    NegMargin(Option<f64>),
    LowSim { global: f64, same_class: f64 },
}

impl RejectReason {
    /// Short machine-readable code of the reason.
    pub fn code(&self) -> &'static str {
        match self {
            RejectReason::LowProba(_) => "low_proba",
            RejectReason::NegMargin(_) => "neg_margin",
            RejectReason::LowSim { .. } => "low_sim",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::LowProba(p) => write!(f, "low_proba {p:.3}"),
            RejectReason::NegMargin(Some(m)) => write!(f, "neg_margin {m:.3}"),
            RejectReason::NegMargin(None) => write!(f, "neg_margin unavailable"),
            RejectReason::LowSim { global, same_class } => {
                write!(f, "low_sim max={global:.3} class={same_class:.3}")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GateDecision {
    Accept,
    Reject(RejectReason),
}

/// The multi-signal gate.
#[derive(Debug, Clone, Copy)]
pub struct Gate {
    config: GateConfig,
}

impl Gate {
    pub fn new(config: GateConfig) -> Self {
        Self { config }
    }

    pub fn evaluate(&self, signals: &RouteSignals) -> GateDecision {
        let config = &self.config;

        if signals.probability < config.proba_min {
            return GateDecision::Reject(RejectReason::LowProba(signals.probability));
        }

        let margin = match (signals.margin, config.margin_fallback) {
            (Some(margin), _) => margin,
            (None, MarginFallback::Permissive) => 0.0,
            (None, MarginFallback::Strict) => {
                return GateDecision::Reject(RejectReason::NegMargin(None));
            }
        };
        if margin < config.margin_min {
            return GateDecision::Reject(RejectReason::NegMargin(Some(margin)));
        }

        let similarity = &signals.similarity;
        if similarity.global < config.sim_min && similarity.same_class < config.sim_min {
            return GateDecision::Reject(RejectReason::LowSim {
                global: similarity.global,
                same_class: similarity.same_class,
            });
        }

        GateDecision::Accept
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }
}
