//! The intent router.
//!
//! A [`Router`] is configured in a build phase (`&mut self`: intents, rules,
//! handlers) and then trained or loaded and shared for serving (`&self`).
//! Rules, model and similarity corpus are published together as one
//! immutable [`Snapshot`]; `route` clones the snapshot pointer and works
//! without holding the lock, while `train` and `load` swap in a complete new
//! snapshot in a single write.

use std::path::Path;
use std::sync::Arc;

use log::{debug, info};
use parking_lot::RwLock;

use crate::analysis::normalize;
use crate::error::{Result, RouterError};
use crate::router::config::RouterConfig;
use crate::router::dispatch::{DispatchContext, Dispatcher, IntentHandler, RouteResult};
use crate::router::gate::{Gate, GateDecision, GateOverrides, RouteSignals};
use crate::router::model::{FittedModel, Snapshot, TrainedState, TrainingExample};
use crate::router::persist::{self, ArtifactRef};
use crate::router::rules::{RegexRule, RuleSet, RuleSource};

/// Hybrid rule-based and statistical intent router.
///
/// # Examples
///
/// ```
/// use intent_router::router::{DispatchContext, Router};
///
/// let mut router = Router::new();
/// router.add_intent("greeting", ["hello", "hi there"], |_: &DispatchContext| {
///     "Hello!".to_string()
/// });
/// router.add_rule(r"\bhi\b", "greeting").unwrap();
///
/// // Rules work before any training.
/// let result = router.route("hi").unwrap();
/// assert_eq!(result.intent, "greeting");
/// assert_eq!(result.score, 1.0);
/// ```
pub struct Router {
    config: RouterConfig,
    examples: Vec<TrainingExample>,
    dispatcher: Dispatcher,
    snapshot: RwLock<Arc<Snapshot>>,
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let snapshot = self.snapshot();
        f.debug_struct("Router")
            .field("examples", &self.examples.len())
            .field("rules", &snapshot.rules.len())
            .field("trained", &snapshot.trained.is_some())
            .field("dispatcher", &self.dispatcher)
            .finish()
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    /// An empty router with the default configuration.
    pub fn new() -> Self {
        Self::with_config(RouterConfig::default())
    }

    pub fn with_config(config: RouterConfig) -> Self {
        let dispatcher = Dispatcher::new(config.fallback_message.clone());
        Self {
            config,
            examples: Vec::new(),
            dispatcher,
            snapshot: RwLock::new(Arc::new(Snapshot::default())),
        }
    }

    /// A router serving a saved artifact. Handlers must be registered afterwards.
    pub fn from_artifact<P: AsRef<Path>>(path: P, config: RouterConfig) -> Result<Self> {
        let router = Self::with_config(config);
        router.load(path)?;
        Ok(router)
    }

    /// Register an intent with its example utterances and handler.
    ///
    /// Registering the same name again appends the examples and replaces
    /// the handler.
    pub fn add_intent<N, I, S, H>(&mut self, name: N, examples: I, handler: H)
    where
        N: Into<String>,
        I: IntoIterator<Item = S>,
        S: Into<String>,
        H: IntentHandler + 'static,
    {
        let name = name.into();
        self.add_examples(name.clone(), examples);
        self.dispatcher.register(name, Arc::new(handler));
    }

    /// Register training examples for an intent without touching its handler.
    pub fn add_examples<N, I, S>(&mut self, name: N, examples: I)
    where
        N: Into<String>,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        self.examples.extend(
            examples
                .into_iter()
                .map(|text| TrainingExample::new(text, name.clone())),
        );
    }

    /// Attach or replace the handler of an intent, e.g. after [`load`](Self::load).
    pub fn register_handler<N, H>(&mut self, name: N, handler: H)
    where
        N: Into<String>,
        H: IntentHandler + 'static,
    {
        self.dispatcher.register(name.into(), Arc::new(handler));
    }

    pub fn set_fallback<H>(&mut self, handler: H)
    where
        H: IntentHandler + 'static,
    {
        self.dispatcher.set_fallback(Arc::new(handler));
    }

    /// Append a case-insensitive rule.
    pub fn add_rule<P, I>(&mut self, pattern: P, intent: I) -> Result<()>
    where
        P: Into<String>,
        I: Into<String>,
    {
        self.add_rule_with_case(pattern, intent, true)
    }

    /// Append a rule. Rules are matched against normalized text in
    /// registration order; the first match wins.
    ///
    /// Normalized text is already lower-cased, so `case_insensitive = false`
    /// only matters for patterns with upper-case literals, and those never
    /// match.
    pub fn add_rule_with_case<P, I>(
        &mut self,
        pattern: P,
        intent: I,
        case_insensitive: bool,
    ) -> Result<()>
    where
        P: Into<String>,
        I: Into<String>,
    {
        let rule = RegexRule::compile(RuleSource {
            pattern: pattern.into(),
            intent: intent.into(),
            case_insensitive,
        })?;

        let snapshot = self.snapshot.get_mut();
        let mut rules = RuleSet::clone(&snapshot.rules);
        rules.push(rule);
        *snapshot = Arc::new(Snapshot {
            rules: Arc::new(rules),
            trained: snapshot.trained.clone(),
        });
        Ok(())
    }

    /// Fit the model on the registered examples and publish it.
    ///
    /// The configuration is validated first, so out-of-range thresholds or
    /// classifier settings fail here instead of producing a broken model.
    pub fn train(&self) -> Result<()> {
        self.config.validate()?;
        if self.examples.is_empty() {
            return Err(RouterError::NoTrainingExamples);
        }

        info!(
            "training on {} examples across {} intents",
            self.examples.len(),
            self.intent_names().len()
        );
        let (model, similarity) = FittedModel::fit(
            &self.examples,
            &self.config.vectorizer,
            &self.config.classifier,
        )?;
        info!(
            "trained {} classes with a vocabulary of {} terms",
            model.classes().len(),
            model.vocabulary_size()
        );

        let trained = Arc::new(TrainedState {
            model,
            corpus: self.examples.clone(),
            similarity,
        });

        let mut guard = self.snapshot.write();
        let rules = guard.rules.clone();
        *guard = Arc::new(Snapshot {
            rules,
            trained: Some(trained),
        });
        Ok(())
    }

    /// Route with the configured thresholds.
    pub fn route(&self, text: &str) -> Result<RouteResult> {
        self.route_with(text, &GateOverrides::default())
    }

    /// Route with per-call threshold overrides.
    pub fn route_with(&self, text: &str, overrides: &GateOverrides) -> Result<RouteResult> {
        let snapshot = self.snapshot();
        let normalized = normalize(text);

        if let Some(intent) = snapshot.rules.find(&normalized) {
            debug!("rule match: {intent}");
            return Ok(self.dispatcher.dispatch(intent, text, 1.0));
        }

        let trained = snapshot.trained.as_ref().ok_or(RouterError::NotTrained)?;
        let vector = trained.model.vectorize(text)?;
        let prediction = trained.model.predict(&vector)?;
        let label = trained.model.label(prediction.top);

        let signals = RouteSignals {
            probability: prediction.top_probability,
            margin: prediction.margin,
            similarity: trained.similarity.max_cosine(&vector, label),
        };

        let gate = Gate::new(self.config.gate.with_overrides(overrides));
        let mut result = match gate.evaluate(&signals) {
            GateDecision::Accept => {
                debug!("accepted {label} p={:.3}", signals.probability);
                self.dispatcher.dispatch(label, text, signals.probability)
            }
            GateDecision::Reject(reason) => {
                debug!("rejected {label}: {reason}");
                self.dispatcher.default_route(text, reason.to_string())
            }
        };
        result.signals = Some(signals);
        Ok(result)
    }

    /// Save the current model, rules and corpus as one artifact.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let snapshot = self.snapshot();
        let trained = snapshot.trained.as_ref().ok_or(RouterError::NothingToSave)?;
        let rules = snapshot.rules.sources();

        persist::write_artifact(
            path.as_ref(),
            &ArtifactRef::new(&trained.model, &rules, &trained.corpus),
        )?;
        info!(
            "saved router with {} examples and {} rules to {}",
            trained.corpus.len(),
            rules.len(),
            path.as_ref().display()
        );
        Ok(())
    }

    /// Replace model, rules and corpus with those of a saved artifact.
    ///
    /// The similarity corpus is rebuilt with the restored vectorizer; nothing
    /// is retrained. Handlers are not part of the artifact.
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let artifact = persist::read_artifact(path.as_ref())?;
        let rules = RuleSet::from_sources(artifact.rules)?;
        let similarity = artifact.model.similarity_index(&artifact.corpus)?;

        info!(
            "loaded router from {} ({} classes, {} examples, {} rules, created {})",
            path.as_ref().display(),
            artifact.model.classes().len(),
            artifact.corpus.len(),
            rules.len(),
            artifact.info.created_at
        );

        let trained = Arc::new(TrainedState {
            model: artifact.model,
            corpus: artifact.corpus,
            similarity,
        });
        *self.snapshot.write() = Arc::new(Snapshot {
            rules: Arc::new(rules),
            trained: Some(trained),
        });
        Ok(())
    }

    pub fn is_trained(&self) -> bool {
        self.snapshot().trained.is_some()
    }

    /// Intent classes of the current model, empty before training.
    pub fn classes(&self) -> Vec<String> {
        self.snapshot()
            .trained
            .as_ref()
            .map(|t| t.model.classes().to_vec())
            .unwrap_or_default()
    }

    /// Sources of the active rules, in match order.
    pub fn rules(&self) -> Vec<RuleSource> {
        self.snapshot().rules.sources()
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Examples registered in this process, in insertion order.
    pub fn examples(&self) -> &[TrainingExample] {
        &self.examples
    }

    /// Whether a handler is registered for `intent`.
    pub fn has_handler(&self, intent: &str) -> bool {
        self.dispatcher.has_handler(intent)
    }

    fn intent_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.examples.iter().map(|e| e.intent.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        names
    }

    fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot.read().clone()
    }
}

/// Handler answering a fixed response.
pub fn static_response<S: Into<String>>(response: S) -> impl IntentHandler + 'static {
    let response = response.into();
    move |_: &DispatchContext| response.clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn echo(ctx: &DispatchContext) -> String {
        format!("{}:{}", ctx.intent, ctx.text)
    }

    fn trained_router() -> Router {
        let mut router = Router::new();
        router.add_intent(
            "greeting",
            [
                "hello",
                "hello there",
                "hi there",
                "good morning",
                "good afternoon",
                "hey hello friend",
                "greetings friend",
                "good evening",
            ],
            echo,
        );
        router.add_intent(
            "pricing",
            [
                "how much does it cost",
                "what is the price",
                "price of the plan",
                "how much is the subscription",
                "cost of the subscription",
                "what does the plan cost",
                "pricing for the plan",
                "how much do you charge",
            ],
            echo,
        );
        router.train().unwrap();
        router
    }

    #[test]
    fn test_rule_routes_untrained() {
        let mut router = Router::new();
        router.register_handler("greeting", echo);
        router.add_rule(r"\bhi\b", "greeting").unwrap();

        let result = router.route("Hi!").unwrap();
        assert_eq!(result.intent, "greeting");
        assert_eq!(result.score, 1.0);
        assert_eq!(result.output, "greeting:Hi!");
        assert!(result.signals.is_none());
    }

    #[test]
    fn test_rules_match_normalized_text() {
        let mut router = Router::new();
        router.register_handler("pricing", echo);
        router.add_rule(r"cuanto cuesta", "pricing").unwrap();

        assert_eq!(router.route("¿Cuánto CUESTA?").unwrap().intent, "pricing");
    }

    #[test]
    fn test_case_sensitive_rule() {
        let mut router = Router::new();
        router.register_handler("shout", echo);
        router.add_rule_with_case("HEY", "shout", false).unwrap();

        // Input is lowercased before matching, so an uppercase literal never matches.
        assert!(matches!(router.route("HEY"), Err(RouterError::NotTrained)));

        router.add_rule_with_case("hey", "shout", false).unwrap();
        assert_eq!(router.route("HEY").unwrap().intent, "shout");
    }

    #[test]
    fn test_invalid_rule_rejected() {
        let mut router = Router::new();
        let err = router.add_rule("(unclosed", "x").unwrap_err();
        assert!(matches!(err, RouterError::InvalidPattern { .. }));
        assert!(router.rules().is_empty());
    }

    #[test]
    fn test_route_untrained_without_rule() {
        let router = Router::new();
        assert!(matches!(router.route("hello"), Err(RouterError::NotTrained)));
    }

    #[test]
    fn test_train_preconditions() {
        let router = Router::new();
        assert!(matches!(router.train(), Err(RouterError::NoTrainingExamples)));

        let mut router = Router::new();
        router.add_examples("only", ["one", "two"]);
        assert!(matches!(
            router.train(),
            Err(RouterError::InsufficientClasses(1))
        ));
        assert!(!router.is_trained());
    }

    #[test]
    fn test_train_validates_config() {
        let mut config = RouterConfig::default();
        config.gate.proba_min = 5.0;
        let mut router = Router::with_config(config);
        router.add_examples("greeting", ["hello", "hi there"]);
        router.add_examples("pricing", ["how much does it cost"]);
        let err = router.train().unwrap_err();
        assert!(err.to_string().contains("proba_min"));
        assert!(!router.is_trained());

        let mut config = RouterConfig::default();
        config.classifier.folds = 0;
        let mut router = Router::with_config(config);
        router.add_examples("greeting", ["hello", "hi there"]);
        router.add_examples("pricing", ["how much does it cost"]);
        assert!(router.train().unwrap_err().to_string().contains("folds"));
    }

    #[test]
    fn test_trained_routing() {
        let router = trained_router();
        assert!(router.is_trained());
        assert_eq!(router.classes(), vec!["greeting", "pricing"]);

        let result = router.route("how much does the plan cost").unwrap();
        assert_eq!(result.intent, "pricing");
        assert!(result.score >= 0.55);
        let signals = result.signals.unwrap();
        assert_eq!(signals.probability, result.score);
        assert!(signals.similarity.global > 0.15);
    }

    #[test]
    fn test_unrelated_text_goes_to_default() {
        let router = trained_router();
        let result = router.route("xyzxyz123").unwrap();
        assert!(result.is_default());
        assert_eq!(result.score, 0.0);
        assert!(result.reason.is_some());
    }

    #[test]
    fn test_overrides_force_low_proba() {
        let router = trained_router();
        let result = router
            .route_with("hello there", &GateOverrides::new().proba_min(0.999))
            .unwrap();
        assert!(result.is_default());
        assert!(result.reason.unwrap().starts_with("low_proba"));
    }

    #[test]
    fn test_missing_handler_routes_to_default() {
        let mut router = Router::new();
        router.add_examples("greeting", ["hello", "hello there", "hi there", "hey hello"]);
        router.add_examples(
            "pricing",
            ["how much", "how much does it cost", "the price", "price please"],
        );
        router.train().unwrap();

        let result = router
            .route_with("hello there", &GateOverrides::new().proba_min(0.0))
            .unwrap();
        assert!(result.is_default());
        assert_eq!(result.reason.as_deref(), Some("no_handler"));
    }

    #[test]
    fn test_static_response_handler() {
        let mut router = Router::new();
        router.register_handler("greeting", static_response("Hello!"));
        router.add_rule(r"\bhello\b", "greeting").unwrap();
        assert_eq!(router.route("hello").unwrap().output, "Hello!");
    }

    #[test]
    fn test_save_requires_model() {
        let dir = tempfile::TempDir::new().unwrap();
        let router = Router::new();
        assert!(matches!(
            router.save(dir.path().join("r.bin")),
            Err(RouterError::NothingToSave)
        ));
    }

    #[test]
    fn test_router_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Router>();
    }
}
