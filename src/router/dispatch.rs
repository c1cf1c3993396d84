//! Handler lookup and invocation.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::router::gate::RouteSignals;

/// Intent name reported for every fallback route.
pub const DEFAULT_INTENT: &str = "default";

/// Reason reported when an intent is accepted but has no handler.
pub const NO_HANDLER: &str = "no_handler";

/// Message returned by the built-in fallback handler.
pub const DEFAULT_FALLBACK_MESSAGE: &str =
    "Sorry, I didn't understand that. Could you say it another way?";

/// What a handler gets to see about the routed utterance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchContext {
    /// The original, un-normalized text.
    pub text: String,
    pub intent: String,
    pub score: f64,
    /// Set for fallback routes.
    pub reason: Option<String>,
}

/// A function producing the response for a routed intent.
///
/// Implemented for every `Fn(&DispatchContext) -> String + Send + Sync`.
pub trait IntentHandler: Send + Sync {
    fn handle(&self, ctx: &DispatchContext) -> String;
}

impl<F> IntentHandler for F
where
    F: Fn(&DispatchContext) -> String + Send + Sync,
{
    fn handle(&self, ctx: &DispatchContext) -> String {
        self(ctx)
    }
}

/// The outcome of routing one utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteResult {
    /// Accepted intent, or [`DEFAULT_INTENT`].
    pub intent: String,
    /// Confidence in [0, 1]; 1.0 for rule matches, 0.0 for fallbacks.
    pub score: f64,
    /// Handler output, passed through untouched.
    pub output: String,
    /// Diagnostic reason for fallback routes.
    pub reason: Option<String>,
    /// Classifier signals, absent for rule matches.
    pub signals: Option<RouteSignals>,
}

impl RouteResult {
    pub fn is_default(&self) -> bool {
        self.intent == DEFAULT_INTENT
    }
}

/// Registered handlers plus the fallback.
pub struct Dispatcher {
    handlers: HashMap<String, Arc<dyn IntentHandler>>,
    fallback: Arc<dyn IntentHandler>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut intents: Vec<&String> = self.handlers.keys().collect();
        intents.sort();
        f.debug_struct("Dispatcher")
            .field("handlers", &intents)
            .finish()
    }
}

impl Dispatcher {
    /// A dispatcher whose fallback always answers `fallback_message`.
    pub fn new<S: Into<String>>(fallback_message: S) -> Self {
        let message = fallback_message.into();
        Self {
            handlers: HashMap::new(),
            fallback: Arc::new(move |_: &DispatchContext| message.clone()),
        }
    }

    pub fn register(&mut self, intent: String, handler: Arc<dyn IntentHandler>) {
        self.handlers.insert(intent, handler);
    }

    pub fn set_fallback(&mut self, handler: Arc<dyn IntentHandler>) {
        self.fallback = handler;
    }

    pub fn has_handler(&self, intent: &str) -> bool {
        self.handlers.contains_key(intent)
    }

    /// Invoke the handler of `intent`, or fall back with [`NO_HANDLER`].
    pub fn dispatch(&self, intent: &str, text: &str, score: f64) -> RouteResult {
        let Some(handler) = self.handlers.get(intent) else {
            return self.default_route(text, NO_HANDLER.to_string());
        };

        let ctx = DispatchContext {
            text: text.to_string(),
            intent: intent.to_string(),
            score,
            reason: None,
        };
        RouteResult {
            intent: ctx.intent.clone(),
            score,
            output: handler.handle(&ctx),
            reason: None,
            signals: None,
        }
    }

    /// Invoke the fallback for a rejected or unhandled route.
    pub fn default_route(&self, text: &str, reason: String) -> RouteResult {
        let ctx = DispatchContext {
            text: text.to_string(),
            intent: DEFAULT_INTENT.to_string(),
            score: 0.0,
            reason: Some(reason),
        };
        RouteResult {
            intent: DEFAULT_INTENT.to_string(),
            score: 0.0,
            output: self.fallback.handle(&ctx),
            reason: ctx.reason,
            signals: None,
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(DEFAULT_FALLBACK_MESSAGE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dispatcher() -> Dispatcher {
        let mut dispatcher = Dispatcher::default();
        dispatcher.register(
            "greeting".to_string(),
            Arc::new(|ctx: &DispatchContext| format!("hello! ({:.1})", ctx.score)),
        );
        dispatcher
    }

    #[test]
    fn test_dispatch_to_handler() {
        let result = dispatcher().dispatch("greeting", "hi", 1.0);
        assert_eq!(result.intent, "greeting");
        assert_eq!(result.score, 1.0);
        assert_eq!(result.output, "hello! (1.0)");
        assert!(result.reason.is_none());
        assert!(!result.is_default());
    }

    #[test]
    fn test_missing_handler_falls_back() {
        let result = dispatcher().dispatch("pricing", "how much", 0.8);
        assert!(result.is_default());
        assert_eq!(result.score, 0.0);
        assert_eq!(result.reason.as_deref(), Some(NO_HANDLER));
        assert_eq!(result.output, DEFAULT_FALLBACK_MESSAGE);
    }

    #[test]
    fn test_custom_fallback_sees_reason() {
        let mut dispatcher = dispatcher();
        dispatcher.set_fallback(Arc::new(|ctx: &DispatchContext| {
            format!(
                "(default) {} [{}]",
                ctx.text,
                ctx.reason.as_deref().unwrap_or("")
            )
        }));

        let result = dispatcher.default_route("gato", "low_proba 0.300".to_string());
        assert_eq!(result.output, "(default) gato [low_proba 0.300]");
        assert_eq!(result.intent, DEFAULT_INTENT);
    }

    #[test]
    fn test_has_handler() {
        let dispatcher = dispatcher();
        assert!(dispatcher.has_handler("greeting"));
        assert!(!dispatcher.has_handler("pricing"));
        assert!(format!("{dispatcher:?}").contains("greeting"));
    }
}
