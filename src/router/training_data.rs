//! JSON description of intents, rules and fallback used by the CLI.
//!
//! ```json
//! {
//!   "intents": [
//!     {"name": "greeting", "examples": ["hello", "hi there"], "response": "Hello!"}
//!   ],
//!   "rules": [{"pattern": "\\bhi\\b", "intent": "greeting"}],
//!   "fallback": "Sorry?"
//! }
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, RouterError};
use crate::router::dispatch::DispatchContext;
use crate::router::engine::{Router, static_response};
use crate::router::rules::RuleSource;

/// One intent of an intents file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentSpec {
    pub name: String,
    #[serde(default)]
    pub examples: Vec<String>,
    /// Fixed handler output; when absent the handler echoes the intent name.
    #[serde(default)]
    pub response: Option<String>,
}

/// Contents of an intents file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct IntentsFile {
    #[serde(default)]
    pub intents: Vec<IntentSpec>,
    #[serde(default)]
    pub rules: Vec<RuleSource>,
    /// Fixed fallback output.
    #[serde(default)]
    pub fallback: Option<String>,
}

impl IntentsFile {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let file: IntentsFile = serde_json::from_str(content)?;
        file.validate()?;
        Ok(file)
    }

    fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for intent in &self.intents {
            if intent.name.trim().is_empty() {
                return Err(RouterError::invalid_argument("intent with an empty name"));
            }
            if !seen.insert(intent.name.as_str()) {
                return Err(RouterError::invalid_argument(format!(
                    "intent '{}' is defined twice",
                    intent.name
                )));
            }
        }
        Ok(())
    }

    /// Register examples and rules on `router`, then attach handlers.
    pub fn apply(&self, router: &mut Router) -> Result<()> {
        for intent in &self.intents {
            router.add_examples(intent.name.clone(), intent.examples.iter().cloned());
        }
        for rule in &self.rules {
            router.add_rule_with_case(
                rule.pattern.clone(),
                rule.intent.clone(),
                rule.case_insensitive,
            )?;
        }
        self.apply_handlers(router);
        Ok(())
    }

    /// Attach handlers and the fallback only, e.g. to a loaded router.
    ///
    /// Rule intents without an intent entry get an echo handler too.
    pub fn apply_handlers(&self, router: &mut Router) {
        for intent in &self.intents {
            let name = intent.name.clone();
            match &intent.response {
                Some(response) => router.register_handler(name, static_response(response.clone())),
                None => router.register_handler(name, echo_intent),
            }
        }
        for rule in &self.rules {
            if !router.has_handler(&rule.intent) {
                router.register_handler(rule.intent.clone(), echo_intent);
            }
        }
        if let Some(fallback) = &self.fallback {
            router.set_fallback(static_response(fallback.clone()));
        }
    }
}

/// Handler answering the name of the routed intent.
pub fn echo_intent(ctx: &DispatchContext) -> String {
    ctx.intent.clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "intents": [
            {"name": "saludo", "examples": ["hola", "buenas tardes"], "response": "¡Hola!"},
            {"name": "precio", "examples": ["cuanto cuesta", "que precio tiene"]}
        ],
        "rules": [
            {"pattern": "\\bhola\\b", "intent": "saludo"},
            {"pattern": "\\bpromo\\b", "intent": "promocion", "case_insensitive": false}
        ],
        "fallback": "No entendí"
    }"#;

    #[test]
    fn test_parse() {
        let file = IntentsFile::from_json(SAMPLE).unwrap();
        assert_eq!(file.intents.len(), 2);
        assert_eq!(file.intents[1].response, None);
        assert!(file.rules[0].case_insensitive);
        assert!(!file.rules[1].case_insensitive);
        assert_eq!(file.fallback.as_deref(), Some("No entendí"));
    }

    #[test]
    fn test_duplicate_intent_rejected() {
        let json = r#"{"intents": [{"name": "a"}, {"name": "a"}]}"#;
        assert!(IntentsFile::from_json(json).is_err());
    }

    #[test]
    fn test_apply_registers_everything() {
        let file = IntentsFile::from_json(SAMPLE).unwrap();
        let mut router = Router::new();
        file.apply(&mut router).unwrap();

        assert_eq!(router.examples().len(), 4);
        assert_eq!(router.rules().len(), 2);
        assert!(router.has_handler("saludo"));
        assert!(router.has_handler("promocion"));

        let result = router.route("Hola!").unwrap();
        assert_eq!(result.output, "¡Hola!");

        let result = router.route("una promo").unwrap();
        assert_eq!(result.intent, "promocion");
        assert_eq!(result.output, "promocion");
    }
}
