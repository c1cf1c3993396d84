//! Ordered regex rules consulted before the statistical model.
//!
//! Rules match against *normalized* text (see [`crate::analysis::normalize`]),
//! so patterns should be written in lower-case ASCII. The first rule in
//! registration order whose pattern is found anywhere in the text wins.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::error::{Result, RouterError};

fn default_case_insensitive() -> bool {
    true
}

/// The persisted form of a rule: pattern source and target intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSource {
    pub pattern: String,
    pub intent: String,
    #[serde(default = "default_case_insensitive")]
    pub case_insensitive: bool,
}

impl RuleSource {
    pub fn new<P: Into<String>, I: Into<String>>(pattern: P, intent: I) -> Self {
        Self {
            pattern: pattern.into(),
            intent: intent.into(),
            case_insensitive: true,
        }
    }
}

/// A compiled pattern → intent rule.
#[derive(Debug, Clone)]
pub struct RegexRule {
    regex: Regex,
    source: RuleSource,
}

impl RegexRule {
    /// Compile a rule from its source.
    pub fn compile(source: RuleSource) -> Result<Self> {
        let regex = RegexBuilder::new(&source.pattern)
            .case_insensitive(source.case_insensitive)
            .build()
            .map_err(|e| RouterError::invalid_pattern(&source.pattern, e.to_string()))?;
        Ok(Self { regex, source })
    }

    /// Whether the pattern is found anywhere in `normalized`.
    pub fn is_match(&self, normalized: &str) -> bool {
        self.regex.is_match(normalized)
    }

    pub fn intent(&self) -> &str {
        &self.source.intent
    }

    pub fn pattern(&self) -> &str {
        &self.source.pattern
    }

    pub fn source(&self) -> &RuleSource {
        &self.source
    }
}

/// Rules in registration order.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<RegexRule>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile every source, keeping their order.
    pub fn from_sources<I>(sources: I) -> Result<Self>
    where
        I: IntoIterator<Item = RuleSource>,
    {
        let rules = sources
            .into_iter()
            .map(RegexRule::compile)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    /// Append a rule; it is checked after all existing rules.
    pub fn push(&mut self, rule: RegexRule) {
        self.rules.push(rule);
    }

    /// Intent of the first rule matching `normalized`, if any.
    pub fn find(&self, normalized: &str) -> Option<&str> {
        self.rules
            .iter()
            .find(|rule| rule.is_match(normalized))
            .map(|rule| rule.intent())
    }

    pub fn sources(&self) -> Vec<RuleSource> {
        self.rules.iter().map(|r| r.source().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> RuleSet {
        RuleSet::from_sources(vec![
            RuleSource::new(r"\b(precio|cuan?to cuesta|tarifa|planes?)\b", "precio"),
            RuleSource::new(r"\b(hola|buenas|hey|que onda|saludos)\b", "saludo"),
            RuleSource::new(r"\bplan\b", "shadowed"),
        ])
        .unwrap()
    }

    #[test]
    fn test_first_match_wins() {
        let rules = rules();
        assert_eq!(rules.find("hola, cuanto cuesta el plan pro"), Some("precio"));
        assert_eq!(rules.find("hola que tal"), Some("saludo"));
        assert_eq!(rules.find("gato"), None);
    }

    #[test]
    fn test_search_not_full_match() {
        let rules = rules();
        assert_eq!(rules.find("oye, cuanto cuesta?"), Some("precio"));
        assert_eq!(rules.find("holanda"), None);
    }

    #[test]
    fn test_case_sensitivity() {
        let insensitive = RegexRule::compile(RuleSource::new("hola", "saludo")).unwrap();
        assert!(insensitive.is_match("HOLA"));

        let sensitive = RegexRule::compile(RuleSource {
            pattern: "hola".into(),
            intent: "saludo".into(),
            case_insensitive: false,
        })
        .unwrap();
        assert!(!sensitive.is_match("HOLA"));
        assert!(sensitive.is_match("hola"));
    }

    #[test]
    fn test_invalid_pattern() {
        let err = RegexRule::compile(RuleSource::new("(unclosed", "x")).unwrap_err();
        assert!(matches!(err, RouterError::InvalidPattern { .. }));
    }

    #[test]
    fn test_sources_keep_order() {
        let sources = rules().sources();
        assert_eq!(sources.len(), 3);
        assert_eq!(sources[0].intent, "precio");
        assert_eq!(sources[2].pattern, r"\bplan\b");
        assert!(sources.iter().all(|s| s.case_insensitive));
    }
}
