//! Regex-based tokenizer implementation.

use std::sync::Arc;

use regex::Regex;

use super::Tokenizer;
use crate::analysis::token::{Token, TokenStream};
use crate::error::{Result, RouterError};

/// Words of two or more word characters, the usual bag-of-words token rule.
pub const DEFAULT_TOKEN_PATTERN: &str = r"\b\w\w+\b";

/// A regex-based tokenizer that extracts every match of a pattern as a token.
#[derive(Clone, Debug)]
pub struct RegexTokenizer {
    /// The regex pattern used to extract tokens
    pattern: Arc<Regex>,
}

impl RegexTokenizer {
    /// Create a new regex tokenizer with [`DEFAULT_TOKEN_PATTERN`].
    pub fn new() -> Result<Self> {
        Self::with_pattern(DEFAULT_TOKEN_PATTERN)
    }

    /// Create a new regex tokenizer with a custom pattern.
    pub fn with_pattern(pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern)
            .map_err(|e| RouterError::analysis(format!("Invalid regex pattern: {e}")))?;

        Ok(RegexTokenizer {
            pattern: Arc::new(regex),
        })
    }

    /// Get the regex pattern used by this tokenizer.
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }
}

impl Tokenizer for RegexTokenizer {
    fn tokenize(&self, text: &str) -> Result<TokenStream> {
        let tokens: Vec<Token> = self
            .pattern
            .find_iter(text)
            .enumerate()
            .map(|(position, mat)| {
                Token::with_offsets(mat.as_str(), position, mat.start(), mat.end())
            })
            .collect();

        Ok(Box::new(tokens.into_iter()))
    }

    fn name(&self) -> &'static str {
        "regex"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regex_tokenizer() {
        let tokenizer = RegexTokenizer::new().unwrap();
        let tokens: Vec<Token> = tokenizer.tokenize("hello world").unwrap().collect();

        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].text, "hello");
        assert_eq!(tokens[0].position, 0);
        assert_eq!(tokens[0].start_offset, 0);
        assert_eq!(tokens[0].end_offset, 5);

        assert_eq!(tokens[1].text, "world");
        assert_eq!(tokens[1].position, 1);
        assert_eq!(tokens[1].start_offset, 6);
        assert_eq!(tokens[1].end_offset, 11);
    }

    #[test]
    fn test_single_characters_are_skipped() {
        let tokenizer = RegexTokenizer::new().unwrap();
        let tokens: Vec<String> = tokenizer
            .tokenize("i want a plan, ok?")
            .unwrap()
            .map(|t| t.text)
            .collect();

        assert_eq!(tokens, vec!["want", "plan", "ok"]);
    }

    #[test]
    fn test_custom_pattern() {
        let tokenizer = RegexTokenizer::with_pattern(r"\S+").unwrap();
        assert_eq!(tokenizer.pattern(), r"\S+");
        assert_eq!(tokenizer.tokenize("a b c").unwrap().count(), 3);
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(RegexTokenizer::with_pattern("(").is_err());
    }

    #[test]
    fn test_tokenizer_name() {
        assert_eq!(RegexTokenizer::new().unwrap().name(), "regex");
    }
}
