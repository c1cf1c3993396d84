//! Token types for text analysis.
//!
//! A [`Token`] is the unit that flows from the tokenizer through the token
//! filters. Unigrams come straight from the tokenizer; word n-grams produced
//! by the shingle filter span several positions, recorded in
//! `position_length`.
//!
//! # Examples
//!
//! ```
//! use intent_router::analysis::token::Token;
//!
//! let token = Token::with_offsets("world", 1, 6, 11);
//! assert_eq!(token.text, "world");
//! assert_eq!(token.start_offset, 6);
//! assert_eq!(token.position_length, 1);
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single unit of text after tokenization.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// The text content of the token
    pub text: String,

    /// The position of the token in the original token stream (0-based)
    pub position: usize,

    /// The byte offset where this token starts in the analyzed text
    pub start_offset: usize,

    /// The byte offset where this token ends in the analyzed text
    pub end_offset: usize,

    /// How many positions this token spans (default: 1).
    ///
    /// A bigram built from two adjacent words has `position_length == 2`.
    pub position_length: usize,
}

impl Token {
    /// Create a new token at the given position.
    pub fn new<S: Into<String>>(text: S, position: usize) -> Self {
        let text = text.into();
        let end_offset = text.len();
        Token {
            text,
            position,
            start_offset: 0,
            end_offset,
            position_length: 1,
        }
    }

    /// Create a new token with explicit byte offsets.
    pub fn with_offsets<S: Into<String>>(
        text: S,
        position: usize,
        start_offset: usize,
        end_offset: usize,
    ) -> Self {
        Token {
            text: text.into(),
            position,
            start_offset,
            end_offset,
            position_length: 1,
        }
    }

    /// Set how many positions this token spans.
    pub fn with_position_length(mut self, length: usize) -> Self {
        self.position_length = length;
        self
    }

    /// Length of the token text in bytes.
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// Whether the token text is empty.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.text, self.position)
    }
}

/// A boxed iterator of tokens.
pub type TokenStream = Box<dyn Iterator<Item = Token>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_defaults() {
        let token = Token::new("hello", 3);
        assert_eq!(token.position, 3);
        assert_eq!(token.end_offset, 5);
        assert_eq!(token.position_length, 1);
        assert_eq!(token.to_string(), "hello@3");
    }

    #[test]
    fn test_position_length() {
        let token = Token::with_offsets("hi there", 0, 0, 8).with_position_length(2);
        assert_eq!(token.position_length, 2);
        assert_eq!(token.len(), 8);
        assert!(!token.is_empty());
    }
}
