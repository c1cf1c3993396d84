//! Tokenizers that split normalized text into word tokens.
//!
//! # Available Tokenizers
//!
//! - [`regex::RegexTokenizer`] - Regex-based tokenization (the vectorizer default)
//!
//! # Examples
//!
//! ```
//! use intent_router::analysis::tokenizer::Tokenizer;
//! use intent_router::analysis::tokenizer::regex::RegexTokenizer;
//!
//! let tokenizer = RegexTokenizer::new().unwrap();
//! let tokens: Vec<_> = tokenizer.tokenize("hi there a").unwrap().collect();
//! assert_eq!(tokens.len(), 2);
//! ```

use crate::analysis::token::TokenStream;
use crate::error::Result;

/// Trait for tokenizers that convert text into tokens.
///
/// The trait requires `Send + Sync` so a fitted vectorizer can be shared
/// between concurrent `route` calls.
pub trait Tokenizer: Send + Sync {
    /// Tokenize the given text into a stream of tokens.
    fn tokenize(&self, text: &str) -> Result<TokenStream>;

    /// Get the name of this tokenizer (for debugging and configuration).
    fn name(&self) -> &'static str;
}

pub mod regex;
