//! Token filters that transform token streams produced by tokenizers.
//!
//! # Available Filters
//!
//! - [`shingle::ShingleFilter`] - Emits word n-grams ("shingles") over adjacent tokens
//!
//! # Filter Chaining
//!
//! ```text
//! Tokenizer → Shingle(1..=2) → Vectorizer
//! ```

use crate::analysis::token::TokenStream;
use crate::error::Result;

/// Trait for filters that transform token streams.
pub trait Filter: Send + Sync {
    /// Apply this filter to a token stream.
    fn filter(&self, tokens: TokenStream) -> Result<TokenStream>;

    /// Get the name of this filter (for debugging and configuration).
    fn name(&self) -> &'static str;
}

pub mod shingle;
