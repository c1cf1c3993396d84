//! Analyzers that turn raw text into the token stream the vectorizer counts.
//!
//! ```text
//! Raw Text → Char Filters → Tokenizer → Token Filters → Tokens
//! ```
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//!
//! use intent_router::analysis::analyzer::Analyzer;
//! use intent_router::analysis::analyzer::pipeline::PipelineAnalyzer;
//! use intent_router::analysis::char_filter::ascii_folding::AsciiFoldingCharFilter;
//! use intent_router::analysis::tokenizer::regex::RegexTokenizer;
//!
//! let analyzer = PipelineAnalyzer::new(Arc::new(RegexTokenizer::new().unwrap()))
//!     .add_char_filter(Arc::new(AsciiFoldingCharFilter::new()));
//! let tokens: Vec<_> = analyzer.analyze("Qué Tal").unwrap().collect();
//!
//! assert_eq!(tokens[0].text, "que");
//! assert_eq!(tokens[1].text, "tal");
//! ```

use crate::analysis::token::TokenStream;
use crate::error::Result;

pub mod pipeline;

/// Trait for analyzers that convert text into processed tokens.
///
/// The trait requires `Send + Sync` because the fitted vectorizer holding an
/// analyzer is shared by concurrent routing calls.
pub trait Analyzer: Send + Sync {
    /// Analyze the given text and return a stream of tokens.
    fn analyze(&self, text: &str) -> Result<TokenStream>;

    /// Get the name of this analyzer (for debugging and configuration).
    fn name(&self) -> &str;
}
