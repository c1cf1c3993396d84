//! Text analysis for the intent router.
//!
//! The normalizer ([`normalize`]) and the vectorizer's tokenization both live
//! here, built from the same char filter so that rules and the statistical
//! model see identical text.

pub mod analyzer;
pub mod char_filter;
pub mod token;
pub mod token_filter;
pub mod tokenizer;

use crate::analysis::char_filter::CharFilter;
use crate::analysis::char_filter::ascii_folding::AsciiFoldingCharFilter;

/// Canonicalize raw text: lower-case and strip diacritics.
///
/// ```
/// use intent_router::analysis::normalize;
///
/// assert_eq!(normalize("Café"), normalize("cafe"));
/// ```
pub fn normalize(text: &str) -> String {
    AsciiFoldingCharFilter::new().filter(text)
}
