//! Char filters that pre-process text before it is tokenized.
//!
//! # Available Filters
//!
//! - [`ascii_folding::AsciiFoldingCharFilter`] - Lower-casing plus diacritic stripping
//!
//! # Examples
//!
//! ```
//! use intent_router::analysis::char_filter::CharFilter;
//! use intent_router::analysis::char_filter::ascii_folding::AsciiFoldingCharFilter;
//!
//! let filter = AsciiFoldingCharFilter::new();
//! assert_eq!(filter.filter("Buenos Días"), "buenos dias");
//! ```

pub mod ascii_folding;

/// Trait for character filters that transform text before tokenization.
pub trait CharFilter: Send + Sync {
    /// Apply this filter to the input text.
    fn filter(&self, input: &str) -> String;

    /// Get the name of this char filter.
    fn name(&self) -> &'static str;
}
