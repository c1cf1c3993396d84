//! Lower-casing and diacritic folding.
//!
//! This is the router's normalizer: rule patterns are matched against its
//! output and the vectorizer tokenizes its output, so "Café" and "cafe"
//! are indistinguishable everywhere downstream.

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use super::CharFilter;

/// Letters that have no canonical decomposition to an ASCII base.
const FOLDING_TABLE: &[(char, &str)] = &[
    ('ß', "ss"),
    ('æ', "ae"),
    ('œ', "oe"),
    ('ø', "o"),
    ('đ', "d"),
    ('ð', "d"),
    ('ł', "l"),
    ('þ', "th"),
    ('ı', "i"),
];

/// A char filter that lower-cases text and strips diacritics.
///
/// Text is lower-cased, decomposed with NFKD, combining marks are dropped and
/// the few remaining letters without a decomposition are mapped through a
/// small table.
#[derive(Debug, Clone, Copy, Default)]
pub struct AsciiFoldingCharFilter;

impl AsciiFoldingCharFilter {
    pub fn new() -> Self {
        Self
    }

    fn fold_char(c: char, out: &mut String) {
        match FOLDING_TABLE.iter().find(|(from, _)| *from == c) {
            Some((_, to)) => out.push_str(to),
            None => out.push(c),
        }
    }
}

impl CharFilter for AsciiFoldingCharFilter {
    fn filter(&self, input: &str) -> String {
        let lowered = input.to_lowercase();
        let mut folded = String::with_capacity(lowered.len());
        for c in lowered.nfkd().filter(|c| !is_combining_mark(*c)) {
            Self::fold_char(c, &mut folded);
        }
        folded
    }

    fn name(&self) -> &'static str {
        "ascii_folding"
    }
}
