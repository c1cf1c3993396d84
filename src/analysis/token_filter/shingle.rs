//! Word n-gram (shingle) filter.

use crate::analysis::token::{Token, TokenStream};
use crate::analysis::token_filter::Filter;
use crate::error::{Result, RouterError};

/// A filter that emits every run of `min_size..=max_size` adjacent tokens as
/// one token, words joined by a single space.
///
/// With `min_size == 1` the original unigrams are kept, so `1..=2` over
/// "how much does" yields `how`, `how much`, `much`, `much does`, `does`.
#[derive(Debug, Clone)]
pub struct ShingleFilter {
    min_size: usize,
    max_size: usize,
}

impl ShingleFilter {
    /// Create a shingle filter for n-grams of `min_size..=max_size` words.
    pub fn new(min_size: usize, max_size: usize) -> Result<Self> {
        if min_size == 0 || max_size < min_size {
            return Err(RouterError::analysis(format!(
                "Invalid n-gram range ({min_size}, {max_size})"
            )));
        }
        Ok(ShingleFilter { min_size, max_size })
    }

    pub fn min_size(&self) -> usize {
        self.min_size
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }
}

impl Filter for ShingleFilter {
    fn filter(&self, tokens: TokenStream) -> Result<TokenStream> {
        let words: Vec<Token> = tokens.collect();
        let mut shingles = Vec::with_capacity(words.len() * (self.max_size - self.min_size + 1));

        for start in 0..words.len() {
            for size in self.min_size..=self.max_size {
                let end = start + size;
                if end > words.len() {
                    break;
                }
                let run = &words[start..end];
                let text = run
                    .iter()
                    .map(|t| t.text.as_str())
                    .collect::<Vec<_>>()
                    .join(" ");
                shingles.push(
                    Token::with_offsets(text, start, run[0].start_offset, run[size - 1].end_offset)
                        .with_position_length(size),
                );
            }
        }

        Ok(Box::new(shingles.into_iter()))
    }

    fn name(&self) -> &'static str {
        "shingle"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream(words: &[&str]) -> TokenStream {
        let tokens: Vec<Token> = words
            .iter()
            .enumerate()
            .map(|(i, w)| Token::new(*w, i))
            .collect();
        Box::new(tokens.into_iter())
    }

    #[test]
    fn test_unigrams_and_bigrams() {
        let filter = ShingleFilter::new(1, 2).unwrap();
        let texts: Vec<String> = filter
            .filter(stream(&["how", "much", "does"]))
            .unwrap()
            .map(|t| t.text)
            .collect();

        assert_eq!(
            texts,
            vec!["how", "how much", "much", "much does", "does"]
        );
    }

    #[test]
    fn test_bigrams_only() {
        let filter = ShingleFilter::new(2, 2).unwrap();
        let tokens: Vec<Token> = filter.filter(stream(&["hi", "there"])).unwrap().collect();

        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].text, "hi there");
        assert_eq!(tokens[0].position_length, 2);
    }

    #[test]
    fn test_single_word_has_no_bigram() {
        let filter = ShingleFilter::new(1, 2).unwrap();
        assert_eq!(filter.filter(stream(&["hello"])).unwrap().count(), 1);
        assert_eq!(filter.filter(stream(&[])).unwrap().count(), 0);
    }

    #[test]
    fn test_invalid_range() {
        assert!(ShingleFilter::new(0, 2).is_err());
        assert!(ShingleFilter::new(3, 2).is_err());
    }
}
