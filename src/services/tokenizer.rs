use once_cell::sync::Lazy;
use rust_stemmers::{Algorithm, Stemmer};
use std::collections::HashSet;

static STEMMER: Lazy<Stemmer> = Lazy::new(|| Stemmer::create(Algorithm::English));

static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        // Articles, conjunctions & prepositions
        "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
        "from", "about", "as", "into", "through", "during", "is", "are", "was", "were", "be",
        "been", "being", "do", "does", "did", "have", "has", "had", "will", "would", "can",
        "could", "should", "than", "then", "there", "here", "not", "no", "yes", "if", "so",
        // Question words
        "what", "where", "when", "who", "which", "how", "why",
        // Pronouns
        "i", "me", "my", "you", "your", "it", "its", "that", "this", "these", "those", "we",
        "our", "they", "them", "their",
        // Common storefront filler
        "please", "find", "show", "looking", "want", "need", "give", "get", "some", "any",
        "item", "items", "product", "products", "thing", "things", "stuff", "shop", "buy",
    ]
    .iter()
    .copied()
    .collect()
});

/// Tokenized form of a search query: cleaned tokens plus their stems.
#[derive(Debug, Clone, Default)]
pub struct TokenizedQuery {
    pub tokens: Vec<String>,
    pub stems: Vec<String>,
}

/// Splits queries into lowercase tokens, strips stopwords and noise, and stems
/// the survivors with a Snowball English stemmer.
#[derive(Debug, Clone)]
pub struct Tokenizer {
    min_token_length: usize,
}

impl Tokenizer {
    pub fn new(min_token_length: usize) -> Self {
        Self { min_token_length }
    }

    pub fn tokenize(&self, query: &str) -> TokenizedQuery {
        let tokens: Vec<String> = query
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric() && c != '-' && c != '\'')
            .filter(|word| {
                !word.is_empty()
                    && word.len() > self.min_token_length
                    && !STOP_WORDS.contains(word)
                    && !word.chars().all(|c| c.is_ascii_digit())
            })
            .map(|s| s.to_string())
            .collect();

        let stems = tokens
            .iter()
            .map(|token| STEMMER.stem(token).into_owned())
            .collect();

        TokenizedQuery { tokens, stems }
    }
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new(2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_removes_stopwords_and_short_tokens() {
        let tokenizer = Tokenizer::default();
        let result = tokenizer.tokenize("find me a red dress in the store");

        assert!(result.tokens.contains(&"red".to_string()));
        assert!(result.tokens.contains(&"dress".to_string()));
        assert!(!result.tokens.contains(&"find".to_string()));
        assert!(!result.tokens.contains(&"the".to_string()));
        assert!(!result.tokens.contains(&"a".to_string()));
    }

    #[test]
    fn test_drops_numeric_tokens() {
        let tokenizer = Tokenizer::default();
        let result = tokenizer.tokenize("jeans under 100 dollars");

        assert!(result.tokens.contains(&"jeans".to_string()));
        assert!(!result.tokens.contains(&"100".to_string()));
    }

    #[test]
    fn test_stems_tokens() {
        let tokenizer = Tokenizer::default();
        let result = tokenizer.tokenize("running shoes");

        assert_eq!(result.tokens, vec!["running", "shoes"]);
        assert_eq!(result.stems, vec!["run", "shoe"]);
    }

    #[test]
    fn test_keeps_hyphenated_tokens() {
        let tokenizer = Tokenizer::default();
        let result = tokenizer.tokenize("eco-friendly bags");

        assert!(result.tokens.contains(&"eco-friendly".to_string()));
    }

    #[test]
    fn test_empty_query() {
        let tokenizer = Tokenizer::default();
        let result = tokenizer.tokenize("   ");

        assert!(result.tokens.is_empty());
        assert!(result.stems.is_empty());
    }
}
