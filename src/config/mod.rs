use anyhow::Result;
use dotenv::dotenv;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub host: String,
    pub elasticsearch_url: String,
    pub product_index: String,
    pub thesaurus_url: Option<String>,
    pub nlp: NlpConfig,
}

/// Tuning knobs for the query-processing pipeline
#[derive(Debug, Clone)]
pub struct NlpConfig {
    pub min_token_length: usize,
    pub intent_confidence_threshold: f32,
    pub max_synonyms_per_term: usize,
    pub max_expansion_terms: usize,
    pub enable_query_expansion: bool,
    pub enable_significant_terms: bool,
    pub cache_ttl: Duration,
}

impl Default for NlpConfig {
    fn default() -> Self {
        Self {
            min_token_length: 2,
            intent_confidence_threshold: 0.6,
            max_synonyms_per_term: 3,
            max_expansion_terms: 5,
            enable_query_expansion: true,
            enable_significant_terms: true,
            cache_ttl: Duration::from_secs(3600),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let nlp = NlpConfig {
            min_token_length: parse_env("NLP_MIN_TOKEN_LENGTH", 2),
            intent_confidence_threshold: parse_env("NLP_INTENT_CONFIDENCE_THRESHOLD", 0.6),
            max_synonyms_per_term: parse_env("NLP_MAX_SYNONYMS_PER_TERM", 3),
            max_expansion_terms: parse_env("NLP_MAX_EXPANSION_TERMS", 5),
            enable_query_expansion: parse_env("SEARCH_ENABLE_QUERY_EXPANSION", true),
            enable_significant_terms: parse_env("SEARCH_ENABLE_SIGNIFICANT_TERMS", true),
            cache_ttl: Duration::from_secs(parse_env("NLP_CACHE_TTL_SECONDS", 3600)),
        };

        Ok(Config {
            port: parse_env("PORT", 3000),
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            elasticsearch_url: env::var("ELASTICSEARCH_URL")
                .unwrap_or_else(|_| "http://localhost:9200".to_string()),
            product_index: env::var("ELASTICSEARCH_PRODUCT_INDEX")
                .unwrap_or_else(|_| "products".to_string()),
            thesaurus_url: env::var("THESAURUS_URL").ok(),
            nlp,
        })
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}
