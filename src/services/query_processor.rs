use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::services::entity_recognition::{EntityRecognitionService, ExtractedEntity};
use crate::services::intent_detection::{DetectedIntent, IntentDetectionService, SearchParameters};
use crate::services::query_expansion::{QueryExpansion, QueryExpansionService};
use crate::services::tokenizer::Tokenizer;

/// Full output of the query-understanding pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedQuery {
    pub original_query: String,
    /// Query tokens with extracted entity values removed, rejoined
    pub cleaned_query: String,
    pub tokens: Vec<String>,
    pub stems: Vec<String>,
    pub entities: Vec<ExtractedEntity>,
    pub intent: DetectedIntent,
    pub expansion: QueryExpansion,
    pub parameters: SearchParameters,
}

struct CacheEntry {
    processed: ProcessedQuery,
    timestamp: Instant,
}

const CACHE_CLEANUP_THRESHOLD: usize = 1000;

/// Runs the pipeline: tokenize, extract entities, classify intent, expand,
/// build search parameters. Results are cached in-process with a TTL since
/// popular storefront queries repeat heavily.
pub struct QueryProcessor {
    tokenizer: Tokenizer,
    entities: EntityRecognitionService,
    intents: IntentDetectionService,
    expansion: QueryExpansionService,
    cache: Arc<RwLock<HashMap<String, CacheEntry>>>,
    cache_ttl: Duration,
}

impl QueryProcessor {
    pub fn new(
        tokenizer: Tokenizer,
        entities: EntityRecognitionService,
        intents: IntentDetectionService,
        expansion: QueryExpansionService,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            tokenizer,
            entities,
            intents,
            expansion,
            cache: Arc::new(RwLock::new(HashMap::new())),
            cache_ttl,
        }
    }

    pub async fn process(&self, query: &str) -> ProcessedQuery {
        let query = query.trim();

        if let Ok(cache) = self.cache.read() {
            if let Some(entry) = cache.get(query) {
                if entry.timestamp.elapsed() < self.cache_ttl {
                    debug!("Cache hit for query: '{query}'");
                    return entry.processed.clone();
                }
            }
        }

        let tokenized = self.tokenizer.tokenize(query);
        let entities = self.entities.extract(query, &tokenized.tokens);
        let intent = self.intents.detect(query);
        let expansion = self.expansion.expand(query, &tokenized.tokens).await;
        let parameters = self
            .intents
            .search_parameters(intent.intent, &entities, query);

        let cleaned_query = build_cleaned_query(&tokenized.tokens, &entities);

        let processed = ProcessedQuery {
            original_query: query.to_string(),
            cleaned_query,
            tokens: tokenized.tokens,
            stems: tokenized.stems,
            entities,
            intent,
            expansion,
            parameters,
        };

        info!(
            "Processed query '{}': intent={:?} ({} entities, {} expansion terms)",
            query,
            processed.intent.intent,
            processed.entities.len(),
            processed.expansion.terms.len()
        );

        if let Ok(mut cache) = self.cache.write() {
            cache.insert(
                query.to_string(),
                CacheEntry {
                    processed: processed.clone(),
                    timestamp: Instant::now(),
                },
            );
            if cache.len() > CACHE_CLEANUP_THRESHOLD {
                let ttl = self.cache_ttl;
                cache.retain(|_, entry| entry.timestamp.elapsed() <= ttl);
                debug!("Cleaned query cache, remaining entries: {}", cache.len());
            }
        }

        processed
    }

    #[cfg(test)]
    fn cache_len(&self) -> usize {
        self.cache.read().map(|c| c.len()).unwrap_or(0)
    }
}

/// Drop tokens that were recognized as entity values so the free-text part
/// of the query can be matched on its own.
fn build_cleaned_query(tokens: &[String], entities: &[ExtractedEntity]) -> String {
    let entity_values: Vec<&str> = entities.iter().map(|e| e.value.as_str()).collect();
    tokens
        .iter()
        .filter(|token| !entity_values.contains(&token.as_str()))
        .cloned()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::entity_recognition::EntityKind;
    use crate::services::intent_detection::QueryIntent;
    use crate::services::query_expansion::QueryExpansionService;

    fn processor() -> QueryProcessor {
        QueryProcessor::new(
            Tokenizer::default(),
            EntityRecognitionService::new(),
            IntentDetectionService::new(0.6),
            QueryExpansionService::new(None, None, true, false, 3, 5),
            Duration::from_secs(60),
        )
    }

    #[tokio::test]
    async fn test_full_pipeline() {
        let processed = processor()
            .process("sustainable dresses under $100")
            .await;

        assert_eq!(processed.original_query, "sustainable dresses under $100");
        assert!(processed
            .entities
            .iter()
            .any(|e| e.kind == EntityKind::Value && e.value == "sustainable"));
        assert!(processed
            .entities
            .iter()
            .any(|e| e.kind == EntityKind::Price && e.value == "0-100"));
        assert!(processed
            .expansion
            .terms
            .contains(&"eco-friendly".to_string()));
    }

    #[tokio::test]
    async fn test_cleaned_query_drops_entity_tokens() {
        let processed = processor().process("navy dresses").await;

        // "navy" (color) and "dresses" (category) are both entities
        assert!(!processed.cleaned_query.contains("navy"));
        assert!(!processed.cleaned_query.contains("dresses"));
    }

    #[tokio::test]
    async fn test_result_is_cached() {
        let processor = processor();
        let first = processor.process("vegan bags").await;
        assert_eq!(processor.cache_len(), 1);

        let second = processor.process("vegan bags").await;
        assert_eq!(first, second);
        assert_eq!(processor.cache_len(), 1);
    }

    #[tokio::test]
    async fn test_whitespace_is_trimmed() {
        let processed = processor().process("  vegan bags  ").await;
        assert_eq!(processed.original_query, "vegan bags");
    }

    #[tokio::test]
    async fn test_price_query_intent_end_to_end() {
        let processed = processor().process("jeans under $80").await;

        assert_eq!(processed.intent.intent, QueryIntent::PriceQuery);
        assert_eq!(processed.parameters.filters.price_max, Some(80.0));
    }
}
