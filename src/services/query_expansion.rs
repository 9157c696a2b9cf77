use lazy_static::lazy_static;
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use crate::services::elasticsearch::ElasticsearchClient;
use crate::services::thesaurus::ThesaurusClient;

lazy_static! {
    /// Marketplace-specific synonym table, consulted before any remote lookup
    static ref DOMAIN_SYNONYMS: HashMap<&'static str, Vec<&'static str>> = {
        let mut m = HashMap::new();
        m.insert("shirt", vec!["tee", "t-shirt", "top", "blouse"]);
        m.insert("pants", vec!["trousers", "jeans", "slacks", "leggings"]);
        m.insert("shoes", vec!["footwear", "sneakers", "boots", "sandals"]);
        m.insert("dress", vec!["gown", "frock", "outfit"]);
        m.insert("jacket", vec!["coat", "blazer", "outerwear"]);
        m.insert("sustainable", vec!["eco-friendly", "green", "ethical", "environmentally friendly"]);
        m.insert("organic", vec!["natural", "chemical-free", "pesticide-free"]);
        m.insert("vegan", vec!["plant-based", "cruelty-free", "animal-free"]);
        m.insert("handmade", vec!["artisanal", "handcrafted", "custom-made"]);
        m.insert("fair trade", vec!["ethically sourced", "ethical trade", "fair price"]);
        m.insert("recycled", vec!["upcycled", "repurposed", "reclaimed"]);
        m.insert("local", vec!["community-made", "locally sourced", "locally made"]);
        m.insert("small batch", vec!["limited edition", "artisanal", "handcrafted"]);
        m.insert("affordable", vec!["budget", "inexpensive", "economical", "cheap"]);
        m.insert("premium", vec!["luxury", "high-end", "designer", "exclusive"]);
        m.insert("sale", vec!["discount", "clearance", "reduced", "deal"]);
        m.insert("new", vec!["latest", "fresh", "new arrival"]);
        m.insert("popular", vec!["trending", "bestselling", "in demand"]);
        m
    };
}

/// Result of expanding a query with related terms.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryExpansion {
    pub expanded_query: String,
    pub terms: Vec<String>,
    /// Which source contributed which terms: a query token for synonym
    /// lookups, or `search_index` for significant-terms suggestions.
    pub sources: BTreeMap<String, Vec<String>>,
}

/// Expands queries with domain synonyms, optional thesaurus lookups and
/// optional significant-terms suggestions from the search index.
pub struct QueryExpansionService {
    thesaurus: Option<Arc<ThesaurusClient>>,
    search_index: Option<Arc<ElasticsearchClient>>,
    enabled: bool,
    enable_significant_terms: bool,
    max_synonyms_per_term: usize,
    max_expansion_terms: usize,
    synonym_cache: RwLock<HashMap<String, Vec<String>>>,
}

impl QueryExpansionService {
    pub fn new(
        thesaurus: Option<Arc<ThesaurusClient>>,
        search_index: Option<Arc<ElasticsearchClient>>,
        enabled: bool,
        enable_significant_terms: bool,
        max_synonyms_per_term: usize,
        max_expansion_terms: usize,
    ) -> Self {
        Self {
            thesaurus,
            search_index,
            enabled,
            enable_significant_terms,
            max_synonyms_per_term,
            max_expansion_terms,
            synonym_cache: RwLock::new(HashMap::new()),
        }
    }

    /// Expand a query. Remote lookup failures degrade to whatever the local
    /// synonym table produced; expansion never fails a request.
    pub async fn expand(&self, query: &str, tokens: &[String]) -> QueryExpansion {
        if !self.enabled || tokens.is_empty() {
            return QueryExpansion {
                expanded_query: query.to_string(),
                ..Default::default()
            };
        }

        let mut sources: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut terms: Vec<String> = Vec::new();

        // 1. Domain-specific synonyms
        for token in tokens {
            if let Some(synonyms) = DOMAIN_SYNONYMS.get(token.as_str()) {
                let synonyms: Vec<String> = synonyms
                    .iter()
                    .take(self.max_synonyms_per_term)
                    .map(|s| s.to_string())
                    .collect();
                sources
                    .entry(token.clone())
                    .or_default()
                    .extend(synonyms.clone());
                terms.extend(synonyms);
            }
        }

        // 2. Thesaurus synonyms
        if let Some(thesaurus) = &self.thesaurus {
            for token in tokens {
                let synonyms = self.cached_synonyms(thesaurus, token).await;
                if !synonyms.is_empty() {
                    sources
                        .entry(token.clone())
                        .or_default()
                        .extend(synonyms.clone());
                    terms.extend(synonyms);
                }
            }
        }

        // 3. Related terms from the search index
        if self.enable_significant_terms {
            if let Some(search_index) = &self.search_index {
                match search_index
                    .significant_terms(query, self.max_expansion_terms)
                    .await
                {
                    Ok(related) if !related.is_empty() => {
                        sources.insert("search_index".to_string(), related.clone());
                        terms.extend(related);
                    }
                    Ok(_) => {}
                    Err(err) => warn!("Significant-terms lookup failed: {err}"),
                }
            }
        }

        // Dedup, drop terms already present in the query, cap the total
        let mut seen = std::collections::HashSet::new();
        let terms: Vec<String> = terms
            .into_iter()
            .filter(|term| !tokens.contains(term))
            .filter(|term| seen.insert(term.clone()))
            .take(self.max_expansion_terms)
            .collect();

        let expanded_query = if terms.is_empty() {
            query.to_string()
        } else {
            format!("{} {}", query, terms.join(" "))
        };

        QueryExpansion {
            expanded_query,
            terms,
            sources,
        }
    }

    async fn cached_synonyms(&self, thesaurus: &ThesaurusClient, token: &str) -> Vec<String> {
        if let Ok(cache) = self.synonym_cache.read() {
            if let Some(synonyms) = cache.get(token) {
                return synonyms.clone();
            }
        }

        let synonyms = match thesaurus.synonyms(token, self.max_synonyms_per_term).await {
            Ok(synonyms) => synonyms,
            Err(err) => {
                warn!("Thesaurus lookup failed for '{token}': {err}");
                return Vec::new();
            }
        };

        if let Ok(mut cache) = self.synonym_cache.write() {
            cache.insert(token.to_string(), synonyms.clone());
        }
        synonyms
    }
}
