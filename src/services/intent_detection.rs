use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::services::entity_recognition::{EntityKind, ExtractedEntity};

/// Fixed set of query intents the classifier can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryIntent {
    ProductSearch,
    CategoryBrowse,
    BrandSpecific,
    PriceQuery,
    ValueDriven,
    Comparison,
    Recommendation,
    Availability,
    Filter,
    Sort,
}

const ALL_INTENTS: &[QueryIntent] = &[
    QueryIntent::ProductSearch,
    QueryIntent::CategoryBrowse,
    QueryIntent::BrandSpecific,
    QueryIntent::PriceQuery,
    QueryIntent::ValueDriven,
    QueryIntent::Comparison,
    QueryIntent::Recommendation,
    QueryIntent::Availability,
    QueryIntent::Filter,
    QueryIntent::Sort,
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentScore {
    pub intent: QueryIntent,
    pub confidence: f32,
}

/// Primary intent plus the ranked runners-up from keyword scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedIntent {
    pub intent: QueryIntent,
    pub confidence: f32,
    pub secondary: Vec<IntentScore>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortDirective {
    pub field: String,
    pub order: SortOrder,
}

/// Filter predicates for the downstream search engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchFilters {
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub brands: Vec<String>,
    #[serde(default)]
    pub values: Vec<String>,
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default)]
    pub sizes: Vec<String>,
    #[serde(default)]
    pub materials: Vec<String>,
    pub price_min: Option<f32>,
    pub price_max: Option<f32>,
    pub rating: Option<f32>,
    pub rating_min: Option<f32>,
    pub in_stock: Option<bool>,
}

/// Field boosts, sort directives and filters derived from intent + entities.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchParameters {
    pub boost: BTreeMap<String, f32>,
    pub sort: Vec<SortDirective>,
    pub filters: SearchFilters,
}

lazy_static! {
    static ref INTENT_PATTERNS: Vec<(QueryIntent, Vec<Regex>)> = vec![
        (
            QueryIntent::ProductSearch,
            vec![
                Regex::new(r"(?i)(?:find|search for|looking for|need)\s+(?:a|an|some)?\s*[a-z\s&-]+").unwrap(),
                Regex::new(r"(?i)(?:where can i find|do you have|is there)\s+(?:a|an|some)?\s*[a-z\s&-]+").unwrap(),
            ],
        ),
        (
            QueryIntent::CategoryBrowse,
            vec![
                Regex::new(r"(?i)(?:browse|explore|show me|view)\s+(?:all|the)?\s*[a-z\s&-]+").unwrap(),
                Regex::new(r"(?i)(?:what|which)\s+[a-z\s&-]+\s+(?:do you have|are available|can i find)").unwrap(),
            ],
        ),
        (
            QueryIntent::BrandSpecific,
            vec![Regex::new(r"(?i)[a-z\s&-]+\s+brand\b").unwrap()],
        ),
        (
            QueryIntent::PriceQuery,
            vec![
                Regex::new(r"(?i)(?:how much|what is the price of|cost of|price for)\s+[a-z\s&-]+").unwrap(),
                Regex::new(r"(?i)(?:under|less than|below|above|over|more than)\s+\$\d+").unwrap(),
                Regex::new(r"(?i)\$\d+\s*(?:to|-)\s*\$\d+").unwrap(),
            ],
        ),
        (
            QueryIntent::Comparison,
            vec![
                Regex::new(r"(?i)(?:compare|difference between)\s+[a-z\s&-]+\s+(?:and|or|vs|versus)\s+[a-z\s&-]+").unwrap(),
                Regex::new(r"(?i)(?:which is better|what's better|better option)").unwrap(),
                Regex::new(r"(?i)[a-z\s&-]+\s+(?:vs|versus)\s+[a-z\s&-]+").unwrap(),
            ],
        ),
        (
            QueryIntent::Recommendation,
            vec![
                Regex::new(r"(?i)(?:recommend|suggest|what do you recommend|what should i)\s*[a-z\s&-]*").unwrap(),
                Regex::new(r"(?i)(?:what are the best|top|popular|trending)\s+[a-z\s&-]+").unwrap(),
            ],
        ),
        (
            QueryIntent::Availability,
            vec![
                Regex::new(r"(?i)(?:is|are)\s+[a-z\s&-]+\s+(?:in stock|available)").unwrap(),
                Regex::new(r"(?i)availability of\s+[a-z\s&-]+").unwrap(),
            ],
        ),
        (
            QueryIntent::Filter,
            vec![
                Regex::new(r"(?i)(?:filter|show only|limit to|restrict to)\s+[a-z0-9$\s&-]+").unwrap(),
                Regex::new(r"(?i)with\s+[a-z\s&-]+\s+only\b").unwrap(),
            ],
        ),
        (
            QueryIntent::Sort,
            vec![Regex::new(r"(?i)(?:sort|order|arrange)\s+(?:by|on)?\s*[a-z\s&-]+").unwrap()],
        ),
    ];
}

fn intent_keywords(intent: QueryIntent) -> &'static [&'static str] {
    match intent {
        QueryIntent::ProductSearch => &["find", "search", "looking", "need", "want"],
        QueryIntent::CategoryBrowse => &["browse", "explore", "view", "category", "categories"],
        QueryIntent::BrandSpecific => &["brand", "manufacturer", "made by"],
        QueryIntent::PriceQuery => &[
            "price",
            "cost",
            "how much",
            "affordable",
            "expensive",
            "cheap",
            "budget",
            "luxury",
        ],
        QueryIntent::ValueDriven => &[
            "sustainable",
            "ethical",
            "eco-friendly",
            "organic",
            "vegan",
            "fair trade",
            "handmade",
            "recycled",
        ],
        QueryIntent::Comparison => &["compare", "comparison", "difference", "versus", "vs"],
        QueryIntent::Recommendation => &[
            "recommend",
            "suggest",
            "best",
            "top",
            "popular",
            "trending",
        ],
        QueryIntent::Availability => &["available", "in stock", "stock", "inventory"],
        QueryIntent::Filter => &["filter", "only", "limit", "restrict"],
        QueryIntent::Sort => &["sort", "order", "arrange", "highest", "lowest"],
    }
}

/// Classifies queries against the fixed intent set: regex patterns first,
/// keyword indicators second, product search as the fallback.
#[derive(Debug, Clone)]
pub struct IntentDetectionService {
    confidence_threshold: f32,
}

impl IntentDetectionService {
    pub fn new(confidence_threshold: f32) -> Self {
        Self {
            confidence_threshold,
        }
    }

    pub fn detect(&self, query: &str) -> DetectedIntent {
        let query_lower = query.to_lowercase();

        // Stage 1: pattern match, first hit wins
        for (intent, patterns) in INTENT_PATTERNS.iter() {
            if patterns.iter().any(|p| p.is_match(&query_lower)) {
                return DetectedIntent {
                    intent: *intent,
                    confidence: 0.9,
                    secondary: Vec::new(),
                };
            }
        }

        // Stage 2: keyword indicators, scored relative to total matches.
        // Single-word indicators match whole words only; multi-word ones
        // match as phrases.
        let words: HashSet<&str> = query_lower
            .split_whitespace()
            .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric() && c != '-'))
            .collect();

        let mut scores: Vec<IntentScore> = Vec::new();
        let mut total_matches = 0u32;

        for intent in ALL_INTENTS {
            let mut hits = 0u32;
            for keyword in intent_keywords(*intent) {
                let matched = if keyword.contains(' ') {
                    query_lower.contains(keyword)
                } else {
                    words.contains(keyword)
                };
                if matched {
                    hits += 1;
                }
            }
            if hits > 0 {
                total_matches += hits;
                scores.push(IntentScore {
                    intent: *intent,
                    confidence: hits as f32,
                });
            }
        }

        if total_matches > 0 {
            for score in &mut scores {
                score.confidence /= total_matches as f32;
            }
            scores.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

            if scores[0].confidence >= self.confidence_threshold {
                let top = scores.remove(0);
                return DetectedIntent {
                    intent: top.intent,
                    confidence: top.confidence,
                    secondary: scores,
                };
            }
        }

        // Fallback
        DetectedIntent {
            intent: QueryIntent::ProductSearch,
            confidence: 0.5,
            secondary: scores,
        }
    }

    /// Map the detected intent and extracted entities onto boost weights,
    /// sort directives and filter predicates for the search engine.
    pub fn search_parameters(
        &self,
        intent: QueryIntent,
        entities: &[ExtractedEntity],
        query: &str,
    ) -> SearchParameters {
        let mut params = SearchParameters::default();
        let query_lower = query.to_lowercase();

        match intent {
            QueryIntent::ProductSearch => {
                params.boost = boosts(&[("name", 2.0), ("description", 1.0), ("categories", 1.5)]);
            }
            QueryIntent::CategoryBrowse => {
                params.boost = boosts(&[("categories", 3.0), ("name", 1.0), ("description", 0.5)]);
                params.filters.categories = entity_values(entities, EntityKind::Category);
            }
            QueryIntent::BrandSpecific => {
                params.boost = boosts(&[("brand_name", 3.0), ("name", 1.0)]);
                params.filters.brands = entity_values(entities, EntityKind::Brand);
            }
            QueryIntent::PriceQuery => {
                params.sort.push(SortDirective {
                    field: "price".to_string(),
                    order: SortOrder::Asc,
                });
                if let Some(entity) = entities.iter().find(|e| e.kind == EntityKind::Price) {
                    let (min, max) = parse_price_range(&entity.value);
                    params.filters.price_min = min;
                    params.filters.price_max = max;
                }
            }
            QueryIntent::ValueDriven => {
                params.boost = boosts(&[("values", 3.0), ("description", 2.0), ("name", 1.0)]);
                params.filters.values = entity_values(entities, EntityKind::Value);
            }
            QueryIntent::Comparison => {
                // Both compared items must surface; the search layer handles it
            }
            QueryIntent::Recommendation => {
                params.sort.push(SortDirective {
                    field: "rating".to_string(),
                    order: SortOrder::Desc,
                });
                params.boost = boosts(&[("rating", 2.0), ("review_count", 1.5), ("name", 1.0)]);
            }
            QueryIntent::Availability => {
                params.filters.in_stock = Some(true);
            }
            QueryIntent::Filter => {
                for entity in entities {
                    match entity.kind {
                        EntityKind::Category => {
                            params.filters.categories.push(entity.value.clone())
                        }
                        EntityKind::Brand => params.filters.brands.push(entity.value.clone()),
                        EntityKind::Value => params.filters.values.push(entity.value.clone()),
                        EntityKind::Color => params.filters.colors.push(entity.value.clone()),
                        EntityKind::Size => params.filters.sizes.push(entity.value.clone()),
                        EntityKind::Material => {
                            params.filters.materials.push(entity.value.clone())
                        }
                        EntityKind::Price => {
                            let (min, max) = parse_price_range(&entity.value);
                            params.filters.price_min = min;
                            params.filters.price_max = max;
                        }
                        EntityKind::Rating => {
                            if let Some(min) = entity.value.strip_suffix('+') {
                                params.filters.rating_min = min.parse().ok();
                            } else {
                                params.filters.rating = entity.value.parse().ok();
                            }
                        }
                        EntityKind::Recency => {}
                    }
                }
            }
            QueryIntent::Sort => {
                let directive = if query_lower.contains("price") {
                    let order = if query_lower.contains("high to low") {
                        SortOrder::Desc
                    } else {
                        SortOrder::Asc
                    };
                    Some(("price", order))
                } else if query_lower.contains("rating") || query_lower.contains("reviews") {
                    Some(("rating", SortOrder::Desc))
                } else if query_lower.contains("new") || query_lower.contains("recent") {
                    Some(("created_at", SortOrder::Desc))
                } else if query_lower.contains("popular") || query_lower.contains("trending") {
                    Some(("popularity", SortOrder::Desc))
                } else {
                    None
                };
                if let Some((field, order)) = directive {
                    params.sort.push(SortDirective {
                        field: field.to_string(),
                        order,
                    });
                }
            }
        }

        // Stock availability phrasing forces the in-stock filter for any intent
        if query_lower.contains("in stock") || query_lower.contains("available") {
            params.filters.in_stock = Some(true);
        }

        params
    }
}

fn boosts(pairs: &[(&str, f32)]) -> BTreeMap<String, f32> {
    pairs
        .iter()
        .map(|(field, weight)| (field.to_string(), *weight))
        .collect()
}

fn entity_values(entities: &[ExtractedEntity], kind: EntityKind) -> Vec<String> {
    entities
        .iter()
        .filter(|e| e.kind == kind)
        .map(|e| e.value.clone())
        .collect()
}

fn parse_price_range(value: &str) -> (Option<f32>, Option<f32>) {
    let Some((min, max)) = value.split_once('-') else {
        return (None, None);
    };
    (min.parse().ok(), max.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::entity_recognition::{EntityKind, ExtractedEntity};

    fn service() -> IntentDetectionService {
        IntentDetectionService::new(0.6)
    }

    fn entity(kind: EntityKind, value: &str) -> ExtractedEntity {
        ExtractedEntity {
            kind,
            value: value.to_string(),
            confidence: 0.9,
        }
    }

    #[test]
    fn test_pattern_match_product_search() {
        let detected = service().detect("looking for a linen shirt");

        assert_eq!(detected.intent, QueryIntent::ProductSearch);
        assert_eq!(detected.confidence, 0.9);
    }

    #[test]
    fn test_pattern_match_sort() {
        let detected = service().detect("sort by price low to high");

        assert_eq!(detected.intent, QueryIntent::Sort);
        assert_eq!(detected.confidence, 0.9);
    }

    #[test]
    fn test_keyword_match_availability() {
        let detected = service().detect("bamboo toothbrush availability");

        // "availability" carries no pattern here; falls through to keywords
        assert_eq!(detected.intent, QueryIntent::ProductSearch);
    }

    #[test]
    fn test_keyword_match_value_driven() {
        let detected = service().detect("vegan handmade jewelry");

        assert_eq!(detected.intent, QueryIntent::ValueDriven);
        assert!(detected.confidence >= 0.6);
    }

    #[test]
    fn test_fallback_intent() {
        let detected = service().detect("blue linen shirt");

        assert_eq!(detected.intent, QueryIntent::ProductSearch);
        assert_eq!(detected.confidence, 0.5);
    }

    #[test]
    fn test_sort_parameters_price_descending() {
        let params =
            service().search_parameters(QueryIntent::Sort, &[], "sort by price high to low");

        assert_eq!(params.sort.len(), 1);
        assert_eq!(params.sort[0].field, "price");
        assert_eq!(params.sort[0].order, SortOrder::Desc);
    }

    #[test]
    fn test_recommendation_parameters() {
        let params = service().search_parameters(QueryIntent::Recommendation, &[], "best bags");

        assert_eq!(params.sort[0].field, "rating");
        assert_eq!(params.sort[0].order, SortOrder::Desc);
        assert_eq!(params.boost.get("rating"), Some(&2.0));
    }

    #[test]
    fn test_price_query_parameters() {
        let entities = vec![entity(EntityKind::Price, "25-75")];
        let params =
            service().search_parameters(QueryIntent::PriceQuery, &entities, "between $25 and $75");

        assert_eq!(params.filters.price_min, Some(25.0));
        assert_eq!(params.filters.price_max, Some(75.0));
        assert_eq!(params.sort[0].field, "price");
    }

    #[test]
    fn test_filter_parameters_fold_entities() {
        let entities = vec![
            entity(EntityKind::Category, "dresses"),
            entity(EntityKind::Color, "navy"),
            entity(EntityKind::Rating, "4+"),
        ];
        let params = service().search_parameters(QueryIntent::Filter, &entities, "filter");

        assert_eq!(params.filters.categories, vec!["dresses"]);
        assert_eq!(params.filters.colors, vec!["navy"]);
        assert_eq!(params.filters.rating_min, Some(4.0));
    }

    #[test]
    fn test_in_stock_phrase_forces_filter() {
        let params =
            service().search_parameters(QueryIntent::ProductSearch, &[], "linen shirts in stock");

        assert_eq!(params.filters.in_stock, Some(true));
    }

    #[test]
    fn test_brand_specific_parameters() {
        let entities = vec![entity(EntityKind::Brand, "green earth")];
        let params =
            service().search_parameters(QueryIntent::BrandSpecific, &entities, "green earth brand");

        assert_eq!(params.filters.brands, vec!["green earth"]);
        assert_eq!(params.boost.get("brand_name"), Some(&3.0));
    }
}
