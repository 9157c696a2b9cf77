use chrono::Datelike;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Kind of structured value pulled out of a free-text query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Category,
    Brand,
    Value,
    Size,
    Color,
    Material,
    Price,
    Rating,
    Recency,
}

/// A single extracted entity with its confidence score.
///
/// Price entities are encoded as `"min-max"` ranges and ratings as either an
/// exact value (`"4"`) or a minimum (`"4+"`), matching what the filter
/// builder expects downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedEntity {
    pub kind: EntityKind,
    pub value: String,
    pub confidence: f32,
}

lazy_static! {
    static ref CATEGORY_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?i)(?:in|for|from|browse|shop|category:?)\s+([a-z\s&-]+)").unwrap(),
        Regex::new(r"(?i)([a-z\s&-]+?)\s+(?:category|section|department)").unwrap(),
    ];
    static ref BRAND_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?i)(?:by|from|brand:?)\s+([a-z\s&-]+)").unwrap(),
        Regex::new(r"(?i)([a-z\s&-]+?)\s+brand\b").unwrap(),
    ];
    static ref VALUE_PATTERN: Regex = Regex::new(
        r"(?i)\b(sustainable|ethical|eco-friendly|organic|vegan|fair\s+trade|handmade|recycled|upcycled|local|small\s+batch)\b"
    )
    .unwrap();
    static ref SIZE_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?i)size:?\s+([a-z0-9]+)").unwrap(),
        Regex::new(r"(?i)\b(small|medium|large|xs|xl|xxl|2xl|3xl|one\s+size)\b").unwrap(),
    ];
    static ref COLOR_PATTERN: Regex = Regex::new(r"(?i)colou?r:?\s+([a-z-]+)").unwrap();
    static ref MATERIAL_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?i)material:?\s+([a-z\s-]+)").unwrap(),
        Regex::new(r"(?i)made\s+(?:of|from)\s+([a-z\s-]+)").unwrap(),
    ];
    static ref PRICE_RANGE: Regex =
        Regex::new(r"(?i)\$(\d+(?:\.\d+)?)\s*(?:to|-)\s*\$(\d+(?:\.\d+)?)").unwrap();
    static ref PRICE_BOUND: Regex =
        Regex::new(r"(?i)(under|less\s+than|below|above|over|more\s+than)\s+\$(\d+(?:\.\d+)?)")
            .unwrap();
    static ref PRICE_QUALIFIER: Regex = Regex::new(
        r"(?i)\b(cheap|affordable|budget|inexpensive|expensive|luxury|high-end|premium)\b"
    )
    .unwrap();
    static ref RATING_EXACT: Regex = Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*stars?").unwrap();
    static ref RATING_MIN: Regex =
        Regex::new(r"(?i)(?:above|over|more\s+than)\s+(\d+(?:\.\d+)?)\s*stars?").unwrap();
    static ref RATING_TOP: Regex = Regex::new(r"(?i)(?:top|best|highest)\s+rated").unwrap();
    static ref RECENCY_FRESH: Regex = Regex::new(r"(?i)\b(?:new|newest|latest|recent)\b").unwrap();
    static ref RECENCY_PERIOD: Regex = Regex::new(r"(?i)this\s+(week|month|year)").unwrap();
    static ref RECENCY_YEAR: Regex = Regex::new(r"(?i)(?:from|since)\s+(\d{4})").unwrap();
}

const DEFAULT_CATEGORIES: &[&str] = &[
    "clothing", "dresses", "tops", "bottoms", "pants", "jeans", "skirts", "shorts", "outerwear",
    "jackets", "coats", "sweaters", "activewear", "swimwear", "lingerie", "sleepwear",
    "accessories", "shoes", "bags", "jewelry", "watches", "sunglasses", "hats", "scarves",
    "gloves", "belts", "socks", "home", "bedding", "bath", "kitchen", "furniture", "decor",
    "beauty", "skincare", "makeup", "haircare", "fragrance", "wellness",
];

const DEFAULT_BRANDS: &[&str] = &[
    "eco collective",
    "sustainable threads",
    "green earth",
    "ethical choice",
    "conscious couture",
    "fair fashion",
    "earth friendly",
    "pure planet",
    "organic basics",
    "recycled revolution",
    "upcycled unique",
    "local luxe",
    "small batch beauty",
    "artisan alliance",
];

const KNOWN_VALUES: &[&str] = &[
    "sustainable",
    "ethical",
    "eco-friendly",
    "organic",
    "vegan",
    "fair trade",
    "handmade",
    "recycled",
    "upcycled",
    "local",
    "small batch",
    "carbon neutral",
    "zero waste",
    "plastic free",
    "biodegradable",
    "compostable",
    "renewable",
    "cruelty-free",
    "non-toxic",
    "chemical-free",
];

const KNOWN_COLORS: &[&str] = &[
    "black", "white", "red", "blue", "green", "yellow", "orange", "purple", "pink", "brown",
    "gray", "grey", "beige", "navy", "teal", "gold", "silver", "multicolor",
];

const KNOWN_MATERIALS: &[&str] = &[
    "cotton",
    "organic cotton",
    "polyester",
    "recycled polyester",
    "wool",
    "silk",
    "linen",
    "leather",
    "vegan leather",
    "denim",
    "velvet",
    "satin",
    "nylon",
    "cashmere",
    "fleece",
    "suede",
    "canvas",
    "corduroy",
    "bamboo",
    "hemp",
    "tencel",
    "modal",
    "rayon",
    "viscose",
];

/// Regex- and lexicon-driven entity extraction over search queries.
///
/// Lexicons start from a built-in vocabulary and can be extended at startup
/// with category/brand terms aggregated from the live search index.
pub struct EntityRecognitionService {
    known_categories: HashSet<String>,
    known_brands: HashSet<String>,
    known_values: HashSet<String>,
    known_colors: HashSet<String>,
    known_materials: HashSet<String>,
}

impl EntityRecognitionService {
    pub fn new() -> Self {
        Self {
            known_categories: DEFAULT_CATEGORIES.iter().map(|s| s.to_string()).collect(),
            known_brands: DEFAULT_BRANDS.iter().map(|s| s.to_string()).collect(),
            known_values: KNOWN_VALUES.iter().map(|s| s.to_string()).collect(),
            known_colors: KNOWN_COLORS.iter().map(|s| s.to_string()).collect(),
            known_materials: KNOWN_MATERIALS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Extend the category lexicon, e.g. from a search-index aggregation.
    pub fn add_categories<I: IntoIterator<Item = String>>(&mut self, categories: I) {
        self.known_categories
            .extend(categories.into_iter().map(|c| c.to_lowercase()));
    }

    /// Extend the brand lexicon, e.g. from a search-index aggregation.
    pub fn add_brands<I: IntoIterator<Item = String>>(&mut self, brands: I) {
        self.known_brands
            .extend(brands.into_iter().map(|b| b.to_lowercase()));
    }

    /// Extract all entities from a query. `tokens` is the cleaned token list
    /// produced by the tokenizer; the raw query is still needed because most
    /// indicator phrases ("under $50", "made of linen") span stopwords.
    pub fn extract(&self, query: &str, tokens: &[String]) -> Vec<ExtractedEntity> {
        let mut entities = Vec::new();

        self.extract_lexicon_matches(
            query,
            tokens,
            &CATEGORY_PATTERNS,
            &self.known_categories,
            EntityKind::Category,
            &mut entities,
        );
        self.extract_lexicon_matches(
            query,
            tokens,
            &BRAND_PATTERNS,
            &self.known_brands,
            EntityKind::Brand,
            &mut entities,
        );
        self.extract_values(query, tokens, &mut entities);
        self.extract_sizes(query, &mut entities);
        self.extract_colors(query, tokens, &mut entities);
        self.extract_materials(query, tokens, &mut entities);
        self.extract_prices(query, &mut entities);
        self.extract_ratings(query, &mut entities);
        self.extract_recency(query, &mut entities);

        entities
    }

    fn extract_lexicon_matches(
        &self,
        query: &str,
        tokens: &[String],
        patterns: &[Regex],
        lexicon: &HashSet<String>,
        kind: EntityKind,
        entities: &mut Vec<ExtractedEntity>,
    ) {
        for pattern in patterns {
            for captures in pattern.captures_iter(query) {
                if let Some(matched) = captures.get(1) {
                    let value = matched.as_str().trim().to_lowercase();
                    if value.is_empty() {
                        continue;
                    }
                    let confidence = if lexicon.contains(&value) { 0.9 } else { 0.7 };
                    push_unique(entities, kind, value, confidence);
                }
            }
        }

        // Direct and bigram lexicon matches over cleaned tokens
        for token in tokens {
            if lexicon.contains(token.as_str()) {
                push_unique(entities, kind, token.clone(), 0.8);
            }
        }
        for pair in tokens.windows(2) {
            let bigram = format!("{} {}", pair[0], pair[1]);
            if lexicon.contains(&bigram) {
                push_unique(entities, kind, bigram, 0.85);
            }
        }
    }

    fn extract_values(&self, query: &str, tokens: &[String], entities: &mut Vec<ExtractedEntity>) {
        for matched in VALUE_PATTERN.find_iter(query) {
            let value = matched.as_str().to_lowercase();
            let value = normalize_whitespace(&value);
            push_unique(entities, EntityKind::Value, value, 0.9);
        }

        for token in tokens {
            if self.known_values.contains(token.as_str()) {
                push_unique(entities, EntityKind::Value, token.clone(), 0.8);
            }
        }
        for pair in tokens.windows(2) {
            let bigram = format!("{} {}", pair[0], pair[1]);
            if self.known_values.contains(&bigram) {
                push_unique(entities, EntityKind::Value, bigram, 0.85);
            }
        }
    }

    fn extract_sizes(&self, query: &str, entities: &mut Vec<ExtractedEntity>) {
        for pattern in SIZE_PATTERNS.iter() {
            for captures in pattern.captures_iter(query) {
                if let Some(matched) = captures.get(1) {
                    let size = normalize_whitespace(&matched.as_str().to_lowercase());
                    push_unique(entities, EntityKind::Size, size, 0.9);
                }
            }
        }
    }

    fn extract_colors(&self, query: &str, tokens: &[String], entities: &mut Vec<ExtractedEntity>) {
        for captures in COLOR_PATTERN.captures_iter(query) {
            if let Some(matched) = captures.get(1) {
                let color = matched.as_str().trim().to_lowercase();
                let confidence = if self.known_colors.contains(&color) { 0.9 } else { 0.7 };
                push_unique(entities, EntityKind::Color, color, confidence);
            }
        }

        for token in tokens {
            if self.known_colors.contains(token.as_str()) {
                push_unique(entities, EntityKind::Color, token.clone(), 0.8);
            }
        }
    }

    fn extract_materials(
        &self,
        query: &str,
        tokens: &[String],
        entities: &mut Vec<ExtractedEntity>,
    ) {
        for pattern in MATERIAL_PATTERNS.iter() {
            for captures in pattern.captures_iter(query) {
                if let Some(matched) = captures.get(1) {
                    let material = matched.as_str().trim().to_lowercase();
                    if material.is_empty() {
                        continue;
                    }
                    let confidence = if self.known_materials.contains(&material) {
                        0.9
                    } else {
                        0.7
                    };
                    push_unique(entities, EntityKind::Material, material, confidence);
                }
            }
        }

        for token in tokens {
            if self.known_materials.contains(token.as_str()) {
                push_unique(entities, EntityKind::Material, token.clone(), 0.8);
            }
        }
        for pair in tokens.windows(2) {
            let bigram = format!("{} {}", pair[0], pair[1]);
            if self.known_materials.contains(&bigram) {
                push_unique(entities, EntityKind::Material, bigram, 0.85);
            }
        }
    }

    fn extract_prices(&self, query: &str, entities: &mut Vec<ExtractedEntity>) {
        for captures in PRICE_RANGE.captures_iter(query) {
            let (Some(min), Some(max)) = (captures.get(1), captures.get(2)) else {
                continue;
            };
            if let (Ok(min), Ok(max)) = (min.as_str().parse::<f32>(), max.as_str().parse::<f32>())
            {
                push_unique(entities, EntityKind::Price, format!("{min}-{max}"), 0.95);
            }
        }

        for captures in PRICE_BOUND.captures_iter(query) {
            let (Some(modifier), Some(amount)) = (captures.get(1), captures.get(2)) else {
                continue;
            };
            let Ok(amount) = amount.as_str().parse::<f32>() else {
                continue;
            };
            let modifier = modifier.as_str().to_lowercase();
            let is_max = modifier.starts_with("under")
                || modifier.starts_with("less")
                || modifier.starts_with("below");
            let value = if is_max {
                format!("0-{amount}")
            } else {
                format!("{amount}-9999")
            };
            push_unique(entities, EntityKind::Price, value, 0.9);
        }

        for matched in PRICE_QUALIFIER.find_iter(query) {
            let value = match matched.as_str().to_lowercase().as_str() {
                "cheap" | "affordable" | "budget" | "inexpensive" => "0-50",
                "expensive" | "luxury" | "high-end" | "premium" => "100-9999",
                _ => continue,
            };
            push_unique(entities, EntityKind::Price, value.to_string(), 0.7);
        }
    }

    fn extract_ratings(&self, query: &str, entities: &mut Vec<ExtractedEntity>) {
        for captures in RATING_EXACT.captures_iter(query) {
            if let Some(matched) = captures.get(1) {
                if let Ok(rating) = matched.as_str().parse::<f32>() {
                    if (0.0..=5.0).contains(&rating) {
                        push_unique(entities, EntityKind::Rating, rating.to_string(), 0.9);
                    }
                }
            }
        }

        for captures in RATING_MIN.captures_iter(query) {
            if let Some(matched) = captures.get(1) {
                if let Ok(rating) = matched.as_str().parse::<f32>() {
                    if (0.0..=5.0).contains(&rating) {
                        push_unique(entities, EntityKind::Rating, format!("{rating}+"), 0.85);
                    }
                }
            }
        }

        if RATING_TOP.is_match(query) {
            push_unique(entities, EntityKind::Rating, "4+".to_string(), 0.8);
        }
    }

    fn extract_recency(&self, query: &str, entities: &mut Vec<ExtractedEntity>) {
        if let Some(captures) = RECENCY_PERIOD.captures(query) {
            if let Some(period) = captures.get(1) {
                let value = format!("this_{}", period.as_str().to_lowercase());
                push_unique(entities, EntityKind::Recency, value, 0.9);
            }
        } else if RECENCY_FRESH.is_match(query) {
            push_unique(entities, EntityKind::Recency, "recent".to_string(), 0.8);
        }

        if let Some(captures) = RECENCY_YEAR.captures(query) {
            if let Some(matched) = captures.get(1) {
                if let Ok(year) = matched.as_str().parse::<i32>() {
                    let current_year = chrono::Utc::now().year();
                    if (2000..=current_year).contains(&year) {
                        push_unique(entities, EntityKind::Recency, format!("since_{year}"), 0.9);
                    }
                }
            }
        }
    }
}

impl Default for EntityRecognitionService {
    fn default() -> Self {
        Self::new()
    }
}

fn push_unique(
    entities: &mut Vec<ExtractedEntity>,
    kind: EntityKind,
    value: String,
    confidence: f32,
) {
    if !entities.iter().any(|e| e.kind == kind && e.value == value) {
        entities.push(ExtractedEntity {
            kind,
            value,
            confidence,
        });
    }
}

fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::tokenizer::Tokenizer;

    fn extract(query: &str) -> Vec<ExtractedEntity> {
        let service = EntityRecognitionService::new();
        let tokenized = Tokenizer::default().tokenize(query);
        service.extract(query, &tokenized.tokens)
    }

    fn find<'a>(entities: &'a [ExtractedEntity], kind: EntityKind) -> Vec<&'a ExtractedEntity> {
        entities.iter().filter(|e| e.kind == kind).collect()
    }

    #[test]
    fn test_price_range() {
        let entities = extract("dresses $50 to $100");
        let prices = find(&entities, EntityKind::Price);

        assert_eq!(prices.len(), 1);
        assert_eq!(prices[0].value, "50-100");
        assert_eq!(prices[0].confidence, 0.95);
    }

    #[test]
    fn test_price_upper_bound() {
        let entities = extract("jeans under $80");
        let prices = find(&entities, EntityKind::Price);

        assert_eq!(prices[0].value, "0-80");
        assert_eq!(prices[0].confidence, 0.9);
    }

    #[test]
    fn test_price_lower_bound() {
        let entities = extract("watches over $200");
        let prices = find(&entities, EntityKind::Price);

        assert_eq!(prices[0].value, "200-9999");
    }

    #[test]
    fn test_price_qualifier() {
        let entities = extract("cheap sunglasses");
        let prices = find(&entities, EntityKind::Price);

        assert_eq!(prices[0].value, "0-50");
        assert_eq!(prices[0].confidence, 0.7);
    }

    #[test]
    fn test_known_category_direct_token() {
        let entities = extract("organic cotton dresses");
        let categories = find(&entities, EntityKind::Category);

        assert!(categories.iter().any(|e| e.value == "dresses"));
    }

    #[test]
    fn test_category_indicator_phrase() {
        let entities = extract("browse jewelry");
        let categories = find(&entities, EntityKind::Category);

        assert!(categories
            .iter()
            .any(|e| e.value == "jewelry" && e.confidence == 0.9));
    }

    #[test]
    fn test_bigram_brand() {
        let entities = extract("anything from sustainable threads");
        let brands = find(&entities, EntityKind::Brand);

        assert!(brands.iter().any(|e| e.value == "sustainable threads"));
    }

    #[test]
    fn test_value_tags() {
        let entities = extract("fair trade handmade scarves");
        let values = find(&entities, EntityKind::Value);

        assert!(values.iter().any(|e| e.value == "fair trade"));
        assert!(values.iter().any(|e| e.value == "handmade"));
    }

    #[test]
    fn test_color_token() {
        let entities = extract("navy sweaters");
        let colors = find(&entities, EntityKind::Color);

        assert!(colors.iter().any(|e| e.value == "navy"));
    }

    #[test]
    fn test_material_phrase() {
        let entities = extract("bags made of canvas");
        let materials = find(&entities, EntityKind::Material);

        assert!(materials
            .iter()
            .any(|e| e.value == "canvas" && e.confidence == 0.9));
    }

    #[test]
    fn test_rating_exact_and_minimum() {
        let entities = extract("above 4 stars");
        let ratings = find(&entities, EntityKind::Rating);

        assert!(ratings.iter().any(|e| e.value == "4+"));
    }

    #[test]
    fn test_rating_out_of_range_ignored() {
        let entities = extract("7 stars");
        assert!(find(&entities, EntityKind::Rating).is_empty());
    }

    #[test]
    fn test_top_rated() {
        let entities = extract("top rated skincare");
        let ratings = find(&entities, EntityKind::Rating);

        assert_eq!(ratings[0].value, "4+");
        assert_eq!(ratings[0].confidence, 0.8);
    }

    #[test]
    fn test_recency_since_year() {
        let entities = extract("jackets since 2021");
        let recency = find(&entities, EntityKind::Recency);

        assert!(recency.iter().any(|e| e.value == "since_2021"));
    }

    #[test]
    fn test_recency_bad_year_ignored() {
        let entities = extract("coats since 1850");
        let recency = find(&entities, EntityKind::Recency);

        assert!(!recency.iter().any(|e| e.value.starts_with("since_")));
    }

    #[test]
    fn test_no_duplicate_entities() {
        let entities = extract("vegan vegan bags");
        let values: Vec<_> = find(&entities, EntityKind::Value)
            .into_iter()
            .filter(|e| e.value == "vegan")
            .collect();

        assert_eq!(values.len(), 1);
    }
}
