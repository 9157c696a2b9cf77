use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{ApiError, Result};
use crate::models::{
    FacetBucket, NlpSummary, PaginationInfo, PriceFacet, ProductSearchResult, SearchFacets,
    SearchRequest, SearchResponse,
};
use crate::services::elasticsearch::{ElasticsearchClient, SearchResults};
use crate::services::intent_detection::{SearchFilters, SearchParameters, SortDirective};
use crate::services::query_processor::{ProcessedQuery, QueryProcessor};

const DEFAULT_SEARCH_FIELDS: &[&str] = &["name^2", "description", "categories^1.5"];
const MAX_PAGE_SIZE: usize = 100;

/// Executes product searches: runs the query-understanding pipeline, builds
/// the search engine request, and shapes the response.
pub struct SearchService {
    search_index: Arc<ElasticsearchClient>,
    processor: Arc<QueryProcessor>,
}

impl SearchService {
    pub fn new(search_index: Arc<ElasticsearchClient>, processor: Arc<QueryProcessor>) -> Self {
        Self {
            search_index,
            processor,
        }
    }

    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        let query = request.query.trim();
        if query.is_empty() {
            return Err(ApiError::InvalidInput("Query must not be empty".to_string()));
        }

        let limit = request.limit.clamp(1, MAX_PAGE_SIZE);

        let processed = if request.enable_nlp {
            Some(self.processor.process(query).await)
        } else {
            None
        };

        let (query_text, parameters) = match &processed {
            Some(processed) => (
                processed.expansion.expanded_query.as_str(),
                processed.parameters.clone(),
            ),
            None => (query, SearchParameters::default()),
        };

        let filters = merge_filters(&parameters.filters, &request.filters);
        let sort = if request.sort.is_empty() {
            &parameters.sort
        } else {
            &request.sort
        };

        let body = build_query_body(
            query_text,
            &parameters.boost,
            &filters,
            sort,
            request.page,
            limit,
        );
        debug!("Search request body: {body}");

        let results = self
            .search_index
            .search(&body)
            .await
            .map_err(|err| ApiError::SearchEngineError(err.to_string()))?;

        let total = results.hits.total.value;
        info!("Search '{query}' matched {total} products");

        Ok(SearchResponse {
            query: query.to_string(),
            products: collect_products(&results),
            pagination: PaginationInfo::new(total, request.page, limit),
            facets: collect_facets(results.aggregations.as_ref()),
            nlp: processed.map(nlp_summary),
        })
    }

    /// Run the pipeline without executing a search. Backs the analyze
    /// endpoint used by storefront autocomplete and debugging.
    pub async fn analyze(&self, query: &str) -> Result<ProcessedQuery> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ApiError::InvalidInput("Query must not be empty".to_string()));
        }
        Ok(self.processor.process(query).await)
    }
}

/// Explicit request filters win over pipeline-inferred ones, field by field.
fn merge_filters(inferred: &SearchFilters, explicit: &SearchFilters) -> SearchFilters {
    fn pick_list(inferred: &[String], explicit: &[String]) -> Vec<String> {
        if explicit.is_empty() {
            inferred.to_vec()
        } else {
            explicit.to_vec()
        }
    }

    SearchFilters {
        categories: pick_list(&inferred.categories, &explicit.categories),
        brands: pick_list(&inferred.brands, &explicit.brands),
        values: pick_list(&inferred.values, &explicit.values),
        colors: pick_list(&inferred.colors, &explicit.colors),
        sizes: pick_list(&inferred.sizes, &explicit.sizes),
        materials: pick_list(&inferred.materials, &explicit.materials),
        price_min: explicit.price_min.or(inferred.price_min),
        price_max: explicit.price_max.or(inferred.price_max),
        rating: explicit.rating.or(inferred.rating),
        rating_min: explicit.rating_min.or(inferred.rating_min),
        in_stock: explicit.in_stock.or(inferred.in_stock),
    }
}

fn build_query_body(
    query_text: &str,
    boost: &std::collections::BTreeMap<String, f32>,
    filters: &SearchFilters,
    sort: &[SortDirective],
    page: usize,
    limit: usize,
) -> Value {
    let fields: Vec<String> = if boost.is_empty() {
        DEFAULT_SEARCH_FIELDS.iter().map(|f| f.to_string()).collect()
    } else {
        boost
            .iter()
            .map(|(field, weight)| format!("{field}^{weight}"))
            .collect()
    };

    let mut body = json!({
        "from": page * limit,
        "size": limit,
        "query": {
            "bool": {
                "must": [{
                    "multi_match": {
                        "query": query_text,
                        "fields": fields,
                        "fuzziness": "AUTO"
                    }
                }],
                "filter": filter_clauses(filters)
            }
        },
        "aggs": {
            "categories": { "terms": { "field": "categories.keyword", "size": 10 } },
            "values": { "terms": { "field": "values.keyword", "size": 10 } },
            "price_stats": { "stats": { "field": "price" } }
        }
    });

    if !sort.is_empty() {
        let mut directives: Vec<Value> = sort
            .iter()
            .map(|d| json!({ &d.field: { "order": d.order } }))
            .collect();
        directives.push(json!("_score"));
        body["sort"] = Value::Array(directives);
    }

    body
}

fn filter_clauses(filters: &SearchFilters) -> Vec<Value> {
    let mut clauses = Vec::new();

    let term_lists = [
        ("categories", &filters.categories),
        ("brand_name", &filters.brands),
        ("values", &filters.values),
        ("color", &filters.colors),
        ("size", &filters.sizes),
        ("material", &filters.materials),
    ];
    for (field, list) in term_lists {
        if !list.is_empty() {
            clauses.push(json!({ "terms": { format!("{field}.keyword"): list } }));
        }
    }

    if filters.price_min.is_some() || filters.price_max.is_some() {
        let mut range = serde_json::Map::new();
        if let Some(min) = filters.price_min {
            range.insert("gte".to_string(), json!(min));
        }
        if let Some(max) = filters.price_max {
            range.insert("lte".to_string(), json!(max));
        }
        clauses.push(json!({ "range": { "price": range } }));
    }

    if let Some(rating) = filters.rating {
        clauses.push(json!({ "term": { "rating": rating } }));
    }
    if let Some(rating_min) = filters.rating_min {
        clauses.push(json!({ "range": { "rating": { "gte": rating_min } } }));
    }
    if let Some(in_stock) = filters.in_stock {
        clauses.push(json!({ "term": { "in_stock": in_stock } }));
    }

    clauses
}

fn collect_products(results: &SearchResults) -> Vec<ProductSearchResult> {
    results
        .hits
        .hits
        .iter()
        .map(|hit| ProductSearchResult {
            id: hit.id.clone(),
            score: hit.score,
            name: hit.source.name.clone(),
            description: hit.source.description.clone(),
            price: hit.source.price,
            currency: hit.source.currency.clone(),
            brand_name: hit.source.brand_name.clone(),
            merchant_name: hit.source.merchant_name.clone(),
            categories: hit.source.categories.clone(),
            values: hit.source.values.clone(),
            rating: hit.source.rating,
            review_count: hit.source.review_count,
            in_stock: hit.source.in_stock,
        })
        .collect()
}

fn collect_facets(aggregations: Option<&Value>) -> SearchFacets {
    let Some(aggs) = aggregations else {
        return SearchFacets::default();
    };

    SearchFacets {
        categories: facet_buckets(aggs, "categories"),
        values: facet_buckets(aggs, "values"),
        price: price_facet(aggs),
    }
}

fn facet_buckets(aggs: &Value, name: &str) -> Vec<FacetBucket> {
    aggs.get(name)
        .and_then(|agg| agg.get("buckets"))
        .and_then(|buckets| buckets.as_array())
        .map(|buckets| {
            buckets
                .iter()
                .filter_map(|bucket| {
                    let key = bucket.get("key")?.as_str()?;
                    let count = bucket.get("doc_count")?.as_u64()?;
                    Some(FacetBucket {
                        key: key.to_string(),
                        count,
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

fn price_facet(aggs: &Value) -> Option<PriceFacet> {
    let stats = aggs.get("price_stats")?;
    Some(PriceFacet {
        min: stats.get("min")?.as_f64()? as f32,
        max: stats.get("max")?.as_f64()? as f32,
        avg: stats.get("avg")?.as_f64()? as f32,
    })
}

fn nlp_summary(processed: ProcessedQuery) -> NlpSummary {
    NlpSummary {
        intent: processed.intent.intent,
        confidence: processed.intent.confidence,
        secondary_intents: processed.intent.secondary,
        entities: processed.entities,
        expanded_query: processed.expansion.expanded_query,
        expansion_terms: processed.expansion.terms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::intent_detection::SortOrder;
    use std::collections::BTreeMap;

    fn boost(pairs: &[(&str, f32)]) -> BTreeMap<String, f32> {
        pairs
            .iter()
            .map(|(field, weight)| (field.to_string(), *weight))
            .collect()
    }

    #[test]
    fn test_query_body_uses_boosted_fields() {
        let body = build_query_body(
            "linen shirt",
            &boost(&[("name", 2.0), ("description", 1.0)]),
            &SearchFilters::default(),
            &[],
            0,
            20,
        );

        let fields = body["query"]["bool"]["must"][0]["multi_match"]["fields"]
            .as_array()
            .unwrap();
        assert!(fields.contains(&serde_json::json!("name^2")));
        assert!(fields.contains(&serde_json::json!("description^1")));
        assert_eq!(body["from"], 0);
        assert_eq!(body["size"], 20);
    }

    #[test]
    fn test_query_body_default_fields() {
        let body = build_query_body(
            "linen shirt",
            &BTreeMap::new(),
            &SearchFilters::default(),
            &[],
            2,
            10,
        );

        let fields = body["query"]["bool"]["must"][0]["multi_match"]["fields"]
            .as_array()
            .unwrap();
        assert!(fields.contains(&serde_json::json!("name^2")));
        assert_eq!(body["from"], 20);
    }

    #[test]
    fn test_filter_clauses() {
        let filters = SearchFilters {
            categories: vec!["dresses".to_string()],
            price_min: Some(20.0),
            price_max: Some(80.0),
            rating_min: Some(4.0),
            in_stock: Some(true),
            ..Default::default()
        };

        let clauses = filter_clauses(&filters);
        assert_eq!(clauses.len(), 4);
        assert_eq!(clauses[0]["terms"]["categories.keyword"][0], "dresses");
        assert_eq!(clauses[1]["range"]["price"]["gte"], 20.0);
        assert_eq!(clauses[1]["range"]["price"]["lte"], 80.0);
        assert_eq!(clauses[2]["range"]["rating"]["gte"], 4.0);
        assert_eq!(clauses[3]["term"]["in_stock"], true);
    }

    #[test]
    fn test_sort_directives_keep_score_tiebreak() {
        let sort = vec![SortDirective {
            field: "price".to_string(),
            order: SortOrder::Asc,
        }];
        let body = build_query_body(
            "jeans",
            &BTreeMap::new(),
            &SearchFilters::default(),
            &sort,
            0,
            20,
        );

        let directives = body["sort"].as_array().unwrap();
        assert_eq!(directives.len(), 2);
        assert_eq!(directives[0]["price"]["order"], "asc");
        assert_eq!(directives[1], "_score");
    }

    #[test]
    fn test_explicit_filters_override_inferred() {
        let inferred = SearchFilters {
            categories: vec!["dresses".to_string()],
            price_max: Some(100.0),
            in_stock: Some(true),
            ..Default::default()
        };
        let explicit = SearchFilters {
            categories: vec!["tops".to_string()],
            price_max: Some(50.0),
            ..Default::default()
        };

        let merged = merge_filters(&inferred, &explicit);
        assert_eq!(merged.categories, vec!["tops"]);
        assert_eq!(merged.price_max, Some(50.0));
        // Untouched fields fall through to the inferred filter
        assert_eq!(merged.in_stock, Some(true));
    }

    #[test]
    fn test_facet_collection() {
        let aggs = serde_json::json!({
            "categories": {
                "buckets": [
                    { "key": "dresses", "doc_count": 12 },
                    { "key": "tops", "doc_count": 7 }
                ]
            },
            "values": { "buckets": [] },
            "price_stats": { "count": 19, "min": 18.0, "max": 240.0, "avg": 64.5 }
        });

        let facets = collect_facets(Some(&aggs));
        assert_eq!(facets.categories.len(), 2);
        assert_eq!(facets.categories[0].key, "dresses");
        assert_eq!(facets.categories[0].count, 12);
        assert!(facets.values.is_empty());
        let price = facets.price.unwrap();
        assert_eq!(price.min, 18.0);
        assert_eq!(price.avg, 64.5);
    }
}
