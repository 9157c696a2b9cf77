use serde::{Deserialize, Serialize};

use crate::services::entity_recognition::ExtractedEntity;
use crate::services::intent_detection::{IntentScore, QueryIntent, SearchFilters, SortDirective};

fn default_limit() -> usize {
    20
}

fn default_true() -> bool {
    true
}

/// Body of `POST /api/search`.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    /// Zero-based page index
    #[serde(default)]
    pub page: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Run the query-understanding pipeline; when false the query text is
    /// matched as-is with default boosts
    #[serde(default = "default_true")]
    pub enable_nlp: bool,
    /// Explicit filters, merged over anything the pipeline inferred
    #[serde(default)]
    pub filters: SearchFilters,
    /// Explicit sort, overriding anything the pipeline inferred
    #[serde(default)]
    pub sort: Vec<SortDirective>,
}

/// Body of `POST /api/query/analyze`.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzeRequest {
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub products: Vec<ProductSearchResult>,
    pub pagination: PaginationInfo,
    pub facets: SearchFacets,
    /// Present when the pipeline ran for this request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nlp: Option<NlpSummary>,
}

/// What the pipeline understood about the query, echoed back to the caller.
#[derive(Debug, Serialize)]
pub struct NlpSummary {
    pub intent: QueryIntent,
    pub confidence: f32,
    pub secondary_intents: Vec<IntentScore>,
    pub entities: Vec<ExtractedEntity>,
    pub expanded_query: String,
    pub expansion_terms: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ProductSearchResult {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
    pub name: String,
    pub description: String,
    pub price: f32,
    pub currency: String,
    pub brand_name: String,
    pub merchant_name: String,
    pub categories: Vec<String>,
    pub values: Vec<String>,
    pub rating: f32,
    pub review_count: u32,
    pub in_stock: bool,
}

#[derive(Debug, PartialEq, Serialize)]
pub struct PaginationInfo {
    pub total: u64,
    pub page: usize,
    pub limit: usize,
    pub total_pages: usize,
    pub has_next: bool,
    pub has_previous: bool,
}

impl PaginationInfo {
    pub fn new(total: u64, page: usize, limit: usize) -> Self {
        let total_pages = if limit == 0 {
            0
        } else {
            (total as usize).div_ceil(limit)
        };
        Self {
            total,
            page,
            limit,
            total_pages,
            has_next: page + 1 < total_pages,
            has_previous: page > 0 && total_pages > 0,
        }
    }
}

#[derive(Debug, Default, Serialize)]
pub struct SearchFacets {
    pub categories: Vec<FacetBucket>,
    pub values: Vec<FacetBucket>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<PriceFacet>,
}

#[derive(Debug, PartialEq, Serialize)]
pub struct FacetBucket {
    pub key: String,
    pub count: u64,
}

#[derive(Debug, Serialize)]
pub struct PriceFacet {
    pub min: f32,
    pub max: f32,
    pub avg: f32,
}
