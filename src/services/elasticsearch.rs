use anyhow::Result;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

/// Thin JSON client for the search engine's HTTP API.
#[derive(Debug, Clone)]
pub struct ElasticsearchClient {
    client: Client,
    base_url: String,
    index: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchResults {
    pub hits: Hits,
    #[serde(default)]
    pub aggregations: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct Hits {
    #[serde(default)]
    pub total: TotalHits,
    #[serde(default)]
    pub hits: Vec<Hit>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TotalHits {
    #[serde(default)]
    pub value: u64,
}

#[derive(Debug, Deserialize)]
pub struct Hit {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_score")]
    pub score: Option<f32>,
    #[serde(rename = "_source", default)]
    pub source: ProductDocument,
}

/// Product document shape in the search index. Every field is defaulted so a
/// sparse document never fails deserialization.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ProductDocument {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: f32,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub brand_name: String,
    #[serde(default)]
    pub merchant_name: String,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub values: Vec<String>,
    #[serde(default)]
    pub rating: f32,
    #[serde(default)]
    pub review_count: u32,
    #[serde(default)]
    pub in_stock: bool,
}

fn default_currency() -> String {
    "USD".to_string()
}

impl ElasticsearchClient {
    pub fn new(base_url: &str, index: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            index: index.to_string(),
        }
    }

    /// Execute a full search request body against the product index.
    pub async fn search(&self, body: &serde_json::Value) -> Result<SearchResults> {
        let response = self
            .client
            .post(format!("{}/{}/_search", self.base_url, self.index))
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            anyhow::bail!("Search request failed: {}", error_text);
        }

        let results = response.json().await?;
        Ok(results)
    }

    /// Related terms via a significant-terms aggregation over documents
    /// matching the query text.
    pub async fn significant_terms(&self, text: &str, limit: usize) -> Result<Vec<String>> {
        let body = json!({
            "size": 0,
            "query": { "match": { "description": text } },
            "aggs": {
                "significant_terms": {
                    "significant_terms": { "field": "description", "size": limit }
                }
            }
        });

        let results = self.search(&body).await?;
        Ok(bucket_keys(results.aggregations.as_ref(), "significant_terms")
            .into_iter()
            .take(limit)
            .collect())
    }

    /// Distinct values of a keyword field, used to seed entity lexicons.
    pub async fn terms_aggregation(&self, field: &str, size: usize) -> Result<Vec<String>> {
        let body = json!({
            "size": 0,
            "aggs": {
                "terms": {
                    "terms": { "field": format!("{field}.keyword"), "size": size }
                }
            }
        });

        let results = self.search(&body).await?;
        Ok(bucket_keys(results.aggregations.as_ref(), "terms"))
    }
}

fn bucket_keys(aggregations: Option<&serde_json::Value>, name: &str) -> Vec<String> {
    aggregations
        .and_then(|aggs| aggs.get(name))
        .and_then(|agg| agg.get("buckets"))
        .and_then(|buckets| buckets.as_array())
        .map(|buckets| {
            buckets
                .iter()
                .filter_map(|bucket| bucket.get("key"))
                .filter_map(|key| key.as_str())
                .map(|key| key.to_lowercase())
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bucket_keys_extraction() {
        let aggs = json!({
            "categories": {
                "buckets": [
                    { "key": "Dresses", "doc_count": 12 },
                    { "key": "Shoes", "doc_count": 4 }
                ]
            }
        });

        let keys = bucket_keys(Some(&aggs), "categories");
        assert_eq!(keys, vec!["dresses", "shoes"]);
    }

    #[test]
    fn test_bucket_keys_missing_aggregation() {
        let aggs = json!({});
        assert!(bucket_keys(Some(&aggs), "categories").is_empty());
        assert!(bucket_keys(None, "categories").is_empty());
    }

    #[test]
    fn test_sparse_document_deserializes() {
        let hit: Hit = serde_json::from_value(json!({
            "_id": "p1",
            "_score": 1.2,
            "_source": { "name": "Linen Shirt" }
        }))
        .unwrap();

        assert_eq!(hit.source.name, "Linen Shirt");
        assert_eq!(hit.source.currency, "USD");
        assert_eq!(hit.source.review_count, 0);
    }
}
