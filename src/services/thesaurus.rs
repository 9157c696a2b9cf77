use anyhow::Result;
use reqwest::Client;
use serde::Deserialize;

/// Client for a Datamuse-style thesaurus HTTP API.
#[derive(Debug, Clone)]
pub struct ThesaurusClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ThesaurusEntry {
    word: String,
}

impl ThesaurusClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Look up synonyms for a single word. Multi-word results are dropped;
    /// expansion terms are appended to the query verbatim and phrases would
    /// distort the token stream.
    pub async fn synonyms(&self, word: &str, max: usize) -> Result<Vec<String>> {
        let response = self
            .client
            .get(format!("{}/words", self.base_url))
            .query(&[("rel_syn", word), ("max", &max.to_string())])
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            anyhow::bail!("Thesaurus lookup failed: {}", error_text);
        }

        let entries: Vec<ThesaurusEntry> = response.json().await?;
        Ok(entries
            .into_iter()
            .map(|entry| entry.word)
            .filter(|synonym| synonym != word && !synonym.contains(' ') && !synonym.contains('_'))
            .take(max)
            .collect())
    }
}
