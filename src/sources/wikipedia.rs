//! Encyclopedia lookup through the `MediaWiki` action API

use super::{truncate_chars, within, KnowledgeSource, SourceError};
use crate::state_machine::Passage;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_ENDPOINT: &str = "https://en.wikipedia.org/w/api.php";
const USER_AGENT: &str = concat!("medigenius/", env!("CARGO_PKG_VERSION"));

/// Searches for the best matching articles and returns their plain-text intros
/// as one combined passage
pub struct Wikipedia {
    client: Client,
    endpoint: String,
    top_k: usize,
    max_chars: usize,
    timeout: Duration,
}

impl Wikipedia {
    pub fn new(top_k: usize, max_chars: usize, timeout: Duration) -> Result<Self, String> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| format!("Failed to create HTTP client: {e}"))?;

        Ok(Self {
            client,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            top_k,
            max_chars,
            timeout,
        })
    }

    async fn search_titles(&self, query: &str) -> Result<Vec<String>, SourceError> {
        let limit = self.top_k.to_string();
        let body: SearchResponse = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("action", "query"),
                ("list", "search"),
                ("srsearch", query),
                ("srlimit", limit.as_str()),
                ("format", "json"),
                ("formatversion", "2"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(body.query.search.into_iter().map(|hit| hit.title).collect())
    }

    async fn extracts(&self, titles: &[String]) -> Result<Vec<Article>, SourceError> {
        let joined = titles.join("|");
        let body: ExtractResponse = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("action", "query"),
                ("prop", "extracts"),
                ("exintro", "1"),
                ("explaintext", "1"),
                ("redirects", "1"),
                ("titles", joined.as_str()),
                ("format", "json"),
                ("formatversion", "2"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(order_by_titles(body.query.pages, titles))
    }
}

#[async_trait]
impl KnowledgeSource for Wikipedia {
    fn name(&self) -> &'static str {
        "wikipedia"
    }

    async fn fetch(&self, query: &str) -> Result<Vec<Passage>, SourceError> {
        within(self.timeout, async {
            let titles = self.search_titles(query).await?;
            if titles.is_empty() {
                return Err(SourceError::Empty);
            }
            let articles = self.extracts(&titles).await?;
            summarize(&articles, self.max_chars)
                .map(|text| vec![Passage::new(text)])
                .ok_or(SourceError::Empty)
        })
        .await
    }
}

/// Page/Summary blocks for every article with an extract, capped at `max_chars`
fn summarize(articles: &[Article], max_chars: usize) -> Option<String> {
    let blocks: Vec<String> = articles
        .iter()
        .filter_map(|a| {
            let extract = a.extract.as_deref()?.trim();
            (!extract.is_empty()).then(|| format!("Page: {}\nSummary: {extract}", a.title))
        })
        .collect();

    if blocks.is_empty() {
        return None;
    }
    Some(truncate_chars(&blocks.join("\n\n"), max_chars).to_string())
}

/// Pages come back in API order; restore search-rank order
fn order_by_titles(mut pages: Vec<Article>, titles: &[String]) -> Vec<Article> {
    pages.sort_by_key(|page| {
        titles
            .iter()
            .position(|t| *t == page.title)
            .unwrap_or(usize::MAX)
    });
    pages
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    query: SearchQuery,
}

#[derive(Debug, Default, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    search: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    title: String,
}

#[derive(Debug, Deserialize)]
struct ExtractResponse {
    #[serde(default)]
    query: ExtractQuery,
}

#[derive(Debug, Default, Deserialize)]
struct ExtractQuery {
    #[serde(default)]
    pages: Vec<Article>,
}

#[derive(Debug, Deserialize)]
struct Article {
    title: String,
    #[serde(default)]
    extract: Option<String>,
}
