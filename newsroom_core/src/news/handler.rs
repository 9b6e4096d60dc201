use reqwest::{Client, StatusCode};

use super::dto::NewsResponse;

pub const PAGE_SIZE: usize = 5;

const USER_AGENT: &str = "Newsroom/1.0";

/// Thin client over the news search `everything` endpoint.
#[derive(Clone)]
pub struct NewsClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl NewsClient {
    pub fn new(client: Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    /// Fetch up to [`PAGE_SIZE`] articles for `topic` as plain-text blocks.
    ///
    /// Any failure (non-200, transport, undecodable body) yields an empty
    /// vector: callers treat it as "no news found".
    pub async fn fetch_articles(&self, topic: &str) -> Vec<String> {
        let page_size = PAGE_SIZE.to_string();
        let response = match self
            .client
            .get(&self.base_url)
            .header("User-Agent", USER_AGENT)
            .query(&[
                ("q", topic),
                ("apiKey", self.api_key.as_str()),
                ("pageSize", page_size.as_str()),
            ])
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                log::error!("Exception occurred during news API request: {}", e);
                return vec![];
            }
        };

        if response.status() != StatusCode::OK {
            log::warn!(
                "News API returned {} for topic '{}', treating as no news",
                response.status(),
                topic
            );
            return vec![];
        }

        let news = match response.json::<NewsResponse>().await {
            Ok(news) => news,
            Err(e) => {
                log::error!("Failed to parse news API response: {}", e);
                return vec![];
            }
        };

        log::info!(
            "News API status '{}', {} total results for '{}'",
            news.status,
            news.total_results,
            topic
        );

        news.articles
            .iter()
            .take(PAGE_SIZE)
            .map(|article| article.to_block())
            .collect()
    }
}
