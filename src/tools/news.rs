//! News headlines tool backed by NewsAPI.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::errors::ToolError;

use super::{optional_str, optional_u64, Tool, ToolOutput, TOOL_TIMEOUT};

const NEWS_API_URL: &str = "https://newsapi.org/v2/top-headlines";
const DEFAULT_MAX_RESULTS: u64 = 5;
const DEFAULT_COUNTRY: &str = "us";

pub struct NewsTool {
    api_key: Option<String>,
    base_url: String,
    client: reqwest::Client,
}

impl NewsTool {
    pub fn new(api_key: Option<String>) -> Result<Self, ToolError> {
        let client = reqwest::Client::builder().timeout(TOOL_TIMEOUT).build()?;
        Ok(Self {
            api_key,
            base_url: NEWS_API_URL.to_string(),
            client,
        })
    }
}

#[async_trait]
impl Tool for NewsTool {
    fn name(&self) -> &str {
        "news_fetch"
    }

    fn description(&self) -> &str {
        "Fetch latest news headlines on any topic or from any country. Returns news articles \
         with titles, descriptions, sources, and URLs. Use this for current events, news, or \
         trending topics."
    }

    async fn execute(&self, params: &Map<String, Value>) -> Result<ToolOutput, ToolError> {
        let query = optional_str(params, "query");
        let country = optional_str(params, "country").unwrap_or(DEFAULT_COUNTRY);
        let max_results = optional_u64(params, "max_results", DEFAULT_MAX_RESULTS);

        let Some(api_key) = &self.api_key else {
            return Ok(ToolOutput::fail(
                "NEWS_API_KEY not configured. Get free API key from https://newsapi.org",
            ));
        };
        debug!(?query, country, max_results, "fetching news headlines");

        let mut query_params = vec![
            ("apiKey", api_key.clone()),
            ("pageSize", max_results.to_string()),
        ];
        match query {
            Some(q) => query_params.push(("q", q.to_string())),
            None => query_params.push(("country", country.to_string())),
        }

        let response = match self
            .client
            .get(&self.base_url)
            .query(&query_params)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                return Ok(ToolOutput::fail("News API request timed out"))
            }
            Err(e) => return Ok(ToolOutput::fail(format!("News tool error: {e}"))),
        };

        match response.status() {
            StatusCode::OK => {
                let body: Value = match response.json().await {
                    Ok(body) => body,
                    Err(e) => return Ok(ToolOutput::fail(format!("News tool error: {e}"))),
                };
                Ok(ToolOutput::ok(headlines_payload(&body, max_results as usize)))
            }
            StatusCode::UNAUTHORIZED => Ok(ToolOutput::fail("Invalid NewsAPI key")),
            StatusCode::UPGRADE_REQUIRED => Ok(ToolOutput::fail(
                "NewsAPI upgrade required (free tier limitations)",
            )),
            status => Ok(ToolOutput::fail(format!(
                "News API error: {}",
                status.as_u16()
            ))),
        }
    }
}

fn headlines_payload(body: &Value, max_results: usize) -> Value {
    let empty = Vec::new();
    let articles: Vec<Value> = body
        .get("articles")
        .and_then(Value::as_array)
        .unwrap_or(&empty)
        .iter()
        .take(max_results)
        .map(|article| {
            json!({
                "title": article.get("title").cloned().unwrap_or(Value::Null),
                "description": article
                    .get("description")
                    .and_then(Value::as_str)
                    .unwrap_or("No description"),
                "source": article
                    .pointer("/source/name")
                    .and_then(Value::as_str)
                    .unwrap_or("Unknown"),
                "author": article.get("author").and_then(Value::as_str).unwrap_or("Unknown"),
                "url": article.get("url").cloned().unwrap_or(Value::Null),
                "published_at": article.get("publishedAt").cloned().unwrap_or(Value::Null),
            })
        })
        .collect();

    json!({
        "total_results": body.get("totalResults").and_then(Value::as_u64).unwrap_or(0),
        "articles": articles,
    })
}
