//! GitHub repository search tool.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::errors::ToolError;

use super::{optional_u64, required_str, Tool, ToolOutput, TOOL_TIMEOUT};

const GITHUB_API_URL: &str = "https://api.github.com";
const DEFAULT_MAX_RESULTS: u64 = 5;

/// Searches GitHub repositories, sorted by stars. Works without a token,
/// subject to the anonymous rate limit.
pub struct GithubSearchTool {
    token: Option<String>,
    base_url: String,
    client: reqwest::Client,
}

impl GithubSearchTool {
    pub fn new(token: Option<String>) -> Result<Self, ToolError> {
        let client = reqwest::Client::builder()
            .timeout(TOOL_TIMEOUT)
            .user_agent("ops-assistant")
            .build()?;
        Ok(Self {
            token,
            base_url: GITHUB_API_URL.to_string(),
            client,
        })
    }
}

#[async_trait]
impl Tool for GithubSearchTool {
    fn name(&self) -> &str {
        "github_search"
    }

    fn description(&self) -> &str {
        "Search GitHub repositories, get repository details, stars, descriptions, and owner \
         information. Use this for finding open-source projects, checking repository popularity, \
         or getting project information."
    }

    async fn execute(&self, params: &Map<String, Value>) -> Result<ToolOutput, ToolError> {
        let query = required_str(params, "query")?;
        let max_results = optional_u64(params, "max_results", DEFAULT_MAX_RESULTS);
        debug!(query, max_results, "searching GitHub repositories");

        let mut request = self
            .client
            .get(format!("{}/search/repositories", self.base_url))
            .header("Accept", "application/vnd.github.v3+json")
            .query(&[
                ("q", query),
                ("sort", "stars"),
                ("order", "desc"),
                ("per_page", &max_results.to_string()),
            ]);
        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("token {token}"));
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                return Ok(ToolOutput::fail("GitHub API request timed out"))
            }
            Err(e) => return Ok(ToolOutput::fail(format!("GitHub tool error: {e}"))),
        };

        match response.status() {
            StatusCode::OK => {
                let body: Value = match response.json().await {
                    Ok(body) => body,
                    Err(e) => return Ok(ToolOutput::fail(format!("GitHub tool error: {e}"))),
                };
                Ok(ToolOutput::ok(search_payload(&body, max_results as usize)))
            }
            StatusCode::FORBIDDEN => Ok(ToolOutput::fail(
                "GitHub API rate limit exceeded. Add GITHUB_TOKEN for higher limits.",
            )),
            status => Ok(ToolOutput::fail(format!(
                "GitHub API error: {}",
                status.as_u16()
            ))),
        }
    }
}

fn search_payload(body: &Value, max_results: usize) -> Value {
    let empty = Vec::new();
    let items = body.get("items").and_then(Value::as_array).unwrap_or(&empty);
    let repositories: Vec<Value> = items
        .iter()
        .take(max_results)
        .map(|repo| {
            json!({
                "name": repo.get("name").cloned().unwrap_or(Value::Null),
                "full_name": repo.get("full_name").cloned().unwrap_or(Value::Null),
                "description": repo
                    .get("description")
                    .and_then(Value::as_str)
                    .unwrap_or("No description"),
                "stars": repo.get("stargazers_count").and_then(Value::as_u64).unwrap_or(0),
                "forks": repo.get("forks_count").and_then(Value::as_u64).unwrap_or(0),
                "language": repo.get("language").and_then(Value::as_str).unwrap_or("Unknown"),
                "url": repo.get("html_url").cloned().unwrap_or(Value::Null),
                "owner": repo
                    .get("owner")
                    .and_then(|o| o.get("login"))
                    .cloned()
                    .unwrap_or(Value::Null),
            })
        })
        .collect();

    json!({
        "total_count": body.get("total_count").and_then(Value::as_u64).unwrap_or(0),
        "repositories": repositories,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_query_is_an_invalid_params_error() {
        let tool = GithubSearchTool::new(None).unwrap();
        let err = tool.execute(&Map::new()).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidParams(_)));
    }

    #[test]
    fn search_payload_maps_and_caps_items() {
        let body = json!({
            "total_count": 12,
            "items": [
                {
                    "name": "tokio",
                    "full_name": "tokio-rs/tokio",
                    "description": "A runtime",
                    "stargazers_count": 25000,
                    "forks_count": 2200,
                    "language": "Rust",
                    "html_url": "https://github.com/tokio-rs/tokio",
                    "owner": {"login": "tokio-rs"}
                },
                {
                    "name": "bare",
                    "full_name": "x/bare",
                    "description": null,
                    "owner": {}
                },
                {"name": "third"}
            ]
        });
        let payload = search_payload(&body, 2);
        assert_eq!(payload["total_count"], 12);
        let repos = payload["repositories"].as_array().unwrap();
        assert_eq!(repos.len(), 2);
        assert_eq!(repos[0]["stars"], 25000);
        assert_eq!(repos[0]["owner"], "tokio-rs");
        assert_eq!(repos[1]["description"], "No description");
        assert_eq!(repos[1]["language"], "Unknown");
        assert_eq!(repos[1]["stars"], 0);
    }
}
