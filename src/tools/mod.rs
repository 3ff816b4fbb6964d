//! Tool providers and the registry that dispatches them by name.
//!
//! Every tool satisfies one contract: a name and description (consumed
//! verbatim in the planner prompt) plus an `execute` returning a
//! [`ToolOutput`] payload. Tools report remote failures as
//! `ToolOutput { success: false, error }` rather than `Err`; the `Err` path
//! is reserved for calls that could not be made at all (bad parameters,
//! client construction) and is treated as retryable by the executor.
//!
//! Terminal failures — missing credentials, unknown resources, tier limits —
//! must include the substring `"not configured"` or `"not found"` in the
//! error message. The executor's retry short-circuit matches on exactly
//! those substrings.

pub mod github;
pub mod news;
pub mod weather;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::AssistantConfig;
use crate::errors::ToolError;

pub use github::GithubSearchTool;
pub use news::NewsTool;
pub use weather::WeatherTool;

/// Per-request timeout for tool HTTP calls.
pub(crate) const TOOL_TIMEOUT: Duration = Duration::from_secs(10);

/// Result payload of a tool call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutput {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolOutput {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

/// Name and description entry for the planner's capability catalog.
#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
}

/// Uniform execute contract implemented by each tool.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;

    async fn execute(&self, params: &Map<String, Value>) -> Result<ToolOutput, ToolError>;

    fn info(&self) -> ToolInfo {
        ToolInfo {
            name: self.name().to_string(),
            description: self.description().to_string(),
        }
    }
}

/// Name-keyed tool dispatch table. Registration order is preserved so the
/// planner's catalog is deterministic.
#[derive(Default)]
pub struct ToolRegistry {
    tools: IndexMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the three built-in tools, wired from config.
    pub fn with_default_tools(config: &AssistantConfig) -> Result<Self, ToolError> {
        let mut registry = Self::new();
        registry.register(Arc::new(GithubSearchTool::new(config.github_token.clone())?));
        registry.register(Arc::new(WeatherTool::new(config.openweather_api_key.clone())?));
        registry.register(Arc::new(NewsTool::new(config.news_api_key.clone())?));
        Ok(registry)
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    pub fn catalog(&self) -> Vec<ToolInfo> {
        self.tools.values().map(|t| t.info()).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

pub(crate) fn required_str<'a>(
    params: &'a Map<String, Value>,
    key: &str,
) -> Result<&'a str, ToolError> {
    params
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| ToolError::InvalidParams(format!("missing required parameter '{key}'")))
}

pub(crate) fn optional_str<'a>(params: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    params.get(key).and_then(Value::as_str)
}

pub(crate) fn optional_u64(params: &Map<String, Value>, key: &str, default: u64) -> u64 {
    params.get(key).and_then(Value::as_u64).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Dummy(&'static str);

    #[async_trait]
    impl Tool for Dummy {
        fn name(&self) -> &str {
            self.0
        }
        fn description(&self) -> &str {
            "dummy"
        }
        async fn execute(&self, _params: &Map<String, Value>) -> Result<ToolOutput, ToolError> {
            Ok(ToolOutput::ok(Value::Null))
        }
    }

    #[test]
    fn registry_preserves_registration_order() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(Dummy("b_tool")));
        registry.register(Arc::new(Dummy("a_tool")));
        assert_eq!(registry.names(), vec!["b_tool", "a_tool"]);
        assert_eq!(registry.catalog()[0].name, "b_tool");
    }

    #[test]
    fn required_str_rejects_missing_and_non_string() {
        let mut params = Map::new();
        params.insert("count".to_string(), Value::from(3));
        assert!(required_str(&params, "query").is_err());
        assert!(required_str(&params, "count").is_err());
        params.insert("query".to_string(), Value::from("rust"));
        assert_eq!(required_str(&params, "query").unwrap(), "rust");
    }

    #[test]
    fn optional_u64_falls_back_to_default() {
        let mut params = Map::new();
        assert_eq!(optional_u64(&params, "max_results", 5), 5);
        params.insert("max_results".to_string(), Value::from(2));
        assert_eq!(optional_u64(&params, "max_results", 5), 2);
    }
}
