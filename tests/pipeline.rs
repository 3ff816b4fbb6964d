//! End-to-end pipeline tests against a scripted LLM provider and mock tools.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use ops_assistant::errors::ToolError;
use ops_assistant::llm::{StubLlmProvider, StubResponse};
use ops_assistant::tools::{Tool, ToolOutput, ToolRegistry};
use ops_assistant::types::TaskOutcome;
use ops_assistant::Assistant;

struct ScriptedTool {
    name: &'static str,
    outcomes: Mutex<VecDeque<ToolOutput>>,
    invocations: AtomicUsize,
}

impl ScriptedTool {
    fn new(name: &'static str, outcomes: Vec<ToolOutput>) -> Arc<Self> {
        Arc::new(Self {
            name,
            outcomes: Mutex::new(outcomes.into()),
            invocations: AtomicUsize::new(0),
        })
    }

    fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Tool for ScriptedTool {
    fn name(&self) -> &str {
        self.name
    }
    fn description(&self) -> &str {
        "scripted tool"
    }
    async fn execute(&self, _params: &Map<String, Value>) -> Result<ToolOutput, ToolError> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| ToolOutput::fail("script exhausted")))
    }
}

fn registry_with(tools: Vec<Arc<ScriptedTool>>) -> Arc<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    for tool in tools {
        registry.register(tool);
    }
    Arc::new(registry)
}

const PLAN_JSON: &str = r#"```json
{
    "task_understanding": "weather in Mumbai",
    "steps": [
        {"step_number": 1, "description": "Fetch weather", "tool": "weather_fetch",
         "parameters": {"city": "Mumbai"}}
    ],
    "expected_output": "current conditions"
}
```"#;

const VERIFIED_VERDICT: &str = r#"{"verified": true, "completeness_score": 95, "issues": [], "missing_data": [], "needs_retry": false}"#;

#[tokio::test]
async fn happy_path_completes_with_response_and_metadata() {
    let stub = Arc::new(StubLlmProvider::with_texts(vec![
        PLAN_JSON,
        VERIFIED_VERDICT,
        "It's 29 degrees and hazy in Mumbai.",
    ]));
    let tool = ScriptedTool::new(
        "weather_fetch",
        vec![ToolOutput::ok(json!({"temp": 29, "conditions": "haze"}))],
    );
    let assistant = Assistant::new(stub.clone(), registry_with(vec![tool.clone()]));

    let outcome = assistant.process_task("weather in Mumbai?").await;
    match outcome {
        TaskOutcome::Completed { response, metadata } => {
            assert_eq!(response, "It's 29 degrees and hazy in Mumbai.");
            assert_eq!(metadata.verification.completeness_score, 95);
            assert_eq!(metadata.plan.steps.len(), 1);
            assert!(metadata
                .execution_summary
                .contains("- Step 1: Fetch weather (using weather_fetch)"));
        }
        other => panic!("expected completion, got {other:?}"),
    }
    // plan + verdict + final response
    assert_eq!(stub.call_count(), 3);
    assert_eq!(tool.invocations(), 1);
}

#[tokio::test]
async fn planning_failure_skips_execution_and_verification() {
    let stub = Arc::new(StubLlmProvider::new(vec![StubResponse::Fail(
        "service down".to_string(),
    )]));
    let tool = ScriptedTool::new("weather_fetch", vec![]);
    let assistant = Assistant::new(stub.clone(), registry_with(vec![tool.clone()]));

    let outcome = assistant.process_task("weather in Mumbai?").await;
    match &outcome {
        TaskOutcome::PlanningFailed { error } => {
            // The prefix appears exactly once.
            assert_eq!(error, "Planning failed: LLM API error: service down");
        }
        other => panic!("expected planning failure, got {other:?}"),
    }
    assert!(!outcome.is_success());
    assert_eq!(stub.call_count(), 1);
    assert_eq!(tool.invocations(), 0);
}

#[tokio::test]
async fn non_critical_step_failure_is_rejected_without_a_verdict_call() {
    let plan = r#"{
        "task_understanding": "weather and news",
        "steps": [
            {"step_number": 1, "description": "Fetch weather", "tool": "weather_fetch",
             "parameters": {"city": "Mumbai"}},
            {"step_number": 2, "description": "Fetch news", "tool": "news_fetch",
             "parameters": {}}
        ],
        "expected_output": "both"
    }"#;
    let stub = Arc::new(StubLlmProvider::with_texts(vec![plan]));
    let weather = ScriptedTool::new("weather_fetch", vec![ToolOutput::ok(json!({"temp": 29}))]);
    // Fails both attempts with a transient error.
    let news = ScriptedTool::new(
        "news_fetch",
        vec![
            ToolOutput::fail("rate limit"),
            ToolOutput::fail("rate limit"),
        ],
    );
    let assistant = Assistant::new(stub.clone(), registry_with(vec![weather, news.clone()]));

    let outcome = assistant.process_task("weather and news").await;
    match outcome {
        TaskOutcome::Rejected {
            issues,
            partial_results,
            needs_retry,
        } => {
            assert_eq!(issues, vec!["Step 2 failed: rate limit".to_string()]);
            let partial = partial_results.unwrap();
            assert_eq!(partial.len(), 1);
            assert_eq!(partial[0].step_number, Some(1));
            assert!(needs_retry);
        }
        other => panic!("expected rejection, got {other:?}"),
    }
    // Structural rejection happens before any verdict call: plan only.
    assert_eq!(stub.call_count(), 1);
    assert_eq!(news.invocations(), 2);
}

#[tokio::test]
async fn critical_abort_is_rejected_as_execution_failure() {
    let plan = r#"{
        "task_understanding": "weather",
        "steps": [
            {"step_number": 1, "description": "Fetch weather", "tool": "weather_fetch",
             "parameters": {"city": "Atlantis"}, "critical": true}
        ],
        "expected_output": "conditions"
    }"#;
    let stub = Arc::new(StubLlmProvider::with_texts(vec![plan]));
    let weather = ScriptedTool::new(
        "weather_fetch",
        vec![ToolOutput::fail("City 'Atlantis' not found")],
    );
    let assistant = Assistant::new(stub.clone(), registry_with(vec![weather.clone()]));

    let outcome = assistant.process_task("weather in Atlantis").await;
    match outcome {
        TaskOutcome::Rejected {
            issues, needs_retry, ..
        } => {
            assert_eq!(issues, vec!["Execution failed".to_string()]);
            assert!(needs_retry);
        }
        other => panic!("expected rejection, got {other:?}"),
    }
    // Terminal "not found" error: a single attempt, no verdict call.
    assert_eq!(weather.invocations(), 1);
    assert_eq!(stub.call_count(), 1);
}

#[tokio::test]
async fn verdict_outage_falls_back_to_optimistic_completion() {
    let stub = Arc::new(StubLlmProvider::with_texts(vec![
        PLAN_JSON,
        "I can't produce JSON right now, sorry.",
        "Weather fetched successfully.",
    ]));
    let tool = ScriptedTool::new("weather_fetch", vec![ToolOutput::ok(json!({"temp": 29}))]);
    let assistant = Assistant::new(stub.clone(), registry_with(vec![tool]));

    let outcome = assistant.process_task("weather in Mumbai?").await;
    match outcome {
        TaskOutcome::Completed { response, metadata } => {
            assert_eq!(response, "Weather fetched successfully.");
            assert_eq!(metadata.verification.completeness_score, 80);
            assert!(metadata.verification.issues[0].starts_with("LLM verification failed:"));
        }
        other => panic!("expected optimistic completion, got {other:?}"),
    }
    assert_eq!(stub.call_count(), 3);
}

#[tokio::test]
async fn unknown_tool_rejects_with_not_found_issue() {
    let plan = r#"{
        "task_understanding": "stocks",
        "steps": [
            {"step_number": 1, "description": "Fetch stock price", "tool": "stock_fetch",
             "parameters": {"symbol": "ACME"}}
        ],
        "expected_output": "price"
    }"#;
    let stub = Arc::new(StubLlmProvider::with_texts(vec![plan]));
    let assistant = Assistant::new(stub, registry_with(vec![]));

    let outcome = assistant.process_task("price of ACME").await;
    match outcome {
        TaskOutcome::Rejected { issues, .. } => {
            assert_eq!(
                issues,
                vec!["Step 1 failed: Tool 'stock_fetch' not found".to_string()]
            );
        }
        other => panic!("expected rejection, got {other:?}"),
    }
}
