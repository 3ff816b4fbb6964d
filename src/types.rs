//! Data model shared across the planner, executor and verifier.
//!
//! A [`Plan`] is produced once per task, consumed once by the executor and
//! discarded after verification; nothing here has identity beyond a single
//! task invocation.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Accumulated outputs of successful steps, keyed by `step_<n>`.
///
/// Append-only during one plan execution. Later steps see earlier results
/// only by explicit key lookup; the context is never injected into step
/// parameters automatically. Insertion order is preserved so that summaries
/// and `context_available` listings are deterministic.
pub type ExecutionContext = IndexMap<String, Value>;

/// Structured decomposition of a task into ordered steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    #[serde(default)]
    pub task_understanding: String,
    pub steps: Vec<Step>,
    #[serde(default)]
    pub expected_output: String,
}

/// A single unit of work, optionally bound to a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    /// Caller-assigned number; not guaranteed contiguous and may be absent,
    /// in which case the 1-based position is used for context keys.
    #[serde(default)]
    pub step_number: Option<i64>,
    #[serde(default)]
    pub description: String,
    /// Tool to invoke. `None`, an empty string, or the sentinels
    /// `"null"`/`"none"` (case-insensitive) mark a pure processing step.
    #[serde(default, alias = "tool_name")]
    pub tool: Option<String>,
    #[serde(default)]
    pub parameters: Map<String, Value>,
    /// A failing critical step aborts the remainder of the plan.
    #[serde(default)]
    pub critical: bool,
}

impl Step {
    /// True when the step carries no real tool binding.
    pub fn is_processing(&self) -> bool {
        match self.tool.as_deref() {
            None => true,
            Some(name) => {
                name.is_empty()
                    || name.eq_ignore_ascii_case("null")
                    || name.eq_ignore_ascii_case("none")
            }
        }
    }
}

/// Outcome of one step, success or failure, as recorded in the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub step_number: Option<i64>,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Full record of one plan execution.
///
/// `success` is false only when the plan had no steps or a critical step
/// failed; non-critical step failures are recorded in `results` without
/// flipping the flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub success: bool,
    pub results: Vec<StepResult>,
    #[serde(default)]
    pub context: ExecutionContext,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Context accumulated up to a critical abort.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partial_context: Option<ExecutionContext>,
}

/// Verdict of the verifier over an execution report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationReport {
    pub verified: bool,
    pub completeness_score: u8,
    pub issues: Vec<String>,
    pub missing_data: Vec<String>,
    pub needs_retry: bool,
    /// Present only for verified runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<FormattedOutput>,
    /// Successful subset of the results when non-critical failures were found.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partial_results: Option<Vec<StepResult>>,
}

/// Structured rendering of a verified run; only successful steps appear.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FormattedOutput {
    pub task: String,
    pub status: String,
    pub results: Vec<FormattedStep>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormattedStep {
    pub step: Option<i64>,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// What the orchestrator hands back to the caller, exactly once per task.
/// The pipeline never retries itself; a caller seeing `needs_retry` decides
/// whether to re-invoke.
#[derive(Debug, Clone)]
pub enum TaskOutcome {
    Completed {
        response: String,
        metadata: TaskMetadata,
    },
    /// Plan generation failed; execution and verification never ran.
    PlanningFailed { error: String },
    /// Verification rejected the run.
    Rejected {
        issues: Vec<String>,
        partial_results: Option<Vec<StepResult>>,
        needs_retry: bool,
    },
}

impl TaskOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TaskOutcome::Completed { .. })
    }

    /// Human-readable failure line, if the task did not complete.
    pub fn failure_message(&self) -> Option<String> {
        match self {
            TaskOutcome::Completed { .. } => None,
            TaskOutcome::PlanningFailed { error } => Some(error.clone()),
            TaskOutcome::Rejected { .. } => Some("Task verification failed".to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TaskMetadata {
    pub plan: Plan,
    pub verification: VerificationReport,
    pub execution_summary: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step_with_tool(tool: Option<&str>) -> Step {
        Step {
            step_number: Some(1),
            description: "test".to_string(),
            tool: tool.map(String::from),
            parameters: Map::new(),
            critical: false,
        }
    }

    #[test]
    fn processing_step_sentinels() {
        assert!(step_with_tool(None).is_processing());
        assert!(step_with_tool(Some("")).is_processing());
        assert!(step_with_tool(Some("null")).is_processing());
        assert!(step_with_tool(Some("NONE")).is_processing());
        assert!(!step_with_tool(Some("weather_fetch")).is_processing());
    }

    #[test]
    fn plan_deserializes_from_planner_json() {
        let raw = serde_json::json!({
            "task_understanding": "check the weather",
            "steps": [
                {
                    "step_number": 1,
                    "description": "Fetch weather for Mumbai",
                    "tool": "weather_fetch",
                    "parameters": {"city": "Mumbai"}
                },
                {
                    "step_number": 2,
                    "description": "Summarize",
                    "tool": null,
                    "parameters": {}
                }
            ],
            "expected_output": "current weather"
        });
        let plan: Plan = serde_json::from_value(raw).unwrap();
        assert_eq!(plan.steps.len(), 2);
        assert_eq!(plan.steps[0].tool.as_deref(), Some("weather_fetch"));
        assert!(plan.steps[1].is_processing());
        assert!(!plan.steps[0].critical);
    }

    #[test]
    fn failure_message_per_outcome() {
        let completed = TaskOutcome::Completed {
            response: "done".to_string(),
            metadata: TaskMetadata {
                plan: Plan {
                    task_understanding: String::new(),
                    steps: Vec::new(),
                    expected_output: String::new(),
                },
                verification: VerificationReport {
                    verified: true,
                    completeness_score: 100,
                    issues: Vec::new(),
                    missing_data: Vec::new(),
                    needs_retry: false,
                    output: None,
                    partial_results: None,
                },
                execution_summary: String::new(),
            },
        };
        assert!(completed.is_success());
        assert_eq!(completed.failure_message(), None);

        let planning = TaskOutcome::PlanningFailed {
            error: "Planning failed: LLM API error: down".to_string(),
        };
        assert_eq!(
            planning.failure_message().as_deref(),
            Some("Planning failed: LLM API error: down")
        );

        let rejected = TaskOutcome::Rejected {
            issues: vec!["Step 1 failed: rate limit".to_string()],
            partial_results: None,
            needs_retry: true,
        };
        assert_eq!(
            rejected.failure_message().as_deref(),
            Some("Task verification failed")
        );
    }

    #[test]
    fn step_tolerates_missing_fields() {
        let plan: Plan =
            serde_json::from_value(serde_json::json!({"steps": [{"description": "only"}]}))
                .unwrap();
        assert_eq!(plan.steps[0].step_number, None);
        assert!(plan.steps[0].is_processing());
        assert_eq!(plan.task_understanding, "");
    }
}
