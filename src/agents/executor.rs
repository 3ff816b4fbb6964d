//! Step execution.
//!
//! Runs a plan's steps strictly in list order, threading an append-only
//! [`ExecutionContext`] of successful results. One `Executor` owns the
//! mutable state for exactly one plan execution; hosts handling concurrent
//! tasks must create one per in-flight task.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::tools::ToolRegistry;
use crate::types::{ExecutionContext, ExecutionReport, Plan, Step, StepResult};

/// Per-step attempt budget. No backoff between attempts.
const MAX_ATTEMPTS: usize = 2;

/// A terminal failure can never succeed on retry (missing credentials,
/// unknown resource). The substring contract is load-bearing: tools must
/// phrase permanent errors with one of these markers.
fn is_terminal_error(error: &str) -> bool {
    let lower = error.to_lowercase();
    lower.contains("not configured") || lower.contains("not found")
}

#[derive(Debug, Clone)]
struct HistoryEntry {
    step: Option<i64>,
    description: String,
    tool: Option<String>,
}

pub struct Executor {
    tools: Arc<ToolRegistry>,
    history: Vec<HistoryEntry>,
}

impl Executor {
    pub fn new(tools: Arc<ToolRegistry>) -> Self {
        Self {
            tools,
            history: Vec::new(),
        }
    }

    /// Execute every step of the plan in order.
    ///
    /// A non-critical failure is recorded and execution continues; a failing
    /// critical step aborts immediately with the context gathered so far.
    pub async fn execute_plan(&mut self, plan: &Plan) -> ExecutionReport {
        if plan.steps.is_empty() {
            return ExecutionReport {
                success: false,
                results: Vec::new(),
                context: ExecutionContext::new(),
                error: Some("No steps to execute".to_string()),
                partial_context: None,
            };
        }

        let mut results: Vec<StepResult> = Vec::with_capacity(plan.steps.len());
        let mut context = ExecutionContext::new();

        for step in &plan.steps {
            let step_result = self.execute_step(step, &context).await;
            let failed = !step_result.success;
            results.push(step_result);

            if let Some(last) = results.last() {
                if last.success {
                    let key = match last.step_number {
                        Some(n) => format!("step_{n}"),
                        None => format!("step_{}", results.len()),
                    };
                    context.insert(key, last.result.clone().unwrap_or(Value::Null));
                }
            }

            if failed && step.critical {
                let n = step
                    .step_number
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| results.len().to_string());
                warn!(step = %n, "critical step failed, aborting plan");
                return ExecutionReport {
                    success: false,
                    results,
                    context: ExecutionContext::new(),
                    error: Some(format!("Critical step {n} failed")),
                    partial_context: Some(context),
                };
            }
        }

        ExecutionReport {
            success: true,
            results,
            context,
            error: None,
            partial_context: None,
        }
    }

    /// Execute a single step against the context gathered so far.
    pub async fn execute_step(&mut self, step: &Step, context: &ExecutionContext) -> StepResult {
        self.history.push(HistoryEntry {
            step: step.step_number,
            description: step.description.clone(),
            tool: step.tool.clone(),
        });

        // Steps without a real tool binding succeed trivially; they only
        // report which context keys are visible at this point.
        let name = match step.tool.as_deref() {
            Some(name) if !step.is_processing() => name,
            _ => {
                return StepResult {
                    step_number: step.step_number,
                    description: step.description.clone(),
                    tool: None,
                    success: true,
                    result: Some(json!({
                        "type": "processing",
                        "message": "Processing step completed",
                        "context_available": context.keys().collect::<Vec<_>>(),
                    })),
                    error: None,
                }
            }
        };

        let Some(tool) = self.tools.get(name) else {
            return StepResult {
                step_number: step.step_number,
                description: step.description.clone(),
                tool: Some(name.to_string()),
                success: false,
                result: None,
                error: Some(format!("Tool '{name}' not found")),
            };
        };

        let mut last_error: Option<String> = None;
        for attempt in 1..=MAX_ATTEMPTS {
            match tool.execute(&step.parameters).await {
                Ok(output) if output.success => {
                    debug!(tool = name, attempt, "step succeeded");
                    return StepResult {
                        step_number: step.step_number,
                        description: step.description.clone(),
                        tool: Some(name.to_string()),
                        success: true,
                        result: output.data,
                        error: None,
                    };
                }
                Ok(output) => {
                    let error = output
                        .error
                        .unwrap_or_else(|| "Unknown error".to_string());
                    let terminal = is_terminal_error(&error);
                    debug!(tool = name, attempt, error = %error, terminal, "step attempt failed");
                    last_error = Some(error);
                    if terminal {
                        break;
                    }
                }
                // A call that could not be made at all is retryable.
                Err(e) => {
                    debug!(tool = name, attempt, error = %e, "tool call raised");
                    last_error = Some(e.to_string());
                }
            }
        }

        StepResult {
            step_number: step.step_number,
            description: step.description.clone(),
            tool: Some(name.to_string()),
            success: false,
            result: None,
            error: last_error,
        }
    }

    /// Human-readable rendering of every step attempted so far.
    pub fn get_execution_summary(&self) -> String {
        if self.history.is_empty() {
            return "No steps executed".to_string();
        }
        let mut summary = String::from("Execution Summary:\n");
        for entry in &self.history {
            let step = entry
                .step
                .map(|n| n.to_string())
                .unwrap_or_else(|| "?".to_string());
            summary.push_str(&format!("- Step {}: {}", step, entry.description));
            if let Some(tool) = entry.tool.as_deref().filter(|t| !t.is_empty()) {
                summary.push_str(&format!(" (using {tool})"));
            }
            summary.push('\n');
        }
        summary
    }
}
