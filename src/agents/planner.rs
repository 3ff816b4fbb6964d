//! Plan generation.
//!
//! Turns a task string plus the tool catalog into a validated [`Plan`] via a
//! JSON completion. Validation is deliberately asymmetric: `create_plan`
//! rejects anything without a non-empty `steps` array, while `refine_plan`
//! accepts whatever comes back and falls back to the original plan when the
//! call or parse fails.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::PlanningError;
use crate::llm::LlmProvider;
use crate::tools::ToolInfo;
use crate::types::Plan;

const PLANNING_TEMPERATURE: f64 = 0.3;

const PLANNER_SYSTEM_PROMPT: &str = r#"You are a planning agent in an AI Operations Assistant system.
Your job is to break down user tasks into clear, executable steps.

For each step, you must:
1. Describe what needs to be done
2. Identify which tool (if any) is needed
3. Specify the tool parameters

Respond ONLY with a valid JSON object following this exact schema:
{
    "task_understanding": "Brief summary of what the user wants",
    "steps": [
        {
            "step_number": 1,
            "description": "What this step does",
            "tool": "tool_name or null",
            "parameters": {}
        }
    ],
    "expected_output": "What the final result should contain"
}"#;

const REFINE_SYSTEM_PROMPT: &str = r#"You are refining an execution plan based on feedback.
Adjust the plan to address any issues while maintaining the original intent.
Respond with valid JSON only."#;

pub struct Planner {
    llm: Arc<dyn LlmProvider>,
    catalog: Vec<ToolInfo>,
}

impl Planner {
    pub fn new(llm: Arc<dyn LlmProvider>, catalog: Vec<ToolInfo>) -> Self {
        Self { llm, catalog }
    }

    /// Create an execution plan for a natural-language task.
    pub async fn create_plan(&self, task: &str) -> Result<Plan, PlanningError> {
        let tools_description = self
            .catalog
            .iter()
            .map(|tool| format!("- {}: {}", tool.name, tool.description))
            .collect::<Vec<_>>()
            .join("\n");

        let user_prompt = format!(
            "User Task: {task}\n\n\
             Available Tools:\n{tools_description}\n\n\
             Create a detailed execution plan with numbered steps. Each step should either:\n\
             - Call a specific tool with proper parameters\n\
             - Process or combine results from previous steps\n\
             - Format the final output\n\n\
             Remember to respond with ONLY valid JSON."
        );

        let value = self
            .llm
            .generate_json_completion(&user_prompt, Some(PLANNER_SYSTEM_PROMPT), PLANNING_TEMPERATURE)
            .await?;
        let plan = validate_plan(value)?;
        debug!(steps = plan.steps.len(), "plan created");
        Ok(plan)
    }

    /// Ask for an improved plan given free-text feedback.
    ///
    /// No schema validation is applied to the refined plan beyond what is
    /// needed to materialize it; any failure returns the original unchanged.
    pub async fn refine_plan(&self, original: &Plan, feedback: &str) -> Plan {
        let original_json = serde_json::to_string_pretty(original)
            .unwrap_or_else(|_| "{}".to_string());
        let user_prompt = format!(
            "Original Plan:\n{original_json}\n\n\
             Feedback:\n{feedback}\n\n\
             Create an improved plan that addresses the feedback."
        );

        match self
            .llm
            .generate_json_completion(&user_prompt, Some(REFINE_SYSTEM_PROMPT), PLANNING_TEMPERATURE)
            .await
        {
            Ok(value) => serde_json::from_value(value).unwrap_or_else(|e| {
                warn!(error = %e, "refined plan did not materialize, keeping original");
                original.clone()
            }),
            Err(e) => {
                warn!(error = %e, "plan refinement failed, keeping original");
                original.clone()
            }
        }
    }
}

/// A plan must be an object with a non-empty `steps` array; anything else is
/// a planning failure carrying the underlying cause.
fn validate_plan(value: Value) -> Result<Plan, PlanningError> {
    let steps = value
        .get("steps")
        .ok_or_else(|| PlanningError::InvalidPlan("plan is missing 'steps'".to_string()))?;
    match steps.as_array() {
        Some(steps) if steps.is_empty() => {
            return Err(PlanningError::InvalidPlan(
                "plan must contain at least one step".to_string(),
            ))
        }
        Some(_) => {}
        None => {
            return Err(PlanningError::InvalidPlan(
                "'steps' must be an array".to_string(),
            ))
        }
    }
    serde_json::from_value(value).map_err(|e| PlanningError::InvalidPlan(e.to_string()))
}
