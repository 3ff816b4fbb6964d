//! Task orchestration: plan, execute, verify, respond.
//!
//! The [`Assistant`] owns the long-lived pieces (provider, tool registry,
//! planner, verifier) and creates a fresh [`Executor`] for every task so that
//! no execution state leaks between invocations. The pipeline runs each stage
//! exactly once; retry decisions are surfaced to the caller via
//! [`TaskOutcome::Rejected`], never acted on internally.

use std::sync::Arc;

use tracing::info;

use crate::agents::{Executor, Planner, Verifier};
use crate::config::AssistantConfig;
use crate::errors::{ConfigError, ToolError};
use crate::llm::{LlmProvider, OpenAiLlmProvider};
use crate::tools::ToolRegistry;
use crate::types::{TaskMetadata, TaskOutcome};

pub struct Assistant {
    tools: Arc<ToolRegistry>,
    planner: Planner,
    verifier: Verifier,
}

/// Error building an [`Assistant`] from configuration.
#[derive(Debug, thiserror::Error)]
pub enum AssistantBuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to initialize LLM provider: {0}")]
    Llm(#[from] crate::errors::LlmError),

    #[error("failed to initialize tools: {0}")]
    Tools(#[from] ToolError),
}

impl Assistant {
    pub fn new(llm: Arc<dyn LlmProvider>, tools: Arc<ToolRegistry>) -> Self {
        let planner = Planner::new(llm.clone(), tools.catalog());
        let verifier = Verifier::new(llm);
        Self {
            tools,
            planner,
            verifier,
        }
    }

    /// Wire the OpenAI provider and the built-in tools from config.
    pub fn from_config(config: &AssistantConfig) -> Result<Self, AssistantBuildError> {
        if config.openai_api_key.is_none() {
            return Err(ConfigError::MissingApiKey.into());
        }
        let llm: Arc<dyn LlmProvider> = Arc::new(OpenAiLlmProvider::new(config)?);
        let tools = Arc::new(ToolRegistry::with_default_tools(config)?);
        Ok(Self::new(llm, tools))
    }

    /// Run one task through the full pipeline.
    pub async fn process_task(&self, task: &str) -> TaskOutcome {
        info!(task, "processing task");

        let plan = match self.planner.create_plan(task).await {
            Ok(plan) => plan,
            Err(e) => {
                info!(error = %e, "planning failed");
                return TaskOutcome::PlanningFailed {
                    error: format!("Planning failed: {e}"),
                };
            }
        };
        info!(
            steps = plan.steps.len(),
            understanding = %plan.task_understanding,
            "plan created"
        );

        let mut executor = Executor::new(self.tools.clone());
        let report = executor.execute_plan(&plan).await;
        info!(
            success = report.success,
            steps_run = report.results.len(),
            "execution finished"
        );

        let verification = self.verifier.verify_results(&plan, &report).await;
        if !verification.verified {
            info!(issues = verification.issues.len(), "verification rejected the run");
            return TaskOutcome::Rejected {
                issues: verification.issues.clone(),
                partial_results: verification.partial_results.clone(),
                needs_retry: verification.needs_retry,
            };
        }

        let response = self.verifier.generate_final_response(&verification).await;
        info!(score = verification.completeness_score, "task completed");
        TaskOutcome::Completed {
            response,
            metadata: TaskMetadata {
                plan,
                verification,
                execution_summary: executor.get_execution_summary(),
            },
        }
    }
}
