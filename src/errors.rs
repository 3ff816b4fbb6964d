//! Error taxonomy for the assistant pipeline.
//!
//! Step-level failures are carried as data inside [`crate::types::StepResult`]
//! and never cross the executor boundary as errors; the enums here cover the
//! boundaries where a call itself can fail (LLM transport/parse, planning,
//! tool invocation, configuration).

use thiserror::Error;

/// Failure of an LLM completion call, either at the transport layer or when
/// interpreting the response.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM API request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status or a structurally invalid API response.
    #[error("LLM API error: {0}")]
    Api(String),

    /// The completion text could not be parsed as JSON. Carries the raw text
    /// so the caller can see what the model actually returned.
    #[error("Failed to parse JSON response: {cause}\nResponse: {raw}")]
    JsonParse { cause: String, raw: String },
}

/// Planning is the only pipeline stage whose failure is fatal to the run.
#[derive(Debug, Error)]
pub enum PlanningError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    /// The model answered, but the value does not satisfy the plan schema
    /// (not an object, missing `steps`, or an empty step list).
    #[error("Invalid plan structure: {0}")]
    InvalidPlan(String),
}

/// Raised by a tool when the call itself cannot be made. The executor catches
/// these and treats them as retryable step failures; tools prefer returning
/// `ToolOutput { success: false, .. }` for anything the remote API reported.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("invalid tool parameters: {0}")]
    InvalidParams(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("OPENAI_API_KEY not found in environment or config file")]
    MissingApiKey,
}
