//! AI operations assistant: a plan–execute–verify pipeline over pluggable
//! tools and an OpenAI-compatible LLM provider.
//!
//! A task flows through three stages:
//! 1. The [`agents::Planner`] turns the task and the tool catalog into a
//!    structured [`types::Plan`].
//! 2. A fresh [`agents::Executor`] runs the steps in order, retrying
//!    transient tool failures and accumulating a context of results.
//! 3. The [`agents::Verifier`] checks the execution report and renders the
//!    final response.
//!
//! [`Assistant`] wires the stages together; [`llm::StubLlmProvider`] makes
//! the whole pipeline runnable offline in tests.

pub mod agents;
pub mod config;
pub mod errors;
pub mod llm;
pub mod orchestrator;
pub mod tools;
pub mod types;

pub use config::AssistantConfig;
pub use orchestrator::{Assistant, AssistantBuildError};
pub use types::{Plan, TaskOutcome};
