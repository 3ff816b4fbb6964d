//! LLM judgment service used for planning and verification reasoning.

pub mod provider;

pub use provider::{LlmProvider, OpenAiLlmProvider, StubLlmProvider, StubResponse};
