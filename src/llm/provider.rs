//! LLM provider abstraction.
//!
//! The pipeline needs exactly two operations from a judgment service: a
//! free-text completion and a JSON completion. [`OpenAiLlmProvider`] talks to
//! any OpenAI-compatible chat-completions endpoint; [`StubLlmProvider`] plays
//! back scripted responses for tests and offline runs.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::config::AssistantConfig;
use crate::errors::LlmError;

/// Appended to every JSON completion prompt.
const JSON_INSTRUCTION: &str =
    "\n\nYou MUST respond with valid JSON only. No additional text or explanation.";

/// Token budget for JSON completions (plans and verdicts).
const JSON_MAX_TOKENS: u32 = 2000;

/// Abstract interface for the judgment service.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate a free-text completion.
    async fn generate_completion(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        temperature: f64,
        max_tokens: u32,
    ) -> Result<String, LlmError>;

    /// Generate a completion and parse it as JSON.
    ///
    /// Appends a "respond with JSON only" instruction, strips one surrounding
    /// code fence (```json ... ``` or ``` ... ```) if present, then parses
    /// strictly. A parse failure carries the raw text.
    async fn generate_json_completion(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        temperature: f64,
    ) -> Result<Value, LlmError> {
        let full_prompt = format!("{prompt}{JSON_INSTRUCTION}");
        let text = self
            .generate_completion(&full_prompt, system_prompt, temperature, JSON_MAX_TOKENS)
            .await?;
        let stripped = strip_code_fence(&text);
        serde_json::from_str(stripped).map_err(|e| LlmError::JsonParse {
            cause: e.to_string(),
            raw: stripped.to_string(),
        })
    }
}

/// Remove one surrounding markdown code fence, labeled or bare.
fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    if let Some((_, rest)) = text.split_once("```json") {
        rest.split("```").next().unwrap_or(rest).trim()
    } else if text.contains("```") {
        let mut segments = text.split("```");
        segments.next();
        segments.next().map(str::trim).unwrap_or("")
    } else {
        text
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// OpenAI-compatible chat-completions client.
pub struct OpenAiLlmProvider {
    client: reqwest::Client,
    model: String,
    base_url: String,
    api_key: String,
}

impl OpenAiLlmProvider {
    pub fn new(config: &AssistantConfig) -> Result<Self, LlmError> {
        let api_key = config
            .openai_api_key
            .clone()
            .ok_or_else(|| LlmError::Api("API key required for OpenAI provider".to_string()))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

#[async_trait]
impl LlmProvider for OpenAiLlmProvider {
    async fn generate_completion(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        temperature: f64,
        max_tokens: u32,
    ) -> Result<String, LlmError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system_prompt {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: system.to_string(),
            });
        }
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: prompt.to_string(),
        });

        let url = format!("{}/chat/completions", self.base_url);
        debug!(model = %self.model, temperature, max_tokens, "sending chat completion request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&ChatRequest {
                model: &self.model,
                messages,
                temperature,
                max_tokens,
            })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            let preview: String = body.chars().take(1000).collect();
            return Err(LlmError::Api(format!(
                "request failed (HTTP {}): {}",
                status.as_u16(),
                preview
            )));
        }

        let parsed: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| LlmError::Api(format!("unexpected response shape: {e}")))?;
        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::Api("response missing choices".to_string()))?;
        Ok(choice.message.content.trim().to_string())
    }
}

/// One scripted reply for the stub provider.
#[derive(Debug, Clone)]
pub enum StubResponse {
    Text(String),
    Fail(String),
}

/// Deterministic provider that plays back a queue of scripted responses.
///
/// Records every prompt it receives so tests can assert which calls were
/// made; an exhausted queue fails the call.
pub struct StubLlmProvider {
    responses: Mutex<VecDeque<StubResponse>>,
    prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl StubLlmProvider {
    pub fn new(responses: Vec<StubResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            prompts: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Convenience constructor for plain-text scripts.
    pub fn with_texts(texts: Vec<&str>) -> Self {
        Self::new(texts.into_iter().map(|t| StubResponse::Text(t.to_string())).collect())
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn recorded_prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmProvider for StubLlmProvider {
    async fn generate_completion(
        &self,
        prompt: &str,
        _system_prompt: Option<&str>,
        _temperature: f64,
        _max_tokens: u32,
    ) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        match self.responses.lock().unwrap().pop_front() {
            Some(StubResponse::Text(text)) => Ok(text),
            Some(StubResponse::Fail(reason)) => Err(LlmError::Api(reason)),
            None => Err(LlmError::Api("stub response queue exhausted".to_string())),
        }
    }
}
