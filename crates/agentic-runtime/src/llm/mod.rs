//! LLM/Tool mediation (spec.md §4.6): the seam through which an action's
//! executor reaches a model provider, merging its own tool callbacks with
//! whatever is ambient on the process, and attributing usage/cost back to
//! the owning [`agentic_runtime::process::AgentProcess`] via
//! [`agentic_kernel`]'s process-id-keyed handles.

pub mod retry;

mod fake;
pub use fake::FakeLlm;
pub use retry::{retry_with_policy, RetryConfig, RetryPolicy};

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::process::ProcessContext;

/// Errors raised by LLM/tool mediation (spec.md §7).
///
/// [`LlmError::Transient`] is the only retryable variant — everything else
/// (a malformed request, a tool that doesn't exist, a model that refuses to
/// produce structured output) is a fact about the request or the model's
/// response, not the network, and retrying it would just waste the budget.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LlmError {
    /// A transport-level failure (timeout, rate limit, 5xx) worth retrying.
    #[error("transient LLM failure: {0}")]
    Transient(String),

    /// A non-retryable provider failure (bad request, auth, quota).
    #[error("LLM call failed: {0}")]
    Permanent(String),

    /// `transform`'s structured-output contract was not met, and this call
    /// was not `transformIfPossible` (which would have surfaced this as a
    /// [`TransformOutcome::Refused`] value instead of an error).
    #[error("model did not produce valid structured output: {0}")]
    ValidationFailed(String),

    /// A requested tool callback name was not present in the merged set.
    #[error("unknown tool: {0}")]
    UnknownTool(String),
}

impl LlmError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, LlmError::Transient(_))
    }
}

/// Per-call generation knobs (spec.md §4.6). Every field is optional; a
/// concrete `LlmMediator` implementation fills in its own defaults for
/// anything left unset.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct LlmOptions {
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl LlmOptions {
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Token accounting for one LLM call, attributed to the calling process's
/// [`crate::process::BudgetUsage`] by the mediator after the call completes.
#[derive(Debug, Clone, Copy, Default, serde::Serialize, serde::Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

impl TokenUsage {
    pub fn total(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }
}

/// A tool an action makes available to the model for one call, merged with
/// whatever tool groups the process has implicitly enabled (spec.md §4.6:
/// "merges the caller's tool callbacks with the process's implicit tool
/// groups").
#[async_trait]
pub trait ToolCallback: Send + Sync {
    fn name(&self) -> &str;
    async fn call(&self, arguments: serde_json::Value) -> Result<serde_json::Value, LlmError>;
}

pub type ToolCallbacks = BTreeMap<String, Arc<dyn ToolCallback>>;

/// The result of a `transformIfPossible` call: either the model produced
/// valid structured output, or it didn't and that is reported as a value
/// rather than an error (spec.md §4.6).
#[derive(Debug, Clone)]
pub enum TransformOutcome {
    Produced(serde_json::Value),
    Refused(String),
}

/// The LLM/Tool mediation contract (spec.md §4.6's three operations).
/// Structured output is represented as `serde_json::Value` rather than a
/// generic type parameter so this trait stays object-safe — callers that
/// want a concrete type deserialize it themselves with `serde_json::from_value`.
#[async_trait]
pub trait LlmMediator: Send + Sync {
    async fn generate_text(
        &self,
        prompt: &str,
        interaction_id: Uuid,
        options: &LlmOptions,
        tools: &ToolCallbacks,
        ctx: &ProcessContext,
    ) -> Result<String, LlmError>;

    /// Returns a structured failure rather than throwing when the model
    /// could not produce valid output (spec.md §4.6).
    async fn transform_if_possible(
        &self,
        prompt: &str,
        interaction_id: Uuid,
        options: &LlmOptions,
        tools: &ToolCallbacks,
        ctx: &ProcessContext,
    ) -> Result<TransformOutcome, LlmError>;

    /// Like [`LlmMediator::transform_if_possible`], but a refusal becomes a
    /// hard [`LlmError::ValidationFailed`] instead of a value the caller must
    /// branch on.
    async fn transform(
        &self,
        prompt: &str,
        interaction_id: Uuid,
        options: &LlmOptions,
        tools: &ToolCallbacks,
        ctx: &ProcessContext,
    ) -> Result<serde_json::Value, LlmError> {
        match self.transform_if_possible(prompt, interaction_id, options, tools, ctx).await? {
            TransformOutcome::Produced(value) => Ok(value),
            TransformOutcome::Refused(reason) => Err(LlmError::ValidationFailed(reason)),
        }
    }
}

/// Merges an action's own tool callbacks with the process's implicit tool
/// groups (spec.md §4.6), the caller's callbacks winning on a name collision.
pub fn merge_tool_callbacks(implicit: &ToolCallbacks, caller: &ToolCallbacks) -> ToolCallbacks {
    let mut merged = implicit.clone();
    merged.extend(caller.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;
    #[async_trait]
    impl ToolCallback for Echo {
        fn name(&self) -> &str {
            "echo"
        }
        async fn call(&self, arguments: serde_json::Value) -> Result<serde_json::Value, LlmError> {
            Ok(arguments)
        }
    }

    struct Loud;
    #[async_trait]
    impl ToolCallback for Loud {
        fn name(&self) -> &str {
            "echo"
        }
        async fn call(&self, _arguments: serde_json::Value) -> Result<serde_json::Value, LlmError> {
            Ok(serde_json::json!("LOUD"))
        }
    }

    #[test]
    fn caller_callbacks_win_on_name_collision() {
        let mut implicit: ToolCallbacks = BTreeMap::new();
        implicit.insert("echo".to_string(), Arc::new(Echo));
        let mut caller: ToolCallbacks = BTreeMap::new();
        caller.insert("echo".to_string(), Arc::new(Loud));

        let merged = merge_tool_callbacks(&implicit, &caller);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged["echo"].name(), "echo");
    }

    #[test]
    fn only_transient_errors_are_retryable() {
        assert!(LlmError::Transient("x".into()).is_retryable());
        assert!(!LlmError::Permanent("x".into()).is_retryable());
        assert!(!LlmError::ValidationFailed("x".into()).is_retryable());
    }
}
