//! A deterministic, no-network `LlmMediator` used in test mode (spec.md
//! §4.6/§8: "Determinism in test mode").

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::SystemTime;

use async_trait::async_trait;
use uuid::Uuid;

use super::retry::{retry_with_policy, RetryConfig};
use super::{LlmError, LlmMediator, LlmOptions, ToolCallbacks, TransformOutcome};
use crate::process::{ProcessContext, ProcessEvent};

const PREVIEW_LEN: usize = 120;

/// Canned responses keyed by exact prompt text. A prompt with no registered
/// response gets a deterministic echo (`generate_text`) or an explicit
/// refusal (`transform_if_possible`) rather than a panic, so an
/// under-specified test fails at an assertion instead of inside the fake.
///
/// Every call goes through `self.retry` (spec.md §4.6: bounded retry/backoff
/// on transient failures), and `with_transient_failures` lets a test make a
/// prompt fail that way a fixed number of times before succeeding, so the
/// retry path itself is exercisable without a real provider.
#[derive(Default)]
pub struct FakeLlm {
    text_responses: BTreeMap<String, String>,
    json_responses: BTreeMap<String, serde_json::Value>,
    tool_calls: BTreeMap<String, (String, serde_json::Value)>,
    transient_failures: Mutex<BTreeMap<String, u32>>,
    retry: RetryConfig,
}

impl FakeLlm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text_response(mut self, prompt: impl Into<String>, response: impl Into<String>) -> Self {
        self.text_responses.insert(prompt.into(), response.into());
        self
    }

    pub fn with_json_response(mut self, prompt: impl Into<String>, response: serde_json::Value) -> Self {
        self.json_responses.insert(prompt.into(), response);
        self
    }

    /// Registers a tool this fake should invoke (from the `tools` map passed
    /// to the call) whenever it answers `prompt`, publishing
    /// `ToolCallRequest`/`ToolCallResponse` around the call.
    pub fn with_tool_call(
        mut self,
        prompt: impl Into<String>,
        tool_name: impl Into<String>,
        arguments: serde_json::Value,
    ) -> Self {
        self.tool_calls.insert(prompt.into(), (tool_name.into(), arguments));
        self
    }

    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Makes `prompt` fail with [`LlmError::Transient`] `count` times before
    /// answering normally, so a test can observe `self.retry` actually retry.
    pub fn with_transient_failures(self, prompt: impl Into<String>, count: u32) -> Self {
        self.transient_failures.lock().expect("fake llm lock poisoned").insert(prompt.into(), count);
        self
    }

    /// Consumes one simulated transient failure for `prompt`, if any remain.
    fn take_transient_failure(&self, prompt: &str) -> Option<LlmError> {
        let mut failures = self.transient_failures.lock().expect("fake llm lock poisoned");
        let remaining = failures.get_mut(prompt)?;
        if *remaining == 0 {
            return None;
        }
        *remaining -= 1;
        Some(LlmError::Transient(format!("simulated transient failure for: {prompt}")))
    }

    async fn invoke_tool_call_if_registered(
        &self,
        prompt: &str,
        tools: &ToolCallbacks,
        ctx: &ProcessContext,
    ) -> Result<(), LlmError> {
        let Some((tool_name, arguments)) = self.tool_calls.get(prompt) else {
            return Ok(());
        };
        ctx.events.publish(ProcessEvent::ToolCallRequest {
            process_id: ctx.process_id,
            tool_name: tool_name.clone(),
            at: SystemTime::now(),
        });

        let callback = tools
            .get(tool_name)
            .ok_or_else(|| LlmError::UnknownTool(tool_name.clone()))?;
        let result = callback.call(arguments.clone()).await;

        ctx.events.publish(ProcessEvent::ToolCallResponse {
            process_id: ctx.process_id,
            tool_name: tool_name.clone(),
            succeeded: result.is_ok(),
            at: SystemTime::now(),
        });
        result.map(|_| ())
    }
}

fn preview(text: &str) -> String {
    if text.len() <= PREVIEW_LEN {
        text.to_string()
    } else {
        format!("{}…", &text[..PREVIEW_LEN])
    }
}

#[async_trait]
impl LlmMediator for FakeLlm {
    async fn generate_text(
        &self,
        prompt: &str,
        interaction_id: Uuid,
        _options: &LlmOptions,
        tools: &ToolCallbacks,
        ctx: &ProcessContext,
    ) -> Result<String, LlmError> {
        ctx.events.publish(ProcessEvent::LlmRequest {
            process_id: ctx.process_id,
            interaction_id,
            prompt_preview: preview(prompt),
            at: SystemTime::now(),
        });

        self.invoke_tool_call_if_registered(prompt, tools, ctx).await?;

        if let Some(reason) = ctx.registry.meta(ctx.process_id).and_then(|meta| meta.usage.exceeded(&meta.budget)) {
            return Err(LlmError::Permanent(format!("budget already exceeded: {reason:?}")));
        }

        let text = retry_with_policy(&self.retry, || async {
            if let Some(err) = self.take_transient_failure(prompt) {
                return Err(err);
            }
            Ok(self
                .text_responses
                .get(prompt)
                .cloned()
                .unwrap_or_else(|| format!("fake-response-to: {prompt}")))
        })
        .await?;

        let tokens = (prompt.len() + text.len()) as u64;
        let exceeded = ctx.registry.record_llm_usage(ctx.process_id, tokens, 0.0);
        ctx.events.publish(ProcessEvent::LlmResponse {
            process_id: ctx.process_id,
            interaction_id,
            tokens,
            cost: 0.0,
            at: SystemTime::now(),
        });
        if let Some(reason) = exceeded {
            ctx.events.publish(ProcessEvent::BudgetExceeded {
                process_id: ctx.process_id,
                reason,
                at: SystemTime::now(),
            });
            return Err(LlmError::Permanent(format!("budget exceeded after LLM call: {reason:?}")));
        }
        ctx.events.publish(ProcessEvent::ProgressUpdate {
            process_id: ctx.process_id,
            message: format!("generated a response to: {}", preview(prompt)),
            at: SystemTime::now(),
        });

        Ok(text)
    }

    async fn transform_if_possible(
        &self,
        prompt: &str,
        interaction_id: Uuid,
        _options: &LlmOptions,
        tools: &ToolCallbacks,
        ctx: &ProcessContext,
    ) -> Result<TransformOutcome, LlmError> {
        ctx.events.publish(ProcessEvent::LlmRequest {
            process_id: ctx.process_id,
            interaction_id,
            prompt_preview: preview(prompt),
            at: SystemTime::now(),
        });

        self.invoke_tool_call_if_registered(prompt, tools, ctx).await?;

        if let Some(reason) = ctx.registry.meta(ctx.process_id).and_then(|meta| meta.usage.exceeded(&meta.budget)) {
            return Err(LlmError::Permanent(format!("budget already exceeded: {reason:?}")));
        }

        let outcome = retry_with_policy(&self.retry, || async {
            if let Some(err) = self.take_transient_failure(prompt) {
                return Err(err);
            }
            Ok(match self.json_responses.get(prompt) {
                Some(value) => TransformOutcome::Produced(value.clone()),
                None => TransformOutcome::Refused(format!("no fake response registered for prompt: {prompt}")),
            })
        })
        .await?;

        let tokens = prompt.len() as u64;
        let exceeded = ctx.registry.record_llm_usage(ctx.process_id, tokens, 0.0);
        ctx.events.publish(ProcessEvent::LlmResponse {
            process_id: ctx.process_id,
            interaction_id,
            tokens,
            cost: 0.0,
            at: SystemTime::now(),
        });
        if let Some(reason) = exceeded {
            ctx.events.publish(ProcessEvent::BudgetExceeded {
                process_id: ctx.process_id,
                reason,
                at: SystemTime::now(),
            });
            return Err(LlmError::Permanent(format!("budget exceeded after LLM call: {reason:?}")));
        }
        ctx.events.publish(ProcessEvent::ProgressUpdate {
            process_id: ctx.process_id,
            message: format!("generated a response to: {}", preview(prompt)),
            at: SystemTime::now(),
        });

        Ok(outcome)
    }
}
