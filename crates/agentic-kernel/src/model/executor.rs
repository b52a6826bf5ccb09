use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use super::cancellation::CancellationToken;
use super::awaitable::Awaitable;
use crate::blackboard::Blackboard;

/// A typed failure returned by an [`ActionExecutor`] (spec.md §3/§4.5,
/// outcome (d): "a typed failure").
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ActionExecutionError {
    #[error("tool group '{0}' is not available to this action")]
    ToolGroupUnavailable(String),

    #[error("action execution failed: {0}")]
    Failed(String),

    #[error("action was cancelled")]
    Cancelled,
}

/// Everything an [`ActionExecutor`] needs to do its side-effecting work: a
/// mutable handle on the process's blackboard, the owning process id (for
/// attributing usage/cost and for LLM mediation — see `agentic-runtime`),
/// and a cancellation token checked at suspension points.
///
/// Kernel-level by design: the concrete LLM/tool mediation layer (C6) lives
/// in `agentic-runtime` and is reached by an executor through whatever
/// capability it was constructed with (e.g. a captured `Arc<dyn
/// LlmMediator>`), not through this context — the context only carries what
/// every action needs regardless of whether it calls an LLM at all.
pub struct ActionContext<'a> {
    pub blackboard: &'a mut Blackboard,
    pub process_id: Uuid,
    pub cancellation: CancellationToken,
}

/// What running an action accomplished, for event emission and for the
/// executor's "apply result to blackboard" bookkeeping. The action itself is
/// responsible for actually appending/binding to `ctx.blackboard` — this
/// enum is a lightweight receipt of *what kind* of thing it did, not the
/// payload itself (the payload already lives on the blackboard).
#[derive(Debug)]
pub enum ActionOutcome {
    /// The action appended a plain value to the blackboard.
    Appended { type_name: &'static str },
    /// The action appended a value and bound it to a name.
    Bound { name: String, type_name: &'static str },
    /// The action suspended the process pending external input.
    Suspended(Box<dyn Awaitable>),
}

/// Opaque handle to an action's side-effecting code (spec.md §3: "executor:
/// opaque handle to the side-effecting code").
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    async fn run(&self, ctx: &mut ActionContext<'_>) -> Result<ActionOutcome, ActionExecutionError>;
}

#[cfg(test)]
pub(crate) struct NoopExecutor;

#[cfg(test)]
#[async_trait]
impl ActionExecutor for NoopExecutor {
    async fn run(&self, _ctx: &mut ActionContext<'_>) -> Result<ActionOutcome, ActionExecutionError> {
        Ok(ActionOutcome::Appended {
            type_name: "noop",
        })
    }
}
