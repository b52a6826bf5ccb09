//! Crate-level error types for `agentic-kernel`.
//!
//! Each sub-module owns a narrow, `#[non_exhaustive]` `thiserror` enum for
//! its own failure modes. [`KernelError`] composes them with `#[from]` so
//! callers that just want `?` to work across module boundaries get it, while
//! callers who need precise matching can still reach for the sub-module
//! error type directly.

use thiserror::Error;

use crate::model::AgentModelError;
use crate::planner::PlannerError;

/// Crate-level error type for `agentic-kernel`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum KernelError {
    /// An error raised while building or querying the blackboard.
    #[error("blackboard error: {0}")]
    Blackboard(#[from] crate::blackboard::BlackboardError),

    /// An error raised while evaluating conditions or world state.
    #[error("world state error: {0}")]
    World(#[from] crate::world::WorldStateError),

    /// An error raised while constructing or validating Action/Goal/Agent values.
    #[error("agent model error: {0}")]
    Model(#[from] AgentModelError),

    /// An error raised by the GOAP planner.
    #[error("planner error: {0}")]
    Planner(#[from] PlannerError),
}

/// Convenience result alias using [`error_stack::Report`] for rich,
/// context-carrying propagation across module boundaries.
pub type KernelResult<T> = Result<T, error_stack::Report<KernelError>>;
